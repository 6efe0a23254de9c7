#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Bundler plugin core that compiles a directory of SVG icons into a
//! webfont and wires the result into the host's module graph, dev server
//! and build pipeline.
//!
//! Font conversion itself is delegated to an implementation of
//! [`WebfontGenerator`]; the host bundler is described by the traits in
//! [`host`]. What lives here is option normalization
//! ([`parse_options`]), the generation lifecycle ([`Orchestrator`],
//! [`WebfontPlugin`]), the icon-directory watch loop ([`WatchSession`])
//! and the three artifact read paths: the `virtual:` CSS module, dev
//! middleware responses and build asset emission.

pub mod assets;
mod error;
mod generator;
pub mod host;
mod options;
mod orchestrator;
mod plugin;
mod store;
mod watch;

pub use crate::{
    error::WebfontError,
    generator::{GeneratedFontSet, UrlMap, WebfontGenerator},
    options::{
        parse_files, parse_options, resolve_file_dest, FileType, FontFormat, GenerateFiles,
        NormalizedOptions, OneOrMany, RawOptions, TemplateOptions,
    },
    orchestrator::Orchestrator,
    plugin::{
        resolved_virtual_module_id, virtual_module_id, WebfontPlugin, DEFAULT_MODULE_ID,
        PLUGIN_NAME,
    },
    store::{ArtifactStore, GeneratedWebfont},
    watch::{CancelToken, WatchSession},
};
