use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use crate::assets;
use crate::error::WebfontError;
use crate::generator::{GeneratedFontSet, WebfontGenerator};
use crate::host::BuildMode;
use crate::options::{self, NormalizedOptions, RawOptions};
use crate::store::ArtifactStore;

/// Runs generation cycles: hands the normalized options to the external
/// generator, swaps the resulting set into the [`ArtifactStore`], and
/// applies the disk-persistence policy.
///
/// Persistence policy: the generator itself writes font files when
/// `write_files` is set. Rendered CSS/HTML is written by this orchestrator,
/// in serve mode only, when the corresponding `css`/`html` flag is set and
/// the generator was not already asked to write files. Production builds
/// never persist unless `allow_write_files_in_build` is set; their
/// artifacts flow through the bundler instead.
pub struct Orchestrator {
    raw: RawOptions,
    options: Mutex<NormalizedOptions>,
    generator: Box<dyn WebfontGenerator>,
    store: Arc<ArtifactStore>,
    mode: OnceLock<BuildMode>,
}

impl Orchestrator {
    /// Normalizes the options eagerly so configuration errors surface
    /// before any build work starts.
    pub fn new(
        raw: RawOptions,
        generator: Box<dyn WebfontGenerator>,
        store: Arc<ArtifactStore>,
    ) -> Result<Orchestrator, WebfontError> {
        let normalized = options::parse_options(&raw)?;
        Ok(Orchestrator {
            raw,
            options: Mutex::new(normalized),
            generator,
            store,
            mode: OnceLock::new(),
        })
    }

    pub fn set_mode(&self, mode: BuildMode) {
        let _ = self.mode.set(mode);
    }

    pub fn mode(&self) -> BuildMode {
        self.mode.get().copied().unwrap_or(BuildMode::Serve)
    }

    pub fn context(&self) -> &Path {
        &self.raw.context
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn options(&self) -> NormalizedOptions {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs one generation cycle. With `refresh_files` the icon globs are
    /// re-expanded first, so files added since the last cycle join the
    /// font. On failure the store keeps its previous snapshot.
    pub fn generate(&self, refresh_files: bool) -> Result<(), WebfontError> {
        if refresh_files {
            let files = options::parse_files(&self.raw)?;
            self.options
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .files = files;
        }
        let mut opts = self.options();
        let is_build = self.mode() == BuildMode::Build;
        if is_build && !self.raw.allow_write_files_in_build {
            opts.write_files = false;
        }

        let started = Instant::now();
        let set = Arc::new(self.generator.generate(&opts)?);
        log::info!(
            "Generated webfont {} from {} icons in {:.2?}",
            opts.font_name,
            opts.files.len(),
            started.elapsed()
        );
        self.store.install(set.clone());

        if !is_build && !opts.write_files && (opts.css || opts.html) {
            self.persist_rendered(&opts, &set);
        }
        Ok(())
    }

    // Best effort: a failed write is worth a warning, never a failed cycle.
    fn persist_rendered(&self, opts: &NormalizedOptions, set: &GeneratedFontSet) {
        if opts.css {
            let css = set.render_css(None);
            let css = if self.raw.inline {
                assets::inline_font_urls(&css, set)
            } else {
                css
            };
            if let Err(err) = assets::ensure_dir_write(&opts.css_dest, css.as_bytes()) {
                log::warn!("Could not write {}: {err}", opts.css_dest.display());
            }
        }
        if opts.html {
            let html = set.render_html();
            if let Err(err) = assets::ensure_dir_write(&opts.html_dest, html.as_bytes()) {
                log::warn!("Could not write {}: {err}", opts.html_dest.display());
            }
        }
    }
}
