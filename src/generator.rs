use std::collections::BTreeMap;
use std::fmt;

use crate::error::WebfontError;
use crate::options::{FontFormat, NormalizedOptions};

/// Mapping from a font format to the public URL the CSS should reference it
/// by.
pub type UrlMap = BTreeMap<FontFormat, String>;

type CssRenderer = Box<dyn Fn(Option<&UrlMap>) -> String + Send + Sync>;
type HtmlRenderer = Box<dyn Fn() -> String + Send + Sync>;

/// Everything a generation run produces: one binary buffer per requested
/// format, plus the two template renderers. The CSS renderer accepts an
/// optional [`UrlMap`] so `@font-face` sources can be rewritten to their
/// final served locations.
pub struct GeneratedFontSet {
    buffers: BTreeMap<FontFormat, Vec<u8>>,
    css: CssRenderer,
    html: HtmlRenderer,
}

impl GeneratedFontSet {
    pub fn new(
        buffers: BTreeMap<FontFormat, Vec<u8>>,
        css: impl Fn(Option<&UrlMap>) -> String + Send + Sync + 'static,
        html: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        GeneratedFontSet {
            buffers,
            css: Box::new(css),
            html: Box::new(html),
        }
    }

    pub fn buffer(&self, format: FontFormat) -> Option<&[u8]> {
        self.buffers.get(&format).map(Vec::as_slice)
    }

    pub fn formats(&self) -> impl Iterator<Item = FontFormat> + '_ {
        self.buffers.keys().copied()
    }

    pub fn render_css(&self, urls: Option<&UrlMap>) -> String {
        (self.css)(urls)
    }

    pub fn render_html(&self) -> String {
        (self.html)()
    }
}

impl fmt::Debug for GeneratedFontSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedFontSet")
            .field("formats", &self.buffers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The external font conversion engine. Implementations receive the
/// normalized options and are responsible for all glyph geometry, codepoint
/// assignment and binary format work.
pub trait WebfontGenerator: Send + Sync {
    fn generate(&self, options: &NormalizedOptions) -> Result<GeneratedFontSet, WebfontError>;
}
