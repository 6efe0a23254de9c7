//! Helpers for turning generated buffers into servable artifacts: MIME
//! types, content hashing, staged file naming and data-URI inlining.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::{Captures, Regex};

use crate::generator::GeneratedFontSet;
use crate::options::FontFormat;

pub fn mime_type(format: FontFormat) -> &'static str {
    match format {
        FontFormat::Eot => "application/vnd.ms-fontobject",
        FontFormat::Svg => "image/svg+xml",
        FontFormat::Ttf => "application/x-font-ttf",
        FontFormat::Woff => "application/font-woff",
        FontFormat::Woff2 => "font/woff2",
    }
}

// Matches the generator's URL convention: a quoted url() whose file
// extension is followed by a cache-busting query string.
#[allow(clippy::unwrap_used)]
static FONT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\("[^"]*?\.([^?."/]+)\?[^"]*"\)"#).unwrap()
});

/// Rewrites every font URL in `css` into a `data:` URI carrying the
/// base64-encoded bytes of that format's buffer. URLs whose extension is
/// not a known font format are left alone.
pub fn inline_font_urls(css: &str, set: &GeneratedFontSet) -> String {
    FONT_URL_RE
        .replace_all(css, |caps: &Captures| {
            let resolved = FontFormat::from_extension(&caps[1])
                .and_then(|format| set.buffer(format).map(|bytes| (format, bytes)));
            match resolved {
                Some((format, bytes)) => format!(
                    "url(\"data:{};charset=utf-8;base64,{}\")",
                    mime_type(format),
                    BASE64.encode(bytes)
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Content hash used to give emitted font files cache-busting names.
pub fn buffer_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex()[..16].to_string()
}

pub fn staged_file_name(font_name: &str, bytes: &[u8], format: FontFormat) -> String {
    format!(
        "{font_name}-{}.{}",
        buffer_hash(bytes),
        format.extension()
    )
}

/// Writes `contents` to `dest`, creating parent directories as needed.
pub fn ensure_dir_write(dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, contents)
}
