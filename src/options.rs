//! Resolution of the user-facing plugin options into the exact configuration
//! the font generator consumes.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::WebfontError;

/// A font format the generator can produce. The declaration order of the
/// variants is the default generation (and CSS `src` declaration) order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    Eot,
    Woff,
    Woff2,
    Ttf,
    Svg,
}

impl FontFormat {
    pub const ALL: [FontFormat; 5] = [
        FontFormat::Eot,
        FontFormat::Woff,
        FontFormat::Woff2,
        FontFormat::Ttf,
        FontFormat::Svg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FontFormat::Eot => "eot",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::Ttf => "ttf",
            FontFormat::Svg => "svg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<FontFormat> {
        match ext {
            "eot" => Some(FontFormat::Eot),
            "woff" => Some(FontFormat::Woff),
            "woff2" => Some(FontFormat::Woff2),
            "ttf" => Some(FontFormat::Ttf),
            "svg" => Some(FontFormat::Svg),
            _ => None,
        }
    }
}

impl std::fmt::Display for FontFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A kind of artifact that may be persisted to disk during development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Css,
    Fonts,
}

pub(crate) const FILE_TYPE_OPTIONS: [FileType; 3] =
    [FileType::Html, FileType::Css, FileType::Fonts];

impl FileType {
    fn from_name(name: &str) -> Option<FileType> {
        match name {
            "html" => Some(FileType::Html),
            "css" => Some(FileType::Css),
            "fonts" => Some(FileType::Fonts),
            _ => None,
        }
    }
}

/// The `generate_files` toggle as users write it: a blanket boolean, one
/// artifact kind, or a list of kinds. Values are validated during
/// normalization so that an error can name every offending entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateFiles {
    Toggle(bool),
    Kind(String),
    Kinds(Vec<String>),
}

/// Accepts either a bare value or a list where the host config allows both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// User-facing plugin configuration. Everything except `context` is
/// optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Directory the SVG icon files are read from.
    pub context: PathBuf,
    /// Name of the font and base name of the font files. Defaults to
    /// `iconfont`.
    pub font_name: Option<String>,
    /// Directory for generated font files. Defaults to the `artifacts`
    /// sibling of `context`.
    pub dest: Option<PathBuf>,
    /// Globs, relative to `context`, of the SVG files to add into the
    /// webfont. Defaults to `*.svg`.
    pub files: Option<Vec<String>>,
    /// Font file formats to generate, in CSS `src` declaration order.
    /// Defaults to all five supported formats.
    pub types: Option<OneOrMany<FontFormat>>,
    /// Fixed codepoints for certain icons. Icons without an entry are
    /// assigned incrementally by the generator.
    pub codepoints: IndexMap<String, u32>,
    /// The output font height. Defaults to 1000.
    pub font_height: Option<u32>,
    /// Normalize icons by scaling them to the height of the highest icon.
    pub normalize: Option<bool>,
    /// SVG path rounding.
    pub round: Option<f64>,
    /// The font descent, for fixing the baseline by hand.
    pub descent: Option<i32>,
    /// Create a monospace font of the width of the largest input icon.
    pub fixed_width: Option<bool>,
    /// Calculate the bounds of a glyph and center it horizontally.
    pub center_horizontally: Option<bool>,
    /// Path for the generated CSS file. Relative to `dest` unless absolute;
    /// postfixed with the font name unless it names a file with an
    /// extension.
    pub css_dest: Option<PathBuf>,
    /// Path of a custom CSS template, relative to `dest`.
    pub css_template: Option<PathBuf>,
    /// Fonts path to use inside the generated CSS, relative to `dest`.
    pub css_fonts_url: Option<PathBuf>,
    /// Path for the generated HTML preview. Resolved like `css_dest`.
    pub html_dest: Option<PathBuf>,
    /// Path of a custom HTML template, relative to `dest`.
    pub html_template: Option<PathBuf>,
    /// CSS class prefix for each of the generated icons. Defaults to
    /// `icon-`.
    pub class_prefix: Option<String>,
    /// CSS base selector the font is applied to. Defaults to `.icon`.
    pub base_selector: Option<String>,
    /// Enable or disable the ligature function. Defaults to true.
    pub ligature: Option<bool>,
    /// Which artifact kinds are persisted to disk during development.
    pub generate_files: Option<GenerateFiles>,
    /// Arbitrary per-format options passed through to the generator.
    pub format_options: IndexMap<FontFormat, serde_json::Value>,
    /// Identity of the virtual CSS module, without the `virtual:` prefix.
    pub module_id: Option<String>,
    /// Embed the font binaries into the CSS as base64 data URIs instead of
    /// referencing external files.
    pub inline: bool,
    /// Allow disk persistence during production builds.
    pub allow_write_files_in_build: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateOptions {
    pub base_selector: String,
    pub class_prefix: String,
}

/// Generator-ready configuration. Produced once by [`parse_options`];
/// downstream components never reinterpret the raw option shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOptions {
    pub files: Vec<PathBuf>,
    pub types: Vec<FontFormat>,
    pub order: Vec<FontFormat>,
    pub font_name: String,
    pub font_height: u32,
    pub codepoints: IndexMap<String, u32>,
    pub template_options: TemplateOptions,
    pub html: bool,
    pub css: bool,
    pub ligature: bool,
    pub write_files: bool,
    pub format_options: IndexMap<FontFormat, serde_json::Value>,
    /// Destination directory, always slash-terminated.
    pub dest: String,
    pub css_dest: PathBuf,
    pub html_dest: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_template: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_fonts_url: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_template: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_width: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_horizontally: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descent: Option<i32>,
}

pub(crate) fn parse_icon_types(types: Option<&OneOrMany<FontFormat>>) -> Vec<FontFormat> {
    match types {
        Some(OneOrMany::Many(list)) => list.clone(),
        Some(OneOrMany::One(one)) => vec![*one],
        None => FontFormat::ALL.to_vec(),
    }
}

/// Expands the icon globs against `context` and joins the matches back onto
/// it. Fails when nothing matches: a webfont with no glyphs is never what
/// the user meant.
pub fn parse_files(options: &RawOptions) -> Result<Vec<PathBuf>, WebfontError> {
    let default_globs = vec!["*.svg".to_string()];
    let globs = options.files.as_ref().unwrap_or(&default_globs);
    let mut files = Vec::new();
    for pattern in globs {
        let full_pattern = options.context.join(pattern);
        for entry in glob::glob(&full_pattern.to_string_lossy())? {
            match entry {
                Ok(path) => files.push(path),
                Err(err) => {
                    log::warn!("Skipping unreadable match for {pattern}: {err}");
                }
            }
        }
    }
    if files.is_empty() {
        return Err(WebfontError::NoIconsAvailable {
            context: options.context.clone(),
        });
    }
    Ok(files)
}

/// Flattens the `generate_files` toggle into the list of artifact kinds it
/// names. Unrecognized values fail collectively, naming every offender.
pub(crate) fn build_file_type_list(
    generate_files: Option<&GenerateFiles>,
) -> Result<Vec<FileType>, WebfontError> {
    let raw: Vec<&str> = match generate_files {
        None | Some(GenerateFiles::Toggle(false)) => return Ok(vec![]),
        Some(GenerateFiles::Toggle(true)) => return Ok(FILE_TYPE_OPTIONS.to_vec()),
        Some(GenerateFiles::Kind(kind)) => vec![kind.as_str()],
        Some(GenerateFiles::Kinds(kinds)) => kinds.iter().map(String::as_str).collect(),
    };
    let mut parsed = Vec::new();
    let mut invalid = Vec::new();
    for value in raw {
        match FileType::from_name(value) {
            Some(file_type) => {
                if !parsed.contains(&file_type) {
                    parsed.push(file_type);
                }
            }
            None => invalid.push(value.to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(WebfontError::InvalidGenerateFiles { values: invalid });
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GenerateFlags {
    pub html: bool,
    pub css: bool,
    pub fonts: bool,
}

pub(crate) fn parse_generate_files_option(
    generate_files: Option<&GenerateFiles>,
) -> Result<GenerateFlags, WebfontError> {
    let list = build_file_type_list(generate_files)?;
    Ok(GenerateFlags {
        html: list.contains(&FileType::Html),
        css: list.contains(&FileType::Css),
        fonts: list.contains(&FileType::Fonts),
    })
}

fn has_file_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.rsplit_once('.').is_some_and(|(_, ext)| !ext.is_empty()))
}

/// Resolves a destination override against the global destination directory.
///
/// Without an override the file lands at `base/{font_name}.{ext}`. An
/// override naming a file (its last segment has an extension) is used
/// verbatim; one naming a directory gets `{font_name}.{ext}` appended. An
/// absolute override replaces `base` entirely. The font name is lower-cased
/// whenever it becomes part of the file name.
pub fn resolve_file_dest(
    base: &Path,
    file_dest: Option<&Path>,
    font_name: &str,
    extension: &str,
) -> PathBuf {
    let default_name = format!("{}.{}", font_name.to_lowercase(), extension);
    match file_dest {
        None => base.join(default_name),
        Some(dest) if has_file_extension(dest) => base.join(dest),
        Some(dest) => base.join(dest).join(default_name),
    }
}

/// Normalizes the raw options into the configuration the generator consumes.
///
/// Pure apart from glob expansion: identical options against an unchanged
/// filesystem produce an identical result.
pub fn parse_options(options: &RawOptions) -> Result<NormalizedOptions, WebfontError> {
    let formats = parse_icon_types(options.types.as_ref());
    let files = parse_files(options)?;
    let flags = parse_generate_files_option(options.generate_files.as_ref())?;

    let dest_dir = match &options.dest {
        Some(dest) => dest.clone(),
        None => match options.context.parent() {
            Some(parent) => parent.join("artifacts"),
            None => PathBuf::from("artifacts"),
        },
    };
    let mut dest = dest_dir.to_string_lossy().into_owned();
    if !dest.ends_with('/') {
        dest.push('/');
    }

    let font_name = options
        .font_name
        .clone()
        .unwrap_or_else(|| "iconfont".to_string());
    let dest_path = Path::new(&dest);

    Ok(NormalizedOptions {
        css_dest: resolve_file_dest(dest_path, options.css_dest.as_deref(), &font_name, "css"),
        html_dest: resolve_file_dest(dest_path, options.html_dest.as_deref(), &font_name, "html"),
        css_template: options.css_template.as_ref().map(|t| dest_path.join(t)),
        css_fonts_url: options.css_fonts_url.as_ref().map(|u| dest_path.join(u)),
        html_template: options.html_template.as_ref().map(|t| dest_path.join(t)),
        files,
        types: formats.clone(),
        order: formats,
        font_name,
        font_height: options.font_height.unwrap_or(1000),
        codepoints: options.codepoints.clone(),
        template_options: TemplateOptions {
            base_selector: options
                .base_selector
                .clone()
                .unwrap_or_else(|| ".icon".to_string()),
            class_prefix: options
                .class_prefix
                .clone()
                .unwrap_or_else(|| "icon-".to_string()),
        },
        html: flags.html,
        css: flags.css,
        ligature: options.ligature.unwrap_or(true),
        write_files: flags.fonts,
        format_options: options.format_options.clone(),
        dest,
        fixed_width: options.fixed_width,
        center_horizontally: options.center_horizontally,
        normalize: options.normalize,
        round: options.round,
        descent: options.descent,
    })
}
