//! End-to-end lifecycle scenarios against a stub font generator and a fake
//! host.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pretty_assertions::assert_eq;
use regex::Regex;
use svg2webfont::host::{
    AssetEmitter, BuildMode, BundleAsset, BundlerPlugin, DevServer, FontResponder, FontResponse,
    HotReload, ResolvedConfig,
};
use svg2webfont::{
    FontFormat, GeneratedFontSet, NormalizedOptions, RawOptions, UrlMap, WebfontError,
    WebfontGenerator, WebfontPlugin,
};

/// Produces deterministic per-format buffers tagged with the icon count, and
/// renders CSS following the real generator's url-with-query convention.
struct StubGenerator;

impl WebfontGenerator for StubGenerator {
    fn generate(&self, options: &NormalizedOptions) -> Result<GeneratedFontSet, WebfontError> {
        let icons = options.files.len();
        let buffers: BTreeMap<FontFormat, Vec<u8>> = options
            .types
            .iter()
            .map(|format| {
                (
                    *format,
                    format!("{}-{format}-{icons}icons", options.font_name).into_bytes(),
                )
            })
            .collect();
        let names: Vec<String> = options
            .files
            .iter()
            .filter_map(|f| f.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        let font_name = options.font_name.clone();
        let order = options.order.clone();
        let css = move |urls: Option<&UrlMap>| {
            let src = order
                .iter()
                .map(|format| {
                    let url = urls
                        .and_then(|u| u.get(format).cloned())
                        .unwrap_or_else(|| format!("{font_name}.{format}"));
                    format!("url(\"{url}?cachebust\") format(\"{format}\")")
                })
                .collect::<Vec<_>>()
                .join(",");
            format!("@font-face{{font-family:{font_name};src:{src};}}")
        };
        let html = move || {
            let items: String = names.iter().map(|n| format!("<li>{n}</li>")).collect();
            format!("<!doctype html><ul>{items}</ul>")
        };
        Ok(GeneratedFontSet::new(buffers, css, html))
    }
}

#[derive(Default)]
struct RecordingHot(Mutex<Vec<String>>);

impl HotReload for RecordingHot {
    fn reload_module(&self, resolved_id: &str) -> bool {
        self.0.lock().unwrap().push(resolved_id.to_string());
        true
    }
}

struct FakeDevServer {
    routes: HashMap<String, FontResponder>,
    hot: Arc<RecordingHot>,
}

impl Default for FakeDevServer {
    fn default() -> Self {
        FakeDevServer {
            routes: HashMap::new(),
            hot: Arc::new(RecordingHot::default()),
        }
    }
}

impl DevServer for FakeDevServer {
    fn mount(&mut self, route: String, responder: FontResponder) {
        self.routes.insert(route, responder);
    }

    fn hot_reload(&self) -> Arc<dyn HotReload> {
        self.hot.clone()
    }
}

impl FakeDevServer {
    fn get(&self, route: &str) -> FontResponse {
        match self.routes.get(route) {
            Some(responder) => responder(),
            None => FontResponse::not_found(),
        }
    }
}

#[derive(Default)]
struct FakeEmitter {
    assets: Vec<(String, Vec<u8>)>,
}

impl AssetEmitter for FakeEmitter {
    fn emit_file(&mut self, name: &str, source: &[u8]) {
        self.assets.push((name.to_string(), source.to_vec()));
    }
}

fn icon_dir() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    for name in ["add.svg", "calendar.svg"] {
        std::fs::write(dir.path().join(name), "<svg></svg>").unwrap();
    }
    dir
}

fn plugin(context: &Path, mutate: impl FnOnce(&mut RawOptions)) -> WebfontPlugin {
    let mut options = RawOptions {
        context: context.to_path_buf(),
        ..Default::default()
    };
    mutate(&mut options);
    WebfontPlugin::new(options, Box::new(StubGenerator)).unwrap()
}

#[test]
fn dev_server_serves_fonts_and_the_virtual_module() {
    let icons = icon_dir();
    let plugin = plugin(icons.path(), |_| {});
    plugin.config_resolved(&ResolvedConfig {
        mode: BuildMode::Serve,
    });
    let mut server = FakeDevServer::default();
    plugin.configure_server(&mut server);

    // Nothing has been generated yet.
    assert_eq!(server.get("/iconfont.woff2").status, 404);
    let resolved = plugin.resolve_id("virtual:svg2webfont.css").unwrap();
    assert_eq!(plugin.transform("", &resolved), Some(String::new()));

    plugin.build_start().unwrap();

    let response = server.get("/iconfont.woff2");
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, Some("font/woff2"));
    assert_eq!(response.content_length, Some(response.body.len()));
    assert_eq!(response.body, b"iconfont-woff2-2icons".to_vec());

    assert_eq!(plugin.load(&resolved), Some(resolved.clone()));
    assert_eq!(plugin.resolve_id("some/other/module.ts"), None);
    let css = plugin.transform("", &resolved).unwrap();
    let head = Regex::new(r"^@font-face\{font-family:iconfont;").unwrap();
    assert!(head.is_match(&css), "unexpected module content: {css}");

    plugin.build_end();
}

#[test]
fn adding_an_icon_regenerates_and_hot_reloads() {
    let icons = icon_dir();
    let plugin = plugin(icons.path(), |_| {});
    plugin.config_resolved(&ResolvedConfig {
        mode: BuildMode::Serve,
    });
    let mut server = FakeDevServer::default();
    plugin.configure_server(&mut server);
    plugin.build_start().unwrap();
    assert_eq!(server.get("/iconfont.ttf").body, b"iconfont-ttf-2icons".to_vec());

    std::fs::write(icons.path().join("home.svg"), "<svg></svg>").unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while server.hot.0.lock().unwrap().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    let reloads = server.hot.0.lock().unwrap().clone();
    assert!(!reloads.is_empty(), "no hot reload arrived");
    assert_eq!(reloads[0], *plugin.resolved_module_id());
    assert_eq!(server.get("/iconfont.ttf").body, b"iconfont-ttf-3icons".to_vec());

    plugin.build_end();
}

#[test]
fn build_emits_one_asset_per_format_reachable_from_the_css() {
    let icons = icon_dir();
    let plugin = plugin(icons.path(), |_| {});
    plugin.config_resolved(&ResolvedConfig {
        mode: BuildMode::Build,
    });
    plugin.build_start().unwrap();

    let mut emitter = FakeEmitter::default();
    plugin.render_start(&mut emitter).unwrap();
    assert_eq!(emitter.assets.len(), 5);
    for (name, bytes) in &emitter.assets {
        assert!(name.starts_with("iconfont-"), "unexpected asset {name}");
        assert!(String::from_utf8_lossy(bytes).ends_with("-2icons"));
    }

    // The host stamps each asset into its output directory.
    let bundle: Vec<BundleAsset> = emitter
        .assets
        .iter()
        .map(|(name, _)| BundleAsset {
            name: name.clone(),
            file_name: format!("assets/{name}"),
        })
        .collect();
    plugin.generate_bundle(&bundle);

    let webfonts = plugin.generated_webfonts();
    assert_eq!(webfonts.len(), 5);
    let formats: Vec<FontFormat> = webfonts.iter().map(|w| w.format).collect();
    assert_eq!(formats, FontFormat::ALL.to_vec());

    let resolved = plugin.resolve_id("virtual:svg2webfont.css").unwrap();
    let css = plugin.transform("", &resolved).unwrap();
    for webfont in &webfonts {
        assert!(
            webfont.href.starts_with("/assets/iconfont-"),
            "unexpected href {}",
            webfont.href
        );
        assert!(
            css.contains(&webfont.href),
            "{} is not referenced by the css: {css}",
            webfont.href
        );
    }

    plugin.build_end();
}

#[test]
fn inline_build_embeds_every_buffer_as_a_data_uri() {
    let icons = icon_dir();
    let plugin = plugin(icons.path(), |options| options.inline = true);
    plugin.config_resolved(&ResolvedConfig {
        mode: BuildMode::Build,
    });
    plugin.build_start().unwrap();

    // Inline mode serves nothing over middleware and emits no assets.
    let mut server = FakeDevServer::default();
    plugin.configure_server(&mut server);
    assert!(server.routes.is_empty());
    let mut emitter = FakeEmitter::default();
    plugin.render_start(&mut emitter).unwrap();
    assert!(emitter.assets.is_empty());
    assert!(plugin.generated_webfonts().is_empty());

    let resolved = plugin.resolve_id("virtual:svg2webfont.css").unwrap();
    let css = plugin.transform("", &resolved).unwrap();
    assert!(!css.contains("?cachebust"));
    for format in FontFormat::ALL {
        let bytes = format!("iconfont-{format}-2icons").into_bytes();
        let expected = format!(
            "url(\"data:{};charset=utf-8;base64,{}\")",
            svg2webfont::assets::mime_type(format),
            BASE64.encode(&bytes)
        );
        assert!(css.contains(&expected), "missing {format} data uri in {css}");
        // The decoded payload is byte-identical to the generated buffer.
        let encoded = expected
            .split("base64,")
            .nth(1)
            .and_then(|rest| rest.strip_suffix("\")"))
            .unwrap();
        assert_eq!(BASE64.decode(encoded).unwrap(), bytes);
    }

    plugin.build_end();
}

#[test]
fn the_module_id_is_configurable() {
    let icons = icon_dir();
    let plugin = plugin(icons.path(), |options| {
        options.module_id = Some("my-icons.css".to_string())
    });
    assert!(plugin.resolve_id("virtual:svg2webfont.css").is_none());
    let resolved = plugin.resolve_id("virtual:my-icons.css").unwrap();
    assert_eq!(resolved, *plugin.resolved_module_id());
}

#[test]
fn configuration_errors_abort_before_any_build_work() {
    let empty = tempfile::TempDir::new().unwrap();
    let err = WebfontPlugin::new(
        RawOptions {
            context: empty.path().to_path_buf(),
            ..Default::default()
        },
        Box::new(StubGenerator),
    )
    .unwrap_err();
    assert!(matches!(err, WebfontError::NoIconsAvailable { .. }));

    let icons = icon_dir();
    let err = WebfontPlugin::new(
        RawOptions {
            context: icons.path().to_path_buf(),
            generate_files: Some(svg2webfont::GenerateFiles::Kind("bogus".to_string())),
            ..Default::default()
        },
        Box::new(StubGenerator),
    )
    .unwrap_err();
    assert!(err.to_string().contains("bogus"));
}
