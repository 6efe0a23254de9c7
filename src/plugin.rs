//! Lifecycle glue binding the orchestrator, store and watch loop to the
//! host's plugin hooks.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;

use crate::assets;
use crate::error::WebfontError;
use crate::generator::{UrlMap, WebfontGenerator};
use crate::host::{
    AssetEmitter, BuildMode, BundleAsset, BundlerPlugin, DevServer, FontResponse, HotReload,
    ResolvedConfig,
};
use crate::options::RawOptions;
use crate::orchestrator::Orchestrator;
use crate::store::{ArtifactStore, GeneratedWebfont};
use crate::watch::{CancelToken, WatchSession};

pub const PLUGIN_NAME: &str = "svg2webfont";
pub const DEFAULT_MODULE_ID: &str = "svg2webfont.css";

pub fn virtual_module_id(module_id: &str) -> String {
    format!("virtual:{module_id}")
}

/// Internal form of a virtual module id, marked so other plugins leave it
/// alone.
pub fn resolved_virtual_module_id(virtual_id: &str) -> String {
    format!("\0{virtual_id}")
}

/// A webfont plugin instance. All state is owned here; two instances in one
/// build (say, two icon sets) never interfere.
pub struct WebfontPlugin {
    orchestrator: Arc<Orchestrator>,
    store: Arc<ArtifactStore>,
    inline: bool,
    virtual_id: String,
    resolved_id: String,
    state: Arc<Mutex<LifecycleState>>,
}

impl std::fmt::Debug for WebfontPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebfontPlugin")
            .field("inline", &self.inline)
            .field("virtual_id", &self.virtual_id)
            .field("resolved_id", &self.resolved_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct LifecycleState {
    watch: Option<WatchSession>,
    staging: Option<TempDir>,
    hot_reload: Option<Arc<dyn HotReload>>,
    /// Webfonts staged to the temp directory, hrefs still pointing there.
    staged: Vec<GeneratedWebfont>,
    /// Webfonts at their final bundle locations.
    emitted: Vec<GeneratedWebfont>,
}

impl WebfontPlugin {
    /// Builds a plugin instance, normalizing the options up front so an
    /// empty icon set or a malformed `generate_files` value aborts before
    /// any build work starts.
    pub fn new(
        options: RawOptions,
        generator: Box<dyn WebfontGenerator>,
    ) -> Result<WebfontPlugin, WebfontError> {
        let module_id = options
            .module_id
            .clone()
            .unwrap_or_else(|| DEFAULT_MODULE_ID.to_string());
        let inline = options.inline;
        let virtual_id = virtual_module_id(&module_id);
        let resolved_id = resolved_virtual_module_id(&virtual_id);
        let store = Arc::new(ArtifactStore::default());
        let orchestrator = Arc::new(Orchestrator::new(options, generator, store.clone())?);
        Ok(WebfontPlugin {
            orchestrator,
            store,
            inline,
            virtual_id,
            resolved_id,
            state: Arc::new(Mutex::new(LifecycleState::default())),
        })
    }

    /// Format and public location of every webfont the current build has
    /// emitted.
    pub fn generated_webfonts(&self) -> Vec<GeneratedWebfont> {
        self.lock_state().emitted.clone()
    }

    pub fn resolved_module_id(&self) -> &str {
        &self.resolved_id
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current content of the virtual CSS module: empty until the first
    /// generation completes.
    fn module_css(&self) -> String {
        let Some(set) = self.store.snapshot() else {
            return String::new();
        };
        let refs = self.store.file_refs();
        let css = set.render_css(refs.as_ref());
        if self.inline {
            assets::inline_font_urls(&css, &set)
        } else {
            css
        }
    }

    fn start_watching(&self) -> Result<(), WebfontError> {
        let orchestrator = self.orchestrator.clone();
        let resolved_id = self.resolved_id.clone();
        // Weak, because the state owns the watch session whose thread owns
        // this handler; a strong handle would keep the session alive
        // forever.
        let state = Arc::downgrade(&self.state);
        let handler = move || {
            if let Err(err) = orchestrator.generate(true) {
                log::warn!("Webfont regeneration failed: {err}");
                return;
            }
            let hot_reload = state.upgrade().and_then(|state| {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .hot_reload
                    .clone()
            });
            if let Some(hot_reload) = hot_reload {
                if !hot_reload.reload_module(&resolved_id) {
                    log::debug!("{resolved_id} is not in the module graph yet");
                }
            }
        };
        let session =
            WatchSession::spawn(self.orchestrator.context(), CancelToken::new(), handler)?;
        self.lock_state().watch = Some(session);
        Ok(())
    }

    /// Writes each font buffer to the staging directory under a
    /// content-hashed name and points the file references at it, so the
    /// CSS rendered during the build reaches the staged copies until the
    /// bundle assigns final locations.
    fn stage_build_assets(&self) -> Result<(), WebfontError> {
        let Some(set) = self.store.snapshot() else {
            return Ok(());
        };
        let staging = TempDir::new()?;
        let opts = self.orchestrator.options();
        let mut refs = UrlMap::new();
        let mut staged = Vec::new();
        for format in opts.types.iter().copied() {
            let Some(bytes) = set.buffer(format) else {
                return Err(WebfontError::Generator(
                    format!("the generator produced no {format} buffer").into(),
                ));
            };
            let file_name = assets::staged_file_name(&opts.font_name, bytes, format);
            let path = staging.path().join(&file_name);
            if let Err(err) = assets::ensure_dir_write(&path, bytes) {
                log::warn!("Could not stage {}: {err}", path.display());
            }
            let href = path.to_string_lossy().into_owned();
            staged.push(GeneratedWebfont {
                format,
                href: href.clone(),
            });
            refs.insert(format, href);
        }
        self.store.set_file_refs(Some(refs));
        let mut state = self.lock_state();
        state.staging = Some(staging);
        state.staged = staged;
        Ok(())
    }
}

impl BundlerPlugin for WebfontPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn config_resolved(&self, config: &ResolvedConfig) {
        self.orchestrator.set_mode(config.mode);
    }

    fn resolve_id(&self, id: &str) -> Option<String> {
        (id == self.virtual_id).then(|| self.resolved_id.clone())
    }

    fn load(&self, id: &str) -> Option<String> {
        // The marker is handed back so the transform hook supplies the
        // actual CSS.
        (id == self.resolved_id).then(|| self.resolved_id.clone())
    }

    fn transform(&self, _code: &str, id: &str) -> Option<String> {
        (id == self.resolved_id).then(|| self.module_css())
    }

    fn build_start(&self) -> Result<(), WebfontError> {
        if self.orchestrator.mode() == BuildMode::Serve {
            self.start_watching()?;
        }
        // The first generation has no fallback snapshot, so its failure is
        // fatal to the whole build.
        self.orchestrator.generate(false)?;
        if self.orchestrator.mode() == BuildMode::Build && !self.inline {
            self.stage_build_assets()?;
        }
        Ok(())
    }

    fn configure_server(&self, server: &mut dyn DevServer) {
        if self.inline {
            return;
        }
        self.lock_state().hot_reload = Some(server.hot_reload());
        let opts = self.orchestrator.options();
        for format in opts.types.iter().copied() {
            let store = self.store.clone();
            let route = format!("/{}.{}", opts.font_name, format.extension());
            server.mount(
                route,
                Box::new(move || {
                    let Some(set) = store.snapshot() else {
                        return FontResponse::not_found();
                    };
                    match set.buffer(format) {
                        Some(bytes) => FontResponse::ok(assets::mime_type(format), bytes.to_vec()),
                        None => FontResponse::not_found(),
                    }
                }),
            );
        }
    }

    fn render_start(&self, emitter: &mut dyn AssetEmitter) -> Result<(), WebfontError> {
        if self.orchestrator.mode() != BuildMode::Build || self.inline {
            return Ok(());
        }
        let Some(set) = self.store.snapshot() else {
            return Ok(());
        };
        let state = self.lock_state();
        for webfont in &state.staged {
            let Some(name) = Path::new(&webfont.href).file_name().and_then(OsStr::to_str) else {
                continue;
            };
            if let Some(bytes) = set.buffer(webfont.format) {
                emitter.emit_file(name, bytes);
            }
        }
        Ok(())
    }

    fn generate_bundle(&self, bundle: &[BundleAsset]) {
        let mut state = self.lock_state();
        let mut refs = UrlMap::new();
        let mut emitted = Vec::new();
        for staged in &state.staged {
            if let Some(asset) = bundle.iter().find(|a| staged.href.ends_with(&a.name)) {
                let href = format!("/{}", asset.file_name);
                refs.insert(staged.format, href.clone());
                emitted.push(GeneratedWebfont {
                    format: staged.format,
                    href,
                });
            }
        }
        state.emitted.extend(emitted);
        drop(state);
        if !refs.is_empty() {
            self.store.set_file_refs(Some(refs));
        }
    }

    fn build_end(&self) {
        // The watch session must leave the lock before it is dropped: the
        // drop joins the drain thread, and a regeneration handler on that
        // thread may be about to take the same lock.
        let (watch, staging) = {
            let mut state = self.lock_state();
            state.hot_reload.take();
            (state.watch.take(), state.staging.take())
        };
        drop(watch);
        // Dropping the staging directory removes it, best effort.
        drop(staging);
    }
}
