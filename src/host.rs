//! The contract between this plugin and its host bundler/dev-server. The
//! host side is an external collaborator; these are the interfaces it is
//! expected to provide and call, not an implementation of one.

use std::sync::Arc;

use crate::error::WebfontError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Development server: artifacts are kept in memory and served over
    /// middleware, regenerating as the icon directory changes.
    Serve,
    /// Production build: artifacts are emitted through the host's asset
    /// pipeline.
    Build,
}

/// The subset of the host's resolved configuration the plugin cares about.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedConfig {
    pub mode: BuildMode,
}

/// Handle into the host's module graph for triggering hot updates.
pub trait HotReload: Send + Sync {
    /// Requests a hot update of the module with the given resolved id.
    /// Returns false when the module is not (yet) part of the graph.
    fn reload_module(&self, resolved_id: &str) -> bool;
}

/// Response produced by a mounted font route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub content_length: Option<usize>,
    pub body: Vec<u8>,
}

impl FontResponse {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        FontResponse {
            status: 200,
            content_type: Some(content_type),
            content_length: Some(body.len()),
            body,
        }
    }

    pub fn not_found() -> Self {
        FontResponse {
            status: 404,
            content_type: None,
            content_length: None,
            body: vec![],
        }
    }
}

pub type FontResponder = Box<dyn Fn() -> FontResponse + Send + Sync>;

/// Development server surface: route mounting plus access to hot reload.
pub trait DevServer {
    fn mount(&mut self, route: String, responder: FontResponder);
    fn hot_reload(&self) -> Arc<dyn HotReload>;
}

/// Host asset pipeline: registers a named asset for emission. The final
/// hashed location the host assigns is reported back through the bundle at
/// `generate_bundle` time.
pub trait AssetEmitter {
    fn emit_file(&mut self, name: &str, source: &[u8]);
}

/// One output entry of the host's finished bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAsset {
    /// The name the asset was emitted under.
    pub name: String,
    /// The final, hash-stamped file name the host assigned.
    pub file_name: String,
}

/// The lifecycle hooks the plugin registers with its host, in the order the
/// host calls them. All hooks default to no-ops so host adapters only wire
/// what they support.
pub trait BundlerPlugin {
    fn name(&self) -> &'static str;

    /// Called once the host configuration is final; tells the plugin
    /// whether this is a dev-server run or a production build.
    fn config_resolved(&self, config: &ResolvedConfig);

    fn resolve_id(&self, _id: &str) -> Option<String> {
        None
    }

    fn load(&self, _id: &str) -> Option<String> {
        None
    }

    fn transform(&self, _code: &str, _id: &str) -> Option<String> {
        None
    }

    fn build_start(&self) -> Result<(), WebfontError> {
        Ok(())
    }

    fn configure_server(&self, _server: &mut dyn DevServer) {}

    /// Called before the host writes the final bundle; the place to emit
    /// assets.
    fn render_start(&self, _emitter: &mut dyn AssetEmitter) -> Result<(), WebfontError> {
        Ok(())
    }

    /// Called with the finished bundle so emitted assets can be mapped to
    /// their final public locations.
    fn generate_bundle(&self, _bundle: &[BundleAsset]) {}

    fn build_end(&self);
}
