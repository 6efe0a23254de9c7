use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::generator::{GeneratedFontSet, UrlMap};
use crate::options::FontFormat;

/// A generated webfont and the externally visible location it is served
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedWebfont {
    pub format: FontFormat,
    pub href: String,
}

/// Holds the most recently generated font set together with the current
/// format-to-URL references.
///
/// A successful generation swaps the snapshot in whole, so readers either
/// see the previous complete set or the new one, never a partial update. A
/// reader racing a regeneration may observe the previous snapshot; the hot
/// reload that follows every successful regeneration makes it re-fetch.
#[derive(Default)]
pub struct ArtifactStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    snapshot: Option<Arc<GeneratedFontSet>>,
    file_refs: Option<UrlMap>,
}

impl ArtifactStore {
    pub fn install(&self, set: Arc<GeneratedFontSet>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = Some(set);
    }

    pub fn snapshot(&self) -> Option<Arc<GeneratedFontSet>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    pub fn set_file_refs(&self, refs: Option<UrlMap>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .file_refs = refs;
    }

    pub fn file_refs(&self) -> Option<UrlMap> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .file_refs
            .clone()
    }
}
