//! Cancellable filesystem watch over the icon source directory.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::error::WebfontError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative cancellation signal shared between a watch session and its
/// owner. Cancelling is one-way and idempotent.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One watch loop over an icon directory. Events are drained on a dedicated
/// thread, one at a time in arrival order; each qualifying event triggers
/// the handler exactly once. The session owns no font data.
pub struct WatchSession {
    token: CancelToken,
    watcher: Option<RecommendedWatcher>,
    thread: Option<JoinHandle<()>>,
}

impl WatchSession {
    /// Starts watching `dir`. Errors registering the watch (a missing
    /// directory, exhausted inotify handles) are fatal and surface here;
    /// anything after that only ever ends the loop cleanly.
    pub fn spawn(
        dir: &Path,
        token: CancelToken,
        handler: impl Fn() + Send + 'static,
    ) -> Result<WatchSession, WebfontError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher =
            notify::recommended_watcher(move |event: Result<Event, notify::Error>| {
                let _ = tx.send(event);
            })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        log::debug!("Watching {} for new icons", dir.display());
        let dir = dir.to_path_buf();
        let loop_token = token.clone();
        let thread = std::thread::spawn(move || drain_events(&dir, &rx, &loop_token, handler));
        Ok(WatchSession {
            token,
            watcher: Some(watcher),
            thread: Some(thread),
        })
    }

    /// Cancels the loop and waits for it to wind down. Dropping the session
    /// does the same.
    pub fn stop(&mut self) {
        self.token.cancel();
        // Dropping the watcher disconnects the event channel, so the drain
        // thread wakes up even with no traffic.
        self.watcher.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) fn drain_events(
    dir: &Path,
    events: &Receiver<Result<Event, notify::Error>>,
    token: &CancelToken,
    handler: impl Fn(),
) {
    while !token.is_cancelled() {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                if is_icon_added(dir, &event) {
                    handler();
                }
            }
            Ok(Err(err)) => log::warn!("Watcher reported an error: {err}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn is_rename(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Decides whether an event means "a new icon is available": the change
/// must be a creation or rename, name a `.svg` file, and that file must
/// still be readable when we look. The readability check runs at decision
/// time rather than trusting the event, since a file renamed away again
/// between the two is not an error, just a non-event.
pub(crate) fn is_icon_added(dir: &Path, event: &Event) -> bool {
    if !is_rename(&event.kind) {
        return false;
    }
    let Some(path) = event
        .paths
        .iter()
        .find(|p| p.extension().is_some_and(|ext| ext == "svg"))
    else {
        return false;
    };
    std::fs::File::open(dir.join(path)).is_ok()
}
