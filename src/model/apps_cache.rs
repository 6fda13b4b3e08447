use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::sys::window_system::{RunningApp, WindowSystem, pid_t};

/// Memoized list of regular applications plus a pid index into it.
///
/// The cache is either fully valid or fully stale; [`AppsCache::invalidate`]
/// drops everything at once and the next [`AppsCache::ensure_valid`]
/// repopulates both structures together. Windows are never cached here.
#[derive(Debug, Default)]
pub struct AppsCache {
    valid: bool,
    apps: Vec<RunningApp>,
    by_pid: HashMap<pid_t, usize>,
}

impl AppsCache {
    pub fn new() -> Self { Self::default() }

    pub fn is_valid(&self) -> bool { self.valid }

    pub fn invalidate(&mut self) {
        if self.valid {
            trace!("Invalidating apps cache");
        }
        self.valid = false;
        self.apps.clear();
        self.by_pid.clear();
    }

    /// Repopulates from the window system if stale. Returns whether a
    /// refresh happened.
    pub fn ensure_valid<S: WindowSystem + ?Sized>(&mut self, system: &S) -> bool {
        if self.valid {
            return false;
        }
        self.apps = system.regular_apps();
        self.by_pid = self.apps.iter().enumerate().map(|(idx, app)| (app.pid, idx)).collect();
        self.valid = true;
        debug!(count = self.apps.len(), "Refreshed apps cache");
        true
    }

    pub fn apps(&self) -> &[RunningApp] { &self.apps }

    pub fn get(&self, pid: pid_t) -> Option<&RunningApp> {
        self.by_pid.get(&pid).map(|&idx| &self.apps[idx])
    }

    pub fn find_bundle(&self, bundle_id: &str) -> Option<&RunningApp> {
        self.apps.iter().find(|app| app.bundle_id.as_deref() == Some(bundle_id))
    }
}
