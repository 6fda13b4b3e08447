use tracing::debug;

use crate::actor::reactor::Reactor;
use crate::sys::window_system::{WindowSystem, pid_t};

pub struct AppEventHandler;

impl AppEventHandler {
    pub fn handle_app_launched<S: WindowSystem>(reactor: &mut Reactor<S>, pid: pid_t) {
        debug!(pid, "App launched");
        reactor.apps.invalidate();
        reactor.schedule_retile();
    }

    pub fn handle_app_terminated<S: WindowSystem>(reactor: &mut Reactor<S>, pid: pid_t) {
        debug!(pid, "App terminated");
        reactor.apps.invalidate();
        reactor.schedule_retile();
    }

    /// Hidden apps drop out of enumeration, so the cached flags go stale.
    pub fn handle_app_visibility_changed<S: WindowSystem>(reactor: &mut Reactor<S>, pid: pid_t) {
        debug!(pid, "App visibility changed");
        reactor.apps.invalidate();
        reactor.schedule_retile();
    }

    pub fn handle_app_activated<S: WindowSystem>(reactor: &mut Reactor<S>, pid: pid_t) {
        debug!(pid, "App activated");
        reactor.refresh_border();
    }
}
