use tracing::{debug, info};

use crate::actor::reactor::Reactor;
use crate::common::config::Settings;
use crate::model::Display;
use crate::sys::window_system::WindowSystem;

pub struct SystemEventHandler;

impl SystemEventHandler {
    pub fn handle_space_changed<S: WindowSystem>(reactor: &mut Reactor<S>) {
        reactor.schedule_retile();
    }

    pub fn handle_displays_changed<S: WindowSystem>(
        reactor: &mut Reactor<S>,
        mut displays: Vec<Display>,
    ) {
        for (index, display) in displays.iter_mut().enumerate() {
            display.index = index;
        }
        info!(count = displays.len(), "Displays changed");
        reactor.displays = displays;
        reactor.schedule_retile();
    }

    pub fn handle_focused_window_changed<S: WindowSystem>(reactor: &mut Reactor<S>) {
        reactor.schedule_retile();
    }

    pub fn handle_retile_timer<S: WindowSystem>(reactor: &mut Reactor<S>) {
        let pass = reactor.retile.begin_pass();
        debug!(pass, "Retiling");
        reactor.retile_all();
        reactor.refresh_border();
    }

    pub fn handle_config_reloaded<S: WindowSystem>(reactor: &mut Reactor<S>, settings: Settings) {
        info!("Applying reloaded settings");
        reactor.floating.apply_settings(&settings.floating);
        reactor.settings = settings;
        reactor.schedule_retile();
    }
}
