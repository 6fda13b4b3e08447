use tracing::{debug, info};

use crate::actor::reactor::toggle::ProfileApp;
use crate::actor::reactor::{Action, Reactor, ReactorError};
use crate::common::config::Binding;
use crate::sys::window_system::WindowSystem;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_binding<S: WindowSystem>(reactor: &mut Reactor<S>, binding: &Binding) {
        info!(id = %binding.id, hotkey = %binding.hotkey, "Hotkey");
        if let Err(err) = Self::handle_action(reactor, &binding.action) {
            // Commands against missing windows or displays do nothing.
            debug!(id = %binding.id, %err, "Command had no effect");
        }
    }

    pub fn handle_action<S: WindowSystem>(
        reactor: &mut Reactor<S>,
        action: &Action,
    ) -> Result<(), ReactorError> {
        match action {
            Action::ToggleApp { bundle_id } => reactor.toggle_app(bundle_id),
            Action::ToggleBraveProfile { profile } => {
                reactor.toggle_profile(ProfileApp::Brave, profile)
            }
            Action::ToggleSafariProfile { profile } => {
                reactor.toggle_profile(ProfileApp::Safari, profile)
            }
            Action::CycleWindows => reactor.cycle_windows(),
            Action::MoveToNextScreen => reactor.move_to_next_screen(),
            Action::ToggleLayoutMode => reactor.toggle_layout_mode(),
            Action::FocusDisplay { index } => reactor.focus_display(*index),
            Action::ToggleFloat => reactor.toggle_float(),
            Action::ResetLayouts => {
                reactor.reset_layouts();
                Ok(())
            }
        }
    }
}
