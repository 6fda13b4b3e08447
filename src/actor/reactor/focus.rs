use tracing::{debug, info};

use super::{ManagedWindow, Reactor, ReactorError};
use crate::layout_engine::WindowKey;
use crate::model::display_at;
use crate::sys::window_system::WindowSystem;

impl<S: WindowSystem> Reactor<S> {
    /// Moves keyboard focus and the cursor to another display. Asking for the
    /// display that already has focus flips its layout mode instead.
    pub(crate) fn focus_display(&mut self, target: usize) -> Result<(), ReactorError> {
        let Some(target_display) = self.displays.get(target).copied() else {
            return Err(ReactorError::DisplayNotFound(target));
        };
        let current = self.current_display();

        if current == Some(target) {
            let mode = self.layout_modes.toggle(target);
            info!(display = target, ?mode, "Display already focused, toggled layout");
            self.retile_all();
            self.refresh_border();
            return Ok(());
        }

        if let Some(source) = current.and_then(|index| self.displays.get(index)).copied()
            && let Some((_, info)) = self.focused()
        {
            self.focus_memory.remember(source.key(), info.pid, info.title);
        }

        let candidates = self.windows_on_display(target, true);
        let chosen = self
            .focus_memory
            .resolve(target_display.key(), &candidates[..], |w| {
                (w.info.pid, w.info.title.as_str())
            })
            .or(candidates.first());
        match chosen {
            Some(window) => {
                debug!(display = target, title = %window.info.title, "Focusing window");
                self.focus_window(window)?;
            }
            None => debug!(display = target, "No window to focus"),
        }

        self.system.warp_cursor(target_display.frame.mid())?;
        self.refresh_border();
        Ok(())
    }

    fn focus_window(&self, window: &ManagedWindow<S::Window>) -> Result<(), ReactorError> {
        self.system.raise(&window.handle)?;
        self.system.activate_app(window.info.pid)?;
        Ok(())
    }

    /// Focuses the next window on the current display, floating ones
    /// included, wrapping at the end.
    pub(crate) fn cycle_windows(&mut self) -> Result<(), ReactorError> {
        let display = self.current_display().ok_or(ReactorError::DisplayNotFound(0))?;
        let windows = self.windows_on_display(display, true);
        if windows.is_empty() {
            return Ok(());
        }
        let focused = self.system.focused_window();
        let next = match windows.iter().position(|w| Some(&w.handle) == focused.as_ref()) {
            Some(index) => (index + 1) % windows.len(),
            None => 0,
        };
        self.focus_window(&windows[next])?;
        self.refresh_border();
        Ok(())
    }

    pub(crate) fn move_to_next_screen(&mut self) -> Result<(), ReactorError> {
        let (window, info) = self.focused().ok_or(ReactorError::NoFocusedWindow)?;
        if self.displays.len() < 2 {
            return Ok(());
        }
        let source = display_at(&self.displays, info.frame.mid()).unwrap_or(0);
        let target = self.displays[(source + 1) % self.displays.len()];
        let frame = self.placement_on(&info, &target);
        debug!(title = %info.title, from = source, to = target.index, "Moving window");
        self.system.set_frame(&window, frame)?;
        self.schedule_retile();
        Ok(())
    }

    pub(crate) fn toggle_layout_mode(&mut self) -> Result<(), ReactorError> {
        let target = self.current_display().ok_or(ReactorError::DisplayNotFound(0))?;
        let mode = self.layout_modes.toggle(target);
        info!(display = target, ?mode, "Toggled layout mode");
        self.retile_all();
        self.refresh_border();
        Ok(())
    }

    pub(crate) fn toggle_float(&mut self) -> Result<(), ReactorError> {
        let (_, info) = self.focused().ok_or(ReactorError::NoFocusedWindow)?;
        let floating = self.floating.toggle_manual(WindowKey::of(&info));
        info!(title = %info.title, floating, "Toggled floating");
        self.schedule_retile();
        Ok(())
    }

    /// Puts every display back to the default layout.
    pub(crate) fn reset_layouts(&mut self) {
        self.layout_modes.reset();
        info!("Reset all layouts");
        self.retile_all();
        self.refresh_border();
    }
}
