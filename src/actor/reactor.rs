//! The reactor owns all tiling state and is the only place that state is
//! mutated. Platform observers, the key capture path and timers all feed it
//! [`Event`]s; it answers by issuing calls through a [`WindowSystem`].

mod error;
mod events;
mod focus;
mod retile;
mod toggle;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use error::ReactorError;
use events::app::AppEventHandler;
use events::command::CommandEventHandler;
use events::system::SystemEventHandler;
use retile::RetileScheduler;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::actor::{self, border};
use crate::common::config::{Binding, Settings};
use crate::layout_engine::{FloatingClassifier, LayoutModes};
use crate::model::{AppsCache, Display, FocusMemory, display_at};
use crate::sys::geometry::{Rect, SameAs};
use crate::sys::timer::Timer;
use crate::sys::window_system::{
    AX_STANDARD_WINDOW_SUBROLE, AX_WINDOW_ROLE, RunningApp, WindowInfo, WindowSystem, pid_t,
};

/// A user command, bound to a hotkey in the config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, strum_macros::VariantNames)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    #[serde(alias = "toggleApp")]
    ToggleApp {
        #[serde(alias = "bundleId")]
        bundle_id: String,
    },
    #[serde(alias = "toggleBraveProfile")]
    ToggleBraveProfile { profile: String },
    #[serde(alias = "toggleSafariProfile")]
    ToggleSafariProfile { profile: String },
    #[serde(alias = "cycleWindows")]
    CycleWindows,
    #[serde(alias = "moveToNextScreen")]
    MoveToNextScreen,
    #[serde(alias = "toggleLayoutMode")]
    ToggleLayoutMode,
    /// Zero-based index into the display list.
    #[serde(alias = "focusDisplay")]
    FocusDisplay { index: usize },
    #[serde(alias = "toggleFloat")]
    ToggleFloat,
    #[serde(alias = "resetLayouts")]
    ResetLayouts,
}

#[derive(Debug)]
pub enum Event {
    AppLaunched(pid_t),
    AppTerminated(pid_t),
    AppActivated(pid_t),
    AppHidden(pid_t),
    AppUnhidden(pid_t),
    ActiveSpaceChanged,
    /// A fresh snapshot of the connected displays, in platform order.
    DisplaysChanged(Vec<Display>),
    FocusedWindowMoved,
    FocusedWindowResized,
    Hotkey(Arc<Binding>),
    RetileTimerFired,
    /// Follow-up to a launch once the new process had time to open windows.
    LaunchSettled {
        bundle_id: String,
        profile: Option<String>,
        display: Option<usize>,
    },
    /// Follow-up to launching Safari before its profile menu can be used.
    ProfileMenuSettled {
        profile: String,
        display: Option<usize>,
    },
    ConfigReloaded(Box<Settings>),
    Shutdown,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// A window that passed enumeration, with the facts tiling needs about it.
#[derive(Debug, Clone)]
pub(crate) struct ManagedWindow<W> {
    pub handle: W,
    pub info: WindowInfo,
    pub display: usize,
    pub floating: bool,
}

pub struct Reactor<S: WindowSystem> {
    system: S,
    settings: Settings,
    apps: AppsCache,
    displays: Vec<Display>,
    layout_modes: LayoutModes,
    floating: FloatingClassifier,
    focus_memory: FocusMemory,
    retile: RetileScheduler,
    timer: Box<dyn Timer<Event>>,
    border: border::BorderTrigger,
}

impl<S: WindowSystem> Reactor<S> {
    pub fn new(
        system: S,
        settings: Settings,
        timer: Box<dyn Timer<Event>>,
        border_tx: Option<border::Sender>,
    ) -> Self {
        Reactor {
            system,
            floating: FloatingClassifier::new(&settings.floating),
            settings,
            apps: AppsCache::new(),
            displays: Vec::new(),
            layout_modes: LayoutModes::default(),
            focus_memory: FocusMemory::default(),
            retile: RetileScheduler::default(),
            timer,
            border: border::BorderTrigger::new(border_tx),
        }
    }

    /// Handles events until [`Event::Shutdown`] arrives or every sender is
    /// dropped.
    pub async fn run(mut self, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            if matches!(event, Event::Shutdown) {
                info!("Reactor shutting down");
                break;
            }
            self.handle_event(event);
        }
        self.teardown();
    }

    /// Drops everything learned at runtime; nothing is persisted.
    fn teardown(&mut self) {
        self.border.hide();
        self.focus_memory.clear();
        self.apps.invalidate();
        self.layout_modes.reset();
    }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        trace!(?event, "Event");
        match event {
            Event::AppLaunched(pid) => AppEventHandler::handle_app_launched(self, pid),
            Event::AppTerminated(pid) => AppEventHandler::handle_app_terminated(self, pid),
            Event::AppHidden(pid) | Event::AppUnhidden(pid) => {
                AppEventHandler::handle_app_visibility_changed(self, pid)
            }
            Event::AppActivated(pid) => AppEventHandler::handle_app_activated(self, pid),
            Event::ActiveSpaceChanged => SystemEventHandler::handle_space_changed(self),
            Event::DisplaysChanged(displays) => {
                SystemEventHandler::handle_displays_changed(self, displays)
            }
            Event::FocusedWindowMoved | Event::FocusedWindowResized => {
                SystemEventHandler::handle_focused_window_changed(self)
            }
            Event::RetileTimerFired => SystemEventHandler::handle_retile_timer(self),
            Event::ConfigReloaded(settings) => {
                SystemEventHandler::handle_config_reloaded(self, *settings)
            }
            Event::Hotkey(binding) => CommandEventHandler::handle_binding(self, &binding),
            Event::LaunchSettled { bundle_id, profile, display } => {
                self.on_launch_settled(&bundle_id, profile.as_deref(), display)
            }
            Event::ProfileMenuSettled { profile, display } => {
                self.on_profile_menu_settled(&profile, display)
            }
            Event::Shutdown => self.teardown(),
        }
    }

    /// Requests a retile pass, coalescing with one already scheduled.
    pub(crate) fn schedule_retile(&mut self) {
        if self.retile.request() {
            self.timer
                .send_after(self.settings.timing.retile_debounce(), Event::RetileTimerFired);
        }
    }

    /// Lays out every display immediately.
    pub(crate) fn retile_all(&mut self) {
        let gap = self.settings.gap;
        let windows = self.managed_windows();
        for display in &self.displays {
            let tiled: Vec<&ManagedWindow<S::Window>> = windows
                .iter()
                .filter(|w| w.display == display.index && !w.floating)
                .collect();
            let mode = self.layout_modes.mode(display.index);
            let frames = crate::layout_engine::compute_frames(
                tiled.len(),
                display.tiling_bounds(gap),
                gap,
                mode,
            );
            let index = display.index;
            trace!(display = index, ?mode, count = tiled.len(), "Tiling display");
            for (window, frame) in tiled.into_iter().zip(frames) {
                // Skipping unchanged frames keeps our own writes from echoing
                // back as move/resize notifications forever.
                if window.info.frame.same_as(frame) {
                    continue;
                }
                if let Err(err) = self.system.set_frame(&window.handle, frame) {
                    debug!(?err, title = %window.info.title, "Could not set window frame");
                }
            }
        }
    }

    /// Every tileable or floatable window on every display, in app order then
    /// per-app window order.
    pub(crate) fn managed_windows(&mut self) -> Vec<ManagedWindow<S::Window>> {
        self.apps.ensure_valid(&self.system);
        let mut managed = Vec::new();
        for app in self.apps.apps() {
            if app.is_hidden {
                continue;
            }
            let handles = match self.system.app_windows(app.pid) {
                Ok(handles) => handles,
                Err(err) => {
                    trace!(pid = app.pid, ?err, "Skipping app windows");
                    continue;
                }
            };
            for handle in handles {
                let info = match self.system.window_info(&handle) {
                    Ok(info) => info,
                    Err(err) => {
                        trace!(pid = app.pid, ?err, "Skipping window");
                        continue;
                    }
                };
                if !self.is_enumerable(&info) {
                    continue;
                }
                let Some(display) = display_at(&self.displays, info.frame.mid()) else {
                    continue;
                };
                let floating = self.floating.should_float(&info, app);
                managed.push(ManagedWindow { handle, info, display, floating });
            }
        }
        managed
    }

    pub(crate) fn windows_on_display(
        &mut self,
        display: usize,
        include_floating: bool,
    ) -> Vec<ManagedWindow<S::Window>> {
        self.managed_windows()
            .into_iter()
            .filter(|w| w.display == display && (include_floating || !w.floating))
            .collect()
    }

    fn is_enumerable(&self, info: &WindowInfo) -> bool {
        info.role == AX_WINDOW_ROLE
            && (info.subrole == AX_STANDARD_WINDOW_SUBROLE
                || self.settings.floating.subroles.contains(&info.subrole))
            && !info.minimized
            && info.frame.has_area()
    }

    pub(crate) fn focused(&self) -> Option<(S::Window, WindowInfo)> {
        let window = self.system.focused_window()?;
        let info = self.system.window_info(&window).ok()?;
        Some((window, info))
    }

    /// The display holding the focused window, else the one under the
    /// cursor, else the first.
    pub(crate) fn current_display(&self) -> Option<usize> {
        if let Some((_, info)) = self.focused()
            && let Some(index) = display_at(&self.displays, info.frame.mid())
        {
            return Some(index);
        }
        if let Some(cursor) = self.system.cursor_location()
            && let Some(index) = display_at(&self.displays, cursor)
        {
            return Some(index);
        }
        (!self.displays.is_empty()).then_some(0)
    }

    /// Looks an app up in the cache, then asks the platform for its current
    /// flags. A cached pid the platform no longer knows counts as not running.
    pub(crate) fn live_app(&mut self, bundle_id: &str) -> Option<RunningApp> {
        self.apps.ensure_valid(&self.system);
        let pid = self.apps.find_bundle(bundle_id)?.pid;
        let app = self.system.app(pid);
        if app.is_none() {
            self.apps.invalidate();
        }
        app
    }

    pub(crate) fn is_floating(&mut self, info: &WindowInfo) -> bool {
        self.apps.ensure_valid(&self.system);
        match self.apps.get(info.pid) {
            Some(app) => self.floating.should_float(info, app),
            None => true,
        }
    }

    /// Where a window should land on `display` before it is shown: tiling
    /// bounds for tiled windows, centred at its current size otherwise.
    pub(crate) fn placement_on(&mut self, info: &WindowInfo, display: &Display) -> Rect {
        if self.is_floating(info) {
            display.visible_frame.centered(info.frame.size)
        } else {
            display.tiling_bounds(self.settings.gap)
        }
    }

    /// Moves `window` onto `display` unless it is already there.
    pub(crate) fn preposition(&mut self, window: &S::Window, info: &WindowInfo, display: usize) {
        let Some(target) = self.displays.get(display).copied() else {
            return;
        };
        if target.contains(info.frame.mid()) {
            return;
        }
        let frame = self.placement_on(info, &target);
        if let Err(err) = self.system.set_frame(window, frame) {
            debug!(?err, "Could not pre-position window");
        }
    }

    /// Shows or hides the focus border around the focused window.
    pub(crate) fn refresh_border(&mut self) {
        let frame = match self.focused() {
            Some((_, info)) if self.is_enumerable(&info) => {
                let on_display = display_at(&self.displays, info.frame.mid()).is_some();
                (on_display && !self.is_floating(&info)).then_some(info.frame)
            }
            _ => None,
        };
        self.border.update(frame);
    }
}
