use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::{Event, Reactor};
use crate::actor::{self, border};
use crate::common::config::Settings;
use crate::model::Display;
use crate::sys::geometry::{Point, Rect};
use crate::sys::timer::Timer;
use crate::sys::window_system::{
    AX_STANDARD_WINDOW_SUBROLE, AX_WINDOW_ROLE, Error, Result, RunningApp, WindowInfo,
    WindowSystem, pid_t,
};

pub type WindowId = u32;

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub id: WindowId,
    pub info: WindowInfo,
    /// Queries against a broken window fail as if it had just closed.
    pub broken: bool,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub apps: Vec<RunningApp>,
    pub windows: Vec<FakeWindow>,
    pub focused: Option<WindowId>,
    pub cursor: Point,
    /// When set, activate/hide/unhide calls are recorded but the reported
    /// app flags never change.
    pub frozen: bool,
    pub app_list_queries: usize,
    pub launches: Vec<(String, Vec<String>)>,
    pub menu_presses: Vec<(pid_t, Vec<String>)>,
    pub raised: Vec<WindowId>,
    pub activated: Vec<pid_t>,
    pub hidden: Vec<pid_t>,
    pub unhidden: Vec<pid_t>,
    pub frame_writes: Vec<(WindowId, Rect)>,
    pub warps: Vec<Point>,
    next_id: WindowId,
}

/// In-memory window system. Clones share state, so a test can keep a handle
/// while the reactor owns another.
#[derive(Clone, Default)]
pub struct FakeSystem(Rc<RefCell<FakeState>>);

impl FakeSystem {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> std::cell::RefMut<'_, FakeState> { self.0.borrow_mut() }

    pub fn add_app(&self, pid: pid_t, bundle_id: &str) {
        self.state().apps.push(RunningApp {
            pid,
            bundle_id: Some(bundle_id.to_string()),
            is_active: false,
            is_hidden: false,
        });
    }

    pub fn add_window(&self, pid: pid_t, title: &str, frame: Rect) -> WindowId {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state.windows.push(FakeWindow {
            id,
            info: WindowInfo {
                pid,
                title: title.to_string(),
                frame,
                role: AX_WINDOW_ROLE.to_string(),
                subrole: AX_STANDARD_WINDOW_SUBROLE.to_string(),
                minimized: false,
            },
            broken: false,
        });
        id
    }

    pub fn with_window(&self, id: WindowId, f: impl FnOnce(&mut FakeWindow)) {
        let mut state = self.state();
        let window = state.windows.iter_mut().find(|w| w.id == id).expect("no such window");
        f(window);
    }

    pub fn frame(&self, id: WindowId) -> Rect {
        self.0.borrow().windows.iter().find(|w| w.id == id).expect("no such window").info.frame
    }

    /// Makes `id` the focused window and its app the only active one.
    pub fn focus(&self, id: WindowId) {
        let mut state = self.state();
        let pid = state.windows.iter().find(|w| w.id == id).expect("no such window").info.pid;
        state.focused = Some(id);
        for app in &mut state.apps {
            app.is_active = app.pid == pid;
        }
    }

    pub fn set_cursor(&self, point: Point) { self.state().cursor = point; }

    pub fn freeze(&self) { self.state().frozen = true; }

    pub fn app_list_queries(&self) -> usize { self.0.borrow().app_list_queries }

    pub fn take_frame_writes(&self) -> Vec<(WindowId, Rect)> {
        std::mem::take(&mut self.state().frame_writes)
    }

    fn window(&self, id: WindowId) -> Result<FakeWindow> {
        match self.0.borrow().windows.iter().find(|w| w.id == id) {
            Some(window) if !window.broken => Ok(window.clone()),
            _ => Err(Error::InvalidWindow),
        }
    }

    fn update_window(&self, id: WindowId, f: impl FnOnce(&mut WindowInfo)) -> Result<()> {
        let mut state = self.state();
        match state.windows.iter_mut().find(|w| w.id == id) {
            Some(window) if !window.broken => {
                f(&mut window.info);
                Ok(())
            }
            _ => Err(Error::InvalidWindow),
        }
    }

    fn update_app(&self, pid: pid_t, f: impl FnOnce(&mut RunningApp)) -> Result<()> {
        let mut state = self.state();
        let frozen = state.frozen;
        let app = state.apps.iter_mut().find(|a| a.pid == pid).ok_or(Error::AppNotRunning(pid))?;
        if !frozen {
            f(app);
        }
        Ok(())
    }
}

impl WindowSystem for FakeSystem {
    type Window = WindowId;

    fn regular_apps(&self) -> Vec<RunningApp> {
        let mut state = self.state();
        state.app_list_queries += 1;
        state.apps.clone()
    }

    fn app(&self, pid: pid_t) -> Option<RunningApp> {
        self.0.borrow().apps.iter().find(|a| a.pid == pid).cloned()
    }

    fn app_windows(&self, pid: pid_t) -> Result<Vec<WindowId>> {
        let state = self.0.borrow();
        if !state.apps.iter().any(|a| a.pid == pid) {
            return Err(Error::AppNotRunning(pid));
        }
        Ok(state.windows.iter().filter(|w| w.info.pid == pid).map(|w| w.id).collect())
    }

    fn window_info(&self, window: &WindowId) -> Result<WindowInfo> {
        Ok(self.window(*window)?.info)
    }

    fn focused_window(&self) -> Option<WindowId> { self.0.borrow().focused }

    fn set_frame(&self, window: &WindowId, frame: Rect) -> Result<()> {
        self.update_window(*window, |info| info.frame = frame)?;
        self.state().frame_writes.push((*window, frame));
        Ok(())
    }

    fn set_minimized(&self, window: &WindowId, minimized: bool) -> Result<()> {
        self.update_window(*window, |info| info.minimized = minimized)
    }

    fn raise(&self, window: &WindowId) -> Result<()> {
        self.window(*window)?;
        let mut state = self.state();
        state.raised.push(*window);
        state.focused = Some(*window);
        Ok(())
    }

    fn activate_app(&self, pid: pid_t) -> Result<()> {
        self.update_app(pid, |_| {})?;
        let mut state = self.state();
        state.activated.push(pid);
        if !state.frozen {
            for app in &mut state.apps {
                app.is_active = app.pid == pid;
            }
            let focused_pid = state
                .focused
                .and_then(|id| state.windows.iter().find(|w| w.id == id))
                .map(|w| w.info.pid);
            if focused_pid != Some(pid) {
                state.focused =
                    state.windows.iter().find(|w| w.info.pid == pid && !w.info.minimized).map(|w| w.id);
            }
        }
        Ok(())
    }

    fn hide_app(&self, pid: pid_t) -> Result<()> {
        self.update_app(pid, |app| {
            app.is_hidden = true;
            app.is_active = false;
        })?;
        let mut state = self.state();
        state.hidden.push(pid);
        if !state.frozen {
            let focused_pid = state
                .focused
                .and_then(|id| state.windows.iter().find(|w| w.id == id))
                .map(|w| w.info.pid);
            if focused_pid == Some(pid) {
                state.focused = None;
            }
        }
        Ok(())
    }

    fn unhide_app(&self, pid: pid_t) -> Result<()> {
        self.update_app(pid, |app| app.is_hidden = false)?;
        self.state().unhidden.push(pid);
        Ok(())
    }

    fn cursor_location(&self) -> Option<Point> { Some(self.0.borrow().cursor) }

    fn warp_cursor(&self, point: Point) -> Result<()> {
        let mut state = self.state();
        state.cursor = point;
        state.warps.push(point);
        Ok(())
    }

    fn launch_app(&self, bundle_id: &str, args: &[String]) -> Result<()> {
        self.state().launches.push((bundle_id.to_string(), args.to_vec()));
        Ok(())
    }

    fn press_menu_item(&self, pid: pid_t, path: &[String]) -> Result<()> {
        self.state().menu_presses.push((pid, path.to_vec()));
        Ok(())
    }
}

/// Collects delayed events instead of sleeping.
#[derive(Clone, Default)]
pub struct FakeTimer(Rc<RefCell<Vec<(Duration, Event)>>>);

impl FakeTimer {
    pub fn take(&self) -> Vec<(Duration, Event)> { std::mem::take(&mut self.0.borrow_mut()) }

    pub fn pending(&self) -> usize { self.0.borrow().len() }
}

impl Timer<Event> for FakeTimer {
    fn send_after(&self, delay: Duration, event: Event) { self.0.borrow_mut().push((delay, event)); }
}

pub fn display(index: usize, x: f64) -> Display {
    Display {
        index,
        frame: Rect::new(x, 0.0, 1440.0, 900.0),
        visible_frame: Rect::new(x, 25.0, 1440.0, 875.0),
    }
}

pub struct Harness {
    pub reactor: Reactor<FakeSystem>,
    pub system: FakeSystem,
    pub timer: FakeTimer,
    pub border_rx: actor::Receiver<border::BorderRequest>,
}

impl Harness {
    /// A reactor over `displays` side by side, each 1440 wide.
    pub fn new(displays: usize) -> Self {
        let system = FakeSystem::new();
        let timer = FakeTimer::default();
        let (border_tx, border_rx) = actor::channel();
        let mut reactor = Reactor::new(
            system.clone(),
            Settings::default(),
            Box::new(timer.clone()),
            Some(border_tx),
        );
        reactor.handle_event(Event::DisplaysChanged(
            (0..displays).map(|i| display(i, 1440.0 * i as f64)).collect(),
        ));
        let mut harness = Harness { reactor, system, timer, border_rx };
        harness.fire_timers();
        harness
    }

    /// Delivers every pending delayed event, including ones scheduled while
    /// delivering. Returns how many were delivered.
    pub fn fire_timers(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let pending = self.timer.take();
            if pending.is_empty() {
                return delivered;
            }
            for (_, event) in pending {
                delivered += 1;
                self.reactor.handle_event(event);
            }
        }
    }

    pub fn border_requests(&mut self) -> Vec<border::BorderRequest> {
        let mut requests = Vec::new();
        while let Ok((_, request)) = self.border_rx.try_recv() {
            requests.push(request);
        }
        requests
    }
}
