use std::process::Command;

use objc2::rc::Retained;
use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};
use objc2_core_graphics::{CGError, CGEvent, CGWarpMouseCursorPosition};
use tracing::{debug, trace};

use super::axuielement::{self, AXUIElement};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window_system::{
    Error, Result, RunningApp, WindowInfo, WindowSystem, pid_t,
};

/// A window as the accessibility API exposes it.
#[derive(Debug, Clone, PartialEq)]
pub struct MacWindow {
    pub pid: pid_t,
    element: AXUIElement,
}

impl From<axuielement::Error> for Error {
    fn from(err: axuielement::Error) -> Self {
        use objc2_application_services::AXError;
        match err {
            axuielement::Error::Ax(AXError::InvalidUIElement) => Error::InvalidWindow,
            err => Error::Platform(err.to_string()),
        }
    }
}

/// [`WindowSystem`] over NSWorkspace and the accessibility API. Every query
/// goes to the system; nothing is cached here.
#[derive(Default)]
pub struct MacWindowSystem;

impl MacWindowSystem {
    pub fn new() -> Self { MacWindowSystem }

    fn running_app(pid: pid_t) -> Result<Retained<NSRunningApplication>> {
        NSRunningApplication::runningApplicationWithProcessIdentifier(pid)
            .filter(|app| !app.isTerminated())
            .ok_or(Error::AppNotRunning(pid))
    }
}

fn to_running_app(app: &NSRunningApplication) -> RunningApp {
    RunningApp {
        pid: app.processIdentifier(),
        bundle_id: app.bundleIdentifier().map(|b| b.to_string()),
        is_active: app.isActive(),
        is_hidden: app.isHidden(),
    }
}

impl WindowSystem for MacWindowSystem {
    type Window = MacWindow;

    fn regular_apps(&self) -> Vec<RunningApp> {
        NSWorkspace::sharedWorkspace()
            .runningApplications()
            .into_iter()
            .filter(|app| app.activationPolicy() == NSApplicationActivationPolicy::Regular)
            .map(|app| to_running_app(&app))
            .collect()
    }

    fn app(&self, pid: pid_t) -> Option<RunningApp> {
        Self::running_app(pid).ok().map(|app| to_running_app(&app))
    }

    fn app_windows(&self, pid: pid_t) -> Result<Vec<MacWindow>> {
        let windows = AXUIElement::application(pid).windows()?;
        Ok(windows.into_iter().map(|element| MacWindow { pid, element }).collect())
    }

    fn window_info(&self, window: &MacWindow) -> Result<WindowInfo> {
        let element = &window.element;
        Ok(WindowInfo {
            pid: window.pid,
            title: element.title().unwrap_or_default(),
            frame: element.frame()?.into(),
            role: element.role()?,
            subrole: element.subrole().unwrap_or_default(),
            minimized: element.minimized().unwrap_or(false),
        })
    }

    fn focused_window(&self) -> Option<MacWindow> {
        let app = AXUIElement::system_wide().focused_application().ok()??;
        let pid = app.pid().ok()?;
        let element = app.focused_window().ok()??;
        Some(MacWindow { pid, element })
    }

    fn set_frame(&self, window: &MacWindow, frame: Rect) -> Result<()> {
        trace!(pid = window.pid, ?frame, "set_frame");
        window.element.set_position(frame.origin.into())?;
        window.element.set_size(frame.size.into())?;
        Ok(())
    }

    fn set_minimized(&self, window: &MacWindow, minimized: bool) -> Result<()> {
        Ok(window.element.set_bool_attribute("AXMinimized", minimized)?)
    }

    fn raise(&self, window: &MacWindow) -> Result<()> { Ok(window.element.raise()?) }

    #[allow(deprecated)]
    fn activate_app(&self, pid: pid_t) -> Result<()> {
        let app = Self::running_app(pid)?;
        if app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps) {
            Ok(())
        } else {
            Err(Error::Platform(format!("could not activate pid {pid}")))
        }
    }

    fn hide_app(&self, pid: pid_t) -> Result<()> {
        Self::running_app(pid)?.hide();
        Ok(())
    }

    fn unhide_app(&self, pid: pid_t) -> Result<()> {
        Self::running_app(pid)?.unhide();
        Ok(())
    }

    fn cursor_location(&self) -> Option<Point> {
        let event = CGEvent::new(None)?;
        Some(CGEvent::location(Some(&*event)).into())
    }

    #[allow(unused_unsafe)]
    fn warp_cursor(&self, point: Point) -> Result<()> {
        match unsafe { CGWarpMouseCursorPosition(point.into()) } {
            CGError::Success => Ok(()),
            err => Err(Error::Platform(format!("cursor warp failed: {err:?}"))),
        }
    }

    fn launch_app(&self, bundle_id: &str, args: &[String]) -> Result<()> {
        let mut command = Command::new("/usr/bin/open");
        command.arg("-b").arg(bundle_id);
        if !args.is_empty() {
            command.arg("-n").arg("--args").args(args);
        }
        debug!(?command, "Launching");
        let status = command.status().map_err(|e| Error::LaunchFailed {
            bundle_id: bundle_id.to_string(),
            reason: e.to_string(),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::LaunchFailed {
                bundle_id: bundle_id.to_string(),
                reason: format!("open exited with {status}"),
            })
        }
    }

    fn press_menu_item(&self, pid: pid_t, path: &[String]) -> Result<()> {
        let Some(mut item) = AXUIElement::application(pid).menu_bar()? else {
            return Err(Error::MenuItemNotFound(String::from("menu bar")));
        };
        for title in path {
            item = item
                .child_titled(title)?
                .ok_or_else(|| Error::MenuItemNotFound(title.clone()))?;
        }
        Ok(item.press()?)
    }
}
