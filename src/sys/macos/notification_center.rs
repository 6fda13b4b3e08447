//! Turns workspace notifications, display reconfiguration and accessibility
//! notifications of the focused window into reactor events.
//!
//! Everything here lives on the main thread's run loop.

use std::cell::RefCell;
use std::ffi::c_void;
use std::mem;
use std::rc::Rc;

use objc2::rc::{Allocated, Retained};
use objc2::{AnyThread, ClassType, DefinedClass, define_class, msg_send, sel};
use objc2_app_kit::{NSRunningApplication, NSScreen, NSWorkspace, NSWorkspaceApplicationKey};
use objc2_foundation::{
    MainThreadMarker, NSKeyValueCoding, NSNotification, NSNotificationCenter, NSObject,
};
use tracing::{debug, info_span, trace, warn};

use super::axuielement::AXUIElement;
use super::observer::Observer;
use crate::actor::reactor::{self, Event};
use crate::model::Display;
use crate::sys::geometry::CoordinateConverter;
use crate::sys::window_system::pid_t;

const BEGIN_CONFIGURATION_FLAG: u32 = 1 << 0;

/// Watches the focused window of the active app for moves and resizes.
struct FocusWatch {
    events_tx: reactor::Sender,
    window_observer: RefCell<Option<Observer>>,
}

impl FocusWatch {
    fn watch_focused_window(&self, pid: pid_t) {
        // Dropping the old observer unregisters it.
        self.window_observer.replace(None);
        let Ok(Some(window)) = AXUIElement::application(pid).focused_window() else {
            trace!(pid, "No focused window to observe");
            return;
        };
        let events_tx = self.events_tx.clone();
        let observer = match Observer::new(pid) {
            Ok(builder) => builder.install(move |notif| match notif {
                "AXMoved" => events_tx.send(Event::FocusedWindowMoved),
                "AXResized" => events_tx.send(Event::FocusedWindowResized),
                _ => {}
            }),
            Err(e) => {
                debug!(pid, "Could not create window observer: {e}");
                return;
            }
        };
        for notification in ["AXMoved", "AXResized"] {
            if let Err(e) = observer.add_notification(&window, notification) {
                debug!(pid, notification, "Could not observe focused window: {e}");
            }
        }
        self.window_observer.replace(Some(observer));
    }
}

struct Instance {
    events_tx: reactor::Sender,
    focus: Rc<FocusWatch>,
    app_observer: RefCell<Option<Observer>>,
}

define_class! {
    // SAFETY:
    // - The superclass NSObject does not have any subclassing requirements.
    // - `NotificationCenterInner` does not implement `Drop`.
    #[unsafe(super(NSObject))]
    #[ivars = Instance]
    struct NotificationCenterInner;

    // SAFETY: Each of these method signatures must match their invocations.
    impl NotificationCenterInner {
        #[unsafe(method(recvAppEvent:))]
        fn recv_app_event(&self, notif: &NSNotification) {
            trace!("{notif:#?}");
            self.handle_app_event(notif);
        }

        #[unsafe(method(recvSpaceEvent:))]
        fn recv_space_event(&self, notif: &NSNotification) {
            trace!("{notif:#?}");
            self.send_event(Event::ActiveSpaceChanged);
        }
    }
}

impl NotificationCenterInner {
    fn new(events_tx: reactor::Sender) -> Retained<Self> {
        let instance = Instance {
            focus: Rc::new(FocusWatch {
                events_tx: events_tx.clone(),
                window_observer: RefCell::new(None),
            }),
            events_tx,
            app_observer: RefCell::new(None),
        };
        let this: Allocated<Self> = Self::alloc();
        let this = this.set_ivars(instance);
        unsafe { msg_send![super(this), init] }
    }

    fn send_event(&self, event: Event) { self.ivars().events_tx.send(event); }

    fn handle_app_event(&self, notif: &NSNotification) {
        use objc2_app_kit::*;
        let Some(app) = self.running_application(notif) else {
            return;
        };
        let pid = app.processIdentifier();
        let name = &*notif.name();
        let span = info_span!("notification_center::handle_app_event", ?name, pid);
        let _guard = span.enter();
        let event = unsafe {
            if NSWorkspaceDidLaunchApplicationNotification == name {
                Event::AppLaunched(pid)
            } else if NSWorkspaceDidTerminateApplicationNotification == name {
                Event::AppTerminated(pid)
            } else if NSWorkspaceDidActivateApplicationNotification == name {
                self.watch_app(pid);
                Event::AppActivated(pid)
            } else if NSWorkspaceDidHideApplicationNotification == name {
                Event::AppHidden(pid)
            } else if NSWorkspaceDidUnhideApplicationNotification == name {
                Event::AppUnhidden(pid)
            } else {
                warn!("Unexpected app event: {notif:?}");
                return;
            }
        };
        self.send_event(event);
    }

    /// Re-targets the accessibility observers at the newly active app.
    fn watch_app(&self, pid: pid_t) {
        let ivars = self.ivars();
        ivars.app_observer.replace(None);
        ivars.focus.watch_focused_window(pid);

        let focus = Rc::clone(&ivars.focus);
        let events_tx = ivars.events_tx.clone();
        let observer = match Observer::new(pid) {
            Ok(builder) => builder.install(move |_| {
                focus.watch_focused_window(pid);
                events_tx.send(Event::AppActivated(pid));
            }),
            Err(e) => {
                debug!(pid, "Could not create app observer: {e}");
                return;
            }
        };
        if let Err(e) =
            observer.add_notification(&AXUIElement::application(pid), "AXFocusedWindowChanged")
        {
            debug!(pid, "Could not observe focus changes: {e}");
        }
        ivars.app_observer.replace(Some(observer));
    }

    fn running_application(
        &self,
        notif: &NSNotification,
    ) -> Option<Retained<NSRunningApplication>> {
        let Some(info) = notif.userInfo() else {
            warn!("Got app notification without user info: {notif:?}");
            return None;
        };
        let app = unsafe { info.valueForKey(NSWorkspaceApplicationKey) };
        let Some(app) = app else {
            warn!("Got app notification without app object: {notif:?}");
            return None;
        };
        if app.class() != NSRunningApplication::class() {
            warn!("Unexpected application object: {app:?}");
            return None;
        }
        let app: Retained<NSRunningApplication> = unsafe { mem::transmute(app) };
        Some(app)
    }

    unsafe extern "C" fn display_reconfig_callback(
        _display: u32,
        flags: u32,
        user_info: *mut c_void,
    ) {
        if user_info.is_null() || flags & BEGIN_CONFIGURATION_FLAG != 0 {
            return;
        }
        let handler = unsafe { &*(user_info as *const NotificationCenterInner) };
        let Some(mtm) = MainThreadMarker::new() else {
            warn!("Display reconfiguration reported off the main thread");
            return;
        };
        handler.send_event(Event::DisplaysChanged(current_displays(mtm)));
    }
}

/// Connected displays in NSScreen order, in the top-left convention.
pub fn current_displays(mtm: MainThreadMarker) -> Vec<Display> {
    let screens = NSScreen::screens(mtm);
    let Some(main_height) = screens.iter().next().map(|s| s.frame().size.height) else {
        return Vec::new();
    };
    let converter = CoordinateConverter::from_height(main_height);
    screens
        .iter()
        .enumerate()
        .map(|(index, screen)| Display {
            index,
            frame: converter.convert_rect(screen.frame().into()),
            visible_frame: converter.convert_rect(screen.visibleFrame().into()),
        })
        .collect()
}

pub struct NotificationCenter {
    inner: Retained<NotificationCenterInner>,
}

impl NotificationCenter {
    pub fn new(events_tx: reactor::Sender) -> Self {
        let handler = NotificationCenterInner::new(events_tx);

        let workspace = &NSWorkspace::sharedWorkspace();
        let workspace_center = &workspace.notificationCenter();
        unsafe {
            use objc2_app_kit::*;
            let register = |selector, name, center: &NSNotificationCenter| {
                center.addObserver_selector_name_object(
                    &handler,
                    selector,
                    Some(name),
                    Some(workspace),
                );
            };
            for name in [
                NSWorkspaceDidLaunchApplicationNotification,
                NSWorkspaceDidTerminateApplicationNotification,
                NSWorkspaceDidActivateApplicationNotification,
                NSWorkspaceDidHideApplicationNotification,
                NSWorkspaceDidUnhideApplicationNotification,
            ] {
                register(sel!(recvAppEvent:), name, workspace_center);
            }
            register(
                sel!(recvSpaceEvent:),
                NSWorkspaceActiveSpaceDidChangeNotification,
                workspace_center,
            );
            let status = CGDisplayRegisterReconfigurationCallback(
                Some(NotificationCenterInner::display_reconfig_callback),
                Retained::as_ptr(&handler) as *mut c_void,
            );
            if status != 0 {
                warn!(status, "Could not watch display reconfiguration");
            }
        }

        NotificationCenter { inner: handler }
    }

    /// Sends the initial display layout and the frontmost app so the reactor
    /// starts from the current state.
    pub fn send_initial_state(&self, mtm: MainThreadMarker) {
        self.inner.send_event(Event::DisplaysChanged(current_displays(mtm)));
        if let Some(app) = NSWorkspace::sharedWorkspace().frontmostApplication() {
            let pid = app.processIdentifier();
            self.inner.watch_app(pid);
            self.inner.send_event(Event::AppActivated(pid));
        }
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        let workspace = NSWorkspace::sharedWorkspace();
        unsafe {
            workspace.notificationCenter().removeObserver(&self.inner);
            CGDisplayRemoveReconfigurationCallback(
                Some(NotificationCenterInner::display_reconfig_callback),
                Retained::as_ptr(&self.inner) as *mut c_void,
            );
        }
        let ivars = self.inner.ivars();
        ivars.app_observer.replace(None);
        ivars.focus.window_observer.replace(None);
        debug!("Notification center stopped");
    }
}

type DisplayReconfigCallback = unsafe extern "C" fn(u32, u32, *mut c_void);

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGDisplayRegisterReconfigurationCallback(
        callback: Option<DisplayReconfigCallback>,
        user_info: *mut c_void,
    ) -> i32;
    fn CGDisplayRemoveReconfigurationCallback(
        callback: Option<DisplayReconfigCallback>,
        user_info: *mut c_void,
    ) -> i32;
}
