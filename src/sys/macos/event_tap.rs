use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use objc2_core_foundation::{
    CFMachPort, CFRetained, CFRunLoop, CFRunLoopMode, CFRunLoopSource, kCFRunLoopCommonModes,
    kCFRunLoopDefaultMode,
};
use objc2_core_graphics::{
    CGEvent, CGEventField, CGEventFlags, CGEventMask, CGEventTapLocation as CGTapLoc,
    CGEventTapOptions as CGTapOpt, CGEventTapPlacement as CGTapPlace, CGEventTapProxy,
    CGEventType,
};
use tracing::{debug, warn};

use crate::actor::event_tap::{CaptureContext, Disposition, KeyEvent, KeyEventKind};
use crate::sys::hotkey::Modifiers;

pub type TapCallback = Option<
    unsafe extern "C-unwind" fn(
        CGEventTapProxy,
        CGEventType,
        NonNull<CGEvent>,
        *mut c_void,
    ) -> *mut CGEvent,
>;

struct TrampolineCtx {
    callback: TapCallback,
    original_user_info: *mut c_void,
    original_drop: Option<unsafe fn(*mut c_void)>,
    port_ptr: Option<NonNull<CFMachPort>>,
}

extern "C-unwind" fn trampoline_callback(
    proxy: CGEventTapProxy,
    etype: CGEventType,
    event_ref: NonNull<CGEvent>,
    user_info: *mut c_void,
) -> *mut CGEvent {
    if user_info.is_null() {
        return event_ref.as_ptr();
    }

    let ctx = unsafe { &*(user_info as *const TrampolineCtx) };

    // kCGEventTapDisabledByTimeout (-2) & kCGEventTapDisabledByUserInput (-1)
    let ety = etype.0 as i32;
    if ety == -1 || ety == -2 {
        warn!("Event tap was disabled by the system; re-enabling");
        if let Some(port_ptr) = ctx.port_ptr {
            unsafe { CGEvent::tap_enable(port_ptr.as_ref(), true) };
        }
        return event_ref.as_ptr();
    }

    if let Some(orig_cb) = ctx.callback {
        return unsafe { orig_cb(proxy, etype, event_ref, ctx.original_user_info) };
    }

    event_ref.as_ptr()
}

unsafe fn trampoline_drop(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }

    let ctx: Box<TrampolineCtx> = unsafe { Box::from_raw(ptr as *mut TrampolineCtx) };
    if let Some(dropper) = ctx.original_drop
        && !ctx.original_user_info.is_null()
    {
        unsafe { dropper(ctx.original_user_info) };
    }
}

/// A session event tap installed on the current thread's run loop. Removed
/// when dropped.
pub struct EventTap {
    port: CFRetained<CFMachPort>,
    source: CFRetained<CFRunLoopSource>,
    user_info: *mut c_void,
}

impl EventTap {
    unsafe fn new(
        mask: CGEventMask,
        callback: TapCallback,
        user_info: *mut c_void,
        drop_ctx: Option<unsafe fn(*mut c_void)>,
    ) -> Option<Self> {
        let tramp = Box::new(TrampolineCtx {
            callback,
            original_user_info: user_info,
            original_drop: drop_ctx,
            port_ptr: None,
        });
        let tramp_ptr = Box::into_raw(tramp) as *mut c_void;

        let port = unsafe {
            CGEvent::tap_create(
                CGTapLoc::SessionEventTap,
                CGTapPlace::HeadInsertEventTap,
                CGTapOpt::Default,
                mask,
                Some(trampoline_callback),
                tramp_ptr,
            )
        };
        let Some(port) = port else {
            unsafe { trampoline_drop(tramp_ptr) };
            return None;
        };

        let Some(source) = CFMachPort::new_run_loop_source(None, Some(&port), 0) else {
            unsafe { trampoline_drop(tramp_ptr) };
            return None;
        };
        match (CFRunLoop::current(), unsafe { kCFRunLoopCommonModes }) {
            (Some(rl), Some(mode)) => {
                let mode: &CFRunLoopMode = mode;
                rl.add_source(Some(&source), Some(mode));
            }
            _ => debug!("EventTap::new: no run loop on this thread; tap is inert"),
        }
        CGEvent::tap_enable(&port, true);

        let event_tap = Self { port, source, user_info: tramp_ptr };
        unsafe {
            let tramp_ctx = &mut *(tramp_ptr as *mut TrampolineCtx);
            tramp_ctx.port_ptr = Some(NonNull::from(&*event_tap.port));
        }
        Some(event_tap)
    }

    /// Routes key presses through `ctx`. Returns `None` when the tap cannot
    /// be created, which usually means input monitoring is not allowed.
    pub fn capture_keys(ctx: Arc<CaptureContext>) -> Option<Self> {
        let mask = build_event_mask();
        let ctx_ptr = Arc::into_raw(ctx) as *mut c_void;
        unsafe { Self::new(mask, Some(key_callback), ctx_ptr, Some(drop_capture_ctx)) }
    }
}

/// How often [`run_capture`] checks its stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Installs the key tap on the current thread and services its run loop
/// until `stop` is set. The tap is removed before this returns. Returns
/// `false` when the tap could not be created.
pub fn run_capture(ctx: Arc<CaptureContext>, stop: &AtomicBool) -> bool {
    let Some(tap) = EventTap::capture_keys(ctx) else {
        return false;
    };
    let mode = unsafe { kCFRunLoopDefaultMode };
    while !stop.load(Ordering::Acquire) {
        let _ = CFRunLoop::run_in_mode(mode, STOP_POLL_INTERVAL.as_secs_f64(), false);
    }
    drop(tap);
    debug!("Keyboard capture stopped");
    true
}

impl Drop for EventTap {
    fn drop(&mut self) {
        CGEvent::tap_enable(&self.port, false);
        if let Some(rl) = CFRunLoop::current() {
            rl.remove_source(Some(&self.source), unsafe { kCFRunLoopCommonModes });
        }
        unsafe { trampoline_drop(self.user_info) };
    }
}

unsafe fn drop_capture_ctx(ptr: *mut c_void) {
    unsafe { drop(Arc::from_raw(ptr as *const CaptureContext)) };
}

fn build_event_mask() -> CGEventMask {
    [CGEventType::KeyDown, CGEventType::KeyUp]
        .into_iter()
        .fold(0u64, |m, ty| m | (1u64 << (ty.0 as u64)))
}

unsafe extern "C-unwind" fn key_callback(
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    event_ref: NonNull<CGEvent>,
    user_info: *mut c_void,
) -> *mut CGEvent {
    let ctx = unsafe { &*(user_info as *const CaptureContext) };
    let event = unsafe { event_ref.as_ref() };

    let kind = match event_type {
        CGEventType::KeyDown => KeyEventKind::Down,
        CGEventType::KeyUp => KeyEventKind::Up,
        _ => return event_ref.as_ptr(),
    };
    let Some(code) = key_code_from_event(event) else {
        return event_ref.as_ptr();
    };
    let flags = CGEvent::flags(Some(event));

    let disposition = ctx.on_key_event(KeyEvent {
        kind,
        code,
        modifiers: modifiers_from_flags(flags),
        at: Instant::now(),
    });
    match disposition {
        Disposition::Pass => event_ref.as_ptr(),
        Disposition::Swallow => core::ptr::null_mut(),
        Disposition::Rewrite(modifiers) => {
            CGEvent::set_flags(Some(event), with_modifiers(flags, modifiers));
            event_ref.as_ptr()
        }
    }
}

fn key_code_from_event(event: &CGEvent) -> Option<u16> {
    let raw = CGEvent::integer_value_field(Some(event), CGEventField::KeyboardEventKeycode);
    u16::try_from(raw).ok()
}

const MODIFIER_FLAGS: [(CGEventFlags, Modifiers); 4] = [
    (CGEventFlags::MaskShift, Modifiers::SHIFT),
    (CGEventFlags::MaskControl, Modifiers::CONTROL),
    (CGEventFlags::MaskAlternate, Modifiers::ALT),
    (CGEventFlags::MaskCommand, Modifiers::META),
];

fn modifiers_from_flags(flags: CGEventFlags) -> Modifiers {
    MODIFIER_FLAGS
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .fold(Modifiers::empty(), |acc, (_, m)| acc | *m)
}

/// Replaces the modifier bits of `flags`, keeping everything else.
fn with_modifiers(mut flags: CGEventFlags, modifiers: Modifiers) -> CGEventFlags {
    for (flag, m) in MODIFIER_FLAGS {
        if modifiers.contains(m) {
            flags.insert(flag);
        } else {
            flags.remove(flag);
        }
    }
    flags
}
