#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_void};
use std::process::Command;

use anyhow::{Context, bail};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::actor::event_tap::LockIndicator;
use crate::sys::hotkey::KeyCode;
use crate::sys::keyboard::{caps_lock_mapping, cleared_mapping};

fn hidutil_set(payload: &Value) -> anyhow::Result<()> {
    let status = Command::new("/usr/bin/hidutil")
        .args(["property", "--set"])
        .arg(payload.to_string())
        .status()
        .context("running hidutil")?;
    if !status.success() {
        bail!("hidutil exited with {status}");
    }
    Ok(())
}

/// Maps Caps Lock to `key` until [`clear_caps_lock_remap`] is called.
pub fn remap_caps_lock(key: KeyCode) -> anyhow::Result<()> {
    hidutil_set(&caps_lock_mapping(key)?)?;
    info!(?key, "Remapped Caps Lock");
    Ok(())
}

pub fn clear_caps_lock_remap() {
    match hidutil_set(&cleared_mapping()) {
        Ok(()) => debug!("Cleared Caps Lock remap"),
        Err(e) => warn!("Failed to clear Caps Lock remap: {e:#}"),
    }
}

/// Whether the accessibility API (and with it the event tap) is usable.
pub fn is_process_trusted() -> bool { unsafe { AXIsProcessTrusted() } }

type io_object_t = u32;
type io_connect_t = u32;
type kern_return_t = i32;

const KERN_SUCCESS: kern_return_t = 0;
const K_IO_HID_PARAM_CONNECT_TYPE: u32 = 1;
const K_IO_HID_CAPS_LOCK_STATE: i32 = 1;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
}

#[link(name = "IOKit", kind = "framework")]
unsafe extern "C" {
    fn IOServiceMatching(name: *const c_char) -> *mut c_void;
    fn IOServiceGetMatchingService(main_port: u32, matching: *mut c_void) -> io_object_t;
    fn IOServiceOpen(
        service: io_object_t,
        owning_task: u32,
        kind: u32,
        connect: *mut io_connect_t,
    ) -> kern_return_t;
    fn IOServiceClose(connect: io_connect_t) -> kern_return_t;
    fn IOObjectRelease(object: io_object_t) -> kern_return_t;
    fn IOHIDGetModifierLockState(connect: io_connect_t, selector: i32, state: *mut bool)
    -> kern_return_t;
    fn IOHIDSetModifierLockState(connect: io_connect_t, selector: i32, state: bool)
    -> kern_return_t;
}

#[link(name = "System", kind = "framework")]
unsafe extern "C" {
    fn mach_task_self() -> u32;
}

/// Flips the Caps Lock state and its LED through the HID system service.
pub struct CapsLockIndicator;

impl CapsLockIndicator {
    fn toggle_lock_state() -> Result<(), kern_return_t> {
        unsafe {
            let matching = IOServiceMatching(c"IOHIDSystem".as_ptr());
            let service = IOServiceGetMatchingService(0, matching);
            if service == 0 {
                return Err(-1);
            }
            let mut connect: io_connect_t = 0;
            let kr = IOServiceOpen(service, mach_task_self(), K_IO_HID_PARAM_CONNECT_TYPE, &mut connect);
            IOObjectRelease(service);
            if kr != KERN_SUCCESS {
                return Err(kr);
            }

            let mut state = false;
            let mut kr = IOHIDGetModifierLockState(connect, K_IO_HID_CAPS_LOCK_STATE, &mut state);
            if kr == KERN_SUCCESS {
                kr = IOHIDSetModifierLockState(connect, K_IO_HID_CAPS_LOCK_STATE, !state);
            }
            IOServiceClose(connect);
            if kr == KERN_SUCCESS { Ok(()) } else { Err(kr) }
        }
    }
}

impl LockIndicator for CapsLockIndicator {
    fn toggle(&self) {
        if let Err(kr) = Self::toggle_lock_state() {
            warn!(kr, "Failed to toggle Caps Lock");
        }
    }
}
