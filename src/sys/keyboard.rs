//! The key remap that turns Caps Lock into the Hyper key.
//!
//! Caps Lock cannot be told apart from its lock state in an event tap, so
//! it is remapped at the HID layer to an otherwise unused function key.

use serde_json::{Value, json};
use thiserror::Error;

use crate::sys::hotkey::KeyCode;

const HID_KEYBOARD_PAGE: u64 = 0x7_0000_0000;
const HID_CAPS_LOCK: u64 = HID_KEYBOARD_PAGE | 0x39;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0:?} cannot be a remap target; use one of F13..F20")]
pub struct UnsupportedRemapTarget(pub KeyCode);

/// HID usage of the function keys Caps Lock may be remapped to.
pub fn hid_usage(key: KeyCode) -> Option<u64> {
    let usage = match key {
        KeyCode::F13 => 0x68,
        KeyCode::F14 => 0x69,
        KeyCode::F15 => 0x6A,
        KeyCode::F16 => 0x6B,
        KeyCode::F17 => 0x6C,
        KeyCode::F18 => 0x6D,
        KeyCode::F19 => 0x6E,
        KeyCode::F20 => 0x6F,
        _ => return None,
    };
    Some(HID_KEYBOARD_PAGE | usage)
}

/// The `hidutil property --set` payload mapping Caps Lock to `key`.
pub fn caps_lock_mapping(key: KeyCode) -> Result<Value, UnsupportedRemapTarget> {
    let dst = hid_usage(key).ok_or(UnsupportedRemapTarget(key))?;
    Ok(json!({
        "UserKeyMapping": [{
            "HIDKeyboardModifierMappingSrc": HID_CAPS_LOCK,
            "HIDKeyboardModifierMappingDst": dst,
        }]
    }))
}

pub fn cleared_mapping() -> Value { json!({ "UserKeyMapping": [] }) }

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_f18_mapping() {
        let payload = caps_lock_mapping(KeyCode::F18).unwrap();
        assert_eq!(
            payload["UserKeyMapping"][0]["HIDKeyboardModifierMappingSrc"],
            json!(0x7_0000_0039u64)
        );
        assert_eq!(
            payload["UserKeyMapping"][0]["HIDKeyboardModifierMappingDst"],
            json!(0x7_0000_006Du64)
        );
    }

    #[test]
    fn test_only_high_function_keys_are_targets() {
        assert_eq!(hid_usage(KeyCode::F13), Some(0x7_0000_0068));
        assert_eq!(hid_usage(KeyCode::F20), Some(0x7_0000_006F));
        assert_eq!(
            caps_lock_mapping(KeyCode::KeyA),
            Err(UnsupportedRemapTarget(KeyCode::KeyA))
        );
    }

    #[test]
    fn test_cleared_mapping_is_empty() {
        assert_eq!(cleared_mapping().to_string(), r#"{"UserKeyMapping":[]}"#);
    }
}
