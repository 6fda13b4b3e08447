//! Tap/hold disambiguation for the Hyper key.
//!
//! Holding the key and pressing another one makes that key act as if all four
//! modifiers were held. Pressing and releasing it alone within the threshold
//! is a tap. State lives in atomics because the capture callback must never
//! block.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::sys::hotkey::KeyCode;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum HyperState {
    Idle = 0,
    /// Held, no other key pressed yet.
    DownUnused = 1,
    /// Held and used as a modifier at least once.
    DownUsed = 2,
}

impl From<HyperState> for u8 {
    fn from(state: HyperState) -> u8 { state as u8 }
}

impl TryFrom<u8> for HyperState {
    type Error = ();

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            x if x == HyperState::Idle as u8 => Ok(HyperState::Idle),
            x if x == HyperState::DownUnused as u8 => Ok(HyperState::DownUnused),
            x if x == HyperState::DownUsed as u8 => Ok(HyperState::DownUsed),
            _ => Err(()),
        }
    }
}

/// What a key-up of the Hyper key amounted to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Release {
    Tap,
    Hold,
    /// Key-up without a matching key-down, e.g. held across startup.
    Stray,
}

pub struct HyperKey {
    key: KeyCode,
    threshold: Duration,
    epoch: Instant,
    state: AtomicU8,
    /// Microseconds since `epoch` of the key-down that left `Idle`.
    down_at: AtomicU64,
}

impl HyperKey {
    pub fn new(key: KeyCode, threshold: Duration) -> Self {
        HyperKey {
            key,
            threshold,
            epoch: Instant::now(),
            state: AtomicU8::new(HyperState::Idle.into()),
            down_at: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> KeyCode { self.key }

    pub fn state(&self) -> HyperState {
        HyperState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(HyperState::Idle)
    }

    pub fn is_held(&self) -> bool { self.state() != HyperState::Idle }

    /// Auto-repeat key-downs while held leave the state and timestamp alone.
    pub fn key_down(&self, at: Instant) {
        if self
            .state
            .compare_exchange(
                HyperState::Idle.into(),
                HyperState::DownUnused.into(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.down_at.store(self.micros_since_epoch(at), Ordering::Release);
        }
    }

    /// Records that another key was pressed. Returns whether Hyper was held.
    pub fn mark_used(&self) -> bool {
        self.state
            .compare_exchange(
                HyperState::DownUnused.into(),
                HyperState::DownUsed.into(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_or_else(|current| current == u8::from(HyperState::DownUsed), |_| true)
    }

    pub fn key_up(&self, at: Instant) -> Release {
        let previous = self.state.swap(HyperState::Idle.into(), Ordering::AcqRel);
        match HyperState::try_from(previous) {
            Ok(HyperState::DownUnused) => {
                let down_at = self.down_at.load(Ordering::Acquire);
                let held = self.micros_since_epoch(at).saturating_sub(down_at);
                if Duration::from_micros(held) < self.threshold {
                    Release::Tap
                } else {
                    Release::Hold
                }
            }
            Ok(HyperState::DownUsed) => Release::Hold,
            _ => Release::Stray,
        }
    }

    fn micros_since_epoch(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn hyper() -> (HyperKey, Instant) {
        let key = HyperKey::new(KeyCode::F18, Duration::from_millis(200));
        let start = Instant::now();
        (key, start)
    }

    #[test]
    fn test_quick_press_is_a_tap() {
        let (key, t0) = hyper();
        key.key_down(t0);
        assert_eq!(key.state(), HyperState::DownUnused);
        assert_eq!(key.key_up(t0 + Duration::from_millis(150)), Release::Tap);
        assert_eq!(key.state(), HyperState::Idle);
    }

    #[test]
    fn test_long_press_alone_is_not_a_tap() {
        let (key, t0) = hyper();
        key.key_down(t0);
        assert_eq!(key.key_up(t0 + Duration::from_millis(250)), Release::Hold);
    }

    #[test]
    fn test_using_the_key_prevents_a_tap() {
        let (key, t0) = hyper();
        key.key_down(t0);
        assert!(key.mark_used());
        assert!(key.mark_used());
        assert_eq!(key.state(), HyperState::DownUsed);
        assert_eq!(key.key_up(t0 + Duration::from_millis(50)), Release::Hold);
    }

    #[test]
    fn test_auto_repeat_keeps_the_first_timestamp() {
        let (key, t0) = hyper();
        key.key_down(t0);
        key.key_down(t0 + Duration::from_millis(180));
        assert_eq!(key.key_up(t0 + Duration::from_millis(210)), Release::Hold);
    }

    #[test]
    fn test_other_keys_while_idle() {
        let (key, t0) = hyper();
        assert!(!key.mark_used());
        assert_eq!(key.state(), HyperState::Idle);
        assert_eq!(key.key_up(t0), Release::Stray);
    }
}
