//! Keyboard capture: the Hyper key state machine plus hotkey dispatch.
//!
//! [`CaptureContext::on_key_event`] runs inside the platform's event tap
//! callback, on its own thread. It only touches atomics, a read of the
//! binding table (whose writer holds the lock just long enough to swap an
//! `Arc`) and the reactor channel, so it never waits on the reactor.

mod hyper_key;

use std::sync::Arc;
use std::time::Instant;

pub use hyper_key::{HyperKey, HyperState, Release};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::reactor::{self, Event};
use crate::common::config::{Binding, HyperSettings};
use crate::sys::hotkey::{Hotkey, KeyCode, Modifiers, ParseError};

/// The user-visible indicator toggled by tapping the Hyper key (the Caps
/// Lock light and state on macOS).
pub trait LockIndicator: Send + Sync {
    fn toggle(&self);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyEventKind {
    Down,
    Up,
}

#[derive(Debug, Copy, Clone)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    /// Virtual key code as reported by the platform. Keys outside the
    /// [`KeyCode`] table still take part in the Hyper state machine.
    pub code: u16,
    /// Modifiers physically held, as reported with the event.
    pub modifiers: Modifiers,
    pub at: Instant,
}

/// What the platform should do with the event it handed us.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Disposition {
    Pass,
    /// Deliver the event with these modifiers instead of its own.
    Rewrite(Modifiers),
    Swallow,
}

pub struct CaptureContext {
    hyper: HyperKey,
    /// Replaced wholesale on reload. The write lock is only held to swap
    /// the `Arc`, so a dispatch sees either the old or the new table.
    bindings: RwLock<Arc<Vec<Arc<Binding>>>>,
    events_tx: reactor::Sender,
    lock: Box<dyn LockIndicator>,
}

static_assertions::assert_impl_all!(CaptureContext: Send, Sync);

impl CaptureContext {
    pub fn new(
        settings: &HyperSettings,
        bindings: Vec<Binding>,
        events_tx: reactor::Sender,
        lock: Box<dyn LockIndicator>,
    ) -> Result<Self, ParseError> {
        let ctx = CaptureContext {
            hyper: HyperKey::new(settings.key_code()?, settings.tap_threshold()),
            bindings: RwLock::new(Arc::new(Vec::new())),
            events_tx,
            lock,
        };
        ctx.set_bindings(bindings);
        Ok(ctx)
    }

    pub fn set_bindings(&self, bindings: Vec<Binding>) {
        let table: Vec<Arc<Binding>> = bindings.into_iter().map(Arc::new).collect();
        debug!(count = table.len(), "Updated hotkey bindings");
        *self.bindings.write() = Arc::new(table);
    }

    pub fn hyper_state(&self) -> HyperState { self.hyper.state() }

    pub fn on_key_event(&self, event: KeyEvent) -> Disposition {
        if event.code == self.hyper.key().raw() {
            match event.kind {
                KeyEventKind::Down => self.hyper.key_down(event.at),
                KeyEventKind::Up => {
                    if self.hyper.key_up(event.at) == Release::Tap {
                        trace!("Hyper tapped");
                        self.lock.toggle();
                    }
                }
            }
            return Disposition::Swallow;
        }

        let hyper_held = match event.kind {
            KeyEventKind::Down => self.hyper.mark_used(),
            KeyEventKind::Up => self.hyper.is_held(),
        };
        let modifiers = if hyper_held {
            Modifiers::HYPER
        } else {
            event.modifiers
        };

        if event.kind == KeyEventKind::Down
            && let Some(key) = KeyCode::from_raw(event.code)
            && let Some(binding) = self.find_binding(Hotkey::new(modifiers, key))
        {
            trace!(id = %binding.id, "Dispatching hotkey");
            self.events_tx.send(Event::Hotkey(binding));
            return Disposition::Swallow;
        }

        if hyper_held {
            Disposition::Rewrite(Modifiers::HYPER)
        } else {
            Disposition::Pass
        }
    }

    /// First binding in file order wins.
    fn find_binding(&self, hotkey: Hotkey) -> Option<Arc<Binding>> {
        let table = Arc::clone(&*self.bindings.read());
        table.iter().find(|b| b.hotkey == hotkey).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::{self, reactor::Action};

    #[derive(Default)]
    struct CountingLock(Arc<AtomicUsize>);

    impl LockIndicator for CountingLock {
        fn toggle(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
    }

    struct Fixture {
        ctx: CaptureContext,
        rx: reactor::Receiver,
        toggles: Arc<AtomicUsize>,
        t0: Instant,
    }

    impl Fixture {
        fn new(bindings: Vec<Binding>) -> Self {
            let (tx, rx) = actor::channel();
            let toggles = Arc::new(AtomicUsize::new(0));
            let ctx = CaptureContext::new(
                &HyperSettings::default(),
                bindings,
                tx,
                Box::new(CountingLock(toggles.clone())),
            )
            .unwrap();
            Fixture { ctx, rx, toggles, t0: Instant::now() }
        }

        fn key(&self, kind: KeyEventKind, key: KeyCode, ms: u64) -> Disposition {
            self.raw_key(kind, key.raw(), ms)
        }

        fn raw_key(&self, kind: KeyEventKind, code: u16, ms: u64) -> Disposition {
            self.ctx.on_key_event(KeyEvent {
                kind,
                code,
                modifiers: Modifiers::empty(),
                at: self.t0 + Duration::from_millis(ms),
            })
        }

        fn dispatched(&mut self) -> Vec<String> {
            let mut ids = Vec::new();
            while let Ok((_, event)) = self.rx.try_recv() {
                if let Event::Hotkey(binding) = event {
                    ids.push(binding.id.clone());
                }
            }
            ids
        }
    }

    fn binding(id: &str, hotkey: &str, action: Action) -> Binding {
        Binding {
            id: id.to_string(),
            hotkey: hotkey.parse().unwrap(),
            action,
        }
    }

    use KeyEventKind::{Down, Up};

    #[test]
    fn test_tap_toggles_the_lock() {
        let f = Fixture::new(vec![]);
        assert_eq!(f.key(Down, KeyCode::F18, 0), Disposition::Swallow);
        assert_eq!(f.key(Up, KeyCode::F18, 150), Disposition::Swallow);
        assert_eq!(f.toggles.load(Ordering::SeqCst), 1);
        assert_eq!(f.ctx.hyper_state(), HyperState::Idle);
    }

    #[test]
    fn test_hold_with_a_key_is_not_a_tap() {
        let f = Fixture::new(vec![]);
        f.key(Down, KeyCode::F18, 0);
        assert_eq!(f.key(Down, KeyCode::KeyJ, 50), Disposition::Rewrite(Modifiers::HYPER));
        assert_eq!(f.key(Up, KeyCode::KeyJ, 80), Disposition::Rewrite(Modifiers::HYPER));
        f.key(Up, KeyCode::F18, 300);
        assert_eq!(f.toggles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_keys_without_hyper_pass_through() {
        let f = Fixture::new(vec![]);
        assert_eq!(f.key(Down, KeyCode::KeyJ, 0), Disposition::Pass);
        assert_eq!(f.ctx.hyper_state(), HyperState::Idle);
    }

    #[test]
    fn test_bound_hotkey_is_dispatched_and_swallowed() {
        let mut f = Fixture::new(vec![
            binding("layout", "Hyper + Space", Action::ToggleLayoutMode),
            binding("float", "Hyper + F", Action::ToggleFloat),
        ]);
        f.key(Down, KeyCode::F18, 0);
        assert_eq!(f.key(Down, KeyCode::KeyF, 20), Disposition::Swallow);
        f.key(Up, KeyCode::F18, 40);
        assert_eq!(f.dispatched(), vec!["float".to_string()]);
        assert_eq!(f.toggles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_first_matching_binding_wins() {
        let mut f = Fixture::new(vec![
            binding("first", "Hyper + T", Action::CycleWindows),
            binding("second", "Hyper + T", Action::ToggleFloat),
        ]);
        f.key(Down, KeyCode::F18, 0);
        f.key(Down, KeyCode::KeyT, 10);
        assert_eq!(f.dispatched(), vec!["first".to_string()]);
    }

    #[test]
    fn test_plain_modifier_bindings_match_reported_modifiers() {
        let mut f = Fixture::new(vec![binding("cmd", "cmd + shift + 1", Action::ResetLayouts)]);
        let disposition = f.ctx.on_key_event(KeyEvent {
            kind: Down,
            code: KeyCode::Digit1.raw(),
            modifiers: Modifiers::META | Modifiers::SHIFT,
            at: f.t0,
        });
        assert_eq!(disposition, Disposition::Swallow);
        assert_eq!(f.dispatched(), vec!["cmd".to_string()]);
    }

    #[test]
    fn test_reload_replaces_the_table() {
        let mut f = Fixture::new(vec![binding("old", "Hyper + A", Action::CycleWindows)]);
        f.ctx.set_bindings(vec![binding("new", "Hyper + B", Action::CycleWindows)]);
        f.key(Down, KeyCode::F18, 0);
        assert_eq!(f.key(Down, KeyCode::KeyA, 10), Disposition::Rewrite(Modifiers::HYPER));
        assert_eq!(f.key(Down, KeyCode::KeyB, 20), Disposition::Swallow);
        assert_eq!(f.dispatched(), vec!["new".to_string()]);
    }

    #[test]
    fn test_keys_outside_the_table_still_use_hyper() {
        const KEYPAD_1: u16 = 0x53;
        assert_eq!(KeyCode::from_raw(KEYPAD_1), None);
        let f = Fixture::new(vec![]);
        f.key(Down, KeyCode::F18, 0);
        assert_eq!(f.raw_key(Down, KEYPAD_1, 50), Disposition::Rewrite(Modifiers::HYPER));
        assert_eq!(f.ctx.hyper_state(), HyperState::DownUsed);
        f.key(Up, KeyCode::F18, 150);
        assert_eq!(f.toggles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_keys_without_hyper_pass_through() {
        let f = Fixture::new(vec![]);
        assert_eq!(f.raw_key(Down, 0x0A, 0), Disposition::Pass);
    }

    #[test]
    fn test_dispatch_waits_for_a_table_swap() {
        let mut f = Fixture::new(vec![binding("cycle", "Hyper + A", Action::CycleWindows)]);
        f.key(Down, KeyCode::F18, 0);
        std::thread::scope(|scope| {
            let guard = f.ctx.bindings.write();
            let ctx = &f.ctx;
            let t0 = f.t0;
            let press = scope.spawn(move || {
                ctx.on_key_event(KeyEvent {
                    kind: Down,
                    code: KeyCode::KeyA.raw(),
                    modifiers: Modifiers::empty(),
                    at: t0 + Duration::from_millis(10),
                })
            });
            std::thread::sleep(Duration::from_millis(20));
            drop(guard);
            assert_eq!(press.join().unwrap(), Disposition::Swallow);
        });
        assert_eq!(f.dispatched(), vec!["cycle".to_string()]);
    }
}
