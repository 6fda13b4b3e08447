use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::common::collections::HashSet;
use crate::common::config::FloatingSettings;
use crate::sys::window_system::{RunningApp, WindowInfo, pid_t};

/// Identifies a window across enumerations: owning pid plus a hash of its
/// title. Windows that retitle themselves get a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub pid: pid_t,
    title_hash: u64,
}

impl WindowKey {
    pub fn new(pid: pid_t, title: &str) -> Self {
        let mut hasher = FxHasher::default();
        title.hash(&mut hasher);
        Self { pid, title_hash: hasher.finish() }
    }

    pub fn of(info: &WindowInfo) -> Self { Self::new(info.pid, &info.title) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatReason {
    Manual,
    App,
    Subrole,
    TooSmall,
}

/// Decides which windows stay out of the tiling layout.
#[derive(Debug, Default)]
pub struct FloatingClassifier {
    /// Toggled by the user. Entries for exited processes are never pruned;
    /// they simply stop matching anything.
    manual: HashSet<WindowKey>,
    apps: HashSet<String>,
    subroles: HashSet<String>,
    min_width: f64,
    min_height: f64,
}

impl FloatingClassifier {
    pub fn new(settings: &FloatingSettings) -> Self {
        let mut classifier = Self::default();
        classifier.apply_settings(settings);
        classifier
    }

    /// Replaces the rule set; the manually floated set is kept.
    pub fn apply_settings(&mut self, settings: &FloatingSettings) {
        self.apps = settings.apps.iter().cloned().collect();
        self.subroles = settings.subroles.iter().cloned().collect();
        self.min_width = settings.min_tile_width * settings.size_ratio;
        self.min_height = settings.min_tile_height * settings.size_ratio;
    }

    pub fn is_manually_floated(&self, key: &WindowKey) -> bool { self.manual.contains(key) }

    /// Returns true if the window is now manually floated.
    pub fn toggle_manual(&mut self, key: WindowKey) -> bool {
        if self.manual.remove(&key) {
            false
        } else {
            self.manual.insert(key);
            true
        }
    }

    /// First matching rule wins, so a manual toggle beats every heuristic.
    pub fn classify(&self, window: &WindowInfo, app: &RunningApp) -> Option<FloatReason> {
        if self.manual.contains(&WindowKey::of(window)) {
            return Some(FloatReason::Manual);
        }
        if app.bundle_id.as_ref().is_some_and(|id| self.apps.contains(id)) {
            return Some(FloatReason::App);
        }
        if self.subroles.contains(&window.subrole) {
            return Some(FloatReason::Subrole);
        }
        let size = window.frame.size;
        if size.width < self.min_width || size.height < self.min_height {
            return Some(FloatReason::TooSmall);
        }
        None
    }

    pub fn should_float(&self, window: &WindowInfo, app: &RunningApp) -> bool {
        self.classify(window, app).is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::geometry::Rect;
    use crate::sys::window_system::{AX_STANDARD_WINDOW_SUBROLE, AX_WINDOW_ROLE};

    fn classifier() -> FloatingClassifier { FloatingClassifier::new(&FloatingSettings::default()) }

    fn app(bundle_id: &str) -> RunningApp {
        RunningApp {
            pid: 7,
            bundle_id: Some(bundle_id.to_string()),
            is_active: false,
            is_hidden: false,
        }
    }

    fn window(width: f64, height: f64, subrole: &str) -> WindowInfo {
        WindowInfo {
            pid: 7,
            title: "Untitled".to_string(),
            frame: Rect::new(0.0, 0.0, width, height),
            role: AX_WINDOW_ROLE.to_string(),
            subrole: subrole.to_string(),
            minimized: false,
        }
    }

    #[test]
    fn test_small_window_floats() {
        let c = classifier();
        let w = window(500.0, 300.0, AX_STANDARD_WINDOW_SUBROLE);
        assert_eq!(c.classify(&w, &app("com.example.editor")), Some(FloatReason::TooSmall));
    }

    #[test]
    fn test_dialog_floats() {
        let c = classifier();
        let w = window(800.0, 600.0, "AXDialog");
        assert_eq!(c.classify(&w, &app("com.example.editor")), Some(FloatReason::Subrole));
    }

    #[test]
    fn test_regular_window_tiles() {
        let c = classifier();
        let w = window(800.0, 600.0, AX_STANDARD_WINDOW_SUBROLE);
        assert!(!c.should_float(&w, &app("com.example.editor")));
    }

    #[test]
    fn test_size_threshold_is_scaled_minimum() {
        let c = classifier();
        let editor = app("com.example.editor");
        // 0.8 * 600 = 480 and 0.8 * 400 = 320.
        assert!(!c.should_float(&window(480.0, 320.0, AX_STANDARD_WINDOW_SUBROLE), &editor));
        assert!(c.should_float(&window(479.0, 900.0, AX_STANDARD_WINDOW_SUBROLE), &editor));
        assert!(c.should_float(&window(900.0, 319.0, AX_STANDARD_WINDOW_SUBROLE), &editor));
    }

    #[test]
    fn test_allow_listed_app_floats() {
        let c = classifier();
        let w = window(1200.0, 800.0, AX_STANDARD_WINDOW_SUBROLE);
        assert_eq!(
            c.classify(&w, &app("com.apple.calculator")),
            Some(FloatReason::App)
        );
    }

    #[test]
    fn test_manual_wins_over_everything() {
        let mut c = classifier();
        let w = window(300.0, 200.0, "AXDialog");
        assert!(c.toggle_manual(WindowKey::of(&w)));
        assert_eq!(c.classify(&w, &app("com.apple.calculator")), Some(FloatReason::Manual));

        assert!(!c.toggle_manual(WindowKey::of(&w)));
        assert_eq!(c.classify(&w, &app("com.example.editor")), Some(FloatReason::Subrole));
    }

    #[test]
    fn test_window_key_depends_on_title() {
        assert_eq!(WindowKey::new(1, "Inbox"), WindowKey::new(1, "Inbox"));
        assert_ne!(WindowKey::new(1, "Inbox"), WindowKey::new(1, "Outbox"));
        assert_ne!(WindowKey::new(1, "Inbox"), WindowKey::new(2, "Inbox"));
    }

    #[test]
    fn test_apply_settings_keeps_manual_set() {
        let mut c = classifier();
        let w = window(1200.0, 800.0, AX_STANDARD_WINDOW_SUBROLE);
        c.toggle_manual(WindowKey::of(&w));

        let settings = FloatingSettings {
            size_ratio: 1.0,
            ..FloatingSettings::default()
        };
        c.apply_settings(&settings);
        assert!(c.is_manually_floated(&WindowKey::of(&w)));
        assert!(c.should_float(&window(590.0, 900.0, AX_STANDARD_WINDOW_SUBROLE), &app("x")));
    }
}
