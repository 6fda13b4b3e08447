use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tracing::{debug, warn};

use super::collections::HashSet;
use crate::actor::reactor::Action;
use crate::sys::hotkey::{Hotkey, KeyCode, ParseError};

const DEFAULT_CONFIG: &str = include_str!("../../hypertile.default.toml");

static DEFAULT: Lazy<Config> =
    Lazy::new(|| Config::parse(DEFAULT_CONFIG).expect("built-in default config must parse"));

pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("hypertile")
        .join("config.toml")
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    bindings: Vec<BindingEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BindingEntry {
    id: String,
    key: String,
    #[serde(default)]
    modifiers: Vec<String>,
    action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: String,
    pub hotkey: Hotkey,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    /// In file order; the first match wins at dispatch time.
    pub bindings: Vec<Binding>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// Space between tiled windows and around the display edge.
    pub gap: f64,
    pub hot_reload: bool,
    pub hyper: HyperSettings,
    pub timing: TimingSettings,
    pub floating: FloatingSettings,
    pub profiles: ProfileSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HyperSettings {
    /// The synthetic key the Hyper key produces. Must be one of F13..F20 when
    /// Caps Lock is remapped to it.
    pub key: String,
    pub remap_caps_lock: bool,
    pub tap_threshold_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct TimingSettings {
    pub retile_debounce_ms: u64,
    pub launch_settle_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct FloatingSettings {
    /// Bundle identifiers whose windows never tile.
    pub apps: Vec<String>,
    pub subroles: Vec<String>,
    pub min_tile_width: f64,
    pub min_tile_height: f64,
    /// Windows smaller than `size_ratio` times the minimum tile size float.
    pub size_ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ProfileSettings {
    pub brave_bundle_id: String,
    pub brave_title_separator: String,
    /// Launch argument selecting a profile; `{profile}` is substituted.
    pub brave_profile_arg: String,
    pub safari_bundle_id: String,
    pub safari_title_separator: String,
    /// Menu path to the "new window for profile" item; `{profile}` is
    /// substituted in every segment.
    pub safari_new_window_menu: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gap: 8.0,
            hot_reload: true,
            hyper: HyperSettings::default(),
            timing: TimingSettings::default(),
            floating: FloatingSettings::default(),
            profiles: ProfileSettings::default(),
        }
    }
}

impl Default for HyperSettings {
    fn default() -> Self {
        Self {
            key: "F18".to_string(),
            remap_caps_lock: true,
            tap_threshold_ms: 200,
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            retile_debounce_ms: 100,
            launch_settle_ms: 300,
        }
    }
}

impl Default for FloatingSettings {
    fn default() -> Self {
        Self {
            apps: [
                "com.apple.calculator",
                "com.apple.systempreferences",
                "com.apple.ActivityMonitor",
                "com.apple.archiveutility",
            ]
            .map(String::from)
            .to_vec(),
            subroles: ["AXDialog", "AXSystemDialog", "AXFloatingWindow", "AXSheet"]
                .map(String::from)
                .to_vec(),
            min_tile_width: 600.0,
            min_tile_height: 400.0,
            size_ratio: 0.8,
        }
    }
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            brave_bundle_id: "com.brave.Browser".to_string(),
            brave_title_separator: " - ".to_string(),
            brave_profile_arg: "--profile-directory={profile}".to_string(),
            safari_bundle_id: "com.apple.Safari".to_string(),
            safari_title_separator: " - ".to_string(),
            safari_new_window_menu: ["File", "New Window", "New {profile} Window"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl HyperSettings {
    pub fn key_code(&self) -> Result<KeyCode, ParseError> { self.key.parse() }

    pub fn tap_threshold(&self) -> Duration { Duration::from_millis(self.tap_threshold_ms) }
}

impl TimingSettings {
    pub fn retile_debounce(&self) -> Duration { Duration::from_millis(self.retile_debounce_ms) }

    pub fn launch_settle(&self) -> Duration { Duration::from_millis(self.launch_settle_ms) }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.gap < 0.0 {
            issues.push(format!("gap must be non-negative, got {}", self.gap));
        }
        if let Err(e) = self.hyper.key_code() {
            issues.push(format!("hyper.key: {e}"));
        }
        if self.floating.size_ratio <= 0.0 {
            issues.push(format!(
                "floating.size_ratio must be positive, got {}",
                self.floating.size_ratio
            ));
        }
        if self.floating.min_tile_width <= 0.0 || self.floating.min_tile_height <= 0.0 {
            issues.push("floating.min_tile_width and min_tile_height must be positive".to_string());
        }
        if self.timing.retile_debounce_ms == 0 {
            issues.push("timing.retile_debounce_ms must be positive".to_string());
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn default() -> Config { DEFAULT.clone() }

    /// Reads `path`, falling back to the built-in default on any error. The
    /// file itself is never modified.
    pub fn load_or_default(path: &Path) -> Config {
        if !path.exists() {
            debug!(?path, "No config file; using built-in defaults");
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(?path, "Invalid config, falling back to built-in defaults: {e:#}");
                Self::default()
            }
        }
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        let mut ids = HashSet::default();
        let mut hotkeys = HashSet::default();
        for binding in &self.bindings {
            if !ids.insert(binding.id.as_str()) {
                issues.push(format!("duplicate binding id `{}`", binding.id));
            }
            if !hotkeys.insert(binding.hotkey) {
                issues.push(format!(
                    "binding `{}` reuses hotkey {}; only the first binding fires",
                    binding.id, binding.hotkey
                ));
            }
        }

        issues
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let file = match toml::from_str::<ConfigFile>(buf) {
            Ok(file) => file,
            Err(e) => {
                let msg = e.to_string();
                match extract_unknown_variant(&msg).and_then(|u| suggest_action(&u)) {
                    Some(suggestion) => bail!("{msg}\nDid you mean `{suggestion}`?"),
                    None => bail!("{msg}"),
                }
            }
        };

        if let Err(e) = file.settings.hyper.key_code() {
            bail!("settings.hyper.key: {e}");
        }

        let mut bindings = Vec::with_capacity(file.bindings.len());
        for entry in file.bindings {
            let hotkey = Hotkey::from_parts(&entry.key, &entry.modifiers[..])
                .with_context(|| format!("binding `{}`", entry.id))?;
            bindings.push(Binding {
                id: entry.id,
                hotkey,
                action: entry.action,
            });
        }

        Ok(Config { settings: file.settings, bindings })
    }
}

/// Pulls the token out of serde's "unknown variant `...`" message.
fn extract_unknown_variant(err: &str) -> Option<String> {
    let needle = "unknown variant `";
    let start = err.find(needle)? + needle.len();
    let rest = &err[start..];
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

fn suggest_action(unknown: &str) -> Option<&'static str> {
    let unknown = unknown.to_lowercase();
    let (best, dist) = Action::VARIANTS
        .iter()
        .map(|cand| (*cand, levenshtein(&unknown, cand)))
        .min_by_key(|(_, dist)| *dist)?;
    let threshold = std::cmp::max(3, best.len() / 2);
    (dist <= threshold).then_some(best)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        prev = cur;
    }
    prev[b.len()]
}
