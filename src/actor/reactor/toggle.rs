//! Show/hide toggles for whole applications and for browser profile windows
//! that share one process.

use tracing::{debug, info};

use super::{Event, Reactor, ReactorError};
use crate::common::config::ProfileSettings;
use crate::sys::window_system::{RunningApp, WindowInfo, WindowSystem, pid_t};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfileApp {
    /// Selects a profile with a launch argument.
    Brave,
    /// Has no launch argument; new profile windows come from a menu item.
    Safari,
}

impl ProfileApp {
    fn bundle_id(self, settings: &ProfileSettings) -> &str {
        match self {
            ProfileApp::Brave => &settings.brave_bundle_id,
            ProfileApp::Safari => &settings.safari_bundle_id,
        }
    }

    fn title_separator(self, settings: &ProfileSettings) -> &str {
        match self {
            ProfileApp::Brave => &settings.brave_title_separator,
            ProfileApp::Safari => &settings.safari_title_separator,
        }
    }
}

/// A window belongs to `profile` if its title is the profile name or ends in
/// the separator followed by it.
pub(crate) fn matches_profile(title: &str, profile: &str, separator: &str) -> bool {
    title == profile
        || title
            .strip_suffix(profile)
            .is_some_and(|rest| rest.ends_with(separator))
}

fn substitute(template: &str, profile: &str) -> String { template.replace("{profile}", profile) }

impl<S: WindowSystem> Reactor<S> {
    pub(crate) fn toggle_app(&mut self, bundle_id: &str) -> Result<(), ReactorError> {
        match self.live_app(bundle_id) {
            Some(app) if app.is_active => {
                debug!(bundle_id, pid = app.pid, "Hiding active app");
                self.system.hide_app(app.pid)?;
                self.schedule_retile();
            }
            Some(app) => {
                debug!(bundle_id, pid = app.pid, "Showing app");
                if app.is_hidden {
                    self.system.unhide_app(app.pid)?;
                }
                let windows = self.app_window_infos(app.pid);
                for (window, info) in &windows {
                    if info.minimized
                        && let Err(err) = self.system.set_minimized(window, false)
                    {
                        debug!(?err, title = %info.title, "Could not unminimize window");
                    }
                }
                if let Some((window, info)) = windows.first()
                    && let Some(display) = self.current_display()
                {
                    self.preposition(window, info, display);
                }
                self.system.activate_app(app.pid)?;
                self.schedule_retile();
            }
            None => {
                let target = self.current_display();
                info!(bundle_id, display = ?target, "Launching app");
                self.system.launch_app(bundle_id, &[])?;
                self.timer.send_after(
                    self.settings.timing.launch_settle(),
                    Event::LaunchSettled {
                        bundle_id: bundle_id.to_string(),
                        profile: None,
                        display: target,
                    },
                );
            }
        }
        Ok(())
    }

    pub(crate) fn toggle_profile(
        &mut self,
        kind: ProfileApp,
        profile: &str,
    ) -> Result<(), ReactorError> {
        let bundle_id = kind.bundle_id(&self.settings.profiles).to_string();
        let separator = kind.title_separator(&self.settings.profiles).to_string();
        let matches = |info: &WindowInfo| matches_profile(&info.title, profile, &separator);

        let Some(app) = self.live_app(&bundle_id) else {
            return self.launch_profile(kind, &bundle_id, profile, None);
        };

        if app.is_active
            && let Some((_, focused)) = self.focused()
            && focused.pid == app.pid
            && matches(&focused)
        {
            debug!(profile, pid = app.pid, "Hiding profile's app");
            self.system.hide_app(app.pid)?;
            self.schedule_retile();
            return Ok(());
        }

        let windows = self.app_window_infos(app.pid);
        let Some((window, info)) = windows.into_iter().find(|(_, info)| matches(info)) else {
            return self.launch_profile(kind, &bundle_id, profile, Some(&app));
        };

        if app.is_hidden {
            self.system.unhide_app(app.pid)?;
        }
        if info.minimized {
            debug!(profile, title = %info.title, "Restoring minimized profile window");
            self.system.set_minimized(&window, false)?;
        } else if let Some(display) = self.current_display() {
            self.preposition(&window, &info, display);
        }
        self.system.raise(&window)?;
        self.system.activate_app(app.pid)?;
        self.schedule_retile();
        Ok(())
    }

    fn launch_profile(
        &mut self,
        kind: ProfileApp,
        bundle_id: &str,
        profile: &str,
        running: Option<&RunningApp>,
    ) -> Result<(), ReactorError> {
        let target = self.current_display();
        let settle = self.settings.timing.launch_settle();
        info!(bundle_id, profile, display = ?target, "Opening profile window");
        match (kind, running) {
            (ProfileApp::Brave, _) => {
                let arg = substitute(&self.settings.profiles.brave_profile_arg, profile);
                self.system.launch_app(bundle_id, &[arg])?;
            }
            (ProfileApp::Safari, Some(app)) => {
                self.press_profile_menu(app.pid, profile)?;
            }
            (ProfileApp::Safari, None) => {
                self.system.launch_app(bundle_id, &[])?;
                self.timer.send_after(
                    settle,
                    Event::ProfileMenuSettled { profile: profile.to_string(), display: target },
                );
                return Ok(());
            }
        }
        self.timer.send_after(
            settle,
            Event::LaunchSettled {
                bundle_id: bundle_id.to_string(),
                profile: Some(profile.to_string()),
                display: target,
            },
        );
        Ok(())
    }

    fn press_profile_menu(&mut self, pid: pid_t, profile: &str) -> Result<(), ReactorError> {
        let path: Vec<String> = self
            .settings
            .profiles
            .safari_new_window_menu
            .iter()
            .map(|segment| substitute(segment, profile))
            .collect();
        self.system.activate_app(pid)?;
        self.system.press_menu_item(pid, &path)?;
        Ok(())
    }

    /// Safari finished launching; its profile menu is usable now.
    pub(crate) fn on_profile_menu_settled(&mut self, profile: &str, display: Option<usize>) {
        let bundle_id = self.settings.profiles.safari_bundle_id.clone();
        self.apps.invalidate();
        let Some(app) = self.live_app(&bundle_id) else {
            debug!(bundle_id, "Launched app never showed up");
            return;
        };
        if let Err(err) = self.press_profile_menu(app.pid, profile) {
            debug!(%err, profile, "Could not open profile window");
            return;
        }
        self.timer.send_after(
            self.settings.timing.launch_settle(),
            Event::LaunchSettled {
                bundle_id,
                profile: Some(profile.to_string()),
                display,
            },
        );
    }

    /// Moves the newly opened window to the display the launch was requested
    /// from, then retiles.
    pub(crate) fn on_launch_settled(
        &mut self,
        bundle_id: &str,
        profile: Option<&str>,
        display: Option<usize>,
    ) {
        self.apps.invalidate();
        if let Some(app) = self.live_app(bundle_id)
            && let Some(display) = display
        {
            let separator = match profile {
                Some(_) if bundle_id == self.settings.profiles.safari_bundle_id => {
                    self.settings.profiles.safari_title_separator.clone()
                }
                _ => self.settings.profiles.brave_title_separator.clone(),
            };
            let windows = self.app_window_infos(app.pid);
            let target = windows.iter().find(|(_, info)| match profile {
                Some(profile) => matches_profile(&info.title, profile, &separator),
                None => true,
            });
            if let Some((window, info)) = target {
                self.preposition(window, info, display);
            }
        }
        self.schedule_retile();
    }

    /// Windows of one app with their info; windows that vanish mid-query are
    /// left out.
    fn app_window_infos(&self, pid: pid_t) -> Vec<(S::Window, WindowInfo)> {
        let handles = match self.system.app_windows(pid) {
            Ok(handles) => handles,
            Err(err) => {
                debug!(pid, ?err, "Could not list app windows");
                return Vec::new();
            }
        };
        handles
            .into_iter()
            .filter_map(|window| {
                let info = self.system.window_info(&window).ok()?;
                Some((window, info))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_matches_profile() {
        assert!(matches_profile("Inbox - Work", "Work", " - "));
        assert!(matches_profile("Work", "Work", " - "));
        assert!(!matches_profile("Inbox - Personal", "Work", " - "));
        assert!(!matches_profile("Homework", "Work", " - "));
        assert!(!matches_profile("Work - Inbox", "Work", " - "));
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("New {profile} Window", "Work"), "New Work Window");
        assert_eq!(substitute("--profile-directory={profile}", "Default"), "--profile-directory=Default");
    }
}
