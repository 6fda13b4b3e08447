use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{
    DebounceEventResult, DebouncedEvent, DebouncedEventKind, new_debouncer,
};
use tracing::{debug, info, trace, warn};

use crate::actor::event_tap::CaptureContext;
use crate::actor::reactor::{self, Event};
use crate::common::config::{Binding, Config};

/// Reloads the config file when it changes on disk and hands the result to
/// the reactor (settings) and the capture context (bindings).
pub struct ConfigWatcher {
    file: PathBuf,
    real_file: Option<PathBuf>,
    real_file_id: Option<(u64, u64)>,
    events_tx: reactor::Sender,
    capture: Arc<CaptureContext>,
    enabled: bool,
    bindings: Vec<Binding>,
}

impl ConfigWatcher {
    pub fn spawn(
        events_tx: reactor::Sender,
        capture: Arc<CaptureContext>,
        config: &Config,
        config_path: PathBuf,
    ) {
        let enabled = config.settings.hot_reload;
        let bindings = config.bindings.clone();
        let spawned = thread::Builder::new().name("config-watcher".to_string()).spawn(move || {
            let file = config_path;
            let real_file = fs::canonicalize(&file).ok();

            let real_file_id = real_file
                .as_ref()
                .and_then(|p| fs::metadata(p).ok())
                .map(|m| (m.dev(), m.ino()));

            let actor = ConfigWatcher {
                file,
                real_file,
                real_file_id,
                events_tx,
                capture,
                enabled,
                bindings,
            };
            let runtime = match tokio::runtime::Builder::new_current_thread().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("config-watcher: could not start runtime: {e:?}");
                    return;
                }
            };
            if let Err(e) = runtime.block_on(actor.run()) {
                warn!("config-watcher: error: {e:?}");
            }
        });
        if let Err(e) = spawned {
            warn!("failed to spawn config-watcher thread: {e:?}");
        }
    }

    async fn run(mut self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebouncedEvent>();

        let mut debouncer =
            new_debouncer(Duration::from_millis(250), move |res: DebounceEventResult| {
                if let Ok(events) = res {
                    for e in events {
                        if e.kind == DebouncedEventKind::Any {
                            let _ = tx.send(e);
                        }
                    }
                }
            })?;

        let watcher = debouncer.watcher();

        let mut parents: HashSet<PathBuf> = HashSet::new();
        if let Some(p) = self.file.parent() {
            parents.insert(p.to_path_buf());
        }
        if let Some(real) = &self.real_file
            && let Some(p) = real.parent()
        {
            parents.insert(p.to_path_buf());
        }

        for dir in parents.iter() {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!("watching {:?}", dir);
        }

        while let Some(event) = rx.recv().await {
            if !self.is_relevant(&event) {
                continue;
            }
            trace!("change detected (debounced): {:?} {:?}", event.kind, event.path);
            self.reload();
        }

        Ok(())
    }

    /// With hot reload off, only a change to the bindings is applied and the
    /// running settings are kept. Turning hot reload back on in the file is
    /// picked up.
    fn reload(&mut self) {
        let config = match Config::read(&self.file) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid config change: {e:#}");
                return;
            }
        };
        for issue in config.validate() {
            warn!("config: {issue}");
        }

        let hot_reload_toggled = config.settings.hot_reload != self.enabled;
        if !self.enabled && !hot_reload_toggled {
            if config.bindings == self.bindings {
                debug!("hot reload disabled; ignoring change");
            } else {
                self.capture.set_bindings(config.bindings.clone());
                self.bindings = config.bindings;
                info!("bindings reloaded; settings kept while hot reload is off");
            }
            return;
        }

        self.enabled = config.settings.hot_reload;
        if config.bindings != self.bindings {
            self.capture.set_bindings(config.bindings.clone());
            self.bindings = config.bindings;
        }
        self.events_tx.send(Event::ConfigReloaded(Box::new(config.settings)));
        info!("config reloaded");
    }

    fn is_relevant(&self, event: &DebouncedEvent) -> bool {
        if event.path == self.file {
            return true;
        }

        if let Some(real) = &self.real_file {
            if event.path == *real {
                return true;
            }

            if let Ok(ev_real) = fs::canonicalize(&event.path)
                && ev_real == *real
            {
                return true;
            }

            if let Ok(meta) = fs::metadata(&event.path)
                && let Some((dev, ino)) = self.real_file_id
                && meta.dev() == dev
                && meta.ino() == ino
            {
                return true;
            }
        }

        event.path.file_name().is_some_and(|n| Some(n) == self.file.file_name())
    }
}
