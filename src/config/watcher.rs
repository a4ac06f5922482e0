//! Hot reload of pipeline settings from the config file.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by renaming a temp file over the original are seen.
//! A reload is forwarded only when it parses, validates, and changes the
//! pipeline settings; everything else in the file needs a restart.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;
use crate::pipeline::PipelineSettings;

/// Watches the config file and forwards configurations whose pipeline
/// settings differ from the last ones applied.
pub struct ConfigWatcher {
    reloader: Reloader,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration the service started with.
    pub fn new(
        path: &Path,
        current: &ServiceConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            applied: PipelineSettings::from(current),
        };
        (Self { reloader, update_tx }, update_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            mut reloader,
            update_tx,
        } = self;
        let dir = watch_dir(&reloader.path);
        let file_name = reloader.path.file_name().map(OsString::from);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_deref()) => {
                    if let Some(config) = reloader.reload() {
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    applied: PipelineSettings,
}

impl Reloader {
    fn reload(&mut self) -> Option<ServiceConfig> {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Config reload rejected, keeping current settings");
                return None;
            }
        };

        let settings = PipelineSettings::from(&config);
        if settings == self.applied {
            tracing::debug!(path = ?self.path, "Config changed without affecting pipeline settings");
            return None;
        }

        tracing::info!(path = ?self.path, "Config reloaded");
        self.applied = settings;
        Some(config)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}
