//! Durable snapshot files.
//!
//! Snapshots live at `<location>/<environment>.json` in the same document shape
//! the remote authority serves.

use crate::model::Snapshot;
use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::IntoAppError;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::time::SystemTime;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "   storage";

/// Reads, writes and watches the snapshot file for one environment.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    location: Utf8PathBuf,
    environment: String,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(location: impl Into<Utf8PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            environment: environment.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.location.join(format!("{}.json", self.environment))
    }

    /// Read the snapshot file, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotLoad`] if the file cannot be read or parsed.
    pub fn read(&self) -> Result<Option<Snapshot>> {
        let path = self.path();
        match read_snapshot(&path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(ReadFailure::NotFound) => Ok(None),
            Err(ReadFailure::Other(e)) => Err(Error::snapshot(format!("{e:#}"))),
        }
    }

    /// Write `snapshot`, creating the location if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotLoad`] if the file cannot be written.
    pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_core(snapshot).map_err(|e| Error::snapshot(format!("{e:#}")))?;
        log::debug!(target: LOG_TARGET, "Saved snapshot version {} to {}", snapshot.version(), self.path());
        Ok(())
    }

    fn write_core(&self, snapshot: &Snapshot) -> Result<(), ohno::AppError> {
        let path = self.path();
        fs::create_dir_all(&self.location).into_app_err_with(|| format!("creating snapshot directory '{}'", self.location))?;

        // readers only ever see a complete file
        let staging = self.staging_path();
        let file = File::create(&staging).into_app_err_with(|| format!("creating snapshot file '{staging}'"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot).into_app_err_with(|| format!("writing snapshot file '{staging}'"))?;
        writer.flush().into_app_err_with(|| format!("flushing snapshot file '{staging}'"))?;
        drop(writer);

        fs::rename(&staging, &path).into_app_err_with(|| format!("replacing snapshot file '{path}'"))?;
        Ok(())
    }

    fn staging_path(&self) -> Utf8PathBuf {
        self.location.join(format!("{}.json.tmp", self.environment))
    }

    /// Read the snapshot file, creating a version-0 placeholder if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotLoad`] if the file exists but is unusable, or
    /// the placeholder cannot be written.
    pub fn load_or_placeholder(&self) -> Result<Snapshot> {
        if let Some(snapshot) = self.read()? {
            log::debug!(target: LOG_TARGET, "Loaded snapshot version {} from {}", snapshot.version(), self.path());
            return Ok(snapshot);
        }

        log::info!(target: LOG_TARGET, "No snapshot at {}, writing placeholder", self.path());
        let placeholder = Snapshot::placeholder();
        self.write(&placeholder)?;
        Ok(placeholder)
    }

    /// Poll the snapshot file every `interval` and call `on_change` whenever its
    /// modification time moves.
    ///
    /// The returned task runs until aborted.
    pub fn watch<F>(&self, interval: Duration, on_change: F) -> JoinHandle<()>
    where
        F: Fn(Result<Snapshot>) + Send + 'static,
    {
        let path = self.path();
        tokio::spawn(async move {
            let mut last_seen = modified(&path);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                let _ = ticker.tick().await;

                let current = modified(&path);
                if current.is_none() || current == last_seen {
                    continue;
                }
                last_seen = current;

                log::debug!(target: LOG_TARGET, "Snapshot file {path} changed");
                let outcome = match read_snapshot(&path) {
                    Ok(snapshot) => Ok(snapshot),
                    Err(ReadFailure::NotFound) => continue,
                    Err(ReadFailure::Other(e)) => Err(Error::snapshot(format!("{e:#}"))),
                };
                on_change(outcome);
            }
        })
    }
}

enum ReadFailure {
    NotFound,
    Other(ohno::AppError),
}

fn read_snapshot(path: &Utf8Path) -> Result<Snapshot, ReadFailure> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ReadFailure::NotFound),
        Err(e) => {
            return Err(e)
                .into_app_err_with(|| format!("reading snapshot file '{path}'"))
                .map_err(ReadFailure::Other);
        }
    };

    serde_json::from_str(&text)
        .into_app_err_with(|| format!("parsing snapshot file '{path}'"))
        .map_err(ReadFailure::Other)
}

fn modified(path: &Utf8Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
