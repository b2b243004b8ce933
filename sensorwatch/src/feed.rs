//! File-backed push feed.
//!
//! Stands in for a realtime database client: an external process writes
//! the whole keyed collection to a JSON file, and this feed re-reads the
//! file whenever its modification time changes, delivering the full
//! collection through a [`PushHandle`] exactly as the push upstream would.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sensorwatch_adapters::push::{PushCollection, PushHandle};

/// Polls a JSON collection file and publishes it on change.
///
/// The feed tracks the file's modification time and only re-publishes
/// when the file has been updated.
#[derive(Debug)]
pub struct FilePushFeed {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    last_error: Option<String>,
}

impl FilePushFeed {
    /// Create a feed for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_modified: None,
            last_error: None,
        }
    }

    /// The file being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last read or parse error, if any.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Poll once: returns the collection if the file changed since the
    /// last successful read, `None` otherwise.
    pub fn poll(&mut self) -> Option<PushCollection> {
        let current_modified = self.modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, always read
            (Some(_), None) => false, // File disappeared, keep last state
            (Some(last), Some(current)) => current > last,
        };

        if !file_changed {
            return None;
        }

        let collection = self.read_file()?;
        self.last_modified = current_modified;
        Some(collection)
    }

    /// Spawn a task that polls at the given cadence and publishes through
    /// the handle. The task ends when the subscriber unsubscribes.
    pub fn spawn(mut self, handle: PushHandle, refresh: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh);
            loop {
                interval.tick().await;
                if let Some(collection) = self.poll() {
                    debug!("push feed: publishing {} records from {}",
                        collection.len(), self.path.display());
                    if !handle.publish(collection) {
                        break;
                    }
                } else if let Some(error) = self.error() {
                    warn!("push feed: {}", error);
                }
            }
        })
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn read_file(&mut self) -> Option<PushCollection> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(collection) => {
                    self.last_error = None;
                    Some(collection)
                }
                Err(e) => {
                    self.last_error = Some(format!("Parse error: {}", e));
                    None
                }
            },
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "100": {"pressure": 1.0, "flow": 2.0, "rssi": -50},
            "200": {"pressure": 1.5, "flow": 2.5, "rssi": -55}
        }"#
    }

    #[test]
    fn test_poll_reads_collection() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut feed = FilePushFeed::new(file.path());

        let collection = feed.poll().unwrap();
        assert_eq!(collection.len(), 2);
        assert!(collection.contains_key("200"));

        // Unchanged file: no re-publish.
        assert!(feed.poll().is_none());
        assert!(feed.error().is_none());
    }

    #[test]
    fn test_missing_file() {
        let mut feed = FilePushFeed::new("/nonexistent/push.json");
        assert!(feed.poll().is_none());
        assert!(feed.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut feed = FilePushFeed::new(file.path());
        assert!(feed.poll().is_none());
        assert!(feed.error().unwrap().contains("Parse error"));
    }

    #[tokio::test]
    async fn test_spawn_ends_on_unsubscribe() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let (handle, source) = sensorwatch_adapters::push::PushSource::channel("test");
        drop(source);

        let task = FilePushFeed::new(file.path())
            .spawn(handle, Duration::from_millis(1));
        task.await.unwrap();
    }
}
