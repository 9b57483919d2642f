//! JSONL sink for relay events.
//!
//! One object per line: `seq`, `timestamp` and `type`, followed by the
//! event's own fields. Non-object payloads land under `data`.

use relay_application::ports::event_logger::{RelayEvent, RelayEventLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Appends relay events to a file that outlives restarts of the relay.
///
/// `seq` restarts at zero for every instance, so records from separate runs
/// are told apart by their timestamps.
pub struct JsonlRelayEventLogger {
    out: Mutex<LineWriter<File>>,
    path: PathBuf,
    seq: AtomicU64,
}

impl JsonlRelayEventLogger {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            out: Mutex::new(LineWriter::new(file)),
            path: path.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: RelayEvent) -> Map<String, Value> {
        let mut record = match event.payload {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => Map::from_iter([("data".to_string(), other)]),
        };
        // Envelope fields win over same-named payload fields
        record.insert(
            "seq".to_string(),
            self.seq.fetch_add(1, Ordering::Relaxed).into(),
        );
        record.insert(
            "timestamp".to_string(),
            chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
                .into(),
        );
        record.insert("type".to_string(), event.event_type.into());
        record
    }
}

impl RelayEventLogger for JsonlRelayEventLogger {
    fn log(&self, event: RelayEvent) {
        let record = self.record(event);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let written = serde_json::to_writer(&mut *out, &record)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"));
        if let Err(e) = written {
            debug!("Relay event not written to {}: {}", self.path.display(), e);
        }
    }
}
