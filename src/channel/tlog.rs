//! Telemetry log capture (`debug-tools` feature)
//!
//! Each record is an 8-byte big-endian timestamp in microseconds since the
//! Unix epoch followed by the raw frame bytes, the layout ground-station
//! tools read as `.tlog`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::Message;

/// Cloneable handle appending frames to a telemetry log.
#[derive(Clone)]
pub struct TlogRecorder {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl TlogRecorder {
    /// Create a recorder writing to `path`, truncating any existing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Record raw frame bytes stamped with the current time.
    pub fn record(&self, frame: &[u8]) -> io::Result<()> {
        let stamp = timestamp_micros(SystemTime::now());
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("tlog recorder poisoned"))?;
        guard.write_all(&stamp.to_be_bytes())?;
        guard.write_all(frame)?;
        guard.flush()
    }

    /// Record a parsed message in its wire form.
    pub fn record_message(&self, message: &Message) -> io::Result<()> {
        self.record(&message.to_bytes())
    }
}

impl std::fmt::Debug for TlogRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlogRecorder").finish_non_exhaustive()
    }
}

fn timestamp_micros(timestamp: SystemTime) -> u64 {
    let duration = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
