use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide codec counters, kept without external dependencies.
pub(crate) struct Metrics;

static FRAMES_SENT: AtomicU64 = AtomicU64::new(0);
static BYTES_SENT: AtomicU64 = AtomicU64::new(0);
static FRAMES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static CHECKSUM_ERRORS: AtomicU64 = AtomicU64::new(0);
static REJECTED_FRAMES: AtomicU64 = AtomicU64::new(0);
static SINK_ERRORS: AtomicU64 = AtomicU64::new(0);

impl Metrics {
    #[inline]
    pub(crate) fn record_sent(wire_len: usize) {
        FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
        BYTES_SENT.fetch_add(wire_len as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_received() {
        FRAMES_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_checksum_error() {
        CHECKSUM_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected() {
        REJECTED_FRAMES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_sink_error() {
        SINK_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: FRAMES_SENT.load(Ordering::Relaxed),
            bytes_sent: BYTES_SENT.load(Ordering::Relaxed),
            frames_received: FRAMES_RECEIVED.load(Ordering::Relaxed),
            checksum_errors: CHECKSUM_ERRORS.load(Ordering::Relaxed),
            rejected_frames: REJECTED_FRAMES.load(Ordering::Relaxed),
            sink_errors: SINK_ERRORS.load(Ordering::Relaxed),
        }
    }
}

/// Lightweight snapshot of the process-wide counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Frames fully written to a sink
    pub frames_sent: u64,
    /// Wire bytes of those frames
    pub bytes_sent: u64,
    /// Frames accepted by any parser
    pub frames_received: u64,
    /// Complete frames dropped for a bad checksum
    pub checksum_errors: u64,
    /// Candidates dropped before the checksum (unknown id, bad length, flags)
    pub rejected_frames: u64,
    /// Sends aborted by a failing sink
    pub sink_errors: u64,
}

impl MetricsSnapshot {
    /// Average wire size of sent frames.
    #[must_use]
    pub fn avg_frame_len(&self) -> Option<u64> {
        if self.frames_sent == 0 {
            return None;
        }
        Some(self.bytes_sent / self.frames_sent)
    }

    /// Counter deltas since an earlier snapshot.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            frames_sent: self.frames_sent.saturating_sub(earlier.frames_sent),
            bytes_sent: self.bytes_sent.saturating_sub(earlier.bytes_sent),
            frames_received: self.frames_received.saturating_sub(earlier.frames_received),
            checksum_errors: self.checksum_errors.saturating_sub(earlier.checksum_errors),
            rejected_frames: self.rejected_frames.saturating_sub(earlier.rejected_frames),
            sink_errors: self.sink_errors.saturating_sub(earlier.sink_errors),
        }
    }
}
