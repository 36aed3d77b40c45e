//! Normalized throughput ratios and the latest-value channel that carries them.
//!
//! The sampler publishes one [`ThroughputRatio`] per second and the motion
//! engine reads it about thirty times per second. Only the most recent pair
//! matters, so the channel is a `tokio::sync::watch` holding a single `Copy`
//! value: a read always observes a download/upload pair that was published
//! together.

use tokio::sync::watch;

/// Byte delta per sampling tick that maps to a full ratio of 1.0 (1 MiB)
pub const MAX_BYTES_PER_TICK: u64 = 1024 * 1024;

/// Download/upload throughput normalized into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThroughputRatio {
    download: f64,
    upload: f64,
}

impl ThroughputRatio {
    /// No traffic in either direction
    pub const IDLE: Self = Self {
        download: 0.0,
        upload: 0.0,
    };

    /// Create a ratio pair, clamping both components into `[0, 1]`.
    ///
    /// Non-finite inputs are treated as zero.
    pub fn new(download: f64, upload: f64) -> Self {
        Self {
            download: clamp_unit(download),
            upload: clamp_unit(upload),
        }
    }

    /// Normalize per-tick byte deltas against [`MAX_BYTES_PER_TICK`].
    pub fn from_deltas(down_bytes: u64, up_bytes: u64) -> Self {
        let max = MAX_BYTES_PER_TICK as f64;
        Self {
            download: down_bytes.min(MAX_BYTES_PER_TICK) as f64 / max,
            upload: up_bytes.min(MAX_BYTES_PER_TICK) as f64 / max,
        }
    }

    pub fn download(&self) -> f64 {
        self.download
    }

    pub fn upload(&self) -> f64 {
        self.upload
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Create the sampler → motion engine channel, starting at [`ThroughputRatio::IDLE`].
pub fn ratio_channel() -> (RatioPublisher, RatioReader) {
    let (tx, rx) = watch::channel(ThroughputRatio::IDLE);
    (RatioPublisher { tx }, RatioReader { rx })
}

/// Producer half, owned by the rate sampler.
#[derive(Debug)]
pub struct RatioPublisher {
    tx: watch::Sender<ThroughputRatio>,
}

impl RatioPublisher {
    /// Replace the published pair. Never blocks and succeeds with no reader attached.
    pub fn publish(&self, ratio: ThroughputRatio) {
        self.tx.send_replace(ratio);
    }

    /// The pair most recently published
    pub fn current(&self) -> ThroughputRatio {
        *self.tx.borrow()
    }

    /// Attach an additional reader (used by tests and diagnostics)
    pub fn subscribe(&self) -> RatioReader {
        RatioReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer half, owned by the motion engine.
#[derive(Debug)]
pub struct RatioReader {
    rx: watch::Receiver<ThroughputRatio>,
}

impl RatioReader {
    /// Latest published pair. Last write wins; nothing is buffered or replayed.
    pub fn latest(&self) -> ThroughputRatio {
        *self.rx.borrow()
    }
}
