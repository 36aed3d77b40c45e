//! Rate sampler: the 1 Hz loop that turns adapter byte counters into a
//! normalized throughput ratio.
//!
//! # State machine
//!
//! ```text
//!              no candidate
//!           ┌───────────────┐
//!           ▼               │
//!      Unselected ──select──┴──► Priming ──capture──► Streaming ──┐
//!           ▲                       │                     ▲     publish
//!           └── adapter gone / no default route ──────────┴─────┘
//! ```
//!
//! The tick that (re)selects an adapter and the tick that captures its
//! baseline publish nothing. While no adapter is available the last published
//! ratio is left as it is.

use std::time::Duration;

use carousel_shared::{RatioPublisher, ThroughputRatio, TooltipSink};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{AdapterStats, NetworkStatsProvider, select_adapter};
use crate::utils::supervisor::catch_tick;

/// Default sampling period
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Last-seen counters of the tracked adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterBaseline {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl From<&AdapterStats> for CounterBaseline {
    fn from(adapter: &AdapterStats) -> Self {
        Self {
            rx_bytes: adapter.rx_bytes,
            tx_bytes: adapter.tx_bytes,
        }
    }
}

/// Adapter tracking state, owned solely by the sampler
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterState {
    #[default]
    Unselected,
    Priming {
        adapter: String,
    },
    Streaming {
        adapter: String,
        baseline: CounterBaseline,
    },
}

impl AdapterState {
    /// Name of the tracked adapter, if any
    pub fn adapter(&self) -> Option<&str> {
        match self {
            AdapterState::Unselected => None,
            AdapterState::Priming { adapter } | AdapterState::Streaming { adapter, .. } => {
                Some(adapter)
            }
        }
    }
}

/// What a single sampler tick did
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Statistics could not be read; tracking was reset
    Unavailable,
    /// A new adapter selection was made (possibly none)
    Reselected { adapter: Option<String> },
    /// The baseline for the tracked adapter was captured
    Primed { adapter: String },
    /// A ratio was published
    Published {
        ratio: ThroughputRatio,
        down_bytes: u64,
        up_bytes: u64,
    },
}

/// Format the per-tick deltas as the indicator tooltip.
pub fn format_tooltip(down_bytes: u64, up_bytes: u64) -> String {
    format!(
        "U: {:.2} KB/s\nD: {:.2} KB/s",
        up_bytes as f64 / 1024.0,
        down_bytes as f64 / 1024.0
    )
}

/// 1 Hz throughput sampler.
pub struct RateSampler<P, T> {
    provider: P,
    publisher: RatioPublisher,
    tooltip: T,
    state: AdapterState,
    interval: Duration,
}

impl<P, T> RateSampler<P, T>
where
    P: NetworkStatsProvider,
    T: TooltipSink,
{
    pub fn new(provider: P, publisher: RatioPublisher, tooltip: T) -> Self {
        Self {
            provider,
            publisher,
            tooltip,
            state: AdapterState::Unselected,
            interval: SAMPLE_INTERVAL,
        }
    }

    /// Override the sampling period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    /// Run one sampling step.
    pub async fn tick(&mut self) -> SampleOutcome {
        let adapters = match self.provider.adapters().await {
            Ok(adapters) => adapters,
            Err(e) => {
                warn!("Failed to query adapter statistics: {}", e);
                self.state = AdapterState::Unselected;
                return SampleOutcome::Unavailable;
            }
        };

        let tracked = self
            .state
            .adapter()
            .and_then(|name| adapters.iter().find(|adapter| adapter.name == name))
            .filter(|adapter| adapter.has_default_route());

        let Some(current) = tracked else {
            return self.reselect(&adapters);
        };

        let counters = CounterBaseline::from(current);
        let previous = match &self.state {
            AdapterState::Streaming { baseline, .. } => Some(*baseline),
            _ => None,
        };
        self.state = AdapterState::Streaming {
            adapter: current.name.clone(),
            baseline: counters,
        };

        match previous {
            None => {
                debug!("Captured baseline for {}: {:?}", current.name, counters);
                SampleOutcome::Primed {
                    adapter: current.name.clone(),
                }
            }
            Some(previous) => self.publish(previous, counters),
        }
    }

    fn reselect(&mut self, adapters: &[AdapterStats]) -> SampleOutcome {
        let previous = self.state.adapter().map(str::to_owned);
        let selected = select_adapter(adapters).map(|adapter| adapter.name.clone());

        match (&previous, &selected) {
            (_, Some(name)) => info!("Tracking adapter {}", name),
            (Some(name), None) => info!("Adapter {} lost its default route", name),
            (None, None) => debug!("No active adapter with a default gateway"),
        }

        self.state = match &selected {
            Some(adapter) => AdapterState::Priming {
                adapter: adapter.clone(),
            },
            None => AdapterState::Unselected,
        };

        SampleOutcome::Reselected { adapter: selected }
    }

    fn publish(&mut self, previous: CounterBaseline, current: CounterBaseline) -> SampleOutcome {
        // Counters going backwards (driver reset, wrap) count as no traffic
        let down_bytes = current.rx_bytes.saturating_sub(previous.rx_bytes);
        let up_bytes = current.tx_bytes.saturating_sub(previous.tx_bytes);

        let text = format_tooltip(down_bytes, up_bytes);
        debug!("{}", text.replace('\n', ", "));
        if let Err(e) = self.tooltip.set_tooltip(&text) {
            warn!("Failed to update tooltip: {}", e);
        }

        let ratio = ThroughputRatio::from_deltas(down_bytes, up_bytes);
        self.publisher.publish(ratio);

        SampleOutcome::Published {
            ratio,
            down_bytes,
            up_bytes,
        }
    }

    /// Sample until `cancel` fires. The first sample is taken one interval after start.
    #[instrument(skip_all, fields(service = "sampler", interval = ?self.interval))]
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Rate sampler started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick to avoid immediate execution
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(outcome) = catch_tick("sampler", self.tick()).await {
                        debug!(?outcome, "Sampler tick");
                    }
                }
            }
        }

        info!("Rate sampler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::OperStatus;
    use carousel_shared::{CarouselError, CarouselResult, ratio_channel};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted enumerations, repeating the last one when exhausted
    struct ScriptedProvider {
        frames: VecDeque<CarouselResult<Vec<AdapterStats>>>,
    }

    impl ScriptedProvider {
        fn new(frames: Vec<CarouselResult<Vec<AdapterStats>>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl NetworkStatsProvider for ScriptedProvider {
        async fn adapters(&mut self) -> CarouselResult<Vec<AdapterStats>> {
            match self.frames.pop_front() {
                Some(frame) => frame,
                None => Ok(Vec::new()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingTooltip {
        texts: Mutex<Vec<String>>,
    }

    impl TooltipSink for RecordingTooltip {
        fn set_tooltip(&self, text: &str) -> CarouselResult<()> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn eth(name: &str, gateways: usize, rx: u64, tx: u64) -> AdapterStats {
        AdapterStats {
            name: name.to_string(),
            oper_status: OperStatus::Up,
            is_running: true,
            is_loopback: false,
            gateway_count: gateways,
            rx_bytes: rx,
            tx_bytes: tx,
        }
    }

    fn sampler(
        frames: Vec<CarouselResult<Vec<AdapterStats>>>,
    ) -> (
        RateSampler<ScriptedProvider, Arc<RecordingTooltip>>,
        carousel_shared::RatioReader,
        Arc<RecordingTooltip>,
    ) {
        let (publisher, reader) = ratio_channel();
        let tooltip = Arc::new(RecordingTooltip::default());
        let sampler = RateSampler::new(ScriptedProvider::new(frames), publisher, tooltip.clone());
        (sampler, reader, tooltip)
    }

    #[tokio::test]
    async fn test_select_prime_then_publish() {
        let (mut sampler, reader, tooltip) = sampler(vec![
            Ok(vec![eth("eth0", 1, 100, 100)]),
            Ok(vec![eth("eth0", 1, 1_000, 2_000)]),
            Ok(vec![eth("eth0", 1, 1_000 + 1024, 2_000 + 2048)]),
        ]);

        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Reselected {
                adapter: Some("eth0".to_string())
            }
        );
        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Primed {
                adapter: "eth0".to_string()
            }
        );
        assert_eq!(reader.latest(), ThroughputRatio::IDLE);
        assert!(tooltip.texts.lock().unwrap().is_empty());

        let outcome = sampler.tick().await;
        assert_eq!(
            outcome,
            SampleOutcome::Published {
                ratio: ThroughputRatio::from_deltas(1024, 2048),
                down_bytes: 1024,
                up_bytes: 2048,
            }
        );
        assert_eq!(reader.latest(), ThroughputRatio::from_deltas(1024, 2048));
        assert_eq!(
            tooltip.texts.lock().unwrap().as_slice(),
            ["U: 2.00 KB/s\nD: 1.00 KB/s"]
        );
    }

    #[tokio::test]
    async fn test_large_delta_is_clamped() {
        let (mut sampler, reader, _) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 2_097_152, 0)]),
        ]);

        sampler.tick().await;
        sampler.tick().await;
        sampler.tick().await;

        let ratio = reader.latest();
        assert_eq!(ratio.download(), 1.0);
        assert_eq!(ratio.upload(), 0.0);
    }

    #[tokio::test]
    async fn test_ratio_frozen_while_no_adapter() {
        let (mut sampler, reader, _) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 524_288, 262_144)]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
        ]);

        for _ in 0..3 {
            sampler.tick().await;
        }
        let published = reader.latest();
        assert_eq!(published, ThroughputRatio::new(0.5, 0.25));

        for _ in 0..4 {
            assert_eq!(
                sampler.tick().await,
                SampleOutcome::Reselected { adapter: None }
            );
            assert_eq!(reader.latest(), published);
        }
        assert_eq!(sampler.state(), &AdapterState::Unselected);
    }

    #[tokio::test]
    async fn test_lost_gateway_triggers_reselection_and_repriming() {
        let (mut sampler, reader, _) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0), eth("wlan0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0), eth("wlan0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 1024, 0), eth("wlan0", 1, 0, 0)]),
            // eth0 loses its default route
            Ok(vec![eth("eth0", 0, 5_000, 0), eth("wlan0", 1, 10_000, 0)]),
            Ok(vec![eth("eth0", 0, 6_000, 0), eth("wlan0", 1, 20_000, 0)]),
            Ok(vec![eth("eth0", 0, 7_000, 0), eth("wlan0", 1, 20_000 + 4096, 0)]),
        ]);

        sampler.tick().await;
        sampler.tick().await;
        sampler.tick().await;
        let before = reader.latest();

        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Reselected {
                adapter: Some("wlan0".to_string())
            }
        );
        assert_eq!(reader.latest(), before);

        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Primed {
                adapter: "wlan0".to_string()
            }
        );
        assert_eq!(reader.latest(), before);

        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Published {
                ratio: ThroughputRatio::from_deltas(4096, 0),
                down_bytes: 4096,
                up_bytes: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_vanished_adapter_triggers_reselection() {
        let (mut sampler, _, _) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth1", 1, 0, 0)]),
        ]);

        sampler.tick().await;
        sampler.tick().await;
        assert_eq!(
            sampler.tick().await,
            SampleOutcome::Reselected {
                adapter: Some("eth1".to_string())
            }
        );
        assert_eq!(
            sampler.state(),
            &AdapterState::Priming {
                adapter: "eth1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_query_failure_resets_tracking_and_keeps_ratio() {
        let (mut sampler, reader, _) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 1_048_576)]),
            Err(CarouselError::stats_unavailable("permission denied")),
            Ok(vec![eth("eth0", 1, 0, 2_000_000)]),
            Ok(vec![eth("eth0", 1, 0, 3_000_000)]),
        ]);

        for _ in 0..3 {
            sampler.tick().await;
        }
        assert_eq!(reader.latest(), ThroughputRatio::new(0.0, 1.0));

        assert_eq!(sampler.tick().await, SampleOutcome::Unavailable);
        assert_eq!(sampler.state(), &AdapterState::Unselected);
        assert_eq!(reader.latest(), ThroughputRatio::new(0.0, 1.0));

        assert!(matches!(sampler.tick().await, SampleOutcome::Reselected { .. }));
        assert!(matches!(sampler.tick().await, SampleOutcome::Primed { .. }));
    }

    #[tokio::test]
    async fn test_counter_reset_reads_as_zero() {
        let (mut sampler, reader, tooltip) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 50_000, 50_000)]),
            Ok(vec![eth("eth0", 1, 10, 10)]),
        ]);

        sampler.tick().await;
        sampler.tick().await;
        sampler.tick().await;

        assert_eq!(reader.latest(), ThroughputRatio::IDLE);
        assert_eq!(
            tooltip.texts.lock().unwrap().as_slice(),
            ["U: 0.00 KB/s\nD: 0.00 KB/s"]
        );
    }

    #[test]
    fn test_format_tooltip() {
        assert_eq!(format_tooltip(1024, 2048), "U: 2.00 KB/s\nD: 1.00 KB/s");
        assert_eq!(format_tooltip(0, 1536), "U: 1.50 KB/s\nD: 0.00 KB/s");
        assert_eq!(
            format_tooltip(2_097_152, 1),
            "U: 0.00 KB/s\nD: 2048.00 KB/s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_samples_every_interval_until_cancelled() {
        let (mut sampler, reader, tooltip) = sampler(vec![
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 0, 0)]),
            Ok(vec![eth("eth0", 1, 1_048_576, 0)]),
        ]);
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                sampler.run(cancel).await;
                sampler
            })
        };

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(reader.latest(), ThroughputRatio::new(1.0, 0.0));
        assert_eq!(tooltip.texts.lock().unwrap().len(), 1);

        cancel.cancel();
        let sampler = task.await.unwrap();
        assert!(matches!(sampler.state(), AdapterState::Streaming { .. }));
    }
}
