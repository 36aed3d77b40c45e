//! Throughput sampling for Traffic Carousel.
//!
//! The backend owns everything that talks to the operating system's network
//! statistics: adapter enumeration, default-route detection and the 1 Hz rate
//! sampler that publishes normalized throughput ratios.

pub mod adapter;
pub mod netlink;
pub mod procfs;
pub mod sampler;
pub mod system;
pub mod utils;

pub use adapter::{AdapterStats, NetworkStatsProvider, OperStatus, select_adapter};
pub use netlink::{LinkInfo, LinkSnapshot, LinkSource, NetlinkSource};
pub use sampler::{AdapterState, CounterBaseline, RateSampler, SampleOutcome, format_tooltip};
pub use system::SystemNetworkStats;
