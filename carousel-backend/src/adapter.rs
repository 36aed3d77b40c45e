//! Network adapter model and active-adapter selection.
//!
//! The sampler tracks exactly one adapter: the first one, in enumeration
//! order, that is operationally up, is not a loopback device and has at least
//! one default gateway. Enumeration order is whatever the provider reports
//! (netlink link dump order on Linux, which follows interface index), so ties
//! between several routed adapters are not guaranteed to resolve the same way
//! on every system.

use std::future::Future;

use carousel_shared::CarouselResult;

/// Operational state of a network adapter (RFC 2863 names, as carried by
/// `IFLA_OPERSTATE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperStatus {
    Up,
    Down,
    Dormant,
    LowerLayerDown,
    NotPresent,
    Testing,
    #[default]
    Unknown,
}

impl OperStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, OperStatus::Up)
    }
}

/// Point-in-time view of one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterStats {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// Operational status
    pub oper_status: OperStatus,
    /// Link flags carry both `IFF_UP` and `IFF_RUNNING`
    pub is_running: bool,
    /// Whether the interface is a loopback device
    pub is_loopback: bool,
    /// Number of distinct default gateway addresses routed through this interface
    pub gateway_count: usize,
    /// Total bytes received since the counter was created
    pub rx_bytes: u64,
    /// Total bytes sent since the counter was created
    pub tx_bytes: u64,
}

impl AdapterStats {
    /// Whether the adapter can carry traffic.
    ///
    /// Drivers without carrier reporting (ppp, tun, wireguard) leave the
    /// operational state at `unknown`; for those the link flags decide.
    pub fn is_operational(&self) -> bool {
        match self.oper_status {
            OperStatus::Up => true,
            OperStatus::Unknown => self.is_running,
            _ => false,
        }
    }

    /// Whether this adapter may be picked as the tracked adapter
    pub fn is_candidate(&self) -> bool {
        self.is_operational() && !self.is_loopback && self.has_default_route()
    }

    pub fn has_default_route(&self) -> bool {
        self.gateway_count > 0
    }
}

/// Source of adapter statistics.
///
/// Each call returns a fresh enumeration. A failed query is treated by the
/// sampler as "no adapter available" for that tick.
pub trait NetworkStatsProvider: Send {
    fn adapters(&mut self) -> impl Future<Output = CarouselResult<Vec<AdapterStats>>> + Send;
}

/// Pick the first usable adapter in enumeration order.
pub fn select_adapter(adapters: &[AdapterStats]) -> Option<&AdapterStats> {
    adapters.iter().find(|adapter| adapter.is_candidate())
}
