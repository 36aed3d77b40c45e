//! The Linux [`NetworkStatsProvider`]: link state and default routes from
//! rtnetlink, byte counters from `/proc/net/dev`.

use std::collections::HashMap;
use std::path::PathBuf;

use carousel_shared::CarouselResult;
use tracing::{debug, trace};

use crate::adapter::{AdapterStats, NetworkStatsProvider};
use crate::netlink::{LinkSnapshot, LinkSource, NetlinkSource};
use crate::procfs::{DevCounters, read_proc_net_dev};

/// Join a link snapshot with byte counters, keeping link dump order.
///
/// Links without a `/proc/net/dev` row have no counters and are left out.
pub fn merge_adapters(snapshot: &LinkSnapshot, counters: &[DevCounters]) -> Vec<AdapterStats> {
    let by_name: HashMap<&str, &DevCounters> = counters
        .iter()
        .map(|row| (row.name.as_str(), row))
        .collect();

    snapshot
        .links
        .iter()
        .filter_map(|link| {
            let Some(row) = by_name.get(link.name.as_str()) else {
                trace!("No counters for {}", link.name);
                return None;
            };
            Some(AdapterStats {
                name: link.name.clone(),
                oper_status: link.oper_status,
                is_running: link.is_running,
                is_loopback: link.is_loopback,
                gateway_count: snapshot.gateway_count(link.index),
                rx_bytes: row.rx_bytes,
                tx_bytes: row.tx_bytes,
            })
        })
        .collect()
}

/// Adapter statistics for the host network namespace.
pub struct SystemNetworkStats<L = NetlinkSource> {
    links: L,
    proc_root: PathBuf,
}

impl SystemNetworkStats<NetlinkSource> {
    pub fn new() -> Self {
        Self::with_source(NetlinkSource::new(), "/proc")
    }
}

impl Default for SystemNetworkStats<NetlinkSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LinkSource> SystemNetworkStats<L> {
    /// Use another link source and `/proc` mount (fixtures in tests, containers)
    pub fn with_source(links: L, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            links,
            proc_root: proc_root.into(),
        }
    }
}

impl<L: LinkSource> NetworkStatsProvider for SystemNetworkStats<L> {
    async fn adapters(&mut self) -> CarouselResult<Vec<AdapterStats>> {
        let snapshot = self.links.snapshot().await?;
        let counters = read_proc_net_dev(&self.proc_root)?;

        let adapters = merge_adapters(&snapshot, &counters);
        debug!("Enumerated {} adapters", adapters.len());
        Ok(adapters)
    }
}
