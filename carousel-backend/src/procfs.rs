//! Byte counters from `/proc/net/dev`.

use std::fs;
use std::path::Path;

use carousel_shared::{CarouselError, CarouselResult};

/// Byte counters of one `/proc/net/dev` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Read and parse `<proc_root>/net/dev`.
pub fn read_proc_net_dev(proc_root: &Path) -> CarouselResult<Vec<DevCounters>> {
    let path = proc_root.join("net/dev");
    let contents = fs::read_to_string(&path)
        .map_err(|e| CarouselError::stats_unavailable(format!("{}: {}", path.display(), e)))?;
    Ok(parse_proc_net_dev(&contents))
}

/// Parse `/proc/net/dev` into per-interface byte counters, keeping file order.
pub fn parse_proc_net_dev(contents: &str) -> Vec<DevCounters> {
    // Skip first two header lines
    contents
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (interface_part, stats_part) = line.split_once(':')?;
            let stats_values: Vec<&str> = stats_part.split_whitespace().collect();
            if stats_values.len() < 16 {
                return None;
            }

            Some(DevCounters {
                name: interface_part.trim().to_string(),
                rx_bytes: stats_values[0].parse().ok()?,
                tx_bytes: stats_values[8].parse().ok()?,
            })
        })
        .collect()
}
