//! Link state and default routes over rtnetlink.
//!
//! One link dump gives names, flags and operational state; one route dump per
//! address family gives the default routes. Both are folded into a
//! [`LinkSnapshot`] keyed by interface index.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use carousel_shared::{CarouselError, CarouselResult};
use futures_util::stream::TryStreamExt;
use rtnetlink::packet_route::link::{LinkAttribute, LinkFlags, LinkMessage, State};
use rtnetlink::packet_route::route::{RouteAddress, RouteAttribute, RouteMessage};
use rtnetlink::{Handle, RouteMessageBuilder};
use tracing::{debug, trace, warn};

use crate::adapter::OperStatus;

/// One link from the kernel link table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub index: u32,
    pub name: String,
    pub oper_status: OperStatus,
    /// `IFF_UP` and `IFF_RUNNING` both set
    pub is_running: bool,
    pub is_loopback: bool,
}

/// Links in dump order plus default-route gateways per interface index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub links: Vec<LinkInfo>,
    pub gateways: HashMap<u32, HashSet<IpAddr>>,
}

impl LinkSnapshot {
    /// Distinct default gateways routed through `index`
    pub fn gateway_count(&self, index: u32) -> usize {
        self.gateways.get(&index).map_or(0, HashSet::len)
    }
}

/// Source of link and route state.
pub trait LinkSource: Send {
    fn snapshot(&mut self) -> impl Future<Output = CarouselResult<LinkSnapshot>> + Send;
}

impl From<&State> for OperStatus {
    fn from(state: &State) -> Self {
        match state {
            State::Up => OperStatus::Up,
            State::Down => OperStatus::Down,
            State::Dormant => OperStatus::Dormant,
            State::LowerLayerDown => OperStatus::LowerLayerDown,
            State::NotPresent => OperStatus::NotPresent,
            State::Testing => OperStatus::Testing,
            _ => OperStatus::Unknown,
        }
    }
}

/// Convert a link dump entry.
pub fn link_info(link: &LinkMessage) -> LinkInfo {
    let index = link.header.index;
    let flags = link.header.flags;

    let mut name = None;
    let mut oper_status = OperStatus::Unknown;
    for attr in &link.attributes {
        match attr {
            LinkAttribute::IfName(ifname) => name = Some(ifname.clone()),
            LinkAttribute::OperState(state) => oper_status = OperStatus::from(state),
            _ => {}
        }
    }

    LinkInfo {
        index,
        name: name.unwrap_or_else(|| format!("unknown{}", index)),
        oper_status,
        is_running: flags.contains(LinkFlags::Up) && flags.contains(LinkFlags::Running),
        is_loopback: flags.contains(LinkFlags::Loopback),
    }
}

fn route_address(address: &RouteAddress) -> Option<IpAddr> {
    let addr = match address {
        RouteAddress::Inet(addr) => IpAddr::V4(*addr),
        RouteAddress::Inet6(addr) => IpAddr::V6(*addr),
        _ => return None,
    };
    (!addr.is_unspecified()).then_some(addr)
}

fn gateway_of(attributes: &[RouteAttribute]) -> Option<IpAddr> {
    attributes.iter().find_map(|attr| match attr {
        RouteAttribute::Gateway(address) => route_address(address),
        _ => None,
    })
}

/// `(interface index, gateway)` pairs of a default route, including each hop
/// of a multipath route. Non-default routes yield nothing.
pub fn default_gateways(route: &RouteMessage) -> Vec<(u32, IpAddr)> {
    if route.header.destination_prefix_length != 0 {
        return Vec::new();
    }

    let mut hops = Vec::new();
    let oif = route.attributes.iter().find_map(|attr| match attr {
        RouteAttribute::Oif(index) => Some(*index),
        _ => None,
    });
    if let (Some(index), Some(gateway)) = (oif, gateway_of(&route.attributes)) {
        hops.push((index, gateway));
    }

    for attr in &route.attributes {
        if let RouteAttribute::MultiPath(next_hops) = attr {
            hops.extend(next_hops.iter().filter_map(|hop| {
                gateway_of(&hop.attributes).map(|gateway| (hop.interface_index, gateway))
            }));
        }
    }

    hops
}

/// [`LinkSource`] backed by an rtnetlink connection.
///
/// The connection is opened on first use and reopened after a failed dump.
#[derive(Default)]
pub struct NetlinkSource {
    handle: Option<Handle>,
}

impl NetlinkSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> CarouselResult<Handle> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }

        let (connection, handle, _) = rtnetlink::new_connection().map_err(|e| {
            CarouselError::stats_unavailable(format!("Netlink connection failed: {}", e))
        })?;

        // Spawn the connection handler
        tokio::spawn(connection);
        debug!("Opened rtnetlink connection");

        self.handle = Some(handle.clone());
        Ok(handle)
    }
}

async fn dump_links(handle: &Handle) -> CarouselResult<Vec<LinkInfo>> {
    let mut links = handle.link().get().execute();
    let mut infos = Vec::new();

    while let Some(link) = links
        .try_next()
        .await
        .map_err(|e| CarouselError::stats_unavailable(format!("Failed to get links: {}", e)))?
    {
        infos.push(link_info(&link));
    }

    Ok(infos)
}

async fn dump_default_gateways(
    handle: &Handle,
) -> CarouselResult<HashMap<u32, HashSet<IpAddr>>> {
    let mut gateways: HashMap<u32, HashSet<IpAddr>> = HashMap::new();
    let requests = [
        RouteMessageBuilder::<Ipv4Addr>::new().build(),
        RouteMessageBuilder::<Ipv6Addr>::new().build(),
    ];

    for request in requests {
        let mut routes = handle.route().get(request).execute();
        while let Some(route) = routes.try_next().await.map_err(|e| {
            CarouselError::stats_unavailable(format!("Failed to get routes: {}", e))
        })? {
            for (index, gateway) in default_gateways(&route) {
                trace!("Default route via {} on link {}", gateway, index);
                gateways.entry(index).or_default().insert(gateway);
            }
        }
    }

    Ok(gateways)
}

async fn dump_snapshot(handle: &Handle) -> CarouselResult<LinkSnapshot> {
    let links = dump_links(handle).await?;
    let gateways = dump_default_gateways(handle).await?;
    Ok(LinkSnapshot { links, gateways })
}

impl LinkSource for NetlinkSource {
    async fn snapshot(&mut self) -> CarouselResult<LinkSnapshot> {
        let handle = self.handle()?;

        let result = dump_snapshot(&handle).await;
        if let Err(e) = &result {
            warn!("Netlink dump failed, reconnecting on next query: {}", e);
            self.handle = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtnetlink::packet_route::route::RouteNextHop;

    fn link(index: u32, name: &str, flags: LinkFlags, state: State) -> LinkMessage {
        let mut message = LinkMessage::default();
        message.header.index = index;
        message.header.flags = flags;
        message
            .attributes
            .push(LinkAttribute::IfName(name.to_string()));
        message.attributes.push(LinkAttribute::OperState(state));
        message
    }

    fn route(prefix_len: u8, attributes: Vec<RouteAttribute>) -> RouteMessage {
        let mut message = RouteMessage::default();
        message.header.destination_prefix_length = prefix_len;
        message.attributes = attributes;
        message
    }

    #[test]
    fn test_link_info_from_dump_entry() {
        let eth0 = link_info(&link(
            2,
            "eth0",
            LinkFlags::Up | LinkFlags::Running,
            State::Up,
        ));
        assert_eq!(eth0.index, 2);
        assert_eq!(eth0.name, "eth0");
        assert_eq!(eth0.oper_status, OperStatus::Up);
        assert!(eth0.is_running);
        assert!(!eth0.is_loopback);

        let lo = link_info(&link(
            1,
            "lo",
            LinkFlags::Up | LinkFlags::Running | LinkFlags::Loopback,
            State::Unknown,
        ));
        assert!(lo.is_loopback);
        assert_eq!(lo.oper_status, OperStatus::Unknown);
    }

    #[test]
    fn test_link_info_point_to_point_without_carrier_state() {
        // ppp0 reports operstate unknown while UP|RUNNING
        let ppp0 = link_info(&link(
            7,
            "ppp0",
            LinkFlags::Up | LinkFlags::Running,
            State::Unknown,
        ));
        assert_eq!(ppp0.oper_status, OperStatus::Unknown);
        assert!(ppp0.is_running);

        let no_carrier = link_info(&link(8, "tun0", LinkFlags::Up, State::Unknown));
        assert!(!no_carrier.is_running);
    }

    #[test]
    fn test_link_info_without_name() {
        let mut message = LinkMessage::default();
        message.header.index = 9;
        assert_eq!(link_info(&message).name, "unknown9");
    }

    #[test]
    fn test_default_gateways() {
        let gateway = Ipv4Addr::new(192, 168, 1, 1);
        let default = route(
            0,
            vec![
                RouteAttribute::Oif(2),
                RouteAttribute::Gateway(RouteAddress::Inet(gateway)),
            ],
        );
        assert_eq!(default_gateways(&default), vec![(2, IpAddr::V4(gateway))]);

        // Subnet route through the same gateway
        let subnet = route(
            24,
            vec![
                RouteAttribute::Oif(2),
                RouteAttribute::Gateway(RouteAddress::Inet(gateway)),
            ],
        );
        assert!(default_gateways(&subnet).is_empty());

        // Default route without a next hop (e.g. point-to-point device route)
        let direct = route(0, vec![RouteAttribute::Oif(7)]);
        assert!(default_gateways(&direct).is_empty());
    }

    #[test]
    fn test_default_gateways_ipv6_multipath() {
        let first: Ipv6Addr = "fe80::1".parse().unwrap();
        let second: Ipv6Addr = "fe80::2".parse().unwrap();

        let mut hop_a = RouteNextHop::default();
        hop_a.interface_index = 3;
        hop_a
            .attributes
            .push(RouteAttribute::Gateway(RouteAddress::Inet6(first)));
        let mut hop_b = RouteNextHop::default();
        hop_b.interface_index = 4;
        hop_b
            .attributes
            .push(RouteAttribute::Gateway(RouteAddress::Inet6(second)));

        let multipath = route(0, vec![RouteAttribute::MultiPath(vec![hop_a, hop_b])]);
        assert_eq!(
            default_gateways(&multipath),
            vec![(3, IpAddr::V6(first)), (4, IpAddr::V6(second))]
        );
    }

    #[test]
    fn test_snapshot_gateway_count() {
        let mut snapshot = LinkSnapshot::default();
        let gateways = snapshot.gateways.entry(2).or_default();
        gateways.insert(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        gateways.insert(IpAddr::V6("fe80::1".parse().unwrap()));

        assert_eq!(snapshot.gateway_count(2), 2);
        assert_eq!(snapshot.gateway_count(3), 0);
    }
}
