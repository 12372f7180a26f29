//! Source address normalization for IP-scoped limits.

use std::net::{IpAddr, Ipv6Addr};

use crate::ratelimit::constants::IPV6_PREFIX_LEN;

/// Normalize an address into its counting identity.
///
/// IPv4 addresses are kept as-is, including IPv4-mapped IPv6 ones.
/// Other IPv6 addresses collapse to their /64 so a single allocation cannot
/// rotate through addresses to dodge the limit.
pub fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => {
                let mask = u128::MAX << (128 - IPV6_PREFIX_LEN);
                let network = Ipv6Addr::from(u128::from(v6) & mask);
                format!("{network}/{IPV6_PREFIX_LEN}")
            }
        },
    }
}
