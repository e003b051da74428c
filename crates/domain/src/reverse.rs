//! Reverse-zone helpers.
//!
//! A zone written as a CIDR (`10.0.0.0/24`, `2001:db8::/32`) is shorthand
//! for the matching `in-addr.arpa.` / `ip6.arpa.` zone. When the prefix does
//! not fall on an octet (IPv4) or nibble (IPv6) boundary the zone is the
//! enclosing boundary zone and queries are narrowed to the CIDR by a filter.

use crate::errors::DomainError;
use crate::validators::is_valid_domain_name;
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const V4_SUFFIX: &str = "in-addr.arpa.";
const V6_SUFFIX: &str = "ip6.arpa.";
const MAX_ZONE_TEXT: usize = 255;

/// Result of splitting a server-block key into zone, port and CIDR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub zone: String,
    pub port: Option<u16>,
    pub net: Option<IpNetwork>,
}

/// Split `s` into zone and optional port, recognising reverse CIDR shorthand.
///
/// The port is whatever follows the last `:` when it is numeric, which keeps
/// IPv6 CIDRs (`2001:db8::/32`) intact since their mask precedes any port.
pub fn split_host_port(s: &str) -> Result<HostPort, DomainError> {
    let mut host = s;
    let mut port = None;

    if let Some(colon) = s.rfind(':') {
        let tail = &s[colon + 1..];
        if tail.is_empty() {
            return Err(DomainError::invalid_zone(s, "expecting data after last colon"));
        }
        if tail.bytes().all(|b| b.is_ascii_digit()) {
            let parsed = tail
                .parse::<u16>()
                .map_err(|_| DomainError::InvalidPort(tail.to_string()))?;
            port = Some(parsed);
            host = &s[..colon];
        }
    }

    if host.len() > MAX_ZONE_TEXT {
        return Err(DomainError::invalid_zone(
            host,
            format!("zone is too long: {} > {}", host.len(), MAX_ZONE_TEXT),
        ));
    }
    if !is_valid_domain_name(host) {
        return Err(DomainError::invalid_zone(host, "not a valid domain name"));
    }

    let Some(net) = parse_cidr(host)? else {
        return Ok(HostPort {
            zone: host.to_string(),
            port,
            net: None,
        });
    };

    Ok(HostPort {
        zone: reverse_zone(&net),
        port,
        net: Some(net),
    })
}

/// Parse `s` as a fully specified CIDR, normalised to its network address.
///
/// Returns `Ok(None)` when `s` is not CIDR shaped, so that names such as
/// `10.0.0.0/8.` (trailing dot) stay ordinary zones.
pub fn parse_cidr(s: &str) -> Result<Option<IpNetwork>, DomainError> {
    if !s.contains('/') || s.ends_with('.') {
        return Ok(None);
    }
    let Ok(parsed) = s.parse::<IpNetwork>() else {
        return Ok(None);
    };
    if s.starts_with(':') || (s.starts_with('0') && s.contains(':')) {
        return Err(DomainError::InvalidCidr(s.to_string()));
    }
    IpNetwork::new(parsed.network(), parsed.prefix())
        .map(Some)
        .map_err(|e| DomainError::InvalidCidr(format!("{s}: {e}")))
}

/// Reverse zone enclosing `net`, rounded down to an octet or nibble boundary.
pub fn reverse_zone(net: &IpNetwork) -> String {
    match net {
        IpNetwork::V4(v4) => {
            let octets = v4.network().octets();
            let keep = usize::from(v4.prefix() / 8);
            let mut zone: String = octets[..keep]
                .iter()
                .rev()
                .map(|o| format!("{o}."))
                .collect();
            zone.push_str(V4_SUFFIX);
            zone
        }
        IpNetwork::V6(v6) => {
            let nibbles = nibbles(&v6.network());
            let keep = usize::from(v6.prefix() / 4);
            let mut zone: String = nibbles[..keep]
                .iter()
                .rev()
                .map(|n| format!("{n:x}."))
                .collect();
            zone.push_str(V6_SUFFIX);
            zone
        }
    }
}

/// Extract the address encoded in a full reverse name.
///
/// Only complete names (4 octets or 32 nibbles) yield an address; anything
/// else, including names outside the reverse trees, returns `None`.
pub fn address_from_reverse(name: &str) -> Option<IpAddr> {
    let lower = name.to_ascii_lowercase();
    let lower = if lower.ends_with('.') {
        lower
    } else {
        format!("{lower}.")
    };

    if let Some(prefix) = lower.strip_suffix(V4_SUFFIX) {
        let labels: Vec<&str> = prefix.trim_end_matches('.').split('.').collect();
        if labels.len() != 4 {
            return None;
        }
        let mut octets = [0u8; 4];
        for (i, label) in labels.iter().rev().enumerate() {
            octets[i] = label.parse().ok()?;
        }
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if let Some(prefix) = lower.strip_suffix(V6_SUFFIX) {
        let labels: Vec<&str> = prefix.trim_end_matches('.').split('.').collect();
        if labels.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, label) in labels.iter().rev().enumerate() {
            let nibble = u8::from_str_radix(label, 16).ok()?;
            if label.len() != 1 {
                return None;
            }
            bytes[i / 2] |= if i % 2 == 0 { nibble << 4 } else { nibble };
        }
        return Some(IpAddr::V6(Ipv6Addr::from(bytes)));
    }

    None
}

fn nibbles(addr: &Ipv6Addr) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in addr.octets().iter().enumerate() {
        out[i * 2] = byte >> 4;
        out[i * 2 + 1] = byte & 0x0f;
    }
    out
}
