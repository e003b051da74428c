use crate::errors::DomainError;
use crate::reverse::{address_from_reverse, split_host_port};
use crate::transport::Transport;
use crate::validators::{fqdn, is_valid_domain_name};
use ipnetwork::IpNetwork;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

const CIDR_SEPARATOR: &str = "##";
const OPTION_SEPARATOR: &str = "#$#";

/// What a listener binds to, and for which zone.
///
/// Two textual forms exist. The display form
/// `transport://zone:[host:]port` is meant for humans; the key form appends
/// `##<cidr>` and one `#$#[name=value]` segment per option and is what
/// deduplication and overlap checks compare. Options live in a `BTreeMap`,
/// so equal addresses always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneAddress {
    pub transport: Transport,
    /// Always lowercase and dot-terminated.
    pub zone: String,
    pub port: u16,
    /// Empty means "all interfaces".
    pub listening_host: String,
    /// Set only for reverse-zone shorthand (`10.0.0.0/24`).
    pub reverse_net: Option<IpNetwork>,
    pub options: BTreeMap<String, String>,
}

impl ZoneAddress {
    pub fn new(transport: Transport, zone: &str, port: u16) -> Self {
        Self {
            transport,
            zone: fqdn(zone),
            port,
            listening_host: String::new(),
            reverse_net: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.listening_host = host.into();
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Parse a server-block key such as `tls://example.org:8853` or
    /// `10.0.0.0/24`.
    ///
    /// The transport defaults to plain DNS and the port to the transport's
    /// default. The listening host is never set here; key enhancers do that.
    pub fn normalize_zone(raw: &str) -> Result<Self, DomainError> {
        let (transport, rest) = Transport::split_prefix(raw)?;
        let split = split_host_port(rest)?;

        Ok(Self {
            transport,
            zone: fqdn(&split.zone),
            port: split.port.unwrap_or_else(|| transport.default_port()),
            listening_host: String::new(),
            reverse_net: split.net,
            options: BTreeMap::new(),
        })
    }

    /// Inverse of [`ZoneAddress::as_key`].
    pub fn parse_from_key(key: &str) -> Result<Self, DomainError> {
        let invalid = |reason: &str| DomainError::InvalidKey(format!("{key}: {reason}"));

        let mut segments = key.split(OPTION_SEPARATOR);
        let base = segments.next().unwrap_or_default();

        let mut options = BTreeMap::new();
        for segment in segments {
            let body = segment
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(|| invalid("option segment must be [name=value]"))?;
            let (name, value) = body
                .split_once('=')
                .ok_or_else(|| invalid("option segment must be [name=value]"))?;
            if name.is_empty() {
                return Err(invalid("empty option name"));
            }
            options.insert(name.to_string(), value.to_string());
        }

        let (addr, reverse_net) = match base.split_once(CIDR_SEPARATOR) {
            Some((addr, cidr)) => {
                let net = cidr
                    .parse::<IpNetwork>()
                    .map_err(|_| DomainError::InvalidCidr(cidr.to_string()))?;
                if !cidr.contains('/') {
                    return Err(DomainError::InvalidCidr(cidr.to_string()));
                }
                (addr, Some(net))
            }
            None => (base, None),
        };

        let (transport, rest) = Transport::split_prefix(addr)?;
        let first = rest.find(':').ok_or_else(|| invalid("missing port"))?;
        let last = rest.rfind(':').unwrap_or(first);

        let zone = &rest[..first];
        if !is_valid_domain_name(zone) {
            return Err(DomainError::invalid_zone(zone, "not a valid domain name"));
        }

        let port_text = &rest[last + 1..];
        let port = port_text
            .parse::<u16>()
            .map_err(|_| DomainError::InvalidPort(port_text.to_string()))?;

        let listening_host = if first == last {
            String::new()
        } else {
            let middle = &rest[first + 1..last];
            let bare = middle
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(middle);
            let ip: IpAddr = bare
                .parse()
                .map_err(|_| DomainError::InvalidHost(middle.to_string()))?;
            ip.to_string()
        };

        Ok(Self {
            transport,
            zone: fqdn(zone),
            port,
            listening_host,
            reverse_net,
            options,
        })
    }

    /// Canonical key: display form plus CIDR and sorted option segments.
    pub fn as_key(&self) -> String {
        let mut key = self.to_string();
        if let Some(net) = &self.reverse_net {
            key.push_str(CIDR_SEPARATOR);
            key.push_str(&net.to_string());
        }
        for (name, value) in &self.options {
            key.push_str(OPTION_SEPARATOR);
            key.push('[');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
            key.push(']');
        }
        key
    }

    pub fn is_multicast(&self) -> bool {
        self.listening_host.is_empty()
    }

    /// Same address with the listening host cleared.
    pub fn multicast_projection(&self) -> Self {
        Self {
            listening_host: String::new(),
            ..self.clone()
        }
    }

    /// Whether a query name is served by this address's reverse CIDR.
    ///
    /// Addresses without a CIDR accept everything, and so do names that do
    /// not encode a full address (e.g. queries for the zone apex).
    pub fn reverse_contains(&self, qname: &str) -> bool {
        let Some(net) = &self.reverse_net else {
            return true;
        };
        match address_from_reverse(qname) {
            Some(addr) => net.contains(addr),
            None => true,
        }
    }

    /// Host formatted for use before `:port`; IPv6 literals are bracketed.
    pub fn host_for_display(&self) -> String {
        bracket_host(&self.listening_host)
    }
}

pub fn bracket_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

impl fmt::Display for ZoneAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:", self.transport.scheme(), self.zone)?;
        if !self.listening_host.is_empty() {
            write!(f, "{}:", self.host_for_display())?;
        }
        write!(f, "{}", self.port)
    }
}
