use zonemux_domain::{DomainError, Transport, ZoneAddress};

// ============================================================================
// normalize_zone
// ============================================================================

#[test]
fn test_normalize_plain_zone_defaults() {
    let z = ZoneAddress::normalize_zone("example.org").unwrap();
    assert_eq!(z.transport, Transport::Dns);
    assert_eq!(z.zone, "example.org.");
    assert_eq!(z.port, 53);
    assert!(z.is_multicast());
    assert!(z.reverse_net.is_none());
    assert_eq!(z.to_string(), "dns://example.org.:53");
}

#[test]
fn test_normalize_transport_default_ports() {
    assert_eq!(ZoneAddress::normalize_zone("tls://example.org").unwrap().port, 853);
    assert_eq!(ZoneAddress::normalize_zone("grpc://example.org").unwrap().port, 443);
    assert_eq!(ZoneAddress::normalize_zone("dns://.").unwrap().port, 53);
}

#[test]
fn test_normalize_explicit_port_and_case() {
    let z = ZoneAddress::normalize_zone("tls://Example.ORG.:8853").unwrap();
    assert_eq!(z.transport, Transport::Tls);
    assert_eq!(z.zone, "example.org.");
    assert_eq!(z.port, 8853);
}

#[test]
fn test_normalize_reverse_cidr() {
    let z = ZoneAddress::normalize_zone("10.0.0.0/24").unwrap();
    assert_eq!(z.zone, "0.0.10.in-addr.arpa.");
    assert_eq!(z.reverse_net.unwrap().to_string(), "10.0.0.0/24");

    let z = ZoneAddress::normalize_zone("10.0.0.0/25:1053").unwrap();
    assert_eq!(z.zone, "0.0.10.in-addr.arpa.");
    assert_eq!(z.port, 1053);
}

#[test]
fn test_normalize_reverse_ipv6_cidr() {
    let z = ZoneAddress::normalize_zone("2001:db8::/32").unwrap();
    assert_eq!(z.zone, "8.b.d.0.1.0.0.2.ip6.arpa.");
    assert_eq!(z.port, 53);
}

#[test]
fn test_normalize_trailing_dot_disables_reverse() {
    let z = ZoneAddress::normalize_zone("10.0.0.0/24.").unwrap();
    assert_eq!(z.zone, "10.0.0.0/24.");
    assert!(z.reverse_net.is_none());
}

#[test]
fn test_normalize_rejects_malformed_input() {
    assert!(matches!(
        ZoneAddress::normalize_zone("example.org:"),
        Err(DomainError::InvalidZone { .. })
    ));
    assert!(matches!(
        ZoneAddress::normalize_zone("example..org"),
        Err(DomainError::InvalidZone { .. })
    ));
    assert!(matches!(
        ZoneAddress::normalize_zone("example.org:99999"),
        Err(DomainError::InvalidPort(_))
    ));
    assert!(matches!(
        ZoneAddress::normalize_zone("https://example.org"),
        Err(DomainError::UnknownTransport(_))
    ));
    assert!(ZoneAddress::normalize_zone("").is_err());
}

// ============================================================================
// Key form
// ============================================================================

#[test]
fn test_key_includes_host_cidr_and_sorted_options() {
    let z = ZoneAddress::normalize_zone("10.0.0.0/24")
        .unwrap()
        .with_host("127.0.0.1")
        .with_option("zeta", "1")
        .with_option("alpha", "2");

    assert_eq!(
        z.as_key(),
        "dns://0.0.10.in-addr.arpa.:127.0.0.1:53##10.0.0.0/24#$#[alpha=2]#$#[zeta=1]"
    );
}

#[test]
fn test_key_round_trip() {
    let cases = vec![
        ZoneAddress::normalize_zone("example.org").unwrap(),
        ZoneAddress::normalize_zone("tls://example.org:8853")
            .unwrap()
            .with_host("::1"),
        ZoneAddress::normalize_zone("10.0.0.0/24").unwrap(),
        ZoneAddress::normalize_zone("grpc://.")
            .unwrap()
            .with_host("192.0.2.1")
            .with_option("a", "b"),
        ZoneAddress::normalize_zone("192.168.0.0/16:1053")
            .unwrap()
            .with_option("x", "1")
            .with_option("y", "2"),
    ];

    for z in cases {
        let key = z.as_key();
        let parsed = ZoneAddress::parse_from_key(&key)
            .unwrap_or_else(|e| panic!("failed to parse {key}: {e}"));
        assert_eq!(parsed.as_key(), key);
        assert_eq!(parsed, z);
    }
}

#[test]
fn test_parse_from_key_validates_parts() {
    assert!(ZoneAddress::parse_from_key("dns://example.org.:53").is_ok());
    assert!(ZoneAddress::parse_from_key("dns://example.org.:[::1]:53").is_ok());
    assert!(matches!(
        ZoneAddress::parse_from_key("dns://example.org.:notanip:53"),
        Err(DomainError::InvalidHost(_))
    ));
    assert!(matches!(
        ZoneAddress::parse_from_key("dns://example.org.:port"),
        Err(DomainError::InvalidPort(_))
    ));
    assert!(matches!(
        ZoneAddress::parse_from_key("dns://example.org."),
        Err(DomainError::InvalidKey(_))
    ));
    assert!(matches!(
        ZoneAddress::parse_from_key("dns://example.org.:53#$#broken"),
        Err(DomainError::InvalidKey(_))
    ));
}

#[test]
fn test_multicast_projection_clears_host_only() {
    let z = ZoneAddress::normalize_zone("example.org")
        .unwrap()
        .with_host("127.0.0.1")
        .with_option("k", "v");
    let m = z.multicast_projection();

    assert!(!z.is_multicast());
    assert!(m.is_multicast());
    assert_eq!(m.zone, z.zone);
    assert_eq!(m.options, z.options);
}

#[test]
fn test_reverse_contains() {
    let z = ZoneAddress::normalize_zone("10.0.0.0/25").unwrap();
    assert!(z.reverse_contains("5.0.0.10.in-addr.arpa."));
    assert!(!z.reverse_contains("200.0.0.10.in-addr.arpa."));
    // Partial reverse names cannot be placed and are let through.
    assert!(z.reverse_contains("0.0.10.in-addr.arpa."));

    let plain = ZoneAddress::normalize_zone("example.org").unwrap();
    assert!(plain.reverse_contains("anything.example.org."));
}
