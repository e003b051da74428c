const MAX_LABEL_LENGTH: usize = 63;
const MAX_NAME_LENGTH: usize = 255;

/// Return `name` lowercased and dot-terminated.
pub fn fqdn(name: &str) -> String {
    let mut lower = name.to_ascii_lowercase();
    if !lower.ends_with('.') {
        lower.push('.');
    }
    lower
}

/// Lenient DNS name syntax check.
///
/// Any byte is allowed inside a label; only the structure is checked: no
/// empty labels (except the root), labels of at most 63 bytes and an
/// encoded length of at most 255 bytes. `"."` is valid, `""` is not.
pub fn is_valid_domain_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name == "." {
        return true;
    }

    let trimmed = name.strip_suffix('.').unwrap_or(name);
    // One length octet per label plus the terminating root label.
    let mut wire_len = 1;
    for label in trimmed.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
            return false;
        }
        wire_len += label.len() + 1;
    }
    wire_len <= MAX_NAME_LENGTH
}

/// RFC 1035 section 2.3.1 preferred name syntax, with the RFC 1123
/// relaxation that labels may start with a digit.
///
/// Used only to warn about odd-looking zone names at startup.
pub fn is_preferred_hostname(name: &str) -> bool {
    if name == "." {
        return true;
    }
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() || !is_valid_domain_name(trimmed) {
        return false;
    }
    trimmed.split('.').all(|label| {
        let bytes = label.as_bytes();
        let edge_ok = |b: u8| b.is_ascii_alphanumeric();
        edge_ok(bytes[0])
            && edge_ok(bytes[bytes.len() - 1])
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
    })
}

/// Iterator over the suffixes of `name` at label boundaries, longest first.
///
/// `"a.b.example.org."` yields `"a.b.example.org."`, `"b.example.org."`,
/// `"example.org."` and `"org."`. The root is not yielded.
pub fn label_suffixes(name: &str) -> impl Iterator<Item = &str> {
    let mut offset = Some(0);
    std::iter::from_fn(move || {
        let start = offset?;
        let rest = &name[start..];
        if rest.is_empty() || rest == "." {
            offset = None;
            return None;
        }
        offset = rest.find('.').map(|dot| start + dot + 1);
        Some(rest)
    })
}
