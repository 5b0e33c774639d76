//! IPv4-mapped IPv6 address translation
//!
//! Converts between an IPv4 address and its `::ffff:HHHH:HHHH` IPv6 form.
//!
//! # Examples
//!
//! ```
//! use ipkit_core::Ipv4Address;
//! use ipkit_mapped::{ipv4_to_mapped_ipv6, mapped_ipv6_to_ipv4};
//!
//! let addr = Ipv4Address::parse("192.168.1.1").unwrap();
//! let mapped = ipv4_to_mapped_ipv6(addr);
//! assert_eq!(mapped, "::ffff:c0a8:0101");
//! assert_eq!(mapped_ipv6_to_ipv4(&mapped).unwrap(), addr);
//! ```

use ipkit_core::Ipv4Address;
use thiserror::Error;

/// Anchor group preceding the embedded IPv4 address
pub const MAPPED_ANCHOR: &str = "ffff";

/// Translation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappedError {
    /// Text is not valid IPv6 group syntax
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Well-formed IPv6 text without an embedded IPv4 address
    #[error("Not an IPv4-mapped IPv6 address: {0}")]
    NotMappedAddress(String),
}

pub type Result<T> = std::result::Result<T, MappedError>;

/// Render an IPv4 address as `::ffff:HHHH:HHHH`
///
/// Bytes are lowercase hex, each zero-padded to two digits.
pub fn ipv4_to_mapped_ipv6(addr: Ipv4Address) -> String {
    let [a, b, c, d] = addr.octets();
    format!(
        "::{}:{:02x}{:02x}:{:02x}{:02x}",
        MAPPED_ANCHOR, a, b, c, d
    )
}

/// Extract the IPv4 address embedded in mapped IPv6 text
///
/// The two groups following the first `ffff` group are read as the high and
/// low halves of the IPv4 address.
///
/// The anchor is matched case-insensitively (`FFFF` works too), and each
/// following group is read as a 16-bit value, so a short group such as `a00`
/// means `0a00` rather than being split into two hex-digit pairs.
///
/// # Errors
///
/// * [`MappedError::InvalidFormat`] if the text is not 3-8 colon-separated
///   groups of 0-4 hex digits (or `::`)
/// * [`MappedError::NotMappedAddress`] if there is no `ffff` group followed
///   by two non-empty groups
pub fn mapped_ipv6_to_ipv4(text: &str) -> Result<Ipv4Address> {
    let groups = split_groups(text)?;

    let anchor = groups
        .iter()
        .position(|g| g.eq_ignore_ascii_case(MAPPED_ANCHOR))
        .ok_or_else(|| MappedError::NotMappedAddress(format!("no 'ffff' group in '{}'", text)))?;

    let high = embedded_group(&groups, anchor + 1, text)?;
    let low = embedded_group(&groups, anchor + 2, text)?;

    let [a, b] = high.to_be_bytes();
    let [c, d] = low.to_be_bytes();
    Ok(Ipv4Address::from([a, b, c, d]))
}

/// Validate IPv6 group syntax and split on `:`
fn split_groups(text: &str) -> Result<Vec<&str>> {
    if text == "::" {
        return Ok(vec!["", "", ""]);
    }

    let groups: Vec<&str> = text.split(':').collect();
    if !(3..=8).contains(&groups.len()) {
        return Err(MappedError::InvalidFormat(format!(
            "expected 3 to 8 colon-separated groups in '{}', found {}",
            text,
            groups.len()
        )));
    }

    if let Some(bad) = groups
        .iter()
        .find(|g| g.len() > 4 || !g.bytes().all(|b| b.is_ascii_hexdigit()))
    {
        return Err(MappedError::InvalidFormat(format!(
            "group '{}' is not 0-4 hex digits",
            bad
        )));
    }

    Ok(groups)
}

fn embedded_group(groups: &[&str], index: usize, text: &str) -> Result<u16> {
    match groups.get(index) {
        Some(group) if !group.is_empty() => u16::from_str_radix(group, 16)
            .map_err(|_| MappedError::InvalidFormat(format!("group '{}' is not hex", group))),
        _ => Err(MappedError::NotMappedAddress(format!(
            "'ffff' must be followed by two groups in '{}'",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Ipv4Address {
        Ipv4Address::parse(text).unwrap()
    }

    #[test]
    fn test_to_mapped() {
        assert_eq!(ipv4_to_mapped_ipv6(addr("192.168.1.1")), "::ffff:c0a8:0101");
        assert_eq!(ipv4_to_mapped_ipv6(addr("0.0.0.0")), "::ffff:0000:0000");
        assert_eq!(ipv4_to_mapped_ipv6(addr("10.0.255.7")), "::ffff:0a00:ff07");
    }

    #[test]
    fn test_from_mapped() {
        assert_eq!(mapped_ipv6_to_ipv4("::ffff:c0a8:0101").unwrap(), addr("192.168.1.1"));
        assert_eq!(mapped_ipv6_to_ipv4("0:0:0:0:0:ffff:0808:0404").unwrap(), addr("8.8.4.4"));
    }

    #[test]
    fn test_from_mapped_case_insensitive() {
        assert_eq!(mapped_ipv6_to_ipv4("::FFFF:C0A8:0101").unwrap(), addr("192.168.1.1"));
    }

    #[test]
    fn test_from_mapped_short_groups() {
        assert_eq!(mapped_ipv6_to_ipv4("::ffff:a00:1").unwrap(), addr("10.0.0.1"));
    }

    #[test]
    fn test_round_trip() {
        for text in ["0.0.0.0", "1.2.3.4", "127.0.0.1", "172.31.0.9", "255.255.255.255"] {
            let original = addr(text);
            let back = mapped_ipv6_to_ipv4(&ipv4_to_mapped_ipv6(original)).unwrap();
            assert_eq!(back, original);
        }
    }

    #[test]
    fn test_round_trip_every_octet_position() {
        for position in 0..4 {
            for value in 0..=255u8 {
                let mut octets = [192, 0, 2, 77];
                octets[position] = value;
                let original = Ipv4Address::from(octets);
                let mapped = ipv4_to_mapped_ipv6(original);
                assert_eq!(mapped_ipv6_to_ipv4(&mapped).unwrap(), original, "{}", mapped);
            }
        }
    }

    #[test]
    fn test_round_trip_u32_sweep() {
        for n in (0..=u32::MAX).step_by(65_521).chain([u32::MAX]) {
            let original = Ipv4Address::from_u32(n);
            let mapped = ipv4_to_mapped_ipv6(original);
            assert_eq!(mapped.len(), 16);
            assert_eq!(mapped_ipv6_to_ipv4(&mapped).unwrap(), original);
        }
    }

    #[test]
    fn test_first_anchor_wins() {
        assert_eq!(mapped_ipv6_to_ipv4("::ffff:ffff:0101").unwrap(), addr("255.255.1.1"));
    }

    #[test]
    fn test_invalid_format() {
        for text in ["", "1.2.3.4", "ffff", "::ffff:c0a8:01011", "::ffff:g0a8:0101", "1:2:3:4:5:6:7:8:9"] {
            let err = mapped_ipv6_to_ipv4(text).unwrap_err();
            assert!(matches!(err, MappedError::InvalidFormat(_)), "{:?}", text);
        }
    }

    #[test]
    fn test_not_mapped() {
        for text in ["::", "2001:db8::1", "fe80::1", "::ffff", "::ffff:c0a8", "::ffff::"] {
            let err = mapped_ipv6_to_ipv4(text).unwrap_err();
            assert!(matches!(err, MappedError::NotMappedAddress(_)), "{:?}", text);
        }
    }

    #[test]
    fn test_error_display() {
        let err = mapped_ipv6_to_ipv4("2001:db8::1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not an IPv4-mapped IPv6 address: no 'ffff' group in '2001:db8::1'"
        );
    }
}
