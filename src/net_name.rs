//! Net name parsing.
//!
//! Interfaces are addressed as `CAN1`..`CANn`. The vendor wants the numeric
//! part only, so the prefix is skipped and the rest is read the way C `atoi`
//! reads it.

use crate::{ShimError, ShimResult, types::Long};

/// Length of the `CAN` prefix that is skipped
pub const NET_NAME_PREFIX_LEN: usize = 3;

/// Parses a narrow net name such as `"CAN1"` into its index
pub fn parse_net_name(name: &str) -> ShimResult<Long> {
    parse_net_name_bytes(name.as_bytes())
}

/// Parses a narrow net name given as raw bytes (no terminator)
pub fn parse_net_name_bytes(name: &[u8]) -> ShimResult<Long> {
    let name = until_nul(name);
    parse_units(name.iter().map(|&b| b as u32), name.len())
        .ok_or_else(|| ShimError::InvalidNetName(String::from_utf8_lossy(name).into_owned()))
}

/// Parses a wide (UTF-16) net name such as `u"CAN12"` into its index
pub fn parse_net_name_wide(name: &[u16]) -> ShimResult<Long> {
    let name = until_nul(name);
    parse_units(name.iter().map(|&u| u as u32), name.len())
        .ok_or_else(|| ShimError::InvalidNetName(String::from_utf16_lossy(name)))
}

fn until_nul<T: Copy + Default + PartialEq>(s: &[T]) -> &[T] {
    let end = s.iter().position(|c| *c == T::default()).unwrap_or(s.len());
    &s[..end]
}

fn parse_units(units: impl Iterator<Item = u32>, len: usize) -> Option<Long> {
    if len < NET_NAME_PREFIX_LEN + 1 {
        return None;
    }
    Some(atoi(units.skip(NET_NAME_PREFIX_LEN)))
}

fn is_space(c: u32) -> bool {
    matches!(c, 0x20 | 0x09..=0x0D)
}

fn atoi(units: impl Iterator<Item = u32>) -> Long {
    let mut it = units.skip_while(|c| is_space(*c)).peekable();
    let negative = match it.peek() {
        Some(&c) if c == '-' as u32 => {
            it.next();
            true
        }
        Some(&c) if c == '+' as u32 => {
            it.next();
            false
        }
        _ => false,
    };
    let mut acc: i64 = 0;
    for c in it {
        let Some(d) = char::from_u32(c).and_then(|c| c.to_digit(10)) else {
            break;
        };
        // Saturate well past the i32 range, clamped below
        acc = (acc * 10 + d as i64).min(i64::from(Long::MAX) + 1);
    }
    if negative {
        acc = -acc;
    }
    acc.clamp(i64::from(Long::MIN), i64::from(Long::MAX)) as Long
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn parses_index() {
        assert_eq!(parse_net_name("CAN1").unwrap(), 1);
        assert_eq!(parse_net_name("CAN12").unwrap(), 12);
        assert_eq!(parse_net_name("CAN007").unwrap(), 7);
        for n in [1, 2, 9, 10, 99, 255, 4096] {
            assert_eq!(parse_net_name(&format!("CAN{n}")).unwrap(), n);
            assert_eq!(parse_net_name_wide(&wide(&format!("CAN{n}"))).unwrap(), n);
        }
    }

    #[test]
    fn too_short() {
        for name in ["", "C", "CA", "CAN"] {
            match parse_net_name(name) {
                Err(ShimError::InvalidNetName(n)) => assert_eq!(n, name),
                other => panic!("{name:?} parsed as {other:?}"),
            }
            assert!(parse_net_name_wide(&wide(name)).is_err());
        }
    }

    #[test]
    fn stops_at_terminator() {
        assert_eq!(parse_net_name_bytes(b"CAN3\0garbage").unwrap(), 3);
        assert!(parse_net_name_bytes(b"CA\0N3").is_err());
        let mut w = wide("CAN4");
        w.push(0);
        w.extend(wide("9"));
        assert_eq!(parse_net_name_wide(&w).unwrap(), 4);
    }

    #[test]
    fn atoi_rules() {
        // Prefix is positional, not checked
        assert_eq!(parse_net_name("XYZ5").unwrap(), 5);
        assert_eq!(parse_net_name("CAN 42").unwrap(), 42);
        assert_eq!(parse_net_name("CAN-2").unwrap(), -2);
        assert_eq!(parse_net_name("CAN+8").unwrap(), 8);
        assert_eq!(parse_net_name("CAN3x").unwrap(), 3);
        assert_eq!(parse_net_name("CANx").unwrap(), 0);
        assert_eq!(parse_net_name("CAN99999999999").unwrap(), Long::MAX);
        assert_eq!(parse_net_name("CAN-99999999999").unwrap(), Long::MIN);
    }

    #[test]
    fn non_ascii_prefix_does_not_panic() {
        // Three bytes of prefix land inside a multi byte char
        assert_eq!(parse_net_name("é17").unwrap(), 7);
        assert_eq!(parse_net_name_wide(&wide("ÄÖÜ21")).unwrap(), 21);
    }
}
