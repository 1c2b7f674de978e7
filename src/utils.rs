use alloy::primitives::{hex, Address};

/// Truncate an address to "0xabcd...ef12" format
pub fn truncate_address(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 14 {
        format!("{}...{}", &s[..8], &s[s.len() - 4..])
    } else {
        s
    }
}

/// Format a method or error selector as "0xabcdef12"
pub fn format_selector(selector: &[u8; 4]) -> String {
    hex::encode_prefixed(selector)
}

/// Parse a `0x`-prefixed, 40 hex character address. Checksum casing is not enforced.
pub fn parse_address(s: &str) -> Option<Address> {
    let digits = s.strip_prefix("0x")?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_address() {
        let addr = parse_address("0xaB6B6c13Fd72A92D27096d779F8188F85F4bb5Be").unwrap();
        assert_eq!(truncate_address(&addr), "0xaB6B6c...b5Be");
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(format_selector(&[0x08, 0xc3, 0x79, 0xa0]), "0x08c379a0");
    }

    #[test]
    fn test_parse_address_accepts_any_case() {
        let lower = parse_address("0x2a71f0eb0fb5642c72de827e4d08fe25a8204086").unwrap();
        let mixed = parse_address("0x2a71F0EB0fB5642c72dE827E4D08fe25A8204086").unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_parse_address_rejects_malformed() {
        assert!(parse_address("").is_none());
        assert!(parse_address("0xabc").is_none());
        assert!(parse_address("2a71f0eb0fb5642c72de827e4d08fe25a8204086").is_none());
        assert!(parse_address("0x2a71f0eb0fb5642c72de827e4d08fe25a820408g").is_none());
        assert!(parse_address("0x2a71f0eb0fb5642c72de827e4d08fe25a820408600").is_none());
    }
}
