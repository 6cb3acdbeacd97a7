use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::{parse_candidate, parse_octet, AddressMatcher};
use crate::error::{BlacklistError, Result};

/// CIDR matcher - matches addresses inside an aligned network block
#[derive(Debug, Clone)]
pub struct CidrMatcher {
    network: Ipv4Net,
}

impl CidrMatcher {
    pub fn new(network: Ipv4Net) -> Self {
        Self { network }
    }

    /// Parse `base/prefixLength`. The base must already be the network address.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (base, prefix) = text
            .split_once('/')
            .ok_or_else(|| BlacklistError::InvalidCidr(format!("missing prefix length: {}", text)))?;

        let prefix = parse_octet(prefix.trim())
            .filter(|p| *p <= 32)
            .ok_or_else(|| {
                BlacklistError::InvalidCidr(format!("prefix length must be 0-32: {}", text))
            })?;

        let base: Ipv4Addr = base
            .trim()
            .parse()
            .map_err(|_| BlacklistError::InvalidCidr(format!("invalid base address: {}", text)))?;

        let network = Ipv4Net::new(base, prefix)
            .map_err(|e| BlacklistError::InvalidCidr(format!("{}: {}", text, e)))?;

        if network.network() != base {
            return Err(BlacklistError::InvalidCidr(format!(
                "{} is not aligned to /{} (network address is {})",
                base,
                prefix,
                network.network()
            )));
        }

        Ok(Self::new(network))
    }

    pub fn network(&self) -> Ipv4Net {
        self.network
    }
}

impl AddressMatcher for CidrMatcher {
    fn matches(&self, address: &str) -> Result<bool> {
        let ip = parse_candidate(address)?;
        Ok(self.network.contains(&ip))
    }
}

impl fmt::Display for CidrMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

/// Exact matcher - case-sensitive string equality, no numeric parsing
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    literal: String,
}

impl ExactMatcher {
    pub fn new(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
        }
    }
}

impl AddressMatcher for ExactMatcher {
    fn matches(&self, address: &str) -> Result<bool> {
        Ok(self.literal == address)
    }
}

impl fmt::Display for ExactMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_matcher() {
        let matcher = CidrMatcher::parse("192.168.0.0/16").unwrap();
        assert!(matcher.matches("192.168.1.1").unwrap());
        assert!(matcher.matches("192.168.255.255").unwrap());
        assert!(!matcher.matches("10.0.0.1").unwrap());
    }

    #[test]
    fn test_cidr_boundaries() {
        let matcher = CidrMatcher::parse("10.1.2.0/24").unwrap();
        assert!(matcher.matches("10.1.2.0").unwrap());
        assert!(matcher.matches("10.1.2.255").unwrap());
        assert!(!matcher.matches("10.1.1.255").unwrap());
        assert!(!matcher.matches("10.1.3.0").unwrap());
    }

    #[test]
    fn test_cidr_prefix_zero_matches_everything() {
        let matcher = CidrMatcher::parse("0.0.0.0/0").unwrap();
        assert!(matcher.matches("0.0.0.0").unwrap());
        assert!(matcher.matches("8.8.8.8").unwrap());
        assert!(matcher.matches("255.255.255.255").unwrap());
    }

    #[test]
    fn test_cidr_prefix_32_matches_single_address() {
        let matcher = CidrMatcher::parse("1.2.3.4/32").unwrap();
        assert!(matcher.matches("1.2.3.4").unwrap());
        assert!(!matcher.matches("1.2.3.5").unwrap());
        assert!(!matcher.matches("1.2.3.3").unwrap());
    }

    #[test]
    fn test_cidr_rejects_prefix_out_of_range() {
        let err = CidrMatcher::parse("10.0.0.1/33").unwrap_err();
        assert!(matches!(err, BlacklistError::InvalidCidr(_)));
        assert!(CidrMatcher::parse("10.0.0.0/-1").is_err());
        assert!(CidrMatcher::parse("10.0.0.0/abc").is_err());
    }

    #[test]
    fn test_cidr_prefix_must_be_plain_digits() {
        for text in ["10.0.0.0/+8", "10.0.0.0/", "10.0.0.0/8a", "10.0.0.0/0008"] {
            assert!(CidrMatcher::parse(text).is_err(), "{} should be rejected", text);
        }
        assert_eq!(CidrMatcher::parse("10.0.0.0/08").unwrap().to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_cidr_rejects_unaligned_base() {
        let err = CidrMatcher::parse("10.0.0.1/24").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not aligned"), "got: {}", msg);
    }

    #[test]
    fn test_cidr_rejects_wrong_octet_count() {
        assert!(CidrMatcher::parse("10.0.0/8").is_err());
        assert!(CidrMatcher::parse("10.0.0.0.0/8").is_err());
        assert!(CidrMatcher::parse("10.0.0.256/32").is_err());
    }

    #[test]
    fn test_cidr_rejects_extra_slash() {
        assert!(CidrMatcher::parse("10.0.0.0/8/8").is_err());
    }

    #[test]
    fn test_exact_matcher_is_case_sensitive() {
        let matcher = ExactMatcher::new("Gateway");
        assert!(matcher.matches("Gateway").unwrap());
        assert!(!matcher.matches("gateway").unwrap());
    }

    #[test]
    fn test_exact_matcher_compares_text_not_value() {
        let matcher = ExactMatcher::new("1.2.3.4");
        assert!(matcher.matches("1.2.3.4").unwrap());
        assert!(!matcher.matches(" 1.2.3.4").unwrap());
    }
}
