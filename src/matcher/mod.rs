mod field;
mod ip;
mod range;

pub use field::{FieldPattern, FieldRegexRules};
pub use ip::{CidrMatcher, ExactMatcher};
pub use range::{OctetRangeMatcher, SpanMatcher};

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{BlacklistError, Result};

/// Trait for address matchers.
///
/// Numeric matchers parse the candidate and fail with
/// [`BlacklistError::InvalidIp`] when it is not a dotted quad.
pub trait AddressMatcher: Send + Sync {
    /// Check if the address falls inside this matcher
    fn matches(&self, address: &str) -> Result<bool>;
}

/// A single parsed range notation
#[derive(Debug, Clone)]
pub enum AddressRange {
    Cidr(CidrMatcher),
    Span(SpanMatcher),
    Octets(OctetRangeMatcher),
    Exact(ExactMatcher),
}

impl AddressRange {
    /// Parse a range notation.
    ///
    /// Text containing `/` is CIDR, text containing `-` is a dash-range,
    /// anything else is kept as an exact literal.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.contains('/') {
            Ok(AddressRange::Cidr(CidrMatcher::parse(text)?))
        } else if text.contains('-') {
            Self::parse_dash(text)
        } else {
            Ok(AddressRange::Exact(ExactMatcher::new(text)))
        }
    }

    /// Parse a dash-range, either `a.b.c.d-e.f.g.h` or per-octet `a-b.c.d-e.f`.
    pub fn parse_dash(text: &str) -> Result<Self> {
        if SpanMatcher::is_span(text) {
            Ok(AddressRange::Span(SpanMatcher::parse(text)?))
        } else {
            Ok(AddressRange::Octets(OctetRangeMatcher::parse(text)?))
        }
    }

    /// True for CIDR and dash forms, false for exact literals.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, AddressRange::Exact(_))
    }
}

impl AddressMatcher for AddressRange {
    fn matches(&self, address: &str) -> Result<bool> {
        match self {
            AddressRange::Cidr(m) => m.matches(address),
            AddressRange::Span(m) => m.matches(address),
            AddressRange::Octets(m) => m.matches(address),
            AddressRange::Exact(m) => m.matches(address),
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressRange::Cidr(m) => m.fmt(f),
            AddressRange::Span(m) => m.fmt(f),
            AddressRange::Octets(m) => m.fmt(f),
            AddressRange::Exact(m) => m.fmt(f),
        }
    }
}

/// Parse a candidate address for numeric comparison.
pub(crate) fn parse_candidate(address: &str) -> Result<Ipv4Addr> {
    address
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| BlacklistError::InvalidIp(address.to_string()))
}

/// Parse one decimal octet. Rejects signs, whitespace and anything above 255.
pub(crate) fn parse_octet(text: &str) -> Option<u8> {
    if text.is_empty() || text.len() > 3 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
