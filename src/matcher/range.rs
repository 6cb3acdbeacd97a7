use std::fmt;
use std::net::Ipv4Addr;

use super::{parse_candidate, parse_octet, AddressMatcher};
use crate::error::{BlacklistError, Result};

/// Span matcher - inclusive interval between two full addresses
/// (`10.0.0.5-10.0.0.10`)
#[derive(Debug, Clone)]
pub struct SpanMatcher {
    begin: u32,
    end: u32,
}

impl SpanMatcher {
    pub fn new(begin: Ipv4Addr, end: Ipv4Addr) -> Result<Self> {
        let (begin, end) = (u32::from(begin), u32::from(end));
        if begin > end {
            return Err(BlacklistError::InvalidRange(format!(
                "{}-{}: start is after end",
                Ipv4Addr::from(begin),
                Ipv4Addr::from(end)
            )));
        }
        Ok(Self { begin, end })
    }

    /// True when the text has a single `-` with a dotted quad on each side.
    pub fn is_span(text: &str) -> bool {
        match text.split_once('-') {
            Some((from, to)) => {
                !to.contains('-') && from.matches('.').count() == 3 && to.matches('.').count() == 3
            }
            None => false,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (from, to) = text
            .split_once('-')
            .ok_or_else(|| BlacklistError::InvalidRange(text.to_string()))?;
        let begin = parse_bound(from, text)?;
        let end = parse_bound(to, text)?;
        Self::new(begin, end)
    }

    pub fn begin(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.begin)
    }

    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }
}

fn parse_bound(bound: &str, text: &str) -> Result<Ipv4Addr> {
    bound
        .trim()
        .parse()
        .map_err(|_| BlacklistError::InvalidRange(format!("invalid bound '{}' in {}", bound, text)))
}

impl AddressMatcher for SpanMatcher {
    fn matches(&self, address: &str) -> Result<bool> {
        let ip = u32::from(parse_candidate(address)?);
        Ok(self.begin <= ip && ip <= self.end)
    }
}

impl fmt::Display for SpanMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin(), self.end())
    }
}

/// Per-octet range matcher (`10.0-5.1-30.0-255`).
///
/// Each octet of the candidate must fall inside its own inclusive sub-range.
#[derive(Debug, Clone)]
pub struct OctetRangeMatcher {
    begin: [u8; 4],
    end: [u8; 4],
}

impl OctetRangeMatcher {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 4 {
            return Err(BlacklistError::InvalidRange(format!(
                "expected 4 octets, found {}: {}",
                parts.len(),
                text
            )));
        }

        let mut begin = [0u8; 4];
        let mut end = [0u8; 4];

        for (i, part) in parts.iter().enumerate() {
            let bounds: Vec<&str> = part.split('-').collect();
            if bounds.len() > 2 {
                return Err(BlacklistError::InvalidRange(format!(
                    "too many dash segments in '{}': {}",
                    part, text
                )));
            }

            let parse = |s: &str| {
                parse_octet(s.trim()).ok_or_else(|| {
                    BlacklistError::InvalidRange(format!("invalid octet '{}' in {}", s, text))
                })
            };

            begin[i] = parse(bounds[0])?;
            end[i] = match bounds.get(1) {
                Some(b) => parse(*b)?,
                None => begin[i],
            };

            if begin[i] > end[i] {
                return Err(BlacklistError::InvalidRange(format!(
                    "octet range {}-{} is reversed in {}",
                    begin[i], end[i], text
                )));
            }
        }

        Ok(Self { begin, end })
    }
}

impl AddressMatcher for OctetRangeMatcher {
    fn matches(&self, address: &str) -> Result<bool> {
        let octets = parse_candidate(address)?.octets();
        Ok(octets
            .iter()
            .zip(self.begin.iter().zip(self.end.iter()))
            .all(|(o, (b, e))| b <= o && o <= e))
    }
}

impl fmt::Display for OctetRangeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..4 {
            if i > 0 {
                f.write_str(".")?;
            }
            if self.begin[i] == self.end[i] {
                write!(f, "{}", self.begin[i])?;
            } else {
                write!(f, "{}-{}", self.begin[i], self.end[i])?;
            }
        }
        Ok(())
    }
}
