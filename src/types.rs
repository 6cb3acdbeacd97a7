use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::matcher::{AddressMatcher, AddressRange, CidrMatcher, ExactMatcher, SpanMatcher};
use crate::whois::OwnershipRecord;

/// Metadata field of an [`AnalysisRecord`] that field rules can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Cidr,
    Country,
    DiscoveryDate,
    FromAddress,
    NetworkName,
    OwnerName,
    ToAddress,
    WhoisSource,
}

impl RecordField {
    /// All fields, in evaluation order
    pub const ALL: [RecordField; 8] = [
        RecordField::Cidr,
        RecordField::Country,
        RecordField::DiscoveryDate,
        RecordField::FromAddress,
        RecordField::NetworkName,
        RecordField::OwnerName,
        RecordField::ToAddress,
        RecordField::WhoisSource,
    ];

    /// Canonical name, as written in blacklist rules and persisted records
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::Cidr => "CIDR",
            RecordField::Country => "Country",
            RecordField::DiscoveryDate => "DiscoveryDate",
            RecordField::FromAddress => "FromAddress",
            RecordField::NetworkName => "NetworkName",
            RecordField::OwnerName => "OwnerName",
            RecordField::ToAddress => "ToAddress",
            RecordField::WhoisSource => "WhoisSource",
        }
    }

    /// Resolve a rule field name (case-insensitive, `FromIp`/`ToIp` accepted).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("FromIp") {
            return Some(RecordField::FromAddress);
        }
        if name.eq_ignore_ascii_case("ToIp") {
            return Some(RecordField::ToAddress);
        }
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved ownership entry for an address block.
///
/// Immutable once built apart from the memoized range set, which is derived
/// from `cidr` and `from_address`/`to_address` on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisRecord {
    #[serde(rename = "CIDR", default)]
    pub cidr: Vec<String>,
    #[serde(default, alias = "FromIp")]
    pub from_address: Option<String>,
    #[serde(default, alias = "ToIp")]
    pub to_address: Option<String>,
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub whois_source: Option<String>,
    pub discovery_date: DateTime<Utc>,

    #[serde(skip)]
    ranges: OnceCell<Vec<AddressRange>>,
}

impl AnalysisRecord {
    /// Create an empty record discovered now
    pub fn new() -> Self {
        Self::discovered_at(Utc::now())
    }

    /// Create an empty record with an explicit discovery date
    pub fn discovered_at(discovery_date: DateTime<Utc>) -> Self {
        Self {
            cidr: Vec::new(),
            from_address: None,
            to_address: None,
            network_name: None,
            owner_name: None,
            country: None,
            whois_source: None,
            discovery_date,
            ranges: OnceCell::new(),
        }
    }

    /// Map a WHOIS ownership record into an analysis record.
    ///
    /// The CIDR text is split on `,`; blank pieces are dropped.
    pub fn from_ownership(
        ownership: &OwnershipRecord,
        whois_source: Option<&str>,
        discovery_date: DateTime<Utc>,
    ) -> Self {
        let cidr = ownership
            .cidr
            .as_deref()
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cidr,
            from_address: ownership.ip_from.clone(),
            to_address: ownership.ip_to.clone(),
            network_name: ownership.net_name.clone(),
            owner_name: ownership.org_name.clone(),
            country: ownership.country.clone(),
            whois_source: whois_source.map(String::from),
            ..Self::discovered_at(discovery_date)
        }
    }

    pub fn with_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cidr.push(cidr.into());
        self
    }

    pub fn with_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_address = Some(from.into());
        self.to_address = Some(to.into());
        self
    }

    pub fn with_network_name(mut self, name: impl Into<String>) -> Self {
        self.network_name = Some(name.into());
        self
    }

    pub fn with_owner_name(mut self, name: impl Into<String>) -> Self {
        self.owner_name = Some(name.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_whois_source(mut self, source: impl Into<String>) -> Self {
        self.whois_source = Some(source.into());
        self
    }

    /// The address ranges this record covers, derived once and memoized.
    pub fn ranges(&self) -> Result<&[AddressRange]> {
        self.ranges
            .get_or_try_init(|| self.derive_ranges())
            .map(Vec::as_slice)
    }

    fn derive_ranges(&self) -> Result<Vec<AddressRange>> {
        let mut ranges = Vec::with_capacity(self.cidr.len() + 1);

        for cidr in self.cidr.iter().filter(|c| !c.trim().is_empty()) {
            ranges.push(AddressRange::Cidr(CidrMatcher::parse(cidr)?));
        }

        let from = self.from_address.as_deref().map(str::trim).unwrap_or("");
        let to = self.to_address.as_deref().map(str::trim).unwrap_or("");
        if !from.is_empty() && !to.is_empty() {
            let span = SpanMatcher::parse(&format!("{}-{}", from, to))?;
            ranges.push(AddressRange::Span(span));
        }

        Ok(ranges)
    }

    /// Check if the address falls in any of this record's ranges
    pub fn matches(&self, address: &str) -> Result<bool> {
        for range in self.ranges()? {
            if range.matches(address)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Text value of a field, `None` when the field is absent.
    pub fn field_value(&self, field: RecordField) -> Option<Cow<'_, str>> {
        match field {
            RecordField::Cidr => {
                if self.cidr.is_empty() {
                    None
                } else {
                    Some(Cow::Owned(self.cidr.join(", ")))
                }
            }
            RecordField::Country => self.country.as_deref().map(Cow::Borrowed),
            RecordField::DiscoveryDate => Some(Cow::Owned(
                self.discovery_date
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
            RecordField::FromAddress => self.from_address.as_deref().map(Cow::Borrowed),
            RecordField::NetworkName => self.network_name.as_deref().map(Cow::Borrowed),
            RecordField::OwnerName => self.owner_name.as_deref().map(Cow::Borrowed),
            RecordField::ToAddress => self.to_address.as_deref().map(Cow::Borrowed),
            RecordField::WhoisSource => self.whois_source.as_deref().map(Cow::Borrowed),
        }
    }
}

impl Default for AnalysisRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Classified blacklist line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// `base/prefixLength`
    Cidr(String),
    /// `a.b.c.d-e.f.g.h` or per-octet `a-b.c.d-e.f`
    DashRange(String),
    /// Literal compared by string equality
    Exact(String),
    /// `fieldName:pattern`
    FieldRule { field: String, pattern: String },
}

/// Parsed blacklist line before compilation
#[derive(Debug, Clone)]
pub struct BlacklistEntry {
    pub kind: EntryKind,
    /// Line number in the original text (for error reporting)
    pub line_num: usize,
}

impl BlacklistEntry {
    /// Compile the address part of this entry.
    ///
    /// Returns `None` for field rules.
    pub fn to_range(&self) -> Option<Result<AddressRange>> {
        match &self.kind {
            EntryKind::Cidr(text) => Some(CidrMatcher::parse(text).map(AddressRange::Cidr)),
            EntryKind::DashRange(text) => Some(AddressRange::parse_dash(text)),
            EntryKind::Exact(text) => Some(Ok(AddressRange::Exact(ExactMatcher::new(text.as_str())))),
            EntryKind::FieldRule { .. } => None,
        }
    }
}

/// Verdict of a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A blacklist range matched directly
    Range(String),
    /// A field rule matched a resolved ownership record
    FieldRule { field: RecordField, pattern: String },
    /// Nothing matched
    Clean,
}

impl Verdict {
    pub fn is_blacklisted(&self) -> bool {
        !matches!(self, Verdict::Clean)
    }
}
