//! IP Blacklist - IPv4 blacklist classification for Rust
//!
//! This library decides whether an IPv4 address is blacklisted by checking:
//! - CIDR blocks, dash-ranges and exact literals listed in a blacklist
//! - Regular-expression rules against WHOIS ownership metadata
//! - A persisted cache of previously resolved ownership records
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ip_blacklist_r::{Classifier, ClassifierOptions, MemoryStore, OwnershipRecord, StaticWhoisClient};
//!
//! let blacklist = "
//! # Private ranges
//! 192.168.1.0/24
//! 10.0.0.5-10.0.0.10
//! OwnerName:BadOrg.*
//! ";
//!
//! let whois = StaticWhoisClient::new().with_record(
//!     "8.8.8.8",
//!     "whois.arin.net",
//!     OwnershipRecord {
//!         cidr: Some("8.8.8.0/24".to_string()),
//!         org_name: Some("BadOrg LLC".to_string()),
//!         ..Default::default()
//!     },
//! );
//!
//! let classifier = Classifier::new(
//!     blacklist,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(whois),
//!     ClassifierOptions::default(),
//! )
//! .unwrap();
//!
//! assert!(classifier.is_blacklisted("192.168.1.5").unwrap());
//! assert!(classifier.is_blacklisted("8.8.8.8").unwrap());
//! ```
//!
//! # Blacklist Syntax
//!
//! One entry per line. Lines starting with `#` and blank lines are ignored.
//!
//! | Type | Example | Description |
//! |------|---------|-------------|
//! | CIDR | `192.168.0.0/16` | Aligned network block |
//! | Range | `10.0.0.5-10.0.0.10` | Inclusive span between two addresses |
//! | Octet range | `10.0-5.1-30.0-255` | Each octet within its own range |
//! | Exact | `1.2.3.4` | Case-sensitive string equality |
//! | Field rule | `OwnerName:BadOrg.*` | Regex against a WHOIS record field |
//!
//! A line containing `/` is always CIDR and a line containing `-` is always a
//! range, so field rule patterns cannot use those characters.
//!
//! Field rule names: `CIDR`, `Country`, `DiscoveryDate`, `FromAddress`,
//! `NetworkName`, `OwnerName`, `ToAddress`, `WhoisSource`.

pub mod cache;
pub mod classifier;
pub mod compile;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod types;
pub mod whois;

// Re-export commonly used items
pub use compile::{compile, RangeRegistry};
pub use error::{BlacklistError, Result, StoreErrorKind, WhoisErrorKind};
pub use matcher::{
    AddressMatcher, AddressRange, CidrMatcher, ExactMatcher, FieldPattern, FieldRegexRules,
    OctetRangeMatcher, SpanMatcher,
};
pub use parser::{parse_blacklist, parse_blacklist_from_file};
pub use types::{AnalysisRecord, BlacklistEntry, EntryKind, RecordField, Verdict};

// Re-export cache types
pub use cache::{
    AnalysisCache, CacheGuard, FnStore, JsonFileStore, MemoryStore, NilStore, RecordStore,
};

// Re-export whois types
pub use whois::{
    NilWhoisClient, OwnershipRecord, ServerExchange, StaticWhoisClient, WhoisClient, WhoisResponse,
};

// Re-export classifier types
pub use classifier::{Classifier, ClassifierOptions, LogLevel, DEFAULT_QUERY_INTERVAL};
