//! Classifier module.
//!
//! Decides whether an address is blacklisted: direct range matches first,
//! then field rules against ownership records resolved through the cache
//! and the WHOIS collaborator.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{AnalysisCache, RecordStore};
use crate::compile::RangeRegistry;
use crate::error::Result;
use crate::matcher::parse_candidate;
use crate::types::{AnalysisRecord, Verdict};
use crate::whois::WhoisClient;

/// Default minimum interval between two WHOIS queries
pub const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_millis(200);

/// Diagnostic message level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
}

/// Logger callback type for classifier diagnostics
type LoggerCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Classifier options.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawOptions")]
pub struct ClassifierOptions {
    /// Minimum interval between two WHOIS queries
    pub query_interval: Duration,
    /// Minimum interval between two cache saves
    pub persist_delay: Duration,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawOptions {
    query_interval_ms: u64,
    persist_delay_ms: u64,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            query_interval_ms: DEFAULT_QUERY_INTERVAL.as_millis() as u64,
            persist_delay_ms: 0,
        }
    }
}

impl From<RawOptions> for ClassifierOptions {
    fn from(raw: RawOptions) -> Self {
        Self {
            query_interval: Duration::from_millis(raw.query_interval_ms),
            persist_delay: Duration::from_millis(raw.persist_delay_ms),
        }
    }
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            query_interval: DEFAULT_QUERY_INTERVAL,
            persist_delay: Duration::ZERO,
        }
    }
}

impl ClassifierOptions {
    /// Create new classifier options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum interval between WHOIS queries.
    pub fn with_query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    /// Set the minimum interval between cache saves.
    pub fn with_persist_delay(mut self, delay: Duration) -> Self {
        self.persist_delay = delay;
        self
    }

    /// Read options from a JSON document
    /// (`{"query_interval_ms": 200, "persist_delay_ms": 5000}`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Blacklist classifier.
pub struct Classifier {
    registry: Arc<RangeRegistry>,
    cache: Arc<AnalysisCache>,
    whois: Arc<dyn WhoisClient>,
    query_interval: Duration,
    logger: Option<LoggerCallback>,
}

impl Classifier {
    /// Create a classifier from blacklist text.
    ///
    /// Loads the cache from `store` immediately.
    pub fn new(
        blacklist: &str,
        store: Arc<dyn RecordStore>,
        whois: Arc<dyn WhoisClient>,
        options: ClassifierOptions,
    ) -> Result<Self> {
        let registry = Arc::new(RangeRegistry::build(blacklist)?);
        let cache = Arc::new(AnalysisCache::new(store).with_persist_delay(options.persist_delay));
        cache.ensure_loaded()?;
        Ok(Self::from_parts(registry, cache, whois, options))
    }

    /// Create a classifier from a blacklist file.
    pub fn from_file(
        path: impl AsRef<Path>,
        store: Arc<dyn RecordStore>,
        whois: Arc<dyn WhoisClient>,
        options: ClassifierOptions,
    ) -> Result<Self> {
        let registry = Arc::new(RangeRegistry::from_file(path)?);
        let cache = Arc::new(AnalysisCache::new(store).with_persist_delay(options.persist_delay));
        cache.ensure_loaded()?;
        Ok(Self::from_parts(registry, cache, whois, options))
    }

    /// Create a classifier around an existing registry and cache.
    ///
    /// The cache keeps its own persist delay; only `query_interval` is read
    /// from `options`.
    pub fn from_parts(
        registry: Arc<RangeRegistry>,
        cache: Arc<AnalysisCache>,
        whois: Arc<dyn WhoisClient>,
        options: ClassifierOptions,
    ) -> Self {
        Self {
            registry,
            cache,
            whois,
            query_interval: options.query_interval,
            logger: None,
        }
    }

    /// Set logger
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        self.logger = Some(Box::new(logger));
        self
    }

    fn log(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Info => tracing::info!("{}", msg),
            LogLevel::Debug => tracing::debug!("{}", msg),
        }
        if let Some(ref logger) = self.logger {
            logger(level, msg);
        }
    }

    pub fn registry(&self) -> &RangeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Check if the address is blacklisted
    pub fn is_blacklisted(&self, address: &str) -> Result<bool> {
        Ok(self.classify(address)?.is_blacklisted())
    }

    /// Classify an address and report what matched.
    pub fn classify(&self, address: &str) -> Result<Verdict> {
        if let Some(range) = self.registry.matching_range(address)? {
            return Ok(Verdict::Range(range.to_string()));
        }

        let rules = self.registry.field_rules();
        for record in self.query(address)? {
            if let Some((field, pattern)) = rules.matching_rule(&record) {
                return Ok(Verdict::FieldRule {
                    field,
                    pattern: pattern.to_string(),
                });
            }
        }

        Ok(Verdict::Clean)
    }

    /// Resolve the ownership records covering an address.
    ///
    /// A cache hit returns the single cached record. On a miss the WHOIS
    /// collaborator is queried (throttled to `query_interval`), every
    /// returned record is cached and the cache is persisted.
    pub fn query(&self, address: &str) -> Result<Vec<Arc<AnalysisRecord>>> {
        parse_candidate(address)?;

        let mut cache = self.cache.lock();
        cache.ensure_loaded()?;

        if let Some(record) = cache.lookup(address)? {
            return Ok(vec![record]);
        }

        cache.throttle(self.query_interval);
        tracing::debug!(address, "querying whois");
        let response = self.whois.query(address);
        cache.mark_query();
        let response = response?;

        if response.records.is_empty() {
            self.log(LogLevel::Info, &format!("No responses for {}", address));
            for exchange in &response.exchanges {
                self.log(
                    LogLevel::Debug,
                    &format!(
                        "{}> {}\r\n{}",
                        exchange.server, exchange.request, exchange.response
                    ),
                );
            }
        }

        let source = response.source();
        let discovered = Utc::now();

        // Derive ranges up front so a malformed record fails before anything is cached
        let mut fresh = Vec::with_capacity(response.records.len());
        for ownership in &response.records {
            let record = AnalysisRecord::from_ownership(ownership, source, discovered);
            if record.ranges()?.is_empty() {
                tracing::warn!(
                    address,
                    owner = record.owner_name.as_deref().unwrap_or(""),
                    "whois record has no CIDR or address bounds, it will never match a lookup"
                );
            }
            fresh.push(record);
        }

        let resolved: Vec<Arc<AnalysisRecord>> =
            fresh.into_iter().map(|r| cache.insert(r)).collect();

        cache.persist()?;
        Ok(resolved)
    }
}
