//! WHOIS collaborator module.
//!
//! The registry wire protocol lives outside this crate; the classifier only
//! depends on the [`WhoisClient`] trait defined here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BlacklistError, Result, WhoisErrorKind};

/// Ownership information for one address block, as returned by a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipRecord {
    /// Comma separated CIDR list
    pub cidr: Option<String>,
    pub net_name: Option<String>,
    pub org_name: Option<String>,
    pub country: Option<String>,
    /// First address of the block
    pub ip_from: Option<String>,
    /// Last address of the block
    pub ip_to: Option<String>,
}

/// One request/response exchange with a WHOIS server (diagnostics only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerExchange {
    pub server: String,
    pub request: String,
    pub response: String,
}

/// Result of a WHOIS query.
///
/// An empty `records` list means the registry had no information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisResponse {
    pub records: Vec<OwnershipRecord>,
    pub exchanges: Vec<ServerExchange>,
}

impl WhoisResponse {
    pub fn new(records: Vec<OwnershipRecord>, exchanges: Vec<ServerExchange>) -> Self {
        Self { records, exchanges }
    }

    /// The server that answered last, if any
    pub fn source(&self) -> Option<&str> {
        self.exchanges.last().map(|e| e.server.as_str())
    }
}

/// WHOIS query interface.
pub trait WhoisClient: Send + Sync {
    /// Query ownership records for an address.
    ///
    /// Blocks for the duration of the query.
    fn query(&self, address: &str) -> Result<WhoisResponse>;
}

impl<F> WhoisClient for F
where
    F: Fn(&str) -> Result<WhoisResponse> + Send + Sync,
{
    fn query(&self, address: &str) -> Result<WhoisResponse> {
        self(address)
    }
}

/// Nil client that never knows anything.
pub struct NilWhoisClient;

impl NilWhoisClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NilWhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient for NilWhoisClient {
    fn query(&self, _address: &str) -> Result<WhoisResponse> {
        Ok(WhoisResponse::default())
    }
}

/// Static client with predefined responses per address.
pub struct StaticWhoisClient {
    responses: HashMap<String, WhoisResponse>,
    queries: AtomicUsize,
}

impl StaticWhoisClient {
    /// Create a new empty static client.
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            queries: AtomicUsize::new(0),
        }
    }

    /// Add a response for an address.
    pub fn add(&mut self, address: impl Into<String>, response: WhoisResponse) {
        self.responses.insert(address.into(), response);
    }

    /// Add a response and return self for chaining.
    pub fn with_response(mut self, address: impl Into<String>, response: WhoisResponse) -> Self {
        self.add(address, response);
        self
    }

    /// Add a single ownership record answered by `server`.
    pub fn with_record(
        self,
        address: impl Into<String>,
        server: impl Into<String>,
        record: OwnershipRecord,
    ) -> Self {
        let address = address.into();
        let exchange = ServerExchange {
            server: server.into(),
            request: address.clone(),
            response: String::new(),
        };
        self.with_response(address, WhoisResponse::new(vec![record], vec![exchange]))
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for StaticWhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient for StaticWhoisClient {
    fn query(&self, address: &str) -> Result<WhoisResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(address)
            .cloned()
            .ok_or_else(|| BlacklistError::WhoisError {
                kind: WhoisErrorKind::NotFound,
                message: format!("No response configured for {}", address),
            })
    }
}
