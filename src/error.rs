use thiserror::Error;

/// Classifies WHOIS collaborator errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhoisErrorKind {
    /// Connection to the registry server failed
    ConnectionFailed,
    /// Query timed out
    Timeout,
    /// Malformed or unexpected registry response
    Protocol,
    /// The collaborator has no answer configured for the address
    NotFound,
}

/// Classifies record store errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The load hook failed
    LoadFailed,
    /// The save hook failed
    SaveFailed,
    /// Persisted data could not be decoded
    InvalidData,
}

/// Blacklist engine error types
#[derive(Error, Debug)]
pub enum BlacklistError {
    #[error("Parse error at line {line}: {message}")]
    ParseErrorAtLine { line: usize, message: String },

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error("Invalid rule format: {0}")]
    InvalidRule(String),

    #[error("Unknown record field: {0}")]
    UnknownField(String),

    #[error("WHOIS error: {message}")]
    WhoisError {
        kind: WhoisErrorKind,
        message: String,
    },

    #[error("Store error: {message}")]
    StoreError {
        kind: StoreErrorKind,
        message: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BlacklistError {
    /// True for errors raised while parsing a range, rule or address.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            BlacklistError::ParseErrorAtLine { .. }
                | BlacklistError::InvalidCidr(_)
                | BlacklistError::InvalidRange(_)
                | BlacklistError::InvalidIp(_)
                | BlacklistError::InvalidRule(_)
                | BlacklistError::UnknownField(_)
                | BlacklistError::RegexError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BlacklistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whois_error_kind_is_matchable() {
        let err = BlacklistError::WhoisError {
            kind: WhoisErrorKind::Timeout,
            message: "whois.arin.net timed out".into(),
        };
        match &err {
            BlacklistError::WhoisError { kind, .. } => {
                assert!(matches!(kind, WhoisErrorKind::Timeout));
            }
            _ => panic!("expected WhoisError"),
        }
    }

    #[test]
    fn test_whois_error_display_includes_message() {
        let err = BlacklistError::WhoisError {
            kind: WhoisErrorKind::ConnectionFailed,
            message: "connection refused".into(),
        };
        let display = format!("{}", err);
        assert!(display.contains("connection refused"), "got: {}", display);
    }

    #[test]
    fn test_store_error_kind_is_matchable() {
        let err = BlacklistError::StoreError {
            kind: StoreErrorKind::SaveFailed,
            message: "disk full".into(),
        };
        match &err {
            BlacklistError::StoreError { kind, .. } => {
                assert_eq!(*kind, StoreErrorKind::SaveFailed);
            }
            _ => panic!("expected StoreError"),
        }
    }

    #[test]
    fn test_parse_error_at_line_display() {
        let err = BlacklistError::ParseErrorAtLine {
            line: 3,
            message: "Invalid CIDR: 10.0.0.1/33".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Parse error at line 3: Invalid CIDR: 10.0.0.1/33"
        );
    }

    #[test]
    fn test_format_error_classification() {
        assert!(BlacklistError::InvalidCidr("x".into()).is_format_error());
        assert!(BlacklistError::InvalidIp("x".into()).is_format_error());
        assert!(!BlacklistError::StoreError {
            kind: StoreErrorKind::LoadFailed,
            message: "x".into(),
        }
        .is_format_error());
    }
}
