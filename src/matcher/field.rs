use std::collections::HashMap;

use regex::Regex;

use crate::error::{BlacklistError, Result};
use crate::types::{AnalysisRecord, RecordField};

/// One field rule pattern.
///
/// Matches when the value equals the pattern text case-insensitively, or when
/// the pattern matches as a regular expression.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    text: String,
    lowered: String,
    regex: Regex,
}

impl FieldPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            text: pattern.to_string(),
            lowered: pattern.to_lowercase(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, value: &str) -> bool {
        value.to_lowercase() == self.lowered || self.regex.is_match(value)
    }
}

/// Field rules keyed by record field
#[derive(Debug, Clone, Default)]
pub struct FieldRegexRules {
    rules: HashMap<RecordField, Vec<FieldPattern>>,
}

impl FieldRegexRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern under a field name.
    ///
    /// Fails on unknown field names and on patterns that do not compile.
    pub fn add_rule(&mut self, field_name: &str, pattern: &str) -> Result<()> {
        let field = RecordField::from_name(field_name)
            .ok_or_else(|| BlacklistError::UnknownField(field_name.trim().to_string()))?;
        self.add(field, pattern)
    }

    pub fn add(&mut self, field: RecordField, pattern: &str) -> Result<()> {
        let pattern = FieldPattern::new(pattern)?;
        self.rules.entry(field).or_default().push(pattern);
        Ok(())
    }

    /// Check if any rule matches any populated field of the record
    pub fn matches(&self, record: &AnalysisRecord) -> bool {
        self.matching_rule(record).is_some()
    }

    /// The first rule satisfied by the record, as `(field, pattern)`.
    pub fn matching_rule(&self, record: &AnalysisRecord) -> Option<(RecordField, &str)> {
        if self.rules.is_empty() {
            return None;
        }

        for field in RecordField::ALL {
            let Some(patterns) = self.rules.get(&field) else {
                continue;
            };
            let Some(value) = record.field_value(field) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            if let Some(pattern) = patterns.iter().find(|p| p.matches(&value)) {
                return Some((field, pattern.as_str()));
            }
        }
        None
    }

    pub fn patterns(&self, field: RecordField) -> &[FieldPattern] {
        self.rules.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered patterns
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
