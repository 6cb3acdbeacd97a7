use std::path::Path;

use crate::error::{BlacklistError, Result};
use crate::matcher::{AddressMatcher, AddressRange, FieldRegexRules};
use crate::parser::{parse_blacklist, parse_blacklist_from_file};
use crate::types::{BlacklistEntry, EntryKind};

/// Compiled blacklist: ordered address ranges plus field rules.
///
/// Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct RangeRegistry {
    ranges: Vec<AddressRange>,
    field_rules: FieldRegexRules,
}

impl RangeRegistry {
    /// Build a registry from blacklist text. Any malformed line fails the build.
    pub fn build(text: &str) -> Result<Self> {
        let entries = parse_blacklist(text)?;
        compile(&entries)
    }

    /// Build a registry from a function returning the blacklist text
    pub fn build_with<F>(load: F) -> Result<Self>
    where
        F: FnOnce() -> String,
    {
        Self::build(&load())
    }

    /// Build a registry from a blacklist file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let entries = parse_blacklist_from_file(path)?;
        compile(&entries)
    }

    /// Check if any range matches, in blacklist order
    pub fn matches_any_range(&self, address: &str) -> Result<bool> {
        Ok(self.matching_range(address)?.is_some())
    }

    /// The first range containing the address
    pub fn matching_range(&self, address: &str) -> Result<Option<&AddressRange>> {
        for range in &self.ranges {
            if range.matches(address)? {
                return Ok(Some(range));
            }
        }
        Ok(None)
    }

    pub fn field_rules(&self) -> &FieldRegexRules {
        &self.field_rules
    }

    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    /// Get the number of address ranges
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Get the number of field rules
    pub fn rule_count(&self) -> usize {
        self.field_rules.len()
    }
}

/// Compile parsed entries into a RangeRegistry
pub fn compile(entries: &[BlacklistEntry]) -> Result<RangeRegistry> {
    let mut ranges = Vec::with_capacity(entries.len());
    let mut field_rules = FieldRegexRules::new();

    for entry in entries {
        compile_entry(entry, &mut ranges, &mut field_rules).map_err(|e| match e {
            BlacklistError::ParseErrorAtLine { .. } => e,
            other => BlacklistError::ParseErrorAtLine {
                line: entry.line_num,
                message: other.to_string(),
            },
        })?;
    }

    tracing::debug!(
        ranges = ranges.len(),
        rules = field_rules.len(),
        "compiled blacklist"
    );

    Ok(RangeRegistry {
        ranges,
        field_rules,
    })
}

fn compile_entry(
    entry: &BlacklistEntry,
    ranges: &mut Vec<AddressRange>,
    field_rules: &mut FieldRegexRules,
) -> Result<()> {
    if let EntryKind::FieldRule { field, pattern } = &entry.kind {
        return field_rules.add_rule(field, pattern);
    }
    if let Some(range) = entry.to_range() {
        ranges.push(range?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisRecord;

    #[test]
    fn test_build_simple_registry() {
        let text = r#"
192.168.1.0/24
10.0.0.5-10.0.0.10
OwnerName:BadOrg.*
"#;
        let registry = RangeRegistry::build(text).unwrap();
        assert_eq!(registry.range_count(), 2);
        assert_eq!(registry.rule_count(), 1);
    }

    #[test]
    fn test_matches_any_range() {
        let registry =
            RangeRegistry::build("192.168.1.0/24\n10.0.0.5-10.0.0.10\n172.16.0-3.1-9\n1.1.1.1")
                .unwrap();

        assert!(registry.matches_any_range("192.168.1.5").unwrap());
        assert!(registry.matches_any_range("10.0.0.7").unwrap());
        assert!(registry.matches_any_range("172.16.2.9").unwrap());
        assert!(registry.matches_any_range("1.1.1.1").unwrap());
        assert!(!registry.matches_any_range("8.8.8.8").unwrap());
    }

    #[test]
    fn test_matching_range_is_first_in_order() {
        let registry = RangeRegistry::build("10.0.0.0/8\n10.1.0.0/16").unwrap();
        let range = registry.matching_range("10.1.2.3").unwrap().unwrap();
        assert_eq!(range.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_build_rejects_prefix_out_of_range() {
        let err = RangeRegistry::build("10.0.0.1/33").unwrap_err();
        assert!(matches!(err, BlacklistError::ParseErrorAtLine { line: 1, .. }));
    }

    #[test]
    fn test_build_rejects_unaligned_cidr() {
        let err = RangeRegistry::build("# header\n10.0.0.1/24").unwrap_err();
        match err {
            BlacklistError::ParseErrorAtLine { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("Invalid CIDR"), "got: {}", message);
            }
            other => panic!("expected ParseErrorAtLine, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_too_many_dash_segments() {
        assert!(RangeRegistry::build("a.b.c.d-e-f").is_err());
    }

    #[test]
    fn test_build_rejects_bad_rule() {
        assert!(RangeRegistry::build("OwnerName:(unclosed").is_err());
        assert!(RangeRegistry::build("Registrar:Foo").is_err());
    }

    #[test]
    fn test_one_bad_line_fails_whole_build() {
        let text = "10.0.0.0/8\n192.168.0.0/16\n300.0.0.0/8";
        assert!(RangeRegistry::build(text).is_err());
    }

    #[test]
    fn test_malformed_candidate_propagates() {
        let registry = RangeRegistry::build("10.0.0.0/8").unwrap();
        let err = registry.matches_any_range("10.0.0").unwrap_err();
        assert!(matches!(err, BlacklistError::InvalidIp(_)));
    }

    #[test]
    fn test_literal_with_dash_is_parsed_as_range() {
        let err = RangeRegistry::build("edge-gw\n10.0.0.0/8").unwrap_err();
        assert!(matches!(err, BlacklistError::ParseErrorAtLine { line: 1, .. }));
    }

    #[test]
    fn test_exact_entry_short_circuits() {
        let registry = RangeRegistry::build("gateway\n10.0.0.0/8").unwrap();
        assert!(registry.matches_any_range("gateway").unwrap());
        assert!(registry.matches_any_range("gw").is_err());
    }

    #[test]
    fn test_field_rules_exposed() {
        let registry = RangeRegistry::build("OwnerName:BadOrg.*").unwrap();
        let bad = AnalysisRecord::new().with_owner_name("BadOrg LLC");
        let good = AnalysisRecord::new().with_owner_name("GoodOrg");
        assert!(registry.field_rules().matches(&bad));
        assert!(!registry.field_rules().matches(&good));
    }

    #[test]
    fn test_empty_registry() {
        let registry = RangeRegistry::build("").unwrap();
        assert_eq!(registry.range_count(), 0);
        assert!(!registry.matches_any_range("1.2.3.4").unwrap());
    }

    #[test]
    fn test_build_with() {
        let registry = RangeRegistry::build_with(|| "10.0.0.0/8".to_string()).unwrap();
        assert_eq!(registry.range_count(), 1);
    }
}
