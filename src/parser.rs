use std::fs;
use std::path::Path;

use crate::error::{BlacklistError, Result};
use crate::types::{BlacklistEntry, EntryKind};

/// Parse blacklist text into classified entries.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
/// Classification order: `/` → CIDR, `-` → dash-range, no `:` → exact
/// literal, otherwise `fieldName:pattern` split on the first `:`.
pub fn parse_blacklist(text: &str) -> Result<Vec<BlacklistEntry>> {
    let mut entries = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1; // 1-based line numbers
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let kind = classify_line(line, line_num)?;
        entries.push(BlacklistEntry { kind, line_num });
    }

    Ok(entries)
}

/// Parse blacklist entries from a file.
pub fn parse_blacklist_from_file(path: impl AsRef<Path>) -> Result<Vec<BlacklistEntry>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        BlacklistError::ParseError(format!(
            "Failed to read blacklist file '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_blacklist(&text)
}

fn classify_line(line: &str, line_num: usize) -> Result<EntryKind> {
    if line.contains('/') {
        return Ok(EntryKind::Cidr(line.to_string()));
    }
    if line.contains('-') {
        return Ok(EntryKind::DashRange(line.to_string()));
    }

    let Some((field, pattern)) = line.split_once(':') else {
        return Ok(EntryKind::Exact(line.to_string()));
    };

    let field = field.trim();
    if field.is_empty() {
        return Err(BlacklistError::ParseErrorAtLine {
            line: line_num,
            message: format!("Missing field name: {}", line),
        });
    }
    if pattern.is_empty() {
        return Err(BlacklistError::ParseErrorAtLine {
            line: line_num,
            message: format!("Empty pattern for field {}", field),
        });
    }

    Ok(EntryKind::FieldRule {
        field: field.to_string(),
        pattern: pattern.to_string(),
    })
}
