//! Minimal reader for the `[section]` / `Key=Value` format used by EDS files.
//!
//! Keys are matched case-insensitively. Section names keep their spelling;
//! lookups on them are case-insensitive too.

use crate::error::{EdsError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    /// Value of a key, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: Vec<Section>,
}

impl IniFile {
    pub fn parse(text: &str) -> Result<Self> {
        let mut sections: Vec<Section> = Vec::new();
        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.push(Section {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(EdsError::MalformedLine {
                    line: n + 1,
                    text: line.to_string(),
                });
            };
            let section = sections
                .last_mut()
                .ok_or(EdsError::KeyOutsideSection { line: n + 1 })?;
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            // Later duplicates win.
            match section
                .entries
                .iter_mut()
                .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            {
                Some(slot) => slot.1 = value,
                None => section.entries.push((key, value)),
            }
        }
        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

/// Read an EDS number: decimal, `0x` hex, or `$NODEID+<n>` / `<n>+$NODEID`.
pub fn parse_number(value: &str, node_id: u8) -> Option<u64> {
    let value = value.trim();
    if value.to_ascii_uppercase().contains("$NODEID") {
        let mut total = 0u64;
        for term in value.split('+') {
            let term = term.trim();
            if term.eq_ignore_ascii_case("$NODEID") {
                total = total.checked_add(u64::from(node_id))?;
            } else {
                total = total.checked_add(parse_plain(term)?)?;
            }
        }
        return Some(total);
    }
    parse_plain(value)
}

fn parse_plain(value: &str) -> Option<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
