//! Directive parsing
//!
//! Migration scripts can carry behavior overrides as SQL comments of the
//! form `-- @stele key = value`. Directive names are case-insensitive;
//! values are trimmed. The raw strings are resolved into a typed
//! [`DirectiveSet`] once, at parse time: `skip` is truthy only for a
//! case-insensitive `true`, `audit` is falsy only for a case-insensitive
//! `false`. Later occurrences of a directive override earlier ones.

use std::sync::OnceLock;

use regex::Regex;

/// Directive names this driver understands.
pub const SUPPORTED_DIRECTIVES: [&str; 3] = ["audit", "comment", "skip"];

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?mi)^\s*--\s*@stele\s+(\w+)\s*=\s*(\S.*?)\s*$")
            .expect("directive pattern is valid")
    })
}

/// Typed directive set extracted from one migration script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSet {
    /// Do not execute the script at all.
    pub skip: bool,
    /// Record an audit row after a successful run.
    pub audit: bool,
    /// Overrides the migration's displayed comment in the audit row.
    pub comment: Option<String>,
    /// Directive names that were present but are not understood.
    pub unsupported: Vec<String>,
    present: bool,
}

impl Default for DirectiveSet {
    fn default() -> Self {
        Self {
            skip: false,
            audit: true,
            comment: None,
            unsupported: Vec::new(),
            present: false,
        }
    }
}

impl DirectiveSet {
    /// Scan a script for directive comments.
    pub fn parse(script: &str) -> Self {
        let mut directives = Self::default();
        for capture in directive_pattern().captures_iter(script) {
            let name = capture[1].to_ascii_lowercase();
            let value = capture[2].trim();
            directives.present = true;
            match name.as_str() {
                "skip" => directives.skip = value.eq_ignore_ascii_case("true"),
                "audit" => directives.audit = !value.eq_ignore_ascii_case("false"),
                "comment" => directives.comment = Some(value.to_string()),
                _ => {
                    if !directives.unsupported.contains(&name) {
                        directives.unsupported.push(name);
                    }
                }
            }
        }
        directives
    }

    /// True when the script contained no directive comments of any kind.
    pub fn is_empty(&self) -> bool {
        !self.present
    }
}
