//! `Company_Names:` tag extraction.
//!
//! A tag line looks like `Company_Names: Tenable,Tenable.com,Tenablelabs`
//! and may appear anywhere in a document. Tag lines are removed from the
//! body that gets chunked and indexed.

use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::resolver::normalize;

const TAG_LINE_PATTERN: &str = r"(?i)^\s*company_names\s*:(.*)$";

/// One `Company_Names:` line. The first alias is the proposed primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDeclaration {
    /// 1-based line number in the source text.
    pub line: usize,
    pub aliases: Vec<String>,
}

/// A tag line that could not be used. The line is still stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParseWarning {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedDocument {
    pub body: String,
    pub declarations: Vec<TagDeclaration>,
    pub warnings: Vec<TagParseWarning>,
}

impl TaggedDocument {
    pub fn is_tagged(&self) -> bool {
        !self.declarations.is_empty()
    }
}

pub struct TagParser {
    tag_line: Regex,
}

impl TagParser {
    pub fn new() -> Result<Self> {
        let tag_line = Regex::new(TAG_LINE_PATTERN)
            .map_err(|e| Error::Operation(format!("failed to compile tag line regex: {e}")))?;
        Ok(Self { tag_line })
    }

    /// Splits `text` into its tag declarations and the remaining body.
    ///
    /// A document without tag lines yields no declarations and the body
    /// unchanged.
    pub fn parse(&self, text: &str) -> TaggedDocument {
        let mut body_lines = Vec::new();
        let mut declarations = Vec::new();
        let mut warnings = Vec::new();

        for (idx, line) in text.split('\n').enumerate() {
            let line_no = idx + 1;
            let Some(caps) = self.tag_line.captures(line.trim_end_matches('\r')) else {
                body_lines.push(line);
                continue;
            };
            let list = caps.get(1).map_or("", |m| m.as_str());
            let aliases = split_aliases(list);
            if aliases.is_empty() {
                warn!(line = line_no, "skipping Company_Names line without aliases");
                warnings.push(TagParseWarning {
                    line: line_no,
                    message: "Company_Names line has no aliases".to_string(),
                });
                continue;
            }
            declarations.push(TagDeclaration { line: line_no, aliases });
        }

        TaggedDocument { body: body_lines.join("\n"), declarations, warnings }
    }
}

/// Comma-separated list → trimmed, non-empty aliases, deduplicated
/// case-insensitively with the first spelling kept.
fn split_aliases(list: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let mut aliases = Vec::new();
    for alias in list.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let key = normalize(alias);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        aliases.push(alias.to_string());
    }
    aliases
}
