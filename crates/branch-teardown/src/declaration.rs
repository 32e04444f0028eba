//! Reading a pipeline's own tear-down job declaration.
//!
//! A pipeline opts into a specific tear-down job with
//! `properties([branchTearDownExecutor('<name>')])`. The host records the
//! property on the branch job after a run; before that, only the script text
//! carries it.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{BranchJob, JobProperty};

/// Source of a branch job's declared tear-down override.
pub trait DeclarationReader: Send + Sync {
    /// The job name declared by the branch's pipeline, if any.
    fn declared_tear_down_job(&self, job: &BranchJob) -> Option<String>;
}

/// Reads recorded job properties first, then the pipeline script.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyDeclarationReader;

impl PropertyDeclarationReader {
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationReader for PropertyDeclarationReader {
    fn declared_tear_down_job(&self, job: &BranchJob) -> Option<String> {
        let recorded = job.properties.iter().find_map(|p| match p {
            JobProperty::BranchTearDownExecutor { job_name } if !job_name.is_empty() => {
                Some(job_name.clone())
            }
            _ => None,
        });
        if recorded.is_some() {
            return recorded;
        }

        let declared = job
            .pipeline_script
            .as_deref()
            .and_then(parse_tear_down_declaration);
        if let Some(name) = &declared {
            debug!(job = %job.full_name(), tear_down_job = %name, "declaration read from pipeline script");
        }
        declared
    }
}

static PROPERTIES_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bproperties\s*\(").expect("Invalid regex pattern"));

static EXECUTOR_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bbranchTearDownExecutor\s*\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .expect("Invalid regex pattern")
});

/// Find `branchTearDownExecutor('<name>')` inside a `properties([...])` call.
///
/// Comments are skipped, and calls spelled out inside string literals do not
/// count. The first non-empty declaration wins.
pub fn parse_tear_down_declaration(script: &str) -> Option<String> {
    let lexed = Lexed::new(script);

    for call in PROPERTIES_CALL.find_iter(&lexed.code) {
        if lexed.in_literal(call.start()) {
            continue;
        }
        let Some(close) = lexed.closing_paren(call.end()) else {
            continue;
        };
        let args = &lexed.code[call.end()..close];
        for caps in EXECUTOR_CALL.captures_iter(args) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if lexed.in_literal(call.end() + whole.start()) {
                continue;
            }
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Script text with comments blanked out, plus the byte spans of its string
/// literals.
///
/// Blanking keeps byte offsets stable, so spans index into `code` directly.
struct Lexed {
    code: String,
    literals: Vec<Range<usize>>,
}

impl Lexed {
    fn new(script: &str) -> Self {
        let bytes = script.as_bytes();
        let mut code = bytes.to_vec();
        let mut literals = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let rest = &bytes[i..];
            if rest.starts_with(b"//") {
                let end = find_from(bytes, i + 2, b"\n").unwrap_or(bytes.len());
                code[i..end].fill(b' ');
                i = end;
            } else if rest.starts_with(b"/*") {
                let end = find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |e| e + 2);
                code[i..end].fill(b' ');
                i = end;
            } else if matches!(bytes[i], b'\'' | b'"') {
                let delim = if rest.starts_with(b"'''") || rest.starts_with(b"\"\"\"") {
                    &rest[..3]
                } else {
                    &rest[..1]
                };
                let end = literal_end(bytes, i + delim.len(), delim);
                literals.push(i..end);
                i = end;
            } else {
                i += 1;
            }
        }

        // Only whole comments were replaced, each with ASCII spaces.
        let code = String::from_utf8_lossy(&code).into_owned();
        Self { code, literals }
    }

    fn literal_at(&self, pos: usize) -> Option<&Range<usize>> {
        self.literals.iter().find(|r| r.contains(&pos))
    }

    fn in_literal(&self, pos: usize) -> bool {
        self.literal_at(pos).is_some()
    }

    /// Offset of the parenthesis closing a call opened just before `start`.
    fn closing_paren(&self, start: usize) -> Option<usize> {
        let bytes = self.code.as_bytes();
        let mut depth = 1usize;
        let mut i = start;
        while i < bytes.len() {
            if let Some(literal) = self.literal_at(i) {
                i = literal.end;
                continue;
            }
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// End of a string literal whose body starts at `from`. Unterminated
/// literals run to the end of the script.
fn literal_end(bytes: &[u8], from: usize, delim: &[u8]) -> usize {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i..].starts_with(delim) {
            return i + delim.len();
        }
        i += 1;
    }
    bytes.len()
}
