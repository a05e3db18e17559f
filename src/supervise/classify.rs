// src/supervise/classify.rs

//! Deciding whether a finished child crashed.
//!
//! Only stderr is consulted. Many runtimes and audio stacks print warnings
//! on every start, so the last non-blank line is checked against an
//! allow-list before it is reported as a crash.

use regex::RegexSet;

use crate::config::model::default_benign_stderr;
use crate::supervise::ExitOutcome;

/// Longest crash message shown to the user, in characters.
const MAX_MESSAGE_CHARS: usize = 120;

/// Compiled allow-list of harmless final stderr lines.
#[derive(Debug, Clone)]
pub struct BenignStderr {
    set: RegexSet,
}

impl BenignStderr {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// An allow-list that matches nothing.
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.set.is_match(line)
    }
}

impl Default for BenignStderr {
    fn default() -> Self {
        Self::new(&default_benign_stderr()).unwrap_or_else(|_| Self::empty())
    }
}

/// Last line of `stderr` that has any non-whitespace content.
pub fn last_meaningful_line(stderr: &str) -> Option<&str> {
    stderr.lines().rev().map(str::trim_end).find(|l| !l.trim().is_empty())
}

/// Classify a finished child by its captured stderr.
///
/// Only the last meaningful line is judged: a crash is that line not
/// matching `benign`. The number of lines does not matter, so a single
/// non-benign line is already a crash. Exit status is ignored.
pub fn classify_stderr(display_name: &str, stderr: &str, benign: &BenignStderr) -> ExitOutcome {
    let Some(last) = last_meaningful_line(stderr) else {
        return ExitOutcome::Clean;
    };
    if benign.matches(last) {
        return ExitOutcome::Clean;
    }
    ExitOutcome::Crashed(format!("{display_name} crashed: {}", truncate(last.trim())))
}

fn truncate(line: &str) -> String {
    if line.chars().count() <= MAX_MESSAGE_CHARS {
        return line.to_string();
    }
    let mut short: String = line.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    short.push_str("...");
    short
}
