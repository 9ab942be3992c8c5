use std::ops::Range;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::info;

use crate::error::{StaticHasError, StaticHasResult};

/// What a removed statement was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ElisionKind {
    Pragma { negate: bool, flag: String },
    Import { module: String },
}

/// A statement removed from the output and the comment left in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElisionRecord {
    #[serde(flatten)]
    pub kind: ElisionKind,
    /// Byte range of the statement in the original source.
    pub range: Range<usize>,
    pub comment: String,
}

/// Caller-owned collector for one run (or several files of one build).
#[derive(Debug, Default)]
pub struct Diagnostics {
    dynamic_flags: IndexSet<String>,
    elisions: Vec<ElisionRecord>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dynamic_flag(&mut self, flag: &str) {
        if !self.dynamic_flags.contains(flag) {
            self.dynamic_flags.insert(flag.to_string());
        }
    }

    pub fn record_elision(&mut self, record: ElisionRecord) {
        self.elisions.push(record);
    }

    /// Dynamic flags in the order they were first seen.
    pub fn dynamic_flags(&self) -> impl Iterator<Item = &str> {
        self.dynamic_flags.iter().map(String::as_str)
    }

    pub fn elisions(&self) -> &[ElisionRecord] {
        &self.elisions
    }

    /// The one-line notice for the dynamic flags, if there are any.
    pub fn notice(&self) -> Option<String> {
        if self.dynamic_flags.is_empty() {
            return None;
        }
        let flags: Vec<&str> = self.dynamic_flags().collect();
        Some(format!("Dynamic features: {}", flags.join(", ")))
    }

    /// Elision records as a JSON array.
    pub fn elision_report(&self) -> StaticHasResult<String> {
        serde_json::to_string(&self.elisions).map_err(StaticHasError::report)
    }

    /// Log the notice once and start over.
    pub fn flush(&mut self) -> Option<String> {
        let notice = self.notice();
        if let Some(ref line) = notice {
            info!("{}", line);
        }
        self.dynamic_flags.clear();
        self.elisions.clear();
        notice
    }
}
