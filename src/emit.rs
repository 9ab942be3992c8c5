//! Regenerates source text from the original text and the recorded edits.
//!
//! Every structural change made to the tree is journaled as an [`Edit`] on
//! the byte range the changed node occupied. Untouched code is copied through
//! verbatim, so its formatting and comments survive exactly.

use std::ops::Range;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sourcemap::{SourceMap, SourceMapBuilder};

use crate::error::{StaticHasError, StaticHasResult};
use crate::parse::ParsedSource;

/// Replace `range` of the original text with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

pub(crate) struct Printed {
    pub code: String,
    pub map: Option<String>,
}

/// One generated position and the input position it came from, 0-indexed,
/// columns in UTF-16 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    dst_line: u32,
    dst_col: u32,
    src_line: u32,
    src_col: u32,
}

struct Writer<'a> {
    source: &'a ParsedSource,
    code: String,
    line: u32,
    col: u32,
    mappings: Option<Vec<Mapping>>,
}

impl Writer<'_> {
    fn mark(&mut self, origin: usize) {
        if let Some(ref mut mappings) = self.mappings {
            let (src_line, src_col) = self.source.line_col(origin);
            mappings.push(Mapping {
                dst_line: self.line,
                dst_col: self.col,
                src_line,
                src_col,
            });
        }
    }

    fn push(&mut self, ch: char) {
        self.code.push(ch);
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += ch.len_utf16() as u32;
        }
    }

    /// Copy original text, with a mapping at the start and at every new line.
    fn copy(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let source = self.source;
        self.mark(range.start);
        for (i, ch) in source.text()[range.clone()].char_indices() {
            self.push(ch);
            let next = range.start + i + ch.len_utf8();
            if ch == '\n' && next < range.end {
                self.mark(next);
            }
        }
    }

    /// Write replacement text mapped to the start of what it replaces.
    fn insert(&mut self, text: &str, origin: usize) {
        self.mark(origin);
        for ch in text.chars() {
            self.push(ch);
        }
    }
}

/// Apply `edits` to the source text. With a prior map, also produce a map
/// from the new text through the prior map to the original sources.
pub(crate) fn emit(
    source: &ParsedSource,
    mut edits: Vec<Edit>,
    prior_map: Option<&SourceMap>,
    inline_source_map: bool,
) -> StaticHasResult<Printed> {
    let text = source.text();
    edits.sort_by_key(|edit| edit.range.start);

    let mut writer = Writer {
        source,
        code: String::with_capacity(text.len()),
        line: 0,
        col: 0,
        mappings: prior_map.map(|_| vec![]),
    };

    let mut cursor = 0;
    for edit in &edits {
        let Range { start, end } = edit.range;
        if start < cursor || start > end || end > text.len() {
            return Err(StaticHasError::emit(format!(
                "edit {start}..{end} overlaps another edit or leaves the source ({} bytes)",
                text.len()
            )));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(StaticHasError::emit(format!(
                "edit {start}..{end} does not fall on character boundaries"
            )));
        }
        writer.copy(cursor..start);
        writer.insert(&edit.replacement, start);
        cursor = end;
    }
    writer.copy(cursor..text.len());

    let Writer { mut code, mappings, .. } = writer;
    let map = match (prior_map, mappings) {
        (Some(prior), Some(mappings)) => {
            Some(compose(&mappings, prior, source.file_name())?)
        }
        _ => None,
    };

    if let (true, Some(map)) = (inline_source_map, map.as_ref()) {
        if !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("//# sourceMappingURL=data:application/json;charset=utf-8;base64,");
        code.push_str(&STANDARD.encode(map));
        code.push('\n');
    }

    Ok(Printed { code, map })
}

/// Route each generated position through `prior` to the original sources.
/// Positions the prior map does not cover on the same line are dropped.
fn compose(mappings: &[Mapping], prior: &SourceMap, file_name: &str) -> StaticHasResult<String> {
    let file = prior.get_file().unwrap_or(file_name);
    let mut builder = SourceMapBuilder::new(Some(file));

    for m in mappings {
        let Some(token) = prior.lookup_token(m.src_line, m.src_col) else {
            continue;
        };
        if token.get_dst_line() != m.src_line {
            continue;
        }
        let src_col = token.get_src_col() + m.src_col.saturating_sub(token.get_dst_col());
        builder.add(
            m.dst_line,
            m.dst_col,
            token.get_src_line(),
            src_col,
            token.get_source(),
            token.get_name(),
            false,
        );
    }

    for idx in 0..prior.get_source_count() {
        if let Some(src) = prior.get_source(idx) {
            let id = builder.add_source(src);
            builder.set_source_contents(id, prior.get_source_contents(idx));
        }
    }

    let mut buf = vec![];
    builder.into_sourcemap().to_writer(&mut buf)?;
    String::from_utf8(buf).map_err(|e| StaticHasError::emit(e.to_string()))
}
