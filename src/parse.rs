use std::ops::Range;

use swc_core::{
    common::{sync::Lrc, BytePos, FileName, SourceMap, Span},
    ecma::{
        ast::{EsVersion, Program},
        parser::{parse_file_as_program, EsSyntax, Syntax},
    },
};
use tracing::warn;

use crate::error::{StaticHasError, StaticHasResult};

/// A parsed program together with the text it was parsed from.
///
/// `text()` is the caller's source exactly, including a leading byte order
/// mark that swc drops from its own copy. `range` and `line_col` turn spans
/// of `program` into byte offsets and line/columns of that text.
pub(crate) struct ParsedSource {
    source: String,
    file_name: String,
    offsets: SpanOffsets,
    /// Byte offset of every line start, `\n` separated.
    line_starts: Vec<usize>,
    pub program: Program,
}

impl ParsedSource {
    /// The text the spans refer to.
    pub fn text(&self) -> &str {
        &self.source
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn offsets(&self) -> SpanOffsets {
        self.offsets
    }

    /// Byte range of `span` inside `text()`.
    pub fn range(&self, span: Span) -> Range<usize> {
        self.offsets.range(span)
    }

    /// 0-indexed line and UTF-16 column of a byte offset in `text()`, the
    /// units source maps count in.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = self
            .source
            .get(start..offset)
            .map_or(0, |prefix| prefix.encode_utf16().count());
        (line as u32, col as u32)
    }
}

/// Converts spans of one file to byte ranges without holding on to the file.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpanOffsets {
    start: BytePos,
    /// Bytes in front of what swc parsed (a byte order mark).
    skipped: usize,
}

impl SpanOffsets {
    pub fn range(&self, span: Span) -> Range<usize> {
        let lo = (span.lo - self.start).0 as usize + self.skipped;
        let hi = (span.hi - self.start).0 as usize + self.skipped;
        lo..hi
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

pub(crate) fn parse_source(source: &str, file_name: &str, jsx: bool) -> StaticHasResult<ParsedSource> {
    let cm: Lrc<SourceMap> = Default::default();
    let file = cm.new_source_file(
        Lrc::new(FileName::Custom(file_name.to_string())),
        source.to_string(),
    );

    let mut recovered = vec![];
    let parsed = parse_file_as_program(
        &file,
        Syntax::Es(EsSyntax {
            jsx,
            ..Default::default()
        }),
        EsVersion::latest(),
        None,
        &mut recovered,
    );
    for err in &recovered {
        warn!(file = %file_name, error = %err.kind().msg(), "recovered from syntax error");
    }

    match parsed {
        Ok(program) => Ok(ParsedSource {
            source: source.to_string(),
            file_name: file_name.to_string(),
            offsets: SpanOffsets {
                start: file.start_pos,
                skipped: source.len().saturating_sub(file.src.len()),
            },
            line_starts: line_starts(source),
            program,
        }),
        Err(err) => {
            let loc = cm.lookup_char_pos(err.span().lo);
            Err(StaticHasError::parse_at(
                file_name,
                err.kind().msg(),
                loc.line,
                loc.col.0,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use swc_core::common::{Spanned, GLOBALS};

    use super::*;

    #[test]
    fn ranges_index_the_source_text() {
        GLOBALS.set(&Default::default(), || {
            let parsed = parse_source("var a = 1;\nfoo();\n", "a.js", false).unwrap();
            let Program::Script(script) = &parsed.program else {
                panic!("expected a script");
            };
            let range = parsed.range(script.body[1].span());
            assert_eq!(&parsed.text()[range.clone()], "foo();");
            assert_eq!(parsed.line_col(range.start), (1, 0));
        });
    }

    #[test]
    fn syntax_errors_are_fatal() {
        GLOBALS.set(&Default::default(), || {
            let err = parse_source("var = ;", "broken.js", false).err().unwrap();
            assert!(matches!(err, StaticHasError::Parse { ref file, line: 1, .. } if file == "broken.js"));
        });
    }

    #[test]
    fn columns_count_utf16_units() {
        GLOBALS.set(&Default::default(), || {
            let text = "a();\nvar s = \"\u{1F600}\"; f();\n";
            let parsed = parse_source(text, "a.js", false).unwrap();
            let f = text.find("f()").unwrap();
            assert_eq!(parsed.line_col(f), (1, 14));
            assert_eq!(parsed.line_col(0), (0, 0));
            assert_eq!(parsed.line_col(text.len()), (2, 0));
        });
    }

    #[test]
    fn byte_order_mark_is_kept() {
        GLOBALS.set(&Default::default(), || {
            let text = "\u{FEFF}a();\nfoo();\n";
            let parsed = parse_source(text, "a.js", false).unwrap();
            assert_eq!(parsed.text(), text);
            let Program::Script(script) = &parsed.program else {
                panic!("expected a script");
            };
            assert_eq!(&text[parsed.range(script.body[1].span())], "foo();");
            assert_eq!(&text[parsed.range(script.body[0].span())], "a();");
        });
    }

    #[test]
    fn imports_make_a_module() {
        GLOBALS.set(&Default::default(), || {
            let parsed = parse_source("import 'a';\n", "m.js", false).unwrap();
            assert!(matches!(parsed.program, Program::Module(_)));
        });
    }
}
