use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use swc_core::{
    common::Spanned,
    ecma::ast::*,
};
use tracing::debug;

use crate::diagnostics::{ElisionKind, ElisionRecord};
use crate::emit::Edit;
use crate::features::FeatureTable;
use crate::parse::ParsedSource;
use crate::walk::{walk_body, BodyVisitor, Slot, TopLevel};

fn has_pragma() -> &'static Regex {
    static HAS_PRAGMA: OnceLock<Regex> = OnceLock::new();
    HAS_PRAGMA.get_or_init(|| {
        Regex::new(r#"^\s*(!?)\s*has\s*\(["']([^"']+)["']\)\s*$"#)
            .expect("pragma pattern is valid")
    })
}

// -----------------------------------------------------------------------------
// Pragma grammar
// -----------------------------------------------------------------------------

/// A `has('flag')` / `!has('flag')` pragma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaMatch {
    pub negate: bool,
    pub flag: String,
}

impl PragmaMatch {
    /// Match the whole content of a string literal against the pragma grammar.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = has_pragma().captures(text)?;
        Some(Self {
            negate: caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
            flag: caps.get(2)?.as_str().to_string(),
        })
    }

    /// Whether the import that follows should go, or `None` for an unknown flag.
    pub fn elides_next_import(&self, features: &FeatureTable) -> Option<bool> {
        features
            .get(&self.flag)
            .map(|value| if self.negate { !value } else { value })
    }

    pub fn comment_text(&self) -> String {
        format!("{}has('{}')", if self.negate { "!" } else { "" }, self.flag)
    }
}

// -----------------------------------------------------------------------------
// Statement shapes
// -----------------------------------------------------------------------------

fn pragma_of(stmt: &Stmt) -> Option<PragmaMatch> {
    let Stmt::Expr(ExprStmt { expr, .. }) = stmt else {
        return None;
    };
    match &**expr {
        Expr::Lit(Lit::Str(s)) => PragmaMatch::parse(&s.value),
        _ => None,
    }
}

/// `require('<module>');` on its own.
fn required_module(stmt: &Stmt) -> Option<&str> {
    let Stmt::Expr(ExprStmt { expr, .. }) = stmt else {
        return None;
    };
    let Expr::Call(call) = &**expr else {
        return None;
    };
    require_call_source(call)
}

/// The module of a `require('<module>')` call with exactly one string argument.
pub(crate) fn require_call_source(call: &CallExpr) -> Option<&str> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    match &**callee {
        Expr::Ident(id) if &*id.sym == "require" => {}
        _ => return None,
    }
    if call.args.len() != 1 || call.args[0].spread.is_some() {
        return None;
    }
    match &*call.args[0].expr {
        Expr::Lit(Lit::Str(s)) => Some(&*s.value),
        _ => None,
    }
}

/// `import '<module>';` with no bindings.
fn side_effect_import(decl: &ModuleDecl) -> Option<&str> {
    match decl {
        ModuleDecl::Import(import) if import.specifiers.is_empty() && !import.type_only => {
            Some(&*import.src.value)
        }
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Scanner
// -----------------------------------------------------------------------------

/// A top-level statement to remove and the comment standing in for it.
#[derive(Debug, Clone)]
pub(crate) struct Elision {
    pub index: usize,
    pub record: ElisionRecord,
    pub edit: Edit,
}

struct PragmaScanner<'a> {
    source: &'a ParsedSource,
    features: &'a FeatureTable,
    elide_next_import: bool,
    elisions: Vec<Elision>,
}

impl PragmaScanner<'_> {
    fn push(&mut self, kind: ElisionKind, comment: String, range: Range<usize>, slot: Slot) {
        let replacement = render_comment(self.source.text(), &range, &comment);
        debug!(
            index = slot.index,
            next = ?slot.next(),
            comment = %comment,
            "eliding statement"
        );
        self.elisions.push(Elision {
            index: slot.index,
            edit: Edit {
                range: range.clone(),
                replacement,
            },
            record: ElisionRecord {
                kind,
                range,
                comment,
            },
        });
    }
}

impl BodyVisitor for PragmaScanner<'_> {
    fn enter(&mut self, item: TopLevel<'_>, slot: Slot) {
        // Only the statement right after a pragma may consume it.
        let pending = std::mem::take(&mut self.elide_next_import);

        let (span, module) = match item {
            TopLevel::Stmt(stmt) => {
                if let Some(pragma) = pragma_of(stmt) {
                    self.elide_next_import = pragma.elides_next_import(self.features).unwrap_or(false);
                    let range = self.source.range(stmt.span());
                    let comment = pragma.comment_text();
                    let PragmaMatch { negate, flag } = pragma;
                    self.push(ElisionKind::Pragma { negate, flag }, comment, range, slot);
                    return;
                }
                (stmt.span(), required_module(stmt))
            }
            TopLevel::ModuleDecl(decl) => (decl.span(), side_effect_import(decl)),
        };

        if let (true, Some(module)) = (pending, module) {
            let range = self.source.range(span);
            let comment = format!("elided: import '{}'", module);
            let kind = ElisionKind::Import {
                module: module.to_string(),
            };
            self.push(kind, comment, range, slot);
        }
    }
}

/// Find every top-level pragma and the imports they elide, in source order.
pub(crate) fn scan_pragmas(source: &ParsedSource, features: &FeatureTable) -> Vec<Elision> {
    let mut scanner = PragmaScanner {
        source,
        features,
        elide_next_import: false,
        elisions: vec![],
    };
    walk_body(&source.program, &mut scanner);
    scanner.elisions
}

/// A line comment when nothing else follows on the statement's line, a block
/// comment otherwise.
fn render_comment(text: &str, range: &Range<usize>, comment: &str) -> String {
    let rest_of_line = text[range.end..].split('\n').next().unwrap_or("");
    let single_line = !comment.contains(['\n', '\r', '\u{2028}', '\u{2029}']);
    if single_line && rest_of_line.trim().is_empty() {
        format!("// {}", comment)
    } else {
        format!("/* {} */", comment.replace("*/", "* /"))
    }
}
