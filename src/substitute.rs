use swc_core::ecma::ast::*;
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::emit::Edit;
use crate::features::FeatureTable;
use crate::parse::{ParsedSource, SpanOffsets};
use crate::walk::{walk_exprs, ExprVisitor, Flow};

/// The flag argument of `<binding>.default(<arg>)`, or `None` if `call` has
/// a different shape. The inner `Option` is `None` for non-literal arguments.
fn has_call_flag<'a>(call: &'a CallExpr, binding: &str) -> Option<Option<&'a str>> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = &**callee else {
        return None;
    };
    match (&*member.obj, &member.prop) {
        (Expr::Ident(obj), MemberProp::Ident(prop))
            if &*obj.sym == binding && &*prop.sym == "default" => {}
        _ => return None,
    }
    if call.args.len() != 1 {
        return None;
    }
    let arg = &call.args[0];
    Some(match (&arg.spread, &*arg.expr) {
        (None, Expr::Lit(Lit::Str(s))) => Some(&*s.value),
        _ => None,
    })
}

struct CallSiteSubstitutor<'a> {
    offsets: SpanOffsets,
    binding: &'a str,
    features: &'a FeatureTable,
    diagnostics: &'a mut Diagnostics,
    edits: Vec<Edit>,
}

impl ExprVisitor for CallSiteSubstitutor<'_> {
    fn enter(&mut self, expr: &mut Expr) -> Flow {
        let Expr::Call(call) = &*expr else {
            return Flow::Descend;
        };
        let Some(flag) = has_call_flag(call, self.binding) else {
            return Flow::Descend;
        };
        // matched calls are never re-examined, whatever the outcome
        let Some(flag) = flag else {
            return Flow::Skip;
        };
        let Some(value) = self.features.get(flag) else {
            self.diagnostics.add_dynamic_flag(flag);
            return Flow::Skip;
        };

        debug!(flag = %flag, value, "substituting has() call");
        let span = call.span;
        self.edits.push(Edit {
            range: self.offsets.range(span),
            replacement: value.to_string(),
        });
        *expr = Expr::Lit(Lit::Bool(Bool { span, value }));
        Flow::Skip
    }
}

/// Replace every resolvable `<binding>.default('flag')` call with a boolean
/// literal. Flags missing from `features` are left in place and reported.
pub(crate) fn substitute_has_calls(
    source: &mut ParsedSource,
    binding: &str,
    features: &FeatureTable,
    diagnostics: &mut Diagnostics,
) -> Vec<Edit> {
    let mut substitutor = CallSiteSubstitutor {
        offsets: source.offsets(),
        binding,
        features,
        diagnostics,
        edits: vec![],
    };
    walk_exprs(&mut source.program, &mut substitutor);
    substitutor.edits
}
