use swc_core::ecma::ast::*;

use crate::pragma::require_call_source;
use crate::walk::{walk_body, BodyVisitor, Slot, TopLevel};

fn is_has_module(path: &str) -> bool {
    path.ends_with("/has")
}

/// Finds the first top-level binding of a `*/has` module:
/// `var has = require('./has')`, or `import * as has from './has'`.
#[derive(Default)]
struct BindingFinder {
    found: Option<String>,
}

impl BindingFinder {
    fn from_var_decl(var: &VarDecl) -> Option<String> {
        var.decls.iter().find_map(|d| {
            let name = d.name.as_ident()?;
            let Expr::Call(call) = &**d.init.as_ref()? else {
                return None;
            };
            require_call_source(call)
                .filter(|src| is_has_module(src))
                .map(|_| name.id.sym.to_string())
        })
    }

    fn from_import(import: &ImportDecl) -> Option<String> {
        if import.type_only || !is_has_module(&import.src.value) {
            return None;
        }
        import.specifiers.iter().find_map(|s| match s {
            ImportSpecifier::Namespace(ns) => Some(ns.local.sym.to_string()),
            _ => None,
        })
    }
}

impl BodyVisitor for BindingFinder {
    fn enter(&mut self, item: TopLevel<'_>, _slot: Slot) {
        if self.found.is_some() {
            return;
        }
        self.found = match item {
            TopLevel::Stmt(Stmt::Decl(Decl::Var(var))) => Self::from_var_decl(var),
            TopLevel::ModuleDecl(ModuleDecl::Import(import)) => Self::from_import(import),
            _ => None,
        };
    }
}

/// Name of the local identifier the feature-test module is bound to, if the
/// program imports it at the top level.
pub(crate) fn resolve_has_binding(program: &Program) -> Option<String> {
    let mut finder = BindingFinder::default();
    walk_body(program, &mut finder);
    finder.found
}
