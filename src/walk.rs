//! Traversal helpers shared by the two passes.
//!
//! Top-level statements are walked as a sibling list so a visitor knows where
//! a statement sits and what follows it. Expressions are walked pre-order
//! through swc's `VisitMut`; the visitor sees each expression in its slot and
//! may overwrite it or stop the descent there.

use swc_core::ecma::{
    ast::*,
    visit::{VisitMut, VisitMutWith},
};

// -----------------------------------------------------------------------------
// Top-level statements
// -----------------------------------------------------------------------------

/// One entry of a program body. Scripts only hold statements, modules may
/// also hold import/export declarations.
#[derive(Clone, Copy)]
pub(crate) enum TopLevel<'a> {
    Stmt(&'a Stmt),
    ModuleDecl(&'a ModuleDecl),
}

/// Where an item sits inside its parent's body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Slot {
    pub index: usize,
    pub len: usize,
}

impl Slot {
    pub fn next(&self) -> Option<usize> {
        (self.index + 1 < self.len).then_some(self.index + 1)
    }
}

pub(crate) trait BodyVisitor {
    fn enter(&mut self, item: TopLevel<'_>, slot: Slot);
}

pub(crate) fn walk_body<V: BodyVisitor>(program: &Program, visitor: &mut V) {
    match program {
        Program::Script(script) => {
            let len = script.body.len();
            for (index, stmt) in script.body.iter().enumerate() {
                visitor.enter(TopLevel::Stmt(stmt), Slot { index, len });
            }
        }
        Program::Module(module) => {
            let len = module.body.len();
            for (index, item) in module.body.iter().enumerate() {
                let item = match item {
                    ModuleItem::Stmt(stmt) => TopLevel::Stmt(stmt),
                    ModuleItem::ModuleDecl(decl) => TopLevel::ModuleDecl(decl),
                };
                visitor.enter(item, Slot { index, len });
            }
        }
    }
}

/// Splice out top-level items. Indices are applied highest first so the ones
/// still pending keep pointing at the same items.
pub(crate) fn remove_items(program: &mut Program, indices: impl IntoIterator<Item = usize>) {
    let mut indices: Vec<usize> = indices.into_iter().collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));
    indices.dedup();
    match program {
        Program::Script(script) => {
            for index in indices {
                if index < script.body.len() {
                    script.body.remove(index);
                }
            }
        }
        Program::Module(module) => {
            for index in indices {
                if index < module.body.len() {
                    module.body.remove(index);
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Descend,
    Skip,
}

pub(crate) trait ExprVisitor {
    fn enter(&mut self, expr: &mut Expr) -> Flow;
}

struct ExprWalker<'a, V> {
    visitor: &'a mut V,
}

impl<V: ExprVisitor> VisitMut for ExprWalker<'_, V> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.visitor.enter(expr) == Flow::Descend {
            expr.visit_mut_children_with(self);
        }
    }
}

pub(crate) fn walk_exprs<V: ExprVisitor>(program: &mut Program, visitor: &mut V) {
    program.visit_mut_with(&mut ExprWalker { visitor });
}
