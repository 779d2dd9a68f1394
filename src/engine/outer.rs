//! Outer-scope planning.
//!
//! When an argument cannot be resolved inside the unit as it stands, work out
//! which later event could supply it: a call of the enclosing method, a call
//! of a method whose return feeds the argument, or the selection of an enum
//! constant.

use super::DetectionEngine;
use crate::lang::{Expression, Site, Symbol, SymbolKind};
use tracing::trace;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq)]
pub enum HookPlan<'a> {
    /// Wait for invocations of `method` and read argument `index`.
    Parameter {
        method: Node<'a>,
        index: usize,
        selections: Vec<String>,
    },
    /// Wait for invocations of `method` and evaluate its returns.
    Return { method: Node<'a>, selections: Vec<String> },
    /// Wait for a selection of a constant of `enum_name`.
    Enum { enum_name: String, selections: Vec<String> },
}

impl<'e, 'a> DetectionEngine<'e, 'a> {
    /// Hooks that could later resolve `node`. `size` allows looking through
    /// array dimensions.
    pub fn plan_hooks(
        &self,
        node: Node<'a>,
        selections: Vec<String>,
        size: bool,
    ) -> Vec<HookPlan<'a>> {
        let mut plans = Vec::new();
        self.plan_into(node, selections, size, 0, &mut plans);
        plans
    }

    fn plan_into(
        &self,
        node: Node<'a>,
        mut selections: Vec<String>,
        size: bool,
        depth: usize,
        plans: &mut Vec<HookPlan<'a>>,
    ) {
        if depth > self.config.max_resolution_depth || self.ctx.has_visited(&node) {
            return;
        }
        self.ctx.mark_visited(&node);

        match self.lang.expression(node, self.ctx) {
            Expression::Wrapped(inner) => self.plan_into(inner, selections, size, depth + 1, plans),
            Expression::Variable(symbol) => {
                self.plan_variable(&symbol, selections, size, depth, plans)
            }
            Expression::Member { object, member } => {
                selections.push(member);
                self.plan_into(object, selections, size, depth + 1, plans);
            }
            Expression::Call(site @ Site::Invocation(_)) => {
                self.plan_invocation(&site, selections, size, depth, plans)
            }
            Expression::Call(site @ Site::Construction(_)) => {
                if let [argument] = self.lang.arguments(&site).as_slice() {
                    self.plan_into(*argument, selections, size, depth + 1, plans);
                }
            }
            Expression::ArrayCreation { dimensions, rank, .. } if size && rank == 1 => {
                if let [dimension] = dimensions.as_slice() {
                    self.plan_into(*dimension, Vec::new(), size, depth + 1, plans);
                }
            }
            _ => trace!(line = node.start_position().row + 1, "nothing to wait for"),
        }

        self.ctx.unmark_visited(&node);
    }

    fn plan_variable(
        &self,
        symbol: &Symbol<'a>,
        selections: Vec<String>,
        size: bool,
        depth: usize,
        plans: &mut Vec<HookPlan<'a>>,
    ) {
        if let Some(enum_name) = self.enum_type_of(symbol) {
            plans.push(HookPlan::Enum { enum_name, selections });
            return;
        }
        match symbol.kind() {
            SymbolKind::Parameter => {
                if let Some((method, index)) = self.lang.parameter_position(symbol, self.ctx) {
                    plans.push(HookPlan::Parameter {
                        method,
                        index,
                        selections,
                    });
                }
            }
            SymbolKind::Local | SymbolKind::Field => {
                let sources = self
                    .lang
                    .initializer(symbol, self.ctx)
                    .into_iter()
                    .chain(self.lang.assignments(symbol, self.ctx));
                for source in sources {
                    self.plan_into(source, selections.clone(), size, depth + 1, plans);
                }
            }
            SymbolKind::EnumConstant => {}
        }
    }

    fn plan_invocation(
        &self,
        site: &Site<'a>,
        mut selections: Vec<String>,
        size: bool,
        depth: usize,
        plans: &mut Vec<HookPlan<'a>>,
    ) {
        let receiver = self.lang.receiver(site).map(|r| self.unwrap(r));
        let name = self.lang.method_name(site, self.ctx);

        // `algo.keySize()` on an enum-typed variable waits for the enum.
        if let (Some(receiver), Some(name)) = (receiver, name.clone()) {
            if let Expression::Variable(symbol) = self.lang.expression(receiver, self.ctx) {
                if let Some(enum_name) = self.enum_type_of(&symbol) {
                    selections.push(name);
                    plans.push(HookPlan::Enum { enum_name, selections });
                    return;
                }
            }
        }

        if let Some(method) = self.lang.method_definition(site, self.ctx) {
            plans.push(HookPlan::Return { method, selections });
            return;
        }

        if let (Some(receiver), Some(name)) = (receiver, name) {
            selections.push(name);
            self.plan_into(receiver, selections, size, depth + 1, plans);
        }
    }

    /// Name of the unit-local enum a variable is declared as.
    fn enum_type_of(&self, symbol: &Symbol<'a>) -> Option<String> {
        let declared = self.lang.declared_type(symbol, self.ctx)?;
        self.lang.enum_named(declared.name(), self.ctx)?;
        Some(declared.simple_name().to_string())
    }
}
