//! Inner-scope value resolution.
//!
//! Walks from an argument expression back to the constants it can hold,
//! staying inside the compilation unit. Parameters of a method are only
//! resolvable when the method is entered through a concrete invocation, which
//! binds them to that invocation's arguments.

use super::{Constant, DetectionEngine, ResolvedValue};
use crate::lang::{Expression, Site, Symbol, SymbolKind};
use crate::rule::ValueFactory;
use tracing::{debug, trace};
use tree_sitter::Node;

/// Parameters bound to the arguments of the invocation that entered a method.
struct Bound<'b, 'a> {
    parameters: Vec<(Symbol<'a>, Node<'a>)>,
    outer: Option<&'b Bound<'b, 'a>>,
}

impl<'b, 'a> Bound<'b, 'a> {
    fn lookup(&self, symbol: &Symbol<'a>) -> Option<(Node<'a>, Option<&'b Bound<'b, 'a>>)> {
        self.parameters
            .iter()
            .find(|(parameter, _)| parameter == symbol)
            .map(|(_, argument)| (*argument, self.outer))
    }
}

/// Apply a member selection to a constant. Unknown selections fail.
fn select(value: Constant, selection: &str) -> Option<Constant> {
    let text = || match &value {
        Constant::Str(s) => s.clone(),
        other => other.to_string(),
    };
    match selection {
        "name" | "intern" | "value" => Some(value),
        "toString" | "str" => Some(Constant::Str(text())),
        "trim" | "strip" => Some(Constant::Str(text().trim().to_string())),
        "toUpperCase" | "upper" => Some(Constant::Str(text().to_uppercase())),
        "toLowerCase" | "lower" => Some(Constant::Str(text().to_lowercase())),
        _ => None,
    }
}

/// Selections are pushed outermost first, so they are applied last to first.
pub(crate) fn apply_selections(constant: Constant, selections: &[String]) -> Option<Constant> {
    selections
        .iter()
        .rev()
        .try_fold(constant, |value, selection| select(value, selection))
}

/// `keySize` or `getKeySize` against a constructor parameter named `keySize`.
fn accessor_matches(parameter: &str, selection: &str) -> bool {
    selection.eq_ignore_ascii_case(parameter)
        || selection
            .strip_prefix("get")
            .is_some_and(|rest| rest.eq_ignore_ascii_case(parameter))
}

impl<'e, 'a> DetectionEngine<'e, 'a> {
    /// Constants `node` can evaluate to, cast to what `factory` expects.
    /// Initializers come before reassignments.
    pub fn resolve_value(
        &self,
        node: Node<'a>,
        factory: &dyn ValueFactory,
        selections: &[String],
    ) -> Vec<ResolvedValue<'a>> {
        let mut selections = selections.to_vec();
        let mut out = Vec::new();
        self.resolve_into(node, factory, &mut selections, None, 0, &mut out);
        out
    }

    /// Values returned by `method` when entered through `trigger`.
    pub fn resolve_returns(
        &self,
        method: Node<'a>,
        trigger: &Site<'a>,
        factory: &dyn ValueFactory,
        selections: &[String],
    ) -> Vec<ResolvedValue<'a>> {
        let bound = self.bind(method, trigger, None);
        let mut out = Vec::new();
        for returned in self.lang.method_returns(method) {
            let mut selections = selections.to_vec();
            self.resolve_into(returned, factory, &mut selections, Some(&bound), 0, &mut out);
        }
        out
    }

    fn bind<'b>(
        &self,
        method: Node<'a>,
        site: &Site<'a>,
        outer: Option<&'b Bound<'b, 'a>>,
    ) -> Bound<'b, 'a> {
        let parameters = self
            .lang
            .method_parameters(method, self.ctx)
            .into_iter()
            .zip(self.lang.arguments(site))
            .collect();
        Bound { parameters, outer }
    }

    fn resolve_into(
        &self,
        node: Node<'a>,
        factory: &dyn ValueFactory,
        selections: &mut Vec<String>,
        bound: Option<&Bound<'_, 'a>>,
        depth: usize,
        out: &mut Vec<ResolvedValue<'a>>,
    ) {
        if depth > self.config.max_resolution_depth {
            debug!(depth, line = node.start_position().row + 1, "resolution depth limit reached");
            return;
        }
        if self.ctx.has_visited(&node) {
            trace!(line = node.start_position().row + 1, "resolution cycle");
            return;
        }
        self.ctx.mark_visited(&node);
        self.resolve_expression(node, factory, selections, bound, depth, out);
        self.ctx.unmark_visited(&node);
    }

    fn resolve_expression(
        &self,
        node: Node<'a>,
        factory: &dyn ValueFactory,
        selections: &mut Vec<String>,
        bound: Option<&Bound<'_, 'a>>,
        depth: usize,
        out: &mut Vec<ResolvedValue<'a>>,
    ) {
        match self.lang.expression(node, self.ctx) {
            Expression::Literal(constant) => {
                let fitted =
                    apply_selections(constant, selections).and_then(|c| c.cast(factory.expected()));
                match fitted {
                    Some(constant) => out.push(ResolvedValue::new(constant, node)),
                    None => trace!(?selections, "literal does not fit"),
                }
            }
            Expression::Wrapped(inner) => {
                self.resolve_into(inner, factory, selections, bound, depth + 1, out)
            }
            Expression::Variable(symbol) => {
                self.resolve_variable(&symbol, factory, selections, bound, depth, out)
            }
            Expression::Member { object, member } => {
                selections.push(member);
                self.resolve_into(object, factory, selections, bound, depth + 1, out);
            }
            Expression::EnumConstant { declaration, constant } => {
                self.resolve_enum_constant(
                    declaration,
                    constant,
                    factory,
                    selections,
                    bound,
                    depth,
                    out,
                )
            }
            Expression::Call(site @ Site::Construction(_)) => {
                // Wrapper constructions such as `new String(x)` pass their
                // single argument through.
                if let [argument] = self.lang.arguments(&site).as_slice() {
                    self.resolve_into(*argument, factory, selections, bound, depth + 1, out);
                }
            }
            Expression::Call(site @ Site::Invocation(_)) => {
                self.resolve_invocation(&site, factory, selections, bound, depth, out)
            }
            Expression::Call(Site::EnumSelection(_)) => {}
            Expression::ArrayCreation {
                dimensions,
                rank,
                elements,
            } => {
                if !factory.is_size() {
                    return;
                }
                match (dimensions.as_slice(), elements) {
                    ([dimension], _) if rank == 1 => {
                        let mut cleared = Vec::new();
                        self.resolve_into(*dimension, factory, &mut cleared, bound, depth + 1, out);
                    }
                    ([], Some(count)) => {
                        let size = Constant::Int(count as i64).cast(factory.expected());
                        if let Some(constant) = size {
                            out.push(ResolvedValue::new(constant, node));
                        }
                    }
                    _ => debug!(
                        rank,
                        line = node.start_position().row + 1,
                        "multi-dimensional array size not resolved"
                    ),
                }
            }
            Expression::Unknown => {}
        }
    }

    fn resolve_variable(
        &self,
        symbol: &Symbol<'a>,
        factory: &dyn ValueFactory,
        selections: &mut Vec<String>,
        bound: Option<&Bound<'_, 'a>>,
        depth: usize,
        out: &mut Vec<ResolvedValue<'a>>,
    ) {
        if let Some((argument, outer)) = bound.and_then(|b| b.lookup(symbol)) {
            self.resolve_into(argument, factory, selections, outer, depth + 1, out);
            return;
        }
        if symbol.kind() == SymbolKind::Parameter {
            return;
        }

        let sources = self
            .lang
            .initializer(symbol, self.ctx)
            .into_iter()
            .chain(self.lang.assignments(symbol, self.ctx));
        for source in sources {
            let mut selections = selections.clone();
            self.resolve_into(source, factory, &mut selections, bound, depth + 1, out);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_enum_constant(
        &self,
        declaration: Node<'a>,
        constant: Node<'a>,
        factory: &dyn ValueFactory,
        selections: &mut Vec<String>,
        bound: Option<&Bound<'_, 'a>>,
        depth: usize,
        out: &mut Vec<ResolvedValue<'a>>,
    ) {
        let name = self.lang.constant_name(constant, self.ctx);
        let selection = match selections.last() {
            None => {
                if let Some(value) = Constant::Str(name).cast(factory.expected()) {
                    out.push(ResolvedValue::new(value, constant));
                }
                return;
            }
            Some(selection) => selection.clone(),
        };

        if selection == "name" || selection == "toString" {
            selections.pop();
            if let Some(value) =
                apply_selections(Constant::Str(name), selections)
                    .and_then(|c| c.cast(factory.expected()))
            {
                out.push(ResolvedValue::new(value, constant));
            }
            return;
        }

        let arguments = self.lang.enum_constant_arguments(constant);
        let position = self
            .lang
            .enum_constructor_parameters(declaration, self.ctx)
            .iter()
            .filter(|parameters| parameters.len() == arguments.len())
            .find_map(|parameters| parameters.iter().position(|p| accessor_matches(p, &selection)));
        match position.and_then(|i| arguments.get(i).copied()) {
            Some(argument) => {
                selections.pop();
                self.resolve_into(argument, factory, selections, bound, depth + 1, out);
            }
            None => trace!(
                constant = %name,
                selection = %selection,
                "no constructor argument for selection"
            ),
        }
    }

    fn resolve_invocation(
        &self,
        site: &Site<'a>,
        factory: &dyn ValueFactory,
        selections: &mut Vec<String>,
        bound: Option<&Bound<'_, 'a>>,
        depth: usize,
        out: &mut Vec<ResolvedValue<'a>>,
    ) {
        let receiver = self.lang.receiver(site);
        let on_enum = receiver.is_some_and(|r| {
            matches!(
                self.lang.expression(self.unwrap(r), self.ctx),
                Expression::EnumConstant { .. }
            )
        });

        if !on_enum {
            if let Some(method) = self.lang.method_definition(site, self.ctx) {
                let inner = self.bind(method, site, bound);
                let before = out.len();
                for returned in self.lang.method_returns(method) {
                    let mut selections = selections.clone();
                    let scope = Some(&inner);
                    self.resolve_into(returned, factory, &mut selections, scope, depth + 1, out);
                }
                if out.len() > before {
                    return;
                }
            }
        }

        let (Some(receiver), Some(name)) = (receiver, self.lang.method_name(site, self.ctx)) else {
            return;
        };
        selections.push(name);
        self.resolve_into(receiver, factory, selections, bound, depth + 1, out);
    }
}
