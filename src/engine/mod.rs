pub mod context;
pub mod lang_features;
pub mod node_types;
pub mod outer;
pub mod resolve;
pub mod trace;
pub mod value;

pub use context::Context;
pub use node_types::{Language, NodeCategory, NodeTypes};
pub use outer::HookPlan;
pub use trace::{TraceState, TraceSymbol};
pub use value::{Constant, ConstantKind, ResolvedValue};

use crate::config::ScanConfig;
use crate::handler::ScanState;
use crate::hooks::{HookKind, HookPayload, Observer};
use crate::lang::{ancestors, Expression, LanguageSupport, Site, Symbol, SymbolKind};
use crate::rule::{
    DetectionRule, EnumMatcher, Location, ParameterRole, ValueFactory, METHOD_LEVEL,
};
use crate::store::{Detection, HookOrigin, StoreId};
use std::sync::Arc;
use tracing::{debug, trace};
use tree_sitter::Node;

/// How a matched site relates to variables, for trace correlation.
struct Binding<'a> {
    /// Variable the call operates on (receiver) or, failing that, the one
    /// its result is assigned to.
    bound: Option<Symbol<'a>>,
    assigned: Option<Symbol<'a>>,
    /// Receiver is itself a call (`a().b()`).
    chained: bool,
}

/// Matches rules against sites and feeds the resulting detections into the
/// scan's store arena.
pub struct DetectionEngine<'e, 'a> {
    ctx: &'e Context<'a>,
    lang: &'e dyn LanguageSupport,
    config: &'e ScanConfig,
}

impl<'e, 'a> DetectionEngine<'e, 'a> {
    pub fn new(
        ctx: &'e Context<'a>,
        lang: &'e dyn LanguageSupport,
        config: &'e ScanConfig,
    ) -> Self {
        Self { ctx, lang, config }
    }

    pub fn context(&self) -> &'e Context<'a> {
        self.ctx
    }

    pub fn language(&self) -> &'e dyn LanguageSupport {
        self.lang
    }

    pub fn config(&self) -> &'e ScanConfig {
        self.config
    }

    /// Evaluate the store's rule against `node` only.
    pub fn run(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        trace: &TraceSymbol<'a>,
        node: Node<'a>,
    ) {
        state.reporting.increment_visited_rules();
        if let Some(site) = self.lang.site(node, self.ctx) {
            self.analyse_site(state, store, trace, site);
        }
    }

    /// Evaluate the store's rule against every site under `scope`. Every
    /// match after the first lands in a sibling store.
    pub fn run_in_scope(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        trace: &TraceSymbol<'a>,
        scope: Node<'a>,
    ) {
        state.reporting.increment_visited_rules();
        for site in self.lang.sites_in(scope, self.ctx) {
            self.analyse_site(state, store, trace, site);
        }
    }

    fn analyse_site(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        trace: &TraceSymbol<'a>,
        site: Site<'a>,
    ) {
        let rule = state.stores.get(store).rule().clone();
        let match_ctx = rule.match_context(self.config.match_subtypes);
        if !rule
            .matcher()
            .matches(&site, self.lang.as_translation(), self.ctx, &match_ctx)
        {
            return;
        }
        if state.stores.is_claimed_on_path(store, &rule, &site) {
            trace!(rule = %rule.label(), store = %store, "site already claimed on this path");
            return;
        }
        let level = state.stores.get(store).level();
        if level >= self.config.max_store_depth {
            debug!(rule = %rule.label(), level, "store depth limit reached");
            return;
        }

        let binding = self.binding(&site);
        if !trace.admits(binding.bound.as_ref(), binding.assigned.as_ref(), binding.chained) {
            trace!(rule = %rule.label(), state = ?trace.state(), "trace rejected site");
            return;
        }

        let target = state.stores.claim(store, site);
        if target != store {
            // Sibling store, analysed right here.
            state.reporting.add_expected_rule_visits(1);
            state.reporting.increment_visited_rules();
        }
        debug!(
            file_path = self.ctx.file_path(),
            rule = %rule.label(),
            store = %target,
            level,
            line = site.node().start_position().row + 1,
            "rule matched"
        );

        self.on_method_detection(state, target, &rule, site);
        if rule.is_method_only() {
            return;
        }

        let arguments = self.lang.arguments(&site);
        for (position, parameter) in rule.parameters().iter().enumerate() {
            let Some(argument) = arguments.get(position).copied() else {
                continue;
            };
            let index = position as i32;
            match parameter.role() {
                ParameterRole::TypeOnly => {}
                ParameterRole::Detectable(factory) => {
                    let move_under = parameter.move_under_index();
                    self.detect_value(state, target, index, move_under, factory, argument)
                }
                ParameterRole::Depending(rules) => {
                    self.follow_depending(state, target, index, rules, argument, None, 0)
                }
            }
        }
    }

    /// Record the action value and follow the rule's next rules through the
    /// enclosing method.
    fn on_method_detection(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        rule: &Arc<DetectionRule>,
        site: Site<'a>,
    ) {
        let action = rule.action_factory().and_then(|factory| {
            let name = self.lang.method_name(&site, self.ctx)?;
            let object_type = self.lang.invoked_object_type(&site, self.ctx);
            factory.create(&name, object_type.as_ref(), Location::of(&site.node()))
        });
        state.stores.receive(store, Detection::Method { site, action });

        if rule.next_rules().is_empty() {
            return;
        }
        let trace = self.next_trace(&site);
        if trace.is_different() {
            trace!(rule = %rule.label(), "result passed to another call; next rules not followed");
            return;
        }
        let scope = self.lang.enclosing_scope(site.node(), self.ctx);
        for next in rule.next_rules() {
            let child = state.stores.create_child(store, METHOD_LEVEL, next.clone(), None);
            state.reporting.add_expected_rule_visits(1);
            self.run_in_scope(state, child, &trace, scope);
        }
    }

    fn detect_value(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        index: i32,
        move_under: Option<i32>,
        factory: &Arc<dyn ValueFactory>,
        argument: Node<'a>,
    ) {
        let resolved = self.resolve_value(argument, factory.as_ref(), &[]);
        if !resolved.is_empty() {
            self.store_values(state, store, index, move_under, factory.as_ref(), resolved);
            return;
        }

        let plans = self.plan_hooks(argument, Vec::new(), factory.is_size());
        if plans.is_empty() {
            trace!(store = %store, index, "value not resolvable");
            return;
        }
        let root = state.stores.get(store).root();
        let position = state.call_stack.position();
        let payload = HookPayload::Value {
            index,
            factory: factory.clone(),
            move_under,
        };
        for plan in plans {
            let observer = Observer::new(store, root, payload.clone(), position);
            self.register_plan(state, plan, observer);
        }
    }

    pub(crate) fn store_values(
        &self,
        state: &mut ScanState<'a, '_>,
        store: StoreId,
        index: i32,
        move_under: Option<i32>,
        factory: &dyn ValueFactory,
        resolved: Vec<ResolvedValue<'a>>,
    ) {
        for resolved in resolved {
            match factory.create(&resolved.constant, Location::of(&resolved.node)) {
                Some(value) => {
                    let target = state.stores.receive(
                        store,
                        Detection::Value {
                            index,
                            move_under,
                            value,
                        },
                    );
                    if target != store {
                        // Move-under child, complete on creation.
                        state.reporting.add_expected_rule_visits(1);
                        state.reporting.increment_visited_rules();
                    }
                }
                None => trace!(constant = %resolved.constant, "factory rejected constant"),
            }
        }
    }

    /// Follow depending rules on an argument: directly when it is a call,
    /// through its variable's scope when it is a local or field, and through
    /// a parameter hook when it is a parameter.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn follow_depending(
        &self,
        state: &mut ScanState<'a, '_>,
        requester: StoreId,
        index: i32,
        rules: &[Arc<DetectionRule>],
        argument: Node<'a>,
        origin: Option<HookOrigin<'a>>,
        chain: usize,
    ) {
        let argument = self.unwrap(argument);
        match self.lang.expression(argument, self.ctx) {
            Expression::Call(_) => {
                for rule in rules {
                    let child = state.stores.create_child(requester, index, rule.clone(), origin);
                    state.reporting.add_expected_rule_visits(1);
                    self.run(state, child, &TraceSymbol::start(), argument);
                }
            }
            Expression::Variable(symbol) if symbol.kind() == SymbolKind::Parameter => {
                if chain >= self.config.max_hook_chain {
                    debug!(store = %requester, chain, "hook chain limit reached");
                    return;
                }
                let Some((method, position)) = self.lang.parameter_position(&symbol, self.ctx)
                else {
                    return;
                };
                let root = state.stores.get(requester).root();
                let payload = HookPayload::Rules {
                    index,
                    rules: rules.to_vec(),
                };
                let registered_at = state.call_stack.position();
                let observer =
                    Observer::new(requester, root, payload, registered_at).with_chain(chain);
                let plan = HookPlan::Parameter {
                    method,
                    index: position,
                    selections: Vec::new(),
                };
                self.register_plan(state, plan, observer);
            }
            Expression::Variable(symbol) => {
                let scope = self.lang.symbol_scope(&symbol, self.ctx);
                let trace = TraceSymbol::from_symbol(symbol);
                for rule in rules {
                    let child = state.stores.create_child(requester, index, rule.clone(), origin);
                    state.reporting.add_expected_rule_visits(1);
                    self.run_in_scope(state, child, &trace, scope);
                }
            }
            _ => trace!(store = %requester, index, "depending rules not followed"),
        }
    }

    /// Turn a plan into a registered hook. Returns whether a new observer was
    /// added.
    pub(crate) fn register_plan(
        &self,
        state: &mut ScanState<'a, '_>,
        plan: HookPlan<'a>,
        observer: Observer,
    ) -> bool {
        let (kind, selections) = match plan {
            HookPlan::Parameter {
                method,
                index,
                selections,
            } => {
                let Some(matcher) = self.lang.method_matcher(method, self.ctx) else {
                    return false;
                };
                (HookKind::Parameter { method, matcher, index }, selections)
            }
            HookPlan::Return { method, selections } => {
                let Some(matcher) = self.lang.method_matcher(method, self.ctx) else {
                    return false;
                };
                (HookKind::Return { method, matcher }, selections)
            }
            HookPlan::Enum {
                enum_name,
                selections,
            } => (
                HookKind::Enum {
                    matcher: EnumMatcher::new(enum_name),
                },
                selections,
            ),
        };
        state
            .hooks
            .register(kind, observer.with_selections(selections))
            .is_some()
    }

    fn binding(&self, site: &Site<'a>) -> Binding<'a> {
        let assigned = self.lang.assigned_symbol(site.node(), self.ctx);
        let receiver = self.lang.receiver(site).map(|r| self.unwrap(r));
        let receiver_expression = receiver.map(|r| self.lang.expression(r, self.ctx));
        let chained = matches!(receiver_expression, Some(Expression::Call(_)));
        let receiver_symbol = match receiver_expression {
            Some(Expression::Variable(symbol)) => Some(symbol),
            _ => None,
        };
        Binding {
            bound: receiver_symbol.or_else(|| assigned.clone()),
            assigned,
            chained,
        }
    }

    /// Trace handed to next rules of a matched site.
    fn next_trace(&self, site: &Site<'a>) -> TraceSymbol<'a> {
        if self.is_argument(site.node()) {
            return TraceSymbol::different();
        }
        let binding = self.binding(site);
        match binding.bound {
            Some(symbol) => TraceSymbol::from_symbol(symbol),
            None => TraceSymbol::no_symbol(),
        }
    }

    fn is_argument(&self, node: Node<'a>) -> bool {
        ancestors(node)
            .take(3)
            .filter_map(|candidate| self.lang.site(candidate, self.ctx))
            .any(|site| {
                self.lang
                    .arguments(&site)
                    .iter()
                    .any(|argument| self.unwrap(*argument).id() == node.id())
            })
    }

    /// Strip parentheses and casts.
    fn unwrap(&self, node: Node<'a>) -> Node<'a> {
        let mut current = node;
        for _ in 0..self.config.max_resolution_depth {
            match self.lang.expression(current, self.ctx) {
                Expression::Wrapped(inner) => current = inner,
                _ => break,
            }
        }
        current
    }
}
