//! Per-unit scan driver.
//!
//! The handler walks the tree once in pre-order. At every site it first lets
//! the call-stack agent fire pending hooks, then evaluates every root rule.
//! Roots that end up with detections are emitted; roots with neither
//! detections nor pending hooks are discarded.

use crate::config::ScanConfig;
use crate::engine::{Context, DetectionEngine, ResolvedValue, TraceSymbol};
use crate::hooks::{CallStackAgent, HookEvent, HookKind, HookPayload, HookRepository, Observer};
use crate::lang::{support_for, LanguageSupport, Site};
use crate::reporting::StatusReporting;
use crate::rule::{DetectionRule, ValueFactory};
use crate::scanner::ScanOutcome;
use crate::store::{Finding, HookOrigin, StoreArena, StoreId};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, trace};
use tree_sitter::Node;

/// Mutable state shared by the handler and the engine during one scan.
pub struct ScanState<'a, 'r> {
    pub(crate) stores: StoreArena<'a>,
    pub(crate) hooks: HookRepository<'a>,
    pub(crate) call_stack: CallStackAgent,
    pub(crate) reporting: &'r mut dyn StatusReporting,
}

impl<'a, 'r> ScanState<'a, 'r> {
    pub fn new(reporting: &'r mut dyn StatusReporting) -> Self {
        Self {
            stores: StoreArena::new(),
            hooks: HookRepository::new(),
            call_stack: CallStackAgent::new(),
            reporting,
        }
    }

    pub fn stores(&self) -> &StoreArena<'a> {
        &self.stores
    }

    pub fn hooks(&self) -> &HookRepository<'a> {
        &self.hooks
    }
}

pub struct Handler<'e, 'a, 'r> {
    engine: DetectionEngine<'e, 'a>,
    rules: &'e [Arc<DetectionRule>],
    state: ScanState<'a, 'r>,
    queue: VecDeque<HookEvent<'a>>,
    emitted: Vec<StoreId>,
    findings: Vec<Finding>,
}

impl<'e, 'a, 'r> Handler<'e, 'a, 'r> {
    pub fn new(
        ctx: &'e Context<'a>,
        config: &'e ScanConfig,
        rules: &'e [Arc<DetectionRule>],
        reporting: &'r mut dyn StatusReporting,
    ) -> Self {
        let lang = support_for(ctx.language());
        Self {
            engine: DetectionEngine::new(ctx, lang, config),
            rules,
            state: ScanState::new(reporting),
            queue: VecDeque::new(),
            emitted: Vec::new(),
            findings: Vec::new(),
        }
    }

    pub fn scan(&mut self) {
        let ctx = self.engine.context();
        info!(file_path = ctx.file_path(), rules = self.rules.len(), "scanning unit");
        self.visit(ctx.root());
    }

    /// Final, deduplicated findings. Hooks still pending are dropped.
    pub fn finish(self) -> ScanOutcome {
        let ctx = self.engine.context();
        let mut findings: Vec<Finding> = Vec::new();
        for root in &self.emitted {
            let finding = Finding::project(&self.state.stores, *root, ctx.file_path());
            if !findings.contains(&finding) {
                findings.push(finding);
            }
        }

        let pending_hooks = self.state.hooks.pending();
        if pending_hooks > 0 {
            debug!(file_path = ctx.file_path(), pending_hooks, "dropping unresolved hooks");
        }
        info!(
            file_path = ctx.file_path(),
            findings = findings.len(),
            stores = self.state.stores.len(),
            "scan complete"
        );
        ScanOutcome {
            file_path: ctx.file_path().to_string(),
            findings,
            pending_hooks,
            stores: self.state.stores.len(),
        }
    }

    fn lang(&self) -> &'e dyn LanguageSupport {
        self.engine.language()
    }

    fn visit(&mut self, node: Node<'a>) {
        self.state.call_stack.advance();
        let ctx = self.engine.context();
        if let Some(site) = self.lang().site(node, ctx) {
            let events = self
                .state
                .call_stack
                .observe(&site, &self.state.hooks, self.lang().as_translation(), ctx);
            self.queue.extend(events);
            self.drain();

            let rules = self.rules;
            for rule in rules {
                self.visit_root(rule, node);
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'a>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn visit_root(&mut self, rule: &Arc<DetectionRule>, node: Node<'a>) {
        let mark = self.state.stores.len();
        let root = self.state.stores.create_root(rule.clone());
        self.state.reporting.add_expected_rule_visits(1);
        self.engine.run(&mut self.state, root, &TraceSymbol::start(), node);

        if self.state.stores.has_detections(root) {
            self.emit(root);
        } else if self.state.hooks.has_pending_for_root(root) {
            trace!(root = %root, "root waiting on hooks");
        } else {
            self.state.stores.truncate(mark);
        }
    }

    fn drain(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let Some(kind) = self.state.hooks.get(event.hook).map(|h| h.kind().clone()) else {
                continue;
            };
            let observer = self.state.hooks.observer(event.hook, event.observer).cloned();
            let Some(observer) = observer else {
                continue;
            };

            let satisfied = self.fire(&kind, &observer, &event.trigger);
            if satisfied && kind.is_one_shot() {
                self.state.hooks.remove_observer(event.hook, observer.id());
            }
            if !self.emitted.contains(&observer.root)
                && self.state.stores.has_detections(observer.root)
            {
                self.emit(observer.root);
            }
        }
    }

    /// Deliver one trigger to one observer. Returns whether the observer got
    /// what it waited for.
    fn fire(&mut self, kind: &HookKind<'a>, observer: &Observer, trigger: &Site<'a>) -> bool {
        trace!(hook = kind.label(), requester = %observer.requester, "delivering hook");
        match (kind, &observer.payload) {
            (HookKind::Parameter { index: position, .. }, HookPayload::Rules { index, rules }) => {
                let Some(argument) = self.lang().arguments(trigger).get(*position).copied() else {
                    return false;
                };
                let origin = HookOrigin {
                    trigger: trigger.node(),
                    hook_root: self.state.stores.hook_root(observer.requester),
                };
                self.engine.follow_depending(
                    &mut self.state,
                    observer.requester,
                    *index,
                    rules,
                    argument,
                    Some(origin),
                    observer.chain + 1,
                );
                true
            }
            (HookKind::Parameter { index: position, .. }, HookPayload::Value { .. }) => {
                let Some(argument) = self.lang().arguments(trigger).get(*position).copied() else {
                    return false;
                };
                self.deliver_value(observer, Some(argument), |engine, factory| {
                    engine.resolve_value(argument, factory, &observer.selections)
                })
            }
            (HookKind::Return { method, .. }, HookPayload::Value { .. }) => {
                let method = *method;
                self.deliver_value(observer, None, |engine, factory| {
                    engine.resolve_returns(method, trigger, factory, &observer.selections)
                })
            }
            (HookKind::Enum { .. }, HookPayload::Value { .. }) => {
                let selected = trigger.node();
                self.deliver_value(observer, None, |engine, factory| {
                    engine.resolve_value(selected, factory, &observer.selections)
                })
            }
            (_, HookPayload::Rules { .. }) => {
                debug!(hook = kind.label(), "rule payloads only wait on parameters");
                false
            }
        }
    }

    /// Resolve a value payload; when nothing comes out and `retry` names the
    /// argument, plan the next hop outward.
    fn deliver_value<F>(&mut self, observer: &Observer, retry: Option<Node<'a>>, resolve: F) -> bool
    where
        F: FnOnce(&DetectionEngine<'e, 'a>, &dyn ValueFactory) -> Vec<ResolvedValue<'a>>,
    {
        let HookPayload::Value {
            index,
            factory,
            move_under,
        } = &observer.payload
        else {
            return false;
        };

        let resolved = resolve(&self.engine, factory.as_ref());
        if !resolved.is_empty() {
            self.engine.store_values(
                &mut self.state,
                observer.requester,
                *index,
                *move_under,
                factory.as_ref(),
                resolved,
            );
            return true;
        }

        let Some(argument) = retry else {
            return false;
        };
        let chain = observer.chain + 1;
        if chain > self.engine.config().max_hook_chain {
            debug!(requester = %observer.requester, chain, "hook chain limit reached");
            return false;
        }
        let position = self.state.call_stack.position();
        for plan in self
            .engine
            .plan_hooks(argument, observer.selections.clone(), factory.is_size())
        {
            let successor = Observer::new(
                observer.requester,
                observer.root,
                observer.payload.clone(),
                position,
            )
            .with_chain(chain);
            self.engine.register_plan(&mut self.state, plan, successor);
        }
        false
    }

    fn emit(&mut self, root: StoreId) {
        if self.emitted.contains(&root) {
            return;
        }
        self.emitted.push(root);

        let ctx = self.engine.context();
        let finding = Finding::project(&self.state.stores, root, ctx.file_path());
        if self.findings.contains(&finding) {
            trace!(root = %root, "finding already reported");
            return;
        }
        debug!(
            file_path = ctx.file_path(),
            rule = %self.state.stores.get(root).rule().label(),
            root = %root,
            "finding"
        );
        self.findings.push(finding.clone());
        self.state.reporting.emit_finding(finding);
    }
}
