//! Deferred resolution requests.
//!
//! A hook names a target (a method's parameter, a method's return value, or
//! the selection of an enum) and carries the observers waiting for it. The
//! call-stack agent turns matching sites into [`HookEvent`]s which the handler
//! drains in traversal order.

pub mod callstack;

pub use callstack::{CallStackAgent, HookEvent};

use crate::rule::{DetectionRule, EnumMatcher, MethodMatcher, ValueFactory};
use crate::store::StoreId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use tree_sitter::Node;

#[derive(Debug, Clone)]
pub enum HookKind<'a> {
    /// Fires on invocations of `method`; the argument at `index` is read.
    Parameter {
        method: Node<'a>,
        matcher: MethodMatcher,
        index: usize,
    },
    /// Fires on invocations of `method`; its returns are evaluated with the
    /// invocation's arguments bound.
    Return {
        method: Node<'a>,
        matcher: MethodMatcher,
    },
    /// Fires on selections of a constant of the enum.
    Enum { matcher: EnumMatcher },
}

impl HookKind<'_> {
    fn same_target(&self, other: &HookKind<'_>) -> bool {
        match (self, other) {
            (
                Self::Parameter { method, index, .. },
                HookKind::Parameter {
                    method: other_method,
                    index: other_index,
                    ..
                },
            ) => method.id() == other_method.id() && index == other_index,
            (Self::Return { method, .. }, HookKind::Return { method: other_method, .. }) => {
                method.id() == other_method.id()
            }
            (Self::Enum { matcher }, HookKind::Enum { matcher: other_matcher }) => {
                matcher == other_matcher
            }
            _ => false,
        }
    }

    /// Parameter hooks keep their observers for the whole scan; the others
    /// are satisfied once.
    pub fn is_one_shot(&self) -> bool {
        !matches!(self, Self::Parameter { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "parameter",
            Self::Return { .. } => "return",
            Self::Enum { .. } => "enum",
        }
    }
}

/// What the requester wants done with the resolved argument.
#[derive(Clone)]
pub enum HookPayload {
    Value {
        index: i32,
        factory: Arc<dyn ValueFactory>,
        move_under: Option<i32>,
    },
    Rules {
        index: i32,
        rules: Vec<Arc<DetectionRule>>,
    },
}

impl HookPayload {
    fn same_as(&self, other: &HookPayload) -> bool {
        match (self, other) {
            (
                Self::Value { index, factory, .. },
                Self::Value {
                    index: other_index,
                    factory: other_factory,
                    ..
                },
            ) => index == other_index && Arc::ptr_eq(factory, other_factory),
            (
                Self::Rules { index, rules },
                Self::Rules {
                    index: other_index,
                    rules: other_rules,
                },
            ) => {
                index == other_index
                    && rules.len() == other_rules.len()
                    && rules.iter().zip(other_rules).all(|(a, b)| Arc::ptr_eq(a, b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for HookPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { index, factory, move_under } => f
                .debug_struct("Value")
                .field("index", index)
                .field("factory", factory)
                .field("move_under", move_under)
                .finish(),
            Self::Rules { index, rules } => f
                .debug_struct("Rules")
                .field("index", index)
                .field("rules", &rules.iter().map(|r| r.label()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

#[derive(Debug, Clone)]
pub struct Observer {
    id: ObserverId,
    pub requester: StoreId,
    pub root: StoreId,
    pub payload: HookPayload,
    /// Member selections to replay on the resolved expression.
    pub selections: Vec<String>,
    /// Number of hooks this request already went through.
    pub chain: usize,
    /// Traversal position at registration; only later sites fire it.
    pub registered_at: usize,
}

impl Observer {
    pub fn new(
        requester: StoreId,
        root: StoreId,
        payload: HookPayload,
        registered_at: usize,
    ) -> Self {
        Self {
            id: ObserverId(0),
            requester,
            root,
            payload,
            selections: Vec::new(),
            chain: 0,
            registered_at,
        }
    }

    pub fn with_selections(mut self, selections: Vec<String>) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_chain(mut self, chain: usize) -> Self {
        self.chain = chain;
        self
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    fn same_request(&self, other: &Observer) -> bool {
        self.requester == other.requester
            && self.selections == other.selections
            && self.payload.same_as(&other.payload)
    }
}

#[derive(Debug)]
pub struct Hook<'a> {
    kind: HookKind<'a>,
    observers: Vec<Observer>,
}

impl<'a> Hook<'a> {
    pub fn kind(&self) -> &HookKind<'a> {
        &self.kind
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }
}

/// Per-scan registry of pending hooks.
#[derive(Debug, Default)]
pub struct HookRepository<'a> {
    hooks: Vec<Hook<'a>>,
    next_observer: usize,
}

impl<'a> HookRepository<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `observer` to `kind`. Returns `None` when the same request is
    /// already waiting on that target.
    pub fn register(&mut self, kind: HookKind<'a>, mut observer: Observer) -> Option<ObserverId> {
        let position = match self.hooks.iter().position(|h| h.kind.same_target(&kind)) {
            Some(position) => position,
            None => {
                self.hooks.push(Hook {
                    kind,
                    observers: Vec::new(),
                });
                self.hooks.len() - 1
            }
        };
        let hook = &mut self.hooks[position];
        if hook.observers.iter().any(|o| o.same_request(&observer)) {
            return None;
        }

        observer.id = ObserverId(self.next_observer);
        self.next_observer += 1;
        debug!(
            hook = hook.kind.label(),
            requester = %observer.requester,
            chain = observer.chain,
            "registered hook"
        );
        let id = observer.id;
        hook.observers.push(observer);
        Some(id)
    }

    pub fn hooks(&self) -> &[Hook<'a>] {
        &self.hooks
    }

    pub fn get(&self, index: usize) -> Option<&Hook<'a>> {
        self.hooks.get(index)
    }

    pub fn observer(&self, hook: usize, id: ObserverId) -> Option<&Observer> {
        self.hooks.get(hook)?.observers.iter().find(|o| o.id == id)
    }

    pub fn remove_observer(&mut self, hook: usize, id: ObserverId) {
        if let Some(hook) = self.hooks.get_mut(hook) {
            hook.observers.retain(|o| o.id != id);
        }
    }

    pub fn has_pending_for_root(&self, root: StoreId) -> bool {
        self.hooks
            .iter()
            .flat_map(|h| &h.observers)
            .any(|o| o.root == root)
    }

    /// Observers still waiting.
    pub fn pending(&self) -> usize {
        self.hooks.iter().map(|h| h.observers.len()).sum()
    }
}
