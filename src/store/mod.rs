//! Detection stores: the result tree built while rules propagate.
//!
//! Stores live in a per-scan arena and refer to each other by [`StoreId`].
//! Children and hook roots are back-references by id, so a parent never owns
//! a cycle through its descendants.

pub mod finding;

pub use finding::{Finding, FindingNode};

use crate::lang::Site;
use crate::rule::{DetectedValue, DetectionRule};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(usize);

impl StoreId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Present on stores created by a hook resolution.
#[derive(Debug, Clone, Copy)]
pub struct HookOrigin<'a> {
    /// Invocation that satisfied the hook.
    pub trigger: Node<'a>,
    /// Store that later successive resolutions re-attach to.
    pub hook_root: StoreId,
}

/// A detection fed into a store.
#[derive(Debug, Clone)]
pub enum Detection<'a> {
    Method {
        site: Site<'a>,
        action: Option<DetectedValue>,
    },
    Value {
        index: i32,
        move_under: Option<i32>,
        value: DetectedValue,
    },
}

#[derive(Debug)]
pub struct DetectionStore<'a> {
    id: StoreId,
    level: usize,
    rule: Arc<DetectionRule>,
    values: BTreeMap<i32, Vec<DetectedValue>>,
    children: BTreeMap<i32, Vec<StoreId>>,
    action: Option<DetectedValue>,
    site: Option<Site<'a>>,
    parent: Option<(StoreId, i32)>,
    root: StoreId,
    hook: Option<HookOrigin<'a>>,
}

impl<'a> DetectionStore<'a> {
    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn rule(&self) -> &Arc<DetectionRule> {
        &self.rule
    }

    pub fn values(&self) -> &BTreeMap<i32, Vec<DetectedValue>> {
        &self.values
    }

    pub fn values_at(&self, index: i32) -> &[DetectedValue] {
        self.values.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self) -> &BTreeMap<i32, Vec<StoreId>> {
        &self.children
    }

    pub fn children_at(&self, index: i32) -> &[StoreId] {
        self.children.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn action(&self) -> Option<&DetectedValue> {
        self.action.as_ref()
    }

    /// Site this store's rule matched, once claimed.
    pub fn site(&self) -> Option<&Site<'a>> {
        self.site.as_ref()
    }

    pub fn parent(&self) -> Option<StoreId> {
        self.parent.map(|(id, _)| id)
    }

    pub fn root(&self) -> StoreId {
        self.root
    }

    pub fn hook(&self) -> Option<&HookOrigin<'a>> {
        self.hook.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct StoreArena<'a> {
    stores: Vec<DetectionStore<'a>>,
}

impl<'a> StoreArena<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn get(&self, id: StoreId) -> &DetectionStore<'a> {
        &self.stores[id.0]
    }

    fn get_mut(&mut self, id: StoreId) -> &mut DetectionStore<'a> {
        &mut self.stores[id.0]
    }

    fn push(
        &mut self,
        rule: Arc<DetectionRule>,
        level: usize,
        parent: Option<(StoreId, i32)>,
        root: Option<StoreId>,
    ) -> StoreId {
        let id = StoreId(self.stores.len());
        self.stores.push(DetectionStore {
            id,
            level,
            rule,
            values: BTreeMap::new(),
            children: BTreeMap::new(),
            action: None,
            site: None,
            parent,
            root: root.unwrap_or(id),
            hook: None,
        });
        id
    }

    pub fn create_root(&mut self, rule: Arc<DetectionRule>) -> StoreId {
        self.push(rule, 0, None, None)
    }

    /// Attach a fresh store evaluating `rule` under `parent[index]`.
    pub fn create_child(
        &mut self,
        parent: StoreId,
        index: i32,
        rule: Arc<DetectionRule>,
        hook: Option<HookOrigin<'a>>,
    ) -> StoreId {
        let (level, root) = {
            let parent_store = self.get(parent);
            (parent_store.level + 1, parent_store.root)
        };
        let id = self.push(rule, level, Some((parent, index)), Some(root));
        self.get_mut(id).hook = hook;
        self.get_mut(parent)
            .children
            .entry(index)
            .or_default()
            .push(id);
        trace!(store = %id, parent = %parent, index, level, "created child store");
        id
    }

    /// Bind `site` to the store. A store already bound to another site gets
    /// a sibling evaluating the same rule in the same slot.
    pub fn claim(&mut self, id: StoreId, site: Site<'a>) -> StoreId {
        let store = self.get(id);
        let free = store
            .site
            .as_ref()
            .map_or(true, |claimed| claimed.same_as(&site));
        let target = if free {
            id
        } else {
            let (rule, hook, parent) = (store.rule.clone(), store.hook, store.parent);
            match parent {
                Some((parent, index)) => self.create_child(parent, index, rule, hook),
                None => self.create_root(rule),
            }
        };
        self.get_mut(target).site = Some(site);
        target
    }

    /// Whether `id` or one of its ancestors already evaluated `rule` on `site`.
    pub fn is_claimed_on_path(
        &self,
        id: StoreId,
        rule: &Arc<DetectionRule>,
        site: &Site<'a>,
    ) -> bool {
        self.path_to_root(id).any(|store| {
            Arc::ptr_eq(&store.rule, rule)
                && store.site.as_ref().is_some_and(|claimed| claimed.same_as(site))
        })
    }

    pub fn path_to_root(&self, id: StoreId) -> impl Iterator<Item = &DetectionStore<'a>> {
        std::iter::successors(Some(self.get(id)), move |store| store.parent().map(|p| self.get(p)))
    }

    /// Store successive hook resolutions attach to.
    pub fn hook_root(&self, id: StoreId) -> StoreId {
        self.path_to_root(id)
            .find_map(|store| store.hook.map(|h| h.hook_root))
            .unwrap_or(id)
    }

    /// Feed a detection into a store; returns the store the detection landed in.
    pub fn receive(&mut self, id: StoreId, detection: Detection<'a>) -> StoreId {
        match detection {
            Detection::Method { site, action } => {
                let store = self.get_mut(id);
                store.site = Some(site);
                if action.is_some() {
                    store.action = action;
                }
                id
            }
            Detection::Value {
                index,
                move_under: Some(target),
                value,
            } => {
                let rule = self.get(id).rule.clone();
                let moved = self.create_child(id, target, rule, None);
                self.push_value(moved, index, value);
                moved
            }
            Detection::Value {
                index,
                move_under: None,
                value,
            } => {
                self.push_value(id, index, value);
                id
            }
        }
    }

    fn push_value(&mut self, id: StoreId, index: i32, value: DetectedValue) {
        let values = self.get_mut(id).values.entry(index).or_default();
        if !values.contains(&value) {
            trace!(store = %id, index, value = %value, "value detected");
            values.push(value);
        }
    }

    /// Whether the store or any descendant holds a value or an action.
    pub fn has_detections(&self, id: StoreId) -> bool {
        let store = self.get(id);
        store.action.is_some()
            || store.values.values().any(|v| !v.is_empty())
            || store
                .children
                .values()
                .flatten()
                .any(|child| self.has_detections(*child))
    }

    /// Drop every store created at or after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        if mark >= self.stores.len() {
            return;
        }
        self.stores.truncate(mark);
        for store in &mut self.stores {
            for children in store.children.values_mut() {
                children.retain(|child| child.0 < mark);
            }
            store.children.retain(|_, children| !children.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Location, SizeUnit, ValueKind, METHOD_LEVEL};
    use pretty_assertions::assert_eq;

    fn rule() -> Arc<DetectionRule> {
        DetectionRule::builder()
            .object_type("javax.crypto.Cipher")
            .method("getInstance")
            .any_parameters()
            .build()
            .unwrap()
    }

    fn location(line: usize) -> Location {
        Location {
            line,
            column: 1,
            start_byte: 0,
            end_byte: 1,
        }
    }

    fn size(bits: i64) -> DetectedValue {
        DetectedValue::sized(ValueKind::KeySize, bits, SizeUnit::Bit, location(1))
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut arena = StoreArena::new();
        let root = arena.create_root(rule());
        let a = arena.create_child(root, 0, rule(), None);
        let b = arena.create_child(root, 0, rule(), None);
        let c = arena.create_child(root, METHOD_LEVEL, rule(), None);

        assert_eq!(arena.get(root).children_at(0), &[a, b]);
        assert_eq!(arena.get(root).children_at(METHOD_LEVEL), &[c]);
        let keys: Vec<_> = arena.get(root).children().keys().copied().collect();
        assert_eq!(keys, vec![-1, 0]);
        assert_eq!(arena.get(b).level(), 1);
        assert_eq!(arena.get(b).root(), root);
    }

    #[test]
    fn test_move_under_creates_child() {
        let mut arena = StoreArena::new();
        let root = arena.create_root(rule());
        let landed = arena.receive(
            root,
            Detection::Value {
                index: 1,
                move_under: Some(0),
                value: size(128),
            },
        );
        assert_ne!(landed, root);
        assert!(arena.get(root).values().is_empty());
        assert_eq!(arena.get(root).children_at(0), &[landed]);
        assert_eq!(arena.get(landed).values_at(1), &[size(128)]);
        assert!(arena.has_detections(root));
    }

    #[test]
    fn test_truncate_detaches_dropped_children() {
        let mut arena = StoreArena::new();
        let kept = arena.create_root(rule());
        let mark = arena.len();
        arena.create_child(kept, 0, rule(), None);
        arena.create_root(rule());
        arena.truncate(mark);

        assert_eq!(arena.len(), 1);
        assert!(arena.get(kept).children().is_empty());
    }

    #[test]
    fn test_hook_root_resolves_through_ancestors() {
        let mut arena = StoreArena::new();
        let root = arena.create_root(rule());
        let requester = arena.create_child(root, 0, rule(), None);
        let tree = crate::lang::parse("class A {}", crate::engine::Language::Java).unwrap();
        let origin = HookOrigin {
            trigger: tree.root_node(),
            hook_root: requester,
        };
        let hooked = arena.create_child(requester, 0, rule(), Some(origin));
        let nested = arena.create_child(hooked, 0, rule(), None);

        assert_eq!(arena.hook_root(nested), requester);
        assert_eq!(arena.hook_root(requester), requester);
    }

    #[test]
    fn test_duplicate_values_are_ignored() {
        let mut arena = StoreArena::new();
        let root = arena.create_root(rule());
        for _ in 0..2 {
            arena.receive(
                root,
                Detection::Value {
                    index: 0,
                    move_under: None,
                    value: size(256),
                },
            );
        }
        assert_eq!(arena.get(root).values_at(0).len(), 1);
    }
}
