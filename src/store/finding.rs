//! Reporting-facing projections of detection store trees.

use super::{StoreArena, StoreId};
use crate::rule::{Bundle, DetectedValue, DetectionRule, Location};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Owned snapshot of one store and its descendants.
///
/// Equality is structural: same rule (by identity), same action, same ordered
/// values and, recursively, same ordered children.
#[derive(Debug, Clone, Serialize)]
pub struct FindingNode {
    #[serde(serialize_with = "serialize_rule")]
    rule: Arc<DetectionRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<DetectedValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    values: BTreeMap<i32, Vec<DetectedValue>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<i32, Vec<FindingNode>>,
}

fn serialize_rule<S: Serializer>(
    rule: &Arc<DetectionRule>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&rule.label())
}

impl FindingNode {
    fn project(arena: &StoreArena<'_>, id: StoreId) -> Self {
        let store = arena.get(id);
        let children = store
            .children()
            .iter()
            .map(|(index, ids)| {
                let nodes = ids.iter().map(|child| Self::project(arena, *child)).collect();
                (*index, nodes)
            })
            .collect();
        Self {
            rule: store.rule().clone(),
            action: store.action().cloned(),
            values: store.values().clone(),
            children,
        }
    }

    pub fn rule(&self) -> &Arc<DetectionRule> {
        &self.rule
    }

    pub fn action(&self) -> Option<&DetectedValue> {
        self.action.as_ref()
    }

    pub fn values(&self) -> &BTreeMap<i32, Vec<DetectedValue>> {
        &self.values
    }

    pub fn values_at(&self, index: i32) -> &[DetectedValue] {
        self.values.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self) -> &BTreeMap<i32, Vec<FindingNode>> {
        &self.children
    }

    pub fn children_at(&self, index: i32) -> &[FindingNode] {
        self.children.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every value in this subtree, depth first.
    pub fn all_values(&self) -> Vec<&DetectedValue> {
        let mut out: Vec<&DetectedValue> = self.action.iter().collect();
        out.extend(self.values.values().flatten());
        for child in self.children.values().flatten() {
            out.extend(child.all_values());
        }
        out
    }
}

impl PartialEq for FindingNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rule, &other.rule)
            && self.action == other.action
            && self.values == other.values
            && self.children == other.children
    }
}

impl Eq for FindingNode {}

/// A finalized detection tree rooted at one matched site.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    file_path: String,
    bundle: Bundle,
    level: usize,
    location: Option<Location>,
    root: FindingNode,
}

impl Finding {
    pub fn project(arena: &StoreArena<'_>, id: StoreId, file_path: &str) -> Self {
        let store = arena.get(id);
        let location = store
            .action()
            .map(DetectedValue::location)
            .or_else(|| store.site().map(|site| Location::of(&site.node())));
        Self {
            file_path: file_path.to_string(),
            bundle: store.rule().bundle().clone(),
            level: store.level(),
            location,
            root: FindingNode::project(arena, id),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn root(&self) -> &FindingNode {
        &self.root
    }
}

impl PartialEq for Finding {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for Finding {}
