//! Declarative detection rules.
//!
//! Rules are built once when the catalog is loaded and then shared read-only
//! (`Arc<DetectionRule>`) by every scan. Rule identity is pointer identity.

pub mod factory;
pub mod matcher;
pub mod value;

pub use factory::{
    ActionFactory, FixedAction, MethodNameAction, NameFactory, OperationModeFactory, SizeFactory,
    ValueFactory,
};
pub use matcher::{EnumMatcher, MatchContext, MethodMatcher, ParameterTypes, Selector, ANY};
pub use value::{DetectedValue, Location, SizeUnit, ValueKind};

use crate::error::RuleError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Index of detections anchored to the matched method itself or to its
/// enclosing method body.
pub const METHOD_LEVEL: i32 = -1;

/// Method name used for constructors.
pub const CONSTRUCTOR: &str = "<init>";

const DEFAULT_BUNDLE: &str = "Default";

/// Namespace tag the downstream mapper uses to pick translation logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bundle(String);

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Object type, method name and full parameter list.
    Full,
    /// Matches on object type and name regardless of arguments; only yields
    /// an action value.
    MethodOnly,
}

/// What a rule does with one argument position. A parameter either carries a
/// value factory or depending rules, never both.
#[derive(Clone)]
pub enum ParameterRole {
    TypeOnly,
    Detectable(Arc<dyn ValueFactory>),
    Depending(Vec<Arc<DetectionRule>>),
}

impl fmt::Debug for ParameterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeOnly => f.write_str("TypeOnly"),
            Self::Detectable(factory) => f.debug_tuple("Detectable").field(factory).finish(),
            Self::Depending(rules) => write!(f, "Depending({} rules)", rules.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    type_name: String,
    role: ParameterRole,
    move_under: Option<i32>,
    exact: bool,
}

impl Parameter {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            role: ParameterRole::TypeOnly,
            move_under: None,
            exact: false,
        }
    }

    pub fn detectable(type_name: impl Into<String>, factory: impl ValueFactory + 'static) -> Self {
        Self {
            role: ParameterRole::Detectable(Arc::new(factory)),
            ..Self::new(type_name)
        }
    }

    pub fn depending(type_name: impl Into<String>, rules: Vec<Arc<DetectionRule>>) -> Self {
        Self {
            role: ParameterRole::Depending(rules),
            ..Self::new(type_name)
        }
    }

    /// Attach resolved values under a fresh child at `index` instead of the
    /// current store.
    pub fn move_under(mut self, index: i32) -> Self {
        self.move_under = Some(index);
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn role(&self) -> &ParameterRole {
        &self.role
    }

    pub fn move_under_index(&self) -> Option<i32> {
        self.move_under
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

#[derive(Debug)]
pub struct DetectionRule {
    kind: RuleKind,
    matcher: MethodMatcher,
    parameters: Vec<Parameter>,
    next_rules: Vec<Arc<DetectionRule>>,
    action: Option<Arc<dyn ActionFactory>>,
    bundle: Bundle,
    match_exact_type: bool,
}

impl DetectionRule {
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_method_only(&self) -> bool {
        self.kind == RuleKind::MethodOnly
    }

    pub fn matcher(&self) -> &MethodMatcher {
        &self.matcher
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn next_rules(&self) -> &[Arc<DetectionRule>] {
        &self.next_rules
    }

    pub fn action_factory(&self) -> Option<&dyn ActionFactory> {
        self.action.as_deref()
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn match_exact_type(&self) -> bool {
        self.match_exact_type
    }

    /// Flags for matching this rule outside hook context.
    pub fn match_context(&self, match_subtypes: bool) -> MatchContext {
        MatchContext::new(
            self.match_exact_type || !match_subtypes,
            self.parameters
                .iter()
                .map(|p| p.exact || !match_subtypes)
                .collect(),
        )
    }

    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        let names = match self.matcher.method_names() {
            Selector::Any => ANY.to_string(),
            Selector::OneOf(names) => names.join("|"),
        };
        format!("{}:{names}/{}", self.bundle, self.parameters.len())
    }
}

#[derive(Debug, Default)]
pub struct RuleBuilder {
    object_types: Vec<String>,
    method_names: Vec<String>,
    parameters: Vec<Parameter>,
    any_parameters: bool,
    next_rules: Vec<Arc<DetectionRule>>,
    action: Option<Arc<dyn ActionFactory>>,
    bundle: Option<String>,
    match_exact_type: bool,
}

impl RuleBuilder {
    pub fn object_type(mut self, name: impl Into<String>) -> Self {
        self.object_types.push(name.into());
        self
    }

    pub fn object_types<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.object_types
            .extend(names.iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.method_names.push(name.into());
        self
    }

    pub fn methods<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.method_names
            .extend(names.iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn constructor(self) -> Self {
        self.method(CONSTRUCTOR)
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Turns the rule into a method-only rule.
    pub fn any_parameters(mut self) -> Self {
        self.any_parameters = true;
        self
    }

    pub fn next(mut self, rule: Arc<DetectionRule>) -> Self {
        self.next_rules.push(rule);
        self
    }

    pub fn next_rules(mut self, rules: impl IntoIterator<Item = Arc<DetectionRule>>) -> Self {
        self.next_rules.extend(rules);
        self
    }

    pub fn action(mut self, factory: impl ActionFactory + 'static) -> Self {
        self.action = Some(Arc::new(factory));
        self
    }

    pub fn bundle(mut self, name: impl Into<String>) -> Self {
        self.bundle = Some(name.into());
        self
    }

    pub fn exact_type(mut self) -> Self {
        self.match_exact_type = true;
        self
    }

    pub fn build(self) -> Result<Arc<DetectionRule>, RuleError> {
        if self.any_parameters && !self.parameters.is_empty() {
            return Err(RuleError::ParametersOnMethodOnlyRule);
        }
        if let Some(index) = self
            .parameters
            .iter()
            .filter_map(|p| p.move_under)
            .find(|index| *index < METHOD_LEVEL)
        {
            return Err(RuleError::invalid_move_under(index));
        }

        let (kind, matcher) = if self.any_parameters {
            (
                RuleKind::MethodOnly,
                MethodMatcher::with_any_parameters(
                    self.object_types.as_slice(),
                    self.method_names.as_slice(),
                )?,
            )
        } else {
            let types: Vec<&str> = self.parameters.iter().map(|p| p.type_name()).collect();
            (
                RuleKind::Full,
                MethodMatcher::new(
                    self.object_types.as_slice(),
                    self.method_names.as_slice(),
                    types.as_slice(),
                )?,
            )
        };

        Ok(Arc::new(DetectionRule {
            kind,
            matcher,
            parameters: self.parameters,
            next_rules: self.next_rules,
            action: self.action,
            bundle: Bundle::new(self.bundle.unwrap_or_else(|| DEFAULT_BUNDLE.to_string())),
            match_exact_type: self.match_exact_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_rule_matcher_from_parameters() {
        let rule = DetectionRule::builder()
            .object_type("org.bouncycastle.crypto.params.AEADParameters")
            .constructor()
            .parameter(Parameter::new("org.bouncycastle.crypto.params.KeyParameter"))
            .parameter(Parameter::detectable("int", SizeFactory::mac_bits()))
            .parameter(Parameter::new("byte[]"))
            .bundle("BouncyCastle")
            .build()
            .unwrap();

        assert_eq!(rule.kind(), RuleKind::Full);
        assert_eq!(rule.matcher().arity(), Some(3));
        assert_eq!(rule.bundle().as_str(), "BouncyCastle");
        assert_eq!(rule.label(), "BouncyCastle:<init>/3");
    }

    #[test]
    fn test_method_only_rule() {
        let rule = DetectionRule::builder()
            .object_type("javax.crypto.Cipher")
            .method("doFinal")
            .any_parameters()
            .action(MethodNameAction)
            .build()
            .unwrap();
        assert!(rule.is_method_only());
        assert_eq!(rule.matcher().arity(), None);
        assert_eq!(rule.bundle().as_str(), "Default");
    }

    #[test]
    fn test_method_only_rule_rejects_parameters() {
        let err = DetectionRule::builder()
            .object_type("javax.crypto.Cipher")
            .method("doFinal")
            .parameter(Parameter::new("byte[]"))
            .any_parameters()
            .build()
            .unwrap_err();
        assert_eq!(err, RuleError::ParametersOnMethodOnlyRule);
    }

    #[test]
    fn test_wildcard_combined_fails_at_build() {
        let err = DetectionRule::builder()
            .object_types(&["*", "javax.crypto.Mac"])
            .method("init")
            .build()
            .unwrap_err();
        assert!(matches!(err, RuleError::WildcardCombined { .. }));
    }

    #[test]
    fn test_invalid_move_under() {
        let err = DetectionRule::builder()
            .object_type("A")
            .method("b")
            .parameter(Parameter::detectable("int", SizeFactory::key_bits()).move_under(-3))
            .build()
            .unwrap_err();
        assert_eq!(err, RuleError::invalid_move_under(-3));
    }

    #[test]
    fn test_match_context_flags() {
        let rule = DetectionRule::builder()
            .object_type("A")
            .method("b")
            .parameter(Parameter::new("int"))
            .parameter(Parameter::new("int").exact())
            .build()
            .unwrap();
        let ctx = rule.match_context(true);
        assert!(!ctx.exact_object_type);
        assert_eq!(ctx.exact_parameters, vec![false, true]);

        let strict = rule.match_context(false);
        assert!(strict.exact_object_type);
        assert_eq!(strict.exact_parameters, vec![true, true]);
    }
}
