//! Site predicates: method/constructor matchers and enum matchers.

use crate::engine::Context;
use crate::error::RuleError;
use crate::lang::{simple_name, LanguageTranslation, ObjectType, Site};
use tracing::trace;

/// Wildcard sentinel accepted in every predicate group.
pub const ANY: &str = "*";

/// OR-set of candidate values, or the wildcard on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Any,
    OneOf(Vec<String>),
}

impl Selector {
    /// Fails when the wildcard is mixed with other candidates.
    pub fn new<S: AsRef<str>>(group: &str, values: &[S]) -> Result<Self, RuleError> {
        if values.is_empty() {
            return Err(RuleError::empty_selector(group));
        }
        if values.iter().any(|v| v.as_ref() == ANY) {
            if values.len() > 1 {
                return Err(RuleError::wildcard_combined(group));
            }
            return Ok(Self::Any);
        }
        Ok(Self::OneOf(
            values.iter().map(|v| v.as_ref().to_string()).collect(),
        ))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(candidates) => candidates.iter().any(|c| c == value),
        }
    }

    fn matches_type(&self, ty: Option<&ObjectType>, exact: bool) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(candidates) => match ty {
                Some(ty) => candidates.iter().any(|c| ty.is(c, exact)),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterTypes {
    /// Any arity, any types.
    Any,
    /// Positional types; arity must be equal. A lone `ANY` accepts one
    /// argument of any type.
    Exactly(Vec<String>),
}

impl ParameterTypes {
    /// Same wildcard exclusivity as the other predicate groups. An empty list
    /// is a valid zero-argument signature.
    fn exactly<U: AsRef<str>>(types: &[U]) -> Result<Self, RuleError> {
        if types.len() > 1 && types.iter().any(|t| t.as_ref() == ANY) {
            return Err(RuleError::wildcard_combined("parameter types"));
        }
        Ok(Self::Exactly(
            types.iter().map(|t| t.as_ref().to_string()).collect(),
        ))
    }
}

/// Per-site matching flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchContext {
    pub hook_context: bool,
    pub exact_object_type: bool,
    pub exact_parameters: Vec<bool>,
}

impl MatchContext {
    pub fn new(exact_object_type: bool, exact_parameters: Vec<bool>) -> Self {
        Self {
            hook_context: false,
            exact_object_type,
            exact_parameters,
        }
    }

    /// Hook-triggered matches only ever use exact types.
    pub fn for_hook() -> Self {
        Self {
            hook_context: true,
            exact_object_type: true,
            exact_parameters: Vec::new(),
        }
    }

    pub fn exact_parameter(&self, index: usize) -> bool {
        self.hook_context || self.exact_parameters.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    object_types: Selector,
    method_names: Selector,
    parameter_types: ParameterTypes,
}

impl MethodMatcher {
    pub fn new<S, T, U>(
        object_types: &[S],
        method_names: &[T],
        parameter_types: &[U],
    ) -> Result<Self, RuleError>
    where
        S: AsRef<str>,
        T: AsRef<str>,
        U: AsRef<str>,
    {
        Ok(Self {
            object_types: Selector::new("object types", object_types)?,
            method_names: Selector::new("method names", method_names)?,
            parameter_types: ParameterTypes::exactly(parameter_types)?,
        })
    }

    pub fn with_any_parameters<S, T>(
        object_types: &[S],
        method_names: &[T],
    ) -> Result<Self, RuleError>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Ok(Self {
            object_types: Selector::new("object types", object_types)?,
            method_names: Selector::new("method names", method_names)?,
            parameter_types: ParameterTypes::Any,
        })
    }

    /// Matcher reflected from a method declaration. Undeclared parameter types
    /// are `ANY` per position, so the rule-authoring wildcard check is skipped.
    pub(crate) fn for_definition(
        object_type: &str,
        method_name: &str,
        parameter_types: Vec<String>,
    ) -> Self {
        Self {
            object_types: Selector::OneOf(vec![object_type.to_string()]),
            method_names: Selector::OneOf(vec![method_name.to_string()]),
            parameter_types: ParameterTypes::Exactly(parameter_types),
        }
    }

    pub fn object_types(&self) -> &Selector {
        &self.object_types
    }

    pub fn method_names(&self) -> &Selector {
        &self.method_names
    }

    pub fn parameter_types(&self) -> &ParameterTypes {
        &self.parameter_types
    }

    pub fn arity(&self) -> Option<usize> {
        match &self.parameter_types {
            ParameterTypes::Any => None,
            ParameterTypes::Exactly(types) => Some(types.len()),
        }
    }

    /// Only invocations and constructions can match; enum selections never do.
    pub fn matches<'a>(
        &self,
        site: &Site<'a>,
        lang: &dyn LanguageTranslation,
        ctx: &Context<'a>,
        match_ctx: &MatchContext,
    ) -> bool {
        if matches!(site, Site::EnumSelection(_)) {
            return false;
        }
        let Some(name) = lang.method_name(site, ctx) else {
            return false;
        };
        if !self.method_names.matches(&name) {
            return false;
        }

        if let Selector::OneOf(_) = self.object_types {
            let object_type = lang.invoked_object_type(site, ctx);
            if !self
                .object_types
                .matches_type(object_type.as_ref(), match_ctx.exact_object_type)
            {
                trace!(
                    method = name.as_str(),
                    object_type = ?object_type.as_ref().map(ObjectType::name),
                    "object type mismatch"
                );
                return false;
            }
        }

        match &self.parameter_types {
            ParameterTypes::Any => true,
            ParameterTypes::Exactly(expected) => {
                let actual = lang.parameter_types(site, ctx);
                if actual.len() != expected.len() {
                    return false;
                }
                expected
                    .iter()
                    .zip(actual.iter())
                    .enumerate()
                    .all(|(index, (wanted, found))| {
                        wanted == ANY
                            || match found {
                                Some(ty) => ty.is(wanted, match_ctx.exact_parameter(index)),
                                None => true,
                            }
                    })
            }
        }
    }
}

/// Equality on the enum's simple name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMatcher {
    enum_name: String,
}

impl EnumMatcher {
    pub fn new(enum_name: impl Into<String>) -> Self {
        Self {
            enum_name: enum_name.into(),
        }
    }

    pub fn enum_name(&self) -> &str {
        &self.enum_name
    }

    pub fn matches<'a>(
        &self,
        site: &Site<'a>,
        lang: &dyn LanguageTranslation,
        ctx: &Context<'a>,
    ) -> bool {
        if !matches!(site, Site::EnumSelection(_)) {
            return false;
        }
        lang.enum_class_name(site, ctx)
            .is_some_and(|name| simple_name(&name) == simple_name(&self.enum_name))
    }
}
