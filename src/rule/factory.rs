//! Factories turning resolved constants and matched sites into typed values.

use super::value::{DetectedValue, Location, SizeUnit, ValueKind};
use super::CONSTRUCTOR;
use crate::engine::{Constant, ConstantKind};
use crate::lang::ObjectType;
use std::fmt;

/// Converts a resolved argument constant into a typed value.
pub trait ValueFactory: Send + Sync + fmt::Debug {
    /// Representation the constant is cast to before `create` sees it.
    fn expected(&self) -> ConstantKind;

    /// Size factories get array-dimension resolution.
    fn is_size(&self) -> bool {
        false
    }

    fn create(&self, constant: &Constant, location: Location) -> Option<DetectedValue>;
}

/// Converts a matched invocation or construction into the store's action value.
pub trait ActionFactory: Send + Sync + fmt::Debug {
    fn create(
        &self,
        method_name: &str,
        object_type: Option<&ObjectType>,
        location: Location,
    ) -> Option<DetectedValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFactory {
    kind: ValueKind,
    unit: SizeUnit,
}

impl SizeFactory {
    pub fn new(kind: ValueKind, unit: SizeUnit) -> Self {
        Self { kind, unit }
    }

    pub fn key_bits() -> Self {
        Self::new(ValueKind::KeySize, SizeUnit::Bit)
    }

    pub fn key_bytes() -> Self {
        Self::new(ValueKind::KeySize, SizeUnit::Byte)
    }

    pub fn mac_bits() -> Self {
        Self::new(ValueKind::MacSize, SizeUnit::Bit)
    }
}

impl ValueFactory for SizeFactory {
    fn expected(&self) -> ConstantKind {
        ConstantKind::Int
    }

    fn is_size(&self) -> bool {
        true
    }

    fn create(&self, constant: &Constant, location: Location) -> Option<DetectedValue> {
        let size = constant.as_int().filter(|n| *n >= 0)?;
        Some(DetectedValue::sized(self.kind, size, self.unit, location))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameFactory {
    kind: ValueKind,
}

impl NameFactory {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind }
    }

    pub fn algorithm() -> Self {
        Self::new(ValueKind::Algorithm)
    }
}

impl ValueFactory for NameFactory {
    fn expected(&self) -> ConstantKind {
        ConstantKind::Str
    }

    fn create(&self, constant: &Constant, location: Location) -> Option<DetectedValue> {
        let name = constant.as_str()?;
        if name.is_empty() {
            return None;
        }
        Some(DetectedValue::new(self.kind, name, location))
    }
}

/// Maps well-known constants (e.g. `Cipher.ENCRYPT_MODE == 1`, `true`) to a
/// named operation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationModeFactory {
    modes: Vec<(Constant, String)>,
}

impl OperationModeFactory {
    pub fn new<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = (Constant, S)>,
        S: Into<String>,
    {
        Self {
            modes: modes.into_iter().map(|(c, name)| (c, name.into())).collect(),
        }
    }
}

impl ValueFactory for OperationModeFactory {
    fn expected(&self) -> ConstantKind {
        ConstantKind::Any
    }

    fn create(&self, constant: &Constant, location: Location) -> Option<DetectedValue> {
        self.modes
            .iter()
            .find(|(key, _)| constant.cast(key.kind()).as_ref() == Some(key))
            .map(|(_, name)| DetectedValue::new(ValueKind::OperationMode, name.as_str(), location))
    }
}

/// Always reports the same action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedAction {
    name: String,
}

impl FixedAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ActionFactory for FixedAction {
    fn create(
        &self,
        _method_name: &str,
        _object_type: Option<&ObjectType>,
        location: Location,
    ) -> Option<DetectedValue> {
        Some(DetectedValue::new(ValueKind::Action, self.name.as_str(), location))
    }
}

/// Reports the matched method name, or the constructed type's simple name for
/// constructors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodNameAction;

impl ActionFactory for MethodNameAction {
    fn create(
        &self,
        method_name: &str,
        object_type: Option<&ObjectType>,
        location: Location,
    ) -> Option<DetectedValue> {
        let name = if method_name == CONSTRUCTOR {
            object_type?.simple_name().to_string()
        } else {
            method_name.to_string()
        };
        Some(DetectedValue::new(ValueKind::Action, name, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            line: 1,
            column: 1,
            start_byte: 0,
            end_byte: 3,
        }
    }

    #[test]
    fn test_size_factory_rejects_negative() {
        let factory = SizeFactory::key_bits();
        assert!(factory.create(&Constant::Int(-1), loc()).is_none());
        let value = factory.create(&Constant::Int(256), loc()).unwrap();
        assert_eq!(value.to_string(), "256 bits");
        assert!(factory.is_size());
    }

    #[test]
    fn test_name_factory_needs_string() {
        let factory = NameFactory::algorithm();
        assert!(factory.create(&Constant::Int(3), loc()).is_none());
        assert_eq!(
            factory
                .create(&Constant::Str("AES".into()), loc())
                .unwrap()
                .value(),
            "AES"
        );
    }

    #[test]
    fn test_operation_mode_lookup() {
        let factory = OperationModeFactory::new([
            (Constant::Int(1), "ENCRYPT"),
            (Constant::Int(2), "DECRYPT"),
            (Constant::Bool(true), "ENCRYPT"),
            (Constant::Bool(false), "DECRYPT"),
        ]);
        let value = factory.create(&Constant::Bool(false), loc()).unwrap();
        assert_eq!(value.value(), "DECRYPT");
        assert_eq!(value.kind(), ValueKind::OperationMode);
        assert!(factory.create(&Constant::Int(7), loc()).is_none());
    }

    #[test]
    fn test_method_name_action_uses_type_for_constructor() {
        let ty = ObjectType::new("org.bouncycastle.crypto.engines.AESEngine");
        let value = MethodNameAction
            .create(CONSTRUCTOR, Some(&ty), loc())
            .unwrap();
        assert_eq!(value.value(), "AESEngine");

        let value = MethodNameAction.create("getInstance", None, loc()).unwrap();
        assert_eq!(value.value(), "getInstance");
    }
}
