//! Call values and typed conversions.
//!
//! A [`CallValue`] is what sits at a parameter or return position before the
//! optional codec flattens it for the wire. [`WireType`] bridges typed Rust
//! values and call values, and reports the [`DeclaredType`] used to build
//! signatures.

use crate::signature::DeclaredType;
use crate::{ConduitError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Value at a call position, before wire flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum CallValue {
    /// A bare null reference.
    Null,
    /// Any wire-representable value.
    Plain(Value),
    /// The optional wrapper: empty or present.
    Optional(Option<Value>),
}

impl CallValue {
    pub fn plain(value: impl Into<Value>) -> Self {
        CallValue::Plain(value.into())
    }

    pub fn present(value: impl Into<Value>) -> Self {
        CallValue::Optional(Some(value.into()))
    }

    pub fn empty() -> Self {
        CallValue::Optional(None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CallValue::Null)
    }
}

/// A Rust type that can sit at a remote call position.
///
/// Implemented here for `()`, `bool`, the numeric primitives, `String`,
/// `Vec<T>` and `Option<T>`. Application types opt in with [`wire_type!`].
pub trait WireType: Sized {
    /// Declared type used in signatures.
    fn declared() -> DeclaredType;

    fn into_call_value(self) -> Result<CallValue>;

    fn from_call_value(value: CallValue) -> Result<Self>;
}

/// Implement [`WireType`] for serde types under a stable wire name.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Greeting { text: String }
///
/// conduit_core::wire_type!(Greeting => "example.Greeting");
/// ```
#[macro_export]
macro_rules! wire_type {
    ($($ty:ty => $name:expr),+ $(,)?) => {
        $(
            impl $crate::WireType for $ty {
                fn declared() -> $crate::DeclaredType {
                    $crate::DeclaredType::Plain(::std::string::String::from($name))
                }

                fn into_call_value(self) -> $crate::Result<$crate::CallValue> {
                    $crate::value::plain_into(&self)
                }

                fn from_call_value(value: $crate::CallValue) -> $crate::Result<Self> {
                    $crate::value::plain_from(value, &<Self as $crate::WireType>::declared())
                }
            }
        )+
    };
}

/// Wrap a serializable value as [`CallValue::Plain`].
pub fn plain_into<T: Serialize>(value: &T) -> Result<CallValue> {
    Ok(CallValue::Plain(serde_json::to_value(value)?))
}

/// Extract a plain value declared as `declared`.
///
/// A bare null is accepted only when the target type deserializes from null;
/// otherwise it is a null reference at a non-nullable position.
pub fn plain_from<T: DeserializeOwned>(value: CallValue, declared: &DeclaredType) -> Result<T> {
    match value {
        CallValue::Plain(v) => Ok(serde_json::from_value(v)?),
        CallValue::Null => serde_json::from_value(Value::Null).map_err(|_| {
            ConduitError::null_reference(format!("null where {} was declared", declared))
        }),
        CallValue::Optional(_) => Err(ConduitError::codec(format!(
            "optional wrapper where {} was declared",
            declared
        ))),
    }
}

crate::wire_type!(
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
    String => "string",
    Value => "json",
);

impl WireType for () {
    fn declared() -> DeclaredType {
        DeclaredType::Unit
    }

    fn into_call_value(self) -> Result<CallValue> {
        Ok(CallValue::Null)
    }

    fn from_call_value(value: CallValue) -> Result<Self> {
        match value {
            CallValue::Null | CallValue::Plain(Value::Null) => Ok(()),
            other => Err(ConduitError::codec(format!(
                "expected no value, got {:?}",
                other
            ))),
        }
    }
}

impl<T> WireType for Vec<T>
where
    T: WireType + Serialize + DeserializeOwned,
{
    fn declared() -> DeclaredType {
        DeclaredType::Plain(format!("list<{}>", T::declared()))
    }

    fn into_call_value(self) -> Result<CallValue> {
        plain_into(&self)
    }

    fn from_call_value(value: CallValue) -> Result<Self> {
        plain_from(value, &Self::declared())
    }
}

impl<T> WireType for Option<T>
where
    T: WireType + Serialize + DeserializeOwned,
{
    fn declared() -> DeclaredType {
        DeclaredType::Optional(T::declared().to_string())
    }

    /// A present value must not encode as null: the wire cannot tell it
    /// from empty, so e.g. `Some(None)` is rejected instead of collapsing.
    fn into_call_value(self) -> Result<CallValue> {
        match self {
            Some(inner) => {
                let value = serde_json::to_value(&inner)?;
                if value.is_null() {
                    return Err(ConduitError::null_reference(format!(
                        "present value of {} encodes as null",
                        Self::declared()
                    )));
                }
                Ok(CallValue::Optional(Some(value)))
            }
            None => Ok(CallValue::Optional(None)),
        }
    }

    fn from_call_value(value: CallValue) -> Result<Self> {
        match value {
            CallValue::Optional(Some(v)) => Ok(Some(serde_json::from_value(v)?)),
            CallValue::Optional(None) => Ok(None),
            CallValue::Null => Err(ConduitError::null_reference(format!(
                "null where {} was declared; use None",
                Self::declared()
            ))),
            CallValue::Plain(_) => Err(ConduitError::codec(format!(
                "plain value where {} was declared",
                Self::declared()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    crate::wire_type!(Greeting => "example.Greeting");

    #[test]
    fn test_declared_types() {
        assert_eq!(String::declared(), DeclaredType::plain("string"));
        assert_eq!(Option::<String>::declared(), DeclaredType::optional("string"));
        assert_eq!(Vec::<i64>::declared(), DeclaredType::plain("list<i64>"));
        assert_eq!(<()>::declared(), DeclaredType::Unit);
        assert_eq!(Greeting::declared(), DeclaredType::plain("example.Greeting"));
    }

    #[test]
    fn test_option_maps_to_optional_wrapper() {
        assert_eq!(
            Some("Bob".to_string()).into_call_value().unwrap(),
            CallValue::present("Bob")
        );
        assert_eq!(None::<String>.into_call_value().unwrap(), CallValue::empty());
        assert_eq!(
            Option::<String>::from_call_value(CallValue::present("Bob")).unwrap(),
            Some("Bob".to_string())
        );
    }

    #[test]
    fn test_nested_option_does_not_collapse() {
        assert_eq!(
            Option::<Option<String>>::declared(),
            DeclaredType::optional("option<string>")
        );
        assert_ne!(Option::<Option<String>>::declared(), Option::<String>::declared());

        assert_eq!(
            Some(Some("Bob".to_string())).into_call_value().unwrap(),
            CallValue::present("Bob")
        );
        assert_eq!(None::<Option<String>>.into_call_value().unwrap(), CallValue::empty());

        let err = Some(None::<String>).into_call_value().unwrap_err();
        assert!(matches!(err, ConduitError::NullReference { .. }));
    }

    #[test]
    fn test_null_into_option_is_null_reference() {
        let err = Option::<String>::from_call_value(CallValue::Null).unwrap_err();
        assert!(matches!(err, ConduitError::NullReference { .. }));
    }

    #[test]
    fn test_null_into_string_is_null_reference() {
        let err = String::from_call_value(CallValue::Null).unwrap_err();
        assert!(matches!(err, ConduitError::NullReference { .. }));
    }

    #[test]
    fn test_application_type_converts() {
        let value = Greeting {
            text: "Hi".into(),
        }
        .into_call_value()
        .unwrap();
        assert_eq!(value, CallValue::plain(serde_json::json!({"text": "Hi"})));
        assert_eq!(
            Greeting::from_call_value(value).unwrap(),
            Greeting { text: "Hi".into() }
        );
    }

    #[test]
    fn test_unit_accepts_null() {
        assert!(<()>::from_call_value(CallValue::Null).is_ok());
        assert!(<()>::from_call_value(CallValue::Plain(Value::Null)).is_ok());
        assert!(<()>::from_call_value(CallValue::plain(1)).is_err());
    }
}
