//! Optional value codec.
//!
//! The optional wrapper is not a wire shape of its own. Before encoding, it is
//! flattened to its contained value, or to `null` when empty. After decoding,
//! it is put back. Which positions get this treatment is decided only by the
//! *declared* type, never by looking at the value.
//!
//! `null` on the wire therefore cannot distinguish "empty" from a legitimately
//! null value; scoping the transform to declared-optional positions resolves
//! that.

use crate::signature::DeclaredType;
use crate::value::CallValue;
use crate::{ConduitError, Result};
use serde_json::Value;

/// Flatten a call value for the wire.
///
/// At a declared-optional position a bare null is a caller bug, distinct from
/// an empty optional, and fails with [`ConduitError::NullReference`].
pub fn strip(value: CallValue, declared: &DeclaredType) -> Result<Value> {
    if declared.is_optional() {
        match value {
            CallValue::Optional(inner) => Ok(inner.unwrap_or(Value::Null)),
            CallValue::Null => Err(ConduitError::null_reference(format!(
                "Can't send null as a {} value; use an empty optional",
                declared
            ))),
            CallValue::Plain(_) => Err(ConduitError::codec(format!(
                "plain value at a position declared {}",
                declared
            ))),
        }
    } else {
        match value {
            CallValue::Plain(v) => Ok(v),
            CallValue::Null => Ok(Value::Null),
            CallValue::Optional(_) => Err(ConduitError::codec(format!(
                "optional wrapper at a position declared {}",
                declared
            ))),
        }
    }
}

/// Put the optional wrapper back where one was declared.
pub fn restore(value: Value, declared: &DeclaredType) -> CallValue {
    if declared.is_optional() {
        match value {
            Value::Null => CallValue::Optional(None),
            v => CallValue::Optional(Some(v)),
        }
    } else {
        match value {
            Value::Null => CallValue::Null,
            v => CallValue::Plain(v),
        }
    }
}

/// True if any of the declared types is the optional wrapper.
pub fn has_optionals(declared: &[DeclaredType]) -> bool {
    declared.iter().any(DeclaredType::is_optional)
}

/// Strip every argument using its declared parameter type.
pub fn strip_all(values: Vec<CallValue>, declared: &[DeclaredType]) -> Result<Vec<Value>> {
    check_arity(values.len(), declared.len())?;
    values
        .into_iter()
        .zip(declared)
        .map(|(value, declared)| strip(value, declared))
        .collect()
}

/// Restore every argument using its declared parameter type.
pub fn restore_all(values: Vec<Value>, declared: &[DeclaredType]) -> Result<Vec<CallValue>> {
    check_arity(values.len(), declared.len())?;
    Ok(values
        .into_iter()
        .zip(declared)
        .map(|(value, declared)| restore(value, declared))
        .collect())
}

fn check_arity(actual: usize, declared: usize) -> Result<()> {
    if actual != declared {
        return Err(ConduitError::protocol(format!(
            "expected {} arguments, got {}",
            declared, actual
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opt() -> DeclaredType {
        DeclaredType::optional("string")
    }

    fn string() -> DeclaredType {
        DeclaredType::plain("string")
    }

    #[test]
    fn test_strips_value() {
        assert_eq!(strip(CallValue::empty(), &opt()).unwrap(), Value::Null);
        assert_eq!(strip(CallValue::present("foo"), &opt()).unwrap(), json!("foo"));
        assert_eq!(strip(CallValue::plain("foo"), &string()).unwrap(), json!("foo"));
    }

    #[test]
    fn test_cant_strip_null_optional() {
        let err = strip(CallValue::Null, &opt()).unwrap_err();
        assert!(matches!(err, ConduitError::NullReference { .. }));
    }

    #[test]
    fn test_null_passes_through_plain_position() {
        assert_eq!(strip(CallValue::Null, &string()).unwrap(), Value::Null);
    }

    #[test]
    fn test_optional_at_plain_position_is_rejected() {
        assert!(strip(CallValue::present("foo"), &string()).is_err());
    }

    #[test]
    fn test_restores_value() {
        assert_eq!(restore(Value::Null, &opt()), CallValue::empty());
        assert_eq!(restore(json!("foo"), &opt()), CallValue::present("foo"));
        assert_eq!(restore(json!("foo"), &string()), CallValue::plain("foo"));
    }

    #[test]
    fn test_has_optionals() {
        assert!(!has_optionals(&[string(), DeclaredType::plain("json")]));
        assert!(has_optionals(&[string(), opt()]));
    }

    #[test]
    fn test_strips_params() {
        let stripped = strip_all(
            vec![CallValue::empty(), CallValue::plain("foo"), CallValue::present("bar")],
            &[opt(), string(), opt()],
        )
        .unwrap();
        assert_eq!(stripped, vec![Value::Null, json!("foo"), json!("bar")]);
    }

    #[test]
    fn test_restores_params() {
        let restored = restore_all(
            vec![Value::Null, json!("foo"), json!("bar")],
            &[opt(), string(), opt()],
        )
        .unwrap();
        assert_eq!(
            restored,
            vec![CallValue::empty(), CallValue::plain("foo"), CallValue::present("bar")]
        );
    }

    #[test]
    fn test_strip_then_restore_is_identity_without_optionals() {
        let declared = [string(), DeclaredType::plain("i64"), DeclaredType::plain("json")];
        let args = vec![
            CallValue::plain("bob"),
            CallValue::plain(42),
            CallValue::Null,
        ];
        let wire = strip_all(args.clone(), &declared).unwrap();
        assert_eq!(restore_all(wire, &declared).unwrap(), args);
    }

    #[test]
    fn test_arity_mismatch_is_protocol_error() {
        let err = restore_all(vec![json!("a")], &[string(), string()]).unwrap_err();
        assert!(matches!(err, ConduitError::Protocol { .. }));
    }
}
