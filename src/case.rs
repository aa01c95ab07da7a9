//! Field-name case conversion
//!
//! The remote API speaks snake_case (`first_name`), callers speak camelCase
//! (`firstName`). Every key crossing the boundary goes through one of these.

use serde_json::Value;

/// camelCase -> snake_case: each ASCII uppercase letter becomes `_` + its lowercase.
pub fn to_external(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// snake_case -> camelCase: `_` followed by an ASCII lowercase letter becomes that letter uppercased.
///
/// An underscore at the end, or before anything that is not a lowercase letter,
/// is kept as-is.
pub fn to_internal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Recursively rename every object key to external form.
pub fn keys_to_external(value: &Value) -> Value {
    convert_keys(value, &to_external)
}

/// Recursively rename every object key to internal form.
pub fn keys_to_internal(value: &Value) -> Value {
    convert_keys(value, &to_internal)
}

fn convert_keys(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (f(k), convert_keys(v, f)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| convert_keys(v, f)).collect()),
        leaf => leaf.clone(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_camel() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9]{0,6}",
            prop::collection::vec("[A-Z][a-z0-9]{0,6}", 0..4),
        )
            .prop_map(|(head, tail)| head + &tail.concat())
    }

    fn arb_snake() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z][a-z0-9]{0,6}", 1..5).prop_map(|parts| parts.join("_"))
    }

    proptest! {
        #[test]
        fn camel_round_trips_through_external(s in arb_camel()) {
            prop_assert_eq!(to_internal(&to_external(&s)), s);
        }

        #[test]
        fn snake_round_trips_through_internal(s in arb_snake()) {
            prop_assert_eq!(to_external(&to_internal(&s)), s);
        }
    }
}
