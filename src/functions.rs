//! Contains functions that can be inserted into the library

use std::cmp::Ordering;

use crate::{DialogueSession, FunctionInfo, Library, YarnValue};

fn invalid_operands(name: &str, parameters: &[YarnValue]) -> String {
    let kinds: Vec<_> = parameters.iter()
        .map(|param| param.kind().as_str())
        .collect();
    format!("{} cannot be applied to ({})", name, kinds.join(", "))
}

/// Registers a two-operand arithmetic function.
fn insert_arithmetic<F>(library: &mut Library, name: &'static str, op: F)
where
    F: Fn(&YarnValue, &YarnValue) -> Option<YarnValue> + 'static,
{
    library.insert(
        name.to_string(),
        FunctionInfo::new_returning(2, move |_session: &DialogueSession, parameters: &[YarnValue]| {
            op(&parameters[0], &parameters[1])
                .ok_or_else(|| invalid_operands(name, parameters))
        }),
    );
}

/// Registers a two-operand function that always succeeds.
fn insert_binary<F>(library: &mut Library, name: &'static str, op: F)
where
    F: Fn(&YarnValue, &YarnValue) -> bool + 'static,
{
    library.insert(
        name.to_string(),
        FunctionInfo::new_returning(2, move |_session: &DialogueSession, parameters: &[YarnValue]| {
            Ok(op(&parameters[0], &parameters[1]).into())
        }),
    );
}

/// Adds mathematical functions such as addition, subtraction and so on to the library.
pub fn add_mathematical_functions(library: &mut Library) {
    insert_arithmetic(library, "Add", |a, b| a.add(b));
    insert_arithmetic(library, "Minus", |a, b| a.sub(b));
    insert_arithmetic(library, "Divide", |a, b| a.div(b));
    insert_arithmetic(library, "Multiply", |a, b| a.mul(b));
    insert_arithmetic(library, "Modulo", |a, b| a.rem(b));

    library.insert(
        "UnaryMinus".to_string(),
        FunctionInfo::new_returning(1, |_session: &DialogueSession, parameters: &[YarnValue]| {
            Ok(parameters[0].neg())
        }),
    );

    insert_binary(library, "EqualTo", |a, b| a.equals(b));
    insert_binary(library, "NotEqualTo", |a, b| !a.equals(b));
    insert_binary(library, "GreaterThan", |a, b| a.compare(b) == Some(Ordering::Greater));
    insert_binary(library, "GreaterThanOrEqualTo", |a, b| matches!(a.compare(b), Some(Ordering::Greater) | Some(Ordering::Equal)));
    insert_binary(library, "LessThan", |a, b| a.compare(b) == Some(Ordering::Less));
    insert_binary(library, "LessThanOrEqualTo", |a, b| matches!(a.compare(b), Some(Ordering::Less) | Some(Ordering::Equal)));
}

/// Adds logic functions to the library, such as "and", "or" and so on.
pub fn add_logic_functions(library: &mut Library) {
    insert_binary(library, "And", |a, b| a.as_bool() && b.as_bool());
    insert_binary(library, "Or", |a, b| a.as_bool() || b.as_bool());
    insert_binary(library, "Xor", |a, b| a.as_bool() ^ b.as_bool());

    library.insert(
        "Not".to_string(),
        FunctionInfo::new_returning(1, |_session: &DialogueSession, parameters: &[YarnValue]| {
            Ok((!parameters[0].as_bool()).into())
        }),
    );
}

/// Adds functions such as "visited" and "visited_count" to the library
pub fn add_visited_functions(library: &mut Library) {
    library.insert(
        "visited".to_string(),
        FunctionInfo::new_returning(1, |session: &DialogueSession, parameters: &[YarnValue]| {
            Ok((session.visit_count(&parameters[0].as_string()) > 0).into())
        }),
    );

    library.insert(
        "visited_count".to_string(),
        FunctionInfo::new_returning(1, |session: &DialogueSession, parameters: &[YarnValue]| {
            Ok(YarnValue::Number(session.visit_count(&parameters[0].as_string()) as f32))
        }),
    );
}

/// A library with every built-in function.
pub fn standard_library() -> Library {
    let mut library = Library::new();
    add_mathematical_functions(&mut library);
    add_logic_functions(&mut library);
    add_visited_functions(&mut library);
    library
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(library: &Library, name: &str, parameters: &[YarnValue]) -> Result<Option<YarnValue>, String> {
        let session = DialogueSession::default();
        library[name].call(&session, parameters)
    }

    #[test]
    fn test_operators() {
        let library = standard_library();
        assert_eq!(
            call(&library, "Add", &[YarnValue::Number(2.0), YarnValue::Number(3.0)]),
            Ok(Some(YarnValue::Number(5.0))),
        );
        assert_eq!(
            call(&library, "LessThan", &[YarnValue::Number(2.0), YarnValue::Number(3.0)]),
            Ok(Some(YarnValue::Bool(true))),
        );
        assert_eq!(
            call(&library, "Xor", &[YarnValue::Bool(true), YarnValue::from("x")]),
            Ok(Some(YarnValue::Bool(false))),
        );
    }

    #[test]
    fn test_comparisons_with_null() {
        let library = standard_library();
        assert_eq!(
            call(&library, "GreaterThan", &[YarnValue::Null, YarnValue::Number(5.0)]),
            Ok(Some(YarnValue::Bool(false))),
        );
        assert_eq!(
            call(&library, "LessThanOrEqualTo", &[YarnValue::Null, YarnValue::Number(0.0)]),
            Ok(Some(YarnValue::Bool(true))),
        );
        assert_eq!(
            call(&library, "LessThan", &[YarnValue::from("zzz"), YarnValue::Number(5.0)]),
            Ok(Some(YarnValue::Bool(false))),
        );
        assert_eq!(
            call(&library, "NotEqualTo", &[YarnValue::from("1"), YarnValue::Number(1.0)]),
            Ok(Some(YarnValue::Bool(false))),
        );
    }

    #[test]
    fn test_invalid_operands() {
        let library = standard_library();
        let err = call(&library, "Multiply", &[YarnValue::from("a"), YarnValue::Bool(true)]).unwrap_err();
        assert_eq!(err, "Multiply cannot be applied to (string, bool)");
    }

    #[test]
    fn test_visited_without_history() {
        let library = standard_library();
        assert_eq!(
            call(&library, "visited", &[YarnValue::from("Start")]),
            Ok(Some(YarnValue::Bool(false))),
        );
    }
}
