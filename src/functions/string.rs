//! String, introspection and control builtins

use super::{FormalArguments, Registry};
use crate::value::Value;

pub(super) fn register(registry: &mut Registry) {
    let string = || FormalArguments::new().required("string");
    registry.eager("quote", string(), |args, _| {
        Ok(match args.get("string") {
            quoted @ Value::Str { .. } => quoted.clone(),
            other => Value::quoted(other.to_string()),
        })
    });
    registry.eager("unquote", string(), |args, _| {
        Ok(match args.get("string") {
            Value::Str { text, .. } => Value::Ident(text.clone()),
            other => other.clone(),
        })
    });
    registry.eager("type-of", FormalArguments::new().required("value"), |args, _| {
        Ok(Value::ident(args.get("value").type_name()))
    });

    // Only the selected branch is evaluated
    registry.lazy(
        "if",
        FormalArguments::new()
            .required("condition")
            .required("if-true")
            .required("if-false"),
        |args, evaluate| {
            if evaluate(args.get("condition"))?.is_truthy() {
                evaluate(args.get("if-true"))
            } else {
                evaluate(args.get("if-false"))
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::super::{builtin, BuiltinKind};
    use crate::error::CompilerError;
    use crate::types::SourcePosition;
    use crate::value::{Argument, Value};

    fn eager(name: &str, value: Value) -> Value {
        let pos = SourcePosition::new("test.scss", 1, 1);
        let builtin = builtin(name).unwrap();
        let bound = builtin.signature.bind(name, &[Argument::positional(value)], &pos).unwrap();
        match builtin.kind {
            BuiltinKind::Eager(func) => func(&bound, &pos).unwrap(),
            BuiltinKind::Lazy(_) => unreachable!(),
        }
    }

    #[test]
    fn test_quote_and_unquote() {
        assert_eq!(eager("quote", Value::ident("sans")).to_string(), "\"sans\"");
        assert_eq!(eager("unquote", Value::quoted("sans")).to_string(), "sans");
        assert_eq!(eager("type-of", Value::number(1.0, "px")).to_string(), "number");
        assert_eq!(eager("type-of", Value::boolean(true)).to_string(), "bool");
    }

    #[test]
    fn test_if_evaluates_selected_branch_only() {
        let pos = SourcePosition::new("test.scss", 1, 1);
        let builtin = builtin("if").unwrap();
        let args = [
            Argument::positional(Value::boolean(true)),
            Argument::positional(Value::ident("yes")),
            Argument::positional(Value::ident("explode")),
        ];
        let bound = builtin.signature.bind("if", &args, &pos).unwrap();
        let mut evaluate = |value: &Value| {
            if value == &Value::ident("explode") {
                Err(CompilerError::compile(&pos, "evaluated the wrong branch"))
            } else {
                Ok(value.clone())
            }
        };
        let result = match builtin.kind {
            BuiltinKind::Lazy(func) => func(&bound, &mut evaluate).unwrap(),
            BuiltinKind::Eager(_) => unreachable!(),
        };
        assert_eq!(result, Value::ident("yes"));
    }
}
