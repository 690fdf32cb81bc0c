//! Built-in functions and formal argument binding
//!
//! Every builtin declares a [`FormalArguments`] signature. Actual arguments
//! are bound against it before the builtin runs, so arity and naming errors
//! are reported uniformly for builtins, user functions and mixins.

mod color;
mod list;
mod math;
mod string;

use crate::color::Color;
use crate::error::{CompilerError, Result};
use crate::types::SourcePosition;
use crate::value::{Argument, Number, Value};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
}

/// Ordered parameter list with optional defaults and a variadic tail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormalArguments {
    parameters: Vec<Parameter>,
    rest: Option<String>,
}

impl FormalArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: &str, default: Value) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            default: Some(default),
        });
        self
    }

    pub fn rest(mut self, name: &str) -> Self {
        self.rest = Some(name.to_string());
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn rest_name(&self) -> Option<&str> {
        self.rest.as_deref()
    }

    /// Bind actual arguments. Splats must already be expanded by the caller.
    pub fn bind(&self, callee: &str, args: &[Argument], position: &SourcePosition) -> Result<BoundArguments> {
        let error = |message: String| CompilerError::compile(position, format!("{}: {}", callee, message));

        let mut given: IndexMap<String, Value> = IndexMap::new();
        let mut rest = Vec::new();
        let mut positional = 0;
        let mut seen_named = false;

        for arg in args {
            match &arg.name {
                Some(name) => {
                    seen_named = true;
                    let key = name.replace('_', "-");
                    if !self.parameters.iter().any(|p| p.name.replace('_', "-") == key) {
                        return Err(error(format!("no argument named ${}", name)));
                    }
                    if given.insert(key, arg.value.clone()).is_some() {
                        return Err(error(format!("argument ${} was passed more than once", name)));
                    }
                }
                None => {
                    if seen_named {
                        return Err(error("positional arguments must come before named arguments".into()));
                    }
                    match self.parameters.get(positional) {
                        Some(parameter) => {
                            given.insert(parameter.name.replace('_', "-"), arg.value.clone());
                        }
                        None if self.rest.is_some() => rest.push(arg.value.clone()),
                        None => {
                            return Err(error(format!(
                                "takes {} argument(s) but {} were passed",
                                self.parameters.len(),
                                args.len()
                            )))
                        }
                    }
                    positional += 1;
                }
            }
        }

        let mut bindings = IndexMap::new();
        for parameter in &self.parameters {
            let binding = match given.swap_remove(&parameter.name.replace('_', "-")) {
                Some(value) => Binding::Given(value),
                None => match &parameter.default {
                    Some(default) => Binding::Default(default.clone()),
                    None => return Err(error(format!("missing argument ${}", parameter.name))),
                },
            };
            bindings.insert(parameter.name.clone(), binding);
        }

        Ok(BoundArguments {
            bindings,
            rest_name: self.rest.clone(),
            rest,
        })
    }
}

/// How a parameter received its value. Defaults of user functions and
/// mixins are evaluated in the callee's scope, so they are kept apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Given(Value),
    Default(Value),
}

impl Binding {
    pub fn value(&self) -> &Value {
        match self {
            Binding::Given(v) | Binding::Default(v) => v,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundArguments {
    bindings: IndexMap<String, Binding>,
    rest_name: Option<String>,
    rest: Vec<Value>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> &Value {
        self.bindings.get(name).map(Binding::value).unwrap_or(&Value::Null)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn rest_name(&self) -> Option<&str> {
        self.rest_name.as_deref()
    }

    pub fn rest(&self) -> &[Value] {
        &self.rest
    }
}

pub type BuiltinFn = fn(&BoundArguments, &SourcePosition) -> Result<Value>;

/// Receives its arguments unevaluated together with an evaluation callback
pub type LazyBuiltinFn =
    fn(&BoundArguments, &mut dyn FnMut(&Value) -> Result<Value>) -> Result<Value>;

pub enum BuiltinKind {
    Eager(BuiltinFn),
    Lazy(LazyBuiltinFn),
}

pub struct Builtin {
    pub name: &'static str,
    pub signature: FormalArguments,
    pub kind: BuiltinKind,
}

#[derive(Default)]
pub(crate) struct Registry {
    builtins: HashMap<&'static str, Builtin>,
}

impl Registry {
    pub(crate) fn eager(&mut self, name: &'static str, signature: FormalArguments, func: BuiltinFn) {
        self.builtins.insert(
            name,
            Builtin {
                name,
                signature,
                kind: BuiltinKind::Eager(func),
            },
        );
    }

    pub(crate) fn lazy(&mut self, name: &'static str, signature: FormalArguments, func: LazyBuiltinFn) {
        self.builtins.insert(
            name,
            Builtin {
                name,
                signature,
                kind: BuiltinKind::Lazy(func),
            },
        );
    }
}

static BUILTINS: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();
    color::register(&mut registry);
    list::register(&mut registry);
    math::register(&mut registry);
    string::register(&mut registry);
    registry
});

/// Look up a builtin by its exact (case-sensitive) name
pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.builtins.get(name)
}

// --- argument coercion shared by the builtin families ---

fn type_error(position: &SourcePosition, callee: &str, parameter: &str, value: &Value, expected: &str) -> CompilerError {
    CompilerError::compile(
        position,
        format!("{}: ${}: {} is not a {}", callee, parameter, value, expected),
    )
}

pub(crate) fn expect_color(args: &BoundArguments, name: &str, callee: &str, position: &SourcePosition) -> Result<Color> {
    match args.get(name) {
        Value::Color(color) => Ok(color.clone()),
        Value::Ident(text) => {
            Color::named(text).ok_or_else(|| type_error(position, callee, name, args.get(name), "color"))
        }
        other => Err(type_error(position, callee, name, other, "color")),
    }
}

pub(crate) fn expect_number(args: &BoundArguments, name: &str, callee: &str, position: &SourcePosition) -> Result<Number> {
    match args.get(name) {
        Value::Number(number) => Ok(number.clone()),
        other => Err(type_error(position, callee, name, other, "number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePosition {
        SourcePosition::new("test.scss", 1, 1)
    }

    fn signature() -> FormalArguments {
        FormalArguments::new()
            .required("list")
            .optional("separator", Value::ident("auto"))
    }

    #[test]
    fn test_bind_positional_and_named() {
        let bound = signature()
            .bind(
                "join",
                &[
                    Argument::positional(Value::ident("a")),
                    Argument::named("separator", Value::ident("comma")),
                ],
                &pos(),
            )
            .unwrap();
        assert_eq!(bound.get("list"), &Value::ident("a"));
        assert_eq!(bound.get("separator"), &Value::ident("comma"));
    }

    #[test]
    fn test_defaults_are_marked() {
        let bound = signature()
            .bind("join", &[Argument::positional(Value::ident("a"))], &pos())
            .unwrap();
        let bindings: Vec<_> = bound.bindings().collect();
        assert!(matches!(bindings[1].1, Binding::Default(_)));
    }

    #[test]
    fn test_bind_errors() {
        let sig = signature();
        assert!(sig.bind("f", &[], &pos()).is_err());
        assert!(sig
            .bind("f", &[Argument::named("nope", Value::Null), Argument::positional(Value::Null)], &pos())
            .is_err());
        assert!(sig
            .bind(
                "f",
                &[
                    Argument::positional(Value::Null),
                    Argument::positional(Value::Null),
                    Argument::positional(Value::Null)
                ],
                &pos()
            )
            .is_err());
        assert!(sig
            .bind("f", &[Argument::named("unknown", Value::Null)], &pos())
            .is_err());
        assert!(sig
            .bind("f", &[Argument::positional(Value::Null), Argument::named("list", Value::Null)], &pos())
            .is_err());
    }

    #[test]
    fn test_rest_collects_extra_positionals() {
        let sig = FormalArguments::new().required("first").rest("others");
        let bound = sig
            .bind(
                "f",
                &[
                    Argument::positional(Value::number(1.0, "")),
                    Argument::positional(Value::number(2.0, "")),
                    Argument::positional(Value::number(3.0, "")),
                ],
                &pos(),
            )
            .unwrap();
        assert_eq!(bound.rest().len(), 2);
        assert_eq!(bound.rest_name(), Some("others"));
    }

    #[test]
    fn test_registry_is_case_sensitive() {
        assert!(builtin("darken").is_some());
        assert!(builtin("DARKEN").is_none());
        assert!(builtin("if").is_some());
    }
}
