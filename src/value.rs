//! Value model for SCSS expressions
//!
//! Values are immutable once built. Un-evaluated forms (`Variable`,
//! `Expression`, `Interpolated`) are produced by the parser and replaced by
//! concrete values during traversal.

use crate::color::Color;
use crate::importer::prefix_url_path;
use crate::types::NUMBER_PRECISION;
use std::fmt;

/// A number with an optional unit (`""` means unitless)
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub value: f64,
    pub unit: String,
}

impl Number {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, "")
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_empty()
    }

    pub fn is_integer(&self) -> bool {
        (self.value - self.value.round()).abs() < 1e-9
    }

    /// Units are compatible when equal or when either side has none
    pub fn is_comparable(&self, other: &Number) -> bool {
        self.unit == other.unit || self.is_unitless() || other.is_unitless()
    }
}

/// Print a number with at most [`NUMBER_PRECISION`] decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    let factor = 10f64.powi(NUMBER_PRECISION);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{:.*}", NUMBER_PRECISION as usize, rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSeparator {
    Space,
    Comma,
    /// Empty or single-item list whose separator has not been fixed yet
    Undecided,
}

impl ListSeparator {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "space" => Some(Self::Space),
            "comma" => Some(Self::Comma),
            _ => None,
        }
    }

    fn joiner(self) -> &'static str {
        match self {
            ListSeparator::Comma => ", ",
            _ => " ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Times => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
        }
    }

    /// Binding strength for binary use; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Eq | Operator::Ne => 3,
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => 4,
            Operator::Plus | Operator::Minus => 5,
            Operator::Times | Operator::Div | Operator::Mod => 6,
            Operator::Not => 7,
        }
    }

    pub fn can_be_unary(self) -> bool {
        matches!(self, Operator::Minus | Operator::Plus | Operator::Not)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    Operand(Value),
    Operator(Operator),
    Whitespace,
}

/// An actual argument of a function call or mixin include
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Value,
    /// `$list...` expands into positional arguments
    pub splat: bool,
}

impl Argument {
    pub fn positional(value: Value) -> Self {
        Self {
            name: None,
            value,
            splat: false,
        }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
            splat: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpPart {
    Literal(String),
    Expr(Value),
}

/// Text fragments interleaved with `#{...}` expressions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interpolation {
    pub parts: Vec<InterpPart>,
}

impl Interpolation {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            parts: vec![InterpPart::Literal(text.into())],
        }
    }

    pub fn is_plain(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, InterpPart::Literal(_)))
    }

    /// Text of a plain interpolation; `None` while expressions remain
    pub fn as_plain(&self) -> Option<String> {
        if !self.is_plain() {
            return None;
        }
        Some(self.to_string())
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                InterpPart::Literal(text) => write!(f, "{}", text)?,
                InterpPart::Expr(value) => write!(f, "#{{{}}}", value)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(Number),
    Color(Color),
    /// Quoted string; the text is kept as written between the quotes
    Str { text: String, quote: char },
    /// Identifier or unquoted string
    Ident(String),
    Variable(String),
    Function(FunctionCall),
    List {
        items: Vec<Value>,
        separator: ListSeparator,
    },
    Expression(Vec<ExprToken>),
    Paren(Box<Value>),
    Interpolated {
        parts: Interpolation,
        quote: Option<char>,
    },
}

impl Value {
    pub fn number(value: f64, unit: impl Into<String>) -> Self {
        Value::Number(Number::new(value, unit))
    }

    pub fn ident(text: impl Into<String>) -> Self {
        Value::Ident(text.into())
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Value::Str {
            text: text.into(),
            quote: '"',
        }
    }

    pub fn boolean(flag: bool) -> Self {
        Value::Ident(if flag { "true" } else { "false" }.to_string())
    }

    pub fn list(items: Vec<Value>, separator: ListSeparator) -> Self {
        Value::List { items, separator }
    }

    /// Build an expression, trimming surrounding whitespace. A single
    /// remaining item is returned as-is rather than wrapped.
    pub fn expression(mut tokens: Vec<ExprToken>) -> Self {
        while matches!(tokens.last(), Some(ExprToken::Whitespace)) {
            tokens.pop();
        }
        while matches!(tokens.first(), Some(ExprToken::Whitespace)) {
            tokens.remove(0);
        }
        if tokens.is_empty() {
            return Value::Null;
        }
        if tokens.len() == 1 && matches!(tokens[0], ExprToken::Operand(_)) {
            if let Some(ExprToken::Operand(value)) = tokens.pop() {
                return value;
            }
        }
        Value::Expression(tokens)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `false` and `null` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Ident(text) => text != "false",
            _ => true,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Value::Variable(_))
    }

    /// True if `#{...}` remains anywhere inside
    pub fn has_interpolation(&self) -> bool {
        match self {
            Value::Interpolated { parts, .. } => !parts.is_plain(),
            Value::List { items, .. } => items.iter().any(Value::has_interpolation),
            Value::Function(call) => call.args.iter().any(|a| a.value.has_interpolation()),
            Value::Paren(inner) => inner.has_interpolation(),
            Value::Expression(tokens) => tokens.iter().any(|t| match t {
                ExprToken::Operand(v) => v.has_interpolation(),
                _ => false,
            }),
            _ => false,
        }
    }

    /// Decide, before variables are substituted, whether the operators of an
    /// expression are arithmetic or literal CSS syntax.
    ///
    /// `/` counts only when a neighbouring operand is a variable reference;
    /// every other operator counts unless a neighbour is interpolated.
    /// A parenthesized operand always counts.
    pub fn contains_arithmetical_operator(&self) -> bool {
        let tokens = match self {
            Value::Expression(tokens) => tokens,
            Value::Paren(_) => return true,
            _ => return false,
        };
        let significant: Vec<&ExprToken> = tokens
            .iter()
            .filter(|t| !matches!(t, ExprToken::Whitespace))
            .collect();

        for (i, token) in significant.iter().enumerate() {
            match token {
                ExprToken::Operand(value) => {
                    if matches!(value, Value::Paren(_)) || value.contains_arithmetical_operator() {
                        return true;
                    }
                }
                ExprToken::Operator(op) => {
                    let previous = operand_at(&significant, i.checked_sub(1));
                    let next = operand_at(&significant, Some(i + 1));
                    match (previous, next) {
                        (Some(left), Some(right)) => {
                            if left.has_interpolation() || right.has_interpolation() {
                                continue;
                            }
                            if *op != Operator::Div || left.is_variable() || right.is_variable() {
                                return true;
                            }
                        }
                        (None, Some(right)) if op.can_be_unary() => {
                            if !right.has_interpolation() {
                                return true;
                            }
                        }
                        _ => {}
                    }
                }
                ExprToken::Whitespace => {}
            }
        }
        false
    }

    /// Items of a list; a single value is a one-item list, `null` an empty one
    pub fn as_list_items(&self) -> Vec<Value> {
        match self {
            Value::List { items, .. } => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List { separator, .. } => *separator,
            _ => ListSeparator::Undecided,
        }
    }

    /// Text of a string or identifier
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Str { text, .. } | Value::Ident(text) => Some(text),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Color(_) => "color",
            Value::Ident(text) if text == "true" || text == "false" => "bool",
            Value::Ident(text) if Color::named(text).is_some() => "color",
            Value::Str { .. } | Value::Ident(_) | Value::Interpolated { .. } => "string",
            Value::List { .. } => "list",
            Value::Function(_) => "string",
            Value::Variable(_) | Value::Expression(_) | Value::Paren(_) => "expression",
        }
    }

    /// True for a value consisting of exactly one `url(...)` call
    pub fn is_single_url(&self) -> bool {
        matches!(self, Value::Function(call) if call.name.eq_ignore_ascii_case("url"))
    }

    /// Prefix every relative path inside `url(...)` with `prefix`
    pub fn update_url(&self, prefix: &str) -> Value {
        match self {
            Value::Function(call) if call.name.eq_ignore_ascii_case("url") && call.args.len() == 1 => {
                let rewritten = match &call.args[0].value {
                    Value::Str { text, quote } => Value::Str {
                        text: prefix_url_path(prefix, text),
                        quote: *quote,
                    },
                    Value::Ident(text) => Value::Ident(prefix_url_path(prefix, text)),
                    Value::Interpolated { parts, quote } => match parts.as_plain() {
                        Some(text) => Value::Interpolated {
                            parts: Interpolation::literal(prefix_url_path(prefix, &text)),
                            quote: *quote,
                        },
                        None => return self.clone(),
                    },
                    _ => return self.clone(),
                };
                Value::Function(FunctionCall {
                    name: call.name.clone(),
                    args: vec![Argument::positional(rewritten)],
                })
            }
            Value::List { items, separator } => Value::List {
                items: items.iter().map(|v| v.update_url(prefix)).collect(),
                separator: *separator,
            },
            Value::Expression(tokens) => Value::Expression(
                tokens
                    .iter()
                    .map(|t| match t {
                        ExprToken::Operand(v) => ExprToken::Operand(v.update_url(prefix)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn operand_at<'a>(tokens: &[&'a ExprToken], index: Option<usize>) -> Option<&'a Value> {
    match index.and_then(|i| tokens.get(i)) {
        Some(ExprToken::Operand(v)) => Some(v),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}{}", format_number(n.value), n.unit),
            Value::Color(c) => write!(f, "{}", c),
            Value::Str { text, quote } => write!(f, "{}{}{}", quote, text, quote),
            Value::Ident(text) => write!(f, "{}", text),
            Value::Variable(name) => write!(f, "${}", name),
            Value::Function(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &arg.name {
                        write!(f, "${}: ", name)?;
                    }
                    write!(f, "{}", arg.value)?;
                    if arg.splat {
                        write!(f, "...")?;
                    }
                }
                write!(f, ")")
            }
            Value::List { items, separator } => {
                let mut first = true;
                for item in items.iter().filter(|v| !v.is_null()) {
                    if !first {
                        write!(f, "{}", separator.joiner())?;
                    }
                    first = false;
                    let nested_comma = matches!(
                        item,
                        Value::List { separator: ListSeparator::Comma, items } if items.len() > 1
                    );
                    if nested_comma && *separator != ListSeparator::Comma {
                        write!(f, "({})", item)?;
                    } else {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Expression(tokens) => {
                for token in tokens {
                    match token {
                        ExprToken::Operand(v) => write!(f, "{}", v)?,
                        ExprToken::Operator(op) => write!(f, "{}", op.symbol())?,
                        ExprToken::Whitespace => write!(f, " ")?,
                    }
                }
                Ok(())
            }
            Value::Paren(inner) => write!(f, "({})", inner),
            Value::Interpolated { parts, quote } => match quote {
                Some(q) => write!(f, "{}{}{}", q, parts, q),
                None => write!(f, "{}", parts),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> ExprToken {
        ExprToken::Operand(Value::Variable(name.to_string()))
    }

    fn num(v: f64, unit: &str) -> ExprToken {
        ExprToken::Operand(Value::number(v, unit))
    }

    fn op(o: Operator) -> ExprToken {
        ExprToken::Operator(o)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33333");
        assert_eq!(format_number(-0.000001), "0");
        assert_eq!(format_number(12.50), "12.5");
    }

    #[test]
    fn test_single_item_expression_degenerates() {
        let value = Value::expression(vec![
            ExprToken::Whitespace,
            num(3.0, "px"),
            ExprToken::Whitespace,
        ]);
        assert_eq!(value, Value::number(3.0, "px"));
    }

    #[test]
    fn test_division_needs_variable_operand() {
        let literal = Value::expression(vec![num(10.0, "px"), op(Operator::Div), num(2.0, "")]);
        assert!(!literal.contains_arithmetical_operator());
        assert_eq!(literal.to_string(), "10px/2");

        let with_var = Value::expression(vec![var("x"), op(Operator::Div), num(2.0, "")]);
        assert!(with_var.contains_arithmetical_operator());
    }

    #[test]
    fn test_other_operators_are_arithmetic() {
        let sum = Value::expression(vec![
            num(1.0, "px"),
            ExprToken::Whitespace,
            op(Operator::Plus),
            ExprToken::Whitespace,
            num(2.0, "px"),
        ]);
        assert!(sum.contains_arithmetical_operator());
        assert_eq!(sum.to_string(), "1px + 2px");
    }

    #[test]
    fn test_interpolation_blocks_arithmetic() {
        let interpolated = Value::Interpolated {
            parts: Interpolation {
                parts: vec![InterpPart::Expr(Value::Variable("a".into()))],
            },
            quote: None,
        };
        let expr = Value::expression(vec![
            ExprToken::Operand(interpolated),
            op(Operator::Div),
            var("b"),
        ]);
        assert!(!expr.contains_arithmetical_operator());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::boolean(false).is_truthy());
        assert!(Value::number(0.0, "").is_truthy());
        assert!(Value::quoted("").is_truthy());
    }

    #[test]
    fn test_list_rendering() {
        let list = Value::list(
            vec![Value::number(1.0, "px"), Value::Null, Value::ident("solid")],
            ListSeparator::Space,
        );
        assert_eq!(list.to_string(), "1px solid");
        let commas = Value::list(
            vec![Value::ident("a"), Value::quoted("b")],
            ListSeparator::Comma,
        );
        assert_eq!(commas.to_string(), "a, \"b\"");
    }

    #[test]
    fn test_update_url() {
        let url = Value::Function(FunctionCall {
            name: "url".into(),
            args: vec![Argument::positional(Value::Ident("img/a.png".into()))],
        });
        assert_eq!(url.update_url("theme/").to_string(), "url(theme/img/a.png)");
        let absolute = Value::Function(FunctionCall {
            name: "url".into(),
            args: vec![Argument::positional(Value::quoted("http://x/a.png"))],
        });
        assert_eq!(absolute.update_url("theme/").to_string(), "url(\"http://x/a.png\")");
    }
}
