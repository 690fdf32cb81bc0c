//! Expression evaluation
//!
//! Whether the operators of an expression are arithmetic is decided on the
//! un-substituted expression by [`Value::contains_arithmetical_operator`];
//! [`evaluate`] is told the outcome through its `arithmetic` flag. Without
//! arithmetic every operand is still resolved (variables, functions,
//! interpolation) but the operator tokens are kept as literal CSS.

use crate::ast::{DiagnosticLevel, DiagnosticNode, EachNode, ForNode, FunctionDefinition, Node, NodeKind, VariableNode};
use crate::color::Color;
use crate::context::ScssContext;
use crate::error::{CompilerError, Result};
use crate::functions::{builtin, Binding, BoundArguments, BuiltinKind};
use crate::types::{SourcePosition, MAX_WHILE_ITERATIONS};
use crate::value::{Argument, ExprToken, FunctionCall, InterpPart, Interpolation, ListSeparator, Number, Operator, Value};
use std::rc::Rc;

/// Evaluate `value`. With `arithmetic` set every expression is computed;
/// otherwise each nested expression decides for itself.
pub fn evaluate(value: &Value, context: &mut ScssContext, arithmetic: bool, position: &SourcePosition) -> Result<Value> {
    match value {
        Value::Null | Value::Number(_) | Value::Color(_) | Value::Str { .. } | Value::Ident(_) => Ok(value.clone()),
        Value::Variable(name) => context
            .variable(name)
            .cloned()
            .ok_or_else(|| CompilerError::compile(position, format!("Undefined variable: ${}", name))),
        Value::Interpolated { parts, quote } => {
            let text = interpolate(parts, context, position)?;
            Ok(match quote {
                Some(q) => Value::Str { text, quote: *q },
                None => Value::Ident(text),
            })
        }
        Value::Paren(inner) => evaluate(inner, context, true, position),
        Value::List { items, separator } => {
            let mut evaluated = Vec::with_capacity(items.len());
            for item in items {
                evaluated.push(evaluate(item, context, arithmetic, position)?);
            }
            Ok(Value::list(evaluated, *separator))
        }
        Value::Function(call) => call_function(call, context, position),
        Value::Expression(tokens) => {
            let arithmetic = arithmetic || value.contains_arithmetical_operator();
            evaluate_expression(tokens, context, arithmetic, position)
        }
    }
}

/// Evaluate a value in a context where operators are always arithmetic:
/// conditions, function arguments, `@return` and loop bounds
pub fn evaluate_arithmetic(value: &Value, context: &mut ScssContext, position: &SourcePosition) -> Result<Value> {
    evaluate(value, context, true, position)
}

/// Render an interpolation, evaluating each `#{...}` and unquoting strings
pub fn interpolate(interpolation: &Interpolation, context: &mut ScssContext, position: &SourcePosition) -> Result<String> {
    let mut text = String::new();
    for part in &interpolation.parts {
        match part {
            InterpPart::Literal(literal) => text.push_str(literal),
            InterpPart::Expr(expr) => {
                let value = evaluate_arithmetic(expr, context, position)?;
                text.push_str(&unquoted(&value));
            }
        }
    }
    Ok(text)
}

/// Text of a value with the quotes of a top-level string removed
pub fn unquoted(value: &Value) -> String {
    match value {
        Value::Str { text, .. } => text.clone(),
        other => other.to_string(),
    }
}

// --- expressions ---

/// Split at whitespace that separates two operands; `a -b` also starts a
/// new group at the unary `-`
fn space_groups(tokens: &[ExprToken]) -> Vec<Vec<ExprToken>> {
    let mut groups: Vec<Vec<ExprToken>> = vec![Vec::new()];
    let mut last_was_operand = false;
    let mut after_space = false;

    for (i, token) in tokens.iter().enumerate() {
        let split = match token {
            ExprToken::Whitespace => {
                after_space = true;
                if let Some(group) = groups.last_mut() {
                    group.push(ExprToken::Whitespace);
                }
                continue;
            }
            ExprToken::Operand(_) => last_was_operand && after_space,
            ExprToken::Operator(op) => {
                let attached = matches!(tokens.get(i + 1), Some(ExprToken::Operand(_)));
                last_was_operand && after_space && attached && matches!(op, Operator::Minus | Operator::Plus)
            }
        };
        if split {
            groups.push(Vec::new());
        }
        if let Some(group) = groups.last_mut() {
            group.push(token.clone());
        }
        last_was_operand = matches!(token, ExprToken::Operand(_));
        after_space = false;
    }
    groups.retain(|g| g.iter().any(|t| !matches!(t, ExprToken::Whitespace)));
    groups
}

fn evaluate_expression(
    tokens: &[ExprToken],
    context: &mut ScssContext,
    arithmetic: bool,
    position: &SourcePosition,
) -> Result<Value> {
    let mut values = Vec::new();
    for group in space_groups(tokens) {
        let value = if arithmetic {
            let significant: Vec<&ExprToken> = group.iter().filter(|t| !matches!(t, ExprToken::Whitespace)).collect();
            let mut parser = OperationParser {
                tokens: significant,
                index: 0,
                context: &mut *context,
                position,
            };
            parser.parse_all()?
        } else {
            let mut literal = Vec::with_capacity(group.len());
            for token in group {
                literal.push(match token {
                    ExprToken::Operand(v) => ExprToken::Operand(evaluate(&v, context, false, position)?),
                    other => other,
                });
            }
            Value::expression(literal)
        };
        values.push(value);
    }
    Ok(match values.len() {
        0 => Value::Null,
        1 => values.pop().unwrap_or(Value::Null),
        _ => Value::list(values, ListSeparator::Space),
    })
}

/// Precedence climbing over one space group
struct OperationParser<'a, 't> {
    tokens: Vec<&'t ExprToken>,
    index: usize,
    context: &'a mut ScssContext,
    position: &'a SourcePosition,
}

impl<'a, 't> OperationParser<'a, 't> {
    fn parse_all(&mut self) -> Result<Value> {
        let value = self.parse_binary(1)?;
        if let Some(token) = self.tokens.get(self.index) {
            return Err(CompilerError::compile(
                self.position,
                format!("Unexpected {} in expression", describe(token)),
            ));
        }
        Ok(value)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Value> {
        let mut left = self.parse_unary()?;
        while let Some(ExprToken::Operator(op)) = self.tokens.get(self.index).copied() {
            let op = *op;
            if op == Operator::Not || op.precedence() < min_precedence {
                break;
            }
            self.index += 1;
            let right = self.parse_binary(op.precedence() + 1)?;
            left = apply_binary(op, left, right, self.position)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Value> {
        match self.tokens.get(self.index).copied() {
            Some(ExprToken::Operand(value)) => {
                self.index += 1;
                evaluate(value, self.context, true, self.position)
            }
            Some(ExprToken::Operator(op)) if op.can_be_unary() => {
                let op = *op;
                self.index += 1;
                let operand = self.parse_unary()?;
                Ok(apply_unary(op, operand))
            }
            Some(token) => Err(CompilerError::compile(
                self.position,
                format!("Unexpected {} in expression", describe(token)),
            )),
            None => Err(CompilerError::compile(self.position, "Expected an operand at end of expression")),
        }
    }
}

fn describe(token: &ExprToken) -> String {
    match token {
        ExprToken::Operand(v) => format!("'{}'", v),
        ExprToken::Operator(op) => format!("operator '{}'", op.symbol()),
        ExprToken::Whitespace => "whitespace".to_string(),
    }
}

fn apply_unary(op: Operator, operand: Value) -> Value {
    match (op, operand) {
        (Operator::Not, v) => Value::boolean(!v.is_truthy()),
        (Operator::Minus, Value::Number(n)) => Value::number(-n.value, n.unit),
        (Operator::Plus, v @ Value::Number(_)) => v,
        (op, v) => Value::Ident(format!("{}{}", op.symbol(), v)),
    }
}

fn apply_binary(op: Operator, left: Value, right: Value, position: &SourcePosition) -> Result<Value> {
    match op {
        Operator::And => return Ok(if left.is_truthy() { right } else { left }),
        Operator::Or => return Ok(if left.is_truthy() { left } else { right }),
        Operator::Eq => return Ok(Value::boolean(values_equal(&left, &right))),
        Operator::Ne => return Ok(Value::boolean(!values_equal(&left, &right))),
        _ => {}
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => number_operation(op, &a, &b, position),
        (Value::Color(c), Value::Color(d)) => {
            let combined = match op {
                Operator::Plus => c.combine(&d, |x, y| x + y),
                Operator::Minus => c.combine(&d, |x, y| x - y),
                Operator::Times => c.combine(&d, |x, y| x * y),
                Operator::Div if d.red != 0.0 && d.green != 0.0 && d.blue != 0.0 => c.combine(&d, |x, y| x / y),
                _ => None,
            };
            combined.map(Value::Color).ok_or_else(|| undefined_operation(op, &Value::Color(c), &Value::Color(d), position))
        }
        (Value::Color(c), Value::Number(n)) => {
            let v = n.value;
            match op {
                Operator::Plus => Ok(Value::Color(c.map_channels(|x| x + v))),
                Operator::Minus => Ok(Value::Color(c.map_channels(|x| x - v))),
                Operator::Times => Ok(Value::Color(c.map_channels(|x| x * v))),
                Operator::Div if v != 0.0 => Ok(Value::Color(c.map_channels(|x| x / v))),
                _ => Err(undefined_operation(op, &Value::Color(c), &Value::Number(n), position)),
            }
        }
        (Value::Number(n), Value::Color(c)) if matches!(op, Operator::Plus | Operator::Times) => {
            let v = n.value;
            Ok(Value::Color(match op {
                Operator::Plus => c.map_channels(|x| x + v),
                _ => c.map_channels(|x| x * v),
            }))
        }
        (left, right) => match op {
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => Err(CompilerError::compile(
                position,
                format!("Cannot compare {} and {}: both must be numbers", left, right),
            )),
            Operator::Plus => Ok(concatenate(&left, &right)),
            Operator::Minus | Operator::Div => Ok(Value::Ident(format!("{}{}{}", left, op.symbol(), unquoted(&right)))),
            _ => Err(undefined_operation(op, &left, &right, position)),
        },
    }
}

fn undefined_operation(op: Operator, left: &Value, right: &Value, position: &SourcePosition) -> CompilerError {
    CompilerError::compile(
        position,
        format!("Undefined operation: \"{} {} {}\"", left, op.symbol(), right),
    )
}

/// `+` on strings: the result takes the quoting of the left operand
fn concatenate(left: &Value, right: &Value) -> Value {
    let text = format!("{}{}", unquoted(left), unquoted(right));
    match (left, right) {
        (Value::Str { quote, .. }, _) => Value::Str { text, quote: *quote },
        (Value::Ident(_), _) => Value::Ident(text),
        (_, Value::Str { quote, .. }) => Value::Str { text, quote: *quote },
        _ => Value::Ident(text),
    }
}

fn incompatible_units(a: &Number, b: &Number, position: &SourcePosition) -> CompilerError {
    CompilerError::compile(
        position,
        format!("Incompatible units: '{}' and '{}'", a.unit, b.unit),
    )
}

fn number_operation(op: Operator, a: &Number, b: &Number, position: &SourcePosition) -> Result<Value> {
    let shared_unit = || -> Result<String> {
        if !a.is_comparable(b) {
            return Err(incompatible_units(a, b, position));
        }
        Ok(if a.is_unitless() { b.unit.clone() } else { a.unit.clone() })
    };

    let result = match op {
        Operator::Plus => Value::number(a.value + b.value, shared_unit()?),
        Operator::Minus => Value::number(a.value - b.value, shared_unit()?),
        Operator::Mod => {
            if b.value == 0.0 {
                return Err(CompilerError::compile(position, "Modulo by zero"));
            }
            Value::number(a.value % b.value, shared_unit()?)
        }
        Operator::Times => {
            if !a.is_unitless() && !b.is_unitless() {
                return Err(incompatible_units(a, b, position));
            }
            Value::number(a.value * b.value, shared_unit()?)
        }
        Operator::Div => {
            if b.value == 0.0 {
                return Err(CompilerError::compile(position, "Division by zero"));
            }
            let unit = if a.unit == b.unit {
                String::new()
            } else if b.is_unitless() {
                a.unit.clone()
            } else {
                return Err(incompatible_units(a, b, position));
            };
            Value::number(a.value / b.value, unit)
        }
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
            shared_unit()?;
            Value::boolean(match op {
                Operator::Lt => a.value < b.value,
                Operator::Gt => a.value > b.value,
                Operator::Le => a.value <= b.value,
                _ => a.value >= b.value,
            })
        }
        _ => return Err(undefined_operation(op, &Value::Number(a.clone()), &Value::Number(b.clone()), position)),
    };
    Ok(result)
}

/// Value equality: numbers by value and unit, colors by channels, strings
/// regardless of quoting
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.unit == b.unit && (a.value - b.value).abs() < 1e-9,
        (Value::Color(a), Value::Color(b)) => a.same_color(b),
        (Value::Color(c), Value::Ident(name)) | (Value::Ident(name), Value::Color(c)) => {
            Color::named(name).map_or(false, |named| named.same_color(c))
        }
        (Value::Str { text: a, .. } | Value::Ident(a), Value::Str { text: b, .. } | Value::Ident(b)) => a == b,
        (Value::List { items: a, separator: s }, Value::List { items: b, separator: t }) => {
            s == t && a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (a, b) => a == b,
    }
}

// --- function calls ---

/// Evaluate actual arguments arithmetically and expand `$list...` splats
pub fn evaluate_arguments(args: &[Argument], context: &mut ScssContext, position: &SourcePosition) -> Result<Vec<Argument>> {
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        let value = evaluate_arithmetic(&arg.value, context, position)?;
        if arg.splat {
            evaluated.extend(value.as_list_items().into_iter().map(Argument::positional));
        } else {
            evaluated.push(Argument {
                name: arg.name.clone(),
                value,
                splat: false,
            });
        }
    }
    Ok(evaluated)
}

/// Define bound parameters in the current (callee) scope. Defaults are
/// evaluated here so they can refer to earlier parameters.
pub fn bind_parameters(bound: &BoundArguments, context: &mut ScssContext, position: &SourcePosition) -> Result<()> {
    for (name, binding) in bound.bindings() {
        let value = match binding {
            Binding::Given(value) => value.clone(),
            Binding::Default(default) => evaluate_arithmetic(default, context, position)?,
        };
        context.define_local(name, value);
    }
    if let Some(rest) = bound.rest_name() {
        context.define_local(rest, Value::list(bound.rest().to_vec(), ListSeparator::Comma));
    }
    Ok(())
}

fn call_function(call: &FunctionCall, context: &mut ScssContext, position: &SourcePosition) -> Result<Value> {
    if let Some(function) = context.function(&call.name) {
        let args = evaluate_arguments(&call.args, context, position)?;
        return call_user_function(&function, &args, context, position);
    }

    if let Some(builtin) = builtin(&call.name) {
        log::trace!("Calling builtin {}()", builtin.name);
        return match &builtin.kind {
            BuiltinKind::Eager(func) => {
                let args = evaluate_arguments(&call.args, context, position)?;
                let bound = builtin.signature.bind(&call.name, &args, position)?;
                func(&bound, position)
            }
            BuiltinKind::Lazy(func) => {
                let bound = builtin.signature.bind(&call.name, &call.args, position)?;
                let mut evaluate_branch = |value: &Value| evaluate_arithmetic(value, context, position);
                func(&bound, &mut evaluate_branch)
            }
        };
    }

    // Plain CSS function: keep the call, resolve its arguments
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(Argument {
            name: arg.name.clone(),
            value: evaluate(&arg.value, context, false, position)?,
            splat: arg.splat,
        });
    }
    Ok(Value::Function(FunctionCall {
        name: call.name.clone(),
        args,
    }))
}

pub fn call_user_function(
    function: &Rc<FunctionDefinition>,
    args: &[Argument],
    context: &mut ScssContext,
    position: &SourcePosition,
) -> Result<Value> {
    let bound = function.parameters.bind(&function.name, args, position)?;
    context.enter_call(&function.name, position)?;
    context.open_scope();
    let result = bind_parameters(&bound, context, position).and_then(|_| run_function_body(&function.children, context));
    context.close_scope();
    context.exit_call();

    result?.ok_or_else(|| {
        CompilerError::compile(
            position,
            format!("Function {} finished without @return", function.name),
        )
    })
}

/// Interpret a function body; `Some` once `@return` is reached
fn run_function_body(nodes: &[Node], context: &mut ScssContext) -> Result<Option<Value>> {
    for node in nodes {
        let position = &node.position;
        let returned = match &node.kind {
            NodeKind::Return(value) => Some(evaluate_arithmetic(value, context, position)?),
            NodeKind::Variable(variable) => {
                assign_variable(variable, context, position)?;
                None
            }
            NodeKind::Diagnostic(diagnostic) => {
                emit_diagnostic(diagnostic, context, position)?;
                None
            }
            NodeKind::Comment(_) => None,
            NodeKind::If(node) => {
                let branch = select_branch(&node.branches, context, position)?;
                match branch {
                    Some(children) => scoped(context, |ctx| run_function_body(children, ctx))?,
                    None => None,
                }
            }
            NodeKind::Each(each) => {
                let mut returned = None;
                for item in each_items(each, context, position)? {
                    returned = scoped(context, |ctx| {
                        bind_each_variables(&each.variables, &item, ctx);
                        run_function_body(&each.children, ctx)
                    })?;
                    if returned.is_some() {
                        break;
                    }
                }
                returned
            }
            NodeKind::For(for_node) => {
                let mut returned = None;
                for index in for_range(for_node, context, position)? {
                    returned = scoped(context, |ctx| {
                        ctx.define_local(&for_node.variable, index);
                        run_function_body(&for_node.children, ctx)
                    })?;
                    if returned.is_some() {
                        break;
                    }
                }
                returned
            }
            NodeKind::While(while_node) => {
                let mut returned = None;
                let mut iterations = 0;
                while evaluate_arithmetic(&while_node.condition, context, position)?.is_truthy() {
                    iterations += 1;
                    if iterations > MAX_WHILE_ITERATIONS {
                        return Err(CompilerError::limit("@while iterations", MAX_WHILE_ITERATIONS));
                    }
                    returned = scoped(context, |ctx| run_function_body(&while_node.children, ctx))?;
                    if returned.is_some() {
                        break;
                    }
                }
                returned
            }
            _ => {
                return Err(CompilerError::compile(
                    position,
                    "Functions can only contain variable declarations, control directives and @return",
                ))
            }
        };
        if returned.is_some() {
            return Ok(returned);
        }
    }
    Ok(None)
}

/// Run `body` inside a fresh scope that is closed even when `body` fails
pub fn scoped<T>(context: &mut ScssContext, body: impl FnOnce(&mut ScssContext) -> Result<T>) -> Result<T> {
    context.open_scope();
    let result = body(context);
    context.close_scope();
    result
}

// --- helpers shared with traversal ---

pub fn assign_variable(node: &VariableNode, context: &mut ScssContext, position: &SourcePosition) -> Result<()> {
    if node.default && context.variable(&node.name).map_or(false, |v| !v.is_null()) {
        return Ok(());
    }
    let value = evaluate(&node.value, context, false, position)?;
    log::trace!("${} = {}", node.name, value);
    if node.global {
        context.set_global_variable(&node.name, value);
    } else {
        context.set_variable(&node.name, value);
    }
    Ok(())
}

/// The children of the first `@if`/`@else if` branch whose condition holds
pub fn select_branch<'n>(
    branches: &'n [(Option<Value>, Vec<Node>)],
    context: &mut ScssContext,
    position: &SourcePosition,
) -> Result<Option<&'n [Node]>> {
    for (condition, children) in branches {
        let taken = match condition {
            Some(condition) => evaluate_arithmetic(condition, context, position)?.is_truthy(),
            None => true,
        };
        if taken {
            return Ok(Some(children));
        }
    }
    Ok(None)
}

pub fn each_items(node: &EachNode, context: &mut ScssContext, position: &SourcePosition) -> Result<Vec<Value>> {
    Ok(evaluate(&node.list, context, false, position)?.as_list_items())
}

/// Bind one `@each` item, destructuring it when several variables are named
pub fn bind_each_variables(variables: &[String], item: &Value, context: &mut ScssContext) {
    if let [single] = variables {
        context.define_local(single, item.clone());
        return;
    }
    let parts = item.as_list_items();
    for (i, name) in variables.iter().enumerate() {
        context.define_local(name, parts.get(i).cloned().unwrap_or(Value::Null));
    }
}

/// Bounds beyond this are rejected before counting iterations
const MAX_FOR_BOUND: f64 = 1e15;

/// Loop values of `@for`; `through` includes the end bound, `to` excludes it
pub fn for_range(node: &ForNode, context: &mut ScssContext, position: &SourcePosition) -> Result<Vec<Value>> {
    let bound = |value: &Value, context: &mut ScssContext| -> Result<Number> {
        match evaluate_arithmetic(value, context, position)? {
            Value::Number(n) if n.is_integer() => Ok(n),
            other => Err(CompilerError::compile(
                position,
                format!("@for bounds must be integers, got {}", other),
            )),
        }
    };
    let from = bound(&node.from, context)?;
    let to = bound(&node.to, context)?;
    let as_index = |n: &Number| -> Result<i64> {
        let value = n.value.round();
        if value.is_finite() && value.abs() <= MAX_FOR_BOUND {
            Ok(value as i64)
        } else {
            Err(CompilerError::compile(position, format!("@for bound {} is out of range", n.value)))
        }
    };
    let (start, end) = (as_index(&from)?, as_index(&to)?);
    let unit = if from.is_unitless() { to.unit } else { from.unit };

    let span = start.abs_diff(end);
    let count = if node.inclusive { span + 1 } else { span };
    if count > MAX_WHILE_ITERATIONS as u64 {
        return Err(CompilerError::limit("@for iterations", MAX_WHILE_ITERATIONS));
    }

    let step = if start <= end { 1 } else { -1 };
    Ok((0..count as i64)
        .map(|i| Value::number((start + i * step) as f64, unit.clone()))
        .collect())
}

pub fn emit_diagnostic(node: &DiagnosticNode, context: &mut ScssContext, position: &SourcePosition) -> Result<()> {
    let message = unquoted(&evaluate_arithmetic(&node.message, context, position)?);
    match node.level {
        DiagnosticLevel::Warn => context.warn(position, format!("WARNING: {}", message)),
        DiagnosticLevel::Debug => log::debug!("{}: DEBUG: {}", position, message),
        DiagnosticLevel::Error => return Err(CompilerError::compile(position, message)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UrlMode;

    fn pos() -> SourcePosition {
        SourcePosition::new("test.scss", 1, 1)
    }

    fn num(v: f64, unit: &str) -> ExprToken {
        ExprToken::Operand(Value::number(v, unit))
    }

    fn var(name: &str) -> ExprToken {
        ExprToken::Operand(Value::Variable(name.to_string()))
    }

    fn op(o: Operator) -> ExprToken {
        ExprToken::Operator(o)
    }

    const WS: ExprToken = ExprToken::Whitespace;

    fn context() -> ScssContext {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable("x", Value::number(10.0, "px"));
        ctx
    }

    fn eval(tokens: Vec<ExprToken>) -> Result<Value> {
        evaluate(&Value::expression(tokens), &mut context(), false, &pos())
    }

    #[test]
    fn test_division_with_variable_is_arithmetic() {
        let result = eval(vec![var("x"), op(Operator::Div), num(2.0, "")]).unwrap();
        assert_eq!(result.to_string(), "5px");
    }

    #[test]
    fn test_literal_division_is_kept() {
        let result = eval(vec![num(10.0, "px"), op(Operator::Div), num(2.0, "")]).unwrap();
        assert_eq!(result.to_string(), "10px/2");
    }

    #[test]
    fn test_precedence() {
        let result = eval(vec![
            num(1.0, "px"), WS, op(Operator::Plus), WS, num(2.0, ""), WS, op(Operator::Times), WS, num(3.0, ""),
        ])
        .unwrap();
        assert_eq!(result, Value::number(7.0, "px"));
    }

    #[test]
    fn test_unit_mismatch_is_an_error() {
        let result = eval(vec![num(1.0, "px"), WS, op(Operator::Plus), WS, num(2.0, "em")]);
        assert!(matches!(result, Err(CompilerError::Compile { .. })));
    }

    #[test]
    fn test_division_by_zero() {
        let result = evaluate(
            &Value::Paren(Box::new(Value::expression(vec![num(1.0, ""), op(Operator::Div), num(0.0, "")]))),
            &mut context(),
            false,
            &pos(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_space_separated_operands_form_a_list() {
        let result = eval(vec![var("x"), WS, ExprToken::Operand(Value::ident("solid")), WS, op(Operator::Minus), var("x")])
            .unwrap();
        assert_eq!(result.to_string(), "10px solid -10px");
    }

    #[test]
    fn test_comparison_and_logic() {
        let result = eval(vec![var("x"), WS, op(Operator::Gt), WS, num(5.0, "px")]).unwrap();
        assert_eq!(result, Value::boolean(true));
        let result = eval(vec![var("x"), WS, op(Operator::Eq), WS, num(10.0, "px")]).unwrap();
        assert_eq!(result, Value::boolean(true));
        let result = eval(vec![op(Operator::Not), WS, var("x")]).unwrap();
        assert_eq!(result, Value::boolean(false));
    }

    #[test]
    fn test_string_concatenation() {
        let result = eval(vec![
            ExprToken::Operand(Value::quoted("foo")), WS, op(Operator::Plus), WS, ExprToken::Operand(Value::ident("bar")),
        ])
        .unwrap();
        assert_eq!(result.to_string(), "\"foobar\"");
    }

    #[test]
    fn test_lazy_if_skips_untaken_branch() {
        let call = Value::Function(FunctionCall {
            name: "if".into(),
            args: vec![
                Argument::positional(Value::boolean(true)),
                Argument::positional(Value::number(1.0, "")),
                Argument::positional(Value::Paren(Box::new(Value::expression(vec![
                    num(1.0, ""),
                    op(Operator::Div),
                    num(0.0, ""),
                ])))),
            ],
        });
        let result = evaluate(&call, &mut context(), false, &pos()).unwrap();
        assert_eq!(result, Value::number(1.0, ""));
    }

    #[test]
    fn test_unknown_function_is_kept() {
        let call = Value::Function(FunctionCall {
            name: "translate".into(),
            args: vec![Argument::positional(Value::Variable("x".into()))],
        });
        let result = evaluate(&call, &mut context(), false, &pos()).unwrap();
        assert_eq!(result.to_string(), "translate(10px)");
    }

    #[test]
    fn test_undefined_variable() {
        let result = evaluate(&Value::Variable("missing".into()), &mut context(), false, &pos());
        assert!(result.is_err());
    }

    #[test]
    fn test_for_range_directions() {
        let node = |from: f64, to: f64, inclusive: bool| ForNode {
            variable: "i".into(),
            from: Value::number(from, ""),
            to: Value::number(to, ""),
            inclusive,
            children: Vec::new(),
        };
        let mut ctx = context();
        let render = |values: Vec<Value>| values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(render(for_range(&node(1.0, 3.0, true), &mut ctx, &pos()).unwrap()), "1,2,3");
        assert_eq!(render(for_range(&node(1.0, 3.0, false), &mut ctx, &pos()).unwrap()), "1,2");
        assert_eq!(render(for_range(&node(3.0, 1.0, true), &mut ctx, &pos()).unwrap()), "3,2,1");
        assert_eq!(render(for_range(&node(3.0, 1.0, false), &mut ctx, &pos()).unwrap()), "3,2");
        assert_eq!(render(for_range(&node(2.0, 2.0, false), &mut ctx, &pos()).unwrap()), "");

        assert!(matches!(
            for_range(&node(1.0, 50_000_000.0, true), &mut ctx, &pos()),
            Err(CompilerError::LimitExceeded { .. })
        ));
        assert!(matches!(
            for_range(&node(-1.0, MAX_WHILE_ITERATIONS as f64 - 1.0, false), &mut ctx, &pos()),
            Ok(values) if values.len() == MAX_WHILE_ITERATIONS
        ));
        assert!(matches!(
            for_range(&node(1.0, 1e20, true), &mut ctx, &pos()),
            Err(CompilerError::Compile { .. })
        ));
    }

    #[test]
    fn test_for_with_huge_bound_is_an_error() {
        let result = crate::compile_source(
            "$n: 1000000000 * 1000000000 * 100; @for $i from 1 through $n { .a-#{$i} { b: c; } }",
            "main.scss",
        );
        assert!(matches!(result, Err(CompilerError::Compile { .. })));
    }

    #[test]
    fn test_interpolation_unquotes_strings() {
        let mut ctx = context();
        ctx.set_variable("name", Value::quoted("icon"));
        let interpolation = Interpolation {
            parts: vec![
                InterpPart::Literal(".".into()),
                InterpPart::Expr(Value::Variable("name".into())),
                InterpPart::Literal("-large".into()),
            ],
        };
        assert_eq!(interpolate(&interpolation, &mut ctx, &pos()).unwrap(), ".icon-large");
    }
}
