//! Numeric builtins

use super::{expect_number, BoundArguments, FormalArguments, Registry};
use crate::error::{CompilerError, Result};
use crate::types::SourcePosition;
use crate::value::{Number, Value};

pub(super) fn register(registry: &mut Registry) {
    let numbers = || FormalArguments::new().rest("numbers");
    registry.eager("min", numbers(), |args, pos| extreme(args, "min", pos, |a, b| a < b));
    registry.eager("max", numbers(), |args, pos| extreme(args, "max", pos, |a, b| a > b));

    let single = || FormalArguments::new().required("number");
    registry.eager("abs", single(), |args, pos| rounding(args, "abs", pos, f64::abs));
    registry.eager("ceil", single(), |args, pos| rounding(args, "ceil", pos, f64::ceil));
    registry.eager("floor", single(), |args, pos| rounding(args, "floor", pos, f64::floor));
    registry.eager("round", single(), |args, pos| rounding(args, "round", pos, f64::round));

    registry.eager("percentage", single(), |args, pos| {
        let number = expect_number(args, "number", "percentage", pos)?;
        if !number.is_unitless() {
            return Err(CompilerError::compile(
                pos,
                format!("percentage: $number: expected a unitless number, got {}", args.get("number")),
            ));
        }
        Ok(Value::number(number.value * 100.0, "%"))
    });
    registry.eager("unit", single(), |args, pos| {
        let number = expect_number(args, "number", "unit", pos)?;
        Ok(Value::quoted(number.unit))
    });
    registry.eager("unitless", single(), |args, pos| {
        Ok(Value::boolean(expect_number(args, "number", "unitless", pos)?.is_unitless()))
    });
    registry.eager(
        "comparable",
        FormalArguments::new().required("number1").required("number2"),
        |args, _| {
            let comparable = match (args.get("number1"), args.get("number2")) {
                (Value::Number(a), Value::Number(b)) => a.is_comparable(b),
                _ => false,
            };
            Ok(Value::boolean(comparable))
        },
    );
}

/// Pick the smallest or largest argument; the winner keeps its own unit
fn extreme(
    args: &BoundArguments,
    callee: &str,
    position: &SourcePosition,
    better: fn(f64, f64) -> bool,
) -> Result<Value> {
    let mut numbers = Vec::with_capacity(args.rest().len());
    for value in args.rest() {
        match value {
            Value::Number(n) => numbers.push(n),
            other => {
                return Err(CompilerError::compile(
                    position,
                    format!("{}: the arguments must be numbers, got {}", callee, other),
                ))
            }
        }
    }
    let mut best: Option<&Number> = None;
    for number in numbers {
        best = match best {
            Some(current) if !better(number.value, current.value) => Some(current),
            _ => Some(number),
        };
    }
    best.map(|n| Value::Number(n.clone())).ok_or_else(|| {
        CompilerError::compile(position, format!("{}: at least one argument is required", callee))
    })
}

fn rounding(args: &BoundArguments, callee: &str, position: &SourcePosition, op: fn(f64) -> f64) -> Result<Value> {
    let number = expect_number(args, "number", callee, position)?;
    Ok(Value::number(op(number.value), number.unit))
}
