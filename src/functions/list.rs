//! List builtins

use super::{expect_number, BoundArguments, FormalArguments, Registry};
use crate::error::{CompilerError, Result};
use crate::evaluator::values_equal;
use crate::types::SourcePosition;
use crate::value::{ListSeparator, Value};

pub(super) fn register(registry: &mut Registry) {
    registry.eager(
        "append",
        FormalArguments::new()
            .required("list")
            .required("val")
            .optional("separator", Value::ident("auto")),
        append,
    );
    registry.eager(
        "join",
        FormalArguments::new()
            .required("list1")
            .required("list2")
            .optional("separator", Value::ident("auto")),
        join,
    );
    registry.eager("nth", FormalArguments::new().required("list").required("n"), nth);
    registry.eager("length", FormalArguments::new().required("list"), |args, _| {
        Ok(Value::number(args.get("list").as_list_items().len() as f64, ""))
    });
    registry.eager(
        "index",
        FormalArguments::new().required("list").required("value"),
        |args, _| {
            let needle = args.get("value");
            Ok(args
                .get("list")
                .as_list_items()
                .iter()
                .position(|item| values_equal(item, needle))
                .map_or(Value::Null, |i| Value::number((i + 1) as f64, "")))
        },
    );
}

/// Explicit `comma`/`space`, or `None` for `auto`
fn requested_separator(args: &BoundArguments, callee: &str, position: &SourcePosition) -> Result<Option<ListSeparator>> {
    let value = args.get("separator");
    match value.as_text() {
        Some("auto") => Ok(None),
        Some(name) => ListSeparator::from_name(name).map(Some).ok_or_else(|| {
            CompilerError::compile(
                position,
                format!("{}: $separator must be \"space\", \"comma\" or \"auto\", got {}", callee, value),
            )
        }),
        None => Err(CompilerError::compile(
            position,
            format!("{}: $separator must be a string, got {}", callee, value),
        )),
    }
}

fn decided(separator: ListSeparator) -> Option<ListSeparator> {
    match separator {
        ListSeparator::Undecided => None,
        other => Some(other),
    }
}

fn append(args: &BoundArguments, position: &SourcePosition) -> Result<Value> {
    let list = args.get("list");
    let separator = requested_separator(args, "append", position)?
        .or_else(|| decided(list.separator()))
        .unwrap_or(ListSeparator::Space);
    let mut items = list.as_list_items();
    items.push(args.get("val").clone());
    Ok(Value::list(items, separator))
}

fn join(args: &BoundArguments, position: &SourcePosition) -> Result<Value> {
    let first = args.get("list1");
    let second = args.get("list2");
    let separator = requested_separator(args, "join", position)?
        .or_else(|| decided(first.separator()))
        .or_else(|| decided(second.separator()))
        .unwrap_or(ListSeparator::Space);
    let mut items = first.as_list_items();
    items.extend(second.as_list_items());
    Ok(Value::list(items, separator))
}

fn nth(args: &BoundArguments, position: &SourcePosition) -> Result<Value> {
    let items = args.get("list").as_list_items();
    let n = expect_number(args, "n", "nth", position)?;
    if !n.is_integer() {
        return Err(CompilerError::compile(
            position,
            format!("nth: the index must be an integer, got {}", args.get("n")),
        ));
    }
    let index = n.value.round() as i64;
    if index < 1 || index as usize > items.len() {
        return Err(CompilerError::compile(
            position,
            format!(
                "nth: index {} out of range for list {}",
                index,
                args.get("list")
            ),
        ));
    }
    Ok(items[index as usize - 1].clone())
}
