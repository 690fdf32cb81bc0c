//! Color builtins: channel access, construction and lightness adjustment

use super::{expect_color, expect_number, BoundArguments, FormalArguments, Registry};
use crate::color::Color;
use crate::error::{CompilerError, Result};
use crate::types::SourcePosition;
use crate::value::{Number, Value};

pub(super) fn register(registry: &mut Registry) {
    let color_only = || FormalArguments::new().required("color");
    registry.eager("red", color_only(), |args, pos| {
        channel(expect_color(args, "color", "red", pos)?.red)
    });
    registry.eager("green", color_only(), |args, pos| {
        channel(expect_color(args, "color", "green", pos)?.green)
    });
    registry.eager("blue", color_only(), |args, pos| {
        channel(expect_color(args, "color", "blue", pos)?.blue)
    });
    registry.eager("hue", color_only(), |args, pos| {
        let (h, _, _) = expect_color(args, "color", "hue", pos)?.to_hsl();
        Ok(Value::number(h, "deg"))
    });
    registry.eager("saturation", color_only(), |args, pos| {
        let (_, s, _) = expect_color(args, "color", "saturation", pos)?.to_hsl();
        Ok(Value::number(s, "%"))
    });
    registry.eager("lightness", color_only(), |args, pos| {
        let (_, _, l) = expect_color(args, "color", "lightness", pos)?.to_hsl();
        Ok(Value::number(l, "%"))
    });
    registry.eager("alpha", color_only(), |args, pos| {
        Ok(Value::number(expect_color(args, "color", "alpha", pos)?.alpha, ""))
    });
    registry.eager("opacity", color_only(), |args, pos| {
        Ok(Value::number(expect_color(args, "color", "opacity", pos)?.alpha, ""))
    });

    registry.eager(
        "rgb",
        FormalArguments::new().required("red").required("green").required("blue"),
        |args, pos| {
            let [r, g, b] = rgb_channels(args, "rgb", pos)?;
            Ok(Value::Color(Color::rgba(r, g, b, 1.0)))
        },
    );
    registry.eager(
        "rgba",
        FormalArguments::new()
            .required("red")
            .optional("green", Value::Null)
            .optional("blue", Value::Null)
            .optional("alpha", Value::Null),
        rgba,
    );
    registry.eager(
        "hsl",
        FormalArguments::new()
            .required("hue")
            .required("saturation")
            .required("lightness"),
        |args, pos| hsla_from(args, 1.0, "hsl", pos),
    );
    registry.eager(
        "hsla",
        FormalArguments::new()
            .required("hue")
            .required("saturation")
            .required("lightness")
            .required("alpha"),
        |args, pos| {
            let alpha = expect_number(args, "alpha", "hsla", pos)?.value;
            hsla_from(args, alpha, "hsla", pos)
        },
    );

    let adjust = || FormalArguments::new().required("color").required("amount");
    registry.eager("darken", adjust(), |args, pos| adjust_lightness(args, -1.0, "darken", pos));
    registry.eager("lighten", adjust(), |args, pos| adjust_lightness(args, 1.0, "lighten", pos));
}

fn channel(value: f64) -> Result<Value> {
    Ok(Value::number(value.round(), ""))
}

/// A channel given as a number or a percentage of 255
fn rgb_channel(number: &Number) -> f64 {
    if number.unit == "%" {
        number.value * 2.55
    } else {
        number.value
    }
}

fn rgb_channels(args: &BoundArguments, callee: &str, position: &SourcePosition) -> Result<[f64; 3]> {
    Ok([
        rgb_channel(&expect_number(args, "red", callee, position)?),
        rgb_channel(&expect_number(args, "green", callee, position)?),
        rgb_channel(&expect_number(args, "blue", callee, position)?),
    ])
}

/// `rgba($red, $green, $blue, $alpha)` or `rgba($color, $alpha)`
fn rgba(args: &BoundArguments, position: &SourcePosition) -> Result<Value> {
    let short_form = matches!(args.get("red"), Value::Color(_))
        || (args.get("blue").is_null() && args.get("alpha").is_null());
    if short_form {
        let color = expect_color(args, "red", "rgba", position)?;
        let alpha = expect_number(args, "green", "rgba", position)?;
        return Ok(Value::Color(color.with_alpha(alpha.value)));
    }
    let [r, g, b] = rgb_channels(args, "rgba", position)?;
    let alpha = expect_number(args, "alpha", "rgba", position)?;
    Ok(Value::Color(Color::rgba(r, g, b, alpha.value)))
}

fn hsla_from(args: &BoundArguments, alpha: f64, callee: &str, position: &SourcePosition) -> Result<Value> {
    let h = expect_number(args, "hue", callee, position)?;
    let s = expect_number(args, "saturation", callee, position)?;
    let l = expect_number(args, "lightness", callee, position)?;
    Ok(Value::Color(Color::from_hsla(h.value, s.value, l.value, alpha)))
}

fn adjust_lightness(args: &BoundArguments, sign: f64, callee: &str, position: &SourcePosition) -> Result<Value> {
    let color = expect_color(args, "color", callee, position)?;
    let amount = expect_number(args, "amount", callee, position)?;
    if !(amount.is_unitless() || amount.unit == "%") {
        return Err(CompilerError::compile(
            position,
            format!("{}: $amount: expected a percentage, got {}{}", callee, amount.value, amount.unit),
        ));
    }
    Ok(Value::Color(color.adjust_lightness(sign * amount.value)))
}
