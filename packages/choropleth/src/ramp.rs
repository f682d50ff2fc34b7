//! Color ramps and the map paint expression.

use regioniq_choropleth_models::{ColorDomain, RampKind};
use serde_json::{Value, json};

/// Fill color for regions without data.
pub const NO_DATA_COLOR: &str = "#d1d5db";

/// Light-to-dark blue.
pub const SEQUENTIAL: [&str; 5] = ["#eff6ff", "#bfdbfe", "#60a5fa", "#2563eb", "#1e3a8a"];

/// Red (contraction) through neutral to green (expansion).
pub const DIVERGING: [&str; 5] = ["#b91c1c", "#fca5a5", "#f5f5f4", "#86efac", "#15803d"];

/// Property the paint expression reads the value from.
pub const VALUE_PROPERTY: &str = "value";

/// Value positions of the five ramp colors for `domain`.
///
/// Sequential stops span `min..max` evenly. Diverging stops are
/// symmetric around zero at `±max(|min|, |max|)`. Returns `None` when
/// the stops would not be strictly increasing.
#[must_use]
pub fn stops(domain: &ColorDomain) -> Option<[(f64, &'static str); 5]> {
    let (lo, hi, palette) = match domain.ramp {
        RampKind::Sequential => (domain.min, domain.max, SEQUENTIAL),
        RampKind::Diverging => {
            let m = domain.min.abs().max(domain.max.abs());
            (-m, m, DIVERGING)
        }
    };
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return None;
    }

    let step = (hi - lo) / 4.0;
    let mut out = [(0.0, ""); 5];
    for (i, (slot, color)) in out.iter_mut().zip(palette).enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let at = if i == 4 { hi } else { step.mul_add(i as f64, lo) };
        *slot = (at, color);
    }
    Some(out)
}

/// Color for `value` under `domain`, interpolated in RGB.
#[must_use]
pub fn color_for(value: Option<f64>, domain: Option<&ColorDomain>) -> String {
    let (Some(value), Some(domain)) = (value.filter(|v| v.is_finite()), domain) else {
        return NO_DATA_COLOR.to_string();
    };
    let Some(stops) = stops(domain) else {
        return middle(domain).to_string();
    };

    let value = value.clamp(stops[0].0, stops[4].0);
    for pair in stops.windows(2) {
        let ((x0, c0), (x1, c1)) = (pair[0], pair[1]);
        if value <= x1 {
            return mix(c0, c1, (value - x0) / (x1 - x0));
        }
    }
    stops[4].1.to_string()
}

/// Map paint expression for the fill color.
///
/// Features whose value is null render in [`NO_DATA_COLOR`].
#[must_use]
pub fn paint_expression(domain: Option<&ColorDomain>) -> Value {
    let Some(domain) = domain else {
        return json!(NO_DATA_COLOR);
    };
    let get = json!(["get", VALUE_PROPERTY]);

    let fill = stops(domain).map_or_else(
        || json!(middle(domain)),
        |stops| {
            let mut expr = vec![json!("interpolate"), json!(["linear"]), get.clone()];
            for (at, color) in stops {
                expr.push(json!(at));
                expr.push(json!(color));
            }
            Value::Array(expr)
        },
    );

    json!(["case", ["==", get, null], NO_DATA_COLOR, fill])
}

const fn middle(domain: &ColorDomain) -> &'static str {
    match domain.ramp {
        RampKind::Sequential => SEQUENTIAL[2],
        RampKind::Diverging => DIVERGING[2],
    }
}

fn parse_hex(color: &str) -> [u8; 3] {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .unwrap_or(0)
    };
    [channel(0), channel(2), channel(4)]
}

fn mix(a: &str, b: &str, t: f64) -> String {
    let (a, b) = (parse_hex(a), parse_hex(b));
    let t = t.clamp(0.0, 1.0);
    let channel = |i: usize| {
        let v = (f64::from(b[i]) - f64::from(a[i])).mul_add(t, f64::from(a[i]));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            v.round().clamp(0.0, 255.0) as u8
        }
    };
    format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2))
}
