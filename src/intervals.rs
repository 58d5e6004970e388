//! Timeline tick placement and labels.

use crate::space::View;

/// Choose a "nice" interval (power-of-ten multiplier) for a target interval.
pub fn nice_interval(interval: f64) -> f64 {
    if !interval.is_finite() || interval <= 0.0 {
        return 0.0;
    }

    let log10 = interval.log10().floor();
    let base = 10.0f64.powf(log10);
    let ratio = interval / base;
    if ratio <= 1.0 {
        base
    } else if ratio <= 2.0 {
        base * 2.0
    } else if ratio <= 5.0 {
        base * 5.0
    } else {
        base * 10.0
    }
}

/// Trace units covered by `spacing_px` device pixels at the current zoom.
pub fn target_interval(view_width: f64, physical_width: f64, spacing_px: f64, dpr: f64) -> f64 {
    if physical_width <= 0.0 {
        return 0.0;
    }
    spacing_px * dpr * view_width / physical_width
}

/// Fills `results` with tick positions (relative to the trace origin)
/// covering `view`, starting one interval before its left edge. Unused slots
/// are set to `None`. Returns the interval used, or 0 when no ticks fit.
pub fn compute_timeline_intervals(view: &View, target: f64, results: &mut [Option<f64>]) -> f64 {
    let interval = nice_interval(target);
    results.fill(None);
    if interval <= 0.0 {
        return 0.0;
    }

    let mut x = (view.x / interval).ceil() * interval;
    if x > 0.0 {
        x -= interval;
    }
    for slot in results.iter_mut() {
        if x > view.right() {
            break;
        }
        *slot = Some(x);
        x += interval;
    }
    interval
}

/// Format a time label for the given `relative_ns` value using the
/// magnitude of `nice_interval` to choose an appropriate unit.
pub fn format_time_label(relative_ns: f64, nice_interval: f64) -> String {
    if nice_interval >= 1_000_000_000.0 {
        format!("{:.2} s", relative_ns / 1_000_000_000.0)
    } else if nice_interval >= 1_000_000.0 {
        format!("{:.2} ms", relative_ns / 1_000_000.0)
    } else if nice_interval >= 1_000.0 {
        format!("{:.2} µs", relative_ns / 1_000.0)
    } else {
        format!("{:.0} ns", relative_ns)
    }
}
