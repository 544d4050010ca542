//! ASCII bar charts for text summaries.
//!
//! This is intentionally "dumb" (fixed-width rows), optimized for:
//! - quick visual sanity checks in a terminal or a `.txt` report
//! - deterministic output (helpful for golden tests)

/// Render one horizontal bar per `(label, value)`.
///
/// Bars are scaled so the largest value spans `width` columns. Negative and
/// non-finite values draw as empty bars.
pub fn render_bar_chart(title: &str, bars: &[(String, f64)], width: usize) -> String {
    let width = width.max(10);
    let label_width = bars.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let max = bars
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    for (label, value) in bars {
        let filled = bar_len(*value, max, width);
        out.push_str(&format!(
            "  {label:<label_width$} |{}{}| {:.0}\n",
            "#".repeat(filled),
            " ".repeat(width - filled),
            if value.is_finite() { *value } else { 0.0 },
        ));
    }

    out
}

fn bar_len(value: f64, max: f64, width: usize) -> usize {
    if !(value.is_finite() && value > 0.0 && max > 0.0) {
        return 0;
    }
    let len = (value / max * width as f64).round() as usize;
    // Any positive value gets at least one cell.
    len.clamp(1, width)
}
