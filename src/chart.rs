use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::debug;

use crate::reconcile::FundReport;

const WIDTH: f64 = 1680.0;
const HEIGHT: f64 = 630.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 60.0;
// room for the rotated date labels
const MARGIN_BOTTOM: f64 = 120.0;
const Y_TICKS: usize = 6;
/// Only every n-th date gets an x axis label.
pub const MAJOR_LABEL_STEP: usize = 7;
const DOT_RADIUS: f64 = 5.0;
const RATE_COLOR: &str = "#348dc1";
const PURCHASE_COLOR: &str = "#ff9933";

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn format_gain(gain: Option<f64>) -> String {
    match gain {
        Some(gain) if gain.fract() == 0.0 => format!("{:.1}%", gain),
        Some(gain) => format!("{}%", gain),
        None => "-".to_string(),
    }
}

fn x_positions(len: usize) -> Vec<f64> {
    let inner_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    match len {
        0 => Vec::new(),
        1 => vec![MARGIN_LEFT + inner_width / 2.0],
        _ => (0..len)
            .map(|i| MARGIN_LEFT + inner_width * (i as f64 / (len - 1) as f64))
            .collect(),
    }
}

fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let (min_v, max_v) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min_v.is_finite() || !max_v.is_finite() {
        return None;
    }
    if min_v == max_v {
        let adjust = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.1 };
        return Some((min_v - adjust, max_v + adjust));
    }
    Some((min_v, max_v))
}

fn scale_y(value: f64, (min_v, max_v): (f64, f64)) -> f64 {
    let inner_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let norm = (value - min_v) / (max_v - min_v);
    MARGIN_TOP + (1.0 - norm) * inner_height
}

fn svg_header() -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#555}}.title{{font-size:18px;fill:#222}}.axis-title{{font-size:13px;fill:#333}}</style><rect width="100%" height="100%" fill="#fff" />"##,
        w = WIDTH,
        h = HEIGHT
    )
}

fn add_titles(svg: &mut String, fund_name: &str, best_gain: f64) {
    svg.push_str(&format!(
        r#"<text class="title" x="{x:.2}" y="32" text-anchor="middle">{title} rate</text>"#,
        x = WIDTH / 2.0,
        title = escape_xml(fund_name)
    ));
    svg.push_str(&format!(
        r#"<text class="axis-title" x="{x:.2}" y="{y:.2}" text-anchor="middle">Date</text>"#,
        x = MARGIN_LEFT + (WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / 2.0,
        y = HEIGHT - 12.0
    ));
    let y = MARGIN_TOP + (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / 2.0;
    svg.push_str(&format!(
        r#"<text class="axis-title" x="20" y="{y:.2}" text-anchor="middle" transform="rotate(-90 20 {y:.2})">Best gain: {gain}%</text>"#,
        y = y,
        gain = best_gain
    ));
}

fn add_y_axis(svg: &mut String, range: (f64, f64)) {
    let (min_v, max_v) = range;
    for i in 0..Y_TICKS {
        let value = min_v + (max_v - min_v) * i as f64 / (Y_TICKS - 1) as f64;
        let y = scale_y(value, range);
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#e5e5e5" stroke-width="1" />"##,
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            y = y
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{value:.4}</text>"#,
            x = MARGIN_LEFT - 8.0,
            y = y + 4.0,
            value = value
        ));
    }
}

fn add_x_axis(svg: &mut String, days: &[&String], xs: &[f64]) {
    let axis_y = HEIGHT - MARGIN_BOTTOM;
    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = MARGIN_LEFT,
        x2 = WIDTH - MARGIN_RIGHT,
        y = axis_y
    ));

    for (day, x) in days.iter().zip(xs).step_by(MAJOR_LABEL_STEP) {
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#ccc" stroke-width="1" />"##,
            x = x,
            y1 = axis_y,
            y2 = axis_y + 5.0
        ));
        let y = axis_y + 16.0;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end" transform="rotate(-45 {x:.2} {y:.2})">{label}</text>"#,
            x = x,
            y = y,
            label = escape_xml(day)
        ));
    }
}

/// Renders the rate line with purchase markers as a standalone SVG document.
pub fn render_chart(fund_name: &str, report: &FundReport) -> String {
    let days = report.days.keys().collect::<Vec<_>>();
    let records = report.days.values().collect::<Vec<_>>();
    let xs = x_positions(days.len());

    let mut svg = svg_header();
    add_titles(&mut svg, fund_name, report.best_gain());

    let values = records
        .iter()
        .flat_map(|record| [record.rate, record.purchase_rate])
        .flatten();
    let Some(range) = extent(values) else {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">No data</text></svg>"#,
            x = WIDTH / 2.0,
            y = HEIGHT / 2.0
        ));
        return svg;
    };

    add_y_axis(&mut svg, range);
    add_x_axis(&mut svg, &days, &xs);

    // the rate line joins over days without a quote
    let points = records
        .iter()
        .zip(&xs)
        .filter_map(|(record, x)| record.rate.map(|rate| (*x, scale_y(rate, range))))
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .join(" ");
    if !points.is_empty() {
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}"><title>Rate</title></polyline>"#,
            color = RATE_COLOR,
            points = points
        ));
    }

    for ((day, record), x) in days.iter().zip(&records).zip(&xs) {
        let Some(purchase_rate) = record.purchase_rate else {
            continue;
        };
        let y = scale_y(purchase_rate, range);
        let label = format_gain(record.purchase_gain_percent);
        svg.push_str(&format!(
            r#"<circle cx="{x:.2}" cy="{y:.2}" r="{r}" fill="{color}"><title>Purchase {day}: {rate} ({label})</title></circle>"#,
            x = x,
            y = y,
            r = DOT_RADIUS,
            color = PURCHASE_COLOR,
            day = escape_xml(day),
            rate = purchase_rate,
            label = label
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" fill="{color}">{label}</text>"#,
            x = x,
            y = y - DOT_RADIUS - 6.0,
            color = PURCHASE_COLOR,
            label = label
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Writes `<dir>/<fund_name>.svg`, replacing any previous chart.
pub fn write_chart(dir: &Path, fund_name: &str, report: &FundReport) -> Result<PathBuf> {
    let path = dir.join(format!("{}.svg", fund_name));
    let svg = render_chart(fund_name, report);
    std::fs::write(&path, svg).with_context(|| format!("Could not write {}", path.display()))?;
    debug!("Chart written to {}", path.display());
    Ok(path)
}
