//! Minimal inline SVG line plots

use std::fmt::Write;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 220.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 28.0;
const MARGIN_BOTTOM: f64 = 36.0;
const Y_TICKS: usize = 4;
const X_TICKS: usize = 5;

/// One polyline of a plot
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub color: &'static str,
    /// `(x, y)` points; non-finite values break the line
    pub points: Vec<(f64, f64)>,
}

/// A line plot with a fixed y-range
#[derive(Debug, Clone)]
pub struct LinePlot {
    pub title: String,
    pub x_label: String,
    pub y_range: [f64; 2],
    pub series: Vec<Series>,
}

impl LinePlot {
    pub fn new(title: impl Into<String>, y_range: [f64; 2]) -> Self {
        Self {
            title: title.into(),
            x_label: "t (s)".to_string(),
            y_range,
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, label: impl Into<String>, color: &'static str, points: Vec<(f64, f64)>) -> Self {
        self.series.push(Series {
            label: label.into(),
            color,
            points,
        });
        self
    }

    /// x extent over all finite points; `[0, 1]` when there are none
    fn x_range(&self) -> [f64; 2] {
        let xs = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .filter(|x| x.is_finite());
        let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
        if lo.is_finite() && hi > lo {
            [lo, hi]
        } else if lo.is_finite() {
            [lo, lo + 1.0]
        } else {
            [0.0, 1.0]
        }
    }

    pub fn render(&self) -> String {
        let [x0, x1] = self.x_range();
        let [y0, y1] = self.y_range;
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let sx = |x: f64| MARGIN_LEFT + (x - x0) / (x1 - x0) * plot_w;
        let sy = |y: f64| MARGIN_TOP + (1.0 - (y.clamp(y0, y1) - y0) / (y1 - y0)) * plot_h;

        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="11">"#
        );
        let _ = writeln!(
            out,
            r#"<text x="{MARGIN_LEFT}" y="16" font-size="13">{}</text>"#,
            escape(&self.title)
        );
        let _ = writeln!(
            out,
            r##"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#888"/>"##
        );

        for i in 0..=Y_TICKS {
            let y = y0 + (y1 - y0) * i as f64 / Y_TICKS as f64;
            let py = sy(y);
            let _ = writeln!(
                out,
                r##"<line x1="{MARGIN_LEFT}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#ddd"/><text x="{:.1}" y="{:.1}" text-anchor="end">{y:.2}</text>"##,
                MARGIN_LEFT + plot_w,
                MARGIN_LEFT - 4.0,
                py + 4.0,
            );
        }
        for i in 0..=X_TICKS {
            let x = x0 + (x1 - x0) * i as f64 / X_TICKS as f64;
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{x:.2}</text>"#,
                sx(x),
                MARGIN_TOP + plot_h + 14.0,
            );
        }
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 4.0,
            escape(&self.x_label)
        );

        for (i, series) in self.series.iter().enumerate() {
            for segment in segments(&series.points) {
                let points: Vec<String> = segment
                    .iter()
                    .map(|&(x, y)| format!("{:.1},{:.1}", sx(x), sy(y)))
                    .collect();
                let _ = writeln!(
                    out,
                    r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                    series.color,
                    points.join(" ")
                );
            }
            let lx = MARGIN_LEFT + plot_w - 150.0;
            let ly = MARGIN_TOP + 12.0 + 14.0 * i as f64;
            let _ = writeln!(
                out,
                r#"<line x1="{lx:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/><text x="{:.1}" y="{ly:.1}">{}</text>"#,
                ly - 4.0,
                lx + 16.0,
                ly - 4.0,
                series.color,
                lx + 20.0,
                escape(&series.label)
            );
        }

        out.push_str("</svg>\n");
        out
    }
}

/// Split a point list at non-finite values
fn segments(points: &[(f64, f64)]) -> Vec<&[(f64, f64)]> {
    points
        .split(|(x, y)| !x.is_finite() || !y.is_finite())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Escape text for use in HTML/SVG content and attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(escape("+1m/s^2"), "+1m/s^2");
    }

    #[test]
    fn test_render_one_polyline_per_segment() {
        let svg = LinePlot::new("accel", [-2.2, 2.2])
            .with_series("a", "#1f77b4", vec![(0.0, 0.0), (0.5, 1.0), (1.0, f64::NAN), (1.5, 1.0)])
            .render();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn test_values_outside_range_are_clamped() {
        let svg = LinePlot::new("clamped", [0.0, 1.0])
            .with_series("v", "red", vec![(0.0, -5.0), (1.0, 5.0)])
            .render();
        // Bottom and top edges of the plot area
        let bottom = MARGIN_TOP + (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM);
        assert!(svg.contains(&format!("{:.1},{:.1}", MARGIN_LEFT, bottom)));
        assert!(svg.contains(&format!("{:.1},{:.1}", WIDTH - MARGIN_RIGHT, MARGIN_TOP)));
    }

    #[test]
    fn test_empty_plot_renders_axes() {
        let svg = LinePlot::new("empty", [-0.1, 1.1]).render();
        assert!(svg.contains("<rect"));
        assert!(!svg.contains("<polyline"));
    }
}
