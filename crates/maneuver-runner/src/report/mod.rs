//! Report rendering
//!
//! The report is one self-contained HTML document with inline SVG plots and
//! no external assets. It is built from a [`TraceBook`] only, after the
//! session has ended, so the same book can be rendered any number of times.

mod svg;

use std::fmt::Write;
use std::path::Path;

use tracing::info;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::trace::{ManeuverRun, RunStatus, Trace, TraceBook};

pub use svg::{escape, LinePlot, Series};

/// Measured acceleration
pub const A_EGO: &str = "carState.aEgo";
/// Commanded acceleration
pub const ACCEL_CMD: &str = "carControl.actuators.accel";

const MEASURED_COLOR: &str = "#1f77b4";
const COMMAND_COLOR: &str = "#ff7f0e";
const BOOLEAN_COLOR: &str = "#2ca02c";

/// Renders trace books into HTML reports
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    config: ReportConfig,
}

impl ReportBuilder {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, book: &TraceBook) -> String {
        let vehicle = book.vehicle.as_deref().unwrap_or("unknown vehicle");
        let mut html = String::new();
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">");
        let _ = writeln!(
            html,
            "<title>{} - {}</title>",
            escape(&self.config.title),
            escape(vehicle)
        );
        let _ = writeln!(
            html,
            "<style>body{{font-family:sans-serif;margin:1.5em}}.run{{border:1px solid black;padding:0.5em 1em;margin-bottom:1em}}.aborted{{color:#b00}}</style>"
        );
        let _ = writeln!(html, "</head>\n<body>");
        let _ = writeln!(html, "<h1>{}</h1>", escape(&self.config.title));
        let _ = writeln!(html, "<h3>{}</h3>", escape(vehicle));
        let _ = writeln!(
            html,
            "<p>Session {} started {}</p>",
            book.session_id,
            book.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if book.is_empty() {
            let _ = writeln!(html, "<p>No maneuvers were run.</p>");
        }
        for run in book.runs() {
            self.render_run(&mut html, run);
        }

        let _ = writeln!(html, "</body>\n</html>");
        html
    }

    fn render_run(&self, html: &mut String, run: &ManeuverRun) {
        let _ = writeln!(html, "<div class=\"run\">");
        let _ = writeln!(
            html,
            "<h2>{} {}</h2>\n<p>Setup: {}, {} samples</p>",
            run.id,
            escape(&run.description),
            run.setup,
            run.trace.len()
        );
        match &run.status {
            RunStatus::Completed { capped: true, .. } => {
                let _ = writeln!(html, "<p>Stopped at the sample cap.</p>");
            }
            RunStatus::Completed { .. } => {}
            RunStatus::Aborted { tick, reason } => {
                let at = tick.map(|t| format!(" at tick {t}")).unwrap_or_default();
                let _ = writeln!(
                    html,
                    "<p class=\"aborted\">Aborted{}: {}</p>",
                    at,
                    escape(reason)
                );
            }
        }

        html.push_str(&self.accel_plot(&run.trace).render());
        for field in self.boolean_fields(&run.trace) {
            let plot = LinePlot::new(field, self.config.boolean_range).with_series(
                field,
                BOOLEAN_COLOR,
                points(&run.trace, field),
            );
            html.push_str(&plot.render());
        }
        let _ = writeln!(html, "</div>");
    }

    fn accel_plot(&self, trace: &Trace) -> LinePlot {
        LinePlot::new("accel (m/s^2)", self.config.accel_range)
            .with_series(A_EGO, MEASURED_COLOR, points(trace, A_EGO))
            .with_series(ACCEL_CMD, COMMAND_COLOR, points(trace, ACCEL_CMD))
    }

    /// Boolean fields to plot, in trace order
    fn boolean_fields<'t>(&self, trace: &'t Trace) -> Vec<&'t str> {
        let fields = trace.boolean_fields();
        match &self.config.boolean_fields {
            Some(selected) => fields
                .into_iter()
                .filter(|f| selected.iter().any(|s| s.as_str() == *f))
                .collect(),
            None => fields,
        }
    }

    /// Render `book` and write it to `path`
    pub fn write(&self, book: &TraceBook, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.render(book)).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), runs = book.runs().len(), "Report written");
        Ok(())
    }
}

/// Write every trace in `book` as pretty-printed JSON
pub fn export_json(book: &TraceBook, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(book)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Trace export written");
    Ok(())
}

fn points(trace: &Trace, path: &str) -> Vec<(f64, f64)> {
    match trace.floats(path) {
        Some(values) => trace.times_s().into_iter().zip(values).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maneuver_core::{Actuators, CarControl, CarState};
    use pretty_assertions::assert_eq;

    use crate::maneuver::{ManeuverId, SetupCondition};

    fn book() -> TraceBook {
        let mut trace = Trace::new(0.01);
        for tick in 0..10 {
            let control = CarControl::longitudinal(Actuators {
                accel: 1.0,
                ..Default::default()
            });
            let state = CarState {
                a_ego: 0.1 * tick as f32,
                ..Default::default()
            };
            trace.log(tick, &control, &state).unwrap();
        }
        let mut book = TraceBook::new();
        book.vehicle = Some("SIM_SEDAN".to_string());
        book.push(ManeuverRun {
            id: ManeuverId(0),
            description: "start from stop".to_string(),
            setup: SetupCondition::Stopped,
            status: RunStatus::Completed {
                capped: false,
                overruns: 0,
            },
            trace: trace.clone(),
        });
        book.push(ManeuverRun {
            id: ManeuverId(1),
            description: "brake <step>".to_string(),
            setup: SetupCondition::SteadyStateSpeed,
            status: RunStatus::Aborted {
                tick: Some(10),
                reason: "Decode error".to_string(),
            },
            trace,
        });
        book
    }

    #[test]
    fn test_one_svg_per_plot() {
        let book = book();
        let html = ReportBuilder::default().render(&book);
        let booleans = book.runs()[0].trace.boolean_fields().len();

        assert!(html.contains("<h3>SIM_SEDAN</h3>"));
        assert_eq!(html.matches("<div class=\"run\">").count(), 2);
        assert_eq!(html.matches("<svg").count(), 2 * (1 + booleans));
        assert!(html.contains("brake &lt;step&gt;"));
        assert!(html.contains("Aborted at tick 10: Decode error"));
    }

    #[test]
    fn test_no_external_references() {
        let html = ReportBuilder::default().render(&book());
        assert!(!html.contains("<script"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("src="));
        assert!(!html.contains("href="));
    }

    #[test]
    fn test_boolean_field_selection() {
        let config = ReportConfig {
            boolean_fields: Some(vec![
                "carControl.enabled".to_string(),
                "carState.notAField".to_string(),
            ]),
            ..Default::default()
        };
        let html = ReportBuilder::new(config).render(&book());
        // accel plus one boolean plot per run
        assert_eq!(html.matches("<svg").count(), 4);
    }

    #[test]
    fn test_empty_book() {
        let html = ReportBuilder::default().render(&TraceBook::new());
        assert!(html.contains("unknown vehicle"));
        assert!(html.contains("No maneuvers were run."));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn test_write_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let book = book();
        let html_path = dir.path().join("report.html");
        let json_path = dir.path().join("traces.json");

        ReportBuilder::default().write(&book, &html_path).unwrap();
        export_json(&book, &json_path).unwrap();

        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));

        let parsed: TraceBook =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.session_id, book.session_id);
        assert_eq!(parsed.runs().len(), 2);
        assert_eq!(parsed.runs()[0].trace, book.runs()[0].trace);
        assert_eq!(parsed.runs()[1].status, book.runs()[1].status);
    }

    #[test]
    fn test_write_to_missing_directory() {
        let err = ReportBuilder::default()
            .write(&book(), Path::new("/nonexistent/dir/report.html"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
