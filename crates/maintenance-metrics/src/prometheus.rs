//! Prometheus text exposition format.
//!
//! Renders gauge family snapshots into the text format (version 0.0.4)
//! scraped by a Prometheus server or compatible agent.

use std::fmt::Write;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Point-in-time copy of one gauge family.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    /// (label values in `label_names` order, value).
    pub series: Vec<(Vec<String>, f64)>,
}

/// Render family snapshots into Prometheus text format.
///
/// Families without series still emit their HELP and TYPE lines.
pub fn render_prometheus(families: &[FamilySnapshot]) -> String {
    let mut out = String::new();

    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {} gauge", family.name);

        for (values, value) in &family.series {
            out.push_str(&family.name);
            if !values.is_empty() {
                out.push('{');
                for (i, (name, v)) in family.label_names.iter().zip(values).enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label_value(v));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(*value));
        }
    }

    out
}

fn escape_label_value(v: &str) -> String {
    let mut s = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '\\' => s.push_str("\\\\"),
            '"' => s.push_str("\\\""),
            '\n' => s.push_str("\\n"),
            c => s.push(c),
        }
    }
    s
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values print without a fractional part (timestamps, 0/1 flags).
fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // f64's Display never uses exponent notation and drops ".0".
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(series: Vec<(Vec<String>, f64)>) -> FamilySnapshot {
        FamilySnapshot {
            name: "stackit_server_maintenance_start_timestamp".to_string(),
            help: "Scheduled maintenance window start time (Unix timestamp)".to_string(),
            label_names: vec!["server_id".to_string(), "zone".to_string()],
            series,
        }
    }

    fn labels(a: &str, b: &str) -> Vec<String> {
        vec![a.to_string(), b.to_string()]
    }

    #[test]
    fn render_empty() {
        let output = render_prometheus(&[family(vec![])]);
        // Should still have type declarations.
        assert!(output.contains(
            "# HELP stackit_server_maintenance_start_timestamp Scheduled maintenance window start time (Unix timestamp)\n"
        ));
        assert!(output.contains("# TYPE stackit_server_maintenance_start_timestamp gauge\n"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn render_timestamp_without_fraction() {
        let output =
            render_prometheus(&[family(vec![(labels("srv-1", "eu01-1"), 1_735_689_600.0)])]);
        assert!(output.contains(
            "stackit_server_maintenance_start_timestamp{server_id=\"srv-1\",zone=\"eu01-1\"} 1735689600\n"
        ));
    }

    #[test]
    fn render_escapes_label_values() {
        let output = render_prometheus(&[family(vec![(labels("a\"b", "c\\d\ne"), 1.0)])]);
        assert!(output.contains(r#"{server_id="a\"b",zone="c\\d\ne"} 1"#));
    }

    #[test]
    fn special_values() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let output = render_prometheus(&[
            family(vec![(labels("a", "z1"), 1.0), (labels("b", "z2"), 0.0)]),
            FamilySnapshot {
                name: "plain".to_string(),
                help: "No labels.".to_string(),
                label_names: vec![],
                series: vec![(vec![], 2.0)],
            },
        ]);

        // Every non-comment line should be: metric_name[{labels}] value
        for line in output.lines() {
            if line.starts_with('#') {
                continue;
            }
            let (series, value) = line.rsplit_once(' ').expect("line has a value");
            assert!(value.parse::<f64>().is_ok(), "bad value in: {line}");
            assert!(!series.contains(' '), "unexpected space in: {line}");
        }
        assert!(output.contains("plain 2\n"));
    }
}
