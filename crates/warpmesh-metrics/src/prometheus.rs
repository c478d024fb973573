//! Prometheus text exposition format.

use std::fmt::Write;

use crate::collector::DispatchCounters;

/// Render placement counters into Prometheus text format.
pub fn render_prometheus(c: &DispatchCounters) -> String {
    let mut out = String::new();

    counter(&mut out, "warpmesh_submissions_total", "Tasks submitted for placement.", &[("", c.submissions)]);
    counter(
        &mut out,
        "warpmesh_placements_total",
        "Dispatch attempts by target locality.",
        &[("target=\"local\"", c.placed_local), ("target=\"peer\"", c.placed_remote)],
    );
    counter(&mut out, "warpmesh_retries_total", "Re-placements after a peer execution failure.", &[("", c.retries)]);
    counter(&mut out, "warpmesh_completed_total", "Tasks that completed successfully.", &[("", c.completed)]);
    counter(
        &mut out,
        "warpmesh_failures_total",
        "Submissions that failed, by cause.",
        &[
            ("code=\"placement_failed\"", c.placement_failures),
            ("code=\"execution_failed\"", c.execution_failures),
        ],
    );
    counter(
        &mut out,
        "warpmesh_peer_fetch_failures_total",
        "Peers dropped from a decision during collection, by reason.",
        &[
            ("reason=\"unreachable\"", c.fetch_unreachable),
            ("reason=\"timeout\"", c.fetch_timeout),
            ("reason=\"malformed\"", c.fetch_malformed),
        ],
    );
    counter(
        &mut out,
        "warpmesh_local_probe_failures_total",
        "Local resource samples that failed.",
        &[("", c.local_probe_failures)],
    );

    out
}

fn counter(out: &mut String, name: &str, help: &str, series: &[(&str, u64)]) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for (labels, value) in series {
        if labels.is_empty() {
            let _ = writeln!(out, "{name} {value}");
        } else {
            let _ = writeln!(out, "{name}{{{labels}}} {value}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DispatchCounters {
        DispatchCounters {
            submissions: 10,
            placed_local: 6,
            placed_remote: 5,
            retries: 1,
            completed: 9,
            placement_failures: 0,
            execution_failures: 1,
            fetch_unreachable: 2,
            fetch_timeout: 3,
            fetch_malformed: 0,
            local_probe_failures: 0,
        }
    }

    #[test]
    fn render_zeroes_still_declares_types() {
        let output = render_prometheus(&DispatchCounters::default());
        assert!(output.contains("# HELP warpmesh_submissions_total"));
        assert!(output.contains("# TYPE warpmesh_submissions_total counter"));
        assert!(output.contains("warpmesh_submissions_total 0"));
    }

    #[test]
    fn render_values_and_labels() {
        let output = render_prometheus(&sample());
        assert!(output.contains("warpmesh_submissions_total 10"));
        assert!(output.contains("warpmesh_placements_total{target=\"local\"} 6"));
        assert!(output.contains("warpmesh_placements_total{target=\"peer\"} 5"));
        assert!(output.contains("warpmesh_failures_total{code=\"execution_failed\"} 1"));
        assert!(output.contains("warpmesh_peer_fetch_failures_total{reason=\"timeout\"} 3"));
    }

    #[test]
    fn every_sample_line_has_a_value() {
        let output = render_prometheus(&sample());
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value = line.rsplit(' ').next().unwrap();
            assert!(value.parse::<u64>().is_ok(), "bad sample line: {line}");
        }
    }
}
