//! Prometheus metrics for the attendance API.
//!
//! [`RpcMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct RpcMetrics {
    pub registry: Registry,

    /// Attendance marks recorded by students.
    pub marks: IntCounter,
    /// Validations committed, by policy.
    pub validations: IntCounterVec,
    /// Validations refused because the day was already validated.
    pub already_validated: IntCounter,
    /// Badge requests that did not yield a badge, by outcome (`failed`, `pending`).
    pub badge_failures: IntCounterVec,
    /// Successful logins.
    pub logins: IntCounter,
}

impl RpcMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let marks = register_int_counter_with_registry!(
            Opts::new("poap_attendance_marks_total", "Attendance marks recorded"),
            registry
        )?;
        let validations = register_int_counter_vec_with_registry!(
            Opts::new(
                "poap_attendance_validations_total",
                "Attendance validations committed"
            ),
            &["policy"],
            registry
        )?;
        let already_validated = register_int_counter_with_registry!(
            Opts::new(
                "poap_attendance_already_validated_total",
                "Validations rejected because the day was already validated"
            ),
            registry
        )?;
        let badge_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "poap_badge_failures_total",
                "Badge requests that did not produce a badge"
            ),
            &["outcome"],
            registry
        )?;
        let logins = register_int_counter_with_registry!(
            Opts::new("poap_logins_total", "Successful wallet logins"),
            registry
        )?;

        Ok(Self {
            registry,
            marks,
            validations,
            already_validated,
            badge_failures,
            logins,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = RpcMetrics::new().unwrap();
        metrics.marks.inc();
        metrics.validations.with_label_values(&["require_mark"]).inc();
        metrics.badge_failures.with_label_values(&["pending"]).inc_by(2);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("poap_attendance_marks_total 1"));
        assert!(text.contains("poap_attendance_validations_total{policy=\"require_mark\"} 1"));
        assert!(text.contains("poap_badge_failures_total{outcome=\"pending\"} 2"));
    }

    #[test]
    fn registries_are_independent() {
        let a = RpcMetrics::new().unwrap();
        let b = RpcMetrics::new().unwrap();
        a.logins.inc();
        assert_eq!(b.logins.get(), 0);
    }
}
