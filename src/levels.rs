//! Generic threshold evaluation.
//!
//! A level specification is either "no levels" or a pair of (warn, crit)
//! thresholds, each an absolute number or a percentage of a reference
//! quantity. Upper thresholds trigger at `value >= threshold`, lower
//! thresholds at `value < threshold`. The evaluator trusts its
//! configuration: it does not verify that warn is less severe than crit.

use crate::{CheckItem, Metric, ServiceState, Unit};

/// A single threshold value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    Absolute(f64),
    /// Percentage of a reference quantity supplied at evaluation time.
    /// Without a reference the threshold is inert.
    Percent(f64),
}

impl Threshold {
    /// Resolves the threshold to an absolute value.
    pub fn resolve(&self, reference: Option<f64>) -> Option<f64> {
        match self {
            Threshold::Absolute(v) => Some(*v),
            Threshold::Percent(p) => reference.map(|r| r * p / 100.0),
        }
    }
}

impl From<f64> for Threshold {
    fn from(v: f64) -> Threshold {
        Threshold::Absolute(v)
    }
}

/// Upper warn/crit thresholds: the value must stay below them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpperLevels {
    pub warn: Threshold,
    pub crit: Option<Threshold>,
}

impl UpperLevels {
    pub fn warn(warn: impl Into<Threshold>) -> UpperLevels {
        UpperLevels {
            warn: warn.into(),
            crit: None,
        }
    }

    pub fn warn_crit(warn: impl Into<Threshold>, crit: impl Into<Threshold>) -> UpperLevels {
        UpperLevels {
            warn: warn.into(),
            crit: Some(crit.into()),
        }
    }

    /// Resolved (warn, crit) pair for the given reference.
    pub fn resolved(&self, reference: Option<f64>) -> (Option<f64>, Option<f64>) {
        (
            self.warn.resolve(reference),
            self.crit.and_then(|c| c.resolve(reference)),
        )
    }

    /// Worst state triggered by `value`, or None if the value is below
    /// all thresholds.
    pub fn evaluate(&self, value: f64, reference: Option<f64>) -> Option<ServiceState> {
        let (warn, crit) = self.resolved(reference);
        match (warn, crit) {
            (_, Some(c)) if value >= c => Some(ServiceState::Critical),
            (Some(w), _) if value >= w => Some(ServiceState::Warning),
            _ => None,
        }
    }
}

/// Lower warn/crit thresholds: the value must not fall below them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowerLevels {
    pub warn: Threshold,
    pub crit: Option<Threshold>,
}

impl LowerLevels {
    pub fn warn(warn: impl Into<Threshold>) -> LowerLevels {
        LowerLevels {
            warn: warn.into(),
            crit: None,
        }
    }

    pub fn warn_crit(warn: impl Into<Threshold>, crit: impl Into<Threshold>) -> LowerLevels {
        LowerLevels {
            warn: warn.into(),
            crit: Some(crit.into()),
        }
    }

    pub fn resolved(&self, reference: Option<f64>) -> (Option<f64>, Option<f64>) {
        (
            self.warn.resolve(reference),
            self.crit.and_then(|c| c.resolve(reference)),
        )
    }

    pub fn evaluate(&self, value: f64, reference: Option<f64>) -> Option<ServiceState> {
        let (warn, crit) = self.resolved(reference);
        match (warn, crit) {
            (_, Some(c)) if value < c => Some(ServiceState::Critical),
            (Some(w), _) if value < w => Some(ServiceState::Warning),
            _ => None,
        }
    }
}

/// A full level specification: optional upper and optional lower levels.
/// The default carries no levels at all.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Levels {
    pub upper: Option<UpperLevels>,
    pub lower: Option<LowerLevels>,
}

impl Levels {
    pub fn none() -> Levels {
        Levels::default()
    }

    pub fn upper(warn: impl Into<Threshold>, crit: impl Into<Threshold>) -> Levels {
        Levels {
            upper: Some(UpperLevels::warn_crit(warn, crit)),
            lower: None,
        }
    }

    pub fn upper_pct(warn: f64, crit: f64) -> Levels {
        Levels::upper(Threshold::Percent(warn), Threshold::Percent(crit))
    }

    pub fn lower(warn: impl Into<Threshold>, crit: impl Into<Threshold>) -> Levels {
        Levels {
            upper: None,
            lower: Some(LowerLevels::warn_crit(warn, crit)),
        }
    }

    /// Upper and lower levels in one specification.
    pub fn both(
        warn_upper: impl Into<Threshold>,
        crit_upper: impl Into<Threshold>,
        warn_lower: impl Into<Threshold>,
        crit_lower: impl Into<Threshold>,
    ) -> Levels {
        Levels {
            upper: Some(UpperLevels::warn_crit(warn_upper, crit_upper)),
            lower: Some(LowerLevels::warn_crit(warn_lower, crit_lower)),
        }
    }
}

enum Triggered {
    Upper,
    Lower,
    No,
}

/// Evaluates a measured value against a [Levels] specification and builds
/// the resulting [CheckItem] including the metric for graphing.
///
/// ```rust
/// use checkkit::levels::{Levels, LevelsChecker};
/// use checkkit::ServiceState;
///
/// let item = LevelsChecker::new(231.0)
///     .label("Voltage")
///     .unit_label("V")
///     .metric("voltage")
///     .levels(Levels::lower(250.0, 200.0))
///     .check();
/// assert_eq!(item.state, ServiceState::Warning);
/// assert_eq!(item.text, "Voltage: 231.0 V (warn/crit below 250.0 V/200.0 V)");
/// ```
pub struct LevelsChecker {
    value: f64,
    label: Option<String>,
    metric_name: Option<String>,
    unit: Unit,
    unit_label: Option<String>,
    render: fn(f64) -> String,
    levels: Levels,
    reference: Option<f64>,
    boundaries: (Option<f64>, Option<f64>),
}

fn render_default(v: f64) -> String {
    format!("{:.1}", v)
}

impl LevelsChecker {
    pub fn new(value: f64) -> LevelsChecker {
        LevelsChecker {
            value,
            label: None,
            metric_name: None,
            unit: Unit::None,
            unit_label: None,
            render: render_default,
            levels: Levels::none(),
            reference: None,
            boundaries: (None, None),
        }
    }

    /// Title printed in front of the value, e.g. `"Voltage: 231.0 V"`.
    pub fn label(mut self, label: impl Into<String>) -> LevelsChecker {
        self.label = Some(label.into());
        self
    }

    /// Metric name for perfdata. Without it no metric is emitted.
    pub fn metric(mut self, name: impl Into<String>) -> LevelsChecker {
        self.metric_name = Some(name.into());
        self
    }

    /// Unit used both as text suffix and in perfdata.
    pub fn unit(mut self, unit: Unit) -> LevelsChecker {
        self.unit = unit;
        self
    }

    /// Overrides the text suffix without touching the perfdata unit.
    pub fn unit_label(mut self, unit: impl Into<String>) -> LevelsChecker {
        self.unit_label = Some(unit.into());
        self
    }

    /// Formatter for the value and the thresholds in the text output.
    pub fn render(mut self, render: fn(f64) -> String) -> LevelsChecker {
        self.render = render;
        self
    }

    pub fn levels(mut self, levels: Levels) -> LevelsChecker {
        self.levels = levels;
        self
    }

    /// Reference quantity against which percentage thresholds resolve.
    pub fn reference(mut self, reference: f64) -> LevelsChecker {
        self.reference = Some(reference);
        self
    }

    /// Minimum and maximum boundaries for perfdata.
    pub fn boundaries(mut self, min: Option<f64>, max: Option<f64>) -> LevelsChecker {
        self.boundaries = (min, max);
        self
    }

    /// Runs the evaluation. This is a pure function of the builder state.
    pub fn check(self) -> CheckItem {
        let upper = self.levels.upper.map(|u| u.resolved(self.reference));
        let lower = self.levels.lower.map(|l| l.resolved(self.reference));

        // Evaluation order: crit upper, crit lower, warn upper, warn lower.
        let (state, triggered) = if matches!(upper, Some((_, Some(c))) if self.value >= c) {
            (ServiceState::Critical, Triggered::Upper)
        } else if matches!(lower, Some((_, Some(c))) if self.value < c) {
            (ServiceState::Critical, Triggered::Lower)
        } else if matches!(upper, Some((Some(w), _)) if self.value >= w) {
            (ServiceState::Warning, Triggered::Upper)
        } else if matches!(lower, Some((Some(w), _)) if self.value < w) {
            (ServiceState::Warning, Triggered::Lower)
        } else {
            (ServiceState::Ok, Triggered::No)
        };

        let unit_suffix = match &self.unit_label {
            Some(u) if u.is_empty() => String::new(),
            Some(u) => format!(" {}", u),
            None => match self.unit.to_string() {
                u if u.is_empty() => String::new(),
                u => format!(" {}", u),
            },
        };

        let mut text = String::new();
        if let Some(label) = &self.label {
            text.push_str(label);
            text.push_str(": ");
        }
        text.push_str(&(self.render)(self.value));
        text.push_str(&unit_suffix);
        match triggered {
            Triggered::Upper => {
                let (warn, crit) = upper.unwrap_or((None, None));
                text.push_str(&levels_info("at", warn, crit, self.render, &unit_suffix));
            }
            Triggered::Lower => {
                let (warn, crit) = lower.unwrap_or((None, None));
                text.push_str(&levels_info("below", warn, crit, self.render, &unit_suffix));
            }
            Triggered::No => {}
        }

        let mut item = CheckItem::new(state, text);
        if let Some(name) = self.metric_name {
            let (warn, crit) = upper.unwrap_or((None, None));
            item = item.with_metric(
                Metric::new(name, self.value)
                    .with_unit(self.unit)
                    .with_levels(warn, crit)
                    .with_bounds(self.boundaries.0, self.boundaries.1),
            );
        }
        item
    }
}

/// `" (warn/crit at 80.0 %/95.0 %)"` and friends.
fn levels_info(
    direction: &str,
    warn: Option<f64>,
    crit: Option<f64>,
    render: fn(f64) -> String,
    unit_suffix: &str,
) -> String {
    match (warn, crit) {
        (Some(w), Some(c)) => format!(
            " (warn/crit {} {}{}/{}{})",
            direction,
            render(w),
            unit_suffix,
            render(c),
            unit_suffix
        ),
        (Some(w), None) => format!(" (warn {} {}{})", direction, render(w), unit_suffix),
        (None, Some(c)) => format!(" (crit {} {}{})", direction, render(c), unit_suffix),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_levels() {
        let levels = UpperLevels::warn_crit(80.0, 95.0);
        assert_eq!(levels.evaluate(79.9, None), None);
        assert_eq!(levels.evaluate(80.0, None), Some(ServiceState::Warning));
        assert_eq!(levels.evaluate(94.9, None), Some(ServiceState::Warning));
        assert_eq!(levels.evaluate(95.0, None), Some(ServiceState::Critical));
        assert_eq!(levels.evaluate(200.0, None), Some(ServiceState::Critical));
    }

    #[test]
    fn test_upper_levels_warn_only() {
        let levels = UpperLevels::warn(10.0);
        assert_eq!(levels.evaluate(9.0, None), None);
        assert_eq!(levels.evaluate(10.0, None), Some(ServiceState::Warning));
        assert_eq!(levels.evaluate(1000.0, None), Some(ServiceState::Warning));
    }

    #[test]
    fn test_lower_levels() {
        let levels = LowerLevels::warn_crit(250.0, 200.0);
        assert_eq!(levels.evaluate(250.0, None), None);
        assert_eq!(levels.evaluate(231.0, None), Some(ServiceState::Warning));
        assert_eq!(levels.evaluate(200.0, None), Some(ServiceState::Warning));
        assert_eq!(levels.evaluate(199.9, None), Some(ServiceState::Critical));
    }

    #[test]
    fn test_percent_thresholds() {
        let levels = UpperLevels::warn_crit(Threshold::Percent(80.0), Threshold::Percent(90.0));
        // 80%/90% of 2000
        assert_eq!(levels.evaluate(1599.0, Some(2000.0)), None);
        assert_eq!(
            levels.evaluate(1600.0, Some(2000.0)),
            Some(ServiceState::Warning)
        );
        assert_eq!(
            levels.evaluate(1800.0, Some(2000.0)),
            Some(ServiceState::Critical)
        );
        // Without a reference percentage levels are inert.
        assert_eq!(levels.evaluate(1800.0, None), None);
    }

    #[test]
    fn test_checker_text_and_metric() {
        let item = LevelsChecker::new(87.2)
            .label("CPU utilization")
            .unit(Unit::Percent)
            .metric("util")
            .levels(Levels::upper(80.0, 95.0))
            .check();
        assert_eq!(item.state, ServiceState::Warning);
        assert_eq!(
            item.text,
            "CPU utilization: 87.2 % (warn/crit at 80.0 %/95.0 %)"
        );
        assert_eq!(item.metrics.len(), 1);
        assert_eq!(item.metrics[0].warn(), Some(80.0));
        assert_eq!(item.metrics[0].crit(), Some(95.0));
    }

    #[test]
    fn test_checker_lower_direction_text() {
        let item = LevelsChecker::new(231.0)
            .label("Voltage")
            .unit(Unit::Volts)
            .metric("voltage")
            .levels(Levels::lower(250.0, 200.0))
            .check();
        assert_eq!(item.state, ServiceState::Warning);
        assert_eq!(
            item.text,
            "Voltage: 231.0 V (warn/crit below 250.0 V/200.0 V)"
        );
        // Lower levels never end up in perfdata.
        assert_eq!(item.metrics[0].warn(), None);
        assert_eq!(item.metrics[0].crit(), None);
    }

    #[test]
    fn test_checker_no_levels_is_ok() {
        let item = LevelsChecker::new(231.0)
            .label("Voltage")
            .unit(Unit::Volts)
            .metric("voltage")
            .check();
        assert_eq!(item.state, ServiceState::Ok);
        assert_eq!(item.text, "Voltage: 231.0 V");
    }

    #[test]
    fn test_checker_is_pure() {
        let build = || {
            LevelsChecker::new(42.0)
                .label("Load")
                .levels(Levels::upper(40.0, 50.0))
                .metric("load")
                .check()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_both_directions() {
        let levels = Levels::both(60.0, 65.0, 40.0, 35.0);
        let state = |v: f64| LevelsChecker::new(v).levels(levels).check().state;
        assert_eq!(state(50.0), ServiceState::Ok);
        assert_eq!(state(62.0), ServiceState::Warning);
        assert_eq!(state(66.0), ServiceState::Critical);
        assert_eq!(state(39.0), ServiceState::Warning);
        assert_eq!(state(34.0), ServiceState::Critical);
    }
}
