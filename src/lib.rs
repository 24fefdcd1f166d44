//! The checkkit crate provides the building blocks for writing monitoring
//! checks: service states, threshold evaluation, rate computation over a
//! persisted value store, and a handful of ready-made device check plugins.
//!
//! A check produces a [Resource]: a named service carrying an ordered list of
//! [CheckItem]s. The resource's state is the worst state of its items, and its
//! output line follows the common plugin protocol
//! (`NAME STATE: summary | perfdata`).
//!
//! ```rust
//! use checkkit::levels::{Levels, LevelsChecker};
//! use checkkit::{Resource, ServiceState, Unit};
//!
//! let item = LevelsChecker::new(87.2)
//!     .label("CPU utilization")
//!     .unit(Unit::Percent)
//!     .metric("util")
//!     .levels(Levels::upper(80.0, 95.0))
//!     .check();
//!
//! let resource = Resource::new("CPU").with_item(item);
//! assert_eq!(resource.state(), ServiceState::Warning);
//! assert_eq!(
//!     resource.to_status_string(),
//!     "CPU WARNING: CPU utilization: 87.2 % (warn/crit at 80.0 %/95.0 %) | util=87.2%;80;95"
//! );
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::process;

#[macro_use]
mod macros;

pub mod config_export;
pub mod didactum;
pub mod elphase;
pub mod kube;
pub mod kube_cronjob;
pub mod kube_pod_conditions;
pub mod kube_resources;
pub mod levels;
pub mod raritan;
pub mod rate;
pub mod registry;
pub mod render;
pub mod runner;
pub mod section;

pub use crate::rate::{get_average, get_rate, MemoryStore, RateError, ValueStore};
pub use crate::registry::{CheckContext, CheckPlugin, Registry, Service};
pub use crate::runner::{safe_run, Runner, RunnerResult};
pub use crate::section::{SectionSet, StringTable};

/// The state of a single service as understood by the host monitoring
/// framework. The numeric protocol codes are fixed (OK=0, WARNING=1,
/// CRITICAL=2, UNKNOWN=3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Returns the process exit code signalling this state to the host
    /// framework.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    /// Severity rank used for worst-state aggregation. CRITICAL outranks
    /// UNKNOWN, which outranks WARNING.
    fn severity(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Unknown => 2,
            ServiceState::Critical => 3,
        }
    }

    /// Returns the more severe of `self` and `other`.
    pub fn worst(self, other: ServiceState) -> ServiceState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Ok => write!(f, "OK"),
            ServiceState::Warning => write!(f, "WARNING"),
            ServiceState::Critical => write!(f, "CRITICAL"),
            ServiceState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &ServiceState) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceState {
    fn cmp(&self, other: &ServiceState) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

/// A validated unit-of-measurement suffix for custom units.
///
/// Perfdata is parsed by the host framework, so a unit must not contain
/// characters that delimit the perfdata format itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitString(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid characters in unit {0:?}")]
pub struct InvalidUnitError(String);

impl UnitString {
    /// Creates a new unit string, rejecting characters that would corrupt
    /// the perfdata format (whitespace, digits, `;`, `'`, `=` and `|`).
    pub fn new(s: &str) -> Result<UnitString, InvalidUnitError> {
        let ok = !s.chars().any(|c| {
            c.is_whitespace() || c.is_ascii_digit() || matches!(c, ';' | '\'' | '=' | '|')
        });
        if ok {
            Ok(UnitString(s.to_owned()))
        } else {
            Err(InvalidUnitError(s.to_owned()))
        }
    }

    /// Creates a unit string without validating it.
    pub fn new_unchecked(s: &str) -> UnitString {
        UnitString(s.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unit of measurement attached to a [Metric] and rendered both in the
/// check text and behind the perfdata value.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    None,
    Seconds,
    Milliseconds,
    Percent,
    Bytes,
    Counter,
    Volts,
    Amperes,
    Milliamperes,
    Watts,
    VoltAmperes,
    WattHours,
    Hertz,
    DegreesCelsius,
    Other(UnitString),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::None => "",
            Unit::Seconds => "s",
            Unit::Milliseconds => "ms",
            Unit::Percent => "%",
            Unit::Bytes => "B",
            Unit::Counter => "c",
            Unit::Volts => "V",
            Unit::Amperes => "A",
            Unit::Milliamperes => "mA",
            Unit::Watts => "W",
            Unit::VoltAmperes => "VA",
            Unit::WattHours => "Wh",
            Unit::Hertz => "Hz",
            Unit::DegreesCelsius => "C",
            Unit::Other(u) => u.as_str(),
        };
        write!(f, "{}", s)
    }
}

/// A single performance metric: a named value plus the thresholds and
/// boundaries the host framework uses for graphing.
///
/// The warn/crit slots carry the resolved *upper* levels; lower levels do
/// not appear in perfdata.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: String,
    value: f64,
    unit: Unit,
    warn: Option<f64>,
    crit: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Metric {
        Metric {
            name: name.into(),
            value,
            unit: Unit::None,
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Metric {
        self.unit = unit;
        self
    }

    pub fn with_levels(mut self, warn: Option<f64>, crit: Option<f64>) -> Metric {
        self.warn = warn;
        self.crit = crit;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Metric {
        self.min = min;
        self.max = max;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn warn(&self) -> Option<f64> {
        self.warn
    }

    pub fn crit(&self) -> Option<f64> {
        self.crit
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Renders the metric as a perfdata token:
    /// `'label'=value[unit];warn;crit;min;max` with trailing empty fields
    /// trimmed.
    pub fn perf_string(&self) -> String {
        // `=` would end the label early, `'` needs doubling per the format.
        let name = self.name.replace('=', "_");
        let name = name.replace('\'', "''");
        let name = if name.contains(' ') {
            format!("'{}'", name)
        } else {
            name
        };

        let mut s = format!("{}={}{}", name, fmt_value(self.value), self.unit);
        for field in [self.warn, self.crit, self.min, self.max] {
            s.push(';');
            if let Some(v) = field {
                s.push_str(&fmt_value(v));
            }
        }
        s.trim_end_matches(';').to_string()
    }
}

/// Formats a perfdata number without a trailing `.0` for integral values.
fn fmt_value(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// One evaluation result: a state, a line of human-readable text and the
/// metrics produced alongside it. Check functions return an ordered
/// sequence of these; an empty sequence means the checked item has
/// vanished.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckItem {
    pub state: ServiceState,
    pub text: String,
    pub metrics: Vec<Metric>,
}

impl CheckItem {
    pub fn new(state: ServiceState, text: impl Into<String>) -> CheckItem {
        CheckItem {
            state,
            text: text.into(),
            metrics: Vec::new(),
        }
    }

    pub fn ok(text: impl Into<String>) -> CheckItem {
        CheckItem::new(ServiceState::Ok, text)
    }

    pub fn with_metric(mut self, metric: Metric) -> CheckItem {
        self.metrics.push(metric);
        self
    }
}

/// A Resource represents a single service from the perspective of the
/// monitoring host. It aggregates the check items produced for the
/// service and renders the final status line.
///
/// The state reported for the resource is the worst state of its items
/// (see [ServiceState::worst]), unless overridden with [Resource::set_state].
/// A resource without any items reports UNKNOWN.
pub struct Resource {
    name: String,
    description: Option<String>,
    items: Vec<CheckItem>,
    state_override: Option<ServiceState>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Resource {
        Resource {
            name: name.into(),
            description: None,
            items: Vec::new(),
            state_override: None,
        }
    }

    /// Sets a description which is printed between the state and the item
    /// texts.
    pub fn with_description(mut self, description: impl Into<String>) -> Resource {
        self.description = Some(description.into());
        self
    }

    pub fn with_item(mut self, item: CheckItem) -> Resource {
        self.items.push(item);
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = CheckItem>) -> Resource {
        self.items.extend(items);
        self
    }

    pub fn push(&mut self, item: CheckItem) {
        self.items.push(item);
    }

    /// Overrides the state computed from the items.
    pub fn set_state(&mut self, state: ServiceState) {
        self.state_override = Some(state);
    }

    pub fn items(&self) -> &[CheckItem] {
        &self.items
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The worst state over all items, or the override if one was set.
    pub fn state(&self) -> ServiceState {
        if let Some(state) = self.state_override {
            return state;
        }
        self.items
            .iter()
            .map(|item| item.state)
            .reduce(ServiceState::worst)
            .unwrap_or(ServiceState::Unknown)
    }

    /// Renders the status line understood by the host framework:
    /// `NAME STATE: description: text, text | perfdata`.
    pub fn to_status_string(&self) -> String {
        let mut s = format!("{} {}", self.name, self.state());

        let texts: Vec<&str> = self
            .items
            .iter()
            .filter(|i| !i.text.is_empty())
            .map(|i| i.text.as_str())
            .collect();
        if self.description.is_some() || !texts.is_empty() {
            s.push_str(": ");
        }
        if let Some(description) = &self.description {
            s.push_str(description);
            if !texts.is_empty() {
                s.push_str(": ");
            }
        }
        s.push_str(&texts.join(", "));

        let perf: Vec<String> = self
            .items
            .iter()
            .flat_map(|i| i.metrics.iter())
            .map(Metric::perf_string)
            .collect();
        if !perf.is_empty() {
            s.push_str(" | ");
            s.push_str(&perf.join(" "));
        }

        s
    }

    pub fn exit_code(&self) -> i32 {
        self.state().exit_code()
    }

    /// Prints the status line and exits with the matching exit code.
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.to_status_string());
        process::exit(self.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(ServiceState::Ok.exit_code(), 0);
        assert_eq!(ServiceState::Warning.exit_code(), 1);
        assert_eq!(ServiceState::Critical.exit_code(), 2);
        assert_eq!(ServiceState::Unknown.exit_code(), 3);

        assert_eq!(&ServiceState::Ok.to_string(), "OK");
        assert_eq!(&ServiceState::Warning.to_string(), "WARNING");
        assert_eq!(&ServiceState::Critical.to_string(), "CRITICAL");
        assert_eq!(&ServiceState::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_worst_state_ordering() {
        use ServiceState::*;
        assert_eq!(Ok.worst(Warning), Warning);
        assert_eq!(Warning.worst(Unknown), Unknown);
        assert_eq!(Unknown.worst(Critical), Critical);
        assert_eq!(Critical.worst(Unknown), Critical);
        assert_eq!(Ok.worst(Ok), Ok);
        assert!(Warning < Critical);
        assert!(Warning < Unknown);
    }

    #[test]
    fn test_metric_perf_string() {
        let metric = Metric::new("util", 87.2)
            .with_unit(Unit::Percent)
            .with_levels(Some(80.0), Some(95.0));
        assert_eq!(&metric.perf_string(), "util=87.2%;80;95");

        let metric = Metric::new("voltage", 231.0);
        assert_eq!(&metric.perf_string(), "voltage=231");

        let metric = Metric::new("size", 12.0)
            .with_levels(Some(14.0), None)
            .with_bounds(Some(0.0), None);
        assert_eq!(&metric.perf_string(), "size=12;14;;0");
    }

    #[test]
    fn test_metric_label_escaping() {
        let test_data = [
            ("util", "util=0"),
            ("util=x", "util_x=0"),
            ("ut'il", "ut''il=0"),
            ("free space", "'free space'=0"),
        ];
        for (label, expected) in &test_data {
            assert_eq!(&Metric::new(*label, 0.0).perf_string(), expected);
        }
    }

    #[test]
    fn test_resource_status_string() {
        let resource = Resource::new("Phase 1")
            .with_item(CheckItem::ok("Voltage: 231.0 V").with_metric(Metric::new("voltage", 231.0)))
            .with_item(
                CheckItem::new(ServiceState::Warning, "Current: 16.3 A")
                    .with_metric(Metric::new("current", 16.3).with_levels(Some(16.0), Some(20.0))),
            );

        assert_eq!(resource.state(), ServiceState::Warning);
        assert_eq!(
            &resource.to_status_string(),
            "Phase 1 WARNING: Voltage: 231.0 V, Current: 16.3 A | voltage=231 current=16.3;16;20"
        );
    }

    #[test]
    fn test_resource_empty_is_unknown() {
        let resource = Resource::new("foo");
        assert_eq!(resource.state(), ServiceState::Unknown);
        assert_eq!(&resource.to_status_string(), "foo UNKNOWN");
    }

    #[test]
    fn test_resource_description_and_override() {
        let mut resource = Resource::new("foo")
            .with_description("PDU outlet bank")
            .with_item(CheckItem::ok("Status: on"));
        assert_eq!(
            &resource.to_status_string(),
            "foo OK: PDU outlet bank: Status: on"
        );

        resource.set_state(ServiceState::Critical);
        assert_eq!(resource.state(), ServiceState::Critical);
    }
}
