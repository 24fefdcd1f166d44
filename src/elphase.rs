//! Evaluation of electrical phases as reported by PDUs and UPSes.
//!
//! Device parsers normalize their walk data into an [ElphaseSection]:
//! one [PhaseReadings] per phase or outlet, carrying whichever
//! quantities the device exposes. The check emits one result per
//! present quantity, each evaluated against the configured levels.
//!
//! Voltage is special: a plain (warn, crit) pair configures *lower*
//! levels, since sagging voltage is the failure mode. All other
//! quantities default to upper levels. Devices with symmetric
//! requirements can set [Levels::both] on any field directly.

use std::collections::BTreeMap;

use crate::levels::{Levels, LevelsChecker};
use crate::registry::Service;
use crate::{CheckItem, ServiceState, Unit};

/// Measured values for one phase. Everything is optional; absent
/// quantities are simply not checked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseReadings {
    /// Volts.
    pub voltage: Option<f64>,
    /// Amperes.
    pub current: Option<f64>,
    /// Percent of rated load.
    pub output_load: Option<f64>,
    /// Watts.
    pub power: Option<f64>,
    /// Volt-amperes.
    pub appower: Option<f64>,
    /// Watt-hours.
    pub energy: Option<f64>,
    /// Hertz.
    pub frequency: Option<f64>,
    /// Milliamperes.
    pub differential_current_ac: Option<f64>,
    /// Milliamperes.
    pub differential_current_dc: Option<f64>,
    /// Device-reported status, already decoded to a monitoring state and
    /// the vendor's wording.
    pub device_state: Option<(ServiceState, String)>,
}

/// Levels per quantity. Constructed via the `with_*` helpers, which
/// apply each quantity's conventional threshold direction.
#[derive(Clone, Debug, Default)]
pub struct ElphaseParams {
    pub voltage: Option<Levels>,
    pub current: Option<Levels>,
    pub output_load: Option<Levels>,
    pub power: Option<Levels>,
    pub appower: Option<Levels>,
    pub energy: Option<Levels>,
    pub frequency: Option<Levels>,
    pub differential_current_ac: Option<Levels>,
    pub differential_current_dc: Option<Levels>,
    /// Overrides for the monitoring state of device-reported status
    /// texts, e.g. `("standby", ServiceState::Ok)`.
    pub map_device_states: Vec<(String, ServiceState)>,
}

impl ElphaseParams {
    /// Lower levels: alert when the voltage sags below warn/crit.
    pub fn with_voltage(mut self, warn: f64, crit: f64) -> Self {
        self.voltage = Some(Levels::lower(warn, crit));
        self
    }

    pub fn with_current(mut self, warn: f64, crit: f64) -> Self {
        self.current = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_output_load(mut self, warn: f64, crit: f64) -> Self {
        self.output_load = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_power(mut self, warn: f64, crit: f64) -> Self {
        self.power = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_appower(mut self, warn: f64, crit: f64) -> Self {
        self.appower = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_energy(mut self, warn: f64, crit: f64) -> Self {
        self.energy = Some(Levels::upper(warn, crit));
        self
    }

    /// Upper and lower levels, mains frequency must stay in a band.
    pub fn with_frequency(mut self, warn: f64, crit: f64, warn_lower: f64, crit_lower: f64) -> Self {
        self.frequency = Some(Levels::both(warn, crit, warn_lower, crit_lower));
        self
    }

    pub fn with_differential_current_ac(mut self, warn: f64, crit: f64) -> Self {
        self.differential_current_ac = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_differential_current_dc(mut self, warn: f64, crit: f64) -> Self {
        self.differential_current_dc = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_device_state(mut self, text: impl Into<String>, state: ServiceState) -> Self {
        self.map_device_states.push((text.into(), state));
        self
    }
}

pub type ElphaseSection = BTreeMap<String, PhaseReadings>;

/// One service per phase present in the section.
pub fn discover(section: &ElphaseSection) -> Vec<Service> {
    section.keys().map(Service::with_item).collect()
}

/// Evaluates one phase. A phase missing from the section yields no
/// results, which the host framework treats as a vanished service.
pub fn check(item: &str, params: &ElphaseParams, section: &ElphaseSection) -> Vec<CheckItem> {
    let readings = match section.get(item) {
        Some(readings) => readings,
        None => return Vec::new(),
    };

    let mut out = Vec::new();

    if let Some((state, text)) = &readings.device_state {
        let state = params
            .map_device_states
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, s)| *s)
            .unwrap_or(*state);
        out.push(CheckItem::new(state, format!("Device status: {}", text)));
    }

    let quantities: [(Option<f64>, Option<Levels>, &str, Unit, &str); 9] = [
        (readings.voltage, params.voltage, "Voltage", Unit::Volts, "voltage"),
        (readings.current, params.current, "Current", Unit::Amperes, "current"),
        (readings.output_load, params.output_load, "Load", Unit::Percent, "output_load"),
        (readings.power, params.power, "Power", Unit::Watts, "power"),
        (readings.appower, params.appower, "Apparent Power", Unit::VoltAmperes, "appower"),
        (readings.energy, params.energy, "Energy", Unit::WattHours, "energy"),
        (readings.frequency, params.frequency, "Frequency", Unit::Hertz, "frequency"),
        (
            readings.differential_current_ac,
            params.differential_current_ac,
            "Differential current AC",
            Unit::Milliamperes,
            "differential_current_ac",
        ),
        (
            readings.differential_current_dc,
            params.differential_current_dc,
            "Differential current DC",
            Unit::Milliamperes,
            "differential_current_dc",
        ),
    ];

    for (value, levels, title, unit, metric) in quantities {
        let value = match value {
            Some(value) => value,
            None => continue,
        };
        out.push(
            LevelsChecker::new(value)
                .label(title)
                .unit(unit)
                .metric(metric)
                .levels(levels.unwrap_or_default())
                .check(),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    fn section(item: &str, readings: PhaseReadings) -> ElphaseSection {
        let mut section = BTreeMap::new();
        section.insert(item.to_owned(), readings);
        section
    }

    #[test]
    fn test_voltage_without_levels() {
        let section = section(
            "Output",
            PhaseReadings {
                voltage: Some(231.0),
                ..Default::default()
            },
        );
        let out = check("Output", &ElphaseParams::default(), &section);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].state, ServiceState::Ok);
        assert_eq!(out[0].text, "Voltage: 231.0 V");
        assert_eq!(
            out[0].metrics,
            vec![Metric::new("voltage", 231.0).with_unit(Unit::Volts)]
        );
    }

    #[test]
    fn test_voltage_pair_means_lower_levels() {
        let section = section(
            "Output",
            PhaseReadings {
                voltage: Some(231.0),
                ..Default::default()
            },
        );
        let params = ElphaseParams::default().with_voltage(250.0, 200.0);
        let out = check("Output", &params, &section);
        // 231 V is below the 250 V warn threshold but above the 200 V crit one.
        assert_eq!(out[0].state, ServiceState::Warning);
        assert_eq!(
            out[0].text,
            "Voltage: 231.0 V (warn/crit below 250.0 V/200.0 V)"
        );
    }

    #[test]
    fn test_current_pair_means_upper_levels() {
        let section = section(
            "Phase 1",
            PhaseReadings {
                current: Some(16.3),
                ..Default::default()
            },
        );
        let params = ElphaseParams::default().with_current(16.0, 20.0);
        let out = check("Phase 1", &params, &section);
        assert_eq!(out[0].state, ServiceState::Warning);
        assert_eq!(out[0].text, "Current: 16.3 A (warn/crit at 16.0 A/20.0 A)");
        assert_eq!(out[0].metrics[0].warn(), Some(16.0));
    }

    #[test]
    fn test_frequency_band() {
        let section = section(
            "Input",
            PhaseReadings {
                frequency: Some(49.2),
                ..Default::default()
            },
        );
        let params = ElphaseParams::default().with_frequency(50.5, 51.0, 49.5, 49.0);
        let out = check("Input", &params, &section);
        assert_eq!(out[0].state, ServiceState::Warning);
        assert_eq!(
            out[0].text,
            "Frequency: 49.2 Hz (warn/crit below 49.5 Hz/49.0 Hz)"
        );
    }

    #[test]
    fn test_multiple_quantities_in_order() {
        let section = section(
            "Output",
            PhaseReadings {
                voltage: Some(230.1),
                current: Some(4.2),
                power: Some(960.0),
                ..Default::default()
            },
        );
        let out = check("Output", &ElphaseParams::default(), &section);
        let texts: Vec<&str> = out.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Voltage: 230.1 V", "Current: 4.2 A", "Power: 960.0 W"]
        );
    }

    #[test]
    fn test_device_state_and_mapping() {
        let readings = PhaseReadings {
            device_state: Some((ServiceState::Critical, "standby".to_owned())),
            voltage: Some(0.0),
            ..Default::default()
        };
        let section = section("Output", readings);

        let out = check("Output", &ElphaseParams::default(), &section);
        assert_eq!(out[0].state, ServiceState::Critical);
        assert_eq!(out[0].text, "Device status: standby");

        // A site that expects standby outlets can downgrade the state.
        let params = ElphaseParams::default().with_device_state("standby", ServiceState::Ok);
        let out = check("Output", &params, &section);
        assert_eq!(out[0].state, ServiceState::Ok);
    }

    #[test]
    fn test_missing_item_vanishes() {
        let section = section("Output", PhaseReadings::default());
        assert!(check("Input", &ElphaseParams::default(), &section).is_empty());
    }

    #[test]
    fn test_discovery() {
        let mut sec = section(
            "Phase 1",
            PhaseReadings {
                voltage: Some(230.0),
                ..Default::default()
            },
        );
        sec.insert("Phase 2".to_owned(), PhaseReadings::default());
        assert_eq!(
            discover(&sec),
            vec![Service::with_item("Phase 1"), Service::with_item("Phase 2")]
        );
    }
}
