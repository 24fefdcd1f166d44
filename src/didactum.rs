//! Didactum monitoring system sensors (DIDACTUM-SYSTEM-MIB).
//!
//! The analog sensor table delivers one row per sensor:
//!
//! ```text
//! <<<didactum_sensors_analog>>>
//! temperature 101001 Server-Room-Front normal 22.5
//! humidity 201001 Server-Room-Front "low warning" 31.0
//! voltage 301001 UPS-Feed normal 230.1
//! ```
//!
//! ```text
//! .1.3.6.1.4.1.46501.5.2.1.4  ctlInternalSensorsAnalogName
//! .1.3.6.1.4.1.46501.5.2.1.6  ctlInternalSensorsAnalogState
//! .1.3.6.1.4.1.46501.5.2.1.7  ctlInternalSensorsAnalogValue
//! ```
//!
//! The state column is the vendor's textual alarm level. Quoting in the
//! raw walk is already resolved by the tokenizer, multi-word states
//! arrive re-joined with underscores by the agent.

use std::collections::BTreeMap;

use log::debug;

use crate::levels::{Levels, LevelsChecker};
use crate::registry::{CheckContext, CheckPlugin, Service};
use crate::section::{parse_field_f64, SectionSet, StringTable};
use crate::{CheckItem, ServiceState};

/// The vendor's textual alarm levels. Unknown texts fall back to
/// UNKNOWN with an `unknown[<state>]` message.
pub fn decode_state(state: &str) -> (ServiceState, String) {
    let normalized = state.replace('_', " ");
    let mapped = match normalized.as_str() {
        "normal" => Some(ServiceState::Ok),
        "low warning" | "high warning" => Some(ServiceState::Warning),
        "low alarm" | "high alarm" | "alarm" => Some(ServiceState::Critical),
        "not connected" => Some(ServiceState::Unknown),
        _ => None,
    };
    match mapped {
        Some(service_state) => (service_state, normalized),
        None => (ServiceState::Unknown, format!("unknown[{}]", normalized)),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DidactumSensor {
    pub kind: String,
    pub id: String,
    pub name: String,
    pub state: String,
    pub value: Option<f64>,
}

pub type DidactumSection = BTreeMap<String, DidactumSensor>;

/// Row layout: kind, id, name, state, value. Sensors without a numeric
/// value keep their state but drop the measurement.
pub fn parse_sensors(table: &StringTable) -> DidactumSection {
    let mut section = BTreeMap::new();
    for row in table {
        let [kind, id, name, state, value] = row.as_slice() else {
            debug!("didactum_sensors: skipping short row {:?}", row);
            continue;
        };
        section.insert(
            name.clone(),
            DidactumSensor {
                kind: kind.clone(),
                id: id.clone(),
                name: name.clone(),
                state: state.clone(),
                value: parse_field_f64(value),
            },
        );
    }
    section
}

/// Levels per measurable sensor kind.
#[derive(Clone, Debug, Default)]
pub struct DidactumParams {
    pub temperature: Option<Levels>,
    pub humidity: Option<Levels>,
    pub voltage: Option<Levels>,
    pub current: Option<Levels>,
}

impl DidactumParams {
    fn for_kind(&self, kind: &str) -> Option<Levels> {
        match kind {
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            "voltage" => self.voltage,
            "current" => self.current,
            _ => None,
        }
    }
}

fn channel(kind: &str) -> (&'static str, &'static str, &'static str) {
    // (title, unit label, metric name)
    match kind {
        "temperature" => ("Temperature", "°C", "temp"),
        "humidity" => ("Humidity", "%", "humidity"),
        "voltage" => ("Voltage", "V", "voltage"),
        "current" => ("Current", "A", "current"),
        _ => ("Value", "", "value"),
    }
}

/// Check plugin for Didactum analog sensors.
#[derive(Debug, Default)]
pub struct DidactumSensors {
    pub params: DidactumParams,
}

impl CheckPlugin for DidactumSensors {
    fn name(&self) -> &'static str {
        "didactum_sensors_analog"
    }

    fn service_name(&self) -> &'static str {
        "Sensor %s"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["didactum_sensors_analog"]
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        let Some(table) = sections.get("didactum_sensors_analog") else {
            return Vec::new();
        };
        parse_sensors(table).keys().map(Service::with_item).collect()
    }

    fn check(
        &self,
        item: Option<&str>,
        sections: &SectionSet,
        _ctx: &mut CheckContext,
    ) -> Vec<CheckItem> {
        let Some(table) = sections.get("didactum_sensors_analog") else {
            return Vec::new();
        };
        let section = parse_sensors(table);
        let sensor = match item.and_then(|item| section.get(item)) {
            Some(sensor) => sensor,
            None => return Vec::new(),
        };

        let (state, state_text) = decode_state(&sensor.state);
        let mut out = vec![CheckItem::new(state, format!("State: {}", state_text))];

        if let Some(value) = sensor.value {
            let (title, unit, metric) = channel(&sensor.kind);
            out.push(
                LevelsChecker::new(value)
                    .label(title)
                    .unit_label(unit)
                    .metric(metric)
                    .levels(self.params.for_kind(&sensor.kind).unwrap_or_default())
                    .check(),
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::MemoryStore;
    use crate::section::table_from_str;

    const WALK: &str = "\
temperature 101001 Server-Room-Front normal 22.5
humidity 201001 Server-Room-Hum low_warning 31.0
voltage 301001 UPS-Feed normal 230.1
vibration 401001 Rack-Shaker not_connected
";

    #[test]
    fn test_decode_state() {
        assert_eq!(decode_state("normal"), (ServiceState::Ok, "normal".to_owned()));
        assert_eq!(
            decode_state("low_warning"),
            (ServiceState::Warning, "low warning".to_owned())
        );
        assert_eq!(
            decode_state("high alarm"),
            (ServiceState::Critical, "high alarm".to_owned())
        );
        assert_eq!(
            decode_state("not_connected"),
            (ServiceState::Unknown, "not connected".to_owned())
        );
        assert_eq!(
            decode_state("glitchy"),
            (ServiceState::Unknown, "unknown[glitchy]".to_owned())
        );
    }

    #[test]
    fn test_parse_skips_short_rows() {
        let section = parse_sensors(&table_from_str(WALK));
        // The vibration row has no value column.
        assert!(!section.contains_key("Rack-Shaker"));
        assert_eq!(section.len(), 3);
    }

    #[test]
    fn test_check_state_and_value() {
        let sections = SectionSet::new().with("didactum_sensors_analog", table_from_str(WALK));
        let plugin = DidactumSensors {
            params: DidactumParams {
                temperature: Some(Levels::upper(30.0, 35.0)),
                ..Default::default()
            },
        };
        let mut store = MemoryStore::new();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };

        let out = plugin.check(Some("Server-Room-Front"), &sections, &mut ctx);
        assert_eq!(out[0].state, ServiceState::Ok);
        assert_eq!(out[0].text, "State: normal");
        assert_eq!(out[1].state, ServiceState::Ok);
        assert_eq!(out[1].text, "Temperature: 22.5 °C");
        assert_eq!(out[1].metrics[0].name(), "temp");
    }

    #[test]
    fn test_check_vendor_warning_drives_state() {
        let sections = SectionSet::new().with("didactum_sensors_analog", table_from_str(WALK));
        let plugin = DidactumSensors::default();
        let mut store = MemoryStore::new();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };

        let out = plugin.check(Some("Server-Room-Hum"), &sections, &mut ctx);
        assert_eq!(out[0].state, ServiceState::Warning);
        assert_eq!(out[0].text, "State: low warning");
        // Without configured levels the measurement itself stays OK.
        assert_eq!(out[1].state, ServiceState::Ok);
        assert_eq!(out[1].text, "Humidity: 31.0 %");
    }

    #[test]
    fn test_vanished_item() {
        let sections = SectionSet::new().with("didactum_sensors_analog", table_from_str(WALK));
        let plugin = DidactumSensors::default();
        let mut store = MemoryStore::new();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };
        assert!(plugin.check(Some("Gone"), &sections, &mut ctx).is_empty());
    }
}
