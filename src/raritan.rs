//! Raritan PX2/PX3 PDU sensors (PDU2-MIB).
//!
//! Two sections are handled here. External environment sensors:
//!
//! ```text
//! <<<raritan_sensors>>>
//! 1 10 Rack-Temp 1 4 7 1 235
//! 2 11 Rack-Hum  1 4 9 0 41
//! ```
//!
//! with the columns taken from
//!
//! ```text
//! .1.3.6.1.4.1.13742.6.3.6.3.1.2   externalSensorType
//! .1.3.6.1.4.1.13742.6.3.6.3.1.3   externalSensorName
//! .1.3.6.1.4.1.13742.6.5.5.3.1.2   measurementsExternalSensorIsAvailable
//! .1.3.6.1.4.1.13742.6.5.5.3.1.3   measurementsExternalSensorState
//! .1.3.6.1.4.1.13742.6.3.6.3.1.16  externalSensorUnits
//! .1.3.6.1.4.1.13742.6.3.6.3.1.17  externalSensorDecimalDigits
//! .1.3.6.1.4.1.13742.6.5.5.3.1.4   measurementsExternalSensorValue
//! ```
//!
//! and the inlet pole measurements (one row per phase and sensor):
//!
//! ```text
//! <<<raritan_pdu_inlet>>>
//! 1 4 1 2308
//! 1 1 2 43
//! ```
//!
//! ```text
//! .1.3.6.1.4.1.13742.6.5.2.4.1.4   measurementsInletPoleSensorValue
//! ```
//!
//! Raw values are scaled by the sensor's own decimal-digit column.

use std::collections::BTreeMap;

use log::debug;

use crate::elphase::{self, ElphaseParams, ElphaseSection, PhaseReadings};
use crate::levels::{Levels, LevelsChecker};
use crate::registry::{CheckContext, CheckPlugin, Service};
use crate::section::{parse_field_f64, SectionSet, StringTable};
use crate::{CheckItem, ServiceState};

/// Decoded sensor type per PDU2-MIB sensorTypeEnumeration (subset).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorKind {
    RmsCurrent,
    PeakCurrent,
    UnbalancedCurrent,
    RmsVoltage,
    ActivePower,
    ApparentPower,
    PowerFactor,
    ActiveEnergy,
    ApparentEnergy,
    Temperature,
    Humidity,
    AirFlow,
    AirPressure,
    OnOff,
    Trip,
    Vibration,
    WaterDetection,
    SmokeDetection,
    Other(i64),
}

/// sensorTypeEnumeration: rmsCurrent(1) .. smokeDetection(18).
pub fn decode_sensor_type(code: i64) -> SensorKind {
    match code {
        1 => SensorKind::RmsCurrent,
        2 => SensorKind::PeakCurrent,
        3 => SensorKind::UnbalancedCurrent,
        4 => SensorKind::RmsVoltage,
        5 => SensorKind::ActivePower,
        6 => SensorKind::ApparentPower,
        7 => SensorKind::PowerFactor,
        8 => SensorKind::ActiveEnergy,
        9 => SensorKind::ApparentEnergy,
        10 => SensorKind::Temperature,
        11 => SensorKind::Humidity,
        12 => SensorKind::AirFlow,
        13 => SensorKind::AirPressure,
        14 => SensorKind::OnOff,
        15 => SensorKind::Trip,
        16 => SensorKind::Vibration,
        17 => SensorKind::WaterDetection,
        18 => SensorKind::SmokeDetection,
        other => SensorKind::Other(other),
    }
}

impl SensorKind {
    pub fn title(&self) -> String {
        match self {
            SensorKind::RmsCurrent => "Current".to_owned(),
            SensorKind::PeakCurrent => "Peak current".to_owned(),
            SensorKind::UnbalancedCurrent => "Unbalanced current".to_owned(),
            SensorKind::RmsVoltage => "Voltage".to_owned(),
            SensorKind::ActivePower => "Power".to_owned(),
            SensorKind::ApparentPower => "Apparent Power".to_owned(),
            SensorKind::PowerFactor => "Power factor".to_owned(),
            SensorKind::ActiveEnergy => "Energy".to_owned(),
            SensorKind::ApparentEnergy => "Apparent energy".to_owned(),
            SensorKind::Temperature => "Temperature".to_owned(),
            SensorKind::Humidity => "Humidity".to_owned(),
            SensorKind::AirFlow => "Air flow".to_owned(),
            SensorKind::AirPressure => "Air pressure".to_owned(),
            SensorKind::OnOff => "On/off sensor".to_owned(),
            SensorKind::Trip => "Trip sensor".to_owned(),
            SensorKind::Vibration => "Vibration".to_owned(),
            SensorKind::WaterDetection => "Water detection".to_owned(),
            SensorKind::SmokeDetection => "Smoke detection".to_owned(),
            SensorKind::Other(code) => format!("Sensor type {}", code),
        }
    }

    /// Metric name for measurable channels; state-only sensors have none.
    pub fn metric(&self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature => Some("temp"),
            SensorKind::Humidity => Some("humidity"),
            SensorKind::AirFlow => Some("airflow"),
            SensorKind::AirPressure => Some("pressure"),
            _ => None,
        }
    }
}

/// sensorStateEnumeration → monitoring state and the vendor's wording.
fn sensor_state_map(code: i64) -> Option<(ServiceState, &'static str)> {
    let decoded = match code {
        -1 => (ServiceState::Unknown, "unavailable"),
        0 => (ServiceState::Critical, "open"),
        1 => (ServiceState::Ok, "closed"),
        2 => (ServiceState::Critical, "below lower critical"),
        3 => (ServiceState::Warning, "below lower warning"),
        4 => (ServiceState::Ok, "normal"),
        5 => (ServiceState::Warning, "above upper warning"),
        6 => (ServiceState::Critical, "above upper critical"),
        7 => (ServiceState::Ok, "on"),
        8 => (ServiceState::Critical, "off"),
        9 => (ServiceState::Ok, "detected"),
        10 => (ServiceState::Critical, "not detected"),
        11 => (ServiceState::Critical, "alarmed"),
        _ => return None,
    };
    Some(decoded)
}

/// Decodes a sensor state code, falling back to UNKNOWN with an
/// `unknown[<code>]` text for enumeration values this table does not
/// know.
pub fn decode_sensor_state(code: i64) -> (ServiceState, String) {
    match sensor_state_map(code) {
        Some((state, text)) => (state, text.to_owned()),
        None => (ServiceState::Unknown, format!("unknown[{}]", code)),
    }
}

/// sensorUnitsEnumeration (subset); unknown codes render unitless.
pub fn decode_unit(code: i64) -> &'static str {
    match code {
        1 => "V",
        2 => "A",
        3 => "W",
        4 => "VA",
        5 => "Wh",
        6 => "VAh",
        7 => "°C",
        8 => "Hz",
        9 => "%",
        10 => "m/s",
        11 => "Pa",
        _ => "",
    }
}

#[derive(Clone, Debug)]
pub struct RaritanSensor {
    pub id: String,
    pub kind: SensorKind,
    pub name: String,
    pub available: bool,
    pub state_code: i64,
    pub unit: &'static str,
    pub value: Option<f64>,
}

pub type RaritanSection = BTreeMap<String, RaritanSensor>;

/// Parses the external sensor table. Rows with a malformed type, state
/// or digit column are skipped.
pub fn parse_sensors(table: &StringTable) -> RaritanSection {
    let mut section = BTreeMap::new();
    for row in table {
        let [id, type_code, name, available, state, units, digits, value] = row.as_slice() else {
            debug!("raritan_sensors: skipping short row {:?}", row);
            continue;
        };
        let (Ok(type_code), Ok(state_code)) = (type_code.parse(), state.parse()) else {
            debug!("raritan_sensors: skipping row with bad codes {:?}", row);
            continue;
        };
        let digits: u32 = digits.parse().unwrap_or(0);
        let value = parse_field_f64(value).map(|raw| raw / 10f64.powi(digits as i32));

        let item = if name.is_empty() {
            format!("Sensor {}", id)
        } else {
            name.clone()
        };
        section.insert(
            item,
            RaritanSensor {
                id: id.clone(),
                kind: decode_sensor_type(type_code),
                name: name.clone(),
                available: available == "1",
                state_code,
                unit: units.parse().map(decode_unit).unwrap_or(""),
                value,
            },
        );
    }
    section
}

/// Levels for the measurable external sensor channels.
#[derive(Clone, Debug, Default)]
pub struct RaritanSensorParams {
    pub temperature: Option<Levels>,
    pub humidity: Option<Levels>,
}

/// Check plugin for Raritan external sensors.
#[derive(Debug, Default)]
pub struct RaritanSensors {
    pub params: RaritanSensorParams,
}

impl CheckPlugin for RaritanSensors {
    fn name(&self) -> &'static str {
        "raritan_sensors"
    }

    fn service_name(&self) -> &'static str {
        "Sensor %s"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["raritan_sensors"]
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        let Some(table) = sections.get("raritan_sensors") else {
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
        let Some(table) = sections.get("raritan_sensors") else {
            return Vec::new();
        };
        let section = parse_sensors(table);
        let sensor = match item.and_then(|item| section.get(item)) {
            Some(sensor) => sensor,
            None => return Vec::new(),
        };

        if !sensor.available {
            return vec![CheckItem::new(
                ServiceState::Unknown,
                "Sensor is unavailable",
            )];
        }

        let (state, state_text) = decode_sensor_state(sensor.state_code);
        let mut out = vec![CheckItem::new(state, format!("Status: {}", state_text))];

        if let (Some(value), Some(metric)) = (sensor.value, sensor.kind.metric()) {
            let levels = match sensor.kind {
                SensorKind::Temperature => self.params.temperature,
                SensorKind::Humidity => self.params.humidity,
                _ => None,
            };
            out.push(
                LevelsChecker::new(value)
                    .label(sensor.kind.title())
                    .unit_label(sensor.unit)
                    .metric(metric)
                    .levels(levels.unwrap_or_default())
                    .check(),
            );
        }

        out
    }
}

/// Parses the inlet pole measurements into an electrical phase section.
/// Row layout: phase id, sensor type, decimal digits, raw value.
pub fn parse_pdu_inlet(table: &StringTable) -> ElphaseSection {
    let mut section: ElphaseSection = BTreeMap::new();
    for row in table {
        let [phase, type_code, digits, value] = row.as_slice() else {
            debug!("raritan_pdu_inlet: skipping short row {:?}", row);
            continue;
        };
        let Ok(type_code) = type_code.parse::<i64>() else {
            debug!("raritan_pdu_inlet: skipping row with bad type {:?}", row);
            continue;
        };
        let digits: u32 = digits.parse().unwrap_or(0);
        let Some(value) = parse_field_f64(value).map(|raw| raw / 10f64.powi(digits as i32)) else {
            continue;
        };

        let readings = section.entry(phase.clone()).or_insert_with(PhaseReadings::default);
        match decode_sensor_type(type_code) {
            SensorKind::RmsCurrent => readings.current = Some(value),
            SensorKind::RmsVoltage => readings.voltage = Some(value),
            SensorKind::ActivePower => readings.power = Some(value),
            SensorKind::ApparentPower => readings.appower = Some(value),
            SensorKind::ActiveEnergy => readings.energy = Some(value),
            kind => {
                debug!("raritan_pdu_inlet: ignoring sensor kind {:?}", kind);
            }
        }
    }
    section
}

/// Check plugin for the PDU inlet phases, evaluated by the shared
/// electrical phase logic.
#[derive(Debug, Default)]
pub struct RaritanPduInlet {
    pub params: ElphaseParams,
}

impl CheckPlugin for RaritanPduInlet {
    fn name(&self) -> &'static str {
        "raritan_pdu_inlet"
    }

    fn service_name(&self) -> &'static str {
        "Input Phase %s"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["raritan_pdu_inlet"]
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        let Some(table) = sections.get("raritan_pdu_inlet") else {
            return Vec::new();
        };
        elphase::discover(&parse_pdu_inlet(table))
    }

    fn check(
        &self,
        item: Option<&str>,
        sections: &SectionSet,
        _ctx: &mut CheckContext,
    ) -> Vec<CheckItem> {
        let (Some(item), Some(table)) = (item, sections.get("raritan_pdu_inlet")) else {
            return Vec::new();
        };
        elphase::check(item, &self.params, &parse_pdu_inlet(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::MemoryStore;
    use crate::section::table_from_str;

    const SENSOR_WALK: &str = "\
1 10 Rack-Temp 1 4 7 1 235
2 11 Rack-Hum 1 5 9 0 61
3 17 Leak 1 9 -1 0
4 99 Oddball 1 42 -1 0 0
5 10 Broken-Temp 0 4 7 1 0
";

    fn ctx_store() -> MemoryStore {
        MemoryStore::new()
    }

    #[test]
    fn test_parse_sensors_scales_by_decimal_digits() {
        let section = parse_sensors(&table_from_str(SENSOR_WALK));
        let temp = &section["Rack-Temp"];
        assert_eq!(temp.kind, SensorKind::Temperature);
        assert_eq!(temp.value, Some(23.5));
        assert_eq!(temp.unit, "°C");

        let hum = &section["Rack-Hum"];
        assert_eq!(hum.value, Some(61.0));
    }

    #[test]
    fn test_parse_sensors_skips_short_rows() {
        // "Leak" has no value column at all.
        let section = parse_sensors(&table_from_str(SENSOR_WALK));
        assert!(!section.contains_key("Leak"));
    }

    #[test]
    fn test_state_decoding() {
        assert_eq!(decode_sensor_state(4), (ServiceState::Ok, "normal".to_owned()));
        assert_eq!(
            decode_sensor_state(5),
            (ServiceState::Warning, "above upper warning".to_owned())
        );
        assert_eq!(
            decode_sensor_state(11),
            (ServiceState::Critical, "alarmed".to_owned())
        );
        assert_eq!(
            decode_sensor_state(77),
            (ServiceState::Unknown, "unknown[77]".to_owned())
        );
    }

    #[test]
    fn test_check_sensor_with_levels() {
        let sections = SectionSet::new().with("raritan_sensors", table_from_str(SENSOR_WALK));
        let plugin = RaritanSensors {
            params: RaritanSensorParams {
                temperature: Some(Levels::upper(20.0, 30.0)),
                ..Default::default()
            },
        };
        let mut store = ctx_store();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };

        let out = plugin.check(Some("Rack-Temp"), &sections, &mut ctx);
        assert_eq!(out[0].text, "Status: normal");
        assert_eq!(out[0].state, ServiceState::Ok);
        assert_eq!(
            out[1].text,
            "Temperature: 23.5 °C (warn/crit at 20.0 °C/30.0 °C)"
        );
        assert_eq!(out[1].state, ServiceState::Warning);
        assert_eq!(out[1].metrics[0].name(), "temp");
    }

    #[test]
    fn test_check_unavailable_sensor() {
        let sections = SectionSet::new().with("raritan_sensors", table_from_str(SENSOR_WALK));
        let plugin = RaritanSensors::default();
        let mut store = ctx_store();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };

        let out = plugin.check(Some("Broken-Temp"), &sections, &mut ctx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].state, ServiceState::Unknown);
        assert_eq!(out[0].text, "Sensor is unavailable");
    }

    #[test]
    fn test_check_unknown_type_and_state() {
        let sections = SectionSet::new().with("raritan_sensors", table_from_str(SENSOR_WALK));
        let plugin = RaritanSensors::default();
        let mut store = ctx_store();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };

        let out = plugin.check(Some("Oddball"), &sections, &mut ctx);
        assert_eq!(out[0].state, ServiceState::Unknown);
        assert_eq!(out[0].text, "Status: unknown[42]");
    }

    #[test]
    fn test_inlet_phases_feed_elphase() {
        let walk = "\
1 4 1 2308
1 1 2 430
2 4 1 2295
2 1 2 161
";
        let sections = SectionSet::new().with("raritan_pdu_inlet", table_from_str(walk));
        let plugin = RaritanPduInlet {
            params: ElphaseParams::default()
                .with_voltage(220.0, 210.0)
                .with_current(16.0, 20.0),
        };

        let services = plugin.discover(&sections);
        assert_eq!(
            services,
            vec![Service::with_item("1"), Service::with_item("2")]
        );

        let mut store = ctx_store();
        let mut ctx = CheckContext {
            now: 0.0,
            value_store: &mut store,
        };
        let out = plugin.check(Some("1"), &sections, &mut ctx);
        assert_eq!(out[0].text, "Voltage: 230.8 V");
        assert_eq!(out[0].state, ServiceState::Ok);
        assert_eq!(out[1].text, "Current: 4.3 A");

        let out = plugin.check(Some("2"), &sections, &mut ctx);
        assert_eq!(out[1].text, "Current: 1.6 A");
    }
}
