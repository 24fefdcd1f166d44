//! Pod lifecycle conditions.
//!
//! The kubelet reports a pod's progress as an ordered set of conditions
//! (scheduled → initialized → containers ready → ready). A healthy pod
//! has all of them passing and collapses to a single OK result. For a
//! failing condition the check reports how long the pod has been stuck
//! in it and compares that age against per-condition upper levels.

use crate::kube::{parse_section, PodCondition, PodConditionType, PodConditions, Timestamp};
use crate::levels::Levels;
use crate::registry::{CheckContext, CheckPlugin, Service};
use crate::render;
use crate::section::SectionSet;
use crate::{CheckItem, ServiceState};

/// Age levels (seconds) per condition.
#[derive(Clone, Debug, Default)]
pub struct PodConditionsParams {
    pub scheduled: Option<Levels>,
    pub hasnetwork: Option<Levels>,
    pub initialized: Option<Levels>,
    pub containersready: Option<Levels>,
    pub ready: Option<Levels>,
}

impl PodConditionsParams {
    pub fn with_scheduled(mut self, warn: f64, crit: f64) -> Self {
        self.scheduled = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_initialized(mut self, warn: f64, crit: f64) -> Self {
        self.initialized = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_containersready(mut self, warn: f64, crit: f64) -> Self {
        self.containersready = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_ready(mut self, warn: f64, crit: f64) -> Self {
        self.ready = Some(Levels::upper(warn, crit));
        self
    }

    fn for_condition(&self, which: PodConditionType) -> Option<Levels> {
        match which {
            PodConditionType::Scheduled => self.scheduled,
            PodConditionType::HasNetwork => self.hasnetwork,
            PodConditionType::Initialized => self.initialized,
            PodConditionType::ContainersReady => self.containersready,
            PodConditionType::Ready => self.ready,
        }
    }
}

/// Evaluates the conditions of one pod.
pub fn check(now: Timestamp, params: &PodConditionsParams, conditions: &PodConditions) -> Vec<CheckItem> {
    if conditions.all_passed() {
        return vec![CheckItem::ok("Ready, all conditions passed")];
    }

    conditions
        .in_order()
        .into_iter()
        .map(|(which, condition)| {
            if condition.status {
                CheckItem::ok(format!("{}: True", which.display_name()))
            } else {
                failing_condition(now, which, condition, params.for_condition(which))
            }
        })
        .collect()
}

fn failing_condition(
    now: Timestamp,
    which: PodConditionType,
    condition: &PodCondition,
    levels: Option<Levels>,
) -> CheckItem {
    let info = match (&condition.reason, &condition.detail) {
        (Some(reason), Some(detail)) => format!(" ({}: {})", reason, detail),
        (Some(reason), None) => format!(" ({})", reason),
        _ => String::new(),
    };

    // A failing condition that was never transitioned into has no age to
    // alert on yet.
    let age = condition
        .last_transition_time
        .map(|t| (now - t).max(0.0))
        .unwrap_or(0.0);

    let mut text = format!(
        "{}: False{} for {}",
        which.display_name(),
        info,
        render::timespan(age)
    );

    let mut state = ServiceState::Ok;
    if let Some(upper) = levels.and_then(|l| l.upper) {
        if let Some(triggered) = upper.evaluate(age, None) {
            state = triggered;
            let (warn, crit) = upper.resolved(None);
            match (warn, crit) {
                (Some(w), Some(c)) => text.push_str(&format!(
                    " (warn/crit at {}/{})",
                    render::timespan(w),
                    render::timespan(c)
                )),
                (Some(w), None) => {
                    text.push_str(&format!(" (warn at {})", render::timespan(w)))
                }
                _ => {}
            }
        }
    }

    CheckItem::new(state, text)
}

/// Check plugin for the `kube_pod_conditions` section.
#[derive(Debug, Default)]
pub struct KubePodConditions {
    pub params: PodConditionsParams,
}

impl CheckPlugin for KubePodConditions {
    fn name(&self) -> &'static str {
        "kube_pod_conditions"
    }

    fn service_name(&self) -> &'static str {
        "Condition"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["kube_pod_conditions"]
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        match sections.get("kube_pod_conditions") {
            Some(table) if parse_section::<PodConditions>(table).is_ok() => vec![Service::new()],
            _ => Vec::new(),
        }
    }

    fn check(
        &self,
        _item: Option<&str>,
        sections: &SectionSet,
        ctx: &mut CheckContext,
    ) -> Vec<CheckItem> {
        let Some(table) = sections.get("kube_pod_conditions") else {
            return Vec::new();
        };
        match parse_section::<PodConditions>(table) {
            Ok(conditions) => check(ctx.now, &self.params, &conditions),
            Err(err) => vec![CheckItem::new(
                ServiceState::Unknown,
                format!("Invalid section data: {}", err),
            )],
        }
    }
}
