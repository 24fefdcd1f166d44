//! Shared types for the Kubernetes sections.
//!
//! The cluster collector ships these sections as single-line JSON
//! documents. Field names and the condition type strings follow the
//! collector's API; timestamps are unix seconds.

use serde::Deserialize;

use crate::section::{json_section, SectionError, StringTable};

pub type Timestamp = f64;

/// Pod lifecycle conditions in the order the kubelet works through
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodConditionType {
    Scheduled,
    HasNetwork,
    Initialized,
    ContainersReady,
    Ready,
}

impl PodConditionType {
    /// The name used in check output, e.g. `SCHEDULED`.
    pub fn display_name(&self) -> &'static str {
        match self {
            PodConditionType::Scheduled => "SCHEDULED",
            PodConditionType::HasNetwork => "HASNETWORK",
            PodConditionType::Initialized => "INITIALIZED",
            PodConditionType::ContainersReady => "CONTAINERSREADY",
            PodConditionType::Ready => "READY",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PodCondition {
    pub status: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub last_transition_time: Option<Timestamp>,
}

/// Section `kube_pod_conditions`. Conditions the kubelet has not
/// reported yet are absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PodConditions {
    #[serde(default)]
    pub scheduled: Option<PodCondition>,
    #[serde(default)]
    pub hasnetwork: Option<PodCondition>,
    #[serde(default)]
    pub initialized: Option<PodCondition>,
    #[serde(default)]
    pub containersready: Option<PodCondition>,
    #[serde(default)]
    pub ready: Option<PodCondition>,
}

impl PodConditions {
    /// Conditions in lifecycle order, skipping unreported ones.
    pub fn in_order(&self) -> Vec<(PodConditionType, &PodCondition)> {
        [
            (PodConditionType::Scheduled, &self.scheduled),
            (PodConditionType::HasNetwork, &self.hasnetwork),
            (PodConditionType::Initialized, &self.initialized),
            (PodConditionType::ContainersReady, &self.containersready),
            (PodConditionType::Ready, &self.ready),
        ]
        .into_iter()
        .filter_map(|(t, c)| c.as_ref().map(|c| (t, c)))
        .collect()
    }

    pub fn all_passed(&self) -> bool {
        let conditions = self.in_order();
        !conditions.is_empty() && conditions.iter().all(|(_, c)| c.status)
    }
}

/// Job conditions as reported on the job's status. A failed job carries
/// `Failed` with status true, a finished one `Complete` with status
/// true, a suspended one `Suspended` until it resumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum JobConditionType {
    Complete,
    Failed,
    Suspended,
}

#[derive(Clone, Debug, Deserialize)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub type_: JobConditionType,
    pub status: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub conditions: Vec<JobCondition>,
    /// Number of pending and running pods of the job.
    #[serde(default)]
    pub active: u32,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub completion_time: Option<Timestamp>,
}

impl JobStatus {
    pub fn has_condition(&self, which: JobConditionType) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == which && c.status)
    }
}

/// `last_schedule_time` is the last time a job was scheduled, which is
/// not the same as finished; `last_successful_time` is the last
/// successful completion.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CronJobStatus {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub last_schedule_time: Option<Timestamp>,
    #[serde(default)]
    pub last_successful_time: Option<Timestamp>,
}

/// Section `kube_cronjob_status`.
#[derive(Clone, Debug, Deserialize)]
pub struct CronJobSection {
    pub status: CronJobStatus,
    #[serde(default)]
    pub latest_job: Option<JobStatus>,
}

/// Aggregated requests/limits over the containers of the checked
/// object. Containers may leave either unspecified, the counts keep
/// track of how meaningful the sums are.
#[derive(Clone, Debug, Deserialize)]
pub struct Resources {
    pub request: f64,
    pub limit: f64,
    #[serde(default)]
    pub count_unspecified_requests: u32,
    #[serde(default)]
    pub count_unspecified_limits: u32,
    #[serde(default)]
    pub count_zeroed_limits: u32,
    pub count_total: u32,
}

/// What the node or cluster can hand out for one quantity.
#[derive(Clone, Debug, Deserialize)]
pub struct AllocatableResource {
    /// `node` or `cluster`.
    pub context: String,
    pub value: f64,
}

/// Live usage of one quantity.
#[derive(Clone, Debug, Deserialize)]
pub struct PerformanceUsage {
    pub usage: f64,
}

/// Deserializes a JSON section of the given type.
pub fn parse_section<T: serde::de::DeserializeOwned>(
    table: &StringTable,
) -> Result<T, SectionError> {
    json_section(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::table_from_str;

    #[test]
    fn test_pod_conditions_parsing_and_order() {
        let table = table_from_str(
            r#"{"scheduled": {"status": true, "last_transition_time": 1000.0}, "ready": {"status": false, "reason": "ContainersNotReady", "last_transition_time": 1600.0}}"#,
        );
        let conditions: PodConditions = parse_section(&table).unwrap();
        let order: Vec<PodConditionType> =
            conditions.in_order().iter().map(|(t, _)| *t).collect();
        assert_eq!(
            order,
            vec![PodConditionType::Scheduled, PodConditionType::Ready]
        );
        assert!(!conditions.all_passed());
    }

    #[test]
    fn test_all_passed_requires_reported_conditions() {
        assert!(!PodConditions::default().all_passed());
    }

    #[test]
    fn test_job_status_conditions() {
        let table = table_from_str(
            r#"{"status": {"last_schedule_time": 1000.0}, "latest_job": {"conditions": [{"type": "Complete", "status": true}], "start_time": 900.0, "completion_time": 980.0}}"#,
        );
        let section: CronJobSection = parse_section(&table).unwrap();
        let job = section.latest_job.unwrap();
        assert!(job.has_condition(JobConditionType::Complete));
        assert!(!job.has_condition(JobConditionType::Failed));
        assert_eq!(job.active, 0);
    }

    #[test]
    fn test_resources_parsing() {
        let table = table_from_str(
            r#"{"request": 0.5, "limit": 1.0, "count_unspecified_requests": 1, "count_total": 3}"#,
        );
        let resources: Resources = parse_section(&table).unwrap();
        assert_eq!(resources.request, 0.5);
        assert_eq!(resources.count_unspecified_requests, 1);
        assert_eq!(resources.count_zeroed_limits, 0);
    }
}
