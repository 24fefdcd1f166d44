//! CronJob status.
//!
//! The controller only keeps bookkeeping timestamps on the cronjob
//! itself; whether the workload is healthy shows on its latest job. The
//! job's terminal status is derived from its conditions and pod counts
//! by simple precedence, then Running/Pending jobs are aged against
//! configurable levels.

use crate::kube::{parse_section, CronJobSection, JobConditionType, JobStatus, Timestamp};
use crate::levels::Levels;
use crate::registry::{CheckContext, CheckPlugin, Service};
use crate::render;
use crate::section::SectionSet;
use crate::{CheckItem, Metric, ServiceState};
use std::fmt;

/// Terminal status of a job, in decreasing precedence of its sources:
/// conditions first, then running pods, then the bare existence of a
/// start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatusType {
    Completed,
    Failed,
    Running,
    Pending,
    Unknown,
}

impl fmt::Display for JobStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatusType::Completed => "Completed",
            JobStatusType::Failed => "Failed",
            JobStatusType::Running => "Running",
            JobStatusType::Pending => "Pending",
            JobStatusType::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl JobStatusType {
    pub fn of(job: &JobStatus) -> JobStatusType {
        if job.has_condition(JobConditionType::Complete) {
            JobStatusType::Completed
        } else if job.has_condition(JobConditionType::Failed) {
            JobStatusType::Failed
        } else if job.active > 0 {
            JobStatusType::Running
        } else if job.start_time.is_none() {
            JobStatusType::Pending
        } else {
            JobStatusType::Unknown
        }
    }
}

#[derive(Clone, Debug)]
pub struct CronJobParams {
    /// Age levels (seconds) for a job stuck in Pending.
    pub pending: Option<Levels>,
    /// Age levels (seconds) for a Running job.
    pub running: Option<Levels>,
    /// State reported when the latest job failed.
    pub failed_state: ServiceState,
}

impl Default for CronJobParams {
    fn default() -> CronJobParams {
        CronJobParams {
            pending: None,
            running: None,
            failed_state: ServiceState::Critical,
        }
    }
}

impl CronJobParams {
    pub fn with_pending(mut self, warn: f64, crit: f64) -> Self {
        self.pending = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_running(mut self, warn: f64, crit: f64) -> Self {
        self.running = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_failed_state(mut self, state: ServiceState) -> Self {
        self.failed_state = state;
        self
    }
}

/// Evaluates one cronjob.
pub fn check(now: Timestamp, params: &CronJobParams, section: &CronJobSection) -> Vec<CheckItem> {
    let mut out = Vec::new();

    match &section.latest_job {
        None => out.push(CheckItem::ok("No jobs executed yet")),
        Some(job) => out.push(latest_job_item(now, params, section, job)),
    }

    if let Some(t) = section.status.last_schedule_time {
        out.push(CheckItem::ok(format!("Last schedule: {}", render::datetime(t))));
    }
    if let Some(t) = section.status.last_successful_time {
        out.push(CheckItem::ok(format!(
            "Last completion: {}",
            render::datetime(t)
        )));
    }

    let active = section.status.active.len();
    out.push(
        CheckItem::ok(format!("Active jobs: {}", active))
            .with_metric(Metric::new("active_jobs", active as f64)),
    );

    out
}

fn latest_job_item(
    now: Timestamp,
    params: &CronJobParams,
    section: &CronJobSection,
    job: &JobStatus,
) -> CheckItem {
    match JobStatusType::of(job) {
        JobStatusType::Completed => {
            let mut item = CheckItem::ok("Latest job: Completed");
            if let (Some(start), Some(end)) = (job.start_time, job.completion_time) {
                item = item.with_metric(Metric::new("job_duration", (end - start).max(0.0)));
            }
            item
        }
        JobStatusType::Failed => CheckItem::new(params.failed_state, "Latest job: Failed"),
        JobStatusType::Running => aged_item("Running", job_age(now, section, job), params.running),
        JobStatusType::Pending => aged_item("Pending", job_age(now, section, job), params.pending),
        JobStatusType::Unknown => CheckItem::new(ServiceState::Unknown, "Latest job: Unknown"),
    }
}

/// How long the latest job has been going: since its start, or since it
/// was last scheduled if it never started.
fn job_age(now: Timestamp, section: &CronJobSection, job: &JobStatus) -> Option<f64> {
    job.start_time
        .or(section.status.last_schedule_time)
        .map(|t| (now - t).max(0.0))
}

fn aged_item(status: &str, age: Option<f64>, levels: Option<Levels>) -> CheckItem {
    let age = match age {
        Some(age) => age,
        None => return CheckItem::ok(format!("Latest job: {}", status)),
    };

    let mut text = format!("Latest job: {} for {}", status, render::timespan(age));
    let mut state = ServiceState::Ok;
    if let Some(upper) = levels.and_then(|l| l.upper) {
        if let Some(triggered) = upper.evaluate(age, None) {
            state = triggered;
            if let (Some(warn), Some(crit)) = upper.resolved(None) {
                text.push_str(&format!(
                    " (warn/crit at {}/{})",
                    render::timespan(warn),
                    render::timespan(crit)
                ));
            }
        }
    }
    CheckItem::new(state, text)
}

/// Check plugin for the `kube_cronjob_status` section.
#[derive(Debug, Default)]
pub struct KubeCronJob {
    pub params: CronJobParams,
}

impl CheckPlugin for KubeCronJob {
    fn name(&self) -> &'static str {
        "kube_cronjob_status"
    }

    fn service_name(&self) -> &'static str {
        "CronJob status"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["kube_cronjob_status"]
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        match sections.get("kube_cronjob_status") {
            Some(table) if parse_section::<CronJobSection>(table).is_ok() => vec![Service::new()],
            _ => Vec::new(),
        }
    }

    fn check(
        &self,
        _item: Option<&str>,
        sections: &SectionSet,
        ctx: &mut CheckContext,
    ) -> Vec<CheckItem> {
        let Some(table) = sections.get("kube_cronjob_status") else {
            return Vec::new();
        };
        match parse_section::<CronJobSection>(table) {
            Ok(section) => check(ctx.now, &self.params, &section),
            Err(err) => vec![CheckItem::new(
                ServiceState::Unknown,
                format!("Invalid section data: {}", err),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{CronJobStatus, JobCondition};

    fn job(conditions: Vec<(JobConditionType, bool)>, active: u32, start: Option<f64>, end: Option<f64>) -> JobStatus {
        JobStatus {
            conditions: conditions
                .into_iter()
                .map(|(type_, status)| JobCondition { type_, status })
                .collect(),
            active,
            start_time: start,
            completion_time: end,
        }
    }

    #[test]
    fn test_status_precedence() {
        use JobStatusType::*;
        assert_eq!(
            JobStatusType::of(&job(vec![(JobConditionType::Complete, true)], 0, Some(1.0), Some(2.0))),
            Completed
        );
        assert_eq!(
            JobStatusType::of(&job(vec![(JobConditionType::Failed, true)], 0, Some(1.0), None)),
            Failed
        );
        // A false condition does not count.
        assert_eq!(
            JobStatusType::of(&job(vec![(JobConditionType::Failed, false)], 1, Some(1.0), None)),
            Running
        );
        assert_eq!(JobStatusType::of(&job(vec![], 0, None, None)), Pending);
        assert_eq!(JobStatusType::of(&job(vec![], 0, Some(1.0), None)), Unknown);
    }

    #[test]
    fn test_completed_job() {
        let section = CronJobSection {
            status: CronJobStatus {
                active: vec![],
                last_schedule_time: Some(1000.0),
                last_successful_time: Some(1080.0),
            },
            latest_job: Some(job(
                vec![(JobConditionType::Complete, true)],
                0,
                Some(1000.0),
                Some(1080.0),
            )),
        };
        let out = check(2000.0, &CronJobParams::default(), &section);
        assert_eq!(out[0].text, "Latest job: Completed");
        assert_eq!(out[0].metrics[0].name(), "job_duration");
        assert_eq!(out[0].metrics[0].value(), 80.0);
        assert_eq!(out[1].text, "Last schedule: 1970-01-01 00:16:40");
        assert_eq!(out[2].text, "Last completion: 1970-01-01 00:18:00");
        assert_eq!(out[3].text, "Active jobs: 0");
    }

    #[test]
    fn test_running_job_ages_against_levels() {
        let section = CronJobSection {
            status: CronJobStatus {
                active: vec!["job-1".to_owned()],
                last_schedule_time: Some(1000.0),
                last_successful_time: None,
            },
            latest_job: Some(job(vec![], 1, Some(1000.0), None)),
        };
        let params = CronJobParams::default().with_running(600.0, 1800.0);

        let out = check(1300.0, &params, &section);
        assert_eq!(out[0].state, ServiceState::Ok);
        assert_eq!(out[0].text, "Latest job: Running for 5 minutes 0 seconds");

        let out = check(2000.0, &params, &section);
        assert_eq!(out[0].state, ServiceState::Warning);
        assert_eq!(
            out[0].text,
            "Latest job: Running for 16 minutes 40 seconds (warn/crit at 10 minutes 0 seconds/30 minutes 0 seconds)"
        );
    }

    #[test]
    fn test_failed_job_state_is_configurable() {
        let section = CronJobSection {
            status: CronJobStatus::default(),
            latest_job: Some(job(vec![(JobConditionType::Failed, true)], 0, Some(1.0), None)),
        };

        let out = check(100.0, &CronJobParams::default(), &section);
        assert_eq!(out[0].state, ServiceState::Critical);
        assert_eq!(out[0].text, "Latest job: Failed");

        let params = CronJobParams::default().with_failed_state(ServiceState::Warning);
        let out = check(100.0, &params, &section);
        assert_eq!(out[0].state, ServiceState::Warning);
    }

    #[test]
    fn test_no_jobs_yet() {
        let section = CronJobSection {
            status: CronJobStatus::default(),
            latest_job: None,
        };
        let out = check(100.0, &CronJobParams::default(), &section);
        assert_eq!(out[0].text, "No jobs executed yet");
        assert_eq!(out[1].text, "Active jobs: 0");
    }
}
