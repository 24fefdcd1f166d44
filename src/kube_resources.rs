//! CPU and memory resources of a Kubernetes object.
//!
//! Three sections feed this check: the aggregated requests/limits of
//! the object's containers, the live usage, and optionally what the
//! node or cluster can allocate. Usage is evaluated against its own
//! levels (absolute, or a percentage of the allocatable capacity) and
//! as a utilization percentage of the requested and limited amounts.

use crate::kube::{parse_section, AllocatableResource, PerformanceUsage, Resources};
use crate::levels::{Levels, LevelsChecker};
use crate::registry::{CheckContext, CheckPlugin, Service};
use crate::render;
use crate::section::SectionSet;
use crate::{CheckItem, ServiceState};

/// The checked quantity; decides rendering and metric naming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Cpu,
    Memory,
}

impl Quantity {
    fn render(&self) -> fn(f64) -> String {
        match self {
            Quantity::Cpu => render::cores,
            Quantity::Memory => render::bytes,
        }
    }

    fn metric_prefix(&self) -> &'static str {
        match self {
            Quantity::Cpu => "kube_cpu",
            Quantity::Memory => "kube_memory",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourceParams {
    /// Levels on the usage value itself. Percentage thresholds resolve
    /// against the allocatable capacity.
    pub usage: Option<Levels>,
    /// Percent levels on usage relative to the requests sum.
    pub request: Option<Levels>,
    /// Percent levels on usage relative to the limits sum.
    pub limit: Option<Levels>,
    /// Percent levels on usage relative to the allocatable capacity.
    pub node: Option<Levels>,
}

impl ResourceParams {
    pub fn with_usage(mut self, levels: Levels) -> Self {
        self.usage = Some(levels);
        self
    }

    pub fn with_request_utilization(mut self, warn: f64, crit: f64) -> Self {
        self.request = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_limit_utilization(mut self, warn: f64, crit: f64) -> Self {
        self.limit = Some(Levels::upper(warn, crit));
        self
    }

    pub fn with_node_utilization(mut self, warn: f64, crit: f64) -> Self {
        self.node = Some(Levels::upper(warn, crit));
        self
    }
}

/// Evaluates one quantity of one object.
pub fn check(
    quantity: Quantity,
    params: &ResourceParams,
    usage: Option<&PerformanceUsage>,
    resources: &Resources,
    allocatable: Option<&AllocatableResource>,
) -> Vec<CheckItem> {
    let mut out = Vec::new();
    let prefix = quantity.metric_prefix();

    if let Some(perf) = usage {
        let mut checker = LevelsChecker::new(perf.usage)
            .label("Usage")
            .render(quantity.render())
            .metric(format!("{}_usage", prefix))
            .levels(params.usage.unwrap_or_default());
        if let Some(allocatable) = allocatable {
            checker = checker.reference(allocatable.value);
        }
        out.push(checker.check());
    }

    out.push(annotated(
        format!("Requests: {}", quantity.render()(resources.request)),
        resources.count_unspecified_requests,
        "containers without requests",
    ));
    if let Some(perf) = usage {
        if resources.request > 0.0 {
            out.push(
                LevelsChecker::new(100.0 * perf.usage / resources.request)
                    .label("Requests utilization")
                    .render(render::percent)
                    .metric(format!("{}_request_utilization", prefix))
                    .levels(params.request.unwrap_or_default())
                    .check(),
            );
        }
    }

    let mut limit_notes = Vec::new();
    if resources.count_unspecified_limits > 0 {
        limit_notes.push(format!(
            "{} containers without limits",
            resources.count_unspecified_limits
        ));
    }
    if resources.count_zeroed_limits > 0 {
        limit_notes.push(format!(
            "{} containers with zeroed limits",
            resources.count_zeroed_limits
        ));
    }
    let limit_text = if limit_notes.is_empty() {
        format!("Limits: {}", quantity.render()(resources.limit))
    } else {
        format!(
            "Limits: {} ({})",
            quantity.render()(resources.limit),
            limit_notes.join(", ")
        )
    };
    out.push(CheckItem::ok(limit_text));
    if let Some(perf) = usage {
        if resources.limit > 0.0 {
            out.push(
                LevelsChecker::new(100.0 * perf.usage / resources.limit)
                    .label("Limits utilization")
                    .render(render::percent)
                    .metric(format!("{}_limit_utilization", prefix))
                    .levels(params.limit.unwrap_or_default())
                    .check(),
            );
        }
    }

    if let (Some(perf), Some(allocatable)) = (usage, allocatable) {
        if allocatable.value > 0.0 {
            let title = match allocatable.context.as_str() {
                "cluster" => "Cluster utilization",
                _ => "Node utilization",
            };
            out.push(
                LevelsChecker::new(100.0 * perf.usage / allocatable.value)
                    .label(title)
                    .render(render::percent)
                    .metric(format!("{}_node_utilization", prefix))
                    .levels(params.node.unwrap_or_default())
                    .check(),
            );
        }
    }

    out
}

fn annotated(text: String, count: u32, what: &str) -> CheckItem {
    if count > 0 {
        CheckItem::ok(format!("{} ({} {})", text, count, what))
    } else {
        CheckItem::ok(text)
    }
}

/// Check plugin covering both `kube_cpu` and `kube_memory`.
#[derive(Debug)]
pub struct KubeResources {
    pub quantity: Quantity,
    pub params: ResourceParams,
}

const CPU_SECTIONS: [&str; 3] = [
    "kube_cpu_resources",
    "kube_performance_cpu",
    "kube_allocatable_cpu_resource",
];
const MEMORY_SECTIONS: [&str; 3] = [
    "kube_memory_resources",
    "kube_performance_memory",
    "kube_allocatable_memory_resource",
];

impl KubeResources {
    fn section_names(&self) -> &'static [&'static str; 3] {
        match self.quantity {
            Quantity::Cpu => &CPU_SECTIONS,
            Quantity::Memory => &MEMORY_SECTIONS,
        }
    }
}

impl CheckPlugin for KubeResources {
    fn name(&self) -> &'static str {
        match self.quantity {
            Quantity::Cpu => "kube_cpu",
            Quantity::Memory => "kube_memory",
        }
    }

    fn service_name(&self) -> &'static str {
        match self.quantity {
            Quantity::Cpu => "CPU resources",
            Quantity::Memory => "Memory resources",
        }
    }

    fn sections(&self) -> &'static [&'static str] {
        self.section_names()
    }

    fn discover(&self, sections: &SectionSet) -> Vec<Service> {
        let [resources, _, _] = self.section_names();
        match sections.get(resources) {
            Some(table) if parse_section::<Resources>(table).is_ok() => vec![Service::new()],
            _ => Vec::new(),
        }
    }

    fn check(
        &self,
        _item: Option<&str>,
        sections: &SectionSet,
        _ctx: &mut CheckContext,
    ) -> Vec<CheckItem> {
        let [resources_name, usage_name, allocatable_name] = self.section_names();

        let Some(table) = sections.get(resources_name) else {
            return Vec::new();
        };
        let resources: Resources = match parse_section(table) {
            Ok(resources) => resources,
            Err(err) => {
                return vec![CheckItem::new(
                    ServiceState::Unknown,
                    format!("Invalid section data: {}", err),
                )]
            }
        };

        // The usage and allocatable sections are optional; collectors
        // for terminated objects stop shipping them.
        let usage: Option<PerformanceUsage> = sections
            .get(usage_name)
            .and_then(|table| parse_section(table).ok());
        let allocatable: Option<AllocatableResource> = sections
            .get(allocatable_name)
            .and_then(|table| parse_section(table).ok());

        check(
            self.quantity,
            &self.params,
            usage.as_ref(),
            &resources,
            allocatable.as_ref(),
        )
    }
}
