//! KTLO task dashboard view.
//!
//! `TaskDashboard::view` turns (records, filter, now) into the complete
//! view-model. Two scopes are computed per pass:
//! - metric scope: fiscal year, status set and search. Feeds every metric,
//!   chart and list.
//! - table scope: the metric scope narrowed by the single active facet.
//!   Only the table reads it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{self, DueWindow, TaskUrgency, TicketMatcher};
use crate::config::Config;
use crate::error::OpsError;
use crate::types::{DueDate, TaskRecord, TaskStatus};
use crate::util;

use super::aggregate::{distribution, drill_down, toggle, CountEntry};

/// Status chart colors.
const STATUS_COLORS: [(TaskStatus, &str); 3] = [
    (TaskStatus::Completed, "#10b981"),
    (TaskStatus::InProgress, "#3b82f6"),
    (TaskStatus::NotStarted, "#f59e0b"),
];

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FiscalYearSelector {
    #[default]
    All,
    Year(String),
}

impl FiscalYearSelector {
    /// Tasks without a usable received-on date are never excluded.
    fn accepts(&self, fiscal_year: Option<&str>) -> bool {
        match (self, fiscal_year) {
            (FiscalYearSelector::All, _) | (_, None) => true,
            (FiscalYearSelector::Year(selected), Some(fy)) => selected == fy,
        }
    }
}

/// A clickable category that narrows the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "value", rename_all = "camelCase")]
pub enum TaskFacet {
    Status(TaskStatus),
    Assignee(String),
    Urgency(TaskUrgency),
    DueWindow(DueWindow),
    Triaged,
    CcsAction,
}

impl TaskFacet {
    pub fn matches(&self, task: &AnnotatedTask) -> bool {
        match self {
            TaskFacet::Status(status) => task.record.status == *status,
            TaskFacet::Assignee(label) => task.assignee_label == *label,
            TaskFacet::Urgency(urgency) => task.urgency == *urgency,
            TaskFacet::DueWindow(window) => task.due_window == Some(*window),
            TaskFacet::Triaged => task.record.triaged,
            TaskFacet::CcsAction => task.record.ccs_action_needed,
        }
    }
}

/// Task dashboard filter. Methods return a new filter and leave `self` as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub search: String,
    /// Statuses shown. Empty accepts every status.
    pub statuses: BTreeSet<TaskStatus>,
    pub fiscal_year: FiscalYearSelector,
    pub active: Option<TaskFacet>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            statuses: TaskStatus::ALL.into_iter().collect(),
            fiscal_year: FiscalYearSelector::All,
            active: None,
        }
    }
}

impl TaskFilter {
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..self.clone()
        }
    }

    /// Add `status` to the shown set, or remove it if already shown.
    pub fn toggle_status(&self, status: TaskStatus) -> Self {
        let mut statuses = self.statuses.clone();
        if !statuses.remove(&status) {
            statuses.insert(status);
        }
        Self {
            statuses,
            ..self.clone()
        }
    }

    pub fn with_fiscal_year(&self, fiscal_year: FiscalYearSelector) -> Self {
        Self {
            fiscal_year,
            ..self.clone()
        }
    }

    pub fn toggle_active(&self, facet: TaskFacet) -> Self {
        Self {
            active: toggle(self.active.clone(), facet),
            ..self.clone()
        }
    }

    pub fn clear_active(&self) -> Self {
        Self {
            active: None,
            ..self.clone()
        }
    }

    fn in_metric_scope(&self, task: &AnnotatedTask) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&task.record.status) {
            return false;
        }
        if !self.fiscal_year.accepts(task.fiscal_year.as_deref()) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let record = &task.record;
        [
            Some(record.item.as_str()),
            record.comments.as_deref(),
            record.assignee.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

// ---------------------------------------------------------------------------
// View-model
// ---------------------------------------------------------------------------

/// A task with everything the table shows about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTask {
    #[serde(flatten)]
    pub record: TaskRecord,
    pub assignee_label: String,
    pub urgency: TaskUrgency,
    pub due_window: Option<DueWindow>,
    pub fiscal_year: Option<String>,
    pub ticket_id: Option<String>,
    pub ticket_url: Option<String>,
    /// Due date as displayed, e.g. "Mar 15, 2024".
    pub due_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub total: usize,
    pub triaged: usize,
    pub triaged_percent: u32,
    pub ccs_action: usize,
    pub completed: usize,
    pub completed_percent: u32,
    pub in_progress: usize,
    pub not_started: usize,
    pub overdue: usize,
    #[serde(rename = "due7Days")]
    pub due_7_days: usize,
    #[serde(rename = "due30Days")]
    pub due_30_days: usize,
    #[serde(rename = "due90Days")]
    pub due_90_days: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskCharts {
    pub status: Vec<CountEntry>,
    pub assignee: Vec<CountEntry>,
    pub urgency: Vec<CountEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLists {
    pub overdue: Vec<AnnotatedTask>,
    #[serde(rename = "due7Days")]
    pub due_7_days: Vec<AnnotatedTask>,
    #[serde(rename = "due30Days")]
    pub due_30_days: Vec<AnnotatedTask>,
    #[serde(rename = "due90Days")]
    pub due_90_days: Vec<AnnotatedTask>,
    pub ccs_action: Vec<AnnotatedTask>,
    pub completed: Vec<AnnotatedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub metrics: TaskMetrics,
    pub charts: TaskCharts,
    pub table: Vec<AnnotatedTask>,
    pub lists: TaskLists,
    pub fiscal_years: Vec<String>,
    pub active: Option<TaskFacet>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Builds task views. Holds the ticket settings; everything else is an input.
#[derive(Debug, Clone)]
pub struct TaskDashboard {
    tickets: TicketMatcher,
    ticket_base_url: String,
}

impl TaskDashboard {
    pub fn new(tickets: TicketMatcher, ticket_base_url: impl Into<String>) -> Self {
        Self {
            tickets,
            ticket_base_url: ticket_base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, OpsError> {
        let tickets = TicketMatcher::new(&config.ticket_prefixes)?;
        Ok(Self::new(tickets, config.ticket_base_url.clone()))
    }

    pub fn annotate(&self, task: &TaskRecord, now: DateTime<Utc>) -> AnnotatedTask {
        let ticket_id = self
            .tickets
            .extract(task.comments.as_deref())
            .map(str::to_string);
        let ticket_url = ticket_id
            .as_deref()
            .map(|id| classify::ticket_url(&self.ticket_base_url, id));
        let due_label = match &task.due_date {
            Some(DueDate::Serial(serial)) => util::format_serial(*serial),
            Some(DueDate::Text(text)) => Some(text.clone()),
            None => None,
        };

        AnnotatedTask {
            record: task.clone(),
            assignee_label: task.assignee_label().to_string(),
            urgency: classify::task_urgency(task, now),
            due_window: classify::due_window(task, now),
            fiscal_year: classify::task_fiscal_year(task),
            ticket_id,
            ticket_url,
            due_label,
        }
    }

    pub fn view(&self, records: &[TaskRecord], filter: &TaskFilter, now: DateTime<Utc>) -> TaskView {
        let scope: Vec<AnnotatedTask> = records
            .iter()
            .map(|task| self.annotate(task, now))
            .filter(|task| filter.in_metric_scope(task))
            .collect();

        let table = match &filter.active {
            Some(facet) => drill_down_tasks(&scope, facet),
            None => scope.clone(),
        };

        log::debug!(
            "Task view: {} records, {} in scope, {} in table",
            records.len(),
            scope.len(),
            table.len()
        );

        TaskView {
            metrics: task_metrics(&scope),
            charts: task_charts(&scope),
            lists: task_lists(&scope),
            table,
            fiscal_years: available_fiscal_years(records),
            active: filter.active.clone(),
        }
    }
}

/// Tasks of `scope` matching `facet`, in scope order.
pub fn drill_down_tasks(scope: &[AnnotatedTask], facet: &TaskFacet) -> Vec<AnnotatedTask> {
    drill_down(scope, |task| facet.matches(task))
}

/// Distinct fiscal years across all records, newest first.
pub fn available_fiscal_years(records: &[TaskRecord]) -> Vec<String> {
    let years: BTreeSet<String> = records.iter().filter_map(classify::task_fiscal_year).collect();
    years.into_iter().rev().collect()
}

fn task_metrics(scope: &[AnnotatedTask]) -> TaskMetrics {
    let count = |facet: TaskFacet| scope.iter().filter(|t| facet.matches(t)).count();

    let total = scope.len();
    let triaged = count(TaskFacet::Triaged);
    let completed = count(TaskFacet::Status(TaskStatus::Completed));

    TaskMetrics {
        total,
        triaged,
        triaged_percent: util::percent(triaged, total),
        ccs_action: count(TaskFacet::CcsAction),
        completed,
        completed_percent: util::percent(completed, total),
        in_progress: count(TaskFacet::Status(TaskStatus::InProgress)),
        not_started: count(TaskFacet::Status(TaskStatus::NotStarted)),
        overdue: count(TaskFacet::DueWindow(DueWindow::Overdue)),
        due_7_days: count(TaskFacet::DueWindow(DueWindow::Within7)),
        due_30_days: count(TaskFacet::DueWindow(DueWindow::Within30)),
        due_90_days: count(TaskFacet::DueWindow(DueWindow::Within90)),
    }
}

fn status_color(status: &str) -> Option<String> {
    STATUS_COLORS
        .iter()
        .find(|(s, _)| s.label() == status)
        .map(|(_, color)| color.to_string())
}

fn task_charts(scope: &[AnnotatedTask]) -> TaskCharts {
    let mut status = distribution(scope, |t| {
        let label = t.record.status.label().to_string();
        (label.clone(), label)
    });
    for entry in &mut status {
        entry.color = status_color(&entry.key);
    }

    TaskCharts {
        status,
        assignee: distribution(scope, |t| (t.assignee_label.clone(), t.assignee_label.clone())),
        urgency: distribution(scope, |t| {
            let label = t.urgency.label().to_string();
            (label.clone(), label)
        }),
    }
}

fn task_lists(scope: &[AnnotatedTask]) -> TaskLists {
    let list = |facet: TaskFacet| drill_down_tasks(scope, &facet);
    TaskLists {
        overdue: list(TaskFacet::DueWindow(DueWindow::Overdue)),
        due_7_days: list(TaskFacet::DueWindow(DueWindow::Within7)),
        due_30_days: list(TaskFacet::DueWindow(DueWindow::Within30)),
        due_90_days: list(TaskFacet::DueWindow(DueWindow::Within90)),
        ccs_action: list(TaskFacet::CcsAction),
        completed: list(TaskFacet::Status(TaskStatus::Completed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        // 2024-01-01T00:00:00Z, serial 45292
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn dashboard() -> TaskDashboard {
        TaskDashboard::from_config(&Config::default()).unwrap()
    }

    fn task(item: &str, status: TaskStatus, due: Option<f64>, assignee: Option<&str>) -> TaskRecord {
        TaskRecord {
            item: item.to_string(),
            received_on: Some(45292.0),
            triaged: false,
            ccs_action_needed: false,
            status,
            comments: None,
            due_date: due.map(DueDate::Serial),
            assignee: assignee.map(str::to_string),
        }
    }

    fn sample() -> Vec<TaskRecord> {
        let mut overdue = task("Rotate DB credentials", TaskStatus::InProgress, Some(45280.0), Some("John Doe"));
        overdue.triaged = true;
        overdue.ccs_action_needed = true;
        overdue.comments = Some("Blocked on GWCP-12345".to_string());

        let mut done = task("Upgrade agents", TaskStatus::Completed, Some(45100.0), Some("Jane Smith"));
        done.triaged = true;

        let mut next_fy = task("Audit IAM roles", TaskStatus::NotStarted, Some(45340.0), Some("John Doe"));
        next_fy.received_on = Some(45505.0); // 2024-08-01, FY25

        let mut undated = task("Renew TLS", TaskStatus::NotStarted, Some(45295.0), None);
        undated.received_on = None;

        vec![overdue, done, next_fy, undated]
    }

    #[test]
    fn test_default_filter_shows_everything() {
        let view = dashboard().view(&sample(), &TaskFilter::default(), now());
        let m = &view.metrics;
        assert_eq!(m.total, 4);
        assert_eq!(m.triaged, 2);
        assert_eq!(m.triaged_percent, 50);
        assert_eq!(m.ccs_action, 1);
        assert_eq!(m.completed, 1);
        assert_eq!(m.completed_percent, 25);
        assert_eq!(m.in_progress, 1);
        assert_eq!(m.not_started, 2);
        assert_eq!(m.overdue, 1);
        assert_eq!(m.due_7_days, 1);
        assert_eq!(m.due_30_days, 0);
        assert_eq!(m.due_90_days, 1);
        assert_eq!(view.table.len(), 4);
    }

    #[test]
    fn test_active_facet_narrows_table_only() {
        let filter = TaskFilter::default().toggle_active(TaskFacet::Assignee("John Doe".to_string()));
        let view = dashboard().view(&sample(), &filter, now());

        assert_eq!(view.metrics.total, 4);
        assert_eq!(view.charts.assignee.iter().map(|e| e.count).sum::<usize>(), 4);
        let items: Vec<&str> = view.table.iter().map(|t| t.record.item.as_str()).collect();
        assert_eq!(items, vec!["Rotate DB credentials", "Audit IAM roles"]);
    }

    #[test]
    fn test_toggle_active_twice_clears() {
        let facet = TaskFacet::Status(TaskStatus::Completed);
        let filter = TaskFilter::default().toggle_active(facet.clone());
        assert_eq!(filter.active, Some(facet.clone()));
        assert_eq!(filter.toggle_active(facet).active, None);

        let replaced = filter.toggle_active(TaskFacet::Triaged);
        assert_eq!(replaced.active, Some(TaskFacet::Triaged));
        assert_eq!(replaced.clear_active().active, None);
    }

    #[test]
    fn test_filter_methods_leave_original_untouched() {
        let base = TaskFilter::default();
        let narrowed = base.toggle_status(TaskStatus::Completed).with_search("tls");
        assert_eq!(base, TaskFilter::default());
        assert!(!narrowed.statuses.contains(&TaskStatus::Completed));
        assert!(narrowed.toggle_status(TaskStatus::Completed).statuses.contains(&TaskStatus::Completed));
    }

    #[test]
    fn test_status_set_scopes_metrics() {
        let filter = TaskFilter::default().toggle_status(TaskStatus::Completed);
        let view = dashboard().view(&sample(), &filter, now());
        assert_eq!(view.metrics.total, 3);
        assert_eq!(view.metrics.completed, 0);
        assert!(view.lists.completed.is_empty());
    }

    #[test]
    fn test_empty_status_set_accepts_all() {
        let filter = TaskFilter {
            statuses: BTreeSet::new(),
            ..TaskFilter::default()
        };
        assert_eq!(dashboard().view(&sample(), &filter, now()).metrics.total, 4);
    }

    #[test]
    fn test_search_matches_item_comments_and_assignee() {
        let d = dashboard();
        let by = |term: &str| d.view(&sample(), &TaskFilter::default().with_search(term), now()).metrics.total;
        assert_eq!(by("gwcp-12345"), 1);
        assert_eq!(by("JANE"), 1);
        assert_eq!(by("renew"), 1);
        assert_eq!(by("john"), 2);
        assert_eq!(by("nothing matches"), 0);
        assert_eq!(by("   "), 4);
    }

    #[test]
    fn test_fiscal_year_keeps_undated_tasks() {
        let filter = TaskFilter::default().with_fiscal_year(FiscalYearSelector::Year("FY25".to_string()));
        let view = dashboard().view(&sample(), &filter, now());
        let items: Vec<&str> = view.table.iter().map(|t| t.record.item.as_str()).collect();
        assert_eq!(items, vec!["Audit IAM roles", "Renew TLS"]);
        assert_eq!(view.fiscal_years, vec!["FY25", "FY24"]);
    }

    #[test]
    fn test_status_chart_sorted_by_count_with_zero_omission() {
        let records = vec![
            task("a", TaskStatus::Completed, None, None),
            task("b", TaskStatus::InProgress, None, None),
            task("c", TaskStatus::NotStarted, None, None),
            task("d", TaskStatus::InProgress, None, None),
            task("e", TaskStatus::NotStarted, None, None),
            task("f", TaskStatus::NotStarted, None, None),
        ];
        let view = dashboard().view(&records, &TaskFilter::default(), now());
        let status: Vec<(&str, usize, Option<&str>)> = view
            .charts
            .status
            .iter()
            .map(|e| (e.name.as_str(), e.count, e.color.as_deref()))
            .collect();
        assert_eq!(
            status,
            vec![
                ("Not Started", 3, Some("#f59e0b")),
                ("In Progress", 2, Some("#3b82f6")),
                ("Completed", 1, Some("#10b981")),
            ]
        );

        // Equal counts keep first-seen order; absent statuses are omitted.
        let tied = vec![
            task("a", TaskStatus::NotStarted, None, None),
            task("b", TaskStatus::Completed, None, None),
        ];
        let view = dashboard().view(&tied, &TaskFilter::default(), now());
        let names: Vec<&str> = view.charts.status.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Not Started", "Completed"]);
    }

    #[test]
    fn test_assignee_distribution_groups_unassigned() {
        let view = dashboard().view(&sample(), &TaskFilter::default(), now());
        let assignee: Vec<(&str, usize)> = view
            .charts
            .assignee
            .iter()
            .map(|e| (e.name.as_str(), e.count))
            .collect();
        assert_eq!(assignee, vec![("John Doe", 2), ("Jane Smith", 1), ("Unassigned", 1)]);
    }

    #[test]
    fn test_annotation_links_ticket_and_formats_due() {
        let view = dashboard().view(&sample(), &TaskFilter::default(), now());
        let first = &view.table[0];
        assert_eq!(first.ticket_id.as_deref(), Some("GWCP-12345"));
        assert_eq!(
            first.ticket_url.as_deref(),
            Some("https://jira.yourcompany.com/browse/GWCP-12345")
        );
        assert_eq!(first.urgency, TaskUrgency::Overdue);
        assert_eq!(first.due_label.as_deref(), Some("Dec 20, 2023"));
        assert_eq!(view.lists.overdue.len(), 1);
        assert_eq!(view.lists.ccs_action[0].record.item, "Rotate DB credentials");
    }

    #[test]
    fn test_empty_dataset_yields_zeros() {
        let view = dashboard().view(&[], &TaskFilter::default(), now());
        assert_eq!(view.metrics, TaskMetrics::default());
        assert!(view.table.is_empty());
        assert!(view.charts.status.is_empty());
        assert!(view.fiscal_years.is_empty());
    }

    #[test]
    fn test_view_is_deterministic() {
        let d = dashboard();
        let filter = TaskFilter::default().toggle_active(TaskFacet::Urgency(TaskUrgency::Normal));
        let a = serde_json::to_string(&d.view(&sample(), &filter, now())).unwrap();
        let b = serde_json::to_string(&d.view(&sample(), &filter, now())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_view_json_shape() {
        let filter = TaskFilter::default().toggle_active(TaskFacet::DueWindow(DueWindow::Within7));
        let json = serde_json::to_value(dashboard().view(&sample(), &filter, now())).unwrap();
        assert_eq!(json["metrics"]["due7Days"], 1);
        assert_eq!(json["active"]["category"], "dueWindow");
        assert_eq!(json["active"]["value"], "within7");
        assert_eq!(json["table"][0]["item"], "Renew TLS");
        assert_eq!(json["table"][0]["assigneeLabel"], "Unassigned");
    }
}
