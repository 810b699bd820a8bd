//! Aurora inventory dashboard view.
//!
//! The environment selector sets the metric scope; the active facet narrows
//! only the table. See `database_view`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{self, EolUrgency};
use crate::types::DbInstanceRecord;
use crate::util;

use super::aggregate::{distribution, drill_down, toggle, CountEntry};

/// Selector entry that means "every environment".
pub const ALL_ENVIRONMENTS: &str = "All";

const DEFAULT_ENVIRONMENT_COLOR: &str = "#64748b";

/// Chart color for an environment name, case-insensitive.
pub fn environment_color(environment: &str) -> &'static str {
    match environment.to_lowercase().as_str() {
        "dev" => "#3b82f6",
        "test" => "#10b981",
        "staging" => "#f59e0b",
        "prod" | "production" => "#ef4444",
        _ => DEFAULT_ENVIRONMENT_COLOR,
    }
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum EnvironmentSelector {
    #[default]
    All,
    Named(String),
}

impl EnvironmentSelector {
    /// Selector for an entry of `environments()`.
    pub fn from_label(label: &str) -> Self {
        if label == ALL_ENVIRONMENTS {
            EnvironmentSelector::All
        } else {
            EnvironmentSelector::Named(label.to_string())
        }
    }

    fn accepts(&self, environment: &str) -> bool {
        match self {
            EnvironmentSelector::All => true,
            EnvironmentSelector::Named(name) => name == environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "value", rename_all = "camelCase")]
pub enum DbFacet {
    /// Major version, e.g. "15".
    Version(String),
    Environment(String),
    Owner(String),
    Eol(EolUrgency),
    NonCompliant,
    AutoUpgradeDisabled,
}

impl DbFacet {
    pub fn matches(&self, db: &AnnotatedInstance) -> bool {
        match self {
            DbFacet::Version(major) => db.major_version == *major,
            DbFacet::Environment(env) => db.record.environment == *env,
            DbFacet::Owner(owner) => db.record.owner == *owner,
            DbFacet::Eol(urgency) => db.eol_urgency == *urgency,
            DbFacet::NonCompliant => !db.compliant,
            DbFacet::AutoUpgradeDisabled => !db.record.auto_minor_version_upgrade,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseFilter {
    pub environment: EnvironmentSelector,
    pub active: Option<DbFacet>,
}

impl DatabaseFilter {
    pub fn with_environment(&self, environment: EnvironmentSelector) -> Self {
        Self {
            environment,
            ..self.clone()
        }
    }

    pub fn toggle_active(&self, facet: DbFacet) -> Self {
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
}

// ---------------------------------------------------------------------------
// View-model
// ---------------------------------------------------------------------------

/// An instance with its derived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedInstance {
    #[serde(flatten)]
    pub record: DbInstanceRecord,
    pub major_version: String,
    pub version_label: String,
    pub compliant: bool,
    /// Rounded up; `-1` when the EOL date is unknown.
    pub days_until_eol: i64,
    pub eol_urgency: EolUrgency,
}

impl AnnotatedInstance {
    pub fn new(record: &DbInstanceRecord, now: DateTime<Utc>) -> Self {
        let major = classify::major_version(&record.engine_version).to_string();
        let days_until_eol = classify::days_until_eol(record.end_of_standard_support, now);
        Self {
            version_label: classify::version_label(&major),
            compliant: classify::is_compliant(&record.engine_version),
            eol_urgency: classify::eol_urgency(days_until_eol),
            days_until_eol,
            major_version: major,
            record: record.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetrics {
    pub total: usize,
    pub non_compliant: usize,
    pub compliant_percent: u32,
    pub auto_upgrade_enabled: usize,
    pub auto_upgrade_disabled: usize,
    pub auto_upgrade_percent: u32,
    pub eol_critical: usize,
    pub eol_warning: usize,
    pub eol_safe: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseCharts {
    pub version: Vec<CountEntry>,
    pub environment: Vec<CountEntry>,
    pub owner: Vec<CountEntry>,
    pub eol: Vec<CountEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseLists {
    pub non_compliant: Vec<AnnotatedInstance>,
    pub auto_upgrade_disabled: Vec<AnnotatedInstance>,
    pub eol_critical: Vec<AnnotatedInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseView {
    pub metrics: DatabaseMetrics,
    pub charts: DatabaseCharts,
    pub table: Vec<AnnotatedInstance>,
    pub lists: DatabaseLists,
    pub environments: Vec<String>,
    pub active: Option<DbFacet>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// `"All"` followed by the distinct environments, sorted.
pub fn environments(records: &[DbInstanceRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|db| db.environment.clone()).collect();
    names.sort();
    names.dedup();
    names.insert(0, ALL_ENVIRONMENTS.to_string());
    names
}

/// Instances of `scope` matching `facet`, in scope order.
pub fn drill_down_instances(scope: &[AnnotatedInstance], facet: &DbFacet) -> Vec<AnnotatedInstance> {
    drill_down(scope, |db| facet.matches(db))
}

pub fn database_view(
    records: &[DbInstanceRecord],
    filter: &DatabaseFilter,
    now: DateTime<Utc>,
) -> DatabaseView {
    let scope: Vec<AnnotatedInstance> = records
        .iter()
        .filter(|db| filter.environment.accepts(&db.environment))
        .map(|db| AnnotatedInstance::new(db, now))
        .collect();

    let table = match &filter.active {
        Some(facet) => drill_down_instances(&scope, facet),
        None => scope.clone(),
    };

    log::debug!(
        "Database view: {} records, {} in scope, {} in table",
        records.len(),
        scope.len(),
        table.len()
    );

    DatabaseView {
        metrics: database_metrics(&scope),
        charts: database_charts(&scope),
        lists: database_lists(&scope),
        table,
        environments: environments(records),
        active: filter.active.clone(),
    }
}

fn database_metrics(scope: &[AnnotatedInstance]) -> DatabaseMetrics {
    let count = |facet: DbFacet| scope.iter().filter(|db| facet.matches(db)).count();

    let total = scope.len();
    let non_compliant = count(DbFacet::NonCompliant);
    let auto_upgrade_disabled = count(DbFacet::AutoUpgradeDisabled);
    let auto_upgrade_enabled = total - auto_upgrade_disabled;

    DatabaseMetrics {
        total,
        non_compliant,
        compliant_percent: util::percent(total - non_compliant, total),
        auto_upgrade_enabled,
        auto_upgrade_disabled,
        auto_upgrade_percent: util::percent(auto_upgrade_enabled, total),
        eol_critical: count(DbFacet::Eol(EolUrgency::Critical)),
        eol_warning: count(DbFacet::Eol(EolUrgency::Warning)),
        eol_safe: count(DbFacet::Eol(EolUrgency::Safe)),
    }
}

fn database_charts(scope: &[AnnotatedInstance]) -> DatabaseCharts {
    let mut environment = distribution(scope, |db| {
        (db.record.environment.clone(), db.record.environment.clone())
    });
    for entry in &mut environment {
        entry.color = Some(environment_color(&entry.key).to_string());
    }

    DatabaseCharts {
        version: distribution(scope, |db| (db.major_version.clone(), db.version_label.clone())),
        environment,
        owner: distribution(scope, |db| (db.record.owner.clone(), db.record.owner.clone())),
        eol: distribution(scope, |db| {
            let label = db.eol_urgency.label().to_string();
            (label.clone(), label)
        }),
    }
}

fn database_lists(scope: &[AnnotatedInstance]) -> DatabaseLists {
    DatabaseLists {
        non_compliant: drill_down_instances(scope, &DbFacet::NonCompliant),
        auto_upgrade_disabled: drill_down_instances(scope, &DbFacet::AutoUpgradeDisabled),
        eol_critical: drill_down_instances(scope, &DbFacet::Eol(EolUrgency::Critical)),
    }
}
