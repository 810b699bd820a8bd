//! Extraction configuration.
//!
//! Every field has a default matching the exports the dashboards were built
//! against, so an absent config file is a valid setup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OpsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_task_output")]
    pub task_output_path: PathBuf,
    #[serde(default = "default_database_output")]
    pub database_output_path: PathBuf,
    /// Sheet-name prefix; the environment is the word after `<prefix>-`.
    #[serde(default = "default_environment_prefix")]
    pub environment_prefix: String,
    /// Text identifying the header row of an inventory sheet.
    #[serde(default = "default_header_marker")]
    pub header_marker: String,
    #[serde(default = "default_owner_header")]
    pub owner_header: String,
    #[serde(default = "default_eol_header")]
    pub eol_header: String,
    #[serde(default = "default_ticket_prefixes")]
    pub ticket_prefixes: Vec<String>,
    #[serde(default = "default_ticket_base_url")]
    pub ticket_base_url: String,
    #[serde(default)]
    pub task_columns: TaskColumns,
}

/// Header text of each KTLO tracker column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskColumns {
    pub item: String,
    pub received_on: String,
    pub triaged: String,
    pub ccs_action: String,
    pub status: String,
    pub comments: String,
    pub due_date: String,
    pub assignee: String,
}

impl Default for TaskColumns {
    fn default() -> Self {
        Self {
            item: "KTLO Item".to_string(),
            received_on: "Received On".to_string(),
            triaged: "Triaged".to_string(),
            ccs_action: "Action Needed from CCS".to_string(),
            status: "Status".to_string(),
            comments: "Comments".to_string(),
            due_date: "Due Date".to_string(),
            assignee: "PgM Assigned".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_output_path: default_task_output(),
            database_output_path: default_database_output(),
            environment_prefix: default_environment_prefix(),
            header_marker: default_header_marker(),
            owner_header: default_owner_header(),
            eol_header: default_eol_header(),
            ticket_prefixes: default_ticket_prefixes(),
            ticket_base_url: default_ticket_base_url(),
            task_columns: TaskColumns::default(),
        }
    }
}

fn default_task_output() -> PathBuf {
    PathBuf::from("data/ktlo-data.json")
}

fn default_database_output() -> PathBuf {
    PathBuf::from("data/aurora-data.json")
}

fn default_environment_prefix() -> String {
    "gwre-ccs".to_string()
}

fn default_header_marker() -> String {
    "AutoMinorVersionUpgrade".to_string()
}

fn default_owner_header() -> String {
    "Owner".to_string()
}

fn default_eol_header() -> String {
    "End of Standard Support".to_string()
}

fn default_ticket_prefixes() -> Vec<String> {
    vec!["GWCP".to_string(), "RE".to_string(), "BITS".to_string()]
}

fn default_ticket_base_url() -> String {
    "https://jira.yourcompany.com/browse/".to_string()
}

/// Default config location: `~/.opsboard/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".opsboard").join("config.json"))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, `~/.opsboard/config.json` is
/// used when present, otherwise defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, OpsError> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(OpsError::ConfigurationError(format!(
                    "Config file not found at {}",
                    p.display()
                )));
            }
            p.to_path_buf()
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => {
                log::debug!("No config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| OpsError::ConfigurationError(format!("Failed to read config: {}", e)))?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| OpsError::ConfigurationError(format!("Failed to parse config: {}", e)))?;

    validate_config(&config)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Validate a config has usable values.
pub fn validate_config(config: &Config) -> Result<(), OpsError> {
    if config.ticket_prefixes.is_empty()
        || config.ticket_prefixes.iter().any(|p| p.trim().is_empty())
    {
        return Err(OpsError::ConfigurationError(
            "ticketPrefixes must be a non-empty list of non-empty prefixes".into(),
        ));
    }
    if config.header_marker.trim().is_empty() {
        return Err(OpsError::ConfigurationError(
            "headerMarker is required".into(),
        ));
    }
    if config.task_columns.item.trim().is_empty() {
        return Err(OpsError::ConfigurationError(
            "taskColumns.item is required".into(),
        ));
    }
    Ok(())
}
