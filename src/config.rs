//! Workflow configuration loaded from `audit-workflow.toml`.
//!
//! Every field has a default, so an absent file yields a usable config. The
//! `AUDIT_WORKFLOW_DB` environment variable takes precedence over the file for
//! the database path.

use super::audit::{AuditState, Role};
use super::duration::{DEFAULT_WARNING_BAND, DurationPolicy};
use super::engine::{SystemClock, WorkflowEngine};
use super::roles::RoleMatrix;
use super::store::SledRecordStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

pub const CONFIG_FILE: &str = "audit-workflow.toml";
pub const DATABASE_ENV_VAR: &str = "AUDIT_WORKFLOW_DB";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Directory of the sled database backing the record store.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Fraction below the duration minimum still reported as a warning.
    #[serde(default = "default_warning_band")]
    pub duration_warning_band: f64,

    /// Replacements for the default permitted roles of individual edges.
    #[serde(default)]
    pub role_overrides: Vec<RoleOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleOverride {
    pub from: AuditState,
    pub to: AuditState,
    pub roles: Vec<Role>,
}

fn default_database_path() -> String {
    "audit-workflow.db".to_string()
}

fn default_warning_band() -> f64 {
    DEFAULT_WARNING_BAND
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            duration_warning_band: default_warning_band(),
            role_overrides: vec![],
        }
    }
}

impl WorkflowConfig {
    /// Loads `audit-workflow.toml` from the current directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Self::default()
        };

        if let Ok(db) = std::env::var(DATABASE_ENV_VAR)
            && !db.is_empty()
        {
            config.database_path = db;
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: WorkflowConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.duration_warning_band) {
            anyhow::bail!(
                "duration_warning_band must be in [0, 1), got {}",
                self.duration_warning_band
            );
        }
        self.role_matrix().map(|_| ())
    }

    /// Default role matrix with the configured overrides applied
    pub fn role_matrix(&self) -> Result<RoleMatrix> {
        let mut matrix = RoleMatrix::default();
        for o in &self.role_overrides {
            matrix.set_edge(o.from, o.to, o.roles.iter().copied())?;
        }
        Ok(matrix)
    }

    pub fn duration_policy(&self) -> DurationPolicy {
        DurationPolicy {
            warning_band: self.duration_warning_band,
        }
    }

    pub fn engine(&self) -> Result<WorkflowEngine<SystemClock>> {
        Ok(WorkflowEngine::new()
            .set_roles(self.role_matrix()?)
            .set_duration_policy(self.duration_policy()))
    }

    pub fn open_store(&self) -> Result<SledRecordStore> {
        let db = sled::open(&self.database_path)
            .with_context(|| format!("failed to open database at {}", self.database_path))?;
        Ok(SledRecordStore::new(Arc::new(db))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = WorkflowConfig::default();
        assert_eq!(config.database_path, "audit-workflow.db");
        assert_eq!(config.duration_warning_band, 0.10);
        assert!(config.role_overrides.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let config = WorkflowConfig::from_toml(
            r#"
            duration_warning_band = 0.05

            [[role_overrides]]
            from = "decision_pending"
            to = "decided"
            roles = ["body_admin", "technical_reviewer"]
        "#,
        )
        .unwrap();

        assert_eq!(config.duration_warning_band, 0.05);
        assert_eq!(config.database_path, "audit-workflow.db");

        let matrix = config.role_matrix().unwrap();
        assert!(matrix.is_permitted(
            AuditState::DecisionPending,
            AuditState::Decided,
            Role::TechnicalReviewer
        ));
    }

    #[test]
    fn rejects_override_outside_table() {
        let result = WorkflowConfig::from_toml(
            r#"
            [[role_overrides]]
            from = "draft"
            to = "decided"
            roles = ["body_admin"]
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_band() {
        assert!(WorkflowConfig::from_toml("duration_warning_band = 1.5").is_err());
    }

    #[test]
    fn load_falls_back_to_defaults() {
        // the crate root carries no audit-workflow.toml
        let config = WorkflowConfig::load().unwrap();
        assert_eq!(config.duration_warning_band, 0.10);
    }
}
