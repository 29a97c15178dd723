//! Configuration loaded from `oms.toml`.
//!
//! Every field has a default, so a missing file or a partial one both work.
//! Credentials and the base URL can be overridden from the environment
//! (`OMS_COMPANY`, `OMS_EMP_NO`, `OMS_PASSWORD`, `OMS_APP_NAME`,
//! `OMS_BASE_URL`), which takes precedence over the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReasonerError;
use crate::oms::{Credentials, DEFAULT_BASE_URL};
use crate::pager::PagerSettings;
use crate::pipeline::PipelineSettings;
use crate::rules::{self, DurationRule, MatchPolicy, RuleBook, ToleranceBand};

#[derive(Debug, Clone, Deserialize)]
pub struct OmsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub credentials: Credentials,

    /// Records per pending-list request.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between pending-list pages, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub page_delay_ms: u64,

    /// Pause between processed outages, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub outage_delay_ms: u64,

    /// Only poles with this `hlt` value are candidates. Empty accepts all.
    #[serde(default = "default_pole_type")]
    pub pole_type: String,

    #[serde(default)]
    pub policy: MatchPolicy,

    #[serde(default = "rules::default_rules")]
    pub rules: Vec<DurationRule>,

    #[serde(default = "rules::default_bands")]
    pub bands: Vec<ToleranceBand>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_pole_type() -> String {
    "HT Pole".to_string()
}

impl Default for OmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials: Credentials::default(),
            page_size: default_page_size(),
            page_delay_ms: default_delay_ms(),
            outage_delay_ms: default_delay_ms(),
            pole_type: default_pole_type(),
            policy: MatchPolicy::default(),
            rules: rules::default_rules(),
            bands: rules::default_bands(),
        }
    }
}

impl OmsConfig {
    /// Loads `path`, falling back to defaults when it does not exist,
    /// then applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ReasonerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<OmsConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replaces fields with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 5] = [
            ("OMS_BASE_URL", &mut self.base_url),
            ("OMS_COMPANY", &mut self.credentials.company_name),
            ("OMS_EMP_NO", &mut self.credentials.emp_no),
            ("OMS_PASSWORD", &mut self.credentials.password),
            ("OMS_APP_NAME", &mut self.credentials.app_name),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ReasonerError> {
        if self.page_size == 0 {
            return Err(ReasonerError::Config("page_size must be positive".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ReasonerError::Config("base_url must not be empty".into()));
        }
        self.rule_book().map(|_| ())
    }

    pub fn rule_book(&self) -> Result<RuleBook, ReasonerError> {
        RuleBook::new(self.rules.clone(), self.bands.clone(), self.policy)
    }

    pub fn pager_settings(&self, limit: usize) -> PagerSettings {
        PagerSettings {
            page_size: self.page_size,
            limit,
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }

    pub fn pipeline_settings(&self, dry_run: bool) -> PipelineSettings {
        let pole_type = self.pole_type.trim();
        PipelineSettings {
            pole_type: (!pole_type.is_empty()).then(|| pole_type.to_string()),
            outage_delay: Duration::from_millis(self.outage_delay_ms),
            dry_run,
        }
    }
}
