//! Declarative region policy loaded from TOML.
//!
//! ```toml
//! [regions.Root]
//! loading = "Loading"
//! error = "Error"
//! min_display_ms = 500
//! timeout_ms = 10000
//! initial = "Splash"
//! steps = ["Login"]
//! ```
//!
//! Only unconditioned steps can be expressed here; conditional steps are
//! declared in code and can be layered on top with the fluent builders.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::flow::{FlowStep, InitialRegionFlow};
use super::RegionLoadingOptions;
use crate::errors::ConfigError;

/// Top-level policy document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionPolicyFile {
    /// Policy per region name
    #[serde(default)]
    pub regions: BTreeMap<String, RegionPolicy>,
}

/// Policy for one region; absent fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionPolicy {
    /// Loading view key
    pub loading: Option<String>,
    /// Error view key
    pub error: Option<String>,
    /// Minimum loading display time in milliseconds
    pub min_display_ms: Option<u64>,
    /// Content timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Initial view of the region's flow
    pub initial: Option<String>,
    /// Unconditioned flow steps, in order
    pub steps: Vec<String>,
}

impl RegionPolicyFile {
    /// Parse and validate a policy document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(source)?;
        file.validate()?;
        Ok(file)
    }

    /// Reject empty names and zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (region, policy) in &self.regions {
            if region.trim().is_empty() {
                return Err(ConfigError::invalid("regions", "region name must not be empty"));
            }
            let keys = [
                ("loading", policy.loading.as_deref()),
                ("error", policy.error.as_deref()),
                ("initial", policy.initial.as_deref()),
            ];
            for (field, key) in keys {
                if matches!(key, Some(k) if k.trim().is_empty()) {
                    return Err(ConfigError::invalid(
                        format!("regions.{region}.{field}"),
                        "view key must not be empty",
                    ));
                }
            }
            if let Some(index) = policy.steps.iter().position(|s| s.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("regions.{region}.steps[{index}]"),
                    "view key must not be empty",
                ));
            }
            if policy.timeout_ms == Some(0) {
                return Err(ConfigError::invalid(
                    format!("regions.{region}.timeout_ms"),
                    "timeout must be greater than zero",
                ));
            }
        }
        Ok(())
    }

    /// Merge into `options`; values present in the file win.
    ///
    /// A region declaring `initial` or `steps` replaces its initial flow.
    pub fn apply_to(&self, options: &mut RegionLoadingOptions) {
        for (region, policy) in &self.regions {
            let config = options.entry(region.clone());
            if let Some(loading) = &policy.loading {
                config.loading_view_key = Some(loading.clone());
            }
            if let Some(error) = &policy.error {
                config.error_view_key = Some(error.clone());
            }
            if let Some(ms) = policy.min_display_ms {
                config.min_display_time = Duration::from_millis(ms);
            }
            if let Some(ms) = policy.timeout_ms {
                config.timeout = Duration::from_millis(ms);
            }
            if policy.initial.is_some() || !policy.steps.is_empty() {
                let mut flow = InitialRegionFlow::new();
                if let Some(initial) = &policy.initial {
                    flow.set_initial(initial.clone());
                }
                for step in &policy.steps {
                    flow.push(FlowStep::new(step.clone()));
                }
                config.initial_flow = Some(flow);
            }
            tracing::debug!(region = %region, "region policy applied from file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_POLICY: &str = r#"
        [regions.Root]
        loading = "Loading"
        error = "Error"
        min_display_ms = 500
        timeout_ms = 10000
        initial = "Splash"
        steps = ["Login"]

        [regions.Sidebar]
        loading = "Spinner"
    "#;

    #[test]
    fn parses_and_applies_policy() {
        let file = RegionPolicyFile::from_toml_str(ROOT_POLICY).unwrap();
        let mut options = RegionLoadingOptions::new();
        file.apply_to(&mut options);

        let root = options.get("Root").unwrap();
        assert_eq!(root.loading_view_key.as_deref(), Some("Loading"));
        assert_eq!(root.error_view_key.as_deref(), Some("Error"));
        assert_eq!(root.min_display_time, Duration::from_millis(500));
        assert_eq!(root.timeout, Duration::from_secs(10));
        let flow = root.initial_flow.as_ref().unwrap();
        assert_eq!(flow.initial_view_key(), Some("Splash"));
        assert_eq!(flow.steps()[0].view_key(), "Login");

        let sidebar = options.get("Sidebar").unwrap();
        assert_eq!(sidebar.timeout, Duration::from_secs(30));
        assert!(sidebar.initial_flow.is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = RegionPolicyFile::from_toml_str("[regions.Root]\ntimeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("regions.Root.timeout_ms"));
    }

    #[test]
    fn empty_step_is_rejected() {
        let err =
            RegionPolicyFile::from_toml_str("[regions.Root]\nsteps = [\"Login\", \"\"]\n").unwrap_err();
        assert!(err.to_string().contains("regions.Root.steps[1]"));
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        let err = RegionPolicyFile::from_toml_str("[regions.Root]\nspinner = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn file_values_override_builder_values() {
        let mut options = RegionLoadingOptions::new();
        options.configure(|regions| {
            regions.for_region("Root").with_loading_behavior(|l| {
                l.loading("Old").timeout(Duration::from_secs(3));
            });
        });
        let file = RegionPolicyFile::from_toml_str("[regions.Root]\nloading = \"New\"\n").unwrap();
        file.apply_to(&mut options);

        let root = options.get("Root").unwrap();
        assert_eq!(root.loading_view_key.as_deref(), Some("New"));
        assert_eq!(root.timeout, Duration::from_secs(3));
    }

    #[test]
    fn policy_serializes_to_json_shape() {
        let file = RegionPolicyFile::from_toml_str("[regions.Root]\ninitial = \"Splash\"\n").unwrap();
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["regions"]["Root"]["initial"], "Splash");
    }
}
