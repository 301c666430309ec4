//! Configuration: data-source config consumed opaquely by adapters,
//! and the engine-wide planner/executor tunables.
//!
//! Plain record/struct constructors, plus a small fluent builder where
//! many optional fields are common.

use std::collections::HashMap;
use std::time::Duration;

/// Opaque-to-the-engine configuration for one data source. Only
/// `name` and `type` are engine-visible; everything else is passed through
/// to the adapter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceConfig {
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_pool_size: u32,
    pub connection_timeout_ms: u64,
    pub properties: HashMap<String, String>,
}

impl DataSourceConfig {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            url: url.into(),
            username: None,
            password: None,
            max_pool_size: 10,
            connection_timeout_ms: 5_000,
            properties: HashMap::new(),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Exponential backoff knobs for the executor's source-call retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given zero-indexed attempt (0 = first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * factor)
    }
}

/// Planner/executor tunables that are not part of any one data source.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_intermediate_rows: usize,
    pub query_timeout: Duration,
    pub cbo_enabled: bool,
    pub cbo_branching_limit: usize,
    pub rbo_max_passes: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_intermediate_rows: 100_000,
            query_timeout: Duration::from_secs(300),
            cbo_enabled: false,
            cbo_branching_limit: 8,
            rbo_max_passes: 64,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Small fluent helper over `EngineConfig`'s many-optional-fields shape.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    inner: OptionalFields,
}

#[derive(Debug, Default)]
struct OptionalFields {
    max_intermediate_rows: Option<usize>,
    query_timeout: Option<Duration>,
    cbo_enabled: Option<bool>,
    cbo_branching_limit: Option<usize>,
    rbo_max_passes: Option<u32>,
    retry_policy: Option<RetryPolicy>,
}

impl EngineConfigBuilder {
    pub fn max_intermediate_rows(mut self, n: usize) -> Self {
        self.inner.max_intermediate_rows = Some(n);
        self
    }

    pub fn query_timeout(mut self, d: Duration) -> Self {
        self.inner.query_timeout = Some(d);
        self
    }

    pub fn cbo_enabled(mut self, enabled: bool) -> Self {
        self.inner.cbo_enabled = Some(enabled);
        self
    }

    pub fn cbo_branching_limit(mut self, n: usize) -> Self {
        self.inner.cbo_branching_limit = Some(n);
        self
    }

    pub fn rbo_max_passes(mut self, n: u32) -> Self {
        self.inner.rbo_max_passes = Some(n);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.inner.retry_policy = Some(policy);
        self
    }

    pub fn build(self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            max_intermediate_rows: self.inner.max_intermediate_rows.unwrap_or(default.max_intermediate_rows),
            query_timeout: self.inner.query_timeout.unwrap_or(default.query_timeout),
            cbo_enabled: self.inner.cbo_enabled.unwrap_or(default.cbo_enabled),
            cbo_branching_limit: self.inner.cbo_branching_limit.unwrap_or(default.cbo_branching_limit),
            rbo_max_passes: self.inner.rbo_max_passes.unwrap_or(default.rbo_max_passes),
            retry_policy: self.inner.retry_policy.unwrap_or(default.retry_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_default_doubles_delay_each_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
    }

    #[test]
    fn engine_config_builder_overrides_only_set_fields() {
        let config = EngineConfig::builder().cbo_enabled(true).max_intermediate_rows(50).build();
        assert!(config.cbo_enabled);
        assert_eq!(config.max_intermediate_rows, 50);
        assert_eq!(config.rbo_max_passes, 64);
    }

    #[test]
    fn data_source_config_keeps_properties_opaque() {
        let config = DataSourceConfig::new("mydb", "postgresql", "postgres://localhost/mydb")
            .with_credentials("u", "p")
            .with_property("sslmode", "require");
        assert_eq!(config.properties.get("sslmode"), Some(&"require".to_string()));
        assert_eq!(config.username.as_deref(), Some("u"));
    }
}
