//! Connector SPI: the adapter contract every data source plugs
//! in behind, plus the registry and health scheduler built on top of it.
//! One `async_trait`, one `Box<dyn Trait>` factory, adapters owning their
//! own connection handling behind the trait boundary.

pub mod health;
pub mod registry;

pub use health::{HealthChecker, HealthCheckResult, HealthScheduler, HealthStatus};
pub use registry::ConnectorRegistry;

use async_trait::async_trait;

use crate::catalog::Schema;
use crate::config::DataSourceConfig;
use crate::error::FedResult;

/// Identifies a class of data source a registered adapter can serve
/// (`postgresql`, `mysql`, `elasticsearch`, ...). Matched against
/// `DataSourceConfig::source_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSourceType(pub String);

impl DataSourceType {
    pub fn new(name: impl Into<String>) -> Self {
        DataSourceType(name.into())
    }
}

/// A live connection handed back by `Adapter::connect`. The engine treats
/// this opaquely; adapters downcast their own concrete type when running
/// pushed SQL or local operator I/O (`TableScan`).
pub trait Connection: Send + Sync {
    /// Runs `sql` against this connection and returns row data as
    /// `(column_names, rows)`. Adapters implement this however their
    /// underlying driver requires; the executor only ever calls this
    /// method, never reaches into the connection's concrete type.
    fn execute(&self, sql: &str) -> FedResult<(Vec<String>, Vec<Vec<crate::ast::Value>>)>;
}

/// One data-source plugin. Adapters are discovered at process
/// start and registered by `DataSourceType` in a `ConnectorRegistry`.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn get_type(&self) -> DataSourceType;

    async fn connect(&self, config: &DataSourceConfig) -> FedResult<Box<dyn Connection>>;

    async fn test_connection(&self, config: &DataSourceConfig) -> FedResult<bool>;

    async fn discover_schema(&self, config: &DataSourceConfig) -> FedResult<Schema>;

    /// Releases any resources the adapter itself owns (not per-connection
    /// state, which lives with each `Connection`). Must be safe to call
    /// even if the adapter was never connected.
    fn close(&self);
}
