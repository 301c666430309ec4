//! Thread-safe adapter registry: mutation uses a concurrent map.
//! Populated at startup via plugin discovery; no lazy singleton —
//! callers own an instance and `init()` it.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::connector::{Adapter, DataSourceType};
use crate::error::{FedError, FedResult};
use crate::logging::Logger;

#[derive(Default)]
pub struct ConnectorRegistry {
    adapters: Mutex<HashMap<DataSourceType, Arc<dyn Adapter>>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            adapters: Mutex::new(HashMap::new()),
            logger: Some(logger),
        }
    }

    /// Registers `adapter` under its own `DataSourceType`. A second
    /// registration for the same type replaces the first.
    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        let ty = adapter.get_type();
        self.adapters.lock().unwrap().insert(ty, adapter);
    }

    pub fn get(&self, ty: &DataSourceType) -> FedResult<Arc<dyn Adapter>> {
        self.adapters
            .lock()
            .unwrap()
            .get(ty)
            .cloned()
            .ok_or_else(|| FedError::Registry {
                message: format!("no adapter registered for data source type '{}'", ty.0),
            })
    }

    pub fn registered_types(&self) -> Vec<DataSourceType> {
        self.adapters.lock().unwrap().keys().cloned().collect()
    }

    /// Closes every registered adapter. A panicking `close()` is caught and
    /// logged so the remaining adapters still get a chance to close even if
    /// one throws.
    pub fn close_all(&self) {
        let adapters: Vec<Arc<dyn Adapter>> = self.adapters.lock().unwrap().values().cloned().collect();
        for adapter in adapters {
            let ty = adapter.get_type();
            let result = panic::catch_unwind(AssertUnwindSafe(|| adapter.close()));
            if result.is_err() {
                if let Some(logger) = &self.logger {
                    logger.error("connector_registry", &format!("adapter '{}' panicked on close()", ty.0));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Schema, SchemaType};
    use async_trait::async_trait;

    struct PanicsOnClose;

    #[async_trait]
    impl Adapter for PanicsOnClose {
        fn get_type(&self) -> DataSourceType {
            DataSourceType::new("panics")
        }

        async fn connect(&self, _config: &crate::config::DataSourceConfig) -> FedResult<Box<dyn crate::connector::Connection>> {
            unimplemented!()
        }

        async fn test_connection(&self, _config: &crate::config::DataSourceConfig) -> FedResult<bool> {
            Ok(true)
        }

        async fn discover_schema(&self, _config: &crate::config::DataSourceConfig) -> FedResult<Schema> {
            Ok(Schema {
                name: "s".to_string(),
                catalog: None,
                schema_type: SchemaType::Physical,
                data_source_name: "panics".to_string(),
                tables: vec![],
            })
        }

        fn close(&self) {
            panic!("boom");
        }
    }

    struct Quiet;

    #[async_trait]
    impl Adapter for Quiet {
        fn get_type(&self) -> DataSourceType {
            DataSourceType::new("quiet")
        }

        async fn connect(&self, _config: &crate::config::DataSourceConfig) -> FedResult<Box<dyn crate::connector::Connection>> {
            unimplemented!()
        }

        async fn test_connection(&self, _config: &crate::config::DataSourceConfig) -> FedResult<bool> {
            Ok(true)
        }

        async fn discover_schema(&self, _config: &crate::config::DataSourceConfig) -> FedResult<Schema> {
            unimplemented!()
        }

        fn close(&self) {}
    }

    #[test]
    fn close_all_continues_past_a_panicking_adapter() {
        let registry = ConnectorRegistry::new();
        registry.register(Arc::new(PanicsOnClose));
        registry.register(Arc::new(Quiet));
        // Must not panic itself, and must not abort before reaching `quiet`.
        registry.close_all();
    }

    #[test]
    fn get_returns_registry_error_for_unknown_type() {
        let registry = ConnectorRegistry::new();
        let err = registry.get(&DataSourceType::new("nope")).unwrap_err();
        assert!(matches!(err, FedError::Registry { .. }));
    }

    #[test]
    fn register_replaces_prior_adapter_for_same_type() {
        let registry = ConnectorRegistry::new();
        registry.register(Arc::new(Quiet));
        registry.register(Arc::new(Quiet));
        assert_eq!(registry.registered_types().len(), 1);
    }
}
