//! DataFusion context management for gate runs.
//!
//! [`GateContext`] wraps DataFusion's [`SessionContext`] with settings tuned for
//! validation workloads and tracks the tables the engine registers so each
//! dataset can be released once its validation set is done.

use crate::prelude::*;
use crate::security::SqlSecurity;
use datafusion::datasource::TableProvider;
use datafusion::execution::context::{SessionConfig, SessionContext};
use datafusion::execution::memory_pool::{FairSpillPool, MemoryPool};
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Configuration for creating a [`GateContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateContextConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Target number of partitions for parallel execution inside a query
    pub target_partitions: usize,
    /// Maximum memory for query execution (in bytes)
    pub max_memory: usize,
}

impl Default for GateContextConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            max_memory: 2 * 1024 * 1024 * 1024, // 2GB
        }
    }
}

/// A managed DataFusion context for one gate run.
///
/// # Examples
///
/// ```rust
/// use term_gate::core::GateContext;
///
/// let ctx = GateContext::new().unwrap();
/// assert!(ctx.registered_tables().is_empty());
/// ```
pub struct GateContext {
    inner: SessionContext,
    tables: HashMap<String, Arc<dyn TableProvider>>,
    config: GateContextConfig,
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("tables", &self.registered_tables())
            .field("config", &self.config)
            .finish()
    }
}

impl GateContext {
    /// Creates a new context with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(GateContextConfig::default())
    }

    /// Creates a new context with custom configuration.
    #[instrument(skip(config), fields(
        context.batch_size = config.batch_size,
        context.target_partitions = config.target_partitions
    ))]
    pub fn with_config(config: GateContextConfig) -> Result<Self> {
        if config.batch_size == 0 || config.target_partitions == 0 {
            return Err(GateError::config(
                "batch_size and target_partitions must be greater than zero",
            ));
        }

        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(config.target_partitions)
            .with_information_schema(true);

        let memory_pool = Arc::new(FairSpillPool::new(config.max_memory)) as Arc<dyn MemoryPool>;

        let runtime_env = RuntimeEnvBuilder::new()
            .with_memory_pool(memory_pool)
            .build()
            .map(Arc::new)?;

        let inner = SessionContext::new_with_config_rt(session_config, runtime_env);

        Ok(Self {
            inner,
            tables: HashMap::new(),
            config,
        })
    }

    /// Returns a reference to the underlying DataFusion [`SessionContext`].
    pub fn inner(&self) -> &SessionContext {
        &self.inner
    }

    /// Returns the configuration used to create this context.
    pub fn config(&self) -> &GateContextConfig {
        &self.config
    }

    /// Returns the names of all registered tables.
    pub fn registered_tables(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Checks if a table is registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Registers a table provider under `name` and tracks it.
    pub fn register_table_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn TableProvider>,
    ) -> Result<()> {
        SqlSecurity::validate_table_name(name)?;
        self.inner.register_table(name, provider.clone())?;
        self.tables.insert(name.to_string(), provider);
        debug!(table.name = %name, "Registered table");
        Ok(())
    }

    /// Deregisters a table from the context.
    pub fn deregister_table(&mut self, name: &str) -> Result<()> {
        self.inner.deregister_table(name)?;
        self.tables.remove(name);
        debug!(table.name = %name, "Deregistered table");
        Ok(())
    }

    /// Clears all registered tables.
    pub fn clear_tables(&mut self) -> Result<()> {
        let table_names: Vec<_> = self.tables.keys().cloned().collect();
        for name in table_names {
            self.deregister_table(&name)?;
        }
        Ok(())
    }
}

impl Drop for GateContext {
    fn drop(&mut self) {
        if let Err(e) = self.clear_tables() {
            tracing::warn!("Failed to clear tables during GateContext drop: {}", e);
        }
    }
}
