use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    error::{CleaningError, configuration_error},
    overlap::{
        delta_r::{self, DeltaROverlapTest},
        ports::OverlapTest,
        seed::{self, SuperClusterSeedOverlapTest},
        types::OverlapTestConfig,
    },
};

pub type OverlapTestFactory =
    Arc<dyn Fn(&OverlapTestConfig) -> Result<Box<dyn OverlapTest>, CleaningError> + Send + Sync>;

/// Algorithm identifier → factory lookup table.
#[derive(Clone, Default)]
pub struct OverlapTestRegistry {
    factories: BTreeMap<String, OverlapTestFactory>,
}

impl OverlapTestRegistry {
    /// An empty registry; every algorithm must be registered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `byDeltaR` and `bySuperClusterSeed`.
    pub fn with_builtin() -> Self {
        let mut factories: BTreeMap<String, OverlapTestFactory> = BTreeMap::new();
        factories.insert(delta_r::ALGORITHM.to_string(), Arc::new(DeltaROverlapTest::build));
        factories.insert(
            seed::ALGORITHM.to_string(),
            Arc::new(SuperClusterSeedOverlapTest::build),
        );
        Self { factories }
    }

    pub fn register<F>(&mut self, algorithm: impl Into<String>, factory: F) -> Result<(), CleaningError>
    where
        F: Fn(&OverlapTestConfig) -> Result<Box<dyn OverlapTest>, CleaningError>
            + Send
            + Sync
            + 'static,
    {
        let algorithm = algorithm.into();
        if algorithm.trim().is_empty() {
            return Err(configuration_error("overlap algorithm id cannot be empty"));
        }
        if self.factories.contains_key(&algorithm) {
            return Err(configuration_error(format!(
                "overlap algorithm already registered: {algorithm}"
            )));
        }
        self.factories.insert(algorithm, Arc::new(factory));
        Ok(())
    }

    pub fn algorithms(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, algorithm: &str) -> bool {
        self.factories.contains_key(algorithm)
    }

    pub fn build(&self, config: &OverlapTestConfig) -> Result<Box<dyn OverlapTest>, CleaningError> {
        let factory = self.factories.get(&config.algorithm).ok_or_else(|| {
            configuration_error(format!(
                "overlap test '{}': unsupported algorithm '{}' (known: {})",
                config.name,
                config.algorithm,
                self.algorithms().join(", ")
            ))
        })?;

        let test = (**factory)(config)?;
        if test.name() != config.name || test.require_no_overlap() != config.require_no_overlap {
            return Err(configuration_error(format!(
                "overlap test '{}': factory for '{}' did not keep the configured name/policy",
                config.name, config.algorithm
            )));
        }
        Ok(test)
    }

    /// Builds every test in configuration order; duplicate names are rejected
    /// before any factory runs.
    pub fn build_all(
        &self,
        configs: &[OverlapTestConfig],
    ) -> Result<Vec<Box<dyn OverlapTest>>, CleaningError> {
        let mut seen = BTreeSet::new();
        for config in configs {
            if config.name.trim().is_empty() {
                return Err(configuration_error("overlap test name cannot be empty"));
            }
            if !seen.insert(config.name.as_str()) {
                return Err(configuration_error(format!(
                    "duplicate overlap test name: {}",
                    config.name
                )));
            }
        }

        configs.iter().map(|config| self.build(config)).collect()
    }
}

impl std::fmt::Debug for OverlapTestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlapTestRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}
