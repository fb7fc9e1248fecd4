use serde::Deserialize;

use crate::{
    error::{CleaningError, configuration_error, input_missing},
    event::{
        ports::{EventContext, PhysicsView},
        types::ObjectRef,
    },
    overlap::{
        ports::OverlapTest,
        types::{OverlapOutcome, OverlapTestConfig},
    },
    predicate::Predicate,
};

pub const ALGORITHM: &str = "bySuperClusterSeed";

fn default_seed_component() -> String {
    "super_cluster_seed".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedParams {
    src: String,
    #[serde(default)]
    preselection: String,
    #[serde(default = "default_seed_component")]
    seed_component: String,
}

/// Matches objects built from the same calorimeter seed, e.g. an electron and a
/// photon sharing one super-cluster.
#[derive(Debug)]
pub struct SuperClusterSeedOverlapTest {
    name: String,
    require_no_overlap: bool,
    src: String,
    preselection: Predicate,
    seed_component: String,
    seeds: Vec<(usize, ObjectRef)>,
}

impl SuperClusterSeedOverlapTest {
    pub fn from_config(config: &OverlapTestConfig) -> Result<Self, CleaningError> {
        let params: SeedParams = config.parse_params()?;
        if params.src.trim().is_empty() || params.seed_component.trim().is_empty() {
            return Err(configuration_error(format!(
                "overlap test '{}': src and seed_component cannot be empty",
                config.name
            )));
        }
        let preselection = Predicate::compile(&params.preselection).map_err(|err| {
            configuration_error(format!("overlap test '{}': {}", config.name, err.message))
        })?;

        Ok(Self {
            name: config.name.clone(),
            require_no_overlap: config.require_no_overlap,
            src: params.src,
            preselection,
            seed_component: params.seed_component,
            seeds: Vec::new(),
        })
    }

    pub fn build(config: &OverlapTestConfig) -> Result<Box<dyn OverlapTest>, CleaningError> {
        Ok(Box::new(Self::from_config(config)?))
    }
}

impl OverlapTest for SuperClusterSeedOverlapTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn require_no_overlap(&self) -> bool {
        self.require_no_overlap
    }

    fn refresh(&mut self, event: &dyn EventContext) -> Result<(), CleaningError> {
        self.seeds.clear();
        let others = event.collection(&self.src).ok_or_else(|| {
            input_missing(format!(
                "overlap test '{}': collection '{}' not found in event {}",
                self.name,
                self.src,
                event.event_id()
            ))
        })?;

        self.seeds.extend(
            others
                .iter()
                .enumerate()
                .filter(|(_, other)| self.preselection.evaluate(*other))
                .filter_map(|(index, other)| {
                    other
                        .component(&self.seed_component)
                        .map(|seed| (index, seed.clone()))
                }),
        );
        Ok(())
    }

    fn evaluate(&self, object: &dyn PhysicsView) -> OverlapOutcome {
        let Some(seed) = object.component(&self.seed_component) else {
            return OverlapOutcome::none();
        };

        OverlapOutcome::from_overlaps(
            self.seeds
                .iter()
                .filter(|(_, other_seed)| other_seed == seed)
                .map(|(index, _)| ObjectRef::new(self.src.clone(), *index))
                .collect(),
        )
    }
}
