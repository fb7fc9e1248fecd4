pub mod delta_r;
pub mod ports;
pub mod registry;
pub mod seed;
pub mod testing;
pub mod types;

pub use delta_r::DeltaROverlapTest;
pub use ports::OverlapTest;
pub use registry::{OverlapTestFactory, OverlapTestRegistry};
pub use seed::SuperClusterSeedOverlapTest;
pub use types::{OverlapOutcome, OverlapTestConfig};
