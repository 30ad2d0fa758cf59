pub mod change;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod outcome;
pub mod partition;
pub mod replace;
pub mod selector;
pub mod simulator;
pub mod store;
pub mod test_utils;
pub mod types;

// Re-export commonly used types
pub use change::{DistributionPlan, SenseCounts, SimulatedChange};
pub use config::{Config, SimulationConfig};
pub use error::{SimError, SimResult};
pub use export::Exporter;
pub use loader::DataLoader;
pub use partition::{CorpusPartitioner, PartitionReport};
pub use simulator::{ChangeTypeData, Simulator};
pub use store::{CorpusTable, SentenceStatuses};
pub use types::{ChangeResult, ManifestRow, SenseMode, Status, TargetCandidate, TokenRow};
