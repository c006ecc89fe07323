pub mod engine;
pub mod history;
pub mod store;

pub use engine::{KnowledgeSnapshot, WeightEngine};
pub use history::{PreferenceHistory, NEUTRAL_MULTIPLIER};
pub use store::{FileStore, KeyValueStore, MemoryStore, PreferenceRepository, KEY_HISTORY};
