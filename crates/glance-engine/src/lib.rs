pub mod engine;
pub mod options;
pub mod targets;
mod worker;


pub use engine::{GLOBAL_PROFILE, LiveOcrEngine};
pub use options::EngineOptions;
