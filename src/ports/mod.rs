//! Ports - Trait seams between the pipeline and the outside world.

pub mod delivery;
pub mod fetch;
pub mod frames;
pub mod pipeline;
pub mod progress;
pub mod tools;
