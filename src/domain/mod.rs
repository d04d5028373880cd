//! Domain layer - Pure pipeline logic.

pub mod classify;
pub mod extraction;
pub mod files;
pub mod frames;
pub mod media;
pub mod profiles;
pub mod slideshow;
pub mod status;
pub mod workspace;
