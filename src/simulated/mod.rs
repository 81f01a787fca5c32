//! In-process stand-ins for the host collaborators.
//!
//! A [`SimDocument`] describes sections as runs of blocks with natural
//! extents. [`SimSectionStore`] serves those sections and can stall or fail
//! loads on demand; [`SimulatedSurface`] lays them out deterministically so
//! pagination, baking and visible-range tracking can run end to end without
//! a real rendering engine.

pub mod document;
pub mod store;
pub mod surface;

pub use document::{SimBlock, SimDocument, SimSection};
pub use store::SimSectionStore;
pub use surface::SimulatedSurface;
