//! Reflow Pager
//!
//! Stable, cached pagination of lazily-loaded multi-section documents over a
//! host rendering surface.
//!
//! The engine never renders anything itself. A host implements
//! [`surface::RenderSurface`] and [`source::SectionStore`]; the
//! [`navigation::NavigationController`] drives them and reports positions
//! through an [`events::EventSink`]. The [`simulated`] module provides a
//! deterministic host used by the binary and the test suite.

pub mod bake;
pub mod config;
pub mod events;
pub mod layout;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod sentinel;
pub mod simulated;
pub mod source;
pub mod surface;

#[cfg(test)]
mod test_harness;

#[cfg(test)]
mod tests;
