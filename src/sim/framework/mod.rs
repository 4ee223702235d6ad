//! Generic simulation framework.
//!
//! A small runtime for composing simulation modules (outdoor environment,
//! thermal core, recorders) without wiring them to each other directly.

pub mod bus;
pub mod context;
pub mod module;
pub mod pipeline;

pub use bus::Bus;
pub use context::SimContext;
pub use module::SimModule;
pub use pipeline::Pipeline;
