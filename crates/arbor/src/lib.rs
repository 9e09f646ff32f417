//! # Arbor
//!
//! Hierarchical service composition and event dispatch for bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────────────────┐
//! │ ArborRuntime │────▶│ RootDispatcher │────▶│ Service  (own children)  │──▶ ...
//! │  (one bot)   │     │                │────▶│ Service  (own children)  │──▶ ...
//! └──────────────┘     └────────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, sets up logging, owns the tree
//! - **Root dispatcher**: hands every event to every top-level service
//! - **Services**: composable units; each keeps its children's latest results
//! - **Registry**: builds services by identity, fed by `register_service!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arbor::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Behavior for Greeter {
//!     fn on_run(&mut self, _: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
//!         match event.downcast_ref::<Hello>() {
//!             Some(_) => RunResult::success().with_payload("hi"),
//!             None => RunResult::inert(),
//!         }
//!     }
//! }
//!
//! register_service!(Greeter);
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut runtime = ArborRuntime::builder().build(Arc::new(MyBot))?;
//!     runtime.start()?;
//!     runtime.dispatch(&mut Hello)?;
//!     runtime.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use arbor_core as core;
pub use arbor_runtime as runtime;

/// Commonly used types for building service trees.
///
/// ```rust,ignore
/// use arbor::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use arbor_runtime::{ArborConfig, ArborRuntime, RuntimeError, RuntimeResult};

    // Service authoring
    pub use arbor_core::prelude::*;

    // Logging macros
    pub use arbor_runtime::prelude::*;
}
