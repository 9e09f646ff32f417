//! Arbor Runtime - hosting layer for the Arbor service engine.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `ArborConfig`)
//! - Logging setup (`LoggingBuilder`, `SpanEvents`)
//! - A runtime host that builds a service tree from configuration and routes
//!   events through it (`ArborRuntime`)
//!
//! ```ignore
//! use arbor_runtime::ArborRuntime;
//!
//! let mut runtime = ArborRuntime::builder().build(bot)?;
//! runtime.register::<Echo>();
//! runtime.start()?;
//!
//! runtime.dispatch(&mut message)?;
//! for entry in runtime.report() {
//!     println!("{} -> {}", entry.identity, entry.outcome);
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [services]
//! root = ["my_bot::Echo", "my_bot::Stats"]
//! strict = false
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ArborConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ArborRuntime, RuntimeBuilder, RuntimeStats, ServiceReport};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
