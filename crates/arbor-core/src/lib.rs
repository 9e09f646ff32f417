//! # Arbor Core
//!
//! A hierarchical service composition and dispatch engine.
//!
//! Services are named, pluggable units of behavior organised into
//! parent/child trees. A tree is installed against a shared [`Bot`],
//! events are routed down it depth-first, and every node's latest
//! [`RunResult`] is cached in its parent's execution stack.
//!
//! ## Building Blocks
//!
//! - **Result**: tri-state outcome with a type-checked payload ([`RunResult`])
//! - **Registry**: identity-keyed service factories ([`ServiceRegistry`], [`register_service!`])
//! - **Execution Stack**: ordered children plus cached results ([`Manager`], [`Entry`])
//! - **Service**: the lifecycle contract ([`Service`])
//! - **Composable**: the shared install/uninstall/serve template ([`Composable`], [`Behavior`])
//! - **Root Dispatcher**: fan-out to every top-level service ([`RootDispatcher`])
//!
//! ## Data Flow
//!
//! ```text
//!               ┌────────────────┐
//!   event ────▶ │ RootDispatcher │  returns inert
//!               └───────┬────────┘
//!          caches ▼     │ ascending identity order
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!   ┌─────────┐   ┌─────────┐    ┌─────────┐
//!   │ Service │   │ Service │    │ Service │ ──▶ own children ...
//!   └─────────┘   └─────────┘    └─────────┘
//! ```
//!
//! Everything is synchronous and single-threaded: `install`, `uninstall`
//! and `serve` run to completion before returning, and a slow hook blocks
//! the whole traversal.
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Echo;
//!
//! impl Behavior for Echo {
//!     fn on_run(&mut self, _bot: &BoxedBot, event: &mut dyn Event, _children: &mut Manager) -> RunResult {
//!         match event.downcast_ref::<Message>() {
//!             Some(msg) => RunResult::success().with_payload(msg.text.clone()),
//!             None => RunResult::inert(),
//!         }
//!     }
//! }
//!
//! let mut root = RootDispatcher::root();
//! root.add_type::<Echo>();
//! root.start(&bot);
//! root.dispatch(&bot, &mut message);
//! ```

pub mod composable;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod registry;
pub mod result;
pub mod service;

pub use composable::{Behavior, Composable};
pub use context::{Bot, BoxedBot, Event};
pub use dispatcher::{FanOut, RootDispatcher};
pub use error::{
    RegistryError, RegistryResult, ServiceError, ServiceResult, StackError, StackResult,
};
pub use manager::{Entry, Manager};
pub use registry::{
    SERVICE_TYPES, ServiceCtor, ServiceRegistry, ServiceRegistryBuilder, ServiceType, global,
    register_service_type,
};
pub use result::{Outcome, RetCode, RunResult};
pub use service::{BoxedService, Identity, Service, identity_of};

#[doc(hidden)]
pub use linkme as __linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::composable::{Behavior, Composable};
    pub use super::context::{Bot, BoxedBot, Event};
    pub use super::dispatcher::RootDispatcher;
    pub use super::error::{ServiceError, ServiceResult};
    pub use super::manager::{Entry, Manager};
    pub use super::register_service;
    pub use super::registry::ServiceRegistry;
    pub use super::result::{Outcome, RunResult};
    pub use super::service::{BoxedService, Identity, Service, identity_of};
}
