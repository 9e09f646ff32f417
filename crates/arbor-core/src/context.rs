//! Boundary traits for the hosting bot and incoming events.
//!
//! Both are opaque to the engine: a [`BoxedBot`] is forwarded unchanged
//! through every lifecycle call and a `&mut dyn Event` is handed down the
//! service tree. Concrete services downcast them when they need to.

use std::any::Any;
use std::sync::Arc;

// ============================================================================
// Bot
// ============================================================================

/// The runtime a service tree is installed against.
///
/// The engine never calls anything on a bot besides passing it along; the
/// methods exist so services and logs can identify and downcast it.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct ConsoleBot;
///
/// impl Bot for ConsoleBot {
///     fn id(&self) -> &str {
///         "console"
///     }
///
///     fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
///         self
///     }
/// }
/// ```
pub trait Bot: Any + Send + Sync {
    /// Returns the bot's identifier.
    fn id(&self) -> &str;

    /// Returns self as an `Arc<dyn Any>` for downcasting with `Arc::downcast`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

// ============================================================================
// Event
// ============================================================================

/// An incoming event routed through the service tree.
///
/// The payload shape belongs to the transport layer. Services receive
/// `&mut dyn Event` and downcast to the concrete type they understand.
pub trait Event: Any + Send {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Event {
    /// Returns `true` if the event is of type `T`.
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Attempts to view the event as a `T`.
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Attempts to view the event as a mutable `T`.
    pub fn downcast_mut<T: Event>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
