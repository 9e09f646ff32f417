//! The service capability contract.
//!
//! Every pluggable unit, composed or hand-written, implements [`Service`].
//! None of its operations return `Err`: failures are reported through the
//! returned [`RunResult`] or logged and swallowed by the implementation.

use std::any::{Any, type_name};

use crate::context::{BoxedBot, Event};
use crate::manager::Manager;
use crate::result::RunResult;

/// Stable per-type key joining the registry, execution stacks and parent to
/// child references.
pub type Identity = &'static str;

/// Derives the identity of a concrete type.
///
/// The same type always yields the same identity and distinct types yield
/// distinct identities, since the value is the fully qualified type path.
pub fn identity_of<T: ?Sized + 'static>() -> Identity {
    type_name::<T>()
}

/// A named, pluggable unit of behavior.
///
/// Most services should not implement this directly but wrap a
/// [`Behavior`](crate::Behavior) in a [`Composable`](crate::Composable),
/// which supplies the child-propagating lifecycle.
pub trait Service: Any + Send {
    /// Returns the identity of this service's concrete type.
    fn identity(&self) -> Identity;

    /// Activates the service against `bot`.
    ///
    /// `parent` is the stack this service lives in. A service may adopt
    /// siblings into it; the owner merges and installs them after the
    /// current walk.
    fn install(&mut self, bot: &BoxedBot, parent: &mut Manager);

    /// Reverses [`install`](Self::install).
    fn uninstall(&mut self, bot: &BoxedBot);

    /// Processes one event.
    fn serve(&mut self, bot: &BoxedBot, event: &mut dyn Event) -> RunResult;

    /// Returns self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns self as mutable `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An owned Service trait object, as stored in an execution stack.
pub type BoxedService = Box<dyn Service>;

impl dyn Service {
    /// Attempts to view the service as a `T`.
    pub fn downcast_ref<T: Service>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Attempts to view the service as a mutable `T`.
    pub fn downcast_mut<T: Service>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
