//! The root of a service tree.
//!
//! [`RootDispatcher`] is a [`Composable`] whose behavior, [`FanOut`],
//! forwards every event to each direct child in ascending identity order.
//! Each child's result is cached in the dispatcher's stack; the dispatcher
//! itself always returns [`RunResult::inert`]. A failing child never stops
//! the walk.
//!
//! ```rust,ignore
//! let mut root = RootDispatcher::root();
//! root.add_type::<Greeter>().add_type::<Audit>();
//!
//! root.start(&bot);
//! root.dispatch(&bot, &mut event);
//! let greeter = root.children().result(identity_of::<Greeter>());
//! root.stop(&bot);
//! ```

use tracing::{Level, span};

use crate::composable::{Behavior, Composable};
use crate::context::{BoxedBot, Event};
use crate::error::RegistryResult;
use crate::manager::Manager;
use crate::registry::ServiceRegistry;
use crate::result::RunResult;
use crate::service::{BoxedService, Service};

/// Pure fan-out behavior: serve every child, aggregate nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut;

impl Behavior for FanOut {
    fn on_run(
        &mut self,
        bot: &BoxedBot,
        event: &mut dyn Event,
        children: &mut Manager,
    ) -> RunResult {
        children.for_each(|_, entry| {
            entry.serve(bot, &mut *event);
        });
        RunResult::inert()
    }
}

/// The top of a service tree.
pub type RootDispatcher = Composable<FanOut>;

impl Composable<FanOut> {
    /// Creates an empty dispatcher.
    pub fn root() -> Self {
        Self::new(FanOut)
    }

    /// Adds a top-level service.
    pub fn add(&mut self, service: BoxedService) -> &mut Self {
        self.children_mut().add(service);
        self
    }

    /// Adds a default-constructed top-level `B`.
    pub fn add_type<B: Behavior + Default>(&mut self) -> &mut Self {
        self.children_mut().add_type::<B>();
        self
    }

    /// Constructs `identity` from `registry` as a top-level service.
    pub fn require_from(
        &mut self,
        registry: &ServiceRegistry,
        identity: &str,
    ) -> RegistryResult<&mut Self> {
        self.children_mut().require_from(registry, identity)?;
        Ok(self)
    }

    /// Installs the whole tree against `bot`.
    pub fn start(&mut self, bot: &BoxedBot) {
        self.install(bot, &mut Manager::new());
    }

    /// Routes one event down the tree.
    pub fn dispatch(&mut self, bot: &BoxedBot, event: &mut dyn Event) -> RunResult {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            bot = bot.id(),
            event_name = event.event_name()
        );
        let _enter = span.enter();

        self.serve(bot, event)
    }

    /// Uninstalls the whole tree.
    pub fn stop(&mut self, bot: &BoxedBot) {
        self.uninstall(bot);
    }
}
