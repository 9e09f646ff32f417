//! The lifecycle template shared by every composed service.
//!
//! A concrete service supplies its logic as a [`Behavior`]; wrapping it in a
//! [`Composable`] yields a [`Service`] with the standard protocol:
//!
//! ```text
//! install(bot, parent)
//!   1. behavior.declare_children(parent, children)
//!   2. children.install_all(bot)          ascending identity order
//!   3. behavior.on_load(bot)              children are live by now
//!
//! uninstall(bot)
//!   1. children.uninstall_all(bot)
//!   2. behavior.on_unload(bot)
//!
//! serve(bot, event)
//!   1. behavior.on_run(bot, event, children)
//!   2. the parent's Entry::serve caches the result one level up
//! ```
//!
//! Hook errors are logged and swallowed: `install` and `uninstall` always
//! run to completion.
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Behavior for Greeter {
//!     fn declare_children(&mut self, _parent: &mut Manager, children: &mut Manager) -> ServiceResult {
//!         children.add_type::<Logger>();
//!         Ok(())
//!     }
//!
//!     fn on_run(&mut self, _bot: &BoxedBot, _event: &mut dyn Event, _children: &mut Manager) -> RunResult {
//!         RunResult::success().with_payload("hello")
//!     }
//! }
//!
//! register_service!(Greeter);
//! ```

use std::any::Any;
use std::fmt;

use tracing::{debug, error, warn};

use crate::context::{BoxedBot, Event};
use crate::error::ServiceResult;
use crate::manager::Manager;
use crate::result::RunResult;
use crate::service::{BoxedService, Identity, Service, identity_of};

/// The hooks a concrete service plugs into [`Composable`].
///
/// Every hook has a no-op default, so a service overrides only what it uses.
pub trait Behavior: Any + Send {
    /// Registers sub-services, normally into `children`.
    ///
    /// Services added to `parent` become siblings of this one; the owning
    /// stack installs them once its current walk finishes.
    fn declare_children(&mut self, parent: &mut Manager, children: &mut Manager) -> ServiceResult {
        let _ = (parent, children);
        Ok(())
    }

    /// Self-specific setup. Runs after every child is installed.
    fn on_load(&mut self, bot: &BoxedBot) -> ServiceResult {
        let _ = bot;
        Ok(())
    }

    /// Self-specific teardown. Runs after every child is uninstalled.
    fn on_unload(&mut self, bot: &BoxedBot) -> ServiceResult {
        let _ = bot;
        Ok(())
    }

    /// Handles one event.
    fn on_run(
        &mut self,
        bot: &BoxedBot,
        event: &mut dyn Event,
        children: &mut Manager,
    ) -> RunResult {
        let _ = (bot, event, children);
        RunResult::inert()
    }
}

/// A [`Behavior`] plus the execution stack of its children.
///
/// The identity is derived from `B`, so `Composable<Greeter>` and a
/// registry entry for `Greeter` share the same key.
pub struct Composable<B> {
    behavior: B,
    children: Manager,
    installed: bool,
}

impl<B: Behavior> Composable<B> {
    /// Wraps `behavior` with an empty child stack.
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            children: Manager::new(),
            installed: false,
        }
    }

    /// Wraps `behavior` and boxes it for insertion into a stack.
    pub fn boxed(behavior: B) -> BoxedService {
        Box::new(Self::new(behavior))
    }

    /// Returns the wrapped behavior.
    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    /// Returns the wrapped behavior mutably.
    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Returns this service's child stack.
    pub fn children(&self) -> &Manager {
        &self.children
    }

    /// Returns this service's child stack mutably.
    pub fn children_mut(&mut self) -> &mut Manager {
        &mut self.children
    }

    /// Returns `true` between a completed `install` and the next `uninstall`.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

impl<B: Behavior + Default> Default for Composable<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Behavior> Service for Composable<B> {
    fn identity(&self) -> Identity {
        identity_of::<B>()
    }

    fn install(&mut self, bot: &BoxedBot, parent: &mut Manager) {
        let identity = self.identity();
        if self.installed {
            warn!(service = identity, "Service already installed, ignoring");
            return;
        }

        if let Err(e) = self.behavior.declare_children(parent, &mut self.children) {
            error!(service = identity, error = %e, "Failed to declare children");
        }

        self.children.install_all(bot);

        if let Err(e) = self.behavior.on_load(bot) {
            error!(service = identity, error = %e, "Service on_load failed");
        }

        self.installed = true;
        debug!(
            service = identity,
            children = self.children.len(),
            "Service installed"
        );
    }

    fn uninstall(&mut self, bot: &BoxedBot) {
        let identity = self.identity();
        if !self.installed {
            debug!(service = identity, "Service not installed, nothing to uninstall");
            return;
        }

        self.children.uninstall_all(bot);

        if let Err(e) = self.behavior.on_unload(bot) {
            error!(service = identity, error = %e, "Service on_unload failed");
        }

        self.installed = false;
        debug!(service = identity, "Service uninstalled");
    }

    fn serve(&mut self, bot: &BoxedBot, event: &mut dyn Event) -> RunResult {
        self.behavior.on_run(bot, event, &mut self.children)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<B: Behavior> fmt::Debug for Composable<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composable")
            .field("identity", &self.identity())
            .field("installed", &self.installed)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::context::Bot;
    use crate::error::ServiceError;

    struct TestBot;

    impl Bot for TestBot {
        fn id(&self) -> &str {
            "test"
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Tick;

    impl Event for Tick {
        fn event_name(&self) -> &'static str {
            "tick"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records every hook call into a shared journal.
    struct Recorder {
        name: &'static str,
        journal: Journal,
    }

    impl Recorder {
        fn note(&self, what: &str) {
            self.journal.lock().push(format!("{}.{what}", self.name));
        }
    }

    impl Behavior for Recorder {
        fn on_load(&mut self, _bot: &BoxedBot) -> ServiceResult {
            self.note("load");
            Ok(())
        }

        fn on_unload(&mut self, _bot: &BoxedBot) -> ServiceResult {
            self.note("unload");
            Ok(())
        }

        fn on_run(&mut self, _: &BoxedBot, _: &mut dyn Event, _: &mut Manager) -> RunResult {
            self.note("run");
            RunResult::success()
        }
    }

    // Two distinct child types so their identities differ.
    struct P(Recorder);
    struct Q(Recorder);

    impl Behavior for P {
        fn on_load(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.0.on_load(bot)
        }

        fn on_unload(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.0.on_unload(bot)
        }
    }

    impl Behavior for Q {
        fn on_load(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.0.on_load(bot)
        }

        fn on_unload(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.0.on_unload(bot)
        }
    }

    struct Parent {
        inner: Recorder,
    }

    impl Behavior for Parent {
        fn declare_children(&mut self, _parent: &mut Manager, children: &mut Manager) -> ServiceResult {
            let journal = &self.inner.journal;
            // Added out of order on purpose.
            children.add(Composable::boxed(Q(Recorder {
                name: "q",
                journal: Arc::clone(journal),
            })));
            children.add(Composable::boxed(P(Recorder {
                name: "p",
                journal: Arc::clone(journal),
            })));
            Ok(())
        }

        fn on_load(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.inner.on_load(bot)
        }

        fn on_unload(&mut self, bot: &BoxedBot) -> ServiceResult {
            self.inner.on_unload(bot)
        }

        fn on_run(&mut self, bot: &BoxedBot, event: &mut dyn Event, children: &mut Manager) -> RunResult {
            self.inner.on_run(bot, event, children)
        }
    }

    fn bot() -> BoxedBot {
        Arc::new(TestBot)
    }

    #[test]
    fn test_lifecycle_ordering() {
        let journal: Journal = Arc::default();
        let bot = bot();
        let mut service = Composable::new(Parent {
            inner: Recorder {
                name: "parent",
                journal: Arc::clone(&journal),
            },
        });
        let mut outer = Manager::new();

        service.install(&bot, &mut outer);
        assert!(service.is_installed());
        // P sorts before Q by identity.
        assert!(identity_of::<P>() < identity_of::<Q>());
        assert_eq!(
            *journal.lock(),
            vec!["p.load", "q.load", "parent.load"]
        );

        journal.lock().clear();
        service.uninstall(&bot);
        assert!(!service.is_installed());
        let log = journal.lock().clone();
        assert_eq!(log.last().map(String::as_str), Some("parent.unload"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_double_install_is_ignored() {
        let journal: Journal = Arc::default();
        let bot = bot();
        let mut service = Composable::new(Recorder {
            name: "r",
            journal: Arc::clone(&journal),
        });
        let mut outer = Manager::new();

        service.install(&bot, &mut outer);
        service.install(&bot, &mut outer);
        service.uninstall(&bot);
        service.uninstall(&bot);

        assert_eq!(*journal.lock(), vec!["r.load", "r.unload"]);
    }

    #[test]
    fn test_serve_returns_fresh_result_and_parent_caches_it() {
        let journal: Journal = Arc::default();
        let bot = bot();
        let mut parent = Manager::new();
        parent.add(Composable::boxed(Recorder {
            name: "r",
            journal: Arc::clone(&journal),
        }));
        let identity = identity_of::<Recorder>();

        let result = parent.serve(identity, &bot, &mut Tick).unwrap();

        assert!(result.is_success());
        assert!(parent.result(identity).unwrap().is_success());
        assert_eq!(*journal.lock(), vec!["r.run"]);
    }

    #[derive(Default)]
    struct Sibling;

    impl Behavior for Sibling {}

    #[derive(Default)]
    struct Adopter;

    impl Behavior for Adopter {
        fn declare_children(&mut self, parent: &mut Manager, _children: &mut Manager) -> ServiceResult {
            parent.add_type::<Sibling>();
            Ok(())
        }
    }

    #[test]
    fn test_adopted_sibling_is_installed() {
        let bot = bot();
        let mut stack = Manager::new();
        stack.add_type::<Adopter>();

        stack.install_all(&bot);

        assert_eq!(stack.len(), 2);
        let sibling = stack
            .get(identity_of::<Sibling>())
            .and_then(|e| e.service().downcast_ref::<Composable<Sibling>>())
            .unwrap();
        assert!(sibling.is_installed());
    }

    /// Adopts a `Recorder`-backed sibling tagged "adopted".
    struct Usurper {
        journal: Journal,
    }

    impl Behavior for Usurper {
        fn declare_children(&mut self, parent: &mut Manager, _children: &mut Manager) -> ServiceResult {
            parent.add(Composable::boxed(Recorder {
                name: "adopted",
                journal: Arc::clone(&self.journal),
            }));
            Ok(())
        }
    }

    #[test]
    fn test_adoption_keeps_existing_sibling() {
        let journal: Journal = Arc::default();
        let bot = bot();
        let mut stack = Manager::new();
        stack
            .add(Composable::boxed(Recorder {
                name: "existing",
                journal: Arc::clone(&journal),
            }))
            .add(Composable::boxed(Usurper {
                journal: Arc::clone(&journal),
            }));

        stack.install_all(&bot);
        stack.uninstall_all(&bot);

        assert_eq!(stack.len(), 2);
        assert_eq!(*journal.lock(), vec!["existing.load", "existing.unload"]);
        let kept = stack
            .get(identity_of::<Recorder>())
            .and_then(|e| e.service().downcast_ref::<Composable<Recorder>>())
            .unwrap();
        assert_eq!(kept.behavior().name, "existing");
    }

    static SIBLING_LOADS: AtomicUsize = AtomicUsize::new(0);
    static SIBLING_UNLOADS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct CountedSibling;

    impl Behavior for CountedSibling {
        fn on_load(&mut self, _bot: &BoxedBot) -> ServiceResult {
            SIBLING_LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_unload(&mut self, _bot: &BoxedBot) -> ServiceResult {
            SIBLING_UNLOADS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RestartAdopter;

    impl Behavior for RestartAdopter {
        fn declare_children(&mut self, parent: &mut Manager, _children: &mut Manager) -> ServiceResult {
            parent.add_type::<CountedSibling>();
            Ok(())
        }
    }

    #[test]
    fn test_restart_keeps_load_and_unload_balanced() {
        let bot = bot();
        let mut root = crate::dispatcher::RootDispatcher::root();
        root.add_type::<RestartAdopter>();

        for round in 1..=2 {
            root.start(&bot);
            assert_eq!(root.children().len(), 2);
            assert_eq!(SIBLING_LOADS.load(Ordering::SeqCst), round);

            root.stop(&bot);
            assert_eq!(SIBLING_UNLOADS.load(Ordering::SeqCst), round);
        }

        assert!(root.children().iter().all(|(_, e)| !e.is_installed()));
    }

    #[derive(Default)]
    struct Broken {
        loaded: bool,
    }

    impl Behavior for Broken {
        fn declare_children(&mut self, _parent: &mut Manager, children: &mut Manager) -> ServiceResult {
            children.require_from(&crate::ServiceRegistry::new(), "missing")?;
            Ok(())
        }

        fn on_load(&mut self, _bot: &BoxedBot) -> ServiceResult {
            self.loaded = true;
            Err(ServiceError::custom("boom"))
        }
    }

    #[test]
    fn test_hook_errors_do_not_escape() {
        let bot = bot();
        let mut service = Composable::<Broken>::default();

        service.install(&bot, &mut Manager::new());

        assert!(service.is_installed());
        assert!(service.behavior().loaded);
        assert!(service.children().is_empty());
    }
}
