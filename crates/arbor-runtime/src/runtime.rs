//! The runtime host: one bot, one service tree.
//!
//! [`ArborRuntime`] owns a [`RootDispatcher`], assembles its top-level
//! services from `services.root` and the service registry, installs the tree
//! against the bot, and routes events into it.
//!
//! ```rust,ignore
//! use arbor_runtime::ArborRuntime;
//!
//! let mut runtime = ArborRuntime::builder()
//!     .config_file("arbor.toml")
//!     .build(bot)?;
//!
//! runtime.start()?;
//! runtime.dispatch(&mut event)?;
//! println!("{}", runtime.stats());
//! runtime.stop();
//! ```

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use arbor_core::{
    Behavior, BoxedBot, BoxedService, Event, Identity, RootDispatcher, RunResult, ServiceRegistry,
    global, identity_of,
};

use crate::config::{ArborConfig, ConfigLoader, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Hosts a service tree for a single bot.
pub struct ArborRuntime {
    config: ArborConfig,
    bot: BoxedBot,
    registry: ServiceRegistry,
    dispatcher: RootDispatcher,
    running: bool,
    dispatched: u64,
}

impl ArborRuntime {
    /// Creates a runtime with configuration loaded from the current directory.
    ///
    /// Falls back to defaults if no usable configuration is found.
    pub fn new(bot: BoxedBot) -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                ArborConfig::default()
            });

        Self::from_config(&config, bot)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging and snapshots the process-wide service registry.
    pub fn from_config(config: &ArborConfig, bot: BoxedBot) -> Self {
        logging::init_from_config(&config.logging);

        let registry = global().read().clone();

        info!(
            bot = bot.id(),
            log_level = %config.logging.level,
            registered = registry.len(),
            root_services = config.services.root.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            bot,
            registry,
            dispatcher: RootDispatcher::root(),
            running: false,
            dispatched: 0,
        }
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Mutable access to this runtime's registry.
    ///
    /// Changes are local to the runtime and do not touch the process-wide table.
    pub fn registry_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.registry
    }

    pub fn dispatcher(&self) -> &RootDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut RootDispatcher {
        &mut self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Registers `B` under its identity so `services.root` can name it.
    pub fn register<B: Behavior + Default>(&mut self) -> &mut Self {
        self.registry.register_type::<B>();
        self
    }

    /// Adds a top-level service directly, bypassing configuration.
    ///
    /// On a running runtime the service is installed immediately.
    pub fn add(&mut self, service: BoxedService) -> &mut Self {
        let identity = service.identity();
        self.dispatcher.add(service);
        if self.running {
            debug!(service = identity, "Installing service added at runtime");
            self.dispatcher.children_mut().install_all(&self.bot);
        }
        self
    }

    pub fn add_type<B: Behavior + Default>(&mut self) -> &mut Self {
        self.add(Box::new(arbor_core::Composable::<B>::default()))
    }

    /// Resolves `services.root` against the registry and installs the tree.
    ///
    /// With `services.strict` an unknown identity aborts the start and leaves
    /// the tree untouched; otherwise it is logged and skipped.
    pub fn start(&mut self) -> RuntimeResult<()> {
        if self.running {
            return Err(RuntimeError::AlreadyStarted);
        }

        let mut resolved = Vec::with_capacity(self.config.services.root.len());
        for identity in &self.config.services.root {
            match self.registry.create(identity) {
                Ok(service) => resolved.push(service),
                Err(e) if self.config.services.strict => return Err(e.into()),
                Err(e) => warn!(service = %identity, error = %e, "Skipping root service"),
            }
        }

        for service in resolved {
            self.dispatcher.add(service);
        }

        info!(
            bot = self.bot.id(),
            services = self.dispatcher.children().len(),
            "Starting Arbor runtime"
        );
        self.dispatcher.start(&self.bot);
        self.running = true;

        Ok(())
    }

    /// Routes one event through the tree.
    ///
    /// The returned result is the root's own, which is always inert; per-service
    /// outcomes are read back through [`report`](Self::report).
    pub fn dispatch(&mut self, event: &mut dyn Event) -> RuntimeResult<RunResult> {
        if !self.running {
            return Err(RuntimeError::NotStarted);
        }

        self.dispatched += 1;
        Ok(self.dispatcher.dispatch(&self.bot, event))
    }

    /// Uninstalls the tree. Top-level services stay registered with the
    /// dispatcher, so a later `start` reinstalls them.
    pub fn stop(&mut self) {
        if !self.running {
            warn!("Runtime is not running");
            return;
        }

        info!(bot = self.bot.id(), dispatched = self.dispatched, "Stopping Arbor runtime");
        self.dispatcher.stop(&self.bot);
        self.running = false;
    }

    /// Resets every top-level cached result to inert.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.dispatcher.children_mut().invalidate_all();
        debug!(count, "Invalidated top-level results");
        count
    }

    /// Cached outcome of every top-level service, in traversal order.
    pub fn report(&self) -> Vec<ServiceReport> {
        self.dispatcher
            .children()
            .iter()
            .map(|(identity, entry)| ServiceReport::new(identity, entry.last_result()))
            .collect()
    }

    /// Cached result of one top-level service, looked up by type.
    pub fn result_of<B: Behavior>(&self) -> Option<&RunResult> {
        self.dispatcher.children().result(identity_of::<B>())
    }

    pub fn stats(&self) -> RuntimeStats {
        let mut stats = RuntimeStats {
            dispatched: self.dispatched,
            ..Default::default()
        };

        for (_, entry) in self.dispatcher.children().iter() {
            let result = entry.last_result();
            stats.services += 1;
            if result.is_success() {
                stats.success += 1;
            } else if result.is_failure() {
                stats.failure += 1;
            } else {
                stats.inert += 1;
            }
        }

        stats
    }
}

impl fmt::Debug for ArborRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArborRuntime")
            .field("bot", &self.bot.id())
            .field("running", &self.running)
            .field("dispatched", &self.dispatched)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Serializable snapshot of one top-level service's cached result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub identity: Identity,
    pub outcome: &'static str,
    pub status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<&'static str>,
}

impl ServiceReport {
    fn new(identity: Identity, result: &RunResult) -> Self {
        Self {
            identity,
            outcome: result.outcome().as_str(),
            status: result.status(),
            payload_type: result.payload_type_name(),
        }
    }
}

/// Aggregate counts over the top-level cached results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub services: usize,
    pub success: usize,
    pub failure: usize,
    pub inert: usize,
    pub dispatched: u64,
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} services ({} success, {} failure, {} inert) after {} dispatches",
            self.services, self.success, self.failure, self.inert, self.dispatched
        )
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads and validates configuration, then builds an [`ArborRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: ArborConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self, bot: BoxedBot) -> RuntimeResult<ArborRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(ArborRuntime::from_config(&config, bot))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
