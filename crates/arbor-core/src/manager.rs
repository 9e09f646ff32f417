//! The execution stack: identity-keyed children and their cached results.
//!
//! A [`Manager`] maps each child's [`Identity`] to an [`Entry`] pairing the
//! live service with the last [`RunResult`] it produced. Every composable
//! service owns exactly one manager for its own children; managers are never
//! shared.
//!
//! # Ordering
//!
//! Traversal is always in ascending identity order, never insertion order,
//! so the same set of services is walked the same way on every run:
//!
//! ```text
//! add(b)  add(a)  add(c)   ──►   for_each: a, b, c
//! ```
//!
//! # Caching
//!
//! A child's result is cached in the *parent's* stack. [`Entry::serve`] runs
//! the child and swaps the fresh result into the entry, which is how a
//! parent records what each of its children last did.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::composable::{Behavior, Composable};
use crate::context::{BoxedBot, Event};
use crate::error::{RegistryResult, StackError, StackResult};
use crate::registry::{self, ServiceRegistry};
use crate::result::{RetCode, RunResult};
use crate::service::{BoxedService, Identity, Service, identity_of};

// =============================================================================
// Entry
// =============================================================================

/// One slot of an execution stack: a service and its cached result.
pub struct Entry {
    result: RunResult,
    service: BoxedService,
    installed: bool,
}

impl Entry {
    /// Creates an entry with an inert cached result.
    pub fn new(service: BoxedService) -> Self {
        Self {
            result: RunResult::inert(),
            service,
            installed: false,
        }
    }

    /// Returns the identity of the service in this slot.
    pub fn identity(&self) -> Identity {
        self.service.identity()
    }

    /// Returns the service in this slot.
    pub fn service(&self) -> &dyn Service {
        self.service.as_ref()
    }

    /// Returns the service in this slot mutably.
    pub fn service_mut(&mut self) -> &mut dyn Service {
        self.service.as_mut()
    }

    /// Returns `true` between this stack's `install_all` and `uninstall_all`.
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self, bot: &BoxedBot, parent: &mut Manager) {
        debug!(service = self.identity(), "Installing service");
        self.service.install(bot, parent);
        self.installed = true;
    }

    fn uninstall(&mut self, bot: &BoxedBot) {
        debug!(service = self.identity(), "Uninstalling service");
        self.service.uninstall(bot);
        self.installed = false;
    }

    /// Returns the most recently cached result.
    pub fn last_result(&self) -> &RunResult {
        &self.result
    }

    /// Stores `result` and returns the one it displaced.
    pub fn replace(&mut self, result: RunResult) -> RunResult {
        std::mem::replace(&mut self.result, result)
    }

    /// Resets the cached result to inert, returning the old one.
    pub fn invalidate(&mut self) -> RunResult {
        self.replace(RunResult::inert())
    }

    /// Runs the service on `event`, caches the result here and returns it.
    pub fn serve(&mut self, bot: &BoxedBot, event: &mut dyn Event) -> RunResult {
        let result = self.service.serve(bot, event);
        debug!(
            service = self.service.identity(),
            outcome = %result.outcome(),
            status = result.status(),
            "Service served"
        );
        self.result = result.clone();
        result
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("service", &self.identity())
            .field("result", &self.result)
            .field("installed", &self.installed)
            .finish()
    }
}

// =============================================================================
// Manager
// =============================================================================

/// An ordered, identity-keyed collection of child services.
#[derive(Default)]
pub struct Manager {
    stack: BTreeMap<Identity, Entry>,
}

impl Manager {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Assembly ────────────────────────────────────────────────────────────

    /// Upserts `service` under its own identity.
    ///
    /// An existing entry for the same identity is replaced wholesale; its
    /// service is dropped and its cached result discarded.
    pub fn add(&mut self, service: BoxedService) -> &mut Self {
        let identity = service.identity();
        if self.stack.insert(identity, Entry::new(service)).is_some() {
            debug!(service = identity, "Replaced existing stack entry");
        }
        self
    }

    /// Constructs a default `B` wrapped in a [`Composable`] and adds it.
    pub fn add_type<B: Behavior + Default>(&mut self) -> &mut Self {
        self.add(Box::new(Composable::<B>::default()))
    }

    /// Constructs `identity` from the process-wide registry and adds it.
    pub fn require(&mut self, identity: &str) -> RegistryResult<&mut Self> {
        let service = registry::global().read().create(identity)?;
        Ok(self.add(service))
    }

    /// Constructs `identity` from `registry` and adds it.
    pub fn require_from(
        &mut self,
        registry: &ServiceRegistry,
        identity: &str,
    ) -> RegistryResult<&mut Self> {
        let service = registry.create(identity)?;
        Ok(self.add(service))
    }

    /// Removes the entry for `identity`. Returns `true` if one existed.
    ///
    /// The removed service is dropped without being uninstalled.
    pub fn remove(&mut self, identity: &str) -> bool {
        self.stack.remove(identity).is_some()
    }

    /// Removes the entry keyed by `T`'s identity.
    pub fn remove_type<T: ?Sized + 'static>(&mut self) -> bool {
        self.remove(identity_of::<T>())
    }

    /// Uninstalls every installed child in ascending identity order, then
    /// drops them all.
    ///
    /// Children this stack never installed are dropped without `uninstall`.
    pub fn remove_all(&mut self, bot: &BoxedBot) {
        self.uninstall_all(bot);
        self.stack.clear();
    }

    // ─── Cache maintenance ───────────────────────────────────────────────────

    /// Resets the cached result of every entry matching `cond`.
    ///
    /// Returns the number of entries reset, including ones that were
    /// already inert.
    pub fn invalidate_if<F>(&mut self, mut cond: F) -> usize
    where
        F: FnMut(&Entry) -> bool,
    {
        let mut count = 0;
        for entry in self.stack.values_mut() {
            if cond(entry) {
                entry.invalidate();
                count += 1;
            }
        }
        count
    }

    /// Like [`invalidate_if`](Self::invalidate_if), judged on the cached
    /// status code alone.
    pub fn invalidate_if_code<F>(&mut self, mut cond: F) -> usize
    where
        F: FnMut(RetCode) -> bool,
    {
        self.invalidate_if(|entry| cond(entry.last_result().status()))
    }

    /// Resets the cached result for `identity`. Returns `true` if it exists.
    pub fn invalidate(&mut self, identity: &str) -> bool {
        self.invalidate_if(|entry| entry.identity() == identity) > 0
    }

    /// Resets every cached result and returns how many entries were touched.
    pub fn invalidate_all(&mut self) -> usize {
        self.invalidate_if(|_| true)
    }

    /// Swaps `result` into the entry for `identity`, returning the old one.
    ///
    /// # Errors
    ///
    /// [`StackError::UnknownEntry`] if the stack has no such entry; nothing
    /// is inserted in that case.
    pub fn replace(&mut self, identity: &str, result: RunResult) -> StackResult<RunResult> {
        self.stack
            .get_mut(identity)
            .map(|entry| entry.replace(result))
            .ok_or_else(|| StackError::unknown(identity))
    }

    // ─── Traversal ───────────────────────────────────────────────────────────

    /// Visits every entry in ascending identity order.
    pub fn for_each<F>(&mut self, mut visit: F)
    where
        F: FnMut(Identity, &mut Entry),
    {
        for (&identity, entry) in self.stack.iter_mut() {
            visit(identity, entry);
        }
    }

    /// Iterates entries in ascending identity order.
    pub fn iter(&self) -> impl Iterator<Item = (Identity, &Entry)> {
        self.stack.iter().map(|(&identity, entry)| (identity, entry))
    }

    /// Runs the child `identity` on `event` and caches its result.
    pub fn serve(
        &mut self,
        identity: &str,
        bot: &BoxedBot,
        event: &mut dyn Event,
    ) -> StackResult<RunResult> {
        self.stack
            .get_mut(identity)
            .map(|entry| entry.serve(bot, event))
            .ok_or_else(|| StackError::unknown(identity))
    }

    /// Installs every child not yet installed, in ascending identity order.
    ///
    /// Services a child adopted into this stack during its own install are
    /// merged afterwards and installed in turn. An adopted service whose
    /// identity is already present is dropped; the existing sibling stays.
    pub fn install_all(&mut self, bot: &BoxedBot) {
        let mut adopted = Manager::new();
        for entry in self.stack.values_mut().filter(|e| !e.installed) {
            entry.install(bot, &mut adopted);
        }

        while !adopted.is_empty() {
            let batch = std::mem::take(&mut adopted.stack);
            for (identity, mut entry) in batch {
                if self.stack.contains_key(identity) {
                    debug!(service = identity, "Sibling already present, adoption skipped");
                    continue;
                }
                entry.install(bot, &mut adopted);
                self.stack.insert(identity, entry);
            }
        }
    }

    /// Uninstalls every installed child in ascending identity order.
    pub fn uninstall_all(&mut self, bot: &BoxedBot) {
        for entry in self.stack.values_mut().filter(|e| e.installed) {
            entry.uninstall(bot);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Returns the entry for `identity`.
    pub fn get(&self, identity: &str) -> Option<&Entry> {
        self.stack.get(identity)
    }

    /// Returns the entry for `identity` mutably.
    pub fn get_mut(&mut self, identity: &str) -> Option<&mut Entry> {
        self.stack.get_mut(identity)
    }

    /// Returns the cached result for `identity`.
    pub fn result(&self, identity: &str) -> Option<&RunResult> {
        self.get(identity).map(Entry::last_result)
    }

    /// Returns `true` if an entry exists for `identity`.
    pub fn contains(&self, identity: &str) -> bool {
        self.stack.contains_key(identity)
    }

    /// Returns all identities in traversal order.
    pub fn identities(&self) -> Vec<Identity> {
        self.stack.keys().copied().collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.stack.iter().map(|(id, e)| (id, e.last_result())))
            .finish()
    }
}
