//! End-to-end behaviour of statically registered service trees.

use std::any::Any;
use std::sync::Arc;

use arbor_core::prelude::*;
use arbor_core::{RegistryError, ServiceType, global, register_service};

struct TestBot;

impl Bot for TestBot {
    fn id(&self) -> &str {
        "tree-test"
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct Message {
    text: String,
}

impl Event for Message {
    fn event_name(&self) -> &'static str {
        "message"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─── Leaves ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Length;

impl Behavior for Length {
    fn on_run(&mut self, _: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
        match event.downcast_ref::<Message>() {
            Some(msg) => RunResult::success().with_payload(msg.text.len()),
            None => RunResult::inert(),
        }
    }
}

#[derive(Default)]
struct Shout;

impl Behavior for Shout {
    fn on_run(&mut self, _: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
        match event.downcast_mut::<Message>() {
            Some(msg) if !msg.text.is_empty() => {
                msg.text = msg.text.to_uppercase();
                RunResult::success()
            }
            Some(_) => RunResult::failed_with("empty message"),
            None => RunResult::inert(),
        }
    }
}

// ─── Interior node ───────────────────────────────────────────────────────────

/// Requires its children by identity and reports how many succeeded.
#[derive(Default)]
struct Pipeline;

impl Behavior for Pipeline {
    fn declare_children(&mut self, _parent: &mut Manager, children: &mut Manager) -> ServiceResult {
        children
            .require(identity_of::<Length>())?
            .require(identity_of::<Shout>())?;
        Ok(())
    }

    fn on_run(&mut self, bot: &BoxedBot, event: &mut dyn Event, children: &mut Manager) -> RunResult {
        let mut succeeded = 0;
        children.for_each(|_, entry| {
            if entry.serve(bot, &mut *event).is_success() {
                succeeded += 1;
            }
        });
        if succeeded == children.len() {
            RunResult::success().with_payload(succeeded)
        } else {
            RunResult::failure().with_payload(succeeded)
        }
    }
}

register_service!(Length);
register_service!(Shout);
register_service!(Pipeline);

// ─── Hand-written service ────────────────────────────────────────────────────

#[derive(Default)]
struct Ticker {
    ticks: u32,
}

impl Service for Ticker {
    fn identity(&self) -> Identity {
        identity_of::<Self>()
    }

    fn install(&mut self, _: &BoxedBot, _: &mut Manager) {}

    fn uninstall(&mut self, _: &BoxedBot) {}

    fn serve(&mut self, _: &BoxedBot, _: &mut dyn Event) -> RunResult {
        self.ticks += 1;
        RunResult::with_code(self.ticks as i32)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

register_service!(service Ticker);

fn bot() -> BoxedBot {
    Arc::new(TestBot)
}

#[test]
fn static_declarations_are_collected() {
    let registry = ServiceRegistry::collect_all();

    for identity in [
        identity_of::<Length>(),
        identity_of::<Shout>(),
        identity_of::<Pipeline>(),
        identity_of::<Ticker>(),
    ] {
        assert!(registry.contains(identity), "missing {identity}");
        assert!(global().read().contains(identity));
    }

    let ty = ServiceType::of::<Length>();
    assert_eq!((ty.identity)(), identity_of::<Length>());
}

#[test]
fn unknown_identity_is_an_error() {
    let registry = ServiceRegistry::collect_all();
    let err = registry.create("NoSuchService").err();
    assert_eq!(err, Some(RegistryError::unknown("NoSuchService")));
}

#[test]
fn nested_tree_caches_one_level_up() {
    let bot = bot();
    let mut root = RootDispatcher::root();
    root.require_from(&ServiceRegistry::collect_all(), identity_of::<Pipeline>())
        .unwrap()
        .add(Box::new(Ticker::default()));
    root.start(&bot);

    let mut event = Message {
        text: String::from("hello"),
    };
    assert!(root.dispatch(&bot, &mut event).is_inert());
    assert_eq!(event.text, "HELLO");

    // The pipeline's own result lives in the root's stack.
    let top = root.children();
    let pipeline_result = top.result(identity_of::<Pipeline>()).unwrap();
    assert!(pipeline_result.is_success());
    assert_eq!(pipeline_result.as_value::<usize>(), Some(2));
    assert_eq!(top.result(identity_of::<Ticker>()).unwrap().status(), 1);

    // The leaves' results live in the pipeline's stack.
    let pipeline = top
        .get(identity_of::<Pipeline>())
        .and_then(|e| e.service().downcast_ref::<Composable<Pipeline>>())
        .unwrap();
    let leaves = pipeline.children();
    assert_eq!(leaves.result(identity_of::<Length>()).unwrap().as_value::<usize>(), Some(5));
    assert!(leaves.result(identity_of::<Shout>()).unwrap().is_success());
    assert!(!leaves.contains(identity_of::<Pipeline>()));

    root.stop(&bot);
}

#[test]
fn failing_child_degrades_gracefully() {
    let bot = bot();
    let mut root = RootDispatcher::root();
    root.add_type::<Pipeline>().add(Box::new(Ticker::default()));
    root.start(&bot);

    let mut empty = Message {
        text: String::new(),
    };
    root.dispatch(&bot, &mut empty);
    root.dispatch(&bot, &mut empty);

    let top = root.children();
    let pipeline_result = top.result(identity_of::<Pipeline>()).unwrap();
    assert!(pipeline_result.is_failure());
    assert_eq!(pipeline_result.as_value::<usize>(), Some(1));
    // Ticker still ran on both dispatches.
    assert_eq!(top.result(identity_of::<Ticker>()).unwrap().status(), 2);

    let count = root.children_mut().invalidate_all();
    assert_eq!(count, 2);
    assert!(root.children().iter().all(|(_, e)| e.last_result().is_inert()));
}
