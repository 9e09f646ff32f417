//! Fan-out Bot Example
//!
//! A console bot that routes a scripted conversation through a small
//! service tree:
//!
//! ```text
//! RootDispatcher
//! ├── Counter       (hand-written Service, counts every event)
//! ├── Echo          (replies to `/echo <text>`)
//! └── Moderation    (fails when any child flags the message)
//!     ├── BadWords  (masks a word list in place)
//!     └── Shouting  (flags all-caps messages)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package fanout-bot -- --config demos/fanout_bot/arbor.toml --json
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arbor::prelude::*;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Route a scripted conversation through an Arbor service tree")]
struct Args {
    /// Configuration file; searched for in the current directory if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, ...).
    #[arg(short, long)]
    profile: Option<String>,

    /// Print the per-service report as JSON after each event.
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Bot and events
// ============================================================================

/// Writes replies to stdout.
struct ConsoleBot {
    name: String,
}

impl ConsoleBot {
    fn say(&self, text: &str) {
        println!("<{}> {}", self.name, text);
    }
}

impl Bot for ConsoleBot {
    fn id(&self) -> &str {
        &self.name
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn console(bot: &BoxedBot) -> Option<Arc<ConsoleBot>> {
    bot.clone().as_any().downcast::<ConsoleBot>().ok()
}

struct Message {
    user: &'static str,
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

struct Heartbeat;

impl Event for Heartbeat {
    fn event_name(&self) -> &'static str {
        "heartbeat"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Services
// ============================================================================

#[derive(Default)]
struct Counter {
    seen: u64,
}

impl Service for Counter {
    fn identity(&self) -> Identity {
        identity_of::<Self>()
    }

    fn install(&mut self, _: &BoxedBot, _: &mut Manager) {
        self.seen = 0;
    }

    fn uninstall(&mut self, _: &BoxedBot) {
        info!(seen = self.seen, "Counter uninstalled");
    }

    fn serve(&mut self, _: &BoxedBot, _: &mut dyn Event) -> RunResult {
        self.seen += 1;
        RunResult::success().with_payload(self.seen)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct Echo;

impl Behavior for Echo {
    fn on_run(&mut self, bot: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
        let Some(msg) = event.downcast_ref::<Message>() else {
            return RunResult::inert();
        };
        let Some(content) = msg.text.strip_prefix("/echo ") else {
            return RunResult::inert();
        };

        match console(bot) {
            Some(console) => {
                console.say(content);
                RunResult::success().with_payload(content.to_string())
            }
            None => RunResult::failed_with("echo needs a console bot"),
        }
    }
}

#[derive(Default)]
struct BadWords;

const BAD_WORDS: &[&str] = &["darn", "heck"];

impl Behavior for BadWords {
    fn on_run(&mut self, _: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
        let Some(msg) = event.downcast_mut::<Message>() else {
            return RunResult::inert();
        };

        let mut masked = 0usize;
        for word in BAD_WORDS {
            let hits = msg.text.matches(word).count();
            if hits > 0 {
                msg.text = msg.text.replace(word, &"*".repeat(word.len()));
                masked += hits;
            }
        }

        if masked > 0 {
            RunResult::failure().with_payload(masked)
        } else {
            RunResult::success()
        }
    }
}

#[derive(Default)]
struct Shouting;

impl Behavior for Shouting {
    fn on_run(&mut self, _: &BoxedBot, event: &mut dyn Event, _: &mut Manager) -> RunResult {
        let Some(msg) = event.downcast_ref::<Message>() else {
            return RunResult::inert();
        };

        let letters: Vec<char> = msg.text.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.len() > 3 && letters.iter().all(|c| c.is_uppercase()) {
            RunResult::failed_with(format!("{} is shouting", msg.user))
        } else {
            RunResult::success()
        }
    }
}

/// Runs every check and fails if any of them did.
#[derive(Default)]
struct Moderation {
    flagged: u32,
}

impl Behavior for Moderation {
    fn declare_children(&mut self, _parent: &mut Manager, children: &mut Manager) -> ServiceResult {
        children
            .require(identity_of::<BadWords>())?
            .require(identity_of::<Shouting>())?;
        Ok(())
    }

    fn on_unload(&mut self, _: &BoxedBot) -> ServiceResult {
        info!(flagged = self.flagged, "Moderation unloaded");
        Ok(())
    }

    fn on_run(&mut self, bot: &BoxedBot, event: &mut dyn Event, children: &mut Manager) -> RunResult {
        if !event.is::<Message>() {
            return RunResult::inert();
        }

        let mut failed = Vec::new();
        children.for_each(|identity, entry| {
            if entry.serve(bot, &mut *event).is_failure() {
                failed.push(identity);
            }
        });

        if failed.is_empty() {
            return RunResult::success();
        }

        self.flagged += 1;
        if let (Some(console), Some(msg)) = (console(bot), event.downcast_ref::<Message>()) {
            console.say(&format!("{}, please keep it civil: \"{}\"", msg.user, msg.text));
        }
        RunResult::failure().with_payload(failed)
    }
}

register_service!(service Counter);
register_service!(Echo);
register_service!(BadWords);
register_service!(Shouting);
register_service!(Moderation);

// ============================================================================
// Main
// ============================================================================

fn script() -> Vec<Box<dyn Event>> {
    let say = |user, text: &str| -> Box<dyn Event> {
        Box::new(Message {
            user,
            text: text.to_string(),
        })
    };

    vec![
        say("alice", "/echo hello tree"),
        say("bob", "well darn, that heck of a bug"),
        Box::new(Heartbeat),
        say("carol", "WHY IS THE BUILD RED"),
        say("alice", "all good now"),
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ArborRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }

    let bot = Arc::new(ConsoleBot {
        name: "arbor".to_string(),
    });
    let mut runtime = builder.build(bot)?;

    // Without a configured tree, fall back to the full set.
    if runtime.config().services.root.is_empty() {
        runtime
            .add(Box::new(Counter::default()))
            .add_type::<Echo>()
            .add_type::<Moderation>();
    }

    runtime.start()?;

    for mut event in script() {
        if let Some(msg) = event.downcast_ref::<Message>() {
            println!("[{}] {}", msg.user, msg.text);
        }

        runtime.dispatch(event.as_mut())?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&runtime.report())?);
        } else {
            for entry in runtime.report() {
                debug!(service = entry.identity, outcome = entry.outcome, status = entry.status);
            }
        }
    }

    println!("{}", runtime.stats());
    runtime.stop();

    Ok(())
}
