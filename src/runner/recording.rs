// file: src/runner/recording.rs
// version: 1.0.0
// guid: f146bff8-b972-4a3b-82fd-3b8e8e01c662

//! In-process runner that records invocations and replays canned output

use super::{CommandRunner, Invocation, InvocationKind, ProcessOutput};
use crate::error::{CoreUpdateError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Matcher = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

struct Rule {
    matches: Matcher,
    output: ProcessOutput,
}

#[derive(Default)]
struct State {
    calls: Vec<Invocation>,
    rules: Vec<Rule>,
    unavailable: Vec<String>,
    fallback: ProcessOutput,
}

/// Runner that never spawns a process
///
/// Rules are checked in insertion order and the first match wins. Calls that match no
/// rule get the fallback output, which is a silent success unless overridden. Clones
/// share the same state, so a test can keep one handle while a session owns another.
#[derive(Clone)]
pub struct RecordingRunner {
    state: Arc<Mutex<State>>,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                fallback: ProcessOutput::ok(""),
                ..State::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panicking test thread must not hide the calls recorded so far
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reply with `output` to invocations matching `predicate`
    pub fn respond_when<F>(self, predicate: F, output: ProcessOutput) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        self.lock().rules.push(Rule {
            matches: Box::new(predicate),
            output,
        });
        self
    }

    /// Reply with `output` to every invocation of `kind`
    pub fn respond(self, kind: InvocationKind, output: ProcessOutput) -> Self {
        self.respond_when(move |inv| inv.kind() == kind, output)
    }

    /// Treat `program` as missing from the machine
    pub fn unavailable(self, program: impl Into<String>) -> Self {
        self.lock().unavailable.push(program.into());
        self
    }

    /// Output for invocations no rule matches
    pub fn otherwise(self, output: ProcessOutput) -> Self {
        self.lock().fallback = output;
        self
    }

    /// Every invocation received so far, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.lock().calls.clone()
    }

    /// Invocations of the given kind, in order
    pub fn calls_of(&self, kind: InvocationKind) -> Vec<Invocation> {
        self.lock()
            .calls
            .iter()
            .filter(|inv| inv.kind() == kind)
            .cloned()
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let mut state = self.lock();
        state.calls.push(invocation.clone());
        debug!("Recorded: {}", invocation.display());

        if state
            .unavailable
            .iter()
            .any(|program| program.eq_ignore_ascii_case(invocation.program()))
        {
            return Err(CoreUpdateError::tool_unavailable(
                invocation.program(),
                "not installed in this test",
            ));
        }

        let output = state
            .rules
            .iter()
            .find(|rule| (rule.matches)(invocation))
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| state.fallback.clone());
        Ok(output)
    }
}
