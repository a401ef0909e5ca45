//! Human confirmation gate.
//!
//! Two steps of the ledger workflow stop and ask the operator before doing
//! anything: saving a month that re-opens a plate already open in another
//! month, and creating a cross-month finalization row. The
//! [`ConfirmGate`] trait abstracts the prompt so the logic stays
//! synchronous and testable -- a dialog box, a terminal prompt, or a
//! scripted fake.

use std::collections::VecDeque;

/// A yes/no prompt answered by the operator.
pub trait ConfirmGate {
    /// Present `message` and block until the operator answers.
    ///
    /// Returns `true` only on an explicit "yes".
    fn confirm(&mut self, message: &str) -> bool;
}

/// A gate that answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedGate {
    answer: bool,
}

impl FixedGate {
    /// A gate that always says yes.
    pub const fn accept() -> Self {
        Self { answer: true }
    }

    /// A gate that always says no.
    pub const fn decline() -> Self {
        Self { answer: false }
    }
}

impl ConfirmGate for FixedGate {
    fn confirm(&mut self, message: &str) -> bool {
        tracing::debug!(answer = self.answer, message, "fixed confirmation");
        self.answer
    }
}

/// A gate that replays a scripted list of answers and records every
/// prompt it was shown.
///
/// Once the script runs out every further prompt is declined.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGate {
    answers: VecDeque<bool>,
    prompts: Vec<String>,
}

impl ScriptedGate {
    /// Create a gate that answers with `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    /// Every prompt shown so far, oldest first.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl ConfirmGate for ScriptedGate {
    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_owned());
        self.answers.pop_front().unwrap_or(false)
    }
}
