//! Interactive decisions, injected so the core never touches a terminal.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Asks the user to pick among options or to confirm an action.
pub trait Chooser {
    /// Index of the chosen option, or `None` if the user declined.
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize>;

    /// Whether the user agreed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Non-interactive chooser: confirms everything and picks the first option.
///
/// Used for `--yes` and whenever stdin is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoChooser;

impl Chooser for AutoChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize> {
        tracing::debug!(prompt, options = options.len(), "auto-choosing first option");
        if options.is_empty() { None } else { Some(0) }
    }

    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, "auto-confirming");
        true
    }
}

/// Chooser answering from pre-recorded responses, for tests.
///
/// Once the script runs out, choices return `None` and confirmations `false`.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    choices: RefCell<VecDeque<Option<usize>>>,
    confirms: RefCell<VecDeque<bool>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedChooser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choices(self, choices: impl IntoIterator<Item = Option<usize>>) -> Self {
        self.choices.borrow_mut().extend(choices);
        self
    }

    pub fn with_confirms(self, confirms: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.borrow_mut().extend(confirms);
        self
    }

    /// Every prompt shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.choices
            .borrow_mut()
            .pop_front()
            .flatten()
            .filter(|&i| i < options.len())
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.confirms.borrow_mut().pop_front().unwrap_or(false)
    }
}
