//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based selection and confirmation.

use std::io::IsTerminal;

use dialoguer::{Confirm, Select};
use yard_core::{AutoChooser, Chooser};

/// Chooser that asks on the terminal.
pub struct TerminalChooser;

impl Chooser for TerminalChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        match Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact_opt()
        {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "prompt failed, nothing chosen");
                None
            }
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "prompt failed, treating as no");
                false
            }
        }
    }
}

/// Chooser for this invocation: the terminal when someone is there to answer.
pub fn chooser(assume_yes: bool) -> Box<dyn Chooser> {
    if assume_yes || !std::io::stdin().is_terminal() {
        Box::new(AutoChooser)
    } else {
        Box::new(TerminalChooser)
    }
}
