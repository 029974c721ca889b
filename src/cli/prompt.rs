//! Operator prompts.
//!
//! Every question the pipeline asks goes through the `Prompter` trait so the
//! non-interactive mode (`-y`) and the tests can answer without a terminal.

use crate::error::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tracing::info;

/// Asks the operator yes/no questions and free-text questions with a default.
pub trait Prompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    fn input(&self, prompt: &str, default: &str) -> Result<String>;

    /// Whether answers come from a person. Non-interactive prompters always return defaults.
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Prompts on the controlling terminal using `dialoguer`.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(answer)
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default.to_string())
            .allow_empty(true)
            .interact_text()?;
        let answer = answer.trim();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }
}

/// Answers every question with its default (`-y`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnswers;

impl Prompter for DefaultAnswers {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        info!("{} -> {}", prompt, if default { "yes" } else { "no" });
        Ok(default)
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String> {
        info!("{} -> {}", prompt, default);
        Ok(default.to_string())
    }

    fn is_interactive(&self) -> bool {
        false
    }
}
