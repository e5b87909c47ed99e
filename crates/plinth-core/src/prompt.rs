//! Prompt collaborator
//!
//! The core never talks to a terminal directly. Every question goes through a
//! [`Prompter`], so the interactive cliclack front-end and unattended runs share
//! the same code paths.

use anyhow::Result;

/// One selectable option in a `select` or `multiselect` prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub hint: String,
    /// Pre-selected in multiselect prompts
    pub selected: bool,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            hint: String::new(),
            selected: false,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// Presents enumerated choices and returns what the user picked
pub trait Prompter: Send + Sync {
    /// Whether a human is answering. Non-interactive prompters make the core
    /// pick defaults instead of asking.
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Returns the `value` of the chosen entry
    fn select(&self, message: &str, choices: &[Choice]) -> Result<String>;

    /// Returns the `value`s of every chosen entry, in choice order
    fn multiselect(&self, message: &str, choices: &[Choice]) -> Result<Vec<String>>;

    fn input(&self, message: &str, default: &str) -> Result<String>;
}

/// Answers every prompt with its default, for `--yes` and scripted runs
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl Prompter for Unattended {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
        Ok(default)
    }

    fn select(&self, message: &str, choices: &[Choice]) -> Result<String> {
        choices
            .first()
            .map(|c| c.value.clone())
            .ok_or_else(|| anyhow::anyhow!("No choices offered for \"{}\"", message))
    }

    fn multiselect(&self, _message: &str, choices: &[Choice]) -> Result<Vec<String>> {
        Ok(choices
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.value.clone())
            .collect())
    }

    fn input(&self, _message: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! Prompter replaying canned answers, shared by unit tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Scripted {
        answers: Mutex<VecDeque<String>>,
        pub asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                asked: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, message: &str) -> Result<String> {
            self.asked.lock().unwrap().push(message.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("unexpected prompt: {}", message))
        }

        pub fn asked_count(&self) -> usize {
            self.asked.lock().unwrap().len()
        }
    }

    impl Prompter for Scripted {
        fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
            Ok(self.next(message)? == "yes")
        }

        fn select(&self, message: &str, _choices: &[Choice]) -> Result<String> {
            self.next(message)
        }

        fn multiselect(&self, message: &str, _choices: &[Choice]) -> Result<Vec<String>> {
            let answer = self.next(message)?;
            Ok(answer
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn input(&self, message: &str, _default: &str) -> Result<String> {
            self.next(message)
        }
    }
}
