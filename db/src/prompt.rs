//! Operator interaction.
//!
//! The reconciler asks a [`Confirm`] before each DDL statement and the
//! component cache asks a [`Prompt`] when the database and the local
//! component file disagree. [`ConsolePrompt`] implements both over
//! stdin/stderr.

use std::io::{self, BufRead, Write};

use crate::reconcile::Confirm;

/// Free-text question answered by an operator.
pub trait Prompt {
    /// Asks `question` and returns the answer without its line ending, or
    /// `None` when no answer can be obtained (closed input).
    fn ask(&mut self, question: &str) -> Option<String>;
}

/// Prompts on stderr and reads answers from any line source, stdin by
/// default.
pub struct ConsolePrompt<R = io::StdinLock<'static>> {
    input: R,
}

impl ConsolePrompt {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> ConsolePrompt<R> {
    pub fn from_reader(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Prompt for ConsolePrompt<R> {
    fn ask(&mut self, question: &str) -> Option<String> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} ").ok()?;
        stderr.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl<R: BufRead> Confirm for ConsolePrompt<R> {
    /// Only an exact `y` accepts.
    fn confirm(&mut self, description: &str) -> bool {
        self.ask(&format!("{description}? [y/N]"))
            .is_some_and(|answer| answer.trim() == "y")
    }
}
