//! User input as an injected dependency.
//!
//! The grading session is a cooperative dialogue with the human grader.
//! Everything it asks goes through the [`Prompter`] trait, so the same
//! state machine runs against a real terminal in production and against
//! scripted answers in tests.

use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use util::UtilError;
use util::locator::Chooser;

pub trait Prompter {
    /// Print text for the grader to read.
    fn show(&mut self, text: &str);

    /// Ask for one of `options` (single letters, case-insensitive); an empty
    /// answer picks `default` when one is given.
    fn choose_option(&mut self, options: &[&str], default: Option<&str>, message: &str)
    -> Result<String>;

    /// Ask for an index into `items`.
    fn choose_index(&mut self, items: &[String], title: &str, message: &str) -> Result<usize>;

    /// Block until the grader confirms (ENTER).
    fn wait(&mut self, message: &str) -> Result<()>;
}

/// Production prompter reading from stdin. Invalid answers are re-asked.
#[derive(Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    fn choose_option(
        &mut self,
        options: &[&str],
        default: Option<&str>,
        message: &str,
    ) -> Result<String> {
        let rendered: Vec<String> = options
            .iter()
            .map(|o| {
                if Some(*o) == default {
                    o.to_uppercase()
                } else {
                    o.to_string()
                }
            })
            .collect();

        loop {
            print!("{message} [{}] ", rendered.join(", "));
            std::io::stdout().flush()?;
            let answer = self.read_line()?.to_lowercase();

            if answer.is_empty() {
                if let Some(default) = default {
                    return Ok(default.to_string());
                }
            } else if options.contains(&answer.as_str()) {
                return Ok(answer);
            }
            println!("Invalid choice: {answer}");
        }
    }

    fn choose_index(&mut self, items: &[String], title: &str, message: &str) -> Result<usize> {
        if !title.is_empty() {
            println!("{title}");
        }
        for (index, item) in items.iter().enumerate() {
            println!("{index}:\t{item}");
        }

        loop {
            print!("{message} [0..{}] ", items.len() - 1);
            std::io::stdout().flush()?;
            match self.read_line()?.parse::<usize>() {
                Ok(index) if index < items.len() => return Ok(index),
                Ok(index) => println!("Out of range: {index}"),
                Err(_) => println!("Not a number"),
            }
        }
    }

    fn wait(&mut self, message: &str) -> Result<()> {
        print!("{message}");
        std::io::stdout().flush()?;
        self.read_line()?;
        Ok(())
    }
}

/// Prompter that replays a fixed list of answers. Used by tests; also handy
/// for dry runs.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub shown: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            shown: Vec::new(),
        }
    }

    fn next_answer(&mut self) -> Result<String> {
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("scripted input exhausted"),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    fn choose_option(
        &mut self,
        options: &[&str],
        default: Option<&str>,
        _message: &str,
    ) -> Result<String> {
        let answer = self.next_answer()?.to_lowercase();
        if answer.is_empty() {
            if let Some(default) = default {
                return Ok(default.to_string());
            }
        }
        if !options.contains(&answer.as_str()) {
            bail!("scripted answer '{answer}' is not one of {options:?}");
        }
        Ok(answer)
    }

    fn choose_index(&mut self, items: &[String], _title: &str, _message: &str) -> Result<usize> {
        let index: usize = self.next_answer()?.parse()?;
        if index >= items.len() {
            bail!("scripted index {index} out of range");
        }
        Ok(index)
    }

    fn wait(&mut self, _message: &str) -> Result<()> {
        self.next_answer().map(|_| ())
    }
}

/// Adapter exposing a [`Prompter`] as the locator's disambiguation chooser.
pub struct PrompterChooser<'a>(pub &'a mut dyn Prompter);

impl Chooser for PrompterChooser<'_> {
    fn choose(&mut self, keyword: &str, candidates: &[PathBuf]) -> Result<usize, UtilError> {
        let items: Vec<String> = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        self.0
            .choose_index(
                &items,
                &format!("Multiple results found for '{keyword}':"),
                "Select the correct result:",
            )
            .map_err(|e| UtilError::ChooserFailed(keyword.to_string(), e.to_string()))
    }
}
