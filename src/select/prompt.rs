//! Operator input.
//!
//! `LinePrompter` reads answers line by line: free text for a query, a number
//! (or the exact label) for a menu choice. Invalid menu answers are asked
//! again; end of input is an error.

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

pub trait Prompter {
    /// Ask for one line of free text.
    fn input(&mut self, message: &str) -> Result<String>;

    /// Ask for one of `choices`; returns its index.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize>;
}

pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(Error::Prompt(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            )));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn input(&mut self, message: &str) -> Result<String> {
        write!(self.writer, "{message} ")?;
        self.writer.flush()?;
        self.read_line()
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize> {
        if choices.is_empty() {
            return Err(Error::Prompt(io::Error::new(
                io::ErrorKind::InvalidInput,
                "nothing to choose from",
            )));
        }

        writeln!(self.writer, "{message}")?;
        for (i, label) in choices.iter().enumerate() {
            writeln!(self.writer, "  [{}] {}", i + 1, label)?;
        }

        loop {
            write!(self.writer, "Enter number (1-{}): ", choices.len())?;
            self.writer.flush()?;
            let answer = self.read_line()?;

            if let Ok(n) = answer.parse::<usize>()
                && (1..=choices.len()).contains(&n)
            {
                return Ok(n - 1);
            }
            if let Some(idx) = choices.iter().position(|c| c.eq_ignore_ascii_case(&answer)) {
                return Ok(idx);
            }
            writeln!(self.writer, "  (invalid selection)")?;
        }
    }
}

/// Replays canned answers; records every prompt shown.
#[cfg(test)]
pub struct ScriptedPrompter {
    inputs: std::collections::VecDeque<String>,
    selections: std::collections::VecDeque<usize>,
    pub asked: Vec<String>,
    pub offered: Vec<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<S: Into<String>>(
        inputs: impl IntoIterator<Item = S>,
        selections: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            selections: selections.into_iter().collect(),
            asked: Vec::new(),
            offered: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn input(&mut self, message: &str) -> Result<String> {
        self.asked.push(message.to_string());
        self.inputs
            .pop_front()
            .ok_or_else(|| Error::Prompt(io::Error::new(io::ErrorKind::UnexpectedEof, "no input")))
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize> {
        self.asked.push(message.to_string());
        self.offered.push(choices.to_vec());
        self.selections
            .pop_front()
            .ok_or_else(|| Error::Prompt(io::Error::new(io::ErrorKind::UnexpectedEof, "no selection")))
    }
}
