// file: src/present/scripted.rs
// version: 1.0.0
// guid: af95b43c-622a-4d35-ba9f-044cbf86cdf2

//! Prompter that replays canned answers

use super::Prompter;
use crate::error::Result;
use std::collections::VecDeque;

/// Answers questions from a fixed queue and records everything shown
///
/// Once the queue is empty every question reads as closed input.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Lines shown and questions asked, in order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn show(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        let answer = self.answers.pop_front();
        self.transcript.push(format!(
            "{}{}",
            question,
            answer.as_deref().unwrap_or("<eof>")
        ));
        Ok(answer)
    }
}
