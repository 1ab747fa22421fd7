//! Blocking operator decisions, injected so batch runs can be driven without a console.

use std::io::{BufRead, Write};

use tracing::warn;

pub trait Prompt {
    /// Asked at each batch checkpoint while work remains.
    fn continue_batch(&mut self, done: usize, total: usize, next_batch: usize) -> bool;

    fn select_book(&mut self, choices: &[String]) -> Option<usize>;

    /// How many of `remaining` images a backfill run should attempt.
    fn backfill_limit(&mut self, remaining: usize) -> usize;
}

/// Non-interactive embedding: always continue, select and limit programmatically.
#[derive(Debug, Clone, Default)]
pub struct AutoPrompt {
    pub selection: Option<usize>,
    pub limit: Option<usize>,
}

impl Prompt for AutoPrompt {
    fn continue_batch(&mut self, _done: usize, _total: usize, _next_batch: usize) -> bool {
        true
    }

    fn select_book(&mut self, choices: &[String]) -> Option<usize> {
        self.selection.filter(|index| *index < choices.len())
    }

    fn backfill_limit(&mut self, remaining: usize) -> usize {
        self.limit.unwrap_or(remaining).min(remaining)
    }
}

pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
    fallback_limit: usize,
    preset_limit: Option<usize>,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W, fallback_limit: usize) -> Self {
        Self {
            input,
            output,
            fallback_limit,
            preset_limit: None,
        }
    }

    /// Answers the backfill count without asking.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.preset_limit = limit;
        self
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        if write!(self.output, "{question}")
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return None;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(err) => {
                warn!(error = %err, "failed to read operator input");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompt for ConsolePrompt<R, W> {
    fn continue_batch(&mut self, done: usize, total: usize, next_batch: usize) -> bool {
        let question = format!(
            "\nBatch complete ({done}/{total}). Continue? (Enter for next {next_batch}, or 'stop'): "
        );
        self.ask(&question)
            .map(|answer| parse_continue(&answer))
            .unwrap_or(false)
    }

    fn select_book(&mut self, choices: &[String]) -> Option<usize> {
        let listed = choices
            .iter()
            .enumerate()
            .try_for_each(|(index, choice)| writeln!(self.output, "[{index}] {choice}"));
        if let Err(err) = listed {
            warn!(error = %err, "failed to list choices");
            return None;
        }
        let answer = self.ask("\nEnter the number of the book (or 'q' to quit): ")?;
        let selection = parse_selection(&answer, choices.len());
        if selection.is_none() && !is_quit(&answer) {
            warn!(input = %answer, "invalid selection");
        }
        selection
    }

    fn backfill_limit(&mut self, remaining: usize) -> usize {
        if let Some(limit) = self.preset_limit {
            return limit.min(remaining);
        }
        let question = format!("\n{remaining} images remaining. How many to process? (number or 'all'): ");
        let answer = self.ask(&question).unwrap_or_default();
        parse_limit(&answer, remaining, self.fallback_limit)
    }
}

fn is_quit(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "q" | "stop")
}

pub fn parse_continue(answer: &str) -> bool {
    !is_quit(answer.trim())
}

pub fn parse_selection(answer: &str, choice_count: usize) -> Option<usize> {
    let answer = answer.trim();
    if is_quit(answer) {
        return None;
    }
    answer
        .parse::<usize>()
        .ok()
        .filter(|index| *index < choice_count)
}

/// `all` takes everything; an integer is capped at `remaining`; anything else uses the fallback.
pub fn parse_limit(answer: &str, remaining: usize, fallback: usize) -> usize {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("all") {
        return remaining;
    }
    match answer.parse::<usize>() {
        Ok(count) => count.min(remaining),
        Err(_) => {
            if !answer.is_empty() {
                warn!(input = %answer, fallback, "invalid count; using fallback limit");
            }
            fallback.min(remaining)
        }
    }
}
