use std::collections::VecDeque;
use std::io::{BufRead, Write};

use miette::{miette, Context, IntoDiagnostic, Result};


/// Line-oriented channel to the human operating the submitter.
pub trait OperatorConsole {
    fn show(&mut self, line: &str);

    /// Asks a question and returns the answer without the trailing newline.
    fn prompt(&mut self, question: &str) -> Result<String>;
}


/// Reads answers from stdin and writes to stdout.
#[derive(Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl OperatorConsole for TerminalConsole {
    fn show(&mut self, line: &str) {
        println!("{line}");
    }

    fn prompt(&mut self, question: &str) -> Result<String> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{question}")
            .and_then(|_| stdout.flush())
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not write prompt."))?;

        let mut answer = String::new();
        let bytes_read = std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not read operator input."))?;

        if bytes_read == 0 {
            return Err(miette!("Operator input was closed."));
        }

        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}


/// Replays prepared answers; runs out with an error instead of blocking.
#[derive(Default, Debug)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedConsole {
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

    /// Everything shown or asked so far, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn remaining_answers(&self) -> usize {
        self.answers.len()
    }
}

impl OperatorConsole for ScriptedConsole {
    fn show(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn prompt(&mut self, question: &str) -> Result<String> {
        self.transcript.push(question.to_string());

        self.answers
            .pop_front()
            .ok_or_else(|| miette!("No scripted answer left for prompt {:?}.", question))
    }
}
