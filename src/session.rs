//! Calculator session: the input buffer, its character filter and the
//! history of successful evaluations.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::{ErrorKind, EvalError, convert_last_number_to_percent, evaluate, format_result};

/// The buffer's resting state.
pub const INITIAL_INPUT: &str = "0";
/// Buffer content treated like [`INITIAL_INPUT`] by [`InputBuffer::append`].
pub const ERROR_INPUT: &str = "Error";

lazy_static! {
    /// Characters a keyboard may type into the buffer. Digits are ASCII only.
    /// The letter class is loose: any of `s`, `q`, `r`, `t` passes on its own.
    static ref INPUT_PATTERN: Regex = Regex::new(r"^[0-9.+\-*/^%()sqrt]*$").unwrap();
}

/// Whether `text` only contains characters the input filter allows.
pub fn accepts(text: &str) -> bool {
    INPUT_PATTERN.is_match(text)
}

/// What a caller shows when a submission fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    #[error("division by zero is impossible")]
    DivisionByZero,
    #[error("invalid input for square root")]
    InvalidRoot,
    #[error("computation error: {message}")]
    Computation { message: String },
}

impl From<&EvalError> for Notice {
    fn from(error: &EvalError) -> Self {
        if error.kind() == ErrorKind::DivisionByZero {
            Notice::DivisionByZero
        } else if error.concerns_root() {
            Notice::InvalidRoot
        } else {
            Notice::Computation {
                message: error.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self {
            text: INITIAL_INPUT.to_string(),
        }
    }
}

impl InputBuffer {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Appends a key's text, starting over when the buffer is at rest.
    pub fn append(&mut self, value: &str) {
        if self.text == INITIAL_INPUT || self.text == ERROR_INPUT {
            self.text = value.to_string();
        } else {
            self.text.push_str(value);
        }
    }

    pub fn backspace(&mut self) {
        if self.text.chars().count() > 1 {
            self.text.pop();
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.text = INITIAL_INPUT.to_string();
    }

    /// Replaces the whole buffer, unless `text` fails the input filter.
    pub fn set_text(&mut self, text: &str) -> bool {
        if !accepts(text) {
            debug!(text, "rejected by input filter");
            return false;
        }
        self.text = text.to_string();
        true
    }

    pub fn apply_percent(&mut self) {
        self.text = convert_last_number_to_percent(&self.text);
    }

    fn replace(&mut self, text: String) {
        self.text = text;
    }
}

/// Append-only log of `"<expr> = <result>"` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn push(&mut self, expression: &str, result: &str) {
        self.entries.push(format!("{expression} = {result}"));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order, most recent first.
    pub fn recent_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub input: InputBuffer,
    pub history: History,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the buffer, the `=` key.
    ///
    /// On success the line is logged and the buffer holds the result. On
    /// failure neither the buffer nor the history change.
    pub fn submit(&mut self) -> Result<f64, Notice> {
        let expression = self.input.as_str().to_string();
        match evaluate(&expression) {
            Ok(value) => {
                let result = format_result(value);
                info!(%expression, %result, "submitted");
                self.history.push(&expression, &result);
                self.input.replace(result);
                Ok(value)
            }
            Err(e) => {
                let notice = Notice::from(&e);
                debug!(%expression, %notice, "submission failed");
                Err(notice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_filter() {
        assert!(accepts("sqrt(2)+3.5%"));
        assert!(accepts(""));
        assert!(accepts("tsqr"));
        assert!(!accepts("2 + 2"));
        assert!(!accepts("x"));
        assert!(!accepts("2e5"));
        assert!(!accepts("١"));
        assert!(!accepts("١+١"));
    }

    #[test]
    fn non_ascii_digits_never_reach_the_buffer() {
        let mut input = InputBuffer::default();
        assert!(!input.set_text("١+١"));
        assert_eq!(input.as_str(), "0");
    }

    #[test]
    fn append_restarts_resting_buffer() {
        let mut input = InputBuffer::default();
        assert_eq!(input.as_str(), "0");
        input.append("7");
        input.append("+");
        input.append("0");
        assert_eq!(input.as_str(), "7+0");

        input.replace(ERROR_INPUT.to_string());
        input.append("3");
        assert_eq!(input.as_str(), "3");
    }

    #[test]
    fn backspace_and_clear() {
        let mut input = InputBuffer::default();
        input.append("12");
        input.backspace();
        assert_eq!(input.as_str(), "1");
        input.backspace();
        assert_eq!(input.as_str(), "0");
        input.append("√");
        input.backspace();
        assert_eq!(input.as_str(), "0");
        input.append("9");
        input.clear();
        assert_eq!(input.as_str(), "0");
    }

    #[test]
    fn set_text_respects_filter() {
        let mut input = InputBuffer::default();
        assert!(input.set_text("1+1"));
        assert!(!input.set_text("1+a"));
        assert_eq!(input.as_str(), "1+1");
    }

    #[test]
    fn submit_records_history() {
        let mut session = Session::new();
        session.input.append("2+3*4");
        assert_eq!(session.submit(), Ok(14.0));
        assert_eq!(session.input.as_str(), "14");

        session.input.append("/4");
        assert_eq!(session.submit(), Ok(3.5));

        let lines: Vec<_> = session.history.recent_first().collect();
        assert_eq!(lines, vec!["14/4 = 3.5", "2+3*4 = 14"]);
    }

    #[test]
    fn failed_submit_changes_nothing() {
        let mut session = Session::new();
        session.input.append("10/0");
        assert_eq!(session.submit(), Err(Notice::DivisionByZero));
        assert_eq!(session.input.as_str(), "10/0");
        assert!(session.history.is_empty());
    }

    #[test]
    fn notices() {
        let notice = |input: &str| Notice::from(&evaluate(input).unwrap_err());
        assert_eq!(notice("1/0"), Notice::DivisionByZero);
        assert_eq!(notice("sqrt(-4)"), Notice::InvalidRoot);
        assert_eq!(notice("sqrt(4"), Notice::InvalidRoot);
        assert_eq!(
            notice("3+(2"),
            Notice::Computation {
                message: "unclosed `(`".to_string()
            }
        );
        assert_eq!(
            Notice::InvalidRoot.to_string(),
            "invalid input for square root"
        );
    }

    #[test]
    fn percent_key() {
        let mut session = Session::new();
        session.input.append("200+10");
        session.input.apply_percent();
        assert_eq!(session.input.as_str(), "200+0.1");
        assert_eq!(session.submit(), Ok(200.1));
    }
}
