use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display};
use serde::Deserialize;

/// Acceptable schema for a question record in the data file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawQuestion {
    /// Identifier that must be unique across the whole file.
    pub id: i64,
    /// Prompt to be displayed above the choices.
    pub question: String,
    /// Possible answers to select from, in display order.
    pub options: Vec<String>,
    /// Index of the option with the correct answer.
    pub answer_index: usize,
    /// Shown after the user has answered. May be empty.
    pub explanation: String,
    /// Optional snippet rendered verbatim under the prompt.
    #[serde(default)]
    pub code: Option<String>,
}

/// Reasons a single record cannot become a [`Question`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalid {
    TooFewOptions { len: usize },
    AnswerOutOfRange { index: usize, len: usize },
}

impl Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TooFewOptions { len } => write!(f, "expected at least two options but found {len}"),
            Self::AnswerOutOfRange { index, len } => {
                write!(f, "answer index {index} is out of range for {len} options")
            }
        }
    }
}

/// A validated quiz item. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: i64,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
    code: Option<String>,
}

impl Question {
    pub const MIN_OPTIONS: usize = 2;

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub const fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_option(&self) -> &str {
        // Construction guarantees the index is in bounds.
        &self.options[self.correct_index]
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }
}

impl TryFrom<RawQuestion> for Question {
    type Error = Invalid;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let RawQuestion { id, question, options, answer_index, explanation, code } = raw;
        let len = options.len();
        if len < Self::MIN_OPTIONS {
            return Err(Invalid::TooFewOptions { len });
        }
        if answer_index >= len {
            return Err(Invalid::AnswerOutOfRange { index: answer_index, len });
        }
        Ok(Self { id, text: question, options, correct_index: answer_index, explanation, code })
    }
}
