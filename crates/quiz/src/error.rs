use model::question::Invalid;
use std::io;
use thiserror::Error;

/// Why a question file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("syntax error in JSON detected: {0}")]
    Syntax(Box<str>),
    #[error("expected a JSON array of questions")]
    NotAnArray,
    /// A record is missing a field or has a field of the wrong type.
    #[error("{0}")]
    Schema(Box<str>),
    #[error("{0}")]
    Invalid(Invalid),
    #[error("question id {0} appears more than once")]
    DuplicateId(i64),
}

impl From<Invalid> for Malformed {
    fn from(invalid: Invalid) -> Self {
        Self::Invalid(invalid)
    }
}

/// Errors raised while building a [`QuestionStore`](crate::QuestionStore). All of them are fatal
/// to session creation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("the question set is empty")]
    EmptyQuestionSet,
    #[error("malformed question data{}: {reason}", DisplayPosition(.position))]
    MalformedQuestionData {
        /// Zero-based position of the offending record, if the problem is tied to one.
        position: Option<usize>,
        reason: Malformed,
    },
    #[error("failed to read the question file: {0}")]
    Io(#[from] io::Error),
}

impl LoadError {
    pub(crate) fn malformed(position: Option<usize>, reason: impl Into<Malformed>) -> Self {
        Self::MalformedQuestionData { position, reason: reason.into() }
    }
}

struct DisplayPosition<'a>(&'a Option<usize>);

impl core::fmt::Display for DisplayPosition<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self.0 {
            Some(pos) => write!(f, " at record {pos}"),
            None => Ok(()),
        }
    }
}

/// Errors raised by out-of-sequence or invalid [`QuizSession`](crate::QuizSession) calls. None of
/// them alter the session, so the caller may keep using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("option {index} does not exist, the question only has {options} options")]
    InvalidOptionIndex { index: usize, options: usize },
    #[error("an answer has already been submitted for this question")]
    AnswerAlreadySubmitted,
    #[error("submit an answer before moving to the next question")]
    AnswerNotYetSubmitted,
    #[error("the quiz is already over")]
    SessionAlreadyCompleted,
    #[error("the quiz is not over yet")]
    SessionNotYetCompleted,
}

pub type Result<T> = core::result::Result<T, SessionError>;
