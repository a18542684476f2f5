pub mod error;
pub mod session;
pub mod store;

pub use error::{LoadError, SessionError};
pub use model::Question;
pub use session::{AnswerRecord, Feedback, QuizOptions, QuizSession, State, Step, Summary};
pub use store::QuestionStore;
