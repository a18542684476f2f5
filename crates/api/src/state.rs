use model::Question;
use quiz::{QuizSession, SessionError};
use serde::Serialize;

/// Public view of a question. The correct index stays hidden until the question is answered.
#[derive(Serialize)]
pub struct QuestionView<'a> {
    pub id: i64,
    pub text: &'a str,
    pub options: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
}

impl<'a> From<&'a Question> for QuestionView<'a> {
    fn from(question: &'a Question) -> Self {
        Self { id: question.id(), text: question.text(), options: question.options(), code: question.code() }
    }
}

/// JSON snapshot of a visitor's progress, served at `/api/state`.
#[derive(Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StateView<'a> {
    /// No session has been started yet.
    Idle { total: usize },
    AwaitingAnswer { position: usize, total: usize, score: usize, question: QuestionView<'a> },
    AwaitingAdvance {
        position: usize,
        total: usize,
        score: usize,
        question: QuestionView<'a>,
        selected: usize,
        correct: bool,
        correct_index: usize,
        explanation: &'a str,
    },
    Completed { score: usize, total: usize, percent: f64, elapsed_secs: f64 },
}

impl<'a> StateView<'a> {
    pub fn of(session: &'a QuizSession) -> Result<Self, SessionError> {
        if session.is_completed() {
            let summary = session.summary()?;
            return Ok(Self::Completed {
                score: summary.score(),
                total: summary.total(),
                percent: summary.percent(),
                elapsed_secs: summary.elapsed().as_secs_f64(),
            });
        }

        let question = session.current_question()?;
        let position = session.current_index();
        let total = session.total();
        let score = session.score();
        Ok(match session.selected_option() {
            Some(selected) => Self::AwaitingAdvance {
                position,
                total,
                score,
                question: question.into(),
                selected,
                correct: question.is_correct(selected),
                correct_index: question.correct_index(),
                explanation: question.explanation(),
            },
            None => Self::AwaitingAnswer { position, total, score, question: question.into() },
        })
    }
}
