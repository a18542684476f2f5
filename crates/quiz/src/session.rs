use crate::{
    error::{Result, SessionError},
    store::QuestionStore,
};
use model::Question;
use rand::{seq::SliceRandom, Rng};
use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

/// Sub-modes of a session that is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The current question is waiting for a selection.
    AwaitingAnswer,
    /// The current question was answered and feedback is on display.
    AwaitingAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    InProgress(Step),
    Completed,
}

/// How a session picks its questions out of the store and how they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOptions {
    /// Present the questions in a random order.
    pub shuffle: bool,
    /// Only keep the first `limit` questions (after shuffling).
    pub limit: Option<NonZeroUsize>,
    /// Stop on the feedback screen after each answer. When unset, frontends advance right away
    /// and the answers are only revealed in the final review.
    pub feedback: bool,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self { shuffle: false, limit: None, feedback: true }
    }
}

/// Outcome of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback<'q> {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: &'q str,
}

/// What the user chose for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Index of the question in the store.
    pub question: usize,
    pub chosen: usize,
    pub correct: bool,
}

/// Final tally of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    score: usize,
    total: usize,
    elapsed: Duration,
}

impl Summary {
    pub const fn score(&self) -> usize {
        self.score
    }

    pub const fn total(&self) -> usize {
        self.total
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The `(score, total)` pair.
    pub const fn as_pair(&self) -> (usize, usize) {
        (self.score, self.total)
    }

    pub fn percent(&self) -> f64 {
        // Sessions are never empty, so `total` is non-zero.
        self.score as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingAnswer,
    AwaitingAdvance { selected: usize },
    Completed { finished_at: Instant },
}

/// One user's run through a question set.
///
/// The cursor only ever moves forward: each question accepts exactly one submission followed by
/// exactly one [`advance`](Self::advance). Failed calls never modify the session.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Arc<[Question]>,
    /// Indices into `questions` in presentation order. Never empty.
    order: Box<[usize]>,
    current: usize,
    score: usize,
    phase: Phase,
    answers: Vec<AnswerRecord>,
    started_at: Instant,
}

impl QuizSession {
    /// Starts a session over every question in store order.
    pub fn new(store: &QuestionStore) -> Self {
        Self::with_order(store, (0..store.len()).collect())
    }

    /// Starts a session whose order follows `options`.
    pub fn with_options<R>(store: &QuestionStore, options: &QuizOptions, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut order: Vec<_> = (0..store.len()).collect();
        if options.shuffle {
            order.shuffle(rng);
        }
        if let Some(limit) = options.limit {
            order.truncate(limit.get());
        }
        Self::with_order(store, order.into_boxed_slice())
    }

    fn with_order(store: &QuestionStore, order: Box<[usize]>) -> Self {
        debug_assert!(!order.is_empty());
        Self {
            questions: Arc::clone(store.questions()),
            answers: Vec::with_capacity(order.len()),
            order,
            current: 0,
            score: 0,
            phase: Phase::AwaitingAnswer,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> State {
        match self.phase {
            Phase::AwaitingAnswer => State::InProgress(Step::AwaitingAnswer),
            Phase::AwaitingAdvance { .. } => State::InProgress(Step::AwaitingAdvance),
            Phase::Completed { .. } => State::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, Phase::Completed { .. })
    }

    /// Whether the current question has already received its submission.
    pub fn is_answered(&self) -> bool {
        matches!(self.phase, Phase::AwaitingAdvance { .. })
    }

    /// The option chosen for the current question, if one was submitted.
    pub fn selected_option(&self) -> Option<usize> {
        match self.phase {
            Phase::AwaitingAdvance { selected } => Some(selected),
            _ => None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Number of questions in this session.
    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Pairs each submission so far with its question, in the order they were answered.
    pub fn review(&self) -> impl Iterator<Item = (&Question, &AnswerRecord)> + '_ {
        self.answers.iter().map(|record| (&self.questions[record.question], record))
    }

    pub fn current_question(&self) -> Result<&Question> {
        if self.is_completed() {
            return Err(SessionError::SessionAlreadyCompleted);
        }
        Ok(&self.questions[self.order[self.current]])
    }

    pub fn submit_answer(&mut self, option_index: usize) -> Result<Feedback<'_>> {
        match self.phase {
            Phase::AwaitingAnswer => {}
            Phase::AwaitingAdvance { .. } => return Err(SessionError::AnswerAlreadySubmitted),
            Phase::Completed { .. } => return Err(SessionError::SessionAlreadyCompleted),
        }

        let index = self.order[self.current];
        let question = &self.questions[index];
        let options = question.options().len();
        if option_index >= options {
            return Err(SessionError::InvalidOptionIndex { index: option_index, options });
        }

        let correct = question.is_correct(option_index);
        if correct {
            self.score += 1;
        }
        self.answers.push(AnswerRecord { question: index, chosen: option_index, correct });
        self.phase = Phase::AwaitingAdvance { selected: option_index };
        log::debug!("question {} answered with option {option_index} (correct: {correct})", question.id());

        Ok(Feedback { correct, correct_index: question.correct_index(), explanation: question.explanation() })
    }

    pub fn advance(&mut self) -> Result<()> {
        match self.phase {
            Phase::AwaitingAdvance { .. } => {}
            Phase::AwaitingAnswer => return Err(SessionError::AnswerNotYetSubmitted),
            Phase::Completed { .. } => return Err(SessionError::SessionAlreadyCompleted),
        }

        self.current += 1;
        self.phase = if self.current == self.order.len() {
            log::debug!("session completed with {}/{}", self.score, self.order.len());
            Phase::Completed { finished_at: Instant::now() }
        } else {
            Phase::AwaitingAnswer
        };
        Ok(())
    }

    pub fn summary(&self) -> Result<Summary> {
        let Phase::Completed { finished_at } = self.phase else {
            return Err(SessionError::SessionNotYetCompleted);
        };
        Ok(Summary {
            score: self.score,
            total: self.order.len(),
            elapsed: finished_at.saturating_duration_since(self.started_at),
        })
    }

    /// Time spent so far, frozen once the session completes.
    pub fn elapsed(&self) -> Duration {
        match self.phase {
            Phase::Completed { finished_at } => finished_at.saturating_duration_since(self.started_at),
            _ => self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    fn store_of(answers: &[usize]) -> QuestionStore {
        let records: Vec<_> = answers
            .iter()
            .enumerate()
            .map(|(i, &answer)| {
                json!({
                    "id": i,
                    "question": format!("Q{i}"),
                    "options": ["A", "B", "C", "D"],
                    "answer_index": answer,
                    "explanation": format!("E{i}"),
                })
            })
            .collect();
        QuestionStore::load(&json!(records)).unwrap()
    }

    fn two_option_store() -> QuestionStore {
        QuestionStore::load(&json!([{
            "id": 1,
            "question": "Pick B",
            "options": ["A", "B"],
            "answer_index": 1,
            "explanation": "B is the one.",
        }]))
        .unwrap()
    }

    #[test]
    fn starts_at_first_source_question() {
        let store = store_of(&[2, 0, 1]);
        let session = QuizSession::new(&store);
        assert_eq!(session.state(), State::InProgress(Step::AwaitingAnswer));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.selected_option(), None);
        assert_eq!(session.current_question().unwrap(), store.get(0).unwrap());
    }

    #[test]
    fn correct_answer_scores_once() {
        let store = two_option_store();
        let mut session = QuizSession::new(&store);

        let feedback = session.submit_answer(1).unwrap();
        assert!(feedback.correct);
        assert_eq!(feedback.correct_index, 1);
        assert_eq!(feedback.explanation, "B is the one.");
        assert_eq!(session.score(), 1);
        assert!(session.is_answered());
        assert_eq!(session.selected_option(), Some(1));

        session.advance().unwrap();
        assert_eq!(session.state(), State::Completed);
        assert_eq!(session.summary().unwrap().as_pair(), (1, 1));
    }

    #[test]
    fn wrong_answer_keeps_score() {
        let store = two_option_store();
        let mut session = QuizSession::new(&store);

        let feedback = session.submit_answer(0).unwrap();
        assert!(!feedback.correct);
        assert_eq!(session.score(), 0);

        session.advance().unwrap();
        assert_eq!(session.state(), State::Completed);
        let summary = session.summary().unwrap();
        assert_eq!(summary.as_pair(), (0, 1));
        assert_eq!(summary.percent(), 0.0);
    }

    #[test]
    fn invalid_option_leaves_state_untouched() {
        let store = two_option_store();
        let mut session = QuizSession::new(&store);

        assert_eq!(session.submit_answer(5), Err(SessionError::InvalidOptionIndex { index: 5, options: 2 }));
        assert_eq!(session.submit_answer(2), Err(SessionError::InvalidOptionIndex { index: 2, options: 2 }));
        assert_eq!(session.state(), State::InProgress(Step::AwaitingAnswer));
        assert_eq!(session.score(), 0);
        assert!(session.answers().is_empty());

        // Still usable afterwards.
        assert!(session.submit_answer(1).unwrap().correct);
    }

    #[test]
    fn double_submit_is_rejected() {
        let store = store_of(&[0, 0]);
        let mut session = QuizSession::new(&store);

        session.submit_answer(0).unwrap();
        assert_eq!(session.submit_answer(0), Err(SessionError::AnswerAlreadySubmitted));
        assert_eq!(session.submit_answer(1), Err(SessionError::AnswerAlreadySubmitted));
        assert_eq!(session.score(), 1);
        assert_eq!(session.selected_option(), Some(0));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn double_advance_is_rejected() {
        let store = store_of(&[0, 0, 0]);
        let mut session = QuizSession::new(&store);

        assert_eq!(session.advance(), Err(SessionError::AnswerNotYetSubmitted));
        session.submit_answer(3).unwrap();
        session.advance().unwrap();
        assert_eq!(session.advance(), Err(SessionError::AnswerNotYetSubmitted));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.selected_option(), None);
    }

    #[test]
    fn completed_session_rejects_everything_but_summary() {
        let store = two_option_store();
        let mut session = QuizSession::new(&store);
        assert_eq!(session.summary(), Err(SessionError::SessionNotYetCompleted));

        session.submit_answer(1).unwrap();
        assert_eq!(session.summary(), Err(SessionError::SessionNotYetCompleted));
        session.advance().unwrap();

        assert_eq!(session.submit_answer(0), Err(SessionError::SessionAlreadyCompleted));
        assert_eq!(session.advance(), Err(SessionError::SessionAlreadyCompleted));
        assert_eq!(session.current_question(), Err(SessionError::SessionAlreadyCompleted));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.summary().unwrap().as_pair(), (1, 1));
    }

    #[test]
    fn score_tracks_correct_submissions() {
        let answers = [0, 1, 2, 3, 0, 1, 2, 3];
        let store = store_of(&answers);
        for pattern in 0u32..(1 << answers.len()) {
            let mut session = QuizSession::new(&store);
            let mut expected = 0;
            for (i, &answer) in answers.iter().enumerate() {
                let hit = pattern & (1 << i) != 0;
                let choice = if hit { answer } else { (answer + 1) % 4 };
                assert_eq!(session.current_question().unwrap().id(), i as i64);
                assert_eq!(session.submit_answer(choice).unwrap().correct, hit);
                if hit {
                    expected += 1;
                }
                assert_eq!(session.score(), expected);
                assert!(session.score() <= session.current_index() + 1);
                session.advance().unwrap();
                assert!(session.score() <= session.current_index());
            }
            let summary = session.summary().unwrap();
            assert_eq!(summary.as_pair(), (pattern.count_ones() as usize, answers.len()));
            assert!(summary.score() <= summary.total());
        }
    }

    #[test]
    fn review_lists_every_answer() {
        let store = store_of(&[1, 2]);
        let mut session = QuizSession::new(&store);
        session.submit_answer(1).unwrap();
        session.advance().unwrap();
        session.submit_answer(0).unwrap();
        session.advance().unwrap();

        let review: Vec<_> = session.review().map(|(q, record)| (q.text(), record.chosen, record.correct)).collect();
        assert_eq!(review, [("Q0", 1, true), ("Q1", 0, false)]);
        assert_eq!(session.summary().unwrap().elapsed(), session.elapsed());
    }

    #[test]
    fn shuffle_produces_a_permutation() {
        let store = store_of(&[0; 10]);
        let options = QuizOptions { shuffle: true, ..QuizOptions::default() };
        let mut session = QuizSession::with_options(&store, &options, &mut StdRng::seed_from_u64(7));
        assert_eq!(session.total(), 10);

        let mut seen = Vec::new();
        while !session.is_completed() {
            seen.push(session.current_question().unwrap().id());
            session.submit_answer(0).unwrap();
            session.advance().unwrap();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(session.summary().unwrap().as_pair(), (10, 10));
    }

    #[test]
    fn limit_truncates_the_session() {
        let store = store_of(&[0, 1, 2, 3, 0]);
        let options = QuizOptions { limit: NonZeroUsize::new(2), ..QuizOptions::default() };
        let mut session = QuizSession::with_options(&store, &options, &mut StdRng::seed_from_u64(0));
        assert_eq!(session.total(), 2);

        for expected in [0, 1] {
            assert_eq!(session.current_question().unwrap().id(), expected);
            session.submit_answer(0).unwrap();
            session.advance().unwrap();
        }
        assert_eq!(session.summary().unwrap().as_pair(), (1, 2));
    }

    #[test]
    fn oversized_limit_keeps_everything() {
        let store = store_of(&[0, 1]);
        let options = QuizOptions { limit: NonZeroUsize::new(50), ..QuizOptions::default() };
        let session = QuizSession::with_options(&store, &options, &mut StdRng::seed_from_u64(0));
        assert_eq!(session.total(), 2);
    }

    #[test]
    fn sessions_share_questions_but_not_progress() {
        let store = store_of(&[0, 0]);
        let mut first = QuizSession::new(&store);
        let second = QuizSession::new(&store);
        first.submit_answer(0).unwrap();
        first.advance().unwrap();
        assert_eq!(first.current_index(), 1);
        assert_eq!(second.current_index(), 0);
        assert_eq!(second.score(), 0);
    }
}
