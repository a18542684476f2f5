use crate::error::{LoadError, Malformed};
use model::{Question, RawQuestion};
use serde::Deserialize;
use serde_json::{error::Category, Value};
use std::{collections::HashSet, fs, path::Path, sync::Arc};

/// The immutable, ordered, non-empty set of questions shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStore {
    questions: Arc<[Question]>,
}

impl QuestionStore {
    /// Validates an array of question records while preserving their order.
    pub fn load(source: &Value) -> Result<Self, LoadError> {
        let records = source.as_array().ok_or_else(|| LoadError::malformed(None, Malformed::NotAnArray))?;
        if records.is_empty() {
            return Err(LoadError::EmptyQuestionSet);
        }

        let mut ids = HashSet::with_capacity(records.len());
        let mut questions = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let raw = RawQuestion::deserialize(record)
                .map_err(|err| LoadError::malformed(Some(position), Malformed::Schema(err.to_string().into())))?;
            if !ids.insert(raw.id) {
                return Err(LoadError::malformed(Some(position), Malformed::DuplicateId(raw.id)));
            }
            let question = Question::try_from(raw).map_err(|err| LoadError::malformed(Some(position), err))?;
            questions.push(question);
        }

        log::debug!("validated {} question records", questions.len());
        Ok(Self { questions: questions.into() })
    }

    /// Parses JSON text and then [`load`](Self::load)s it.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|err| {
            let reason = match err.classify() {
                Category::Syntax | Category::Eof => Malformed::Syntax(err.to_string().into()),
                _ => Malformed::Schema(err.to_string().into()),
            };
            LoadError::malformed(None, reason)
        })?;
        Self::load(&value)
    }

    /// Reads the question file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_slice(&bytes)
    }

    pub fn questions(&self) -> &Arc<[Question]> {
        &self.questions
    }

    /// Never zero.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn get(&self, position: usize) -> Option<&Question> {
        self.questions.get(position)
    }
}
