use crate::util::session::SessionId;
use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use dashmap::DashMap;
use quiz::{QuestionStore, QuizOptions, QuizSession};
use std::time::Instant;

/// Bounds on how many sessions the lobby keeps alive and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Sessions untouched for this long are discarded.
    pub idle: Duration,
    /// Once reached, starting a session evicts the least recently used one.
    pub capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { idle: Duration::from_secs(30 * 60), capacity: 10_000 }
    }
}

struct Slot {
    session: QuizSession,
    touched: Instant,
    /// Lobby-wide use counter. Lower means less recently used.
    seq: u64,
}

type Registry = DashMap<SessionId, Slot>;

/// Container for every live quiz session, one per visitor.
pub struct Lobby {
    /// Sessions keyed by the visitor's cookie.
    sessions: Registry,
    /// Read-only question set shared by all sessions.
    store: QuestionStore,
    /// How each new session picks its questions.
    options: QuizOptions,
    limits: Limits,
    clock: AtomicU64,
}

impl Lobby {
    pub fn new(store: QuestionStore, options: QuizOptions) -> Self {
        Self { sessions: Registry::new(), store, options, limits: Limits::default(), clock: AtomicU64::new(0) }
    }

    pub fn with_limits(self, limits: Limits) -> Self {
        Self { limits, ..self }
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    pub fn options(&self) -> &QuizOptions {
        &self.options
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// How many questions each new session will contain.
    pub fn questions_per_session(&self) -> usize {
        let total = self.store.len();
        self.options.limit.map_or(total, |limit| limit.get().min(total))
    }

    fn new_session(&self) -> QuizSession {
        QuizSession::with_options(&self.store, &self.options, &mut rand::rng())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        now.saturating_duration_since(slot.touched) > self.limits.idle
    }

    /// Discards every session idle for longer than the limit as of `now`. Returns how many were dropped.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, slot| !self.is_expired(slot, now));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            log::info!("evicted {evicted} idle sessions");
        }
        evicted
    }

    /// Evicts least recently used sessions until a new one fits.
    fn make_room(&self) {
        while self.sessions.len() >= self.limits.capacity.max(1) {
            let oldest = self.sessions.iter().min_by_key(|entry| entry.seq).map(|entry| *entry.key());
            let Some(id) = oldest else {
                break;
            };
            self.sessions.remove(&id);
            log::info!("evicted session {id} to stay within {} sessions", self.limits.capacity);
        }
    }

    /// Opens a brand new session and returns its ID.
    pub fn start(&self) -> SessionId {
        let now = Instant::now();
        self.evict_idle(now);
        self.make_room();
        loop {
            let id = SessionId::random();
            use dashmap::mapref::entry::Entry::Vacant;
            if let Vacant(entry) = self.sessions.entry(id) {
                entry.insert(Slot { session: self.new_session(), touched: now, seq: self.tick() });
                log::info!("started session {id}");
                return id;
            }
        }
    }

    /// Replaces the visitor's session with a fresh one. Returns `false` if the ID is unknown.
    pub fn restart(&self, id: &SessionId) -> bool {
        let restarted = self.with_session(id, |session| *session = self.new_session()).is_some();
        if restarted {
            log::info!("restarted session {id}");
        }
        restarted
    }

    /// Runs `op` against the session with the given ID, if any, and marks it as recently used.
    /// Sessions past their idle limit are discarded instead.
    pub fn with_session<T>(&self, id: &SessionId, op: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        let now = Instant::now();
        {
            let mut slot = self.sessions.get_mut(id)?;
            if !self.is_expired(&slot, now) {
                slot.touched = now;
                slot.seq = self.tick();
                return Some(op(&mut slot.session));
            }
        }
        if self.sessions.remove_if(id, |_, slot| self.is_expired(slot, now)).is_some() {
            log::info!("session {id} expired");
        }
        None
    }

    /// Discards the session. Returns `false` if the ID is unknown.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            log::info!("discarded session {id}");
        }
        removed
    }

    /// Whether the ID belongs to a session that has not expired yet.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.get(id).is_some_and(|slot| !self.is_expired(&slot, Instant::now()))
    }

    /// Number of sessions held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::num::NonZeroUsize;
    use serde_json::json;

    fn lobby(options: QuizOptions) -> Lobby {
        lobby_with(options, Limits::default())
    }

    fn lobby_with(options: QuizOptions, limits: Limits) -> Lobby {
        let store = QuestionStore::load(&json!([
            { "id": 1, "question": "One?", "options": ["a", "b"], "answer_index": 0, "explanation": "" },
            { "id": 2, "question": "Two?", "options": ["a", "b"], "answer_index": 1, "explanation": "" },
            { "id": 3, "question": "Three?", "options": ["a", "b"], "answer_index": 1, "explanation": "" },
        ]))
        .unwrap();
        Lobby::new(store, options).with_limits(limits)
    }

    #[test]
    fn sessions_are_independent() {
        let lobby = lobby(QuizOptions::default());
        let first = lobby.start();
        let second = lobby.start();
        assert_ne!(first, second);
        assert_eq!(lobby.len(), 2);

        lobby.with_session(&first, |session| {
            session.submit_answer(0).unwrap();
            session.advance().unwrap();
        });
        assert_eq!(lobby.with_session(&first, |s| (s.current_index(), s.score())), Some((1, 1)));
        assert_eq!(lobby.with_session(&second, |s| (s.current_index(), s.score())), Some((0, 0)));
    }

    #[test]
    fn restart_resets_progress() {
        let lobby = lobby(QuizOptions::default());
        let id = lobby.start();
        lobby.with_session(&id, |session| session.submit_answer(0).map(|_| ())).unwrap().unwrap();
        assert!(lobby.restart(&id));
        assert_eq!(lobby.with_session(&id, |s| (s.is_answered(), s.score())), Some((false, 0)));
        assert!(!lobby.restart(&SessionId::random()));
    }

    #[test]
    fn removed_sessions_are_gone() {
        let lobby = lobby(QuizOptions::default());
        let id = lobby.start();
        assert!(lobby.contains(&id));
        assert!(lobby.remove(&id));
        assert!(!lobby.remove(&id));
        assert!(lobby.is_empty());
        assert_eq!(lobby.with_session(&id, |s| s.score()), None);
    }

    #[test]
    fn new_sessions_follow_options() {
        let options = QuizOptions { shuffle: true, limit: NonZeroUsize::new(2), feedback: false };
        let lobby = lobby(options);
        let id = lobby.start();
        assert_eq!(lobby.with_session(&id, |s| s.total()), Some(2));
        assert_eq!(lobby.questions_per_session(), 2);
        assert_eq!(lobby.options(), &options);
        assert_eq!(lobby.store().len(), 3);
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let lobby = lobby_with(QuizOptions::default(), Limits { idle: Duration::from_secs(60), capacity: 100 });
        let first = lobby.start();
        let second = lobby.start();
        assert_eq!(lobby.evict_idle(Instant::now()), 0);
        assert!(lobby.contains(&first));

        assert_eq!(lobby.evict_idle(Instant::now() + Duration::from_secs(61)), 2);
        assert!(!lobby.contains(&first));
        assert!(!lobby.contains(&second));
        assert!(lobby.is_empty());
    }

    #[test]
    fn expired_sessions_are_unreachable() {
        let lobby = lobby_with(QuizOptions::default(), Limits { idle: Duration::ZERO, capacity: 100 });
        let id = lobby.start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!lobby.contains(&id));
        assert_eq!(lobby.with_session(&id, |s| s.score()), None);
        assert!(lobby.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let lobby = lobby_with(QuizOptions::default(), Limits { capacity: 2, ..Limits::default() });
        let first = lobby.start();
        let second = lobby.start();
        assert_eq!(lobby.with_session(&first, |s| s.score()), Some(0));

        let third = lobby.start();
        assert_eq!(lobby.len(), 2);
        assert!(lobby.contains(&first));
        assert!(!lobby.contains(&second));
        assert!(lobby.contains(&third));

        for _ in 0..1_000 {
            lobby.start();
        }
        assert_eq!(lobby.len(), 2);
    }
}
