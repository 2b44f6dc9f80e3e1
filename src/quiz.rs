//! Quiz round state machine.

use crate::models::{Difficulty, QuizQuestion};

/// Current quiz pane state.
#[derive(Debug, Clone)]
pub enum QuizState {
    /// A batch fetch is in flight.
    Loading,
    /// A batch is loaded and in progress.
    Ready(QuizRound),
    /// The last fetch failed or returned a malformed batch. Manual retry only.
    Error,
}

/// Progress through one fetched batch of questions.
#[derive(Debug, Clone)]
pub struct QuizRound {
    questions: Vec<QuizQuestion>,
    current: usize,
    selected: Option<usize>,
    answered: bool,
}

/// Outcome of advancing past the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next question in the batch.
    Next,
    /// The batch is exhausted; a fresh one must be fetched.
    Exhausted,
}

impl QuizRound {
    /// Build a round from a validated, non-empty batch.
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        debug_assert!(!questions.is_empty());
        Self {
            questions,
            current: 0,
            selected: None,
            answered: false,
        }
    }

    /// The question currently shown.
    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current]
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.current
    }

    /// Questions in this batch.
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// The learner's picked option, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Whether the current question has been answered.
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Answer the current question. Returns whether the pick was correct, or
    /// `None` if the question was already answered or the index is out of
    /// range. Re-answering before advancing is a no-op.
    fn answer(&mut self, index: usize) -> Option<bool> {
        if self.answered || index >= self.current_question().options.len() {
            return None;
        }
        self.answered = true;
        self.selected = Some(index);
        Some(index == self.current_question().correct_answer)
    }

    /// Move past the current question, clearing the answer marks.
    fn advance(&mut self) -> Advance {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.answered = false;
            Advance::Next
        } else {
            Advance::Exhausted
        }
    }
}

/// Drives batches for one lesson: fetch lifecycle, difficulty, streak.
///
/// The engine never performs I/O itself. Operations that need a fresh batch
/// hand back a generation token; the caller spawns the fetch and feeds the
/// result to [`QuizEngine::apply_batch`], which drops stale generations.
#[derive(Debug)]
pub struct QuizEngine {
    pub state: QuizState,
    pub difficulty: Difficulty,
    /// Consecutive correct answers since the last miss.
    pub streak: u32,
    generation: u64,
}

impl QuizEngine {
    pub fn new() -> Self {
        Self {
            state: QuizState::Loading,
            difficulty: Difficulty::Easy,
            streak: 0,
            generation: 0,
        }
    }

    /// Start a batch fetch, discarding any current round. Returns the
    /// generation the eventual result must carry.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.state = QuizState::Loading;
        self.generation
    }

    /// Apply a fetched batch. Stale generations are ignored; an empty batch
    /// means the fetch failed or was malformed and lands in `Error`.
    pub fn apply_batch(&mut self, generation: u64, questions: Vec<QuizQuestion>) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "dropping stale quiz batch");
            return false;
        }
        self.state = if questions.is_empty() {
            QuizState::Error
        } else {
            QuizState::Ready(QuizRound::new(questions))
        };
        true
    }

    /// Switch difficulty. Returns the fetch generation for the new batch, or
    /// `None` when the tier is already active.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Option<u64> {
        if difficulty == self.difficulty {
            return None;
        }
        self.difficulty = difficulty;
        Some(self.begin_load())
    }

    /// Answer the current question. Updates the streak and returns whether the
    /// pick was correct; `None` when no round is active or the question was
    /// already answered.
    pub fn answer(&mut self, index: usize) -> Option<bool> {
        let QuizState::Ready(round) = &mut self.state else {
            return None;
        };
        let correct = round.answer(index)?;
        if correct {
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        Some(correct)
    }

    /// Move to the next question. Returns the fetch generation when the batch
    /// is exhausted and a fresh one is needed. Ignored until the current
    /// question has been answered.
    pub fn advance(&mut self) -> Option<u64> {
        let QuizState::Ready(round) = &mut self.state else {
            return None;
        };
        if !round.is_answered() {
            return None;
        }
        match round.advance() {
            Advance::Next => None,
            Advance::Exhausted => Some(self.begin_load()),
        }
    }

    /// Retry after a failed fetch. Only meaningful from `Error`.
    pub fn retry(&mut self) -> Option<u64> {
        match self.state {
            QuizState::Error => Some(self.begin_load()),
            _ => None,
        }
    }

    /// The active round, if one is loaded.
    pub fn round(&self) -> Option<&QuizRound> {
        match &self.state {
            QuizState::Ready(round) => Some(round),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> Vec<QuizQuestion> {
        (1..=3)
            .map(|id| QuizQuestion {
                id,
                question: format!("第 {id} 题：2 + {id} = ?"),
                options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
                correct_answer: 1,
                explanation: "加法基础。".to_string(),
            })
            .collect()
    }

    fn loaded_engine() -> QuizEngine {
        let mut engine = QuizEngine::new();
        let generation = engine.begin_load();
        assert!(engine.apply_batch(generation, sample_batch()));
        engine
    }

    #[test]
    fn starts_loading_at_easy() {
        let engine = QuizEngine::new();
        assert!(matches!(engine.state, QuizState::Loading));
        assert_eq!(engine.difficulty, Difficulty::Easy);
        assert_eq!(engine.streak, 0);
    }

    #[test]
    fn empty_batch_lands_in_error_and_retry_reloads() {
        let mut engine = QuizEngine::new();
        let generation = engine.begin_load();
        assert!(engine.apply_batch(generation, Vec::new()));
        assert!(matches!(engine.state, QuizState::Error));

        // Answering in Error is a no-op.
        assert_eq!(engine.answer(0), None);

        let retry = engine.retry().expect("retry from error");
        assert!(matches!(engine.state, QuizState::Loading));
        assert!(engine.apply_batch(retry, sample_batch()));
        assert!(matches!(engine.state, QuizState::Ready(_)));
    }

    #[test]
    fn stale_batches_are_dropped() {
        let mut engine = QuizEngine::new();
        let old = engine.begin_load();
        let new = engine.begin_load();
        assert!(!engine.apply_batch(old, sample_batch()));
        assert!(matches!(engine.state, QuizState::Loading));
        assert!(engine.apply_batch(new, sample_batch()));
    }

    #[test]
    fn second_answer_before_advance_is_ignored() {
        let mut engine = loaded_engine();
        assert_eq!(engine.answer(1), Some(true));
        assert_eq!(engine.answer(0), None);
        assert_eq!(engine.answer(1), None);
        assert_eq!(engine.streak, 1);
    }

    #[test]
    fn out_of_range_answer_is_ignored() {
        let mut engine = loaded_engine();
        assert_eq!(engine.answer(4), None);
        assert!(!engine.round().unwrap().is_answered());
    }

    #[test]
    fn streak_resets_on_miss() {
        let mut engine = loaded_engine();
        let picks = [(1, 1), (1, 2), (0, 0), (1, 1)];
        for (pick, expected_streak) in picks {
            assert!(engine.answer(pick).is_some());
            assert_eq!(engine.streak, expected_streak);
            if let Some(generation) = engine.advance() {
                // Batch exhausted; load the next one for the remaining picks.
                engine.apply_batch(generation, sample_batch());
            }
        }
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut engine = loaded_engine();
        assert_eq!(engine.advance(), None);
        assert_eq!(engine.round().unwrap().position(), 0);
    }

    #[test]
    fn exhausting_the_batch_requests_a_fresh_one() {
        let mut engine = loaded_engine();
        for _ in 0..2 {
            engine.answer(1);
            assert_eq!(engine.advance(), None);
        }
        engine.answer(1);
        let generation = engine.advance().expect("fresh batch after last question");
        assert!(matches!(engine.state, QuizState::Loading));
        assert!(engine.apply_batch(generation, sample_batch()));
        assert_eq!(engine.round().unwrap().position(), 0);
    }

    #[test]
    fn difficulty_change_discards_progress() {
        let mut engine = loaded_engine();
        engine.answer(1);
        engine.advance();
        assert_eq!(engine.round().unwrap().position(), 1);

        assert_eq!(engine.set_difficulty(Difficulty::Easy), None);
        let generation = engine
            .set_difficulty(Difficulty::Medium)
            .expect("tier change refetches");
        assert!(matches!(engine.state, QuizState::Loading));
        assert_eq!(engine.difficulty, Difficulty::Medium);

        engine.apply_batch(generation, sample_batch());
        assert_eq!(engine.round().unwrap().position(), 0);
        assert!(!engine.round().unwrap().is_answered());
    }

    #[test]
    fn streak_survives_a_difficulty_change() {
        let mut engine = loaded_engine();
        engine.answer(1);
        assert_eq!(engine.streak, 1);
        let generation = engine.set_difficulty(Difficulty::Hard).unwrap();
        engine.apply_batch(generation, sample_batch());
        assert_eq!(engine.streak, 1);
    }
}
