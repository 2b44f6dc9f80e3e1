//! Application state and async fetch orchestration.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use crate::catalog::TOPICS;
use crate::chat::ChatSession;
use crate::config::Config;
use crate::models::{QuizQuestion, Topic, UserStats};
use crate::provider::{
    TutorClient, CHAT_FALLBACK, EMPTY_REPLY_FALLBACK, EXPLAIN_FALLBACK,
};
use crate::quiz::QuizEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Lesson,
}

/// Which pane owns the keyboard inside a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Quiz,
    ChatInput,
}

/// Completion of a spawned provider call. Tagged with the lesson generation
/// (and batch generation for quizzes) so stale results are dropped on arrival.
#[derive(Debug)]
pub enum ProviderEvent {
    Explanation {
        lesson: u64,
        text: String,
    },
    QuizBatch {
        lesson: u64,
        generation: u64,
        questions: Vec<QuizQuestion>,
    },
    ChatReply {
        lesson: u64,
        text: String,
    },
}

/// Transient per-lesson state, destroyed on return to the dashboard.
pub struct Lesson {
    pub topic: Topic,
    pub chat: ChatSession,
    pub quiz: QuizEngine,
    pub focus: Focus,
    pub input_buffer: String,
    /// The opening explanation has not arrived yet.
    pub explanation_pending: bool,
}

impl Lesson {
    fn new(topic: Topic) -> Self {
        Self {
            topic,
            chat: ChatSession::new(),
            quiz: QuizEngine::new(),
            focus: Focus::Quiz,
            input_buffer: String::new(),
            explanation_pending: true,
        }
    }
}

pub struct App {
    pub config: Config,
    pub view: View,
    pub topics: &'static [Topic],
    pub selected_topic: usize,
    pub stats: UserStats,
    pub lesson: Option<Lesson>,
    /// Sticky notice shown in the footer (e.g. missing API key).
    pub notice: Option<String>,

    client: Option<Arc<TutorClient>>,
    lesson_gen: u64,
    events_tx: mpsc::Sender<ProviderEvent>,
    events_rx: mpsc::Receiver<ProviderEvent>,
}

impl App {
    pub fn new(config: Config, client: Option<TutorClient>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(32);
        let notice = if client.is_none() {
            Some("未设置 GEMINI_API_KEY，AI 老师暂时联系不上".to_string())
        } else {
            None
        };
        Self {
            config,
            view: View::Dashboard,
            topics: &TOPICS,
            selected_topic: 0,
            stats: UserStats::default(),
            lesson: None,
            notice,
            client: client.map(Arc::new),
            lesson_gen: 0,
            events_tx,
            events_rx,
        }
    }

    /// Handle a key press. Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.view {
            View::Dashboard => self.handle_dashboard_key(key),
            View::Lesson => {
                self.handle_lesson_key(key);
                false
            }
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.topics.is_empty() {
                    self.selected_topic = (self.selected_topic + 1).min(self.topics.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_topic = self.selected_topic.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.select_topic(self.selected_topic),
            _ => {}
        }
        false
    }

    fn handle_lesson_key(&mut self, key: KeyEvent) {
        let Some(lesson) = &self.lesson else {
            self.view = View::Dashboard;
            return;
        };
        match lesson.focus {
            Focus::Quiz => self.handle_quiz_key(key),
            Focus::ChatInput => self.handle_chat_key(key),
        }
    }

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.return_to_dashboard(),
            KeyCode::Char('i') => {
                if let Some(lesson) = &mut self.lesson {
                    lesson.focus = Focus::ChatInput;
                }
            }
            KeyCode::Tab => self.cycle_difficulty(),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                if let Some(lesson) = &mut self.lesson {
                    if let Some(correct) = lesson.quiz.answer(index) {
                        self.stats.record_answer(correct);
                    }
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('n') => {
                let generation = self.lesson.as_mut().and_then(|l| l.quiz.advance());
                if let Some(generation) = generation {
                    self.start_quiz_fetch(generation);
                }
            }
            KeyCode::Char('r') => {
                let generation = self.lesson.as_mut().and_then(|l| l.quiz.retry());
                if let Some(generation) = generation {
                    self.start_quiz_fetch(generation);
                }
            }
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        let Some(lesson) = &mut self.lesson else { return };
        match key.code {
            KeyCode::Esc => lesson.focus = Focus::Quiz,
            KeyCode::Enter => self.send_chat_message(),
            KeyCode::Backspace => {
                lesson.input_buffer.pop();
            }
            KeyCode::Char(c) => lesson.input_buffer.push(c),
            _ => {}
        }
    }

    /// Enter a lesson: fresh chat and quiz substate, then kick off the two
    /// independent opening fetches.
    pub fn select_topic(&mut self, index: usize) {
        let Some(&topic) = self.topics.get(index) else { return };
        tracing::debug!(topic = topic.id, "entering lesson");

        self.lesson_gen += 1;
        let mut lesson = Lesson::new(topic);
        let generation = lesson.quiz.begin_load();
        self.lesson = Some(lesson);
        self.view = View::Lesson;

        self.start_explanation_fetch();
        self.start_quiz_fetch(generation);
    }

    /// Back to the dashboard, dropping all lesson substate. The generation
    /// bump makes any in-flight completion stale.
    pub fn return_to_dashboard(&mut self) {
        self.lesson_gen += 1;
        self.lesson = None;
        self.view = View::Dashboard;
    }

    fn cycle_difficulty(&mut self) {
        let generation = self
            .lesson
            .as_mut()
            .and_then(|l| l.quiz.set_difficulty(l.quiz.difficulty.next()));
        if let Some(generation) = generation {
            self.start_quiz_fetch(generation);
        }
    }

    fn send_chat_message(&mut self) {
        let Some(lesson) = &mut self.lesson else { return };
        let text = lesson.input_buffer.trim().to_string();
        let Some(history) = lesson.chat.begin_send(&text) else {
            return;
        };
        lesson.input_buffer.clear();

        let Some(client) = self.client.clone() else {
            lesson.chat.apply_reply(CHAT_FALLBACK);
            return;
        };
        let tx = self.events_tx.clone();
        let lesson_gen = self.lesson_gen;
        tokio::spawn(async move {
            let text = match client.chat_turn(&history, &text).await {
                Ok(reply) => reply,
                Err(crate::provider::ProviderError::EmptyResponse) => {
                    EMPTY_REPLY_FALLBACK.to_string()
                }
                Err(err) => {
                    tracing::warn!(%err, "chat turn failed");
                    CHAT_FALLBACK.to_string()
                }
            };
            let _ = tx
                .send(ProviderEvent::ChatReply {
                    lesson: lesson_gen,
                    text,
                })
                .await;
        });
    }

    fn start_explanation_fetch(&mut self) {
        let Some(lesson) = &mut self.lesson else { return };
        let topic = lesson.topic;

        let Some(client) = self.client.clone() else {
            lesson.chat.seed(EXPLAIN_FALLBACK);
            lesson.explanation_pending = false;
            return;
        };
        let tx = self.events_tx.clone();
        let lesson_gen = self.lesson_gen;
        tokio::spawn(async move {
            let text = match client.explain(topic.title, "").await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(topic = topic.id, %err, "explanation fetch failed");
                    EXPLAIN_FALLBACK.to_string()
                }
            };
            let _ = tx
                .send(ProviderEvent::Explanation {
                    lesson: lesson_gen,
                    text,
                })
                .await;
        });
    }

    fn start_quiz_fetch(&mut self, generation: u64) {
        let Some(lesson) = &mut self.lesson else { return };
        let topic = lesson.topic;
        let difficulty = lesson.quiz.difficulty;

        let Some(client) = self.client.clone() else {
            lesson.quiz.apply_batch(generation, Vec::new());
            return;
        };
        let tx = self.events_tx.clone();
        let lesson_gen = self.lesson_gen;
        tokio::spawn(async move {
            let questions = client.generate_quiz(topic.title, difficulty).await;
            let _ = tx
                .send(ProviderEvent::QuizBatch {
                    lesson: lesson_gen,
                    generation,
                    questions,
                })
                .await;
        });
    }

    /// Drain completed provider calls. Called once per tick from the main
    /// loop; each application is atomic from the UI's perspective.
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: ProviderEvent) {
        let current = self.lesson_gen;
        let Some(lesson) = &mut self.lesson else { return };
        match event {
            ProviderEvent::Explanation { lesson: gen, text } => {
                if gen != current {
                    tracing::debug!("dropping stale explanation");
                    return;
                }
                lesson.chat.seed(text);
                lesson.explanation_pending = false;
            }
            ProviderEvent::QuizBatch {
                lesson: gen,
                generation,
                questions,
            } => {
                if gen != current {
                    tracing::debug!("dropping stale quiz batch");
                    return;
                }
                lesson.quiz.apply_batch(generation, questions);
            }
            ProviderEvent::ChatReply { lesson: gen, text } => {
                if gen != current {
                    tracing::debug!("dropping stale chat reply");
                    return;
                }
                lesson.chat.apply_reply(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Role};
    use crate::quiz::QuizState;

    fn offline_app() -> App {
        App::new(Config::default(), None)
    }

    fn sample_batch() -> Vec<QuizQuestion> {
        (1..=3)
            .map(|id| QuizQuestion {
                id,
                question: format!("{id} × 0 = ?"),
                options: vec!["0".into(), "1".into(), "2".into(), "3".into()],
                correct_answer: 0,
                explanation: "任何数乘 0 都得 0。".to_string(),
            })
            .collect()
    }

    #[test]
    fn reselecting_a_topic_yields_a_fresh_single_seed() {
        let mut app = offline_app();
        app.select_topic(0);
        {
            let lesson = app.lesson.as_mut().unwrap();
            lesson.chat.begin_send("第一个问题");
            lesson.chat.apply_reply("第一个回答");
            assert_eq!(lesson.chat.messages().len(), 3);
        }

        app.return_to_dashboard();
        assert!(app.lesson.is_none());

        app.select_topic(1);
        let lesson = app.lesson.as_ref().unwrap();
        assert_eq!(lesson.chat.messages().len(), 1);
        assert_eq!(lesson.topic.id, "perimeter");
    }

    #[test]
    fn missing_key_degrades_to_error_and_fallback() {
        let mut app = offline_app();
        assert!(app.notice.is_some());
        app.select_topic(0);
        let lesson = app.lesson.as_ref().unwrap();
        assert!(matches!(lesson.quiz.state, QuizState::Error));
        assert_eq!(lesson.chat.messages().len(), 1);
        assert_eq!(lesson.chat.messages()[0].text, EXPLAIN_FALLBACK);
    }

    #[test]
    fn stale_lesson_events_are_dropped() {
        let mut app = offline_app();
        app.select_topic(0);
        let stale = ProviderEvent::ChatReply {
            lesson: 0,
            text: "迟到的回答".to_string(),
        };
        app.events_tx.try_send(stale).unwrap();
        app.poll_events();
        assert_eq!(app.lesson.as_ref().unwrap().chat.messages().len(), 1);

        let current = ProviderEvent::ChatReply {
            lesson: 1,
            text: "及时的回答".to_string(),
        };
        app.events_tx.try_send(current).unwrap();
        app.poll_events();
        assert_eq!(app.lesson.as_ref().unwrap().chat.messages().len(), 2);
    }

    #[test]
    fn chat_waits_for_the_opening_explanation() {
        let mut app = offline_app();
        app.select_topic(1);

        // Recreate the lesson as if the opening explanation were still in
        // flight (the offline path seeds synchronously).
        let topic = app.lesson.as_ref().unwrap().topic;
        app.lesson = Some(Lesson::new(topic));

        let lesson = app.lesson.as_mut().unwrap();
        lesson.focus = Focus::ChatInput;
        lesson.input_buffer = "周长是什么".to_string();
        app.send_chat_message();

        // Refused: no user message ahead of the seed, input kept for later.
        let lesson = app.lesson.as_ref().unwrap();
        assert!(lesson.chat.messages().is_empty());
        assert_eq!(lesson.input_buffer, "周长是什么");

        app.events_tx
            .try_send(ProviderEvent::Explanation {
                lesson: 1,
                text: "周长就是围着图形走一圈的长度。".to_string(),
            })
            .unwrap();
        app.poll_events();
        app.send_chat_message();

        let lesson = app.lesson.as_ref().unwrap();
        let roles: Vec<Role> = lesson.chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::Model, Role::User, Role::Model]);
        assert_eq!(lesson.chat.messages()[1].text, "周长是什么");
    }

    #[test]
    fn mixed_ops_walkthrough() {
        let mut app = offline_app();
        app.select_topic(0);
        assert_eq!(app.lesson.as_ref().unwrap().topic.title, "混合运算");

        // Inject a batch as if the fetch had completed.
        let lesson = app.lesson.as_mut().unwrap();
        let generation = lesson.quiz.begin_load();
        assert!(lesson.quiz.apply_batch(generation, sample_batch()));

        // Answer question 1 correctly.
        let correct = app.lesson.as_mut().unwrap().quiz.answer(0).unwrap();
        assert!(correct);
        app.stats.record_answer(correct);

        assert_eq!(app.stats.total_questions, 1);
        assert_eq!(app.stats.correct_answers, 1);
        assert_eq!(app.stats.stars, 1);
        let lesson = app.lesson.as_mut().unwrap();
        assert_eq!(lesson.quiz.streak, 1);

        assert_eq!(lesson.quiz.advance(), None);
        assert_eq!(lesson.quiz.round().unwrap().position(), 1);
    }

    #[test]
    fn difficulty_cycle_starts_a_reload() {
        let mut app = offline_app();
        app.select_topic(0);
        let lesson = app.lesson.as_mut().unwrap();
        let generation = lesson.quiz.begin_load();
        lesson.quiz.apply_batch(generation, sample_batch());
        lesson.quiz.answer(0);
        lesson.quiz.advance();

        app.cycle_difficulty();
        let lesson = app.lesson.as_ref().unwrap();
        assert_eq!(lesson.quiz.difficulty, Difficulty::Medium);
        // Offline: the reload degrades straight to the retryable error state.
        assert!(matches!(lesson.quiz.state, QuizState::Error));
    }
}
