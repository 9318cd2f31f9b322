//! Application state and request orchestration.
//!
//! One `App` owns the session, the conversation log, the input buffers, and
//! the in-flight task slots. Remote calls run as spawned tokio tasks whose
//! `JoinHandle` sits in a slot polled on UI ticks; everything else happens on
//! the event loop, so state is single-writer throughout.

use std::time::Instant;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::backend::{AskResponse, BackendClient, LoadResponse, StatusResponse};
use crate::chat::{ChatLog, TypingId};
use crate::config::Config;
use crate::markup::{format_answer, format_user_text, Block, Fragment, Inline};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Path,
    Chat,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Canned questions bound to the number keys, submitted through the same
/// gates as typed questions.
pub const QUICK_QUESTIONS: [&str; 4] = [
    "What does this codebase do?",
    "What is the overall architecture?",
    "Where is the main entry point?",
    "What external dependencies are used?",
];

const SUPPORTED_TYPES_HINT: &str =
    "Supported file types: .py, .js, .ts, .java, .cpp, .md";

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,
    pub input_mode: InputMode,

    pub session: Session,
    pub chat: ChatLog,

    // Path input
    pub path_input: String,
    pub path_cursor: usize,

    // Question input
    pub question_input: String,
    pub question_cursor: usize,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub stick_to_bottom: bool,

    // Ellipsis animation while the placeholder is visible
    pub animation_frame: u8,

    typing_id: Option<TypingId>,
    pending_load_path: Option<String>,

    // In-flight remote calls; the Option slot doubles as the reentrancy guard
    probe_task: Option<JoinHandle<Result<StatusResponse>>>,
    load_task: Option<JoinHandle<Result<LoadResponse>>>,
    ask_task: Option<JoinHandle<Result<AskResponse>>>,

    backend: BackendClient,
    top_k: u32,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let backend = BackendClient::new(config.base_url());

        // Bootstrap probe: replay any existing server-side session without
        // user action. Failure means "nothing loaded", never an error.
        let probe_backend = backend.clone();
        let probe_task = Some(tokio::spawn(async move { probe_backend.status().await }));

        Self {
            should_quit: false,
            focus: FocusPane::Path,
            input_mode: InputMode::Editing,

            session: Session::new(),
            chat: ChatLog::new(),

            path_input: config.default_path.clone().unwrap_or_default(),
            path_cursor: config
                .default_path
                .as_deref()
                .map(|p| p.chars().count())
                .unwrap_or(0),

            question_input: String::new(),
            question_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            stick_to_bottom: true,

            animation_frame: 0,

            typing_id: None,
            pending_load_path: None,

            probe_task,
            load_task: None,
            ask_task: None,

            backend,
            top_k: config.top_k(),
        }
    }

    /// Whether a load call is currently in flight.
    pub fn load_in_flight(&self) -> bool {
        self.load_task.is_some()
    }

    /// Kick off a repository load for the current path input. An empty path
    /// is rejected locally; a load already in flight makes this a no-op.
    pub fn start_load(&mut self, now: Instant) {
        let path = self.path_input.trim().to_string();
        if path.is_empty() {
            self.session.set_error("Please enter a repository path", now);
            return;
        }
        if self.load_task.is_some() {
            return;
        }

        self.session.set_loading("Scanning files…");
        self.pending_load_path = Some(path.clone());

        let backend = self.backend.clone();
        self.load_task = Some(tokio::spawn(async move { backend.load(&path).await }));
    }

    /// Submit a question. Preconditions (non-empty after trim, repository
    /// loaded, no ask in flight) are checked here; violations are silent
    /// no-ops since the input is effectively a disabled control.
    pub fn submit_question(&mut self, text: &str) {
        let question = text.trim().to_string();
        if question.is_empty() || !self.session.can_ask() || self.ask_task.is_some() {
            return;
        }

        self.chat.push_user(format_user_text(&question));
        self.question_input.clear();
        self.question_cursor = 0;

        // Placeholder goes in before the call starts and comes out before
        // the terminal entry is appended.
        self.typing_id = Some(self.chat.insert_typing());
        self.session.is_loading = true;
        self.stick_to_bottom = true;

        let backend = self.backend.clone();
        let top_k = self.top_k;
        self.ask_task =
            Some(tokio::spawn(async move { backend.ask(&question, top_k).await }));
    }

    pub fn submit_quick_question(&mut self, index: usize) {
        if let Some(question) = QUICK_QUESTIONS.get(index) {
            self.submit_question(question);
        }
    }

    /// Drain any finished remote calls. Called on every tick.
    pub async fn poll_tasks(&mut self, now: Instant) {
        if self.probe_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.probe_task.take() {
                if let Ok(Ok(status)) = task.await {
                    self.apply_probe(status);
                }
            }
        }

        if self.load_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.load_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("load task failed: {e}")),
                };
                self.apply_load_result(result, now);
            }
        }

        if self.ask_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.ask_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("ask task failed: {e}")),
                };
                self.apply_ask_result(result, now);
            }
        }
    }

    /// Replay server-side session state reported by the bootstrap probe.
    pub fn apply_probe(&mut self, status: StatusResponse) {
        if status.repository_loaded {
            let path = status.repository_path.unwrap_or_default();
            self.session
                .set_loaded(&path, status.stats.unwrap_or_default());
            if self.path_input.trim().is_empty() {
                self.path_input = path;
                self.path_cursor = self.path_input.chars().count();
            }
            self.focus = FocusPane::Input;
        }
    }

    pub fn apply_load_result(&mut self, result: Result<LoadResponse>, now: Instant) {
        match result {
            Ok(response) => {
                let path = self.pending_load_path.take().unwrap_or_default();
                self.session.set_loaded(&path, response.stats.vectors);
                let summary = format!(
                    "**Repository loaded.** {}\n\n\
                     Try asking:\n\
                     • {}\n\
                     • {}\n\
                     • {}",
                    response.message, QUICK_QUESTIONS[0], QUICK_QUESTIONS[1], QUICK_QUESTIONS[2],
                );
                self.chat.push_assistant(format_answer(&summary));
                self.focus = FocusPane::Input;
                self.input_mode = InputMode::Editing;
            }
            Err(e) => {
                self.pending_load_path = None;
                let reason = e.to_string();
                self.session.set_error(&reason, now);
                // Failure text is user-visible data, not markup.
                self.chat.push_assistant(Fragment {
                    blocks: vec![
                        Block::Paragraph(vec![Inline::Text(format!(
                            "Failed to load repository: {reason}"
                        ))]),
                        Block::Paragraph(vec![Inline::Text(SUPPORTED_TYPES_HINT.to_string())]),
                    ],
                });
            }
        }
        self.stick_to_bottom = true;
    }

    pub fn apply_ask_result(&mut self, result: Result<AskResponse>, now: Instant) {
        // Placeholder removal always precedes the terminal entry.
        if let Some(id) = self.typing_id.take() {
            self.chat.remove_typing(id);
        }

        match result {
            Ok(response) => {
                let mut fragment = format_answer(&response.answer);
                if !response.source_files.is_empty() {
                    fragment.blocks.push(Block::SourceFiles(response.source_files));
                }
                self.chat.push_assistant(fragment);
            }
            Err(e) => {
                let reason = e.to_string();
                self.session.set_error(&reason, now);
                self.chat.push_assistant(Fragment {
                    blocks: vec![Block::Paragraph(vec![Inline::Text(format!(
                        "Error: {reason}"
                    ))])],
                });
            }
        }

        self.session.is_loading = false;
        self.stick_to_bottom = true;
    }

    /// Advance the animation and the status revert timer.
    pub fn tick(&mut self, now: Instant) {
        if self.session.is_loading || self.load_task.is_some() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.session.on_tick(now);
    }

    // Chat viewport movement. Any manual scroll detaches from the bottom.
    pub fn scroll_up(&mut self, lines: u16) {
        self.stick_to_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.stick_to_bottom = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.stick_to_bottom = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoadStats;
    use crate::chat::Role;
    use crate::session::{RepoStats, StatusKind};

    fn app() -> App {
        App::new(&Config::new())
    }

    fn loaded_app() -> App {
        let mut app = app();
        app.session.set_loaded(
            "/repo",
            RepoStats {
                unique_files: 2,
                total_chunks: 10,
                total_vectors: 10,
            },
        );
        app
    }

    #[tokio::test]
    async fn test_empty_path_rejected_without_network_call() {
        let mut app = app();
        app.path_input = "   ".to_string();
        app.start_load(Instant::now());
        assert!(app.load_task.is_none());
        assert_eq!(app.session.status().kind, StatusKind::Error);
    }

    #[tokio::test]
    async fn test_submit_is_noop_when_nothing_loaded() {
        let mut app = app();
        app.submit_question("What does main do?");
        assert!(app.chat.is_empty());
        assert!(app.ask_task.is_none());
        assert!(!app.session.is_loading);
    }

    #[tokio::test]
    async fn test_submit_is_noop_for_blank_question() {
        let mut app = loaded_app();
        app.submit_question("   ");
        assert!(app.chat.is_empty());
        assert!(app.ask_task.is_none());
    }

    #[tokio::test]
    async fn test_submit_is_noop_while_ask_in_flight() {
        let mut app = loaded_app();
        app.submit_question("first?");
        app.submit_question("second?");
        // One user entry plus one placeholder, nothing else.
        assert_eq!(app.chat.entries().len(), 2);
        assert!(app.chat.entries().last().unwrap().is_typing());
    }

    #[tokio::test]
    async fn test_submit_appends_user_entry_then_placeholder() {
        let mut app = loaded_app();
        app.submit_question("What does main do?");
        let entries = app.chat.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].body.to_html(), "<p>What does main do?</p>");
        assert!(entries[1].is_typing());
        assert!(app.session.is_loading);
        assert!(app.question_input.is_empty());
    }

    #[tokio::test]
    async fn test_ask_success_replaces_placeholder_with_answer() {
        let mut app = loaded_app();
        app.submit_question("What does main do?");
        app.apply_ask_result(
            Ok(AskResponse {
                answer: "It starts the **server**.".to_string(),
                source_files: vec!["a.py".to_string(), "b.py".to_string()],
            }),
            Instant::now(),
        );

        let entries = app.chat.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_typing()));
        let html = entries[1].body.to_html();
        assert!(html.contains("<strong>server</strong>"));
        assert!(html.contains("<code>a.py</code>"));
        assert!(html.contains("<code>b.py</code>"));
        assert!(!app.session.is_loading);
    }

    #[tokio::test]
    async fn test_ask_failure_replaces_placeholder_with_error() {
        let mut app = loaded_app();
        app.submit_question("What does main do?");
        app.apply_ask_result(Err(anyhow::anyhow!("backend unreachable")), Instant::now());

        let entries = app.chat.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_typing()));
        assert!(entries[1].body.to_html().contains("backend unreachable"));
        assert!(!app.session.is_loading);
        // A failed ask never downgrades the session.
        assert!(app.session.repository_loaded);
    }

    #[tokio::test]
    async fn test_load_failure_scenario() {
        let mut app = app();
        app.path_input = "./repo".to_string();
        app.start_load(Instant::now());
        assert_eq!(app.session.status().kind, StatusKind::Loading);

        app.load_task.take().unwrap().abort();
        app.apply_load_result(Err(anyhow::anyhow!("path not found")), Instant::now());

        assert!(!app.session.repository_loaded);
        assert_eq!(app.session.status().kind, StatusKind::Error);
        let assistant: Vec<_> = app
            .chat
            .entries()
            .iter()
            .filter(|e| e.role == Role::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert!(assistant[0].body.to_html().contains("path not found"));
    }

    #[tokio::test]
    async fn test_load_success_enables_chat() {
        let mut app = app();
        app.path_input = "./repo".to_string();
        app.start_load(Instant::now());
        app.load_task.take().unwrap().abort();
        app.apply_load_result(
            Ok(LoadResponse {
                message: "Successfully loaded 2 files with 10 chunks".to_string(),
                stats: LoadStats::default(),
            }),
            Instant::now(),
        );

        assert!(app.session.repository_loaded);
        assert!(app.session.can_ask());
        assert_eq!(app.session.current_path.as_deref(), Some("./repo"));
        let html = app.chat.entries().last().unwrap().body.to_html();
        assert!(html.contains("Successfully loaded 2 files with 10 chunks"));
        assert!(html.contains(QUICK_QUESTIONS[0]));
    }

    #[tokio::test]
    async fn test_probe_replays_loaded_session() {
        let mut app = app();
        app.apply_probe(StatusResponse {
            repository_loaded: true,
            repository_path: Some("/work/repo".to_string()),
            stats: Some(RepoStats {
                unique_files: 14,
                total_chunks: 120,
                total_vectors: 120,
            }),
        });
        assert!(app.session.repository_loaded);
        assert_eq!(app.session.current_path.as_deref(), Some("/work/repo"));
        assert_eq!(app.path_input, "/work/repo");
    }

    #[tokio::test]
    async fn test_probe_with_nothing_loaded_is_inert() {
        let mut app = app();
        app.apply_probe(StatusResponse {
            repository_loaded: false,
            repository_path: None,
            stats: None,
        });
        assert!(!app.session.repository_loaded);
        assert_eq!(app.session.status().kind, StatusKind::None);
    }

    #[tokio::test]
    async fn test_quick_question_gated_like_typed() {
        let mut app = app();
        app.submit_quick_question(0);
        assert!(app.chat.is_empty());

        let mut app = loaded_app();
        app.submit_quick_question(0);
        assert_eq!(
            app.chat.entries()[0].body.to_html(),
            format!("<p>{}</p>", QUICK_QUESTIONS[0])
        );
    }
}
