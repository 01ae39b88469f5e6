use std::sync::mpsc::{Receiver, Sender};

use tracing::{debug, error, info, warn};

use crate::engine::llm_client::{
    build_backend, env_key, ChatBackend, ChatSession, KeyLookup, LlmError,
};
use crate::engine::prompt::{OPENING_MESSAGE, SYSTEM_INSTRUCTION};
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::engine::response_parser::parse_reply;
use crate::engine::session_reducer;
use crate::model::reduce_outcome::ReduceOutcome;
use crate::model::session::Session;
use crate::ui::settings::TutorSettings;

/// Called after every response so the UI wakes up and repaints.
pub type Notify = Box<dyn Fn() + Send>;

/// Background worker owning the conversation and the authoritative session.
///
/// Commands are handled one at a time, so at most one request is ever in
/// flight and every state is derived from the one before it.
pub struct Engine {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    notify: Notify,

    settings: TutorSettings,
    key_lookup: KeyLookup,
    backend: Option<Box<dyn ChatBackend>>,
    chat: Option<ChatSession>,
    session: Session,
}

impl Engine {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        settings: TutorSettings,
        notify: Notify,
    ) -> Self {
        Self {
            rx,
            tx,
            notify,
            settings,
            key_lookup: env_key,
            backend: None,
            chat: None,
            session: Session::default(),
        }
    }

    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            self.handle(cmd);
        }
        debug!("engine channel closed");
    }

    fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::StartSession => self.start_session(),
            EngineCommand::UserInput(text) => self.user_input(text),
            EngineCommand::UpdateSettings(settings) => {
                info!(provider = ?settings.provider, model = %settings.model, "settings updated");
                self.settings = settings;
                // Rebuilt lazily on the next send.
                self.backend = None;
                self.chat = None;
            }
            EngineCommand::CheckConnection => {
                let status = self
                    .backend()
                    .and_then(|backend| backend.check_connection())
                    .map_err(|err| err.to_string());
                self.respond(EngineResponse::ConnectionStatus(status));
            }
        }
    }

    fn start_session(&mut self) {
        info!("starting tutoring session");
        self.session = session_reducer::start_session();
        self.publish_session();

        if let Some(chat) = self.chat.as_mut() {
            chat.reset();
        }

        match self.send(OPENING_MESSAGE) {
            Ok(raw) => {
                let reply = parse_reply(&raw);
                self.session = session_reducer::apply_opening(&self.session, &reply);
                info!(scene = %self.session.scene, "session started");
                self.publish_session();
            }
            Err(err) => {
                error!(error = %err, "failed to start session");
                self.session = session_reducer::fail_start(&self.session);
                self.publish_session();
                self.respond(EngineResponse::StartFailed(format!(
                    "Could not start the session.\n\n{err}\n\nPlease check your API key."
                )));
            }
        }
    }

    fn user_input(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        if !self.session.accepts_input() {
            debug!(
                active = self.session.is_active,
                loading = self.session.is_loading,
                finished = self.session.is_finished,
                "dropping input"
            );
            return;
        }

        self.session = session_reducer::begin_turn(&self.session, &text);
        self.publish_session();

        match self.send(&text) {
            Ok(raw) => {
                debug!(reply = %raw, "raw tutor reply");
                let reply = parse_reply(&raw);
                let (next, outcome) = session_reducer::apply_reply(&self.session, &reply);
                self.session = next;
                log_outcome(&outcome, &self.session);
            }
            Err(err) => {
                warn!(error = %err, "failed to send message");
                self.session = session_reducer::fail_turn(&self.session);
            }
        }

        self.publish_session();
    }

    fn take_backend(&mut self) -> Result<Box<dyn ChatBackend>, LlmError> {
        match self.backend.take() {
            Some(backend) => Ok(backend),
            None => build_backend(&self.settings, self.key_lookup),
        }
    }

    fn backend(&mut self) -> Result<&dyn ChatBackend, LlmError> {
        let backend = self.take_backend()?;
        Ok(&**self.backend.insert(backend))
    }

    /// Lazily creates the backend and chat session, then sends one message.
    fn send(&mut self, text: &str) -> Result<String, LlmError> {
        let backend = self.take_backend()?;
        let params = self.settings.generation();
        let chat = self
            .chat
            .get_or_insert_with(|| ChatSession::new(SYSTEM_INSTRUCTION, params));

        let result = chat.send(&*backend, text);
        debug!(turns = chat.history().len(), ok = result.is_ok(), "chat round trip");
        self.backend = Some(backend);
        result
    }

    fn publish_session(&self) {
        self.respond(EngineResponse::Session(self.session.clone()));
    }

    fn respond(&self, response: EngineResponse) {
        let _ = self.tx.send(response);
        (self.notify)();
    }
}

fn log_outcome(outcome: &ReduceOutcome, session: &Session) {
    match outcome {
        ReduceOutcome::TextOnly => debug!("reply carried no tracking block"),
        ReduceOutcome::TurnApplied {
            scene,
            score_delta,
            error_recorded,
        } => info!(
            scene = %scene,
            score_delta,
            error_recorded,
            score = session.score,
            total_errors = session.total_errors,
            "turn applied"
        ),
        ReduceOutcome::Finished { final_score } => {
            info!(final_score, total_errors = session.total_errors, "session finished")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::engine::llm_client::testing::ScriptedBackend;
    use crate::model::message::Role;
    use crate::model::session::{MistakeKind, Scene};

    const OPENING: &str = "Hello! What would you like?\n\n{\"scene\":\"cafe\",\"mistake_type\":\"none\",\"score_delta\":0}";
    const WRONG: &str = "Say: some milk.\n\n{\"scene\":\"cafe\",\"mistake_type\":\"some_any\",\"is_quantifier_correct\":false,\"score_delta\":0}";
    const SUMMARY: &str = "Well done!\n\n{\"total_turns\":2,\"total_errors\":1,\"errors_by_type\":{\"some_any\":1},\"final_score\":0}";

    struct Harness {
        engine: Engine,
        responses: mpsc::Receiver<EngineResponse>,
    }

    impl Harness {
        fn new(backend: ScriptedBackend) -> Self {
            let (_cmd_tx, cmd_rx) = mpsc::channel();
            let (resp_tx, resp_rx) = mpsc::channel();
            let mut engine =
                Engine::new(cmd_rx, resp_tx, TutorSettings::default(), Box::new(|| {}));
            engine.backend = Some(Box::new(backend));
            Self {
                engine,
                responses: resp_rx,
            }
        }

        fn drain(&self) -> Vec<EngineResponse> {
            self.responses.try_iter().collect()
        }

        fn last_session(&self) -> Session {
            self.drain()
                .into_iter()
                .filter_map(|r| match r {
                    EngineResponse::Session(s) => Some(s),
                    _ => None,
                })
                .last()
                .expect("at least one session snapshot")
        }
    }

    #[test]
    fn start_publishes_loading_then_opening() {
        let mut h = Harness::new(ScriptedBackend::new(vec![Ok(OPENING)]));
        h.engine.handle(EngineCommand::StartSession);

        let snapshots: Vec<Session> = h
            .drain()
            .into_iter()
            .filter_map(|r| match r {
                EngineResponse::Session(s) => Some(s),
                _ => None,
            })
            .collect();

        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].is_loading && snapshots[0].is_active);
        assert!(!snapshots[1].is_loading);
        assert_eq!(snapshots[1].messages.len(), 1);
        assert_eq!(snapshots[1].messages[0].text, "Hello! What would you like?");
        assert_eq!(snapshots[1].scene, Scene::Cafe);
    }

    #[test]
    fn failed_start_reverts_to_inactive_and_notifies() {
        let mut h = Harness::new(ScriptedBackend::new(vec![Err("bad key")]));
        h.engine.handle(EngineCommand::StartSession);

        let responses = h.drain();
        assert!(responses
            .iter()
            .any(|r| matches!(r, EngineResponse::StartFailed(msg) if msg.contains("bad key"))));
        assert!(!h.engine.session.is_active);
        assert!(!h.engine.session.is_loading);
    }

    #[test]
    fn missing_api_key_fails_the_start() {
        let (_cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let settings = TutorSettings {
            api_key: Some("   ".into()),
            provider: crate::ui::settings::Provider::Gemini,
            ..TutorSettings::default()
        };
        let mut engine = Engine::new(cmd_rx, resp_tx, settings, Box::new(|| {}));
        engine.key_lookup = |_| None;

        engine.handle(EngineCommand::StartSession);

        assert!(resp_rx
            .try_iter()
            .any(|r| matches!(r, EngineResponse::StartFailed(_))));
        assert!(!engine.session.is_active);
    }

    #[test]
    fn wrong_answer_updates_counters() {
        let mut h = Harness::new(ScriptedBackend::new(vec![Ok(OPENING), Ok(WRONG)]));
        h.engine.handle(EngineCommand::StartSession);
        h.engine.handle(EngineCommand::UserInput("I want any milk".into()));

        let session = h.last_session();
        assert_eq!(session.total_errors, 1);
        assert_eq!(session.mistakes.get(MistakeKind::SomeAny), 1);
        let roles: Vec<_> = session.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Tutor, Role::User, Role::Tutor]);
    }

    #[test]
    fn send_failure_keeps_the_user_message() {
        let mut h = Harness::new(ScriptedBackend::new(vec![Ok(OPENING), Err("timeout")]));
        h.engine.handle(EngineCommand::StartSession);
        h.drain();

        h.engine.handle(EngineCommand::UserInput("some water".into()));

        let snapshots: Vec<Session> = h
            .drain()
            .into_iter()
            .filter_map(|r| match r {
                EngineResponse::Session(s) => Some(s),
                _ => None,
            })
            .collect();
        assert!(snapshots[0].is_loading);
        let last = snapshots.last().unwrap();
        assert!(!last.is_loading);
        assert_eq!(last.messages.len(), 2);
        assert_eq!(last.messages[1].text, "some water");
        assert_eq!(last.messages[1].role, Role::User);
    }

    #[test]
    fn summary_finishes_and_blocks_further_input() {
        let backend = ScriptedBackend::new(vec![Ok(OPENING), Ok(SUMMARY)]);
        let calls = backend.calls.clone();
        let mut h = Harness::new(backend);
        h.engine.handle(EngineCommand::StartSession);
        h.engine.handle(EngineCommand::UserInput("finish".into()));
        h.engine.handle(EngineCommand::UserInput("hello?".into()));

        let session = h.last_session();
        assert!(session.is_finished);
        assert_eq!(session.total_errors, 1);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_reply_keeps_the_session_going() {
        let mut h = Harness::new(ScriptedBackend::new(vec![Ok(OPENING), Ok("")]));
        h.engine.handle(EngineCommand::StartSession);
        h.engine.handle(EngineCommand::UserInput("some juice".into()));

        let session = h.last_session();
        assert!(session.accepts_input());
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, Role::User);
    }

    #[test]
    fn summary_with_null_counts_finishes() {
        let backend = ScriptedBackend::new(vec![
            Ok(OPENING),
            Ok("Bye!\n{\"total_turns\":2,\"total_errors\":null,\"errors_by_type\":null,\"final_score\":1}"),
        ]);
        let mut h = Harness::new(backend);
        h.engine.handle(EngineCommand::StartSession);
        h.engine.handle(EngineCommand::UserInput("done".into()));

        let session = h.last_session();
        assert!(session.is_finished);
        assert_eq!(session.score, 1);
        assert_eq!(session.total_errors, 0);
    }

    #[test]
    fn input_before_start_is_ignored() {
        let backend = ScriptedBackend::new(vec![]);
        let calls = backend.calls.clone();
        let mut h = Harness::new(backend);

        h.engine.handle(EngineCommand::UserInput("some cake".into()));

        assert!(h.drain().is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn restart_begins_a_fresh_conversation() {
        let backend = ScriptedBackend::new(vec![Ok(OPENING), Ok(WRONG), Ok(OPENING)]);
        let calls = backend.calls.clone();
        let mut h = Harness::new(backend);
        h.engine.handle(EngineCommand::StartSession);
        h.engine.handle(EngineCommand::UserInput("any milk".into()));

        h.engine.handle(EngineCommand::StartSession);

        let session = h.last_session();
        assert_eq!(session.total_errors, 0);
        assert_eq!(session.messages.len(), 1);
        // Third request carries only the opening message again.
        assert_eq!(calls.lock().unwrap()[2].len(), 1);
    }

    #[test]
    fn connection_check_reports_backend_status() {
        let mut h = Harness::new(ScriptedBackend::new(vec![]));
        h.engine.handle(EngineCommand::CheckConnection);

        let responses = h.drain();
        assert!(matches!(
            responses.as_slice(),
            [EngineResponse::ConnectionStatus(Ok(msg))] if msg.contains("scripted")
        ));
    }

    #[test]
    fn settings_update_drops_the_backend() {
        let mut h = Harness::new(ScriptedBackend::new(vec![]));
        h.engine.handle(EngineCommand::UpdateSettings(TutorSettings::default()));

        assert!(h.engine.backend.is_none());
        assert!(h.engine.chat.is_none());
    }
}
