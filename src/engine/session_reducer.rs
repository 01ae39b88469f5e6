use crate::model::message::Role;
use crate::model::reduce_outcome::ReduceOutcome;
use crate::model::session::{MistakeKind, Scene, Session};
use crate::model::tutor_reply::{ParsedReply, SessionSummary, TurnMetadata};

/// Fresh state for a new (or restarted) session, waiting on the opening reply.
pub fn start_session() -> Session {
    let mut session = Session::default();
    session.is_active = true;
    session.is_loading = true;
    session
}

/// Applies the tutor's opening line. Score and counters are left alone.
///
/// The opening is always logged, even when empty, so the conversation never
/// starts blank.
pub fn apply_opening(session: &Session, reply: &ParsedReply) -> Session {
    let mut next = session.clone();
    let opening = next.push_message(Role::Tutor, reply.display_text.as_str());
    opening.is_error = reply.block_rejected;
    next.scene = reply
        .turn_metadata()
        .and_then(|meta| meta.scene)
        .unwrap_or(Scene::Cafe);
    next.is_loading = false;
    next
}

/// The opening request failed: back to the start screen.
pub fn fail_start(session: &Session) -> Session {
    let mut next = session.clone();
    next.is_loading = false;
    next.is_active = false;
    next
}

/// Records the learner's message before the reply is known.
pub fn begin_turn(session: &Session, user_text: &str) -> Session {
    let mut next = session.clone();
    next.push_message(Role::User, user_text);
    next.is_loading = true;
    next
}

/// The send failed. The optimistic user message stays; nothing is rolled back.
pub fn fail_turn(session: &Session) -> Session {
    let mut next = session.clone();
    next.is_loading = false;
    next
}

/// Folds a parsed reply into the session.
///
/// A summary is terminal and takes precedence: turn metadata is never
/// applied alongside it.
pub fn apply_reply(session: &Session, reply: &ParsedReply) -> (Session, ReduceOutcome) {
    let mut next = session.clone();
    push_tutor_text(&mut next, reply);
    next.is_loading = false;

    let outcome = if let Some(summary) = reply.session_summary() {
        apply_summary(&mut next, summary)
    } else if let Some(meta) = reply.turn_metadata() {
        apply_turn(&mut next, meta)
    } else {
        ReduceOutcome::TextOnly
    };

    (next, outcome)
}

/// One whole learner turn: the user message plus the reply to it.
pub fn reduce(session: &Session, user_text: &str, reply: &ParsedReply) -> Session {
    apply_reply(&begin_turn(session, user_text), reply).0
}

fn push_tutor_text(session: &mut Session, reply: &ParsedReply) {
    if !reply.display_text.is_empty() {
        let message = session.push_message(Role::Tutor, reply.display_text.as_str());
        message.is_error = reply.block_rejected;
    }
}

fn apply_summary(session: &mut Session, summary: &SessionSummary) -> ReduceOutcome {
    session.is_finished = true;
    session.total_errors = summary.total_errors;
    session.score = summary.final_score;

    for (label, count) in &summary.errors_by_type {
        if let Some(kind) = MistakeKind::from_label(label) {
            session.mistakes.set(kind, *count);
        }
    }

    ReduceOutcome::Finished {
        final_score: summary.final_score,
    }
}

fn apply_turn(session: &mut Session, meta: &TurnMetadata) -> ReduceOutcome {
    if let Some(scene) = meta.scene {
        session.scene = scene;
    }

    let score_delta = meta.score_delta.unwrap_or(0);
    session.score = session.score.saturating_add(score_delta);

    // A category alone is informational; only an explicit `false` is an error.
    let error_recorded = meta.declares_mistake() && meta.is_marked_incorrect();
    if error_recorded {
        session.total_errors = session.total_errors.saturating_add(1);
        if let Some(kind) = meta.mistake_kind() {
            session.mistakes.increment(kind);
        }
    }

    ReduceOutcome::TurnApplied {
        scene: session.scene,
        score_delta,
        error_recorded,
    }
}
