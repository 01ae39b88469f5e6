use crate::model::session::Scene;

/// What a reply did to the session. Used for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// No structured block: only the message log changed.
    TextOnly,
    TurnApplied {
        scene: Scene,
        score_delta: i64,
        error_recorded: bool,
    },
    Finished {
        final_score: i64,
    },
}
