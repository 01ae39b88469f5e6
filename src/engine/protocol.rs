use crate::model::session::Session;
use crate::ui::settings::TutorSettings;

pub enum EngineCommand {
    /// Starts a session, or restarts the current one from scratch.
    StartSession,
    UserInput(String),
    UpdateSettings(TutorSettings),
    CheckConnection,
}

pub enum EngineResponse {
    /// Full snapshot after every state change.
    Session(Session),

    /// The session could not be started; shown as a blocking notice.
    StartFailed(String),

    ConnectionStatus(Result<String, String>),
}
