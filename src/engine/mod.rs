pub mod engine;
pub mod protocol;
pub mod session_reducer;

pub mod llm_client;
pub mod prompt;
pub mod response_parser;
