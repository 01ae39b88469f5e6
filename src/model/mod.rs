pub mod message;
pub mod reduce_outcome;
pub mod session;
pub mod tutor_reply;
