#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Tutor,
}

/// One entry of the conversation log. Never edited once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub text: String,

    /// Tutor text whose tracking block could not be read; rendered tinted.
    pub is_error: bool,
}

impl Message {
    pub fn new(id: u64, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn is_tutor(&self) -> bool {
        self.role == Role::Tutor
    }
}
