use crate::model::message::{Message, Role};

/// Where the role-play currently takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scene {
    #[default]
    Cafe,
    Market,
}

impl Scene {
    pub fn label(self) -> &'static str {
        match self {
            Scene::Cafe => "cafe",
            Scene::Market => "market",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cafe" | "café" => Some(Scene::Cafe),
            "market" => Some(Scene::Market),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Scene::Cafe => "Cafe",
            Scene::Market => "Market",
        }
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The closed set of mistake categories the tutor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MistakeKind {
    SomeAny,
    MuchMany,
    CountableUncountable,
    None,
    Other,
}

impl MistakeKind {
    pub const ALL: [MistakeKind; 5] = [
        MistakeKind::SomeAny,
        MistakeKind::MuchMany,
        MistakeKind::CountableUncountable,
        MistakeKind::None,
        MistakeKind::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MistakeKind::SomeAny => "some_any",
            MistakeKind::MuchMany => "much_many",
            MistakeKind::CountableUncountable => "countable_uncountable",
            MistakeKind::None => "none",
            MistakeKind::Other => "other",
        }
    }

    /// Exact wire label lookup. Anything outside the closed set is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Human-facing name, e.g. "Countable Uncountable".
    pub fn display_name(self) -> String {
        self.label()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn index(self) -> usize {
        match self {
            MistakeKind::SomeAny => 0,
            MistakeKind::MuchMany => 1,
            MistakeKind::CountableUncountable => 2,
            MistakeKind::None => 3,
            MistakeKind::Other => 4,
        }
    }
}

/// One counter per [`MistakeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MistakeTally {
    counts: [u32; 5],
}

impl MistakeTally {
    pub fn get(&self, kind: MistakeKind) -> u32 {
        self.counts[kind.index()]
    }

    pub fn set(&mut self, kind: MistakeKind, count: u32) {
        self.counts[kind.index()] = count;
    }

    pub fn increment(&mut self, kind: MistakeKind) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(1);
    }

    pub fn iter(&self) -> impl Iterator<Item = (MistakeKind, u32)> + '_ {
        MistakeKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Categories worth showing to the learner: non-zero and not `none`.
    pub fn reportable(&self) -> impl Iterator<Item = (MistakeKind, u32)> + '_ {
        self.iter()
            .filter(|(kind, count)| *kind != MistakeKind::None && *count > 0)
    }
}

/// State of one tutoring conversation.
///
/// The engine owns the authoritative copy and replaces it wholesale after
/// every reducer step; the UI only ever sees snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub is_active: bool,
    pub scene: Scene,
    pub score: i64,
    pub total_errors: u32,
    pub mistakes: MistakeTally,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_finished: bool,

    next_message_id: u64,
}

impl Session {
    pub(crate) fn push_message(&mut self, role: Role, text: impl Into<String>) -> &mut Message {
        self.next_message_id += 1;
        self.messages
            .push(Message::new(self.next_message_id, role, text));
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    /// Number of exchanged messages, shown as "turns" on the summary card.
    pub fn total_turns(&self) -> usize {
        self.messages.len()
    }

    pub fn accepts_input(&self) -> bool {
        self.is_active && !self.is_loading && !self.is_finished
    }
}
