use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity of a user-facing message. Serialized names double as the CSS
/// alert classes of the browser front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Danger,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Success => write!(f, "success"),
            Level::Warning => write!(f, "warning"),
            Level::Danger => write!(f, "danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Result of a single step invocation.
///
/// Every handler returns its own outcome; nothing is accumulated across
/// invocations on the server side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub success: bool,
    pub messages: Vec<Message>,
}

impl StepOutcome {
    /// Successful outcome without messages (idempotent no-ops).
    pub fn ok() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::ok().with(Level::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![Message::new(Level::Warning, text)],
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![Message::new(Level::Danger, text)],
        }
    }

    pub fn with(mut self, level: Level, text: impl Into<String>) -> Self {
        self.messages.push(Message::new(level, text));
        self
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages.iter().filter(|m| m.level == level).count()
    }
}

/// Wire shape of a step response: messages grouped by level, each group in
/// emission order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepResponse {
    pub success: bool,
    #[serde(default)]
    pub messages: BTreeMap<Level, Vec<String>>,
}

impl StepResponse {
    /// Flatten back into messages, grouped by level.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
            .into_iter()
            .flat_map(|(level, texts)| texts.into_iter().map(move |t| Message::new(level, t)))
            .collect()
    }
}

impl From<StepOutcome> for StepResponse {
    fn from(outcome: StepOutcome) -> Self {
        let mut messages: BTreeMap<Level, Vec<String>> = BTreeMap::new();
        for message in outcome.messages {
            messages.entry(message.level).or_default().push(message.text);
        }
        Self {
            success: outcome.success,
            messages,
        }
    }
}
