//! Conversation types and state management

use serde::{Deserialize, Serialize};

/// Client-assigned turn identifier, unique within a conversation.
pub type TurnId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TurnId>,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// In-progress marker: set while the assistant answer is still streaming.
    #[serde(
        default,
        rename = "isTyping",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_typing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

impl Turn {
    pub fn user(id: TurnId, content: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            role: Role::User,
            content: content.into(),
            name: None,
            is_typing: false,
        }
    }

    /// Empty assistant turn that receives the streamed answer.
    pub fn placeholder(id: TurnId) -> Self {
        Self {
            id: Some(id),
            role: Role::Assistant,
            content: String::new(),
            name: None,
            is_typing: true,
        }
    }

    /// Named developer instruction, as injected by the relay.
    pub fn instruction(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::Developer,
            content: content.into(),
            name: Some(name.into()),
            is_typing: false,
        }
    }
}

/// Ordered prompt history, owned by the client for the session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    last_id: TurnId,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == Some(id))
    }

    /// Time-derived id, strictly greater than any id handed out before.
    fn next_id(&mut self) -> TurnId {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    pub fn add_user(&mut self, content: &str) -> TurnId {
        let id = self.next_id();
        self.turns.push(Turn::user(id, content));
        id
    }

    /// Push an assistant placeholder. Any turn still marked in progress is
    /// finalized first so at most one turn streams at a time.
    pub fn add_placeholder(&mut self) -> TurnId {
        self.clear_in_progress();
        let id = self.next_id();
        self.turns.push(Turn::placeholder(id));
        id
    }

    /// Queue a user message followed by the assistant placeholder, returning
    /// the placeholder id.
    pub fn begin_exchange(&mut self, input: &str) -> TurnId {
        self.clear_in_progress();
        self.add_user(input);
        self.add_placeholder()
    }

    pub fn in_progress(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.is_typing)
    }

    /// Append streamed text to the turn with `id`. Returns false when no such
    /// turn exists.
    pub fn append(&mut self, id: TurnId, text: &str) -> bool {
        match self.turns.iter_mut().find(|t| t.id == Some(id)) {
            Some(turn) => {
                turn.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Clear the in-progress marker on every turn.
    pub fn clear_in_progress(&mut self) {
        for turn in &mut self.turns {
            turn.is_typing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_wire_format() {
        let turn: Turn =
            serde_json::from_str(r#"{"id":2,"role":"assistant","content":"","isTyping":true}"#)
                .unwrap();
        assert_eq!(turn, Turn::placeholder(2));

        let json = serde_json::to_value(Turn::user(1, "Hi")).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "role": "user", "content": "Hi"}));

        let json = serde_json::to_value(Turn::instruction("Sonic", "Be fast")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "developer", "content": "Be fast", "name": "Sonic"})
        );
    }

    #[test]
    fn test_rejects_unknown_role() {
        let result = serde_json::from_str::<Turn>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<Turn>(r#"{"role":"user","content":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut conversation = Conversation::new();
        let a = conversation.add_user("one");
        let b = conversation.add_user("two");
        let c = conversation.add_placeholder();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_append_matches_by_id() {
        let mut conversation = Conversation::new();
        let target = conversation.begin_exchange("Hi");
        conversation.add_user("interleaved");

        assert!(conversation.append(target, "Hel"));
        assert!(conversation.append(target, "lo!"));
        assert!(!conversation.append(target + 1000, "lost"));

        assert_eq!(conversation.get(target).unwrap().content, "Hello!");
        assert_eq!(conversation.turns().last().unwrap().content, "interleaved");
    }

    #[test]
    fn test_single_turn_in_progress() {
        let mut conversation = Conversation::new();
        let first = conversation.begin_exchange("a");
        let second = conversation.begin_exchange("b");

        assert_eq!(conversation.in_progress().and_then(|t| t.id), Some(second));
        assert!(!conversation.get(first).unwrap().is_typing);

        conversation.clear_in_progress();
        let snapshot = conversation.turns().to_vec();
        conversation.clear_in_progress();
        assert_eq!(conversation.turns(), snapshot.as_slice());
        assert!(conversation.in_progress().is_none());
    }
}
