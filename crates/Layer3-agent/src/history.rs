//! Conversation state for one turn
//!
//! append-only: 턴이 진행되는 동안 메시지는 추가만 되고 지워지지 않는다.
//! 실패한 턴의 기록도 그대로 호출자에게 돌려준다.

use chrono::{DateTime, Utc};
use stepwise_provider::{Message, MessageRole};
use uuid::Uuid;

/// Ordered message history of a single user turn
#[derive(Debug, Clone)]
pub struct Conversation {
    /// 로그에서 턴을 구분하는 ID
    id: Uuid,

    /// Messages in order, system prompt first
    messages: Vec<Message>,

    /// 이번 턴에서 발생한 transport 재시도 횟수
    retries: u32,

    /// 이번 턴에서 발생한 JSON 복구 요청 횟수
    repairs: u32,

    started_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a conversation with a system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![Message::system(system_prompt)],
            retries: 0,
            repairs: 0,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Add a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get last user message
    pub fn last_user(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn record_repair(&mut self) {
        self.repairs += 1;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn repairs(&self) -> u32 {
        self.repairs
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 턴 시작 후 경과 시간
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_first() {
        let mut conversation = Conversation::new("system");
        conversation.push_user("What is the weather of Paris?");
        conversation.push_assistant(r#"{"step":"think","content":"..."}"#);

        let roles: Vec<MessageRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(
            conversation.last_user().map(|m| m.content.as_str()),
            Some("What is the weather of Paris?")
        );
    }

    #[test]
    fn test_counters() {
        let mut conversation = Conversation::new("system");
        conversation.record_retry();
        conversation.record_retry();
        conversation.record_repair();

        assert_eq!(conversation.retries(), 2);
        assert_eq!(conversation.repairs(), 1);
        assert!(conversation.started_at() <= Utc::now());
        assert!(conversation.elapsed() >= chrono::Duration::zero());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_each_turn_has_own_id() {
        assert_ne!(Conversation::new("a").id(), Conversation::new("a").id());
    }
}
