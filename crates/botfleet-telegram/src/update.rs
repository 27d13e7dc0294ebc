// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lenient view over an inbound Telegram update.
//!
//! The gateway only needs `update_id` for dedup and a chat id plus text for
//! the reply path, so these types model just that slice of the wire format.
//! Unknown fields and unhandled update kinds deserialize fine and simply
//! yield no chat id.

use serde::Deserialize;

/// Top-level Telegram update, as delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEnvelope {
    /// Monotonic per-bot update sequence number. Required for admission;
    /// its absence marks the payload malformed.
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<MessageView>,
    #[serde(default)]
    pub edited_message: Option<MessageView>,
    #[serde(default)]
    pub callback_query: Option<CallbackQueryView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageView {
    pub chat: ChatView,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatView {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQueryView {
    #[serde(default)]
    pub message: Option<MessageView>,
    #[serde(default)]
    pub data: Option<String>,
}

impl UpdateEnvelope {
    /// Parse a raw update body. Fails only on structural mismatches (wrong
    /// JSON types), never on unknown fields.
    pub fn parse(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(raw.clone())
    }

    /// The chat to reply into, if this update kind carries one.
    pub fn chat_id(&self) -> Option<i64> {
        if let Some(message) = &self.message {
            return Some(message.chat.id);
        }
        if let Some(edited) = &self.edited_message {
            return Some(edited.chat.id);
        }
        if let Some(callback) = &self.callback_query {
            return callback.message.as_ref().map(|m| m.chat.id);
        }
        None
    }

    /// The user-visible text of the update: message text, or callback data
    /// for button presses.
    pub fn text(&self) -> Option<&str> {
        if let Some(message) = &self.message {
            return message.text.as_deref();
        }
        if let Some(edited) = &self.edited_message {
            return edited.text.as_deref();
        }
        if let Some(callback) = &self.callback_query {
            return callback.data.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_message_update() {
        let raw = json!({
            "update_id": 857169051,
            "message": {
                "message_id": 42,
                "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
                "chat": {"id": 556677, "type": "private"},
                "date": 1755950000,
                "text": "hello there"
            }
        });
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.update_id, Some(857169051));
        assert_eq!(update.chat_id(), Some(556677));
        assert_eq!(update.text(), Some("hello there"));
    }

    #[test]
    fn parses_edited_message() {
        let raw = json!({
            "update_id": 1,
            "edited_message": {
                "message_id": 42,
                "chat": {"id": -100123, "type": "supergroup"},
                "date": 1755950000,
                "edit_date": 1755950100,
                "text": "fixed typo"
            }
        });
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.chat_id(), Some(-100123));
        assert_eq!(update.text(), Some("fixed typo"));
    }

    #[test]
    fn parses_callback_query() {
        let raw = json!({
            "update_id": 2,
            "callback_query": {
                "id": "4382bfdwdsb323b2d9",
                "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
                "message": {
                    "message_id": 99,
                    "chat": {"id": 556677, "type": "private"},
                    "date": 1755950000
                },
                "data": "menu:settings"
            }
        });
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.chat_id(), Some(556677));
        assert_eq!(update.text(), Some("menu:settings"));
    }

    #[test]
    fn message_without_text_yields_chat_but_no_text() {
        let raw = json!({
            "update_id": 3,
            "message": {
                "message_id": 42,
                "chat": {"id": 1, "type": "private"},
                "date": 1755950000,
                "photo": [{"file_id": "abc", "width": 90, "height": 90}]
            }
        });
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.chat_id(), Some(1));
        assert_eq!(update.text(), None);
    }

    #[test]
    fn unhandled_update_kind_parses_without_chat() {
        // my_chat_member is never in allowed_updates, but a hostile or stale
        // sender could still POST one.
        let raw = json!({
            "update_id": 4,
            "my_chat_member": {
                "chat": {"id": 5, "type": "private"},
                "date": 1755950000
            }
        });
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.update_id, Some(4));
        assert_eq!(update.chat_id(), None);
        assert_eq!(update.text(), None);
    }

    #[test]
    fn missing_update_id_is_detectable() {
        let raw = json!({"message": {"chat": {"id": 1, "type": "private"}}});
        let update = UpdateEnvelope::parse(&raw).unwrap();
        assert_eq!(update.update_id, None);
    }

    #[test]
    fn non_object_body_fails_to_parse() {
        assert!(UpdateEnvelope::parse(&json!(5)).is_err());
        assert!(UpdateEnvelope::parse(&json!("update")).is_err());
        assert!(UpdateEnvelope::parse(&json!([1, 2])).is_err());
    }
}
