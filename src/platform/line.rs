use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LineConfig;
use crate::platform::{ReplyError, ReplySender};

/// LINE rejects text message objects longer than this (in characters).
const MAX_TEXT_CHARS: usize = 5000;

/// LINE accepts at most this many message objects per reply.
const MAX_MESSAGES_PER_REPLY: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

/// LINE Messaging API client (reply endpoint only)
pub struct LineClient {
    client: reqwest::Client,
    access_token: SecretString,
    api_base: String,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.channel_access_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError> {
        let messages = text_messages(text, MAX_TEXT_CHARS);

        let request = ReplyRequest {
            reply_token,
            messages,
        };

        let url = format!("{}/v2/bot/message/reply", self.api_base);
        debug!("Sending {} message(s) to LINE", request.messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Status { status, body });
        }

        Ok(())
    }
}

/// Chunk `text` into at most [`MAX_MESSAGES_PER_REPLY`] text messages.
fn text_messages(text: &str, max_chars: usize) -> Vec<TextMessage> {
    let chunks = split_message(text, max_chars);
    if chunks.len() > MAX_MESSAGES_PER_REPLY {
        warn!(
            dropped = chunks.len() - MAX_MESSAGES_PER_REPLY,
            "Reply too long for one LINE reply, dropping trailing chunks"
        );
    }

    chunks
        .into_iter()
        .take(MAX_MESSAGES_PER_REPLY)
        .map(|chunk| TextMessage { kind: "text", text: chunk })
        .collect()
}

/// Split text into chunks of at most `max_chars` characters, preferring to
/// break after a newline or space.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // byte offset just past the first `max_chars` characters
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let actual_end = if end < rest.len() {
            rest[..end]
                .rfind('\n')
                .or_else(|| rest[..end].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(rest[..actual_end].to_string());
        rest = &rest[actual_end..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> LineClient {
        LineClient::new(&LineConfig {
            channel_access_token: SecretString::new("access-token".to_string()),
            channel_secret: SecretString::new("secret".to_string()),
            api_base: api_base.to_string(),
        })
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_split_prefers_whitespace() {
        let chunks = split_message("aaaa bbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa bbbb\n", "cccc"]);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let text = "你好".repeat(6);
        let chunks = split_message(&text, 5);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_overlong_reply_is_capped_and_logged() {
        let (logs, _guard) = crate::test_support::capture_logs();

        let messages = text_messages(&"a".repeat(20), 3);

        assert_eq!(messages.len(), MAX_MESSAGES_PER_REPLY);
        assert!(messages.iter().all(|m| m.text == "aaa"));
        let out = logs.contents();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("dropped=2"), "{out}");
    }

    #[test]
    fn test_fitting_reply_logs_nothing() {
        let (logs, _guard) = crate::test_support::capture_logs();

        let messages = text_messages(&"a".repeat(15), 3);

        assert_eq!(messages.len(), 5);
        assert!(logs.contents().is_empty());
    }

    #[tokio::test]
    async fn test_reply_posts_text_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/bot/message/reply")
            .match_header("authorization", "Bearer access-token")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "replyToken": "token-1",
                "messages": [{"type": "text", "text": "Nice to meet you!"}]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(&server.url())
            .reply("token-1", "Nice to meet you!")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reply_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/bot/message/reply")
            .with_status(400)
            .with_body(r#"{"message":"Invalid reply token"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .reply("expired", "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ReplyError::Status { status, .. } if status.as_u16() == 400));
    }
}
