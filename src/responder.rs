use std::sync::Arc;

use tracing::{debug, error, info};

use crate::classifier::{classify_with_payload, Mode};
use crate::llm::GenerationBackend;
use crate::prompt::PromptBuilder;

/// Sent to the user whenever the generation backend fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't process your message right now. Please try again later.";

/// Final decision for one incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Reply(String),
    NoReply,
}

/// Classifies a message, asks the backend, and turns the result into a reply.
/// Platform-agnostic and stateless apart from the injected backend.
pub struct Responder {
    backend: Arc<dyn GenerationBackend>,
    prompts: PromptBuilder,
}

impl Responder {
    pub fn new(backend: Arc<dyn GenerationBackend>, prompts: PromptBuilder) -> Self {
        Self { backend, prompts }
    }

    /// Decide the reply for `raw_text`. Never fails: backend errors become
    /// [`FALLBACK_REPLY`].
    pub async fn respond(&self, raw_text: &str) -> ReplyOutcome {
        let classification = classify_with_payload(raw_text);

        let prompt = match classification.mode {
            Mode::Ignore => {
                debug!("Ignoring message ({} chars)", raw_text.len());
                return ReplyOutcome::NoReply;
            }
            mode => match self.prompts.build(mode, classification.payload) {
                Some(prompt) => prompt,
                None => return ReplyOutcome::NoReply,
            },
        };

        info!(mode = ?classification.mode, payload_len = classification.payload.len(), "Generating reply");

        match self.backend.generate(&prompt).await {
            Ok(text) => ReplyOutcome::Reply(text),
            Err(e) => {
                error!(
                    mode = ?classification.mode,
                    timeout = e.is_timeout(),
                    "Generation backend failed: {e}"
                );
                ReplyOutcome::Reply(FALLBACK_REPLY.to_string())
            }
        }
    }
}
