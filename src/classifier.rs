use unicode_general_category::{get_general_category, GeneralCategory};

/// Command token that forces translation mode. Matched case-insensitively.
const TRANSLATE_PREFIX: &str = "/t ";

/// A text message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Raw message text, not yet trimmed
    pub text: String,
    /// Opaque token required to reply into the same conversation
    pub reply_token: String,
}

impl IncomingMessage {
    pub fn new(text: impl Into<String>, reply_token: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_token: reply_token.into(),
        }
    }

    /// Whether the trimmed text starts with the `/t ` command
    pub fn has_command_prefix(&self) -> bool {
        strip_translate_prefix(self.text.trim()).is_some()
    }
}

/// Processing strategy for a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Translate,
    AutoTutor,
    Ignore,
}

/// A mode together with the text the prompt builder should receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub mode: Mode,
    /// Post-prefix remainder for `Translate`, trimmed text for `AutoTutor`,
    /// empty for `Ignore`.
    pub payload: &'a str,
}

/// Decide which mode applies to a raw message and return the payload for
/// that mode.
pub fn classify_with_payload(raw_text: &str) -> Classification<'_> {
    let text = raw_text.trim();

    if let Some(payload) = strip_translate_prefix(text) {
        return Classification {
            mode: Mode::Translate,
            payload,
        };
    }

    let has_letter = text.chars().any(is_letter);
    let enough_tokens = text.split_whitespace().nth(1).is_some();

    if has_letter && enough_tokens {
        Classification {
            mode: Mode::AutoTutor,
            payload: text,
        }
    } else {
        Classification {
            mode: Mode::Ignore,
            payload: "",
        }
    }
}

/// True for general category L* (Lu, Ll, Lt, Lm, Lo). Letter numbers like
/// `Ⅻ` and symbols like `Ⓐ` are alphabetic but not letters.
fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// Returns the remainder after `/t ` if `text` starts with it (any case).
fn strip_translate_prefix(text: &str) -> Option<&str> {
    let head = text.get(..TRANSLATE_PREFIX.len())?;
    if head.eq_ignore_ascii_case(TRANSLATE_PREFIX) {
        Some(&text[TRANSLATE_PREFIX.len()..])
    } else {
        None
    }
}
