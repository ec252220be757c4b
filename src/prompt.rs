use crate::classifier::Mode;

/// Marker the tutor prompt asks the model to put in front of each suggestion.
pub const SUGGESTION_MARKER: &str = "💡 Suggested phrasing:";

pub const DEFAULT_NATIVE_LANGUAGE: &str = "Traditional Chinese";

/// Instruction text sent to the generation backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the instruction text for each mode.
///
/// The only input besides `(mode, text)` is the learner's native language,
/// fixed at construction, so the same inputs always give the same prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    native_language: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_NATIVE_LANGUAGE)
    }
}

impl PromptBuilder {
    pub fn new(native_language: impl Into<String>) -> Self {
        Self {
            native_language: native_language.into(),
        }
    }

    /// Build the prompt for `mode`. Returns `None` for [`Mode::Ignore`],
    /// which never reaches the backend.
    pub fn build(&self, mode: Mode, text: &str) -> Option<Prompt> {
        let prompt = match mode {
            Mode::Translate => translate_prompt(text),
            Mode::AutoTutor => self.tutor_prompt(text),
            Mode::Ignore => return None,
        };
        Some(Prompt(prompt))
    }

    fn tutor_prompt(&self, text: &str) -> String {
        let lang = &self.native_language;
        format!(
            "You are a friendly English tutor helping students in a LINE group chat.\n\
             User message: '{text}'\n\
             \n\
             Tasks:\n\
             1. If the message is in English, first translate it into {lang} and point out any grammar mistakes.\n\
             2. If there are more natural (native-speaker) ways to say it, list each one on its own line starting with '{SUGGESTION_MARKER}'.\n\
             3. If the message is very short (for example: Hello, OK), just greet the user briefly without detailed analysis."
        )
    }
}

fn translate_prompt(text: &str) -> String {
    format!(
        "Translate the following text into natural, idiomatic English, \
         and give two versions: one formal and one informal: '{text}'"
    )
}
