//! Response composition: prompt building, generation, and post-processing.
//!
//! Every response that leaves this module contains every mandatory
//! keyword (case-insensitive) and, for Korean output, only characters from
//! the supported charset. Keyword presence is enforced by appending a
//! closing clause, so it holds even when the model ignores the instruction.

use tracing::{debug, info, warn};

use crate::language::{self, Language};
use crate::llm::GenerationClient;
use crate::sanitize::{ASCII_AND_HANGUL, CharsetPolicy};
use crate::stop::StopSignal;
use crate::surface::ActionKind;

/// Default English persona line.
pub const DEFAULT_ENGLISH_PERSONA: &str =
    "You are a friendly, casual commenter in your twenties.";

/// Persona and style text supplied by configuration.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// Korean persona/system prompt for replies.
    pub respond_persona: String,
    /// Korean persona for quote comments. Falls back to `respond_persona`.
    pub requote_persona: Option<String>,
    /// Persona line for English output.
    pub english_persona: String,
}

impl PromptTemplates {
    pub fn new(respond_persona: impl Into<String>) -> Self {
        Self {
            respond_persona: respond_persona.into(),
            requote_persona: None,
            english_persona: DEFAULT_ENGLISH_PERSONA.to_string(),
        }
    }

    fn korean_persona(&self, kind: ActionKind) -> &str {
        match kind {
            ActionKind::Respond => &self.respond_persona,
            ActionKind::Requote => self
                .requote_persona
                .as_deref()
                .unwrap_or(&self.respond_persona),
        }
    }
}

/// A composed response, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub text: String,
    pub language: Language,
    pub keywords_satisfied: bool,
    /// Keywords the model left out and that were appended afterwards.
    pub appended_keywords: Vec<String>,
}

/// Builds prompts, calls the generation client and post-processes replies.
pub struct ResponseComposer {
    client: GenerationClient,
    templates: PromptTemplates,
    keywords: Vec<String>,
    charset: CharsetPolicy,
    stop: StopSignal,
}

impl ResponseComposer {
    pub fn new(
        client: GenerationClient,
        templates: PromptTemplates,
        keywords: Vec<String>,
        stop: StopSignal,
    ) -> Self {
        Self {
            client,
            templates,
            keywords,
            charset: ASCII_AND_HANGUL,
            stop,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    /// Compose a response to `source` framed for `kind`.
    ///
    /// Returns `None` when generation fails or the engine is stopping.
    pub async fn compose(&mut self, source: &str, kind: ActionKind) -> Option<GeneratedResponse> {
        let language = language::detect(source);
        let prompt = build_prompt(&self.templates, source, language, kind, &self.keywords);

        let raw = match self.client.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(kind = kind.label(), error = %e, "Composition failed");
                return None;
            }
        };
        if self.stop.is_stopped() {
            debug!("Stop requested after generation; discarding reply");
            return None;
        }

        let text = match language {
            Language::Korean => self.charset.apply(&raw),
            Language::English => raw.trim().to_string(),
        };
        let (text, appended_keywords) = ensure_keywords(text, language, &self.keywords);

        info!(
            kind = kind.label(),
            language = %language,
            chars = text.chars().count(),
            appended = appended_keywords.len(),
            "Composed response"
        );

        Some(GeneratedResponse {
            text,
            language,
            keywords_satisfied: true,
            appended_keywords,
        })
    }
}

fn keyword_instruction(keywords: &[String]) -> String {
    if keywords.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nIMPORTANT: You must naturally include these keywords: {}",
            keywords.join(", ")
        )
    }
}

/// Build the generation prompt for one action.
pub fn build_prompt(
    templates: &PromptTemplates,
    source: &str,
    language: Language,
    kind: ActionKind,
    keywords: &[String],
) -> String {
    let keywords = keyword_instruction(keywords);
    match (language, kind) {
        (Language::Korean, ActionKind::Respond) => format!(
            "{}\n\n게시물 내용: \"{source}\"{keywords}\n\n너의 한국어 답변:",
            templates.korean_persona(kind)
        ),
        (Language::Korean, ActionKind::Requote) => format!(
            "{}\n\n인용할 게시물 내용: \"{source}\"{keywords}\n\n너의 한국어 인용 코멘트:",
            templates.korean_persona(kind)
        ),
        (Language::English, ActionKind::Respond) => format!(
            "{} Respond in casual English to this post. \
             Post: \"{source}\"{keywords}\n\nYour English reply:",
            templates.english_persona
        ),
        (Language::English, ActionKind::Requote) => format!(
            "{} Write a casual English comment quoting this post. \
             Post to quote: \"{source}\"{keywords}\n\nYour English quote comment:",
            templates.english_persona
        ),
    }
}

/// Append any keyword missing from `text`. Returns the final text and the
/// keywords that had to be appended.
///
/// Runs after charset filtering, so appended keywords are kept verbatim even
/// when they contain characters the filter would drop.
pub fn ensure_keywords(
    mut text: String,
    language: Language,
    keywords: &[String],
) -> (String, Vec<String>) {
    let lower = text.to_lowercase();
    let missing: Vec<String> = keywords
        .iter()
        .filter(|kw| !lower.contains(&kw.to_lowercase()))
        .cloned()
        .collect();

    if missing.is_empty() {
        return (text, missing);
    }

    debug!(missing = ?missing, "Appending missing keywords");
    match language {
        Language::English => {
            text.push_str(&format!(" Also, talking about {}.", missing.join(", ")));
        }
        Language::Korean => {
            text.push(' ');
            text.push_str(&missing.join(" "));
        }
    }
    (text, missing)
}
