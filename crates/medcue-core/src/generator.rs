//! Localized reminder message generation with deterministic fallback.
//!
//! One outbound call to a Gemini-style text-generation endpoint, bounded by
//! connect/read timeouts. Any transport error, non-success status, or
//! malformed/empty response resolves to the offline fallback message, so
//! resolution never fails.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::reminder::{FiringPayload, Language};
use crate::storage::GeneratorConfig;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// What to say, to whom, in which language.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    pub medicine_name: String,
    pub dosage: String,
    /// `Some(minutes)` for an early firing, `None` for the main firing.
    pub early_minutes: Option<i64>,
    pub language: Language,
}

impl MessageRequest {
    pub fn from_payload(payload: &FiringPayload, language: Language) -> Self {
        Self {
            medicine_name: payload.medicine_name.clone(),
            dosage: payload.dosage.clone(),
            early_minutes: payload.is_early().then_some(payload.minutes_remaining),
            language,
        }
    }
}

/// A resolved spoken message, generated or fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub text: String,
    pub used_fallback: bool,
}

/// Seam between the orchestrator and message resolution.
///
/// Implementations start resolution in the background and must always
/// complete the returned channel -- by fallback if nothing else.
pub trait MessageSource: Send + Sync {
    fn start_resolve(&self, request: MessageRequest) -> oneshot::Receiver<ResolvedMessage>;
}

// ── Wire format ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

// ── Generator ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MessageGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl MessageGenerator {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        Self::new(&config.endpoint, &config.api_key)
    }

    /// Build the natural-language instruction for the generation service.
    ///
    /// Early firings embed the literal minutes-remaining value so the
    /// generated message states the true remaining time.
    pub fn build_prompt(request: &MessageRequest) -> String {
        let language_clause = match request.language {
            Language::English => "Write the message in English.",
            Language::Malayalam => "Write the message in Malayalam.",
            Language::Hindi => "Write the message in Hindi.",
        };

        match request.early_minutes {
            Some(minutes) => format!(
                "Generate a friendly, caring reminder message (max 2 sentences) for a patient. \
                 Their medicine '{}' (dosage: {}) is due in {} minutes. \
                 State the exact number of minutes remaining. \
                 The message should be warm and encouraging, reminding them to prepare. \
                 Keep it natural and conversational, like a caring friend would speak. {}",
                request.medicine_name, request.dosage, minutes, language_clause
            ),
            None => format!(
                "Generate a friendly, caring reminder message (max 2 sentences) for a patient. \
                 It's time to take their medicine '{}' (dosage: {}). \
                 The message should be warm, encouraging, and emphasize the importance of \
                 taking medication on time. \
                 Keep it natural and conversational, like a caring friend would speak. {}",
                request.medicine_name, request.dosage, language_clause
            ),
        }
    }

    /// One outbound generation call. Never panics; every failure mode maps
    /// to a [`GenerationError`].
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::HttpStatus(status.as_u16()));
        }

        let raw = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&raw)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyMessage);
        }
        Ok(text)
    }

    /// Pure offline message, indistinguishable in intent from the generated
    /// one. Always embeds medicine name, dosage, and (for early firings) the
    /// literal minutes-remaining.
    pub fn fallback(request: &MessageRequest) -> String {
        let name = &request.medicine_name;
        let dosage = &request.dosage;
        match (request.language, request.early_minutes) {
            (Language::English, Some(minutes)) => format!(
                "Hello! Just a gentle reminder that you need to take {name} ({dosage}) \
                 in {minutes} minutes. Please prepare your medication now."
            ),
            (Language::English, None) => format!(
                "It's time to take your medicine! Please take {name}, dosage {dosage}. \
                 Taking your medication on time is important for your health."
            ),
            (Language::Malayalam, Some(minutes)) => format!(
                "നമസ്കാരം! {name} ({dosage}) {minutes} മിനിറ്റിനുള്ളിൽ കഴിക്കേണ്ടതാണ്. \
                 ദയവായി മരുന്ന് ഇപ്പോൾ തയ്യാറാക്കി വയ്ക്കുക."
            ),
            (Language::Malayalam, None) => format!(
                "{name} ({dosage}) കഴിക്കേണ്ട സമയമായി. \
                 കൃത്യസമയത്ത് മരുന്ന് കഴിക്കുന്നത് ആരോഗ്യത്തിന് വളരെ പ്രധാനമാണ്."
            ),
            (Language::Hindi, Some(minutes)) => format!(
                "नमस्ते! याद दिला रहे हैं कि {name} ({dosage}) {minutes} मिनट में लेनी है। \
                 कृपया अपनी दवा अभी तैयार रखें।"
            ),
            (Language::Hindi, None) => format!(
                "दवा लेने का समय हो गया है! कृपया {name} ({dosage}) लें। \
                 समय पर दवा लेना आपके स्वास्थ्य के लिए ज़रूरी है।"
            ),
        }
    }

    /// Resolve the spoken message: generated when the service cooperates,
    /// fallback on any failure. Infallible by construction.
    pub async fn resolve(&self, request: &MessageRequest) -> ResolvedMessage {
        let prompt = Self::build_prompt(request);
        match self.generate(&prompt).await {
            Ok(text) => {
                debug!("generation succeeded");
                ResolvedMessage {
                    text,
                    used_fallback: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "message generation failed, using fallback");
                ResolvedMessage {
                    text: Self::fallback(request),
                    used_fallback: true,
                }
            }
        }
    }
}

impl MessageSource for MessageGenerator {
    /// Spawns resolution on a background task. Requires a tokio runtime.
    fn start_resolve(&self, request: MessageRequest) -> oneshot::Receiver<ResolvedMessage> {
        let (tx, rx) = oneshot::channel();
        let generator = self.clone();
        tokio::spawn(async move {
            let _ = tx.send(generator.resolve(&request).await);
        });
        rx
    }
}

/// Fallback-only source: never touches the network.
pub struct OfflineMessageSource;

impl MessageSource for OfflineMessageSource {
    fn start_resolve(&self, request: MessageRequest) -> oneshot::Receiver<ResolvedMessage> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(ResolvedMessage {
            text: MessageGenerator::fallback(&request),
            used_fallback: true,
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn request(language: Language, early_minutes: Option<i64>) -> MessageRequest {
        MessageRequest {
            medicine_name: "Metformin".to_string(),
            dosage: "500mg".to_string(),
            early_minutes,
            language,
        }
    }

    fn valid_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
        .to_string()
    }

    #[test]
    fn early_prompt_states_the_literal_minutes() {
        let prompt = MessageGenerator::build_prompt(&request(Language::English, Some(7)));
        assert!(prompt.contains("due in 7 minutes"));
        assert!(prompt.contains("Metformin"));
        assert!(prompt.contains("500mg"));
    }

    #[test]
    fn main_prompt_asks_for_a_take_now_message() {
        let prompt = MessageGenerator::build_prompt(&request(Language::Hindi, None));
        assert!(prompt.contains("It's time to take their medicine"));
        assert!(prompt.contains("Write the message in Hindi."));
        assert!(!prompt.contains("minutes"));
    }

    #[test]
    fn fallback_embeds_name_dosage_and_minutes_in_every_language() {
        for language in [Language::English, Language::Malayalam, Language::Hindi] {
            let early = MessageGenerator::fallback(&request(language, Some(5)));
            assert!(early.contains("Metformin"), "{language:?}: {early}");
            assert!(early.contains("500mg"), "{language:?}: {early}");
            assert!(early.contains('5'), "{language:?}: {early}");

            let main = MessageGenerator::fallback(&request(language, None));
            assert!(main.contains("Metformin"), "{language:?}: {main}");
            assert!(main.contains("500mg"), "{language:?}: {main}");
        }
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = MessageGenerator::fallback(&request(Language::Malayalam, Some(3)));
        let b = MessageGenerator::fallback(&request(Language::Malayalam, Some(3)));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn generate_returns_the_trimmed_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(valid_body("  Time for your Metformin!  "))
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, "Time for your Metformin!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_typed_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_typed_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_candidates_is_an_empty_message_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyMessage));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_an_empty_message_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(valid_body("   "))
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyMessage));
    }

    #[tokio::test]
    async fn resolve_falls_back_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let generator =
            MessageGenerator::new(&format!("{}/generate", server.url()), "test-key").unwrap();
        let req = request(Language::English, Some(5));
        let resolved = generator.resolve(&req).await;

        assert!(resolved.used_fallback);
        assert_eq!(resolved.text, MessageGenerator::fallback(&req));
        assert!(resolved.text.contains("Metformin"));
        assert!(resolved.text.contains("5 minutes"));
    }

    #[tokio::test]
    async fn resolve_falls_back_on_unreachable_endpoint() {
        // Nothing listens here; the transport error must resolve to fallback.
        let generator = MessageGenerator::new("http://127.0.0.1:1/generate", "test-key").unwrap();
        let req = request(Language::Hindi, None);
        let resolved = generator.resolve(&req).await;
        assert!(resolved.used_fallback);
        assert_eq!(resolved.text, MessageGenerator::fallback(&req));
    }

    #[tokio::test]
    async fn offline_source_always_completes_with_fallback() {
        let req = request(Language::English, None);
        let resolved = OfflineMessageSource.start_resolve(req.clone()).await.unwrap();
        assert!(resolved.used_fallback);
        assert_eq!(resolved.text, MessageGenerator::fallback(&req));
    }
}
