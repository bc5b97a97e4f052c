//! Generation engine
//!
//! Turns one validated request into one structured marketing-copy result via
//! a single call to an external text-generation capability. The capability
//! is abstracted behind [`ChatModel`] so tests can substitute a scripted
//! fake; the production implementation speaks the OpenAI-compatible chat
//! completions protocol over HTTPS.
//!
//! No retries happen here. Retry policy, if any, belongs to the caller.

pub mod scrape;

use crate::config::GenerationConfig;
use crate::content::{
    prompts, CompetitorSnapshot, GenerationRequest, ImageAnalysisResult, ImageUpload, Language,
    ProductCopy, UrlAnalysisResult, ViralContent, VisualAttributes, WritingStyle,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use self::scrape::{is_supported_url, ProductPageFetcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Output bound for standard product copy
const MAX_TOKENS_COPY: u32 = 2000;

/// Output bound for competitor analysis and viral content
const MAX_TOKENS_ANALYSIS: u32 = 3000;

/// Output bound for image-grounded extraction
const MAX_TOKENS_VISION: u32 = 1000;

/// A single chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message pairing instruction text with an inline image
    pub fn user_with_image(text: impl Into<String>, image_data_url: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart {
                    kind: "text",
                    text: Some(text.into()),
                    image_url: None,
                },
                ContentPart {
                    kind: "image_url",
                    text: None,
                    image_url: Some(ImageUrl {
                        url: image_data_url.into(),
                    }),
                },
            ]),
        }
    }
}

/// Message content: plain text or multi-part (text + image)
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One bounded completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    /// Route to the image-capable model instead of the text model
    pub vision: bool,
}

/// Trait for the external text-generation capability
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the raw textual response
    async fn complete(&self, request: ChatRequest) -> Result<String>;

    /// Get the text model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completion client
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    vision_model: String,
    base_url: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    /// Create a new client from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "generation.api_key is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            base_url: config.api_base.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = if request.vision {
            &self.vision_model
        } else {
            &self.model
        };

        let body = CompletionRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: CompletionResponse =
            response.json().await.map_err(|e| AppError::Generation {
                message: format!("Failed to parse response: {}", e),
            })?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AppError::Generation {
                message: "No content generated".to_string(),
            });
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// The generation engine: prompt construction, one capability call per
/// artifact, response-shape validation.
pub struct CopyEngine {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    viral_temperature: f32,
    allowed_domains: Vec<String>,
}

impl CopyEngine {
    pub fn new(model: Arc<dyn ChatModel>, config: &GenerationConfig, allowed_domains: Vec<String>) -> Self {
        Self {
            model,
            temperature: config.temperature,
            viral_temperature: config.viral_temperature,
            allowed_domains,
        }
    }

    /// Generate standard product copy for one validated request
    pub async fn generate(&self, request: &GenerationRequest) -> Result<ProductCopy> {
        let prompt = prompts::copy_prompt(request);

        let raw = self
            .model
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(prompt.system),
                    ChatMessage::user(prompt.user),
                ],
                temperature: Some(self.temperature),
                max_tokens: MAX_TOKENS_COPY,
                vision: false,
            })
            .await?;

        let copy: ProductCopy = parse_structured(&raw)?;

        for warning in copy.cardinality_warnings() {
            tracing::warn!(product = %request.product_name, warning, "Copy cardinality deviation");
        }

        Ok(copy)
    }

    /// Generate viral social content for one validated request
    pub async fn generate_viral(&self, request: &GenerationRequest) -> Result<ViralContent> {
        let prompt = prompts::viral_prompt(request);

        let raw = self
            .model
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(prompt.system),
                    ChatMessage::user(prompt.user),
                ],
                temperature: Some(self.viral_temperature),
                max_tokens: MAX_TOKENS_ANALYSIS,
                vision: false,
            })
            .await?;

        parse_structured(&raw)
    }

    /// Competitor-analysis variant: fetch structured fields from an
    /// allow-listed third-party page, then generate superior copy with the
    /// scraped fields as context.
    pub async fn analyze_competitor(
        &self,
        fetcher: &dyn ProductPageFetcher,
        url: &str,
        style: WritingStyle,
        language: Language,
    ) -> Result<UrlAnalysisResult> {
        // The allow-list is enforced before any fetch is attempted.
        if !is_supported_url(url, &self.allowed_domains) {
            return Err(AppError::Fetch {
                message:
                    "URL not supported. Please use Amazon, eBay, AliExpress, Rozetka, or Prom.ua"
                        .to_string(),
            });
        }

        let snapshot = fetcher.fetch(url).await?;
        let prompt = prompts::competitor_prompt(&snapshot, style, language);

        let raw = self
            .model
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(prompt.system),
                    ChatMessage::user(prompt.user),
                ],
                temperature: Some(self.temperature),
                max_tokens: MAX_TOKENS_ANALYSIS,
                vision: false,
            })
            .await?;

        parse_structured(&raw)
    }

    /// Visual-analysis variant: two sequential calls. First an
    /// image-grounded extraction of visual attributes, then a text-only
    /// call seeded with those attributes. If the second call fails the
    /// extraction output is discarded; its cost is logged.
    pub async fn analyze_image(
        &self,
        image: &ImageUpload,
        style: WritingStyle,
        language: Language,
    ) -> Result<ImageAnalysisResult> {
        image.validate()?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let data_url = format!("data:{};base64,{}", image.content_type, encoded);

        let extraction_raw = self
            .model
            .complete(ChatRequest {
                messages: vec![ChatMessage::user_with_image(
                    prompts::image_extraction_prompt(language),
                    data_url,
                )],
                temperature: None,
                max_tokens: MAX_TOKENS_VISION,
                vision: true,
            })
            .await?;

        let attributes: VisualAttributes = parse_structured(&extraction_raw)?;
        let attributes_json = serde_json::to_string(&attributes)?;

        let prompt = prompts::image_content_prompt(&attributes_json, style, language);

        let content_raw = self
            .model
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(prompt.system),
                    ChatMessage::user(prompt.user),
                ],
                temperature: Some(self.temperature),
                max_tokens: MAX_TOKENS_COPY,
                vision: false,
            })
            .await
            .inspect_err(|_| {
                tracing::warn!("Content call failed after successful image extraction; extraction discarded");
            })?;

        let content: ProductCopy = parse_structured(&content_raw)?;

        Ok(ImageAnalysisResult {
            visual_analysis: attributes,
            content,
        })
    }
}

/// Parse a raw model response into a typed shape.
///
/// Two distinct failure modes, both surfaced as one opaque generation
/// error class: the response is not JSON at all, or it is JSON that does
/// not match the expected schema.
pub fn parse_structured<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    let stripped = strip_code_fences(raw);

    let value: serde_json::Value =
        serde_json::from_str(stripped).map_err(|_| AppError::Generation {
            message: "Invalid JSON response from AI".to_string(),
        })?;

    serde_json::from_value(value).map_err(|e| AppError::Generation {
        message: format!("Response did not match the expected schema: {}", e),
    })
}

/// Models occasionally wrap JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Category;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted model returning canned responses in order
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(AppError::Generation {
                        message: "No content generated".to_string(),
                    })
                })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn engine(model: Arc<dyn ChatModel>) -> CopyEngine {
        CopyEngine::new(
            model,
            &GenerationConfig {
                api_key: Some("test".to_string()),
                api_base: "http://localhost".to_string(),
                model: "gpt-4".to_string(),
                vision_model: "gpt-4-vision-preview".to_string(),
                timeout_secs: 30,
                temperature: 0.7,
                viral_temperature: 0.8,
            },
            vec!["amazon.".to_string(), "ebay.".to_string()],
        )
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            product_name: "Trail Backpack".to_string(),
            category: Category::Sports,
            writing_style: WritingStyle::Professional,
            language: Language::En,
        }
    }

    fn copy_json() -> String {
        serde_json::json!({
            "productTitle": "Trail Backpack 40L",
            "productDescription": "A rugged pack.",
            "seoTitle": "Trail Backpack | 40L",
            "metaDescription": "Rugged 40L pack.",
            "callToAction": "Order yours today",
            "keyFeatures": ["light", "tough", "waterproof", "roomy", "comfortable"],
            "tagsKeywords": ["pack", "hike", "trail", "gear", "40l", "travel", "camp", "outdoor", "bag", "sport"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_generate_parses_valid_response() {
        let engine = engine(ScriptedModel::new(vec![Ok(copy_json())]));
        let copy = engine.generate(&request()).await.unwrap();
        assert_eq!(copy.product_title, "Trail Backpack 40L");
        assert_eq!(copy.key_features.len(), 5);
    }

    #[tokio::test]
    async fn test_generate_accepts_fenced_response() {
        let fenced = format!("```json\n{}\n```", copy_json());
        let engine = engine(ScriptedModel::new(vec![Ok(fenced)]));
        assert!(engine.generate(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_rejects_non_json() {
        let engine = engine(ScriptedModel::new(vec![Ok("Sure! Here you go.".to_string())]));
        let err = engine.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));
        assert!(err.to_string().contains("Invalid JSON response"));
    }

    #[tokio::test]
    async fn test_generate_rejects_schema_mismatch() {
        let engine = engine(ScriptedModel::new(vec![Ok(
            r#"{"productTitle": "only a title"}"#.to_string(),
        )]));
        let err = engine.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));
    }

    #[tokio::test]
    async fn test_competitor_rejects_unsupported_url() {
        struct PanicFetcher;
        #[async_trait]
        impl ProductPageFetcher for PanicFetcher {
            async fn fetch(&self, _url: &str) -> Result<CompetitorSnapshot> {
                panic!("fetch must not be called for an unsupported URL");
            }
        }

        let engine = engine(ScriptedModel::new(vec![]));
        let err = engine
            .analyze_competitor(
                &PanicFetcher,
                "https://example.com/item",
                WritingStyle::Casual,
                Language::En,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_competitor_happy_path() {
        struct FakeFetcher;
        #[async_trait]
        impl ProductPageFetcher for FakeFetcher {
            async fn fetch(&self, _url: &str) -> Result<CompetitorSnapshot> {
                Ok(CompetitorSnapshot {
                    title: "Rival Pack".to_string(),
                    price: Some("$49".to_string()),
                    description: "Their pack.".to_string(),
                    features: vec!["30L".to_string()],
                    rating: Some("4.1".to_string()),
                })
            }
        }

        let response = serde_json::json!({
            "competitor": {
                "title": "Rival Pack",
                "price": "$49",
                "description": "Their pack.",
                "features": ["30L"],
                "rating": "4.1"
            },
            "improvements": ["a", "b", "c", "d", "e"],
            "content": serde_json::from_str::<serde_json::Value>(&copy_json()).unwrap()
        })
        .to_string();

        let engine = engine(ScriptedModel::new(vec![Ok(response)]));
        let result = engine
            .analyze_competitor(
                &FakeFetcher,
                "https://www.amazon.com/dp/B000",
                WritingStyle::Casual,
                Language::En,
            )
            .await
            .unwrap();
        assert_eq!(result.improvements.len(), 5);
        assert_eq!(result.competitor.title, "Rival Pack");
    }

    #[tokio::test]
    async fn test_image_analysis_two_sequential_calls() {
        let extraction = serde_json::json!({
            "productType": "backpack",
            "colors": ["green", "black"],
            "materials": ["nylon"],
            "style": "outdoor",
            "features": ["straps", "pockets"],
            "targetAudience": "hikers"
        })
        .to_string();

        let engine = engine(ScriptedModel::new(vec![Ok(extraction), Ok(copy_json())]));
        let upload = ImageUpload {
            bytes: vec![0u8; 64],
            content_type: "image/jpeg".to_string(),
        };
        let result = engine
            .analyze_image(&upload, WritingStyle::Casual, Language::En)
            .await
            .unwrap();
        assert_eq!(result.visual_analysis.product_type, "backpack");
        assert_eq!(result.content.product_title, "Trail Backpack 40L");
    }

    #[tokio::test]
    async fn test_image_analysis_second_call_failure_discards_extraction() {
        let extraction = serde_json::json!({
            "productType": "backpack",
            "colors": [],
            "materials": [],
            "style": "outdoor",
            "features": [],
            "targetAudience": "hikers"
        })
        .to_string();

        let engine = engine(ScriptedModel::new(vec![
            Ok(extraction),
            Err(AppError::Generation {
                message: "No content generated".to_string(),
            }),
        ]));
        let upload = ImageUpload {
            bytes: vec![0u8; 64],
            content_type: "image/png".to_string(),
        };
        let err = engine
            .analyze_image(&upload, WritingStyle::Casual, Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));
    }

    #[tokio::test]
    async fn test_image_upload_rejected_before_any_call() {
        struct NeverModel;
        #[async_trait]
        impl ChatModel for NeverModel {
            async fn complete(&self, _request: ChatRequest) -> Result<String> {
                panic!("model must not be called for an invalid upload");
            }
            fn model_name(&self) -> &str {
                "never"
            }
        }

        let engine = engine(Arc::new(NeverModel));
        let upload = ImageUpload {
            bytes: vec![0u8; 64],
            content_type: "image/gif".to_string(),
        };
        assert!(engine
            .analyze_image(&upload, WritingStyle::Casual, Language::En)
            .await
            .is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_message_content_serialization() {
        let msg = ChatMessage::user_with_image("look", "data:image/png;base64,AAAA");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}
