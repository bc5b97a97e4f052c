//! Content domain types
//!
//! The typed vocabulary shared by the gateway, the generation engine, and
//! the bulk pipeline: supported languages, categories, writing styles, the
//! loose wire shape of a generation item, its validated form, and the copy
//! shapes produced by the engine.

pub mod prompts;

use crate::errors::AppError;
use serde::{Deserialize, Serialize};

/// Hard cap on items per bulk job. A deliberate backpressure bound, not a
/// tunable default.
pub const MAX_BULK_ITEMS: usize = 100;

/// Maximum accepted image payload for visual analysis
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Accepted image content types for visual analysis
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Expected number of key features in generated copy
pub const EXPECTED_KEY_FEATURES: usize = 5;

/// Expected number of tags/keywords in generated copy
pub const EXPECTED_TAGS: usize = 10;

/// Maximum product name length
pub const MAX_PRODUCT_NAME_LEN: usize = 100;

/// Supported output languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ua,
    De,
    Es,
    Fr,
    It,
    Pl,
    Pt,
    Zh,
    Ja,
    Ru,
    Ar,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::En,
        Language::Ua,
        Language::De,
        Language::Es,
        Language::Fr,
        Language::It,
        Language::Pl,
        Language::Pt,
        Language::Zh,
        Language::Ja,
        Language::Ru,
        Language::Ar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ua => "ua",
            Language::De => "de",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::It => "it",
            Language::Pl => "pl",
            Language::Pt => "pt",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ru => "ru",
            Language::Ar => "ar",
        }
    }

    /// English display name, used when prompting for non-English output
    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ua => "Ukrainian",
            Language::De => "German",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::It => "Italian",
            Language::Pl => "Polish",
            Language::Pt => "Portuguese",
            Language::Zh => "Chinese",
            Language::Ja => "Japanese",
            Language::Ru => "Russian",
            Language::Ar => "Arabic",
        }
    }

    pub fn parse(code: &str) -> Option<Language> {
        match code {
            "en" => Some(Language::En),
            "ua" => Some(Language::Ua),
            "de" => Some(Language::De),
            "es" => Some(Language::Es),
            "fr" => Some(Language::Fr),
            "it" => Some(Language::It),
            "pl" => Some(Language::Pl),
            "pt" => Some(Language::Pt),
            "zh" => Some(Language::Zh),
            "ja" => Some(Language::Ja),
            "ru" => Some(Language::Ru),
            "ar" => Some(Language::Ar),
            _ => None,
        }
    }
}

/// Product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Clothing,
    Home,
    Beauty,
    Sports,
    Books,
    Automotive,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Clothing => "clothing",
            Category::Home => "home",
            Category::Beauty => "beauty",
            Category::Sports => "sports",
            Category::Books => "books",
            Category::Automotive => "automotive",
            Category::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Category> {
        match value {
            "electronics" => Some(Category::Electronics),
            "clothing" => Some(Category::Clothing),
            "home" => Some(Category::Home),
            "beauty" => Some(Category::Beauty),
            "sports" => Some(Category::Sports),
            "books" => Some(Category::Books),
            "automotive" => Some(Category::Automotive),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Writing styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingStyle {
    Professional,
    Casual,
    Luxury,
    Technical,
    Creative,
}

impl WritingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingStyle::Professional => "professional",
            WritingStyle::Casual => "casual",
            WritingStyle::Luxury => "luxury",
            WritingStyle::Technical => "technical",
            WritingStyle::Creative => "creative",
        }
    }

    pub fn parse(value: &str) -> Option<WritingStyle> {
        match value {
            "professional" => Some(WritingStyle::Professional),
            "casual" => Some(WritingStyle::Casual),
            "luxury" => Some(WritingStyle::Luxury),
            "technical" => Some(WritingStyle::Technical),
            "creative" => Some(WritingStyle::Creative),
            _ => None,
        }
    }
}

/// A generation item as it arrives on the wire. Fields are plain strings so
/// that a malformed bulk item can be accepted at submission and rejected as
/// a contained per-item failure during processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGenerationItem {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub writing_style: String,
    #[serde(default)]
    pub language: String,
}

/// A validated generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub product_name: String,
    pub category: Category,
    pub writing_style: WritingStyle,
    pub language: Language,
}

impl GenerationRequest {
    /// Validate a raw wire item into a strict request.
    ///
    /// Errors carry the offending field name so the HTTP boundary can return
    /// structured field errors and the bulk pipeline can record a readable
    /// per-item failure message.
    pub fn validate(raw: &RawGenerationItem) -> Result<GenerationRequest, AppError> {
        let product_name = raw.product_name.trim();
        if product_name.is_empty() {
            return Err(AppError::validation(
                "Product name is required",
                Some("productName"),
            ));
        }
        if product_name.chars().count() > MAX_PRODUCT_NAME_LEN {
            return Err(AppError::validation(
                "Product name must be less than 100 characters",
                Some("productName"),
            ));
        }

        let category = Category::parse(&raw.category).ok_or_else(|| {
            AppError::validation("Please select a category", Some("category"))
        })?;

        let writing_style = WritingStyle::parse(&raw.writing_style).ok_or_else(|| {
            AppError::validation("Please select a writing style", Some("writingStyle"))
        })?;

        let language = Language::parse(&raw.language).ok_or_else(|| {
            AppError::validation("Please select a language", Some("language"))
        })?;

        Ok(GenerationRequest {
            product_name: product_name.to_string(),
            category,
            writing_style,
            language,
        })
    }
}

/// The standard copy shape produced by the generation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCopy {
    pub product_title: String,
    pub product_description: String,
    pub seo_title: String,
    pub meta_description: String,
    pub call_to_action: String,
    pub key_features: Vec<String>,
    pub tags_keywords: Vec<String>,
}

impl ProductCopy {
    /// Cardinality deviations from the expected shape. The upstream
    /// generator is not guaranteed to respect the requested counts; a
    /// deviation is logged by callers, never fatal.
    pub fn cardinality_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.key_features.len() != EXPECTED_KEY_FEATURES {
            warnings.push(format!(
                "expected {} key features, got {}",
                EXPECTED_KEY_FEATURES,
                self.key_features.len()
            ));
        }
        if self.tags_keywords.len() != EXPECTED_TAGS {
            warnings.push(format!(
                "expected {} tags, got {}",
                EXPECTED_TAGS,
                self.tags_keywords.len()
            ));
        }
        warnings
    }
}

/// Structured fields scraped from a competitor product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
    pub title: String,
    #[serde(default)]
    pub price: Option<String>,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

/// Result of the competitor-analysis variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlAnalysisResult {
    pub competitor: CompetitorSnapshot,
    pub improvements: Vec<String>,
    pub content: ProductCopy,
}

/// Visual attributes extracted from a product image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAttributes {
    pub product_type: String,
    pub colors: Vec<String>,
    pub materials: Vec<String>,
    pub style: String,
    pub features: Vec<String>,
    pub target_audience: String,
}

/// Result of the visual-analysis variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub visual_analysis: VisualAttributes,
    pub content: ProductCopy,
}

/// TikTok video script section of viral content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiktokScript {
    pub hook: String,
    pub problem: String,
    pub solution: String,
    pub proof: String,
    pub cta: String,
    pub hashtags: Vec<String>,
}

/// Instagram caption section of viral content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramCaption {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub story_ideas: Vec<String>,
}

/// Per-platform hashtag lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformHashtags {
    pub tiktok: Vec<String>,
    pub instagram: Vec<String>,
    pub youtube: Vec<String>,
    pub twitter: Vec<String>,
}

/// Result of the viral-content variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViralContent {
    pub tiktok_script: TiktokScript,
    pub instagram_caption: InstagramCaption,
    pub youtube_title: String,
    pub youtube_description: String,
    pub twitter_thread: Vec<String>,
    pub viral_hooks: Vec<String>,
    pub platform_hashtags: PlatformHashtags,
}

/// An uploaded product image awaiting visual analysis
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    /// Enforce the size cap and the content-type allow-list.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::validation(
                "Image size must be less than 10MB",
                Some("image"),
            ));
        }
        if !ALLOWED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            return Err(AppError::validation(
                "Only JPG, PNG, and WebP images are supported",
                Some("image"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_item(name: &str) -> RawGenerationItem {
        RawGenerationItem {
            product_name: name.to_string(),
            category: "electronics".to_string(),
            writing_style: "professional".to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_valid_item() {
        let req = GenerationRequest::validate(&raw_item("iPhone 15 Pro")).unwrap();
        assert_eq!(req.product_name, "iPhone 15 Pro");
        assert_eq!(req.category, Category::Electronics);
        assert_eq!(req.writing_style, WritingStyle::Professional);
        assert_eq!(req.language, Language::En);
    }

    #[test]
    fn test_empty_product_name_rejected() {
        let err = GenerationRequest::validate(&raw_item("")).unwrap_err();
        assert_eq!(err.to_string(), "Product name is required");
    }

    #[test]
    fn test_whitespace_product_name_rejected() {
        assert!(GenerationRequest::validate(&raw_item("   ")).is_err());
    }

    #[test]
    fn test_overlong_product_name_rejected() {
        let name = "x".repeat(MAX_PRODUCT_NAME_LEN + 1);
        assert!(GenerationRequest::validate(&raw_item(&name)).is_err());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut raw = raw_item("Widget");
        raw.category = "gadgets".to_string();
        let err = GenerationRequest::validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Please select a category");
    }

    #[test]
    fn test_unknown_language_rejected() {
        let mut raw = raw_item("Widget");
        raw.language = "xx".to_string();
        assert!(GenerationRequest::validate(&raw).is_err());
    }

    #[test]
    fn test_language_roundtrip() {
        for lang in Language::ALL {
            assert_eq!(Language::parse(lang.as_str()), Some(*lang));
        }
        assert_eq!(Language::ALL.len(), 12);
    }

    #[test]
    fn test_raw_item_wire_names() {
        let raw: RawGenerationItem = serde_json::from_str(
            r#"{"productName":"Mug","category":"home","writingStyle":"casual","language":"en"}"#,
        )
        .unwrap();
        assert_eq!(raw.product_name, "Mug");
        assert_eq!(raw.writing_style, "casual");
    }

    #[test]
    fn test_product_copy_wire_names() {
        let copy = ProductCopy {
            product_title: "T".into(),
            product_description: "D".into(),
            seo_title: "S".into(),
            meta_description: "M".into(),
            call_to_action: "Buy now".into(),
            key_features: vec!["a".into(); 5],
            tags_keywords: vec!["t".into(); 10],
        };
        let json = serde_json::to_value(&copy).unwrap();
        assert!(json.get("productTitle").is_some());
        assert!(json.get("tagsKeywords").is_some());
        assert!(copy.cardinality_warnings().is_empty());
    }

    #[test]
    fn test_cardinality_deviation_is_warned_not_fatal() {
        let copy = ProductCopy {
            product_title: "T".into(),
            product_description: "D".into(),
            seo_title: "S".into(),
            meta_description: "M".into(),
            call_to_action: "Buy".into(),
            key_features: vec!["a".into(); 3],
            tags_keywords: vec!["t".into(); 10],
        };
        let warnings = copy.cardinality_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("key features"));
    }

    #[test]
    fn test_image_upload_caps() {
        let ok = ImageUpload {
            bytes: vec![0u8; 16],
            content_type: "image/png".to_string(),
        };
        assert!(ok.validate().is_ok());

        let wrong_type = ImageUpload {
            bytes: vec![0u8; 16],
            content_type: "image/gif".to_string(),
        };
        assert!(wrong_type.validate().is_err());

        let too_big = ImageUpload {
            bytes: vec![0u8; MAX_IMAGE_BYTES + 1],
            content_type: "image/png".to_string(),
        };
        assert!(too_big.validate().is_err());
    }
}
