//! Prompt construction for the generation engine
//!
//! Every supported language has a required template: English and Ukrainian
//! carry dedicated native-language prompts, the remaining languages share a
//! generic template that names the target output language. The mapping is
//! total over [`Language`] — there is no wildcard arm, so adding a language
//! without a template fails to compile.

use super::{CompetitorSnapshot, GenerationRequest, Language, WritingStyle};

/// A system + user message pair ready for a chat completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// Cultural signals used to ground viral content in the target market
#[derive(Debug, Clone, Copy)]
pub struct CulturalContext {
    pub values: &'static [&'static str],
    pub trust_signals: &'static [&'static str],
    pub communication: &'static str,
    pub social_proof: &'static [&'static str],
    pub urgency: &'static [&'static str],
    pub tiktok_hook: &'static str,
}

/// Build the prompt pair for standard product copy
pub fn copy_prompt(req: &GenerationRequest) -> PromptTemplate {
    match req.language {
        Language::En => PromptTemplate {
            system: "You are an expert e-commerce copywriter specializing in creating compelling product content that converts visitors into customers.".to_string(),
            user: format!(
                "Create comprehensive product content for \"{}\" in the {} category using a {} writing style.\n\n\
                 Generate the following content:\n\
                 1. Product Title (maximum 60 characters)\n\
                 2. Product Description (200-300 words)\n\
                 3. SEO Title (maximum 60 characters)\n\
                 4. Meta Description (maximum 160 characters)\n\
                 5. Call-to-Action (5-10 words)\n\
                 6. Key Features (5 bullet points)\n\
                 7. Tags & Keywords (10 items)\n\n\
                 Format your response as valid JSON with these exact keys: productTitle, productDescription, seoTitle, metaDescription, callToAction, keyFeatures (array), tagsKeywords (array).",
                req.product_name,
                req.category.as_str(),
                req.writing_style.as_str(),
            ),
        },
        Language::Ua => PromptTemplate {
            system: "Ви - експерт з написання текстів для електронної комерції, який спеціалізується на створенні переконливого контенту для товарів.".to_string(),
            user: format!(
                "Створіть комплексний контент для товару \"{}\" в категорії {} використовуючи {} стиль написання.\n\n\
                 Згенеруйте наступний контент:\n\
                 1. Назва товару (максимум 60 символів)\n\
                 2. Опис товару (200-300 слів)\n\
                 3. SEO заголовок (максимум 60 символів)\n\
                 4. Мета опис (максимум 160 символів)\n\
                 5. Заклик до дії (5-10 слів)\n\
                 6. Ключові особливості (5 пунктів)\n\
                 7. Теги та ключові слова (10 елементів)\n\n\
                 Відформатуйте вашу відповідь як валідний JSON з цими точними ключами: productTitle, productDescription, seoTitle, metaDescription, callToAction, keyFeatures (масив), tagsKeywords (масив).",
                req.product_name,
                req.category.as_str(),
                req.writing_style.as_str(),
            ),
        },
        Language::De
        | Language::Es
        | Language::Fr
        | Language::It
        | Language::Pl
        | Language::Pt
        | Language::Zh
        | Language::Ja
        | Language::Ru
        | Language::Ar => generic_copy_prompt(req),
    }
}

/// The shared template for languages without a dedicated native prompt.
/// Instructions stay in English; the output language is named explicitly.
fn generic_copy_prompt(req: &GenerationRequest) -> PromptTemplate {
    PromptTemplate {
        system: format!(
            "You are an expert e-commerce copywriter specializing in creating compelling product content that converts visitors into customers. Write all output in {}.",
            req.language.english_name(),
        ),
        user: format!(
            "Create comprehensive product content in {} for \"{}\" in the {} category using a {} writing style.\n\n\
             Generate the following content:\n\
             1. Product Title (maximum 60 characters)\n\
             2. Product Description (200-300 words)\n\
             3. SEO Title (maximum 60 characters)\n\
             4. Meta Description (maximum 160 characters)\n\
             5. Call-to-Action (5-10 words)\n\
             6. Key Features (5 bullet points)\n\
             7. Tags & Keywords (10 items)\n\n\
             Format your response as valid JSON with these exact keys: productTitle, productDescription, seoTitle, metaDescription, callToAction, keyFeatures (array), tagsKeywords (array).",
            req.language.english_name(),
            req.product_name,
            req.category.as_str(),
            req.writing_style.as_str(),
        ),
    }
}

/// Build the prompt pair for the competitor-analysis variant
pub fn competitor_prompt(
    snapshot: &CompetitorSnapshot,
    style: WritingStyle,
    language: Language,
) -> PromptTemplate {
    let system = match language {
        Language::Ua => "Ви - експерт з написання текстів для електронної комерції та аналізу конкурентів. Проаналізуйте дані конкурента та створіть кращий контент товару, який перевершує конкуренцію.".to_string(),
        Language::En => "You are an expert e-commerce copywriter and competitor analyst. Analyze the competitor data and create superior product content that beats the competition.".to_string(),
        Language::De
        | Language::Es
        | Language::Fr
        | Language::It
        | Language::Pl
        | Language::Pt
        | Language::Zh
        | Language::Ja
        | Language::Ru
        | Language::Ar => format!(
            "You are an expert e-commerce copywriter and competitor analyst. Analyze the competitor data and create superior product content that beats the competition. Write all output in {}.",
            language.english_name(),
        ),
    };

    let user = format!(
        "Analyze this competitor product data and create superior content using a {} writing style:\n\n\
         Competitor Data:\n\
         - Title: {}\n\
         - Price: {}\n\
         - Description: {}\n\
         - Features: {}\n\
         - Rating: {}\n\n\
         Generate:\n\
         1. Competitive Analysis: Identify 5 weaknesses or improvement opportunities in the competitor's content\n\
         2. Superior Product Content:\n\
            - Product Title (maximum 60 characters): Better than competitor\n\
            - Product Description (200-300 words): More compelling than competitor\n\
            - SEO Title (maximum 60 characters): Optimized for search engines\n\
            - Meta Description (maximum 160 characters): More attractive than competitor\n\
            - Call-to-Action (5-10 words): More urgent and compelling\n\
            - Key Features (5 bullet points): Highlight advantages over competitor\n\
            - Tags & Keywords (10 items): Better SEO targeting\n\n\
         Format your response as valid JSON with these exact keys: competitor (object with title, price, description, features, rating), improvements (array of 5 strings), content (object with productTitle, productDescription, seoTitle, metaDescription, callToAction, keyFeatures, tagsKeywords).",
        style.as_str(),
        snapshot.title,
        snapshot.price.as_deref().unwrap_or("Not available"),
        snapshot.description,
        snapshot.features.join(", "),
        snapshot.rating.as_deref().unwrap_or("Not available"),
    );

    PromptTemplate { system, user }
}

/// Build the image-grounded extraction prompt (first of two visual calls)
pub fn image_extraction_prompt(language: Language) -> String {
    match language {
        Language::Ua => "Проаналізуйте це зображення товару та витягніть наступну інформацію у форматі JSON:\n\
            {\"productType\": \"конкретна категорія/тип товару\", \"colors\": [\"основний колір\", \"додатковий колір\"], \"materials\": [\"матеріал1\", \"матеріал2\"], \"style\": \"стиль дизайну\", \"features\": [\"видима особливість1\", \"видима особливість2\", \"видима особливість3\"], \"targetAudience\": \"основна цільова аудиторія\"}\n\n\
            Будьте конкретними та детальними у вашому аналізі.".to_string(),
        Language::En
        | Language::De
        | Language::Es
        | Language::Fr
        | Language::It
        | Language::Pl
        | Language::Pt
        | Language::Zh
        | Language::Ja
        | Language::Ru
        | Language::Ar => "Analyze this product image and extract the following information in JSON format:\n\
            {\"productType\": \"specific product category/type\", \"colors\": [\"primary color\", \"secondary color\"], \"materials\": [\"material1\", \"material2\"], \"style\": \"design style (modern, vintage, minimalist, etc.)\", \"features\": [\"visible feature1\", \"visible feature2\", \"visible feature3\"], \"targetAudience\": \"primary target demographic\"}\n\n\
            Be specific and detailed in your analysis.".to_string(),
    }
}

/// Build the content prompt seeded with extracted visual attributes
/// (second of two visual calls)
pub fn image_content_prompt(
    attributes_json: &str,
    style: WritingStyle,
    language: Language,
) -> PromptTemplate {
    let system = format!(
        "You are an expert e-commerce copywriter. You have analyzed a product image and found: {}. Use this visual information to create compelling product content.{}",
        attributes_json,
        match language {
            Language::En => String::new(),
            Language::Ua
            | Language::De
            | Language::Es
            | Language::Fr
            | Language::It
            | Language::Pl
            | Language::Pt
            | Language::Zh
            | Language::Ja
            | Language::Ru
            | Language::Ar => format!(" Write all output in {}.", language.english_name()),
        }
    );

    let user = format!(
        "Based on the analyzed product image, create comprehensive product content using a {} writing style.\n\n\
         Generate the following content:\n\
         1. Product Title (maximum 60 characters): A compelling, keyword-rich title\n\
         2. Product Description (200-300 words): Detailed description highlighting benefits, features, and value proposition\n\
         3. SEO Title (maximum 60 characters): Optimized for search engines\n\
         4. Meta Description (maximum 160 characters): Compelling summary for search results\n\
         5. Call-to-Action (5-10 words): Urgent, action-oriented phrase\n\
         6. Key Features (5 bullet points): Main selling points and benefits\n\
         7. Tags & Keywords (10 items): Relevant keywords and tags for SEO\n\n\
         Format your response as valid JSON with these exact keys: productTitle, productDescription, seoTitle, metaDescription, callToAction, keyFeatures (array), tagsKeywords (array).",
        style.as_str(),
    );

    PromptTemplate { system, user }
}

/// Build the prompt pair for the viral-content variant
pub fn viral_prompt(req: &GenerationRequest) -> PromptTemplate {
    let ctx = cultural_context(req.language);

    let system = "You are a viral social media content expert with deep understanding of platform algorithms and cultural nuances. You create content that gets millions of views and drives conversions.".to_string();

    let user = format!(
        "You are a viral social media content expert specializing in creating engaging, shareable content that converts. Create viral social media content for \"{product}\" in the {category} category using a {style} writing style in {lang} language.\n\n\
         Cultural Context for {lang}:\n\
         - Values: {values}\n\
         - Trust signals: {trust}\n\
         - Communication style: {communication}\n\
         - Social proof: {proof}\n\
         - Urgency triggers: {urgency}\n\n\
         Generate the following viral content:\n\n\
         1. TikTok Script (30 seconds):\n\
            - Hook (0-3s): Attention-grabbing opening using viral hooks like \"{hook}\"\n\
            - Problem (3-8s): Identify the pain point\n\
            - Solution (8-20s): Present the product as the solution\n\
            - Proof (20-25s): Show results/benefits\n\
            - CTA (25-30s): Clear call to action\n\
            - Include 10 relevant hashtags\n\n\
         2. Instagram Caption:\n\
            - Engaging caption (150-200 words) in {style} tone\n\
            - Include emojis and line breaks for readability\n\
            - 15 strategic hashtags\n\
            - 3 Instagram Story ideas with interactive elements\n\n\
         3. YouTube Title & Description:\n\
            - Clickbait title (under 60 characters) using power words\n\
            - Detailed description (200 words) with timestamps\n\
            - Include relevant keywords for SEO\n\n\
         4. Twitter Thread (5-7 tweets):\n\
            - Hook tweet to grab attention\n\
            - Problem/solution development\n\
            - Social proof/results\n\
            - Conclusion with strong CTA\n\
            - Each tweet under 280 characters\n\n\
         5. Viral Hooks (10 variations):\n\
            - Attention-grabbing opening lines\n\
            - Curiosity-driven statements\n\
            - Controversial/surprising angles\n\n\
         6. Platform-specific hashtags:\n\
            - TikTok: 10 hashtags including #fyp, #viral\n\
            - Instagram: 15 hashtags mix of popular and niche\n\
            - YouTube: 10 tags for video optimization\n\
            - Twitter: 5 hashtags for thread visibility\n\n\
         Format your response as valid JSON with these exact keys: tiktokScript (object with hook, problem, solution, proof, cta, hashtags), instagramCaption (object with caption, hashtags, storyIdeas), youtubeTitle (string), youtubeDescription (string), twitterThread (array of strings), viralHooks (array of strings), platformHashtags (object with tiktok, instagram, youtube, twitter arrays).\n\n\
         Make the content culturally appropriate for {lang} speakers and highly engaging for viral potential.",
        product = req.product_name,
        category = req.category.as_str(),
        style = req.writing_style.as_str(),
        lang = req.language.as_str(),
        values = ctx.values.join(", "),
        trust = ctx.trust_signals.join(", "),
        communication = ctx.communication,
        proof = ctx.social_proof.join(", "),
        urgency = ctx.urgency.join(", "),
        hook = ctx.tiktok_hook,
    );

    PromptTemplate { system, user }
}

/// Cultural context per target market. Total over [`Language`].
pub fn cultural_context(language: Language) -> CulturalContext {
    match language {
        Language::En => CulturalContext {
            values: &["innovation", "efficiency", "value", "convenience"],
            trust_signals: &["certified", "tested", "guaranteed", "award-winning"],
            communication: "direct, benefit-focused",
            social_proof: &["reviews", "testimonials", "ratings"],
            urgency: &["limited time", "while supplies last", "act now"],
            tiktok_hook: "POV:",
        },
        Language::Ua => CulturalContext {
            values: &["сім'я", "якість", "надійність", "цінність"],
            trust_signals: &["гарантія", "перевірено", "український", "сертифіковано"],
            communication: "емоційний, орієнтований на сім'ю",
            social_proof: &["відгуки", "рекомендації", "довіра"],
            urgency: &["обмежена пропозиція", "поки є в наявності", "встигніть"],
            tiktok_hook: "Секрет, який...",
        },
        Language::De => CulturalContext {
            values: &["Präzision", "Qualität", "Langlebigkeit", "Effizienz"],
            trust_signals: &["TÜV geprüft", "Made in Germany", "Qualität", "zertifiziert"],
            communication: "technisch, detailliert, sachlich",
            social_proof: &["Bewertungen", "Expertenmeinungen", "Auszeichnungen"],
            urgency: &["begrenzte Zeit", "solange Vorrat reicht", "jetzt handeln"],
            tiktok_hook: "Das Geheimnis, das...",
        },
        Language::Es => CulturalContext {
            values: &["familia", "tradición", "pasión", "calidad"],
            trust_signals: &["garantizado", "probado", "recomendado", "premiado"],
            communication: "cálido, expresivo, personal",
            social_proof: &["reseñas", "testimonios", "recomendaciones"],
            urgency: &["oferta limitada", "últimas unidades", "no te lo pierdas"],
            tiktok_hook: "El secreto que...",
        },
        Language::Fr => CulturalContext {
            values: &["élégance", "sophistication", "qualité", "art de vivre"],
            trust_signals: &["certifié", "testé", "approuvé", "primé"],
            communication: "raffiné, sophistiqué, culturel",
            social_proof: &["avis", "témoignages", "recommandations"],
            urgency: &["offre limitée", "stock limité", "profitez-en maintenant"],
            tiktok_hook: "Le secret que...",
        },
        Language::It => CulturalContext {
            values: &["stile", "tradizione", "passione", "bellezza"],
            trust_signals: &["certificato", "testato", "garantito", "premiato"],
            communication: "appassionato, stiloso, espressivo",
            social_proof: &["recensioni", "testimonianze", "raccomandazioni"],
            urgency: &["offerta limitata", "ultimi pezzi", "non perdere"],
            tiktok_hook: "Il segreto che...",
        },
        Language::Pl => CulturalContext {
            values: &["rodzina", "tradycja", "jakość", "wartość"],
            trust_signals: &["certyfikowane", "sprawdzone", "gwarantowane", "nagrodzone"],
            communication: "ciepły, rodzinny, szczery",
            social_proof: &["opinie", "rekomendacje", "oceny"],
            urgency: &["ograniczona oferta", "ostatnie sztuki", "nie czekaj"],
            tiktok_hook: "Sekret, który...",
        },
        Language::Pt => CulturalContext {
            values: &["família", "tradição", "qualidade", "confiança"],
            trust_signals: &["certificado", "testado", "garantido", "premiado"],
            communication: "caloroso, familiar, confiável",
            social_proof: &["avaliações", "testemunhos", "recomendações"],
            urgency: &["oferta limitada", "últimas unidades", "aproveite agora"],
            tiktok_hook: "O segredo que...",
        },
        Language::Zh => CulturalContext {
            values: &["创新", "技术", "地位", "品质"],
            trust_signals: &["认证", "测试", "保证", "获奖"],
            communication: "现代化，技术导向，地位象征",
            social_proof: &["评价", "推荐", "口碑"],
            urgency: &["限时优惠", "数量有限", "立即行动"],
            tiktok_hook: "没人告诉你的秘密...",
        },
        Language::Ja => CulturalContext {
            values: &["品質", "技術", "伝統", "革新"],
            trust_signals: &["認証済み", "テスト済み", "保証付き", "受賞"],
            communication: "丁寧、技術重視、品質志向",
            social_proof: &["レビュー", "推薦", "評価"],
            urgency: &["期間限定", "在庫限り", "今すぐ"],
            tiktok_hook: "誰も教えてくれない秘密...",
        },
        Language::Ru => CulturalContext {
            values: &["качество", "надёжность", "престиж", "традиция"],
            trust_signals: &["сертифицировано", "проверено", "гарантировано", "награждено"],
            communication: "авторитетный, престижный, надёжный",
            social_proof: &["отзывы", "рекомендации", "оценки"],
            urgency: &["ограниченное предложение", "пока есть в наличии", "действуйте сейчас"],
            tiktok_hook: "Секрет, который...",
        },
        Language::Ar => CulturalContext {
            values: &["احترام", "تقليد", "عائلة", "جودة"],
            trust_signals: &["معتمد", "مختبر", "مضمون", "حائز على جوائز"],
            communication: "محترم، تقليدي، عائلي",
            social_proof: &["مراجعات", "شهادات", "توصيات"],
            urgency: &["عرض محدود", "كمية محدودة", "اطلب الآن"],
            tiktok_hook: "السر الذي...",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Category;

    fn request(language: Language) -> GenerationRequest {
        GenerationRequest {
            product_name: "Ceramic Mug".to_string(),
            category: Category::Home,
            writing_style: WritingStyle::Casual,
            language,
        }
    }

    #[test]
    fn test_english_copy_prompt_mentions_product() {
        let prompt = copy_prompt(&request(Language::En));
        assert!(prompt.user.contains("Ceramic Mug"));
        assert!(prompt.user.contains("productTitle"));
        assert!(prompt.system.contains("e-commerce copywriter"));
    }

    #[test]
    fn test_ukrainian_copy_prompt_is_native() {
        let prompt = copy_prompt(&request(Language::Ua));
        assert!(prompt.user.contains("Ceramic Mug"));
        assert!(prompt.system.contains("експерт"));
    }

    #[test]
    fn test_generic_prompt_names_output_language() {
        let prompt = copy_prompt(&request(Language::Ja));
        assert!(prompt.system.contains("Japanese"));
        assert!(prompt.user.contains("Japanese"));
    }

    #[test]
    fn test_every_language_has_a_template() {
        for lang in Language::ALL {
            let prompt = copy_prompt(&request(*lang));
            assert!(!prompt.system.is_empty());
            assert!(prompt.user.contains("productTitle"));
            let ctx = cultural_context(*lang);
            assert!(!ctx.values.is_empty());
        }
    }

    #[test]
    fn test_competitor_prompt_embeds_snapshot() {
        let snapshot = CompetitorSnapshot {
            title: "Rival Mug".to_string(),
            price: Some("$9.99".to_string()),
            description: "A mug".to_string(),
            features: vec!["ceramic".to_string(), "350ml".to_string()],
            rating: None,
        };
        let prompt = competitor_prompt(&snapshot, WritingStyle::Professional, Language::En);
        assert!(prompt.user.contains("Rival Mug"));
        assert!(prompt.user.contains("$9.99"));
        assert!(prompt.user.contains("Rating: Not available"));
        assert!(prompt.user.contains("improvements"));
    }

    #[test]
    fn test_viral_prompt_carries_cultural_context() {
        let prompt = viral_prompt(&request(Language::De));
        assert!(prompt.user.contains("Präzision"));
        assert!(prompt.user.contains("tiktokScript"));
        assert!(prompt.user.contains("#fyp"));
    }

    #[test]
    fn test_image_prompts() {
        let extraction = image_extraction_prompt(Language::En);
        assert!(extraction.contains("productType"));

        let content = image_content_prompt(
            r#"{"productType":"mug"}"#,
            WritingStyle::Luxury,
            Language::Fr,
        );
        assert!(content.system.contains(r#""productType":"mug""#));
        assert!(content.system.contains("French"));
        assert!(content.user.contains("luxury"));
    }
}
