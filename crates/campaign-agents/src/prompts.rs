//! System prompts for each stage, and builders for the per-request text.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content changes.
//! The version is logged with every stage call and is part of each cached
//! request body, so a bump also invalidates stale cache entries.

use std::sync::LazyLock;

use orchestration::{Language, MarketAnalysis, MarketingRoute, ProductAnalysis};
use regex::Regex;

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "4.1.0";

/// Visual marketing director: product image in, analysis plus routes out.
pub const DIRECTOR_PREAMBLE: &str = "\
You are a senior visual marketing director. You receive a product photo, a product \
name and optional brand background. Study the product and propose distinct marketing \
routes for it.

## Output
Return ONLY a JSON object, no commentary, with exactly this shape:

{
  \"product_analysis\": {
    \"name\": \"product name\",
    \"visual_description\": \"what the product looks like: materials, colours, form\",
    \"key_features_zh\": \"key selling points\"
  },
  \"marketing_routes\": [
    {
      \"route_name\": \"short route name (max 50 chars)\",
      \"headline_zh\": \"headline (max 100 chars)\",
      \"subhead_zh\": \"sub-headline (max 200 chars)\",
      \"style_brief_zh\": \"visual style brief\",
      \"target_audience_zh\": \"who this route speaks to\",
      \"visual_elements_zh\": \"props, scenes, lighting\",
      \"image_prompts\": [
        { \"prompt_en\": \"detailed English image prompt (at least 20 chars)\", \"summary_zh\": \"one-line summary\" }
      ]
    }
  ]
}

## Rules
- Propose exactly 3 routes with clearly different angles (e.g. lifestyle, premium, problem/solution).
- Give each route 3 image prompts. Image prompts are always in English.
- Describe the product exactly as photographed. Never invent colours or logos.";

/// Content planner: one route in, an 8-image content plan out.
pub const PLANNER_PREAMBLE: &str = "\
You are an e-commerce content planner. Given a chosen marketing route and a product \
analysis, plan the full image set for a product listing.

## Output
Return ONLY a JSON object with exactly this shape:

{
  \"plan_name\": \"plan title\",
  \"items\": [
    {
      \"id\": \"img_1_white\",
      \"type\": \"main_white | main_lifestyle | story_slide\",
      \"ratio\": \"1:1 | 9:16 | 16:9\",
      \"title_zh\": \"image title (max 100 chars)\",
      \"copy_zh\": \"marketing copy shown on the image (max 500 chars)\",
      \"visual_prompt_en\": \"detailed English image prompt (20-1000 chars)\",
      \"visual_summary_zh\": \"one-line description of the picture (max 200 chars)\"
    }
  ]
}

## Rules
- Exactly 8 items, in this order:
  1. `main_white`, 1:1, product on a pure white background (id `img_1_white`).
  2. `main_lifestyle`, 1:1, product in use (id `img_2_lifestyle`).
  3-8. `story_slide`, 9:16, a sales story: hook, problem, solution, features, trust, cta \
(ids `img_3_hook` … `img_8_cta`).
- `visual_prompt_en` is always English and must describe the product faithfully.
- Keep copy short enough to be legible when rendered on the image.";

/// Market analyst: market positioning, competitors and buyer personas.
pub const ANALYST_PREAMBLE: &str = "\
You are a market analyst for consumer products sold online. Given a product, its \
photo and the chosen marketing route, produce a market analysis.

## Output
Return ONLY a JSON object with exactly this shape:

{
  \"productCoreValue\": {
    \"mainFeatures\": [\"3-10 items, each at least 5 chars\"],
    \"coreAdvantages\": [\"3-10 items\"],
    \"painPointsSolved\": [\"3-10 items\"]
  },
  \"marketPositioning\": {
    \"culturalInsights\": \"50-500 chars\",
    \"consumerHabits\": \"50-500 chars\",
    \"languageNuances\": \"20-300 chars\",
    \"searchTrends\": [\"3-15 search trends\"]
  },
  \"competitors\": [
    {
      \"brandName\": \"name\",
      \"marketingStrategy\": \"20-300 chars\",
      \"advantages\": [\"2-10 items\"],
      \"weaknesses\": [\"2-10 items\"]
    }
  ],
  \"buyerPersonas\": [
    {
      \"name\": \"persona name\",
      \"demographics\": \"20-300 chars\",
      \"interests\": [\"3-15 items\"],
      \"painPoints\": [\"2-10 items\"],
      \"searchKeywords\": [\"3-15 keywords\"]
    }
  ]
}

## Rules
- 2-5 competitors and 2-5 buyer personas.
- Ground every claim in the product and route you were given.";

/// Content strategist: SEO topics and ready-to-use page prompts.
pub const STRATEGIST_PREAMBLE: &str = "\
You are a content strategist and SEO specialist. Using the market analysis, plan \
content that ranks and converts.

## Output
Return ONLY a JSON object with exactly this shape:

{
  \"contentTopics\": [
    {
      \"title\": \"topic title\",
      \"description\": \"what the piece covers\",
      \"focusKeyword\": \"primary keyword\",
      \"longTailKeywords\": [\"...\"],
      \"seoGuidance\": {
        \"keywordDensity\": \"e.g. 1-2%\",
        \"semanticKeywords\": [\"...\"],
        \"internalLinks\": [\"...\"],
        \"externalLinks\": [\"...\"]
      }
    }
  ],
  \"interactiveElements\": [ { \"type\": \"quiz | calculator | ...\", \"description\": \"20-300 chars\" } ],
  \"ctaSuggestions\": [\"...\"],
  \"aiStudioPrompts\": [\"one full page-building prompt per topic\"],
  \"gammaPrompts\": [\"one full slide-deck prompt per topic\"]
}

## Rules
- 2-5 topics. `aiStudioPrompts` and `gammaPrompts` have one entry per topic, same order.
- Prompts may span many lines. Escape every double quote and newline inside JSON strings.
- When image file names are listed, reference the matching file by name in the prompts.";

/// Prepended to image prompts when a reference image is attached.
pub const REFERENCE_IMAGE_RULES: &str = "\
CRITICAL - Reference image rules (you MUST follow):
1. PRODUCT COLORS: Reproduce the product's colours, materials and finish exactly as they appear in the reference image.
2. LOGO & BRAND: Keep any logo, label or brand mark exactly as shown. Do not redraw, move or restyle it.
3. NO INVENTED COLORS: Do not introduce product colour variants that are not in the reference image.";

const TRADITIONAL_CHINESE_TEXT: &str = "\
IMPORTANT: If this image contains any text, marketing copy, testimonials, or call-to-action buttons, \
ALL text must be rendered in Traditional Chinese characters. Do NOT use English marketing text. \
Only brand names or slogans that are originally in English may appear in English.";

const TRADITIONAL_CHINESE_TEXT_STRICT: &str = "\
CRITICAL: All rendered text must be in Traditional Chinese characters. \
Do NOT generate English marketing copy, testimonials, or button text.";

/// Prompt already asks for text to be rendered on the image.
static TEXT_RENDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)render\s+text|display\s+text|text\s+like|text\s+['"]"#)
        .expect("TEXT_RENDER_RE regex should compile")
});

/// Output-language instruction appended to every system prompt.
pub fn language_directive(language: Language) -> &'static str {
    match language {
        Language::ZhTw => "\n\n## Language\nAll `_zh` fields and all marketing copy must be written in Traditional Chinese (繁體中文, Taiwan usage). English prompts stay in English.",
        Language::En => "\n\n## Language\nWrite every text field in English, including fields whose names end in `_zh`.",
    }
}

/// Preamble plus the language directive.
pub fn system_prompt(preamble: &str, language: Language) -> String {
    format!("{preamble}{}", language_directive(language))
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}

pub fn director_request(product_name: &str, brand_context: &str) -> String {
    format!(
        "產品名稱: {}\n品牌/背景資訊: {}\n請根據上述資訊與圖片，執行視覺行銷總監的分析任務。",
        or_placeholder(product_name, "未提供"),
        or_placeholder(brand_context, "未提供"),
    )
}

pub fn planner_request(
    route: &MarketingRoute,
    analysis: &ProductAnalysis,
    reference_copy: &str,
    language_note: &str,
) -> String {
    let mut text = format!(
        "選定策略路線: {}\n主標題: {}\n風格: {}\n產品名稱: {}\n產品特點: {}\n參考文案/競品資訊: {}\n",
        route.route_name,
        route.headline_zh,
        route.style_brief_zh,
        analysis.name,
        analysis.key_features_zh,
        or_placeholder(reference_copy, "無"),
    );
    if !language_note.is_empty() {
        text.push_str(language_note);
        text.push('\n');
    }
    text.push_str("請生成 8 張圖的完整內容企劃 (JSON)。");
    text
}

fn route_lines(route: &MarketingRoute) -> String {
    format!(
        "選定的行銷策略路線:\n- 路線名稱: {}\n- 主標題: {}\n- 副標題: {}\n- 視覺風格: {}",
        route.route_name, route.headline_zh, route.subhead_zh, route.style_brief_zh
    )
}

pub fn market_request(product_name: &str, route: &MarketingRoute) -> String {
    format!(
        "產品名稱: {product_name}\n\n{}\n- 目標客群: {}\n- 視覺元素: {}\n\n請根據以上資訊生成完整的市場分析報告 (JSON)。",
        route_lines(route),
        route.target_audience_zh.as_deref().unwrap_or("未指定"),
        route.visual_elements_zh.as_deref().unwrap_or("未指定"),
    )
}

/// `images` is `(file name, purpose)` for images already produced.
pub fn strategy_request(
    product_name: &str,
    route: &MarketingRoute,
    analysis_json: &str,
    images: &[(String, String)],
) -> String {
    let mut text = format!(
        "產品名稱: {product_name}\n\n{}\n\n市場分析結果:\n{analysis_json}",
        route_lines(route)
    );
    if !images.is_empty() {
        text.push_str("\n\nPhase 2 已生成的圖片檔名及其用途：");
        for (file, purpose) in images {
            text.push_str(&format!("\n- {file}: {purpose}"));
        }
        text.push_str("\n\n請在生成提示詞時，根據內容主題智能選擇合適的圖片，並在提示詞中明確指定圖片檔名。");
    }
    text.push_str("\n\n請根據以上市場分析結果生成專業的內容策略與 SEO 優化方案 (JSON)。");
    text
}

/// Pretty JSON of the market analysis for the strategist request.
pub fn analysis_json(analysis: &MarketAnalysis) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(analysis)
}

/// Final image prompt: reference rules first, the caller's prompt, then the
/// zh-TW text rendering instruction.
pub fn image_prompt(prompt: &str, has_reference: bool, language: Language) -> String {
    let mut enhanced = if has_reference {
        format!("{REFERENCE_IMAGE_RULES}\n\n{prompt}")
    } else {
        prompt.to_string()
    };

    if language.is_chinese() {
        let instruction = if TEXT_RENDER_RE.is_match(prompt) {
            TRADITIONAL_CHINESE_TEXT_STRICT
        } else {
            TRADITIONAL_CHINESE_TEXT
        };
        enhanced.push_str("\n\n");
        enhanced.push_str(instruction);
    }
    enhanced
}
