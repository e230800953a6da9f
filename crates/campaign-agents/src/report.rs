//! Plain-text reports for each stage's result.

use std::fmt::Write as _;

use chrono::NaiveDate;
use orchestration::{ContentItem, ContentStrategy, MarketAnalysis, MarketingRoute, ProductAnalysis};

const TITLE: &str = "Campaign Studio";
const RULE: &str = "=================================================";

fn header(out: &mut String, section: &str, product: Option<&str>, date: NaiveDate) {
    let _ = writeln!(out, "{TITLE} - {section}");
    if let Some(product) = product {
        let _ = writeln!(out, "產品名稱: {product}");
    }
    let _ = writeln!(out, "生成日期: {}", date.format("%Y/%m/%d"));
    let _ = writeln!(out, "{RULE}\n");
}

fn numbered(out: &mut String, indent: &str, items: &[String]) {
    for (idx, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{indent}{}. {item}", idx + 1);
    }
}

/// Product analysis, the selected route and its concept prompts.
pub fn strategy_report(analysis: &ProductAnalysis, route: &MarketingRoute, date: NaiveDate) -> String {
    let mut out = String::new();
    header(&mut out, "視覺策略報告", None, date);

    let _ = writeln!(out, "[產品分析]");
    let _ = writeln!(out, "產品名稱: {}", analysis.name);
    let _ = writeln!(out, "視覺描述: {}", analysis.visual_description);
    let _ = writeln!(out, "核心特色: {}\n", analysis.key_features_zh);

    let _ = writeln!(out, "[選定的行銷策略路線: {}]", route.route_name);
    let _ = writeln!(out, "主標題: {}", route.headline_zh);
    let _ = writeln!(out, "副標題: {}", route.subhead_zh);
    let _ = writeln!(out, "視覺風格: {}", route.style_brief_zh);
    if let Some(audience) = &route.target_audience_zh {
        let _ = writeln!(out, "目標客群: {audience}");
    }
    if let Some(elements) = &route.visual_elements_zh {
        let _ = writeln!(out, "視覺元素: {elements}");
    }
    out.push('\n');

    let _ = writeln!(out, "[概念視覺提示詞]");
    for (idx, prompt) in route.image_prompts.iter().enumerate() {
        let _ = writeln!(out, "\n--- 概念圖 {} ---", idx + 1);
        let _ = writeln!(out, "摘要: {}", prompt.summary_zh);
        let _ = writeln!(out, "提示詞:\n{}", prompt.prompt_en);
    }
    out
}

/// Analysis, route and every (possibly edited) plan item.
pub fn content_plan_report(
    analysis: &ProductAnalysis,
    route: &MarketingRoute,
    items: &[ContentItem],
    date: NaiveDate,
) -> String {
    let mut out = String::new();
    header(&mut out, "完整策略與內容報告", None, date);

    let _ = writeln!(out, "[1. 產品分析]");
    let _ = writeln!(out, "產品名稱: {}", analysis.name);
    let _ = writeln!(out, "視覺描述: {}\n", analysis.visual_description);

    let _ = writeln!(out, "[2. 選定策略: {}]", route.route_name);
    let _ = writeln!(out, "標題: {}", route.headline_zh);
    let _ = writeln!(out, "風格: {}\n", route.style_brief_zh);

    let _ = writeln!(out, "[3. 內容企劃 ({}張圖)]", items.len());
    for (idx, item) in items.iter().enumerate() {
        let _ = writeln!(out, "\n--- 圖 {}: {} ---", idx + 1, item.title_zh);
        let _ = writeln!(out, "類型: {}", item.item_type);
        let _ = writeln!(out, "比例: {}", item.ratio);
        let _ = writeln!(out, "文案: {}", item.copy_zh);
        let _ = writeln!(out, "畫面摘要: {}", item.visual_summary_zh);
        let _ = writeln!(out, "繪圖指令 (EN):\n{}", item.visual_prompt_en);
    }
    out
}

pub fn market_report(analysis: &MarketAnalysis, product_name: &str, date: NaiveDate) -> String {
    let mut out = String::new();
    header(&mut out, "市場分析報告", Some(product_name), date);

    let core = &analysis.product_core_value;
    let _ = writeln!(out, "[產品核心價值]\n");
    let _ = writeln!(out, "主要特色:");
    numbered(&mut out, "", &core.main_features);
    let _ = writeln!(out, "\n核心優勢:");
    numbered(&mut out, "", &core.core_advantages);
    let _ = writeln!(out, "\n解決的痛點:");
    numbered(&mut out, "", &core.pain_points_solved);
    out.push('\n');

    let positioning = &analysis.market_positioning;
    let _ = writeln!(out, "[目標市場定位]\n");
    let _ = writeln!(out, "文化洞察:\n{}\n", positioning.cultural_insights);
    let _ = writeln!(out, "消費習慣:\n{}\n", positioning.consumer_habits);
    let _ = writeln!(out, "語言特性:\n{}\n", positioning.language_nuances);
    let _ = writeln!(out, "搜尋趨勢:");
    numbered(&mut out, "", &positioning.search_trends);
    out.push('\n');

    let _ = writeln!(out, "[競爭對手分析]\n");
    for (idx, competitor) in analysis.competitors.iter().enumerate() {
        let _ = writeln!(out, "--- 競爭對手 {}: {} ---", idx + 1, competitor.brand_name);
        let _ = writeln!(out, "行銷策略: {}", competitor.marketing_strategy);
        let _ = writeln!(out, "優勢:");
        numbered(&mut out, "  ", &competitor.advantages);
        let _ = writeln!(out, "劣勢:");
        numbered(&mut out, "  ", &competitor.weaknesses);
        out.push('\n');
    }

    let _ = writeln!(out, "[潛在客戶描繪]\n");
    for (idx, persona) in analysis.buyer_personas.iter().enumerate() {
        let _ = writeln!(out, "--- 買家人物誌 {}: {} ---", idx + 1, persona.name);
        let _ = writeln!(out, "基本資料: {}", persona.demographics);
        let _ = writeln!(out, "興趣: {}", persona.interests.join(", "));
        let _ = writeln!(out, "痛點:");
        numbered(&mut out, "  ", &persona.pain_points);
        let _ = writeln!(out, "搜尋關鍵字: {}\n", persona.search_keywords.join(", "));
    }
    out
}

/// Topics with their SEO guidance and the matching page prompts.
///
/// Prompt arrays shorter than the topic list leave the prompt section out for
/// the unmatched topics.
pub fn content_strategy_report(strategy: &ContentStrategy, product_name: &str, date: NaiveDate) -> String {
    let mut out = String::new();
    header(&mut out, "內容策略報告", Some(product_name), date);

    let _ = writeln!(out, "[內容主題]\n");
    for (idx, topic) in strategy.content_topics.iter().enumerate() {
        let seo = &topic.seo_guidance;
        let _ = writeln!(out, "--- 主題 {}: {} ---", idx + 1, topic.title);
        let _ = writeln!(out, "描述: {}", topic.description);
        let _ = writeln!(out, "主要關鍵字: {}", topic.focus_keyword);
        let _ = writeln!(out, "長尾關鍵字: {}", topic.long_tail_keywords.join(", "));
        let _ = writeln!(out, "\nSEO 指導:");
        let _ = writeln!(out, "  關鍵字密度: {}", seo.keyword_density);
        let _ = writeln!(out, "  語意關鍵字: {}", seo.semantic_keywords.join(", "));
        let _ = writeln!(out, "  內部連結: {}", seo.internal_links.join(", "));
        let _ = writeln!(out, "  外部連結: {}", seo.external_links.join(", "));
        if let Some(prompt) = strategy.ai_studio_prompts.get(idx) {
            let _ = writeln!(out, "\nAI Studio 提示詞:\n{}\n{prompt}", topic.title);
        }
        if let Some(prompt) = strategy.gamma_prompts.get(idx) {
            let _ = writeln!(out, "\nGamma.app 提示詞:\n{}\n{prompt}", topic.title);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "[互動元素建議]\n");
    for (idx, element) in strategy.interactive_elements.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", idx + 1, element.element_type);
        let _ = writeln!(out, "   {}\n", element.description);
    }

    let _ = writeln!(out, "[行動呼籲文案建議]\n");
    numbered(&mut out, "", &strategy.cta_suggestions);
    out
}
