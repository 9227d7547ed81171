//! schema.org `Recipe` parsing from embedded JSON-LD.
//!
//! Sites differ in how they nest the recipe object: bare at top level, in an
//! array, inside `@graph`, or under `mainEntity`, with `@type` as a string or
//! a list. Field shapes differ too (instructions as text, `HowToStep`s, or
//! `HowToSection`s; images as strings, lists, or `ImageObject`s). All of that
//! is normalized here into a [`ParsedRecord`]; nothing downstream sees the
//! raw markup.

use anyhow::{bail, Result};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

use crate::models::ParsedRecord;

/// Parse the first schema.org `Recipe` in `html`. `page_url` becomes the
/// record's key and the base for relative image URLs.
pub fn parse_recipe(html: &str, page_url: &str) -> Result<ParsedRecord> {
    let Some(recipe) = find_recipe_in_html(html) else {
        bail!("no schema.org Recipe found on {}", page_url);
    };

    let title = recipe
        .get("name")
        .and_then(Value::as_str)
        .map(normalize_text)
        .filter(|t| !t.is_empty());
    let Some(title) = title else {
        bail!("Recipe on {} has no name", page_url);
    };

    let ingredients = recipe
        .get("recipeIngredient")
        .or_else(|| recipe.get("ingredients"))
        .map(string_list)
        .unwrap_or_default();

    let mut instructions = Vec::new();
    if let Some(value) = recipe.get("recipeInstructions") {
        collect_instructions(value, &mut instructions);
    }

    let image_url = recipe
        .get("image")
        .and_then(first_image)
        .map(|src| resolve_url(page_url, &src));

    let total_time = total_minutes(&recipe).map(|m| m.to_string());

    let category = joined_text(recipe.get("recipeCuisine"))
        .or_else(|| joined_text(recipe.get("recipeCategory")));

    Ok(ParsedRecord {
        url: page_url.to_string(),
        title,
        ingredients,
        instructions,
        image_url,
        category,
        total_time,
    })
}

fn find_recipe_in_html(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    document.select(&selector).find_map(|script| {
        let raw: String = script.text().collect();
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        find_recipe(&value).cloned()
    })
}

/// Depth-first search for an object typed `Recipe`.
pub fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(value);
            }
            ["@graph", "mainEntity", "mainEntityOfPage"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_recipe)
        }
        _ => None,
    }
}

fn is_recipe_type(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(normalize_text)
        .filter(|s| !s.is_empty())
        .collect()
}

fn collect_instructions(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.lines()
                .map(normalize_text)
                .filter(|line| !line.is_empty()),
        ),
        Value::Array(items) => {
            for item in items {
                collect_instructions(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(steps) = map.get("itemListElement") {
                collect_instructions(steps, out);
            } else if let Some(text) = map
                .get("text")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
            {
                let text = normalize_text(text);
                if !text.is_empty() {
                    out.push(text);
                }
            }
        }
        _ => {}
    }
}

fn first_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_image),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(first_image),
        _ => None,
    }
}

fn resolve_url(base: &str, src: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(src))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}

fn joined_text(value: Option<&Value>) -> Option<String> {
    let parts = string_list(value?);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// `totalTime` in minutes, else `prepTime + cookTime`.
fn total_minutes(recipe: &Value) -> Option<u64> {
    let minutes = |key: &str| {
        recipe
            .get(key)
            .and_then(Value::as_str)
            .and_then(parse_iso_duration_minutes)
    };

    if let Some(total) = minutes("totalTime").filter(|m| *m > 0) {
        return Some(total);
    }
    match (minutes("prepTime"), minutes("cookTime")) {
        (None, None) => None,
        (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)).filter(|m| *m > 0),
    }
}

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

/// Minutes in an ISO-8601 duration such as `PT1H30M` or `P0DT0H45M`.
/// Seconds round up to the next minute.
pub fn parse_iso_duration_minutes(raw: &str) -> Option<u64> {
    let caps = ISO_DURATION.captures(raw.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let minutes = part(1) * 24.0 * 60.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    Some(minutes.ceil() as u64)
}

/// Decode HTML entities, drop tags, collapse whitespace.
pub fn normalize_text(raw: &str) -> String {
    let decoded = if raw.contains('&') || raw.contains('<') {
        let fragment = Html::parse_fragment(raw);
        fragment.root_element().text().collect::<String>()
    } else {
        raw.to_string()
    };
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.allrecipes.com/cajun-potato-soup-recipe-11899984";

    fn page(json_ld: &str) -> String {
        format!(
            r#"<html><head>
            <script type="application/ld+json">{{"@context":"https://schema.org","@type":"WebSite","name":"Site"}}</script>
            <script type="application/ld+json">{}</script>
            </head><body><h1>ignored</h1></body></html>"#,
            json_ld
        )
    }

    #[test]
    fn parses_graph_with_sections_and_image_object() {
        let html = page(
            r#"{
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "BreadcrumbList"},
                {
                    "@type": ["Recipe", "NewsArticle"],
                    "name": "Cajun Potato Soup",
                    "recipeIngredient": ["4 russet potatoes", "1 tbsp Cajun seasoning", ""],
                    "recipeInstructions": [
                        {"@type": "HowToSection", "name": "Prep", "itemListElement": [
                            {"@type": "HowToStep", "text": "Dice the potatoes."},
                            {"@type": "HowToStep", "text": "Chop the onion."}
                        ]},
                        {"@type": "HowToStep", "text": "Simmer &amp; serve."}
                    ],
                    "image": {"@type": "ImageObject", "url": "/thmb/soup.jpg"},
                    "totalTime": "PT1H5M",
                    "recipeCuisine": ["Cajun", "Southern"]
                }
            ]
        }"#,
        );

        let record = parse_recipe(&html, URL).unwrap();
        assert_eq!(record.url, URL);
        assert_eq!(record.title, "Cajun Potato Soup");
        assert_eq!(
            record.ingredients,
            vec!["4 russet potatoes", "1 tbsp Cajun seasoning"]
        );
        assert_eq!(
            record.instructions,
            vec!["Dice the potatoes.", "Chop the onion.", "Simmer & serve."]
        );
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://www.allrecipes.com/thmb/soup.jpg")
        );
        assert_eq!(record.total_time.as_deref(), Some("65"));
        assert_eq!(record.category.as_deref(), Some("Cajun, Southern"));
    }

    #[test]
    fn top_level_array_with_plain_text_instructions() {
        let html = page(
            r#"[{
            "@type": "Recipe",
            "name": "  Baked   Rice Pilaf ",
            "recipeIngredient": "1 cup rice",
            "recipeInstructions": "Rinse the rice.\nBake 30 minutes.",
            "image": ["https://cdn.example/a.jpg", "https://cdn.example/b.jpg"],
            "prepTime": "PT10M",
            "cookTime": "PT30M",
            "recipeCategory": "Side Dish"
        }]"#,
        );

        let record = parse_recipe(&html, URL).unwrap();
        assert_eq!(record.title, "Baked Rice Pilaf");
        assert_eq!(record.ingredients, vec!["1 cup rice"]);
        assert_eq!(record.instructions, vec!["Rinse the rice.", "Bake 30 minutes."]);
        assert_eq!(record.image_url.as_deref(), Some("https://cdn.example/a.jpg"));
        assert_eq!(record.total_time.as_deref(), Some("40"));
        assert_eq!(record.category.as_deref(), Some("Side Dish"));
    }

    #[test]
    fn optional_fields_absent_is_not_an_error() {
        let html = page(r#"{"@type": "Recipe", "name": "Toast", "recipeIngredient": ["bread"]}"#);
        let record = parse_recipe(&html, URL).unwrap();
        assert_eq!(record.title, "Toast");
        assert!(record.instructions.is_empty());
        assert_eq!(record.image_url, None);
        assert_eq!(record.total_time, None);
        assert_eq!(record.category, None);
    }

    #[test]
    fn missing_recipe_or_name_is_an_error() {
        assert!(parse_recipe("<html><body>No data</body></html>", URL).is_err());
        assert!(parse_recipe(&page(r#"{"@type": "Recipe"}"#), URL).is_err());
        assert!(parse_recipe(&page("{ not json"), URL).is_err());
    }

    #[test]
    fn finds_recipe_under_main_entity() {
        let value: Value = serde_json::from_str(
            r#"{"@type": "WebPage", "mainEntity": {"@type": "recipe", "name": "Nested"}}"#,
        )
        .unwrap();
        let recipe = find_recipe(&value).unwrap();
        assert_eq!(recipe["name"], "Nested");
    }

    #[test]
    fn iso_durations() {
        assert_eq!(parse_iso_duration_minutes("PT45M"), Some(45));
        assert_eq!(parse_iso_duration_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_iso_duration_minutes("P0DT2H0M"), Some(120));
        assert_eq!(parse_iso_duration_minutes("P1D"), Some(1440));
        assert_eq!(parse_iso_duration_minutes("PT90S"), Some(2));
        assert_eq!(parse_iso_duration_minutes("pt20m"), Some(20));
        assert_eq!(parse_iso_duration_minutes("20 minutes"), None);
    }

    #[test]
    fn normalize_decodes_entities_and_tags() {
        assert_eq!(normalize_text("Mac &amp; Cheese"), "Mac & Cheese");
        assert_eq!(normalize_text("<b>Bold</b>   step\n two"), "Bold step two");
        assert_eq!(normalize_text("plain"), "plain");
    }
}
