// Context block handed to the language model
use crate::rag::retrieval::SearchResults;
use crate::store::SearchHit;

const UNKNOWN_CARD: &str = "Unknown Card";

fn name_or_unknown(hit: &SearchHit) -> &str {
    match hit.text("name") {
        "" => UNKNOWN_CARD,
        name => name,
    }
}

/// `manaCost` as stored, falling back to the lower-case spelling
fn mana_cost(hit: &SearchHit) -> &str {
    match hit.text("manaCost") {
        "" => hit.text("manacost"),
        cost => cost,
    }
}

fn format_card(index: usize, hit: &SearchHit) -> String {
    let mut line = format!("{}. [Score: {:.3}] {}", index, hit.score, name_or_unknown(hit));

    let cost = mana_cost(hit);
    if !cost.is_empty() {
        line.push(' ');
        line.push_str(cost);
    }

    let card_type = hit.text("type");
    if !card_type.is_empty() {
        line.push_str(" - ");
        line.push_str(card_type);
    }

    let (power, toughness) = (hit.text("power"), hit.text("toughness"));
    if !power.is_empty() && !toughness.is_empty() {
        line.push_str(&format!(" ({}/{})", power, toughness));
    }

    let text = hit.text("text");
    if !text.is_empty() {
        line.push_str("\n   Text: ");
        line.push_str(text);
    }
    line
}

fn format_ruling(index: usize, hit: &SearchHit) -> String {
    let mut line = format!("{}. [Score: {:.3}] {}", index, hit.score, name_or_unknown(hit));

    let date = hit.text("ruling_date");
    if !date.is_empty() {
        line.push_str(&format!(" ({})", date));
    }

    let source = hit.text("source");
    if !source.is_empty() {
        line.push_str(" - Source: ");
        line.push_str(source);
    }

    line.push_str("\n   Ruling: ");
    line.push_str(hit.text("rulings"));
    line
}

/// Render search results as the model's context, sections in the order
/// rules, cards, rulings; empty sections are left out
pub fn format_context(results: &SearchResults) -> String {
    let mut parts: Vec<String> = vec![
        format!("SEARCH QUERY: {}", results.metadata.query),
        format!("SEARCH TIMESTAMP: {}", results.metadata.timestamp.to_rfc3339()),
        String::new(),
    ];

    if !results.rules.is_empty() {
        parts.push("=== OFFICIAL RULES ===".to_string());
        for (i, hit) in results.rules.iter().enumerate() {
            parts.push(format!("{}. [Score: {:.3}] {}", i + 1, hit.score, hit.text("rule")));
        }
        parts.push(String::new());
    }

    if !results.cards.is_empty() {
        parts.push("=== RELEVANT CARDS ===".to_string());
        for (i, hit) in results.cards.iter().enumerate() {
            parts.push(format_card(i + 1, hit));
        }
        parts.push(String::new());
    }

    if !results.rulings.is_empty() {
        parts.push("=== OFFICIAL RULINGS ===".to_string());
        for (i, hit) in results.rulings.iter().enumerate() {
            parts.push(format_ruling(i + 1, hit));
        }
        parts.push(String::new());
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::retrieval::{SearchLimits, SearchMetadata};
    use chrono::Local;
    use serde_json::{json, Value};

    fn hit(score: f32, props: Value) -> SearchHit {
        SearchHit {
            id: "id".to_string(),
            properties: props.as_object().cloned().unwrap_or_default(),
            score,
            distance: None,
        }
    }

    fn results(rules: Vec<SearchHit>, cards: Vec<SearchHit>, rulings: Vec<SearchHit>) -> SearchResults {
        SearchResults {
            rules,
            cards,
            rulings,
            metadata: SearchMetadata {
                query: "How does trample work?".to_string(),
                timestamp: Local::now(),
                limits: SearchLimits::default(),
                min_score: 0.7,
            },
        }
    }

    #[test]
    fn test_empty_results_only_header() {
        let ctx = format_context(&results(vec![], vec![], vec![]));
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(lines[0], "SEARCH QUERY: How does trample work?");
        assert!(lines[1].starts_with("SEARCH TIMESTAMP: "));
        assert!(!ctx.contains("==="));
    }

    #[test]
    fn test_rules_section() {
        let ctx = format_context(&results(
            vec![
                hit(0.91234, json!({"rule": "702.19b Trample ..."})),
                hit(0.8, json!({"rule": "702.19c ..."})),
            ],
            vec![],
            vec![],
        ));
        assert!(ctx.contains("=== OFFICIAL RULES ===\n1. [Score: 0.912] 702.19b Trample ...\n2. [Score: 0.800] 702.19c ...\n"));
        assert!(!ctx.contains("RELEVANT CARDS"));
    }

    #[test]
    fn test_card_line_formatting() {
        let ctx = format_context(&results(
            vec![],
            vec![
                hit(
                    0.75,
                    json!({"name": "Colossal Dreadmaw", "manaCost": "4GG", "type": "Creature — Dinosaur",
                           "power": "6", "toughness": "6", "text": "Trample"}),
                ),
                hit(0.72, json!({"type": "Instant", "power": "2", "toughness": ""})),
            ],
            vec![],
        ));
        assert!(ctx.contains(
            "1. [Score: 0.750] Colossal Dreadmaw 4GG - Creature — Dinosaur (6/6)\n   Text: Trample"
        ));
        assert!(ctx.contains("2. [Score: 0.720] Unknown Card - Instant\n"));
    }

    #[test]
    fn test_ruling_line_formatting() {
        let ctx = format_context(&results(
            vec![],
            vec![],
            vec![hit(
                0.8,
                json!({"name": "Lightning Bolt", "rulings": "It can target a planeswalker."}),
            )],
        ));
        assert!(ctx.contains(
            "=== OFFICIAL RULINGS ===\n1. [Score: 0.800] Lightning Bolt\n   Ruling: It can target a planeswalker.\n"
        ));
    }

    #[test]
    fn test_ruling_date_and_source() {
        let ctx = format_context(&results(
            vec![],
            vec![],
            vec![hit(
                0.8,
                json!({"name": "Bolt", "rulings": "r", "ruling_date": "2021-01-01", "source": "WotC"}),
            )],
        ));
        assert!(ctx.contains("1. [Score: 0.800] Bolt (2021-01-01) - Source: WotC\n   Ruling: r"));
    }
}
