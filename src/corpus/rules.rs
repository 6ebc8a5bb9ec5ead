//! Comprehensive rules parsing
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{JudgeError, Result};

/// One blank-line separated block of the rulebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub rule: String,
    pub rule_number: Option<String>,
    pub section: Option<String>,
}

fn rule_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{3}(?:\.\d+[a-z]?)?)\.?(?:\s|$)").expect("valid rule number regex")
    })
}

/// Section title for the leading digit of a rule number
pub fn section_name(digit: char) -> Option<&'static str> {
    let name = match digit {
        '1' => "Game Concepts",
        '2' => "Parts of a Card",
        '3' => "Card Types",
        '4' => "Zones",
        '5' => "Turn Structure",
        '6' => "Spells, Abilities, and Effects",
        '7' => "Additional Rules",
        '8' => "Multiplayer Rules",
        '9' => "Casual Variants",
        _ => return None,
    };
    Some(name)
}

impl RuleEntry {
    /// Parse one rulebook block, picking up its rule number and section
    pub fn parse(block: &str) -> Self {
        let rule = block.trim().to_string();

        let rule_number = rule_number_pattern()
            .captures(&rule)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        // Headings and glossary entries carry no number and get no section
        let section = rule_number
            .as_deref()
            .and_then(|number| number.chars().next())
            .and_then(section_name)
            .map(str::to_string);

        Self {
            rule,
            rule_number,
            section,
        }
    }

    /// Properties for the rules collection
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("rule".to_string(), Value::String(self.rule.clone()));
        props.insert(
            "rule_number".to_string(),
            Value::String(self.rule_number.clone().unwrap_or_default()),
        );
        props.insert(
            "section".to_string(),
            Value::String(self.section.clone().unwrap_or_default()),
        );
        props
    }
}

/// Split the rulebook on blank lines
pub fn split_rulebook(text: &str) -> Vec<RuleEntry> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(RuleEntry::parse)
        .collect()
}

/// Read and split a rulebook file
pub fn load_rulebook(path: &Path) -> Result<Vec<RuleEntry>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        JudgeError::CorpusError(format!("Failed to read rulebook {}: {}", path.display(), e))
    })?;
    Ok(split_rulebook(&text))
}
