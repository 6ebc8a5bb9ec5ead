//! MTGJSON `AtomicCards.json` parsing
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{JudgeError, Result};

/// Top level of `AtomicCards.json`; `meta` is ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomicCards {
    pub data: BTreeMap<String, Vec<AtomicCard>>,
}

/// One face of an atomic card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicCard {
    pub name: String,
    pub mana_cost: Option<String>,
    #[serde(rename = "type")]
    pub type_line: Option<String>,
    pub text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub colors: Option<Vec<String>>,
    pub rulings: Option<Vec<Ruling>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ruling {
    pub date: Option<String>,
    pub text: String,
}

/// Object stored in the cards collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    #[serde(rename = "manaCost")]
    pub mana_cost: String,
    #[serde(rename = "type")]
    pub type_line: String,
    pub text: String,
    pub power: String,
    pub toughness: String,
    pub colors: Vec<String>,
}

/// Object stored in the rulings collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulingRecord {
    pub name: String,
    pub rulings: String,
}

impl AtomicCards {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JudgeError::CorpusError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| JudgeError::CorpusError(format!("Invalid AtomicCards JSON: {}", e)))
    }

    /// First face of every entry, ordered by entry key
    pub fn primary_faces(&self) -> impl Iterator<Item = &AtomicCard> {
        self.data.values().filter_map(|faces| faces.first())
    }

    pub fn card_records(&self) -> impl Iterator<Item = CardRecord> + '_ {
        self.primary_faces().map(CardRecord::from_atomic)
    }

    pub fn ruling_records(&self) -> impl Iterator<Item = RulingRecord> + '_ {
        self.primary_faces().filter_map(RulingRecord::from_atomic)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl CardRecord {
    pub fn from_atomic(card: &AtomicCard) -> Self {
        Self {
            name: card.name.clone(),
            mana_cost: card
                .mana_cost
                .as_deref()
                .unwrap_or("")
                .replace(['{', '}'], ""),
            type_line: card.type_line.clone().unwrap_or_default(),
            text: card.text.clone().unwrap_or_default(),
            power: card.power.clone().unwrap_or_default(),
            toughness: card.toughness.clone().unwrap_or_default(),
            colors: card.colors.clone().unwrap_or_default(),
        }
    }

    pub fn to_properties(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl RulingRecord {
    /// `None` when the card carries no rulings at all
    pub fn from_atomic(card: &AtomicCard) -> Option<Self> {
        let rulings = card.rulings.as_ref()?;
        let joined = rulings
            .iter()
            .map(|r| r.text.replace(['"', '\''], ""))
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            name: card.name.clone(),
            rulings: joined,
        })
    }

    pub fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("name".to_string(), Value::String(self.name.clone()));
        props.insert("rulings".to_string(), Value::String(self.rulings.clone()));
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "meta": {"date": "2024-01-01", "version": "5.2.2"},
        "data": {
            "Lightning Bolt": [{
                "name": "Lightning Bolt",
                "manaCost": "{R}",
                "type": "Instant",
                "text": "Lightning Bolt deals 3 damage to any target.",
                "colors": ["R"],
                "rulings": [
                    {"date": "2020-01-01", "text": "It can target a creature's \"controller\"."},
                    {"date": "2021-02-02", "text": "It's an instant."}
                ]
            }],
            "Grizzly Bears": [{
                "name": "Grizzly Bears",
                "manaCost": "{1}{G}",
                "type": "Creature — Bear",
                "power": "2",
                "toughness": "2",
                "colors": ["G"]
            }],
            "Wear // Tear": [
                {"name": "Wear // Tear", "manaCost": "{1}{R}", "type": "Instant", "rulings": []},
                {"name": "Wear // Tear", "manaCost": "{W}", "type": "Instant"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_atomic_cards() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[test]
    fn test_card_record_strips_braces() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        let bears = cards
            .card_records()
            .find(|c| c.name == "Grizzly Bears")
            .unwrap();
        assert_eq!(bears.mana_cost, "1G");
        assert_eq!(bears.power, "2");
        assert_eq!(bears.text, "");
    }

    #[test]
    fn test_only_first_face_used() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        let split = cards
            .card_records()
            .find(|c| c.name == "Wear // Tear")
            .unwrap();
        assert_eq!(split.mana_cost, "1R");
    }

    #[test]
    fn test_card_properties_use_collection_keys() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        let bolt = cards
            .card_records()
            .find(|c| c.name == "Lightning Bolt")
            .unwrap();
        let props = bolt.to_properties();
        assert!(props.contains_key("manaCost"));
        assert!(props.contains_key("type"));
        assert_eq!(props["colors"], serde_json::json!(["R"]));
    }

    #[test]
    fn test_rulings_strip_quotes_and_join() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        let rulings: Vec<RulingRecord> = cards.ruling_records().collect();
        let bolt = rulings.iter().find(|r| r.name == "Lightning Bolt").unwrap();
        assert_eq!(
            bolt.rulings,
            "It can target a creatures controller. Its an instant."
        );
    }

    #[test]
    fn test_cards_without_rulings_key_skipped() {
        let cards = AtomicCards::parse(SAMPLE).unwrap();
        let names: Vec<String> = cards.ruling_records().map(|r| r.name).collect();
        // Empty rulings list still produces a record; missing key does not
        assert_eq!(names, vec!["Lightning Bolt", "Wear // Tear"]);
    }

    #[test]
    fn test_invalid_json_is_corpus_error() {
        let result = AtomicCards::parse("{not json");
        assert!(matches!(result, Err(JudgeError::CorpusError(_))));
    }
}
