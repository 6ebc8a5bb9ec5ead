//! The three document collections and their schemas

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which corpus a collection holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Rules,
    Cards,
    Rulings,
}

impl CollectionKind {
    pub fn all() -> [CollectionKind; 3] {
        [
            CollectionKind::Rules,
            CollectionKind::Cards,
            CollectionKind::Rulings,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            CollectionKind::Rules => "rules",
            CollectionKind::Cards => "cards",
            CollectionKind::Rulings => "rulings",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Collection names inside the vector database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub rules: String,
    pub cards: String,
    pub rulings: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            rules: "MTGOfficialRules".to_string(),
            cards: "MTGCards".to_string(),
            rulings: "MTGRulings".to_string(),
        }
    }
}

impl CollectionNames {
    pub fn name_for(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::Rules => &self.rules,
            CollectionKind::Cards => &self.cards,
            CollectionKind::Rulings => &self.rulings,
        }
    }

    pub fn schema(&self, kind: CollectionKind) -> CollectionSchema {
        CollectionSchema::for_kind(kind, self.name_for(kind))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Text,
    TextArray,
}

impl DataType {
    /// Weaviate dataType name
    pub fn as_weaviate(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::TextArray => "text[]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub data_type: DataType,
}

impl PropertyDef {
    fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Text,
        }
    }

    fn text_array(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::TextArray,
        }
    }
}

/// Properties and the named vector built from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub kind: CollectionKind,
    pub name: String,
    pub properties: Vec<PropertyDef>,
    pub vector_name: String,
    /// Properties that feed the vectorizer, in order
    pub source_properties: Vec<String>,
}

impl CollectionSchema {
    pub fn for_kind(kind: CollectionKind, name: &str) -> Self {
        let (properties, vector_name, sources): (Vec<PropertyDef>, &str, &[&str]) = match kind {
            CollectionKind::Rules => (
                vec![
                    PropertyDef::text("rule"),
                    PropertyDef::text("rule_number"),
                    PropertyDef::text("section"),
                ],
                "rule_vector",
                &["rule"],
            ),
            CollectionKind::Rulings => (
                vec![PropertyDef::text("name"), PropertyDef::text("rulings")],
                "rulings_vector",
                &["name", "rulings"],
            ),
            CollectionKind::Cards => (
                vec![
                    PropertyDef::text("name"),
                    PropertyDef::text("manaCost"),
                    PropertyDef::text("type"),
                    PropertyDef::text("text"),
                    PropertyDef::text("power"),
                    PropertyDef::text("toughness"),
                    PropertyDef::text_array("colors"),
                ],
                "cards_vector",
                &[
                    "name",
                    "manaCost",
                    "colors",
                    "type",
                    "text",
                    "power",
                    "toughness",
                ],
            ),
        };

        Self {
            kind,
            name: name.to_string(),
            properties,
            vector_name: vector_name.to_string(),
            source_properties: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Text a client-side embedder sees for one object
    pub fn embedding_text(&self, properties: &Map<String, Value>) -> String {
        self.source_properties
            .iter()
            .filter_map(|key| properties.get(key))
            .filter_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Array(items) => {
                    let joined = items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(" ");
                    (!joined.is_empty()).then_some(joined)
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_names() {
        let names = CollectionNames::default();
        assert_eq!(names.name_for(CollectionKind::Rules), "MTGOfficialRules");
        assert_eq!(names.name_for(CollectionKind::Cards), "MTGCards");
        assert_eq!(names.name_for(CollectionKind::Rulings), "MTGRulings");
    }

    #[test]
    fn test_rules_schema() {
        let schema = CollectionSchema::for_kind(CollectionKind::Rules, "Rules");
        let names: Vec<&str> = schema.property_names().collect();
        assert_eq!(names, vec!["rule", "rule_number", "section"]);
        assert_eq!(schema.vector_name, "rule_vector");
        assert_eq!(schema.source_properties, vec!["rule"]);
    }

    #[test]
    fn test_cards_schema_has_color_array() {
        let schema = CollectionSchema::for_kind(CollectionKind::Cards, "Cards");
        let colors = schema.properties.iter().find(|p| p.name == "colors").unwrap();
        assert_eq!(colors.data_type, DataType::TextArray);
        assert_eq!(schema.source_properties.len(), 7);
        assert_eq!(schema.source_properties[2], "colors");
    }

    #[test]
    fn test_embedding_text_follows_source_order() {
        let schema = CollectionSchema::for_kind(CollectionKind::Cards, "Cards");
        let props = json!({
            "toughness": "1",
            "name": "Grizzly Bears",
            "manaCost": "1G",
            "colors": ["G"],
            "type": "Creature — Bear",
            "text": "",
            "power": "2"
        });
        let text = schema.embedding_text(props.as_object().unwrap());
        assert_eq!(text, "Grizzly Bears\n1G\nG\nCreature — Bear\n2\n1");
    }
}
