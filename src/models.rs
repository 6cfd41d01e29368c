//! Typed views over stored documents.
//!
//! Documents are decoded through [`decode`], which runs serde and then the
//! model's own validation, so a document that does not fit its schema is a
//! [`DecodeError`] rather than a half-valid value.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::{DecodeError, Document};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

pub trait Model: DeserializeOwned {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn decode<T: Model>(doc: &Document) -> Result<T, DecodeError> {
    let value: T = doc.decode()?;
    value.validate().map_err(|reason| DecodeError {
        id: doc.id.clone(),
        reason,
    })?;
    Ok(value)
}

pub fn decode_all<T: Model>(docs: &[Document]) -> Result<Vec<T>, DecodeError> {
    docs.iter().map(decode).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordType {
    Word,
    Irregular,
    Dictionary,
}

impl WordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Irregular => "irregular",
            Self::Dictionary => "dictionary",
        }
    }
}

/// Filters understood by the word listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WordCategory {
    #[default]
    Word,
    Dropped,
    Irregular,
    Dictionary,
    All,
}

impl WordCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" | "words" => Some(Self::Word),
            "dropped" => Some(Self::Dropped),
            "irregular" => Some(Self::Irregular),
            "dictionary" => Some(Self::Dictionary),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    pub word_type: WordType,
    pub active: bool,
    pub user_id: String,
    pub language_id: String,
}

impl Model for Word {}

/// Form submitted when adding a word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWord {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default = "default_word_type")]
    pub word_type: WordType,
    #[serde(default)]
    pub level: Option<CefrLevel>,
}

fn default_word_type() -> WordType {
    WordType::Word
}

impl NewWord {
    pub fn validate(&self) -> Result<(), String> {
        if self.word.trim().is_empty() {
            return Err("word must not be empty".to_string());
        }
        if self.meaning.trim().is_empty() {
            return Err("meaning must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_type: Option<WordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl WordUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.word.as_deref().is_some_and(|w| w.trim().is_empty()) {
            return Err("word must not be empty".to_string());
        }
        if self.meaning.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err("meaning must not be empty".to_string());
        }
        Ok(())
    }

    pub fn apply_to(&self, word: &mut Word) {
        if let Some(value) = &self.word {
            word.word = value.clone();
        }
        if let Some(value) = &self.meaning {
            word.meaning = value.clone();
        }
        if let Some(value) = &self.example {
            word.example = value.clone();
        }
        if let Some(value) = self.word_type {
            word.word_type = value;
        }
        if let Some(value) = self.active {
            word.active = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryWord {
    pub id: String,
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub level: Option<CefrLevel>,
    pub user_id: String,
    pub language_id: String,
}

impl Model for DictionaryWord {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub level: u8,
    pub user_id: String,
    pub language_id: String,
}

impl Model for Level {
    fn validate(&self) -> Result<(), String> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(format!(
                "level {} outside {MIN_LEVEL}..={MAX_LEVEL}",
                self.level
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub id: String,
    #[serde(default)]
    pub words_learned: u32,
    #[serde(default)]
    pub cycles: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub advancements: Vec<String>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    pub user_id: String,
    pub language_id: String,
}

impl Statistics {
    pub fn has_advancement(&self, id: &str) -> bool {
        self.advancements.iter().any(|a| a == id)
    }
}

impl Model for Statistics {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub user_id: String,
}

impl Model for Language {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLanguage {
    pub name: String,
    #[serde(default)]
    pub code: String,
}

impl NewLanguage {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("language name must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model for AppUser {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: serde_json::Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn level_outside_range_is_a_decode_error() {
        let bad = doc(
            "l1",
            json!({"level": 6, "user_id": "u", "language_id": "de"}),
        );
        let err = decode::<Level>(&bad).unwrap_err();
        assert_eq!(err.id, "l1");

        let good = doc(
            "l1",
            json!({"level": 5, "user_id": "u", "language_id": "de"}),
        );
        assert_eq!(decode::<Level>(&good).unwrap().level, 5);
    }

    #[test]
    fn statistics_defaults_missing_counters() {
        let stats: Statistics =
            decode(&doc("s1", json!({"user_id": "u", "language_id": "de"}))).unwrap();
        assert_eq!(stats.words_learned, 0);
        assert!(stats.advancements.is_empty());
        assert!(stats.last_activity.is_none());
    }

    #[test]
    fn word_with_unknown_type_is_rejected() {
        let bad = doc(
            "w1",
            json!({
                "word": "Haus", "meaning": "house", "word_type": "noun",
                "active": true, "user_id": "u", "language_id": "de"
            }),
        );
        assert!(decode::<Word>(&bad).is_err());
    }

    #[test]
    fn category_parse_accepts_known_codes() {
        assert_eq!(WordCategory::parse("Dropped"), Some(WordCategory::Dropped));
        assert_eq!(WordCategory::parse(" all "), Some(WordCategory::All));
        assert_eq!(WordCategory::parse("verbs"), None);
    }

    #[test]
    fn word_update_rejects_blank_word() {
        let update = WordUpdate {
            word: Some("  ".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
