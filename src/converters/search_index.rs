//! Keyword search mapping shared by the context converters.
//!
//! Keys are lowercased tokens; each value lists item ids in item order
//! without duplicates. A `BTreeMap` keeps the serialized key order stable.

use std::collections::BTreeMap;

pub type SearchMap = BTreeMap<String, Vec<String>>;

/// Function words that carry no search value
const STOPWORDS: &[&str] = &[
    // русские
    "для", "или", "что", "это", "как", "при", "его", "она", "они", "если", "только", "может",
    "быть", "также", "которые", "который", "которая", "этот", "этого", "все", "без", "над",
    "под", "после", "перед", "через", "между", "так", "уже", "еще", "где", "когда", "чем",
    // english
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "not", "but", "can",
    "into", "its", "has", "have", "will",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Splits text into lowercased word tokens longer than `min_keyword_length` chars
pub fn tokenize(text: &str, min_keyword_length: usize) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() > min_keyword_length)
        .filter(|word| !is_stopword(word))
        .collect()
}

/// Incremental builder for a [`SearchMap`]
#[derive(Debug, Clone)]
pub struct SearchIndexBuilder {
    min_keyword_length: usize,
    map: SearchMap,
}

impl SearchIndexBuilder {
    pub fn new(min_keyword_length: usize) -> Self {
        Self {
            min_keyword_length,
            map: SearchMap::new(),
        }
    }

    /// Indexes every token of `text` for `id`
    pub fn add_text(&mut self, id: &str, text: &str) {
        for token in tokenize(text, self.min_keyword_length) {
            self.insert(token, id);
        }
    }

    /// Indexes `key` as a single lowercased term (availability tags, versions, types)
    pub fn add_key(&mut self, id: &str, key: &str) {
        let key = key.trim().to_lowercase();
        if !key.is_empty() {
            self.insert(key, id);
        }
    }

    fn insert(&mut self, key: String, id: &str) {
        let ids = self.map.entry(key).or_default();
        // items are indexed one after another, so a repeat can only be the last id
        if ids.last().map(String::as_str) != Some(id) {
            ids.push(id.to_string());
        }
    }

    pub fn build(self) -> SearchMap {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_unicode_and_filters() {
        let tokens = tokenize("Массив.Добавить (Array.Add) - для массива, id", 2);
        assert_eq!(
            tokens,
            vec!["массив", "добавить", "array", "add", "массива"]
        );
    }

    #[test]
    fn test_builder_deduplicates_and_sorts_keys() {
        let mut builder = SearchIndexBuilder::new(2);
        builder.add_text("methods_0", "Добавить добавить элемент");
        builder.add_key("methods_0", "Сервер");
        builder.add_text("methods_1", "Вставить элемент");

        let map = builder.build();
        assert_eq!(map["добавить"], vec!["methods_0"]);
        assert_eq!(map["элемент"], vec!["methods_0", "methods_1"]);
        assert_eq!(map["сервер"], vec!["methods_0"]);

        let keys: Vec<&String> = map.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let mut builder = SearchIndexBuilder::new(2);
        builder.add_key("x_0", "   ");
        assert!(builder.build().is_empty());
    }
}
