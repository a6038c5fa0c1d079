/*!
# Documentation Records

Нормализованная запись документации, которую извлекатель строит из одной
HTML-страницы справки, и промежуточный артефакт [`RecordSet`].

Запись создается один раз через [`DocumentationRecord::from_draft`] и далее
только читается: конвертеры строят из нее проекции.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{HelpParserError, HelpResult, RunSummary};

/// Категория элемента документации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Objects,
    Properties,
    Methods,
    Functions,
    Operators,
}

impl Category {
    /// Канонический порядок категорий во всех выходных артефактах
    pub const ALL: [Category; 5] = [
        Category::Objects,
        Category::Properties,
        Category::Methods,
        Category::Functions,
        Category::Operators,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Objects => "objects",
            Category::Properties => "properties",
            Category::Methods => "methods",
            Category::Functions => "functions",
            Category::Operators => "operators",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = HelpParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "objects" | "object" => Ok(Category::Objects),
            "properties" | "property" => Ok(Category::Properties),
            "methods" | "method" => Ok(Category::Methods),
            "functions" | "function" => Ok(Category::Functions),
            "operators" | "operator" => Ok(Category::Operators),
            other => Err(HelpParserError::InvalidInput(format!(
                "unknown category '{}'",
                other
            ))),
        }
    }
}

/// Вариант синтаксиса метода
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxVariant {
    pub variant_name: String,
    pub syntax: String,
}

/// Информация о параметре
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub link: Option<String>,
}

/// Параметры одного варианта синтаксиса (порядок источника сохраняется)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantParameters {
    pub variant_name: String,
    pub parameters: Vec<ParameterInfo>,
}

/// Метод, перечисленный на странице объекта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRef {
    pub name: String,
    #[serde(default)]
    pub english_name: String,
}

impl MethodRef {
    /// Разбирает строку вида `Добавить (Add)`
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let (Some(start), Some(end)) = (text.find('('), text.rfind(')')) {
            if end > start {
                return Self {
                    name: text[..start].trim().to_string(),
                    english_name: text[start + 1..end].trim().to_string(),
                };
            }
        }
        Self {
            name: text.to_string(),
            english_name: String::new(),
        }
    }
}

/// Ссылка `v8help://`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub text: String,
    pub href: String,
}

/// Раздел "Элементы коллекции": тип элементов и способы обхода
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionElementsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

impl CollectionElementsInfo {
    pub fn is_empty(&self) -> bool {
        self.element_type.is_none() && self.description.is_none() && self.usage.is_none()
    }
}

/// Поля страницы, собранные правилами извлечения, до присвоения id и категории
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub syntax: Option<String>,
    pub syntax_variants: Vec<SyntaxVariant>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    pub parameters_by_variant: Vec<VariantParameters>,
    pub return_value: Option<String>,
    pub availability: Vec<String>,
    pub version: Option<String>,
    pub example: Option<String>,
    pub methods: Vec<MethodRef>,
    pub links: Vec<LinkInfo>,
    pub collection_elements: Option<CollectionElementsInfo>,
    pub source_filename: String,
    /// Блоки параметров без имени, отброшенные при разборе
    pub nameless_parameters: usize,
}

impl RecordDraft {
    pub fn new(source_filename: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            ..Default::default()
        }
    }

    /// Имена незаполненных необязательных полей
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.syntax.is_none() {
            missing.push("syntax");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        if self.return_value.is_none() {
            missing.push("return_value");
        }
        if self.availability.is_empty() {
            missing.push("availability");
        }
        if self.version.is_none() {
            missing.push("version");
        }
        if self.example.is_none() {
            missing.push("example");
        }
        missing
    }
}

/// Нормализованная запись документации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRecord {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub syntax: String,
    #[serde(default)]
    pub syntax_variants: Vec<SyntaxVariant>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub parameters_by_variant: Vec<VariantParameters>,
    #[serde(default)]
    pub return_value: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub methods: Vec<MethodRef>,
    #[serde(default)]
    pub links: Vec<LinkInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_elements: Option<CollectionElementsInfo>,
    pub source_filename: String,
}

impl DocumentationRecord {
    /// Строит запись из черновика, подставляя пустые значения для
    /// отсутствующих необязательных полей
    pub fn from_draft(id: String, category: Category, draft: RecordDraft) -> HelpResult<Self> {
        let title = draft
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HelpParserError::EntryParse {
                entry: draft.source_filename.clone(),
                reason: "page has no title".to_string(),
            })?;

        let mut availability: Vec<String> = Vec::new();
        for tag in draft.availability {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !availability.contains(&tag) {
                availability.push(tag);
            }
        }

        let record = Self {
            id,
            title,
            category,
            syntax: draft.syntax.unwrap_or_default(),
            syntax_variants: draft.syntax_variants,
            description: draft.description.unwrap_or_default(),
            parameters: draft.parameters,
            parameters_by_variant: draft.parameters_by_variant,
            return_value: draft.return_value.unwrap_or_default(),
            availability,
            version: draft.version.unwrap_or_default(),
            example: draft.example.unwrap_or_default(),
            methods: draft.methods,
            links: draft.links,
            collection_elements: draft.collection_elements.filter(|c| !c.is_empty()),
            source_filename: draft.source_filename,
        };
        record.validate()?;
        Ok(record)
    }

    /// Проверяет инварианты записи (используется и при загрузке с диска)
    pub fn validate(&self) -> HelpResult<()> {
        if self.id.trim().is_empty() {
            return Err(HelpParserError::InvalidInput(format!(
                "record '{}' has an empty id",
                self.title
            )));
        }
        if self.title.trim().is_empty() {
            return Err(HelpParserError::InvalidInput(format!(
                "record {} has an empty title",
                self.id
            )));
        }

        let all_params = self
            .parameters
            .iter()
            .chain(self.parameters_by_variant.iter().flat_map(|v| v.parameters.iter()));
        for param in all_params {
            if param.name.trim().is_empty() {
                return Err(HelpParserError::InvalidInput(format!(
                    "record {} has a parameter without name",
                    self.id
                )));
            }
        }

        for (i, tag) in self.availability.iter().enumerate() {
            if tag.trim().is_empty() {
                return Err(HelpParserError::InvalidInput(format!(
                    "record {} has an empty availability tag",
                    self.id
                )));
            }
            if self.availability[..i].contains(tag) {
                return Err(HelpParserError::InvalidInput(format!(
                    "record {} has duplicate availability tag '{}'",
                    self.id, tag
                )));
            }
        }

        Ok(())
    }
}

/// Метаданные промежуточного артефакта извлечения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSetMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    #[serde(default)]
    pub summary: RunSummary,
}

/// Все записи одного прогона извлечения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub metadata: RecordSetMetadata,
    pub records: Vec<DocumentationRecord>,
}

impl RecordSet {
    pub fn new(
        source: impl Into<String>,
        records: Vec<DocumentationRecord>,
        summary: RunSummary,
    ) -> Self {
        Self {
            metadata: RecordSetMetadata {
                source: source.into(),
                generated_at: Utc::now(),
                total_records: records.len(),
                summary,
            },
            records,
        }
    }

    /// Проверяет все записи и уникальность их id
    pub fn validate(&self) -> HelpResult<()> {
        let mut seen = std::collections::HashSet::new();
        for record in &self.records {
            record.validate()?;
            if !seen.insert(record.id.as_str()) {
                return Err(HelpParserError::InvalidInput(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
        }
        Ok(())
    }

    pub fn count_by_category(&self, category: Category) -> usize {
        self.records.iter().filter(|r| r.category == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft(title: &str) -> RecordDraft {
        RecordDraft {
            title: Some(title.to_string()),
            ..RecordDraft::new("objects/Table.html")
        }
    }

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("tables".parse::<Category>().is_err());
        assert_eq!(
            serde_json::to_string(&Category::Properties).unwrap(),
            "\"properties\""
        );
    }

    #[test]
    fn test_from_draft_defaults_optional_fields() {
        let record =
            DocumentationRecord::from_draft("objects_0".into(), Category::Objects, draft("Таблица"))
                .unwrap();

        assert_eq!(record.title, "Таблица");
        assert_eq!(record.syntax, "");
        assert_eq!(record.description, "");
        assert!(record.availability.is_empty());
        assert!(record.parameters.is_empty());
    }

    #[test]
    fn test_from_draft_rejects_blank_title() {
        let err = DocumentationRecord::from_draft("objects_0".into(), Category::Objects, draft("  "))
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_availability_is_deduplicated() {
        let mut d = draft("Сообщить");
        d.availability = vec![
            "Сервер".to_string(),
            " Клиент".to_string(),
            "Сервер".to_string(),
            "".to_string(),
        ];
        let record =
            DocumentationRecord::from_draft("functions_0".into(), Category::Functions, d).unwrap();
        assert_eq!(record.availability, vec!["Сервер", "Клиент"]);
    }

    #[test]
    fn test_validate_rejects_nameless_parameter() {
        let mut record =
            DocumentationRecord::from_draft("methods_0".into(), Category::Methods, draft("Добавить"))
                .unwrap();
        record.parameters.push(ParameterInfo {
            name: String::new(),
            param_type: None,
            description: None,
            is_optional: false,
            link: None,
        });
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_method_ref_parse() {
        assert_eq!(
            MethodRef::parse("Добавить (Add)"),
            MethodRef {
                name: "Добавить".into(),
                english_name: "Add".into()
            }
        );
        assert_eq!(MethodRef::parse("Очистить").english_name, "");
    }

    #[test]
    fn test_record_set_rejects_duplicate_ids() {
        let a = DocumentationRecord::from_draft("objects_0".into(), Category::Objects, draft("A"))
            .unwrap();
        let set = RecordSet::new("test", vec![a.clone(), a], RunSummary::new());
        assert!(set.validate().is_err());
    }
}
