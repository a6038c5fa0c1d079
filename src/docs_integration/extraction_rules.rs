/*!
# Extraction Rules

Правила извлечения полей из HTML-страниц справки 1С.

Каждое правило знает, какое поле записи оно заполняет, и пытается заполнить
его из разобранной страницы. [`RuleSet`] применяет правила по порядку: как
только поле заполнено, остальные правила для этого поля пропускаются.
Изменения формата справки закрываются добавлением нового правила, без
правки извлекателя.

## Использование

```rust,ignore
let rules = RuleSet::standard();
let page = HelpPage::parse(html, "objects/Array.html");
let draft = rules.apply(&page);
```
*/

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fmt;

use super::record::{CollectionElementsInfo, LinkInfo, MethodRef, ParameterInfo, RecordDraft, SyntaxVariant, VariantParameters};

static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1.V8SH_pagetitle")
        .expect("BUG: hardcoded CSS selector 'h1.V8SH_pagetitle' is invalid")
});
static HEADINGS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6")
        .expect("BUG: hardcoded CSS selector 'h1..h6' is invalid")
});
static DOCUMENT_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});
static CHAPTER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p.V8SH_chapter")
        .expect("BUG: hardcoded CSS selector 'p.V8SH_chapter' is invalid")
});
static SYNTAX_CLASS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".syntax").expect("BUG: hardcoded CSS selector '.syntax' is invalid")
});
static EXAMPLE_CLASS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("pre.example, .example, .code-example")
        .expect("BUG: hardcoded CSS selector '.example' is invalid")
});
static TABLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table").expect("BUG: hardcoded CSS selector 'table' is invalid")
});
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("li").expect("BUG: hardcoded CSS selector 'li' is invalid")
});
static ANCHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});
static HELP_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href^="v8help://"]"#)
        .expect("BUG: hardcoded CSS selector 'a[href^=v8help://]' is invalid")
});

/// Предложения раздела "Элементы коллекции" про обход и индексацию
static USAGE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:для\s+каждого|из|цикл\w*|индекс\w*|оператор\w*)\b")
        .expect("BUG: hardcoded collection usage regex is invalid")
});

/// Заголовки соседних разделов, попадающие в текст раздела при вложенной разметке
const FOREIGN_SECTION_WORDS: &[&str] = &[
    "Методы",
    "Описание",
    "Доступность",
    "См. также",
    "Использование в версии",
];

const VARIANT_MARKER: &str = "Вариант синтаксиса:";
const TYPE_MARKER: &str = "Тип:";

/// Поле записи, которое заполняет правило
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Title,
    Syntax,
    Description,
    Parameters,
    ReturnValue,
    Availability,
    Version,
    Example,
    Methods,
    Links,
    CollectionElements,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordField::Title => "title",
            RecordField::Syntax => "syntax",
            RecordField::Description => "description",
            RecordField::Parameters => "parameters",
            RecordField::ReturnValue => "return_value",
            RecordField::Availability => "availability",
            RecordField::Version => "version",
            RecordField::Example => "example",
            RecordField::Methods => "methods",
            RecordField::Links => "links",
            RecordField::CollectionElements => "collection_elements",
        };
        f.write_str(name)
    }
}

/// Разобранная HTML-страница справки
pub struct HelpPage {
    document: Html,
    filename: String,
}

impl HelpPage {
    pub fn parse(html: &str, filename: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            filename: filename.to_string(),
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Страница без видимого текста
    pub fn is_blank(&self) -> bool {
        self.document
            .root_element()
            .text()
            .all(|t| t.trim().is_empty())
    }

    /// Заголовки разделов `p.V8SH_chapter` в порядке документа
    pub fn chapters(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document.select(&CHAPTER)
    }

    /// Первый раздел, заголовок которого содержит `marker`
    pub fn find_chapter(&self, marker: &str) -> Option<ElementRef<'_>> {
        self.chapters().find(|c| element_text(c).contains(marker))
    }
}

/// Правило извлечения одного поля
pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &str;

    fn field(&self) -> RecordField;

    /// Заполняет поле черновика; `false`, если на странице нет подходящих данных
    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool;
}

/// Упорядоченный набор правил
pub struct RuleSet {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Стандартные правила для справки платформы 1С
    pub fn standard() -> Self {
        let mut rules = Self::empty();
        rules.push(PageTitleRule);
        rules.push(HeadingTitleRule);
        rules.push(DocumentTitleRule);
        rules.push(ChapterSyntaxRule);
        rules.push(SyntaxClassRule);
        rules.push(ChapterDescriptionRule);
        rules.push(ChapterParametersRule);
        rules.push(ChapterReturnValueRule);
        rules.push(ChapterAvailabilityRule);
        rules.push(ChapterVersionRule);
        rules.push(ChapterExampleRule);
        rules.push(ExampleClassRule);
        rules.push(ChapterMethodsRule);
        rules.push(MethodLinksRule);
        rules.push(HelpLinksRule);
        rules.push(ChapterCollectionElementsRule);
        rules
    }

    pub fn push<R: ExtractionRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Применяет правила к странице (first-match-wins по каждому полю)
    pub fn apply(&self, page: &HelpPage) -> RecordDraft {
        let mut draft = RecordDraft::new(page.filename());
        let mut filled: HashSet<RecordField> = HashSet::new();

        for rule in &self.rules {
            let field = rule.field();
            if filled.contains(&field) {
                continue;
            }
            if rule.apply(page, &mut draft) {
                tracing::trace!("{}: field {} filled by {}", page.filename(), field, rule.name());
                filled.insert(field);
            }
        }

        draft
    }
}

// ---------------------------------------------------------------------------
// Вспомогательные функции обхода DOM

/// Текст элемента со схлопнутыми пробелами
pub fn element_text(elem: &ElementRef) -> String {
    normalize_whitespace(&elem.text().collect::<Vec<_>>().join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Текст с сохранением строк (для примеров кода)
fn multiline_text(elem: &ElementRef) -> String {
    elem.text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_class(elem: &ElementRef, class: &str) -> bool {
    elem.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|part| part == class))
        .unwrap_or(false)
}

fn is_chapter(elem: &ElementRef) -> bool {
    elem.value().name() == "p" && has_class(elem, "V8SH_chapter")
}

fn is_rubric(elem: &ElementRef) -> bool {
    elem.value().name() == "div" && has_class(elem, "V8SH_rubric")
}

/// Узел раздела: элемент или непустой текст между заголовками
enum SectionNode<'a> {
    Element(ElementRef<'a>),
    Text(String),
}

impl SectionNode<'_> {
    fn text(&self) -> String {
        match self {
            SectionNode::Element(elem) => element_text(elem),
            SectionNode::Text(text) => text.clone(),
        }
    }
}

/// Соседние узлы после `start` до следующего элемента, на котором `stop` истинно
fn section_after<'a, F>(start: &ElementRef<'a>, stop: F) -> Vec<SectionNode<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    let mut nodes = Vec::new();
    for node in start.next_siblings() {
        if let Some(elem) = ElementRef::wrap(node) {
            if stop(&elem) {
                break;
            }
            nodes.push(SectionNode::Element(elem));
        } else if let Some(text) = node.value().as_text() {
            let text = normalize_whitespace(text);
            if !text.is_empty() {
                nodes.push(SectionNode::Text(text));
            }
        }
    }
    nodes
}

/// Содержимое раздела до следующего заголовка
fn chapter_section<'a>(chapter: &ElementRef<'a>) -> Vec<SectionNode<'a>> {
    section_after(chapter, is_chapter)
}

fn section_text(nodes: &[SectionNode]) -> String {
    let parts: Vec<String> = nodes
        .iter()
        .map(SectionNode::text)
        .filter(|t| !t.is_empty())
        .collect();
    normalize_whitespace(&parts.join(" "))
}

/// Первый непустой текст раздела
fn first_section_text(chapter: &ElementRef) -> Option<String> {
    chapter_section(chapter)
        .iter()
        .map(SectionNode::text)
        .find(|t| !t.is_empty())
}

/// Первый абзац раздела, иначе весь текст раздела
fn section_paragraph_or_text(chapter: &ElementRef) -> Option<String> {
    let section = chapter_section(chapter);
    let paragraph = section.iter().find_map(|node| match node {
        SectionNode::Element(elem) if elem.value().name() == "p" => {
            Some(element_text(elem)).filter(|t| !t.is_empty())
        }
        _ => None,
    });
    paragraph.or_else(|| Some(section_text(&section)).filter(|t| !t.is_empty()))
}

fn first_non_empty<'a, I>(elements: I) -> Option<String>
where
    I: Iterator<Item = ElementRef<'a>>,
{
    elements.map(|e| element_text(&e)).find(|t| !t.is_empty())
}

/// Тип значения по ссылке `v8help://` (`def_String` → `String`, `objects/.../Array` → `Array`)
pub fn type_from_link(href: &str) -> Option<String> {
    if let Some((_, type_key)) = href.rsplit_once("def_") {
        let type_key = type_key.trim_end_matches(".html");
        return Some(type_key.to_string()).filter(|t| !t.is_empty());
    }
    if let Some((_, object_path)) = href.rsplit_once("objects/") {
        let object_path = object_path.trim_end_matches(".html");
        return object_path
            .rsplit('/')
            .next()
            .map(str::to_string)
            .filter(|t| !t.is_empty());
    }
    None
}

// ---------------------------------------------------------------------------
// Заголовок

pub struct PageTitleRule;

impl ExtractionRule for PageTitleRule {
    fn name(&self) -> &str {
        "page_title"
    }

    fn field(&self) -> RecordField {
        RecordField::Title
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        match first_non_empty(page.document().select(&PAGE_TITLE)) {
            Some(title) => {
                draft.title = Some(title);
                true
            }
            None => false,
        }
    }
}

pub struct HeadingTitleRule;

impl ExtractionRule for HeadingTitleRule {
    fn name(&self) -> &str {
        "first_heading"
    }

    fn field(&self) -> RecordField {
        RecordField::Title
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        match first_non_empty(page.document().select(&HEADINGS)) {
            Some(title) => {
                draft.title = Some(title);
                true
            }
            None => false,
        }
    }
}

pub struct DocumentTitleRule;

impl ExtractionRule for DocumentTitleRule {
    fn name(&self) -> &str {
        "document_title"
    }

    fn field(&self) -> RecordField {
        RecordField::Title
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        match first_non_empty(page.document().select(&DOCUMENT_TITLE)) {
            Some(title) => {
                draft.title = Some(title);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Синтаксис

/// Разделы "Синтаксис" с учетом вариантов синтаксиса
pub struct ChapterSyntaxRule;

impl ExtractionRule for ChapterSyntaxRule {
    fn name(&self) -> &str {
        "syntax_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Syntax
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let mut syntax: Option<String> = None;
        let mut variants: Vec<SyntaxVariant> = Vec::new();
        let mut current_variant: Option<String> = None;

        for chapter in page.chapters() {
            let text = element_text(&chapter);
            if text.contains(VARIANT_MARKER) {
                current_variant = Some(text.replace(VARIANT_MARKER, "").trim().to_string());
            } else if text.contains("Синтаксис") {
                let Some(syntax_text) = first_section_text(&chapter) else {
                    continue;
                };
                match &current_variant {
                    Some(variant_name) => variants.push(SyntaxVariant {
                        variant_name: variant_name.clone(),
                        syntax: syntax_text,
                    }),
                    None => {
                        if syntax.is_none() {
                            syntax = Some(syntax_text);
                        }
                    }
                }
            }
        }

        if syntax.is_none() {
            syntax = variants.first().map(|v| v.syntax.clone());
        }
        if syntax.is_none() {
            return false;
        }

        draft.syntax = syntax;
        draft.syntax_variants = variants;
        true
    }
}

/// Элементы с классом `syntax`
pub struct SyntaxClassRule;

impl ExtractionRule for SyntaxClassRule {
    fn name(&self) -> &str {
        "syntax_class"
    }

    fn field(&self) -> RecordField {
        RecordField::Syntax
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        match first_non_empty(page.document().select(&SYNTAX_CLASS)) {
            Some(syntax) => {
                draft.syntax = Some(syntax);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Описание, возвращаемое значение, доступность, версия

pub struct ChapterDescriptionRule;

impl ExtractionRule for ChapterDescriptionRule {
    fn name(&self) -> &str {
        "description_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Description
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let description = page
            .find_chapter("Описание")
            .and_then(|chapter| section_paragraph_or_text(&chapter));
        match description {
            Some(text) => {
                draft.description = Some(text);
                true
            }
            None => false,
        }
    }
}

pub struct ChapterReturnValueRule;

impl ExtractionRule for ChapterReturnValueRule {
    fn name(&self) -> &str {
        "return_value_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::ReturnValue
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let return_value = page
            .find_chapter("Возвращаемое значение")
            .map(|chapter| section_text(&chapter_section(&chapter)))
            .filter(|text| !text.is_empty());
        match return_value {
            Some(text) => {
                draft.return_value = Some(text);
                true
            }
            None => false,
        }
    }
}

pub struct ChapterAvailabilityRule;

impl ExtractionRule for ChapterAvailabilityRule {
    fn name(&self) -> &str {
        "availability_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Availability
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let Some(text) = page
            .find_chapter("Доступность")
            .and_then(|chapter| section_paragraph_or_text(&chapter))
        else {
            return false;
        };

        let mut tags: Vec<String> = Vec::new();
        for tag in text.trim_end_matches('.').split(',') {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.is_empty() {
            return false;
        }
        draft.availability = tags;
        true
    }
}

pub struct ChapterVersionRule;

impl ExtractionRule for ChapterVersionRule {
    fn name(&self) -> &str {
        "version_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Version
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let Some(chapter) = page.find_chapter("Использование в версии") else {
            return false;
        };
        let version_text = chapter_section(&chapter).into_iter().find_map(|node| match node {
            SectionNode::Element(elem) if has_class(&elem, "V8SH_versionInfo") => {
                Some(element_text(&elem))
            }
            _ => None,
        });

        let version = version_text.and_then(|text| {
            text.find("версии")
                .map(|pos| text[pos + "версии".len()..].trim().trim_end_matches('.').to_string())
        });
        match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                draft.version = Some(version);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Параметры

/// Блоки `div.V8SH_rubric` после раздела "Параметры:", сгруппированные по вариантам
pub struct ChapterParametersRule;

impl ChapterParametersRule {
    fn parse_parameter(rubric: &ElementRef) -> Option<ParameterInfo> {
        let header = element_text(rubric);
        let name = match (header.find('<'), header.find('>')) {
            (Some(start), Some(end)) if end > start => header[start + 1..end].trim().to_string(),
            _ => String::new(),
        };
        if name.is_empty() {
            return None;
        }

        // Тело параметра: все до следующего блока или раздела
        let body = section_after(rubric, |e| is_rubric(e) || is_chapter(e));
        let body_text = section_text(&body);

        let mut param_type = None;
        let mut description = None;
        if let Some(type_start) = body_text.find(TYPE_MARKER) {
            let after = &body_text[type_start + TYPE_MARKER.len()..];
            let (type_part, rest) = match after.find('.') {
                Some(dot) => (&after[..dot], &after[dot + 1..]),
                None => (after, ""),
            };
            param_type = Some(type_part.trim().to_string()).filter(|t| !t.is_empty());
            description = Some(rest.trim().to_string()).filter(|d| !d.is_empty());
        } else if !body_text.is_empty() {
            description = Some(body_text);
        }

        let link = std::iter::once(*rubric)
            .chain(body.iter().filter_map(|node| match node {
                SectionNode::Element(elem) => Some(*elem),
                SectionNode::Text(_) => None,
            }))
            .find_map(|elem| {
                if elem.value().name() == "a" {
                    elem.value().attr("href").map(str::to_string)
                } else {
                    elem.select(&ANCHOR)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string)
                }
            });

        if param_type.is_none() {
            param_type = link.as_deref().and_then(type_from_link);
        }

        Some(ParameterInfo {
            name,
            param_type,
            description,
            is_optional: header.contains("(необязательный)"),
            link,
        })
    }
}

impl ExtractionRule for ChapterParametersRule {
    fn name(&self) -> &str {
        "parameters_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Parameters
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let mut parameters: Vec<ParameterInfo> = Vec::new();
        let mut by_variant: Vec<VariantParameters> = Vec::new();
        let mut nameless = 0;

        for chapter in page.chapters() {
            let text = element_text(&chapter);
            if text.contains(VARIANT_MARKER) {
                by_variant.push(VariantParameters {
                    variant_name: text.replace(VARIANT_MARKER, "").trim().to_string(),
                    parameters: Vec::new(),
                });
                continue;
            }
            if !text.contains("Параметры:") {
                continue;
            }

            for node in chapter_section(&chapter) {
                let SectionNode::Element(elem) = node else {
                    continue;
                };
                if !is_rubric(&elem) {
                    continue;
                }
                match Self::parse_parameter(&elem) {
                    Some(param) => {
                        if let Some(variant) = by_variant.last_mut() {
                            variant.parameters.push(param.clone());
                        }
                        parameters.push(param);
                    }
                    None => nameless += 1,
                }
            }
        }

        draft.nameless_parameters += nameless;
        if parameters.is_empty() {
            return false;
        }
        draft.parameters = parameters;
        draft.parameters_by_variant = by_variant;
        true
    }
}

// ---------------------------------------------------------------------------
// Пример

/// Таблица после раздела "Пример"
pub struct ChapterExampleRule;

impl ExtractionRule for ChapterExampleRule {
    fn name(&self) -> &str {
        "example_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Example
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let Some(chapter) = page.find_chapter("Пример") else {
            return false;
        };
        let example = chapter_section(&chapter).into_iter().find_map(|node| match node {
            SectionNode::Element(elem) if elem.value().name() == "table" => {
                Some(multiline_text(&elem))
            }
            SectionNode::Element(elem) => elem.select(&TABLE).next().map(|t| multiline_text(&t)),
            SectionNode::Text(_) => None,
        });
        match example.filter(|e| !e.is_empty()) {
            Some(example) => {
                draft.example = Some(example);
                true
            }
            None => false,
        }
    }
}

/// Блоки кода с классами `example` / `code-example`
pub struct ExampleClassRule;

impl ExtractionRule for ExampleClassRule {
    fn name(&self) -> &str {
        "example_class"
    }

    fn field(&self) -> RecordField {
        RecordField::Example
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let example = page
            .document()
            .select(&EXAMPLE_CLASS)
            .map(|e| multiline_text(&e))
            .find(|t| !t.is_empty());
        match example {
            Some(example) => {
                draft.example = Some(example);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Методы объекта и ссылки

/// Список `ul > li` после раздела "Методы"
pub struct ChapterMethodsRule;

impl ExtractionRule for ChapterMethodsRule {
    fn name(&self) -> &str {
        "methods_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::Methods
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let Some(chapter) = page.find_chapter("Методы") else {
            return false;
        };
        let list = chapter_section(&chapter).into_iter().find_map(|node| match node {
            SectionNode::Element(elem) if elem.value().name() == "ul" => Some(elem),
            _ => None,
        });
        let Some(list) = list else {
            return false;
        };

        let methods: Vec<MethodRef> = list
            .select(&LIST_ITEM)
            .map(|li| element_text(&li))
            .filter(|t| !t.is_empty())
            .map(|t| MethodRef::parse(&t))
            .collect();
        if methods.is_empty() {
            return false;
        }
        draft.methods = methods;
        true
    }
}

/// Ссылки на страницы методов (`methods/`), без повторов
pub struct MethodLinksRule;

impl ExtractionRule for MethodLinksRule {
    fn name(&self) -> &str {
        "method_links"
    }

    fn field(&self) -> RecordField {
        RecordField::Methods
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for link in page.document().select(&ANCHOR) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.contains("methods/") {
                continue;
            }
            let text = element_text(&link);
            if text.is_empty() {
                continue;
            }
            let method = MethodRef::parse(&text);
            if seen.insert((method.name.clone(), method.english_name.clone())) {
                methods.push(method);
            }
        }
        if methods.is_empty() {
            return false;
        }
        draft.methods = methods;
        true
    }
}

/// Все ссылки `v8help://`
pub struct HelpLinksRule;

impl ExtractionRule for HelpLinksRule {
    fn name(&self) -> &str {
        "help_links"
    }

    fn field(&self) -> RecordField {
        RecordField::Links
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let links: Vec<LinkInfo> = page
            .document()
            .select(&HELP_LINK)
            .filter_map(|a| {
                a.value().attr("href").map(|href| LinkInfo {
                    text: element_text(&a),
                    href: href.to_string(),
                })
            })
            .collect();
        if links.is_empty() {
            return false;
        }
        draft.links = links;
        true
    }
}

// ---------------------------------------------------------------------------
// Элементы коллекции

/// Раздел "Элементы коллекции": первое предложение задает тип элементов,
/// предложения про `Для каждого`, индекс и операторы описывают обход
pub struct ChapterCollectionElementsRule;

impl ExtractionRule for ChapterCollectionElementsRule {
    fn name(&self) -> &str {
        "collection_elements_chapter"
    }

    fn field(&self) -> RecordField {
        RecordField::CollectionElements
    }

    fn apply(&self, page: &HelpPage, draft: &mut RecordDraft) -> bool {
        let Some(chapter) = page.find_chapter("Элементы коллекции") else {
            return false;
        };
        let text = section_text(&chapter_section(&chapter));
        let sentences: Vec<&str> = text
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| !FOREIGN_SECTION_WORDS.iter().any(|w| s.contains(w)))
            .collect();
        let Some((element_type, rest)) = sentences.split_first() else {
            return false;
        };

        let usage: Vec<&str> = sentences
            .iter()
            .copied()
            .filter(|s| USAGE_HINT.is_match(s))
            .collect();
        let description: Vec<&str> = std::iter::once(*element_type)
            .chain(rest.iter().copied().filter(|s| USAGE_HINT.is_match(s)))
            .collect();

        draft.collection_elements = Some(CollectionElementsInfo {
            element_type: Some(element_type.to_string()),
            description: Some(description.join(". ")),
            usage: Some(usage.join(". ")).filter(|u| !u.is_empty()),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const METHOD_PAGE: &str = r#"<html><head><title>Добавить</title></head><body>
<h1 class="V8SH_pagetitle">Массив.Добавить (Array.Add)</h1>
<p class="V8SH_chapter">Синтаксис:</p>
Добавить(&lt;Значение&gt;)
<p class="V8SH_chapter">Параметры:</p>
<div class="V8SH_rubric">&lt;Значение&gt; (необязательный)</div>
Тип: <a href="v8help://SyntaxHelperLanguage/def_Arbitrary">Произвольный</a>. <br>Добавляемое значение.
<p class="V8SH_chapter">Описание:</p>
<p>Добавляет элемент в конец массива.</p>
<p class="V8SH_chapter">Доступность:</p>
<p>Сервер, толстый клиент, внешнее соединение, Сервер.</p>
<p class="V8SH_chapter">Пример:</p>
<table><tr><td>Массив = Новый Массив;<br>Массив.Добавить(1);</td></tr></table>
<p class="V8SH_chapter">Использование в версии:</p>
<p class="V8SH_versionInfo">Доступен, начиная с версии 8.0.</p>
</body></html>"#;

    const VARIANT_PAGE: &str = r#"<html><body>
<h1 class="V8SH_pagetitle">ЗаписьXML.ЗаписатьНачалоЭлемента</h1>
<p class="V8SH_chapter">Вариант синтаксиса: По имени</p>
<p class="V8SH_chapter">Синтаксис:</p>
ЗаписатьНачалоЭлемента(&lt;Имя&gt;)
<p class="V8SH_chapter">Параметры:</p>
<div class="V8SH_rubric">&lt;Имя&gt;</div>
Тип: Строка. Локальное имя.
<p class="V8SH_chapter">Вариант синтаксиса: С пространством имен</p>
<p class="V8SH_chapter">Синтаксис:</p>
ЗаписатьНачалоЭлемента(&lt;ЛокальноеИмя&gt;, &lt;URI&gt;)
<p class="V8SH_chapter">Параметры:</p>
<div class="V8SH_rubric">&lt;ЛокальноеИмя&gt;</div>
Тип: Строка.
<div class="V8SH_rubric">&lt;URI&gt; (необязательный)</div>
Тип: Строка.
<div class="V8SH_rubric">без имени</div>
</body></html>"#;

    fn extract(html: &str) -> RecordDraft {
        RuleSet::standard().apply(&HelpPage::parse(html, "objects/catalog/Array/methods/Add.html"))
    }

    #[test]
    fn test_method_page_fields() {
        let draft = extract(METHOD_PAGE);

        assert_eq!(draft.title.as_deref(), Some("Массив.Добавить (Array.Add)"));
        assert_eq!(draft.syntax.as_deref(), Some("Добавить(<Значение>)"));
        assert_eq!(
            draft.description.as_deref(),
            Some("Добавляет элемент в конец массива.")
        );
        assert_eq!(
            draft.availability,
            vec!["Сервер", "толстый клиент", "внешнее соединение"]
        );
        assert_eq!(draft.version.as_deref(), Some("8.0"));
        assert_eq!(
            draft.example.as_deref(),
            Some("Массив = Новый Массив;\nМассив.Добавить(1);")
        );
        assert_eq!(draft.links.len(), 1);
    }

    #[test]
    fn test_parameter_block() {
        let draft = extract(METHOD_PAGE);

        assert_eq!(draft.parameters.len(), 1);
        let param = &draft.parameters[0];
        assert_eq!(param.name, "Значение");
        assert!(param.is_optional);
        assert_eq!(param.param_type.as_deref(), Some("Произвольный"));
        assert_eq!(param.description.as_deref(), Some("Добавляемое значение."));
        assert_eq!(
            param.link.as_deref(),
            Some("v8help://SyntaxHelperLanguage/def_Arbitrary")
        );
        assert!(draft.parameters_by_variant.is_empty());
    }

    #[test]
    fn test_syntax_variants_and_grouped_parameters() {
        let draft = extract(VARIANT_PAGE);

        assert_eq!(draft.syntax_variants.len(), 2);
        assert_eq!(draft.syntax_variants[0].variant_name, "По имени");
        assert_eq!(
            draft.syntax.as_deref(),
            Some("ЗаписатьНачалоЭлемента(<Имя>)")
        );

        assert_eq!(draft.parameters.len(), 3);
        assert_eq!(draft.parameters_by_variant.len(), 2);
        assert_eq!(draft.parameters_by_variant[1].variant_name, "С пространством имен");
        let names: Vec<&str> = draft.parameters_by_variant[1]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["ЛокальноеИмя", "URI"]);
        assert!(draft.parameters_by_variant[1].parameters[1].is_optional);
        assert_eq!(draft.nameless_parameters, 1);
    }

    #[test]
    fn test_title_fallbacks() {
        let draft = extract("<html><body><h2>Оператор Если</h2></body></html>");
        assert_eq!(draft.title.as_deref(), Some("Оператор Если"));

        let draft = extract("<html><head><title>Только title</title></head><body>x</body></html>");
        assert_eq!(draft.title.as_deref(), Some("Только title"));

        let draft = extract("<html><body><p>без заголовка</p></body></html>");
        assert!(draft.title.is_none());
    }

    #[test]
    fn test_first_match_wins_for_syntax() {
        let html = r#"<html><body><h1>X</h1>
<p class="V8SH_chapter">Синтаксис:</p><p>Первый()</p>
<p class="V8SH_chapter">Синтаксис:</p><p>Второй()</p>
<div class="syntax">ИзКласса()</div></body></html>"#;
        let draft = extract(html);
        assert_eq!(draft.syntax.as_deref(), Some("Первый()"));

        let html = r#"<html><body><h1>X</h1><div class="syntax">ИзКласса()</div></body></html>"#;
        assert_eq!(extract(html).syntax.as_deref(), Some("ИзКласса()"));
    }

    #[test]
    fn test_object_methods_list_and_link_fallback() {
        let html = r#"<html><body><h1 class="V8SH_pagetitle">Массив</h1>
<p class="V8SH_chapter">Методы:</p>
<ul><li>Добавить (Add)</li><li>Очистить (Clear)</li></ul></body></html>"#;
        let draft = extract(html);
        assert_eq!(draft.methods.len(), 2);
        assert_eq!(draft.methods[1].english_name, "Clear");

        let html = r#"<html><body><h1 class="V8SH_pagetitle">Массив</h1>
<a href="v8help://x/objects/Array/methods/Add.html">Добавить (Add)</a>
<a href="v8help://x/objects/Array/methods/Add.html">Добавить (Add)</a></body></html>"#;
        let draft = extract(html);
        assert_eq!(draft.methods.len(), 1);
        assert_eq!(draft.links.len(), 2);
    }

    #[test]
    fn test_custom_rule_is_pluggable() {
        struct FixedVersion;
        impl ExtractionRule for FixedVersion {
            fn name(&self) -> &str {
                "fixed_version"
            }
            fn field(&self) -> RecordField {
                RecordField::Version
            }
            fn apply(&self, _page: &HelpPage, draft: &mut RecordDraft) -> bool {
                draft.version = Some("8.3".to_string());
                true
            }
        }

        let mut rules = RuleSet::standard();
        rules.push(FixedVersion);
        let page = HelpPage::parse(METHOD_PAGE, "a.html");
        // Стандартное правило сработало раньше
        assert_eq!(rules.apply(&page).version.as_deref(), Some("8.0"));

        let page = HelpPage::parse("<html><body><h1>Y</h1></body></html>", "b.html");
        assert_eq!(rules.apply(&page).version.as_deref(), Some("8.3"));
    }

    #[test]
    fn test_blank_page() {
        assert!(HelpPage::parse("<html><body>  </body></html>", "a.html").is_blank());
        assert!(!HelpPage::parse("<html><body><h1>Таблица</h1></body></html>", "a.html").is_blank());
    }

    #[test]
    fn test_type_from_link() {
        assert_eq!(
            type_from_link("v8help://SyntaxHelperLanguage/def_String").as_deref(),
            Some("String")
        );
        assert_eq!(
            type_from_link("v8help://SyntaxHelperContext/objects/catalog125/ValueTable.html")
                .as_deref(),
            Some("ValueTable")
        );
        assert_eq!(type_from_link("v8help://other"), None);
    }

    #[test]
    fn test_collection_elements_section() {
        let html = r#"<html><body>
<h1 class="V8SH_pagetitle">Массив (Array)</h1>
<p class="V8SH_chapter">Элементы коллекции:</p>
<p>Каждый элемент коллекции имеет тип Произвольный. Для объекта доступен обход коллекции посредством оператора Для каждого &lt;Переменная&gt; Из &lt;Массив&gt; Цикл. Поддерживается обращение к значению посредством оператора [...].</p>
<p class="V8SH_chapter">Методы:</p>
<ul><li>Добавить (Add)</li></ul>
</body></html>"#;
        let draft = extract(html);
        let elements = draft.collection_elements.expect("collection elements");

        assert_eq!(
            elements.element_type.as_deref(),
            Some("Каждый элемент коллекции имеет тип Произвольный")
        );
        let usage = elements.usage.expect("usage");
        assert!(usage.contains("Для каждого <Переменная> Из <Массив> Цикл"));
        assert!(elements
            .description
            .as_deref()
            .unwrap()
            .starts_with("Каждый элемент коллекции имеет тип Произвольный. Для объекта"));
        assert_eq!(draft.methods.len(), 1);
    }

    #[test]
    fn test_no_collection_section() {
        assert!(extract(METHOD_PAGE).collection_elements.is_none());
    }
}
