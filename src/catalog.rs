//! Fixed snippet and model catalogs plus the identity that keys every
//! explanation and feedback record.

use std::fmt;

/// Identifier of a catalog snippet, e.g. `snippet-1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnippetId(String);

impl SnippetId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnippetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque inference model identifier, e.g. `llama3.2:latest`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(String);

impl ModelId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a generated explanation should be phrased.
///
/// Everything outside this type treats the set as opaque: templates are looked
/// up by value and iteration goes through [`ExplanationStyle::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExplanationStyle {
    #[default]
    Pragmatic,
    Contingent,
}

impl ExplanationStyle {
    pub const ALL: [ExplanationStyle; 2] = [Self::Pragmatic, Self::Contingent];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pragmatic => "pragmatic",
            Self::Contingent => "contingent",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == value.trim())
    }
}

impl fmt::Display for ExplanationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (snippet, style, model) triple. Equal only when all three parts are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    pub snippet_id: SnippetId,
    pub style: ExplanationStyle,
    pub model: ModelId,
}

impl Identity {
    #[must_use]
    pub fn new(snippet_id: SnippetId, style: ExplanationStyle, model: ModelId) -> Self {
        Self {
            snippet_id,
            style,
            model,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.snippet_id, self.style, self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: SnippetId,
    pub display_name: String,
    pub source_text: String,
    pub standard_error_text: String,
}

impl Snippet {
    /// What the read-only code editor should display for this snippet.
    #[must_use]
    pub fn editor_document(&self) -> EditorDocument {
        EditorDocument {
            source_text: self.source_text.clone(),
            read_only: true,
            syntax_hint: PYTHON_SYNTAX_HINT,
        }
    }
}

pub const PYTHON_SYNTAX_HINT: &str = "python";

/// Payload handed to the external editor widget. Nothing flows back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDocument {
    pub source_text: String,
    pub read_only: bool,
    pub syntax_hint: &'static str,
}

/// Ordered, immutable list of snippets.
#[derive(Debug, Clone)]
pub struct SnippetCatalog {
    snippets: Vec<Snippet>,
}

impl SnippetCatalog {
    /// Builds a catalog from `snippets`, keeping the first entry for a repeated id.
    #[must_use]
    pub fn new(snippets: Vec<Snippet>) -> Self {
        let mut unique: Vec<Snippet> = Vec::with_capacity(snippets.len());
        for snippet in snippets {
            if unique.iter().all(|existing| existing.id != snippet.id) {
                unique.push(snippet);
            }
        }
        Self { snippets: unique }
    }

    /// The four Python snippets shipped with the tool.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_SNIPPETS
                .iter()
                .map(|(id, name, source, standard_error)| Snippet {
                    id: SnippetId::new(*id),
                    display_name: (*name).to_string(),
                    source_text: (*source).to_string(),
                    standard_error_text: (*standard_error).to_string(),
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn list(&self) -> &[Snippet] {
        &self.snippets
    }

    #[must_use]
    pub fn get(&self, id: &SnippetId) -> Option<&Snippet> {
        self.snippets.iter().find(|snippet| &snippet.id == id)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Snippet> {
        self.snippets.first()
    }
}

/// Ordered list of selectable inference models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelId>,
}

impl ModelCatalog {
    /// Trims ids, drops empty ones and duplicates, keeps first-seen order.
    #[must_use]
    pub fn new(models: impl IntoIterator<Item = ModelId>) -> Self {
        let mut unique: Vec<ModelId> = Vec::new();
        for model in models {
            let trimmed = model.as_str().trim();
            if trimmed.is_empty() || unique.iter().any(|existing| existing.as_str() == trimmed) {
                continue;
            }
            unique.push(ModelId::new(trimmed));
        }
        Self { models: unique }
    }

    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_MODELS.iter().map(|model| ModelId::new(*model)))
    }

    #[must_use]
    pub fn list(&self) -> &[ModelId] {
        &self.models
    }

    #[must_use]
    pub fn contains(&self, model: &ModelId) -> bool {
        self.models.contains(model)
    }

    #[must_use]
    pub fn first(&self) -> Option<&ModelId> {
        self.models.first()
    }
}

pub const BUILTIN_MODELS: [&str; 5] = [
    "llama3.2:latest",
    "codellama:latest",
    "mistral:latest",
    "phi3:latest",
    "qwen2:latest",
];

const BUILTIN_SNIPPETS: [(&str, &str, &str, &str); 4] = [
    (
        "snippet-1",
        "list_index.py",
        "def get_item(items, index):
    return items[index]

my_list = [1, 2, 3]
result = get_item(my_list, 5)
print(result)",
        "Traceback (most recent call last):
  File \"list_index.py\", line 5, in <module>
    result = get_item(my_list, 5)
  File \"list_index.py\", line 2, in get_item
    return items[index]
IndexError: list index out of range",
    ),
    (
        "snippet-2",
        "division_zero.py",
        "def calculate_average(numbers):
    total = sum(numbers)
    count = len(numbers)
    return total / count

data = []
average = calculate_average(data)
print(f\"Average: {average}\")",
        "Traceback (most recent call last):
  File \"division_zero.py\", line 7, in <module>
    average = calculate_average(data)
  File \"division_zero.py\", line 4, in calculate_average
    return total / count
ZeroDivisionError: division by zero",
    ),
    (
        "snippet-3",
        "key_error.py",
        "user_data = {
    \"name\": \"Alice\",
    \"age\": 30,
    \"email\": \"alice@example.com\"
}

def get_user_info(data, key):
    return data[key]

phone = get_user_info(user_data, \"phone\")
print(f\"Phone: {phone}\")",
        "Traceback (most recent call last):
  File \"key_error.py\", line 10, in <module>
    phone = get_user_info(user_data, \"phone\")
  File \"key_error.py\", line 7, in get_user_info
    return data[key]
KeyError: 'phone'",
    ),
    (
        "snippet-4",
        "type_error.py",
        "def concatenate_strings(str1, str2):
    return str1 + str2

text = \"Hello\"
number = 42
result = concatenate_strings(text, number)
print(result)",
        "Traceback (most recent call last):
  File \"type_error.py\", line 6, in <module>
    result = concatenate_strings(text, number)
  File \"type_error.py\", line 2, in concatenate_strings
    return str1 + str2
TypeError: can only concatenate str (not \"int\") to str",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_ordered_and_addressable() {
        let catalog = SnippetCatalog::builtin();
        let ids: Vec<&str> = catalog.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["snippet-1", "snippet-2", "snippet-3", "snippet-4"]);

        let snippet = catalog
            .get(&SnippetId::from("snippet-2"))
            .expect("snippet-2 exists");
        assert_eq!(snippet.display_name, "division_zero.py");
        assert!(snippet
            .standard_error_text
            .ends_with("ZeroDivisionError: division by zero"));
        assert!(catalog.get(&SnippetId::from("snippet-9")).is_none());
    }

    #[test]
    fn editor_document_is_read_only_python() {
        let catalog = SnippetCatalog::builtin();
        let snippet = catalog.first().expect("catalog is not empty");
        let document = snippet.editor_document();

        assert!(document.read_only);
        assert_eq!(document.syntax_hint, "python");
        assert_eq!(document.source_text, snippet.source_text);
    }

    #[test]
    fn model_catalog_drops_blank_and_duplicate_ids() {
        let models = ModelCatalog::new(
            [" phi3:latest ", "", "phi3:latest", "qwen2:latest"]
                .into_iter()
                .map(ModelId::from),
        );
        assert_eq!(
            models.list(),
            &[ModelId::from("phi3:latest"), ModelId::from("qwen2:latest")]
        );
        assert_eq!(ModelCatalog::builtin().list().len(), 5);
    }

    #[test]
    fn identities_differ_when_any_component_differs() {
        let base = Identity::new(
            SnippetId::from("snippet-1"),
            ExplanationStyle::Pragmatic,
            ModelId::from("phi3:latest"),
        );
        let other_style = Identity {
            style: ExplanationStyle::Contingent,
            ..base.clone()
        };
        let other_model = Identity {
            model: ModelId::from("qwen2:latest"),
            ..base.clone()
        };

        assert_ne!(base, other_style);
        assert_ne!(base, other_model);
        assert_eq!(base, base.clone());
        assert_eq!(base.to_string(), "snippet-1/pragmatic/phi3:latest");
    }

    #[test]
    fn style_parse_accepts_only_known_names() {
        assert_eq!(
            ExplanationStyle::parse("contingent"),
            Some(ExplanationStyle::Contingent)
        );
        assert_eq!(ExplanationStyle::parse("verbose"), None);
    }
}
