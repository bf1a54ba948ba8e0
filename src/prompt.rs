//! Builds model requests from a style template and a snippet.
//!
//! The user prompt template is looked up by style, the system instruction by
//! model. Substitution is a single pass, so placeholder-like text inside a
//! snippet (Python f-strings, for instance) is never expanded again.

use std::collections::BTreeMap;

use crate::catalog::{ExplanationStyle, ModelId, Snippet};
use crate::error::PromptError;

pub const SNIPPET_NAME_PLACEHOLDER: &str = "{snippet_name}";
pub const CODE_PLACEHOLDER: &str = "{code}";
pub const STANDARD_ERROR_PLACEHOLDER: &str = "{standard_error}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You rewrite Python runtime error messages for novice programmers. \
Answer in Markdown. Stay faithful to the traceback you are given, do not invent code that is not shown, \
and keep the answer short enough to read next to the original error.";

const PRAGMATIC_TEMPLATE: &str = "The program `{snippet_name}` fails with the standard Python error shown below.

```python
{code}
```

```
{standard_error}
```

Write an improved error message. State in one sentence what went wrong, point at the line that caused it, \
and give one concrete fix. Do not explain Python concepts beyond what the fix needs.";

const CONTINGENT_TEMPLATE: &str = "The program `{snippet_name}` fails with the standard Python error shown below.

```python
{code}
```

```
{standard_error}
```

Write an improved error message that is specific to this program. Refer to its own variable and function \
names, explain how the values flowing through them lead to the failure, and suggest a fix that fits the \
intent of the code.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPrompt {
    pub system_instruction: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptFormatter {
    templates: BTreeMap<ExplanationStyle, String>,
    system_prompts: BTreeMap<ModelId, String>,
}

impl PromptFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in templates for every style and the default system prompt for each of `models`.
    #[must_use]
    pub fn builtin<'a>(models: impl IntoIterator<Item = &'a ModelId>) -> Self {
        let formatter = Self::new()
            .with_template(ExplanationStyle::Pragmatic, PRAGMATIC_TEMPLATE)
            .with_template(ExplanationStyle::Contingent, CONTINGENT_TEMPLATE);

        models.into_iter().fold(formatter, |formatter, model| {
            formatter.with_system_prompt(model.clone(), DEFAULT_SYSTEM_PROMPT)
        })
    }

    #[must_use]
    pub fn with_template(mut self, style: ExplanationStyle, template: impl Into<String>) -> Self {
        self.templates.insert(style, template.into());
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, model: ModelId, prompt: impl Into<String>) -> Self {
        self.system_prompts.insert(model, prompt.into());
        self
    }

    /// Fails on the first style or model with no registered text.
    pub fn validate<'a>(
        &self,
        styles: impl IntoIterator<Item = ExplanationStyle>,
        models: impl IntoIterator<Item = &'a ModelId>,
    ) -> Result<(), PromptError> {
        for style in styles {
            self.template(style)?;
        }
        for model in models {
            self.system_prompt(model)?;
        }
        Ok(())
    }

    pub fn format(
        &self,
        style: ExplanationStyle,
        model: &ModelId,
        snippet: &Snippet,
    ) -> Result<FormattedPrompt, PromptError> {
        let template = self.template(style)?;
        let system_instruction = self.system_prompt(model)?.to_string();

        Ok(FormattedPrompt {
            system_instruction,
            user_prompt: substitute(template, snippet),
        })
    }

    fn template(&self, style: ExplanationStyle) -> Result<&str, PromptError> {
        self.templates
            .get(&style)
            .map(String::as_str)
            .ok_or(PromptError::MissingTemplate { style })
    }

    fn system_prompt(&self, model: &ModelId) -> Result<&str, PromptError> {
        self.system_prompts
            .get(model)
            .map(String::as_str)
            .ok_or_else(|| PromptError::MissingSystemPrompt {
                model: model.clone(),
            })
    }
}

fn substitute(template: &str, snippet: &Snippet) -> String {
    let replacements = [
        (SNIPPET_NAME_PLACEHOLDER, snippet.display_name.as_str()),
        (CODE_PLACEHOLDER, snippet.source_text.as_str()),
        (STANDARD_ERROR_PLACEHOLDER, snippet.standard_error_text.as_str()),
    ];

    let mut output = String::with_capacity(template.len() + snippet.source_text.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let tail = &rest[start..];
        match replacements
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                output.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                output.push('{');
                rest = &tail[1..];
            }
        }
    }
    output.push_str(rest);
    output
}
