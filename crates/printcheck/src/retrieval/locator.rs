use serde::{Deserialize, Serialize};

/// How an element on a provider page is found.
///
/// Text matching runs against the rendered `innerText` of elements, so it
/// only sees what a user would see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum Locator {
    /// Any CSS selector, including selector lists (`a, b`).
    Css(String),
    /// Element whose trimmed visible text equals the value exactly.
    Text(String),
    /// Element whose visible text contains the value, case-insensitively.
    TextContains(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(text.into())
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        Locator::TextContains(text.into())
    }

    /// Matches elements whose `attribute` equals `value`.
    pub fn attribute_equals(tag: &str, attribute: &str, value: &str) -> Self {
        Locator::Css(format!(
            "{}[{}=\"{}\"]",
            tag,
            attribute,
            escape_attribute_value(value)
        ))
    }

    /// Matches elements whose `attribute` contains any of `values`.
    pub fn attribute_contains_any<'a>(
        tag: &str,
        attribute: &str,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let selectors: Vec<String> = values
            .into_iter()
            .map(|value| {
                format!(
                    "{}[{}*=\"{}\"]",
                    tag,
                    attribute,
                    escape_attribute_value(value)
                )
            })
            .collect();
        Locator::Css(selectors.join(", "))
    }

    /// Short form used in log lines and error messages.
    pub fn describe(&self) -> String {
        match self {
            Locator::Css(selector) => format!("css={}", selector),
            Locator::Text(text) => format!("text={}", text),
            Locator::TextContains(text) => format!("text~={}", text),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::Text(_) => "text",
            Locator::TextContains(_) => "textContains",
        }
    }

    pub(crate) fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::Text(v) | Locator::TextContains(v) => v,
        }
    }
}

/// Escapes a value for use inside a double-quoted CSS attribute selector.
pub fn escape_attribute_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
