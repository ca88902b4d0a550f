use crate::types::{AggregatorError, Result};
use scraper::{ElementRef, Html, Selector};

/// Pulls the main body text out of a parsed article page.
pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the page holds nothing this rule recognizes.
    fn extract(&self, document: &Html) -> Option<String>;
}

/// Generic rule: the visible text of every `<p>`, trimmed and space-joined.
pub struct ParagraphRule {
    selector: Selector,
}

impl ParagraphRule {
    pub fn new() -> Self {
        Self {
            // "p" is a fixed, valid selector
            selector: Selector::parse("p").expect("static selector"),
        }
    }
}

impl Default for ParagraphRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule for ParagraphRule {
    fn name(&self) -> &str {
        "paragraphs"
    }

    fn extract(&self, document: &Html) -> Option<String> {
        join_texts(document.select(&self.selector))
    }
}

/// Site rule: the first selector that matches anything wins.
pub struct SelectorRule {
    name: String,
    selectors: Vec<Selector>,
}

impl SelectorRule {
    pub fn new(name: impl Into<String>, selectors: &[&str]) -> Result<Self> {
        let selectors = selectors
            .iter()
            .map(|s| {
                Selector::parse(s).map_err(|e| {
                    AggregatorError::Extraction(format!("Invalid selector {:?}: {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            selectors,
        })
    }
}

impl ExtractionRule for SelectorRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, document: &Html) -> Option<String> {
        self.selectors
            .iter()
            .find_map(|selector| join_texts(document.select(selector)))
    }
}

fn join_texts<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    let text = elements
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Rules shipped for the default sources.
pub fn builtin_rules() -> Result<Vec<(&'static str, SelectorRule)>> {
    Ok(vec![
        (
            "cnn.com",
            SelectorRule::new(
                "cnn",
                &[".article__content p", ".zn-body__paragraph", "[data-component-name='paragraph']"],
            )?,
        ),
        (
            "bbc.co.uk",
            SelectorRule::new("bbc", &["article [data-component='text-block'] p", "article p"])?,
        ),
        (
            "bbc.com",
            SelectorRule::new("bbc", &["article [data-component='text-block'] p", "article p"])?,
        ),
    ])
}
