pub mod rules;

pub use rules::{ExtractionRule, ParagraphRule, SelectorRule};

use crate::fetcher::Fetcher;
use crate::types::{AggregatorError, Result};
use scraper::Html;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Domain-keyed extraction rules with a single generic fallback.
pub struct RuleRegistry {
    rules: HashMap<String, Box<dyn ExtractionRule>>,
    fallback: Box<dyn ExtractionRule>,
}

impl RuleRegistry {
    pub fn new(fallback: Box<dyn ExtractionRule>) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    /// Registry preloaded with the shipped site rules.
    pub fn with_builtin_rules() -> Result<Self> {
        let mut registry = Self::default();
        for (domain, rule) in rules::builtin_rules()? {
            registry.register(domain, Box::new(rule));
        }
        Ok(registry)
    }

    /// Register `rule` for `domain` and all of its subdomains.
    pub fn register(&mut self, domain: &str, rule: Box<dyn ExtractionRule>) {
        self.rules.insert(domain.trim_start_matches("www.").to_lowercase(), rule);
    }

    /// Rule registered for `host` or its nearest registered parent domain.
    pub fn rule_for(&self, host: &str) -> Option<&dyn ExtractionRule> {
        let host = host.to_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(rule) = self.rules.get(candidate) {
                return Some(rule.as_ref());
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return None,
            }
        }
    }

    pub fn fallback(&self) -> &dyn ExtractionRule {
        self.fallback.as_ref()
    }

    /// Run the site rule for `host` if one exists, then the fallback.
    pub fn extract(&self, host: Option<&str>, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        if let Some(rule) = host.and_then(|h| self.rule_for(h)) {
            if let Some(text) = rule.extract(&document) {
                return Some(text);
            }
            debug!(rule = rule.name(), "Site rule matched nothing, using fallback");
        }

        self.fallback.extract(&document)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(Box::new(ParagraphRule::new()))
    }
}

/// Fetches article pages and extracts their main text.
pub struct ContentExtractor {
    fetcher: Fetcher,
    rules: RuleRegistry,
}

impl ContentExtractor {
    pub fn new(fetcher: Fetcher, rules: RuleRegistry) -> Self {
        Self { fetcher, rules }
    }

    /// Body text of the article at `url`, or `None` when the page is
    /// unreachable, non-2xx, or yields no text. Failures are logged.
    pub async fn extract(&self, url: &str) -> Option<String> {
        match self.try_extract(url).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(url = %url, error = %e, "Content extraction failed");
                None
            }
        }
    }

    pub async fn try_extract(&self, url: &str) -> Result<String> {
        let host = Url::parse(url)?.host_str().map(str::to_owned);
        let html = self.fetcher.fetch_text(url).await?;

        self.rules
            .extract(host.as_deref(), &html)
            .ok_or_else(|| AggregatorError::Extraction(format!("No article text found at {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchConfig;
    use mockito::Server;

    struct Fixed(&'static str);

    impl ExtractionRule for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn extract(&self, _document: &Html) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn extractor(rules: RuleRegistry) -> ContentExtractor {
        let fetcher = Fetcher::new(FetchConfig {
            host_interval_ms: 0,
            ..FetchConfig::default()
        })
        .unwrap();
        ContentExtractor::new(fetcher, rules)
    }

    #[test]
    fn rule_lookup_walks_up_subdomains() {
        let mut registry = RuleRegistry::default();
        registry.register("www.example.com", Box::new(Fixed("site")));

        assert_eq!(registry.rule_for("example.com").map(|r| r.name()), Some("fixed"));
        assert_eq!(registry.rule_for("edition.Example.com").map(|r| r.name()), Some("fixed"));
        assert!(registry.rule_for("example.org").is_none());
        assert!(registry.rule_for("com").is_none());
    }

    #[test]
    fn registered_domain_uses_site_rule() {
        let mut registry = RuleRegistry::default();
        registry.register("example.com", Box::new(Fixed("from site rule")));

        let text = registry.extract(Some("news.example.com"), "<p>from paragraphs</p>");
        assert_eq!(text.as_deref(), Some("from site rule"));
    }

    #[test]
    fn unknown_domain_uses_paragraph_fallback() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let text = registry.extract(Some("unknown.test"), "<p>One.</p><p>Two.</p>");
        assert_eq!(text.as_deref(), Some("One. Two."));
    }

    #[test]
    fn builtin_site_rule_falls_back_when_layout_differs() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let text = registry.extract(Some("www.cnn.com"), "<div><p>Plain layout.</p></div>");
        assert_eq!(text.as_deref(), Some("Plain layout."));
    }

    #[tokio::test]
    async fn malformed_html_returns_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body("<html><body><div><span>unclosed <<>> &&& </body")
            .create_async()
            .await;

        let extractor = extractor(RuleRegistry::default());
        assert!(extractor.extract(&format!("{}/broken", server.url())).await.is_none());
    }

    #[tokio::test]
    async fn non_success_returns_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone")
            .with_status(500)
            .create_async()
            .await;

        let extractor = extractor(RuleRegistry::default());
        assert!(extractor.extract(&format!("{}/gone", server.url())).await.is_none());
    }

    #[tokio::test]
    async fn extracts_paragraph_text_from_served_page() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/story")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><h1>Title</h1><p>Body one.</p><p>Body two.</p></body></html>")
            .create_async()
            .await;

        let extractor = extractor(RuleRegistry::with_builtin_rules().unwrap());
        let text = extractor.extract(&format!("{}/story", server.url())).await;
        assert_eq!(text.as_deref(), Some("Body one. Body two."));
    }
}
