//! Extractive summaries via sentence-graph ranking (TextRank).
//!
//! Sentences are TF-IDF vectorized, linked by cosine similarity and ranked
//! with PageRank. The top `max(1, floor(n * ratio))` sentences are returned
//! highest score first; reading order is not restored.

pub mod graph;
pub mod text;

use crate::types::{AggregatorError, Result, SummarizerConfig};
use std::cmp::Ordering;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct TextRankSummarizer {
    config: SummarizerConfig,
}

impl TextRankSummarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        Self { config }
    }

    pub fn compression_ratio(&self) -> f64 {
        self.config.compression_ratio
    }

    /// Summary of `text`, or `None` for blank input or a failed ranking.
    /// Input with fewer than two sentences comes back unchanged.
    pub fn summarize(&self, text: &str, compression_ratio: f64) -> Option<String> {
        if text.trim().is_empty() {
            debug!("Refusing to summarize empty text");
            return None;
        }

        match self.try_summarize(text, compression_ratio) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, chars = text.len(), "Summarization failed");
                None
            }
        }
    }

    pub fn try_summarize(&self, text: &str, compression_ratio: f64) -> Result<String> {
        let sentences = text::split_sentences(text);
        match sentences.len() {
            0 => {
                return Err(AggregatorError::Summarization(
                    "no sentences found".to_string(),
                ))
            }
            1 => return Ok(text.to_string()),
            _ => {}
        }

        let scores = self.rank(&sentences)?;
        let order = rank_order(&scores);
        let keep = summary_length(sentences.len(), compression_ratio);

        debug!(sentences = sentences.len(), keep, "Ranked sentences");

        Ok(order
            .into_iter()
            .take(keep)
            .map(|i| sentences[i])
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// PageRank score per sentence over the similarity graph.
    pub fn rank(&self, sentences: &[&str]) -> Result<Vec<f64>> {
        let vectors = graph::tfidf_vectors(sentences)?;
        let similarity = graph::similarity_matrix(&vectors);
        graph::pagerank(
            &similarity,
            self.config.damping,
            self.config.tolerance,
            self.config.max_iterations,
        )
    }
}

/// Sentence indices by descending score; equal scores keep document order.
pub fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// `max(1, floor(n * ratio))`, capped at `n`.
pub fn summary_length(sentence_count: usize, compression_ratio: f64) -> usize {
    let scaled = (sentence_count as f64 * compression_ratio).floor();
    if scaled.is_finite() && scaled >= 1.0 {
        (scaled as usize).min(sentence_count)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "The city council approved the new transit budget on Tuesday. \
        The transit budget adds new bus routes across the city. \
        Council members debated the transit budget for three hours. \
        Local bakeries reported strong holiday sales. \
        Riders welcomed the new bus routes and the budget.";

    fn summarizer() -> TextRankSummarizer {
        TextRankSummarizer::default()
    }

    fn count_sentences(summary: &str) -> usize {
        text::split_sentences(summary).len()
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(summarizer().summarize("", 0.2), None);
        assert_eq!(summarizer().summarize("   \n ", 0.2), None);
    }

    #[test]
    fn single_sentence_is_returned_unchanged() {
        let text = "  Only one sentence here.";
        assert_eq!(summarizer().summarize(text, 0.2).as_deref(), Some(text));
    }

    #[test]
    fn output_length_follows_compression_ratio() {
        let s = summarizer();
        assert_eq!(count_sentences(&s.summarize(ARTICLE, 0.4).unwrap()), 2);
        assert_eq!(count_sentences(&s.summarize(ARTICLE, 0.2).unwrap()), 1);
        assert_eq!(count_sentences(&s.summarize(ARTICLE, 0.1).unwrap()), 1);
        assert_eq!(count_sentences(&s.summarize(ARTICLE, 1.0).unwrap()), 5);
    }

    #[test]
    fn summary_length_law() {
        assert_eq!(summary_length(5, 0.4), 2);
        assert_eq!(summary_length(2, 0.2), 1);
        assert_eq!(summary_length(10, 0.25), 2);
        assert_eq!(summary_length(3, 5.0), 3);
        assert_eq!(summary_length(3, f64::NAN), 1);
        assert_eq!(summary_length(3, -1.0), 1);
    }

    #[test]
    fn rank_scores_sum_to_one() {
        let sentences = text::split_sentences(ARTICLE);
        let scores = summarizer().rank(&sentences).unwrap();
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn summary_is_in_rank_order_not_reading_order() {
        // Sentence 2 shares terms with every other sentence, sentence 0 with one.
        let article = "Solar panels cut bills. \
            Wind farms expand quickly. \
            Solar panels and wind farms and hydro dams power homes. \
            Hydro dams store water.";
        let s = summarizer();
        let sentences = text::split_sentences(article);
        let scores = s.rank(&sentences).unwrap();
        let order = rank_order(&scores);
        assert_eq!(order[0], 2);

        let summary = s.summarize(article, 0.5).unwrap();
        let picked = text::split_sentences(&summary);
        assert_eq!(picked[0], sentences[2]);
        assert_eq!(picked[1], sentences[order[1]]);
        assert_ne!(picked[0], sentences[0]);
    }

    #[test]
    fn ties_keep_document_order() {
        assert_eq!(rank_order(&[0.25, 0.25, 0.5, 0.0]), vec![2, 0, 1, 3]);
    }

    #[test]
    fn output_is_deterministic() {
        let s = summarizer();
        assert_eq!(s.summarize(ARTICLE, 0.4), s.summarize(ARTICLE, 0.4));
    }

    #[test]
    fn stop_word_only_text_is_none() {
        assert_eq!(summarizer().summarize("It is what it is. And so on.", 0.5), None);
    }
}
