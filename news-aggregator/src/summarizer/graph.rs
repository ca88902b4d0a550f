use super::text::terms;
use crate::types::{AggregatorError, Result};
use std::collections::{BTreeMap, HashMap};

/// `(term index, weight)` pairs sorted by term index.
pub type SparseVector = Vec<(usize, f64)>;

/// Sparse TF-IDF row per sentence, L2-normalized.
///
/// Weights follow the smoothed form `tf * (ln((1 + n) / (1 + df)) + 1)`.
/// Fails when no sentence has a single indexable term.
pub fn tfidf_vectors(sentences: &[&str]) -> Result<Vec<SparseVector>> {
    let mut vocabulary: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<BTreeMap<usize, f64>> = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let mut row = BTreeMap::new();
        for term in terms(sentence) {
            let next = vocabulary.len();
            let col = *vocabulary.entry(term).or_insert(next);
            *row.entry(col).or_insert(0.0) += 1.0;
        }
        counts.push(row);
    }
    if vocabulary.is_empty() {
        return Err(AggregatorError::Summarization(
            "empty vocabulary; sentences contain only stop words".to_string(),
        ));
    }

    let mut document_frequency = vec![0usize; vocabulary.len()];
    for col in counts.iter().flat_map(|row| row.keys()) {
        document_frequency[*col] += 1;
    }

    let n = sentences.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    Ok(counts
        .into_iter()
        .map(|row| {
            let mut weights: SparseVector =
                row.into_iter().map(|(col, tf)| (col, tf * idf[col])).collect();
            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                weights.iter_mut().for_each(|(_, w)| *w /= norm);
            }
            weights
        })
        .collect())
}

/// Pairwise cosine similarity of unit rows, i.e. their dot product. Empty
/// rows are orthogonal to everything, including themselves. The result is
/// exactly symmetric.
pub fn similarity_matrix(vectors: &[SparseVector]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in i..n {
            let sim = dot(&vectors[i], &vectors[j]).max(0.0);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }

    matrix
}

/// Merge-join over two index-sorted rows.
fn dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Weighted PageRank over an undirected adjacency matrix.
///
/// Self-loops are ignored. Nodes without edges spread their mass uniformly.
/// Converges when the L1 change drops below `n * tolerance`; the returned
/// scores sum to 1.
pub fn pagerank(
    adjacency: &[Vec<f64>],
    damping: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Vec<f64>> {
    let n = adjacency.len();
    if n == 0 {
        return Err(AggregatorError::Summarization("cannot rank an empty graph".to_string()));
    }

    let out_weight: Vec<f64> = adjacency
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, w)| *w)
                .sum()
        })
        .collect();

    let uniform = 1.0 / n as f64;
    let mut scores = vec![uniform; n];

    for _ in 0..max_iterations {
        let dangling: f64 = scores
            .iter()
            .zip(&out_weight)
            .filter(|(_, w)| **w <= 0.0)
            .map(|(s, _)| s)
            .sum();

        let mut next = vec![(1.0 - damping) * uniform + damping * dangling * uniform; n];
        for (i, row) in adjacency.iter().enumerate() {
            if out_weight[i] <= 0.0 {
                continue;
            }
            let share = damping * scores[i] / out_weight[i];
            for (j, &w) in row.iter().enumerate() {
                if j != i && w > 0.0 {
                    next[j] += share * w;
                }
            }
        }

        if next.iter().any(|s| !s.is_finite()) {
            return Err(AggregatorError::Summarization("non-finite rank score".to_string()));
        }

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;

        if delta < n as f64 * tolerance {
            let total: f64 = scores.iter().sum();
            return Ok(scores.into_iter().map(|s| s / total).collect());
        }
    }

    Err(AggregatorError::Summarization(format!(
        "rank did not converge within {} iterations",
        max_iterations
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCES: [&str; 4] = [
        "The central bank raised interest rates again.",
        "Interest rates are now at their highest level in years.",
        "Markets fell after the central bank decision.",
        "A local bakery won a pastry award.",
    ];

    #[test]
    fn similarity_is_symmetric() {
        let vectors = tfidf_vectors(&SENTENCES).unwrap();
        let matrix = similarity_matrix(&vectors);

        for i in 0..SENTENCES.len() {
            for j in 0..SENTENCES.len() {
                assert!((matrix[i][j] - matrix[j][i]).abs() < 1e-12);
            }
            assert!((matrix[i][i] - 1.0).abs() < 1e-9);
        }
        assert_eq!(matrix[0][3], 0.0);
        assert!(matrix[0][1] > 0.0);
    }

    #[test]
    fn vectors_are_unit_length_and_sorted() {
        for row in tfidf_vectors(&SENTENCES).unwrap() {
            let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
            assert!(row.windows(2).all(|pair| pair[0].0 < pair[1].0));
        }
    }

    #[test]
    fn dot_only_counts_shared_terms() {
        let a = vec![(0, 0.6), (2, 0.8)];
        let b = vec![(1, 1.0)];
        let c = vec![(0, 1.0), (3, 0.5)];
        assert_eq!(dot(&a, &b), 0.0);
        assert!((dot(&a, &c) - 0.6).abs() < 1e-12);
        assert_eq!(dot(&a, &[]), 0.0);
    }

    #[test]
    fn many_distinct_sentences_stay_sparse() {
        let sentences: Vec<String> = (0..1500)
            .map(|i| format!("Story{i} headline{i} mentions shared topic and detail{i} about item{i}."))
            .collect();
        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();

        let vectors = tfidf_vectors(&refs).unwrap();
        assert!(vectors.iter().all(|row| row.len() <= 8));

        let matrix = similarity_matrix(&vectors);
        let scores = pagerank(&matrix, 0.85, 1e-6, 100).unwrap();
        assert_eq!(scores.len(), 1500);
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stop_word_only_input_has_no_vocabulary() {
        let err = tfidf_vectors(&["It is what it is.", "And so on."]).unwrap_err();
        assert!(matches!(err, AggregatorError::Summarization(_)));
    }

    #[test]
    fn scores_form_a_distribution() {
        let matrix = similarity_matrix(&tfidf_vectors(&SENTENCES).unwrap());
        let scores = pagerank(&matrix, 0.85, 1e-6, 100).unwrap();

        assert_eq!(scores.len(), SENTENCES.len());
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        // the unrelated sentence is isolated and ranks last
        let lowest = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(lowest, Some(3));
    }

    #[test]
    fn edgeless_graph_ranks_uniformly() {
        let matrix = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let scores = pagerank(&matrix, 0.85, 1e-6, 100).unwrap();
        for s in scores {
            assert!((s - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn exhausted_iterations_is_an_error() {
        let matrix = vec![vec![0.0, 1.0, 0.2], vec![1.0, 0.0, 0.0], vec![0.2, 0.0, 0.0]];
        assert!(pagerank(&matrix, 0.85, 1e-12, 1).is_err());
    }
}
