use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "i",
    "in", "is", "it", "me", "my", "of", "on", "or", "so", "that", "the", "this", "to", "was",
    "we", "were", "with", "you",
];

fn stem(word: &str) -> &str {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

fn term_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(stem(&word).to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    let denom = norm(a) * norm(b);
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Cosine similarity in `[0, 1]` between `text` and the keyword set,
/// each keyword weighted once.
pub fn keyword_similarity(text: &str, keywords: &[String]) -> f64 {
    let mut wanted = HashMap::new();
    for keyword in keywords {
        for term in term_counts(keyword).into_keys() {
            wanted.insert(term, 1.0);
        }
    }
    let counts = term_counts(text);
    cosine(&counts, &wanted)
}

/// Indices of every entry sharing the maximum score, in input order.
pub fn best_indices(scores: &[f64]) -> Vec<usize> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| (**s - max).abs() < 1e-9)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn related_text_scores_higher() {
        let keywords = kw(&["dream", "nightmare", "lucid"]);
        let on_topic = keyword_similarity("I had a lucid dream last night, then a nightmare", &keywords);
        let off_topic = keyword_similarity("My landlord raised the rent again", &keywords);
        assert!(on_topic > off_topic);
        assert_eq!(off_topic, 0.0);
        assert!(on_topic <= 1.0);
    }

    #[test]
    fn plurals_match_their_keyword() {
        let keywords = kw(&["dream"]);
        assert!(keyword_similarity("Dreams", &keywords) > 0.99);
    }

    #[test]
    fn no_keywords_means_no_signal() {
        assert_eq!(keyword_similarity("anything at all", &[]), 0.0);
    }

    #[test]
    fn ties_are_reported_in_order() {
        assert_eq!(best_indices(&[0.2, 0.5, 0.1, 0.5]), vec![1, 3]);
        assert!(best_indices(&[]).is_empty());
    }
}
