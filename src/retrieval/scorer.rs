//! Keyword relevance scoring over corpus lines.

use super::corpus::Corpus;
use super::Retrieval;
use crate::pipeline::Citation;

/// Count case-insensitive, non-overlapping occurrences of `query` in `line`.
pub fn score_line(line: &str, query: &str) -> usize {
    if query.is_empty() {
        return 0;
    }
    line.to_lowercase().matches(&query.to_lowercase()).count()
}

/// Leading article number of a line, e.g. `Article 12 ...` or `第12条 ...`.
pub fn parse_article_number(line: &str) -> Option<u32> {
    let digits = |s: &str| -> Option<(u32, usize)> {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if end == 0 {
            return None;
        }
        s[..end].parse().ok().map(|n| (n, end))
    };

    let trimmed = line.trim_start();
    if let Some(prefix) = trimmed.get(..8) {
        if prefix.eq_ignore_ascii_case("article ") {
            return digits(trimmed[8..].trim_start()).map(|(n, _)| n);
        }
    }
    if let Some(rest) = trimmed.strip_prefix('第') {
        let (n, end) = digits(rest)?;
        if rest[end..].starts_with('条') {
            return Some(n);
        }
    }
    None
}

/// Rank scorable corpus lines against `query`.
///
/// Candidates are sorted by score (ties keep corpus order), deduplicated on
/// `(title, text)` keeping the best-scoring instance, and cut to `top_k`.
pub fn rank(corpus: &Corpus, query: &str, top_k: usize) -> Retrieval {
    let query = query.trim();
    if query.is_empty() || top_k == 0 {
        return Retrieval::InsufficientEvidence;
    }

    let mut scored: Vec<(usize, Citation)> = corpus
        .scorable_lines()
        .filter_map(|(title, line)| {
            let score = score_line(line, query);
            if score == 0 {
                return None;
            }
            let mut citation = Citation::new(title, line);
            citation.article_number = parse_article_number(line);
            Some((score, citation))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut ranked: Vec<Citation> = Vec::new();
    for (_, citation) in scored {
        if ranked.iter().any(|c| c.key() == citation.key()) {
            continue;
        }
        ranked.push(citation);
        if ranked.len() == top_k {
            break;
        }
    }

    if ranked.is_empty() {
        Retrieval::InsufficientEvidence
    } else {
        Retrieval::Found(ranked)
    }
}
