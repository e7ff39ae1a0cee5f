//! Citation line formatting and verbatim excerpt extraction.

use super::state::Citation;

/// Maximum number of characters of a quoted excerpt checked by Verify.
pub const EXCERPT_MAX_CHARS: usize = 50;

/// Format a citation as the line the drafting prompt is asked to reuse.
///
/// Citations without an article number render the placeholder `X`.
pub fn format_citation(citation: &Citation) -> String {
    let number = citation
        .article_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "X".to_string());
    format!(
        "According to Article {} of {}: \"{}\"",
        number, citation.source_title, citation.article_text
    )
}

pub fn format_citations(citations: &[Citation]) -> Vec<String> {
    citations.iter().map(format_citation).collect()
}

/// The text between the first and last `"` of a line, cut to
/// [`EXCERPT_MAX_CHARS`] characters. Empty when the line has fewer than two
/// quote characters.
pub fn quoted_excerpt(line: &str) -> &str {
    let (Some(first), Some(last)) = (line.find('"'), line.rfind('"')) else {
        return "";
    };
    if last <= first {
        return "";
    }
    let inner = &line[first + 1..last];
    match inner.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((idx, _)) => &inner[..idx],
        None => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_article_number() {
        let c = Citation::new("Water Law", "Do not dump waste.").with_article_number(34);
        assert_eq!(
            format_citation(&c),
            "According to Article 34 of Water Law: \"Do not dump waste.\""
        );
    }

    #[test]
    fn formats_missing_number_as_placeholder() {
        let c = Citation::new("Water Law", "text");
        assert!(format_citation(&c).starts_with("According to Article X of Water Law"));
    }

    #[test]
    fn excerpt_is_text_between_outer_quotes() {
        assert_eq!(quoted_excerpt(r#"a "b "c" d" e"#), r#"b "c" d"#);
    }

    #[test]
    fn excerpt_empty_without_two_quotes() {
        assert_eq!(quoted_excerpt("no quotes"), "");
        assert_eq!(quoted_excerpt("one \" quote"), "");
        assert_eq!(quoted_excerpt("\"\""), "");
    }

    #[test]
    fn excerpt_truncates_by_characters() {
        let text: String = "水".repeat(80);
        let line = format!("x \"{}\"", text);
        let excerpt = quoted_excerpt(&line);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
        assert!(text.starts_with(excerpt));
    }

    #[test]
    fn excerpt_of_formatted_citation_is_article_text() {
        let c = Citation::new("Flood Control Law", "Levees shall be inspected yearly.");
        let line = format_citation(&c);
        assert_eq!(quoted_excerpt(&line), "Levees shall be inspected yearly.");
    }
}
