//! Plain-text document renderer used by the Export stage.
//!
//! Layout: centred title, indented body paragraphs, the citation block, then
//! a right-aligned date and signature placeholder.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::pipeline::citation::format_citations;
use crate::pipeline::engine::DEFAULT_DOCUMENT_TYPE;
use crate::pipeline::{Artifact, DocumentRenderer, SessionState};

/// Page width used for centring and right alignment, in characters.
const PAGE_WIDTH: usize = 64;
const PARAGRAPH_INDENT: &str = "    ";
const SIGNATURE_PLACEHOLDER: &str = "(Issuing authority)";

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer {
    /// Fixed issue date; today's UTC date when unset.
    date: Option<NaiveDate>,
}

impl PlainTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }

    /// Lay out the document text for `state`.
    pub fn render_text(&self, state: &SessionState) -> String {
        let title = state
            .document_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_DOCUMENT_TYPE);
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut lines = vec![format!("{:^width$}", title, width = PAGE_WIDTH)
            .trim_end()
            .to_string()];
        lines.push(String::new());

        for line in state.document_content.trim().lines() {
            let line = line.trim();
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", PARAGRAPH_INDENT, line));
            }
        }

        let citations = format_citations(&state.citations);
        if !citations.is_empty() {
            lines.push(String::new());
            lines.extend(citations.into_iter().map(|c| format!("{}{}", PARAGRAPH_INDENT, c)));
        }

        lines.push(String::new());
        lines.push(format!(
            "{:>width$}",
            date.format("%Y-%m-%d").to_string(),
            width = PAGE_WIDTH
        ));
        lines.push(format!("{:>width$}", SIGNATURE_PLACEHOLDER, width = PAGE_WIDTH));

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

#[async_trait]
impl DocumentRenderer for PlainTextRenderer {
    async fn render(&self, state: &SessionState) -> anyhow::Result<Artifact> {
        Ok(Artifact {
            bytes: self.render_text(state).into_bytes(),
            content_type: TEXT_CONTENT_TYPE.to_string(),
            file_name: format!("{}.txt", state.session_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Citation;

    fn renderer() -> PlainTextRenderer {
        PlainTextRenderer::with_date(NaiveDate::from_ymd_opt(2026, 1, 28).unwrap())
    }

    #[test]
    fn test_layout_order() {
        let mut state = SessionState::new("s-1", "raw", Some("Rectification Notice".into()));
        state.document_content = "First paragraph.\n\nSecond paragraph.".into();
        state.citations = vec![Citation::new("Water Law", "No dumping.").with_article_number(34)];

        let text = renderer().render_text(&state);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0].trim(), "Rectification Notice");
        assert!(lines[0].starts_with(' '));
        assert_eq!(lines[2], "    First paragraph.");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "    Second paragraph.");
        assert_eq!(
            lines[6],
            "    According to Article 34 of Water Law: \"No dumping.\""
        );
        assert!(lines[8].ends_with("2026-01-28"));
        assert_eq!(lines[8].len(), PAGE_WIDTH);
        assert!(lines[9].ends_with(SIGNATURE_PLACEHOLDER));
    }

    #[test]
    fn test_defaults_title_and_skips_empty_citation_block() {
        let state = SessionState::new("s-2", "raw", None);
        let text = renderer().render_text(&state);
        assert!(text.lines().next().unwrap().contains(DEFAULT_DOCUMENT_TYPE));
        assert!(!text.contains("According to"));
    }

    #[tokio::test]
    async fn test_artifact_metadata() {
        let state = SessionState::new("abc", "raw", None);
        let artifact = renderer().render(&state).await.unwrap();
        assert_eq!(artifact.file_name, "abc.txt");
        assert_eq!(artifact.content_type, TEXT_CONTENT_TYPE);
        assert!(!artifact.bytes.is_empty());
    }
}
