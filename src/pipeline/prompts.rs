//! Prompt templates for the Draft stage and parsing of model output.

use super::collaborators::ChatMessage;
use super::state::ExtractedFields;

/// System prompt for field extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You assist a water administration enforcement office. \
From the on-site description, interview record or OCR text supplied by the user, extract the \
offending party, the time, the place and the violation. Output exactly one JSON object with the \
optional string fields \"subject\", \"time\", \"place\" and \"violation\". Output nothing else.";

/// Field names (in order) that contribute to the retrieval query.
pub const QUERY_FIELDS: [&str; 2] = ["violation", "place"];

pub fn extraction_messages(raw_input: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
        ChatMessage::user(raw_input),
    ]
}

pub fn drafting_messages(
    raw_input: &str,
    document_type: &str,
    citation_lines: &[String],
) -> Vec<ChatMessage> {
    let system = format!(
        "You draft official documents for a water administration office. Using the material \
         and the legal citations provided, draft the body of a \"{}\" that follows standard \
         official style. Quote citations exactly in the format given. Output only the body \
         text, without title or signature block.",
        document_type
    );
    let user = format!(
        "Material:\n{}\n\nLegal basis (cite in this format):\n{}",
        raw_input,
        citation_lines.join("\n")
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Parse the extraction response into string fields.
///
/// Markdown code fences are stripped first. Anything that is not a JSON
/// object yields an empty map; non-string values are skipped.
pub fn parse_extracted_fields(response: &str) -> ExtractedFields {
    let body = strip_code_fence(response.trim());
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some((key, s)),
                _ => None,
            })
            .collect(),
        Ok(_) => ExtractedFields::new(),
        Err(e) => {
            tracing::debug!("Extraction response is not JSON: {}", e);
            ExtractedFields::new()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Build the retrieval query: selected extracted fields, then the raw input.
pub fn build_query(fields: &ExtractedFields, raw_input: &str) -> String {
    QUERY_FIELDS
        .iter()
        .filter_map(|name| fields.get(*name))
        .map(|s| s.as_str())
        .chain(std::iter::once(raw_input))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
