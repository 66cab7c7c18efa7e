//! Parsing of the model's classification answer.
//!
//! Small models rarely answer with bare JSON. The parser accepts markdown
//! fences, prose around the object, the legacy `responsible` key and legacy
//! category labels. An answer without a usable object is scanned for a bare
//! category token before it is rejected.

use serde::Deserialize;
use serde_json::Value;

use super::category::CATEGORY_TOKENS;
use super::Category;
use crate::config::MAX_ANSWER_PREVIEW_CHARS;
use crate::error_handling::ClassificationError;
use crate::utils::{excerpt, normalize_whitespace};

/// Category and explanation read from an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub category: Category,
    pub responsible_party: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct AnswerObject {
    category: Option<Value>,
    #[serde(alias = "responsible")]
    responsible_party: Option<Value>,
    reason: Option<Value>,
}

/// Reads the category, responsible party and reason from `answer`.
///
/// # Errors
///
/// Returns `ClassificationError::Unparseable` if no known category can be
/// found in the answer.
pub fn parse_answer(answer: &str) -> Result<ParsedAnswer, ClassificationError> {
    let unparseable = || {
        ClassificationError::Unparseable(excerpt(answer, MAX_ANSWER_PREVIEW_CHARS))
    };
    let body = strip_fences(answer);

    if let Some(object) = json_object(body) {
        let category = object
            .category
            .as_ref()
            .and_then(value_text)
            .and_then(|label| label.parse::<Category>().ok());
        if let Some(category) = category {
            return Ok(ParsedAnswer {
                category,
                responsible_party: object
                    .responsible_party
                    .as_ref()
                    .and_then(value_text)
                    .unwrap_or_default(),
                reason: object.reason.as_ref().and_then(value_text).unwrap_or_default(),
            });
        }
    }

    let category = find_category_token(body).ok_or_else(unparseable)?;
    Ok(ParsedAnswer {
        category,
        responsible_party: String::new(),
        reason: excerpt(body, MAX_ANSWER_PREVIEW_CHARS),
    })
}

/// Removes a surrounding markdown code fence, if any.
fn strip_fences(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

/// Decodes the outermost `{...}` span of `text`.
fn json_object(text: &str) -> Option<AnswerObject> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => normalize_whitespace(s),
        Value::Null => return None,
        other => normalize_whitespace(&other.to_string()),
    };
    (!text.is_empty()).then_some(text)
}

/// Finds the earliest category token in free text.
fn find_category_token(text: &str) -> Option<Category> {
    let lowered = text.to_ascii_lowercase().replace('-', "_");
    CATEGORY_TOKENS
        .iter()
        .filter_map(|token| {
            lowered
                .match_indices(token)
                .find(|(idx, _)| is_token_boundary(&lowered, *idx, token.len()))
                .map(|(idx, _)| (idx, *token))
        })
        .min_by_key(|(idx, token)| (*idx, std::cmp::Reverse(token.len())))
        .and_then(|(_, token)| token.parse().ok())
}

fn is_token_boundary(text: &str, start: usize, len: usize) -> bool {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back().map_or(true, |c| !is_word(c));
    let after = text[start + len..].chars().next().map_or(true, |c| !is_word(c));
    before && after
}
