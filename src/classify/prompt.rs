//! Classification prompt.

use strum::IntoEnumIterator;

use super::Category;
use crate::config::MAX_PROMPT_BODY_CHARS;
use crate::parse::BounceRecord;
use crate::utils::{excerpt, strip_control_chars};

/// Builds the prompt asking the model to classify `record`.
///
/// The notice body is included (plain preferred, else HTML excerpt) so that
/// the model sees blocklist names or quota hints the reply line omits.
pub fn build_prompt(record: &BounceRecord) -> String {
    let code = record.error_code.as_deref().unwrap_or("(none)");
    let status = record
        .delivery_status
        .get("status")
        .map(String::as_str)
        .unwrap_or("(none)");
    let notice = if record.body_plain.is_empty() {
        &record.body_html
    } else {
        &record.body_plain
    };
    let notice = excerpt(&strip_control_chars(notice), MAX_PROMPT_BODY_CHARS);

    let mut prompt = String::from(
        "You are an email delivery error analyst. Classify the following permanent \
         delivery failure by its probable cause.\n\n",
    );
    prompt.push_str(&format!("Error Code: {code}\n"));
    prompt.push_str(&format!("DSN Status: {status}\n"));
    prompt.push_str(&format!(
        "Error Message: {}\n",
        strip_control_chars(&record.error_message)
    ));
    prompt.push_str(&format!("Failed Recipient: {}\n", record.to_addr));
    if !notice.is_empty() {
        prompt.push_str(&format!("Notice Excerpt: {notice}\n"));
    }

    prompt.push_str("\nCategories:\n");
    for category in Category::iter() {
        prompt.push_str(&format!(
            "- {} : {}\n",
            category.as_str(),
            category.prompt_description()
        ));
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object of the form \
         {\"category\": \"<one category key from the list>\", \
         \"responsible_party\": \"<who must act>\", \
         \"reason\": \"<one short sentence>\"}\n",
    );
    prompt
}
