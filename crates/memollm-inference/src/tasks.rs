//! Tag suggestion and summarization built on top of chat completion.
//!
//! Providers without a native endpoint for these tasks delegate here,
//! passing themselves as the completion backend.

use memollm_core::{
    defaults, CompletionRequest, LlmProvider, Message, Result, SuggestTagsRequest,
    SuggestTagsResponse, SummarizeRequest, SummarizeResponse,
};
use tracing::{debug, warn};

use crate::tag_parse::{extract_tags_from_text, parse_tag_list};

const TAG_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that suggests relevant tags for notes and memos.
Analyze the content and suggest concise, relevant tags that capture the main topics.
Return ONLY a JSON array of tag strings, nothing else. Example: ["project", "meeting", "todo"]
Tags should be lowercase, single words or hyphenated phrases (e.g., "machine-learning")."#;

/// Build the (system, user) prompt pair for a tag request.
pub fn tag_prompts(req: &SuggestTagsRequest) -> (String, String) {
    let max_tags = effective_max_tags(req);

    let mut system = TAG_SYSTEM_PROMPT.to_string();
    if let Some(language) = req.language.as_deref().filter(|l| !l.trim().is_empty()) {
        system.push_str(&format!("\nWrite the tags in {}.", language.trim()));
    }

    let existing_hint = if req.existing_tags.is_empty() {
        String::new()
    } else {
        format!(
            "\nPrefer using these existing tags when relevant: [{}]",
            req.existing_tags.join(", ")
        )
    };

    let user = format!(
        "Suggest up to {} tags for this content:{}\n\nContent:\n{}",
        max_tags, existing_hint, req.content
    );
    (system, user)
}

/// Build the (system, user) prompt pair for a summary request.
pub fn summary_prompts(req: &SummarizeRequest) -> (String, String) {
    let max_length = if req.max_length == 0 {
        defaults::SUMMARY_MAX_LENGTH
    } else {
        req.max_length
    };
    let style = if req.style.trim().is_empty() {
        defaults::SUMMARY_STYLE
    } else {
        req.style.trim()
    };

    let system = format!(
        "You are a helpful assistant that summarizes content.\n\
         Create a {} summary that captures the main points.\n\
         Keep the summary under {} characters.\n\
         Be concise and informative.",
        style, max_length
    );
    let user = format!("Summarize this content:\n\n{}", req.content);
    (system, user)
}

fn effective_max_tags(req: &SuggestTagsRequest) -> usize {
    if req.max_tags == 0 {
        defaults::MAX_TAGS
    } else {
        req.max_tags
    }
}

/// Ask the provider for tags via a low-temperature completion.
///
/// A reply that is not a JSON array falls back to heuristic extraction.
/// The tag count is capped after parsing.
pub async fn default_suggest_tags<P>(provider: &P, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse>
where
    P: LlmProvider + ?Sized,
{
    let (system, user) = tag_prompts(req);
    let completion = CompletionRequest::new(vec![Message::system(system), Message::user(user)])
        .with_temperature(defaults::TAG_TEMPERATURE)
        .with_max_tokens(defaults::TAG_MAX_TOKENS);

    let response = provider.complete(&completion).await?;

    let mut tags = match parse_tag_list(&response.content) {
        Some(tags) => tags,
        None => {
            warn!(
                subsystem = "inference",
                provider = %provider.provider_type(),
                response_len = response.content.len(),
                "Tag reply was not a JSON array, using text extraction"
            );
            extract_tags_from_text(&response.content)
        }
    };
    tags.truncate(effective_max_tags(req));

    debug!(
        subsystem = "inference",
        provider = %provider.provider_type(),
        tag_count = tags.len(),
        "Tags suggested"
    );
    Ok(SuggestTagsResponse {
        tags,
        confidence: None,
    })
}

/// Ask the provider for a styled summary under a character budget.
pub async fn default_summarize<P>(provider: &P, req: &SummarizeRequest) -> Result<SummarizeResponse>
where
    P: LlmProvider + ?Sized,
{
    let (system, user) = summary_prompts(req);
    let completion = CompletionRequest::new(vec![Message::system(system), Message::user(user)])
        .with_temperature(defaults::SUMMARY_TEMPERATURE)
        .with_max_tokens(defaults::SUMMARY_MAX_TOKENS);

    let response = provider.complete(&completion).await?;
    Ok(SummarizeResponse {
        summary: response.content.trim().to_string(),
        key_points: Vec::new(),
    })
}
