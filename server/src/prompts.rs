//! System prompts and chat message construction

use pagesmith_proto::GenerateRequest;
use pagesmith_proto::patch::{REPLACE_MARKER, SEARCH_MARKER, SEPARATOR_MARKER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

const FIRST_GENERATION_PROMPT: &str = "You are an expert web designer and front-end developer. \
Create a complete, self-contained HTML document for the page the user describes. \
Put all CSS in a <style> element in the <head> and all scripts in inline <script> elements. \
Use semantic HTML, a responsive layout and accessible color contrast. \
Respond with the full document only, starting with <!DOCTYPE html> and ending with </html>. \
Do not add explanations before or after the document.";

/// The follow-up prompt for editing an existing document
pub fn follow_up_prompt(current_html: &str) -> String {
    format!(
        "You are an expert web designer editing an existing HTML document. \
Apply the user's requested change by emitting one or more SEARCH/REPLACE blocks in exactly this format:\n\n\
{search}\n\
[exact lines copied from the current document]\n\
{separator}\n\
[replacement lines]\n\
{replace}\n\n\
Rules:\n\
- The SEARCH part must match the current document character for character, including indentation.\n\
- Keep each SEARCH part as short as possible while still being unique in the document.\n\
- Use several blocks for several separate edits, in document order.\n\
- Only if the change affects most of the page, respond with a complete new document starting with <!DOCTYPE html> instead.\n\n\
Current document:\n\
```html\n\
{html}\n\
```",
        search = SEARCH_MARKER,
        separator = SEPARATOR_MARKER,
        replace = REPLACE_MARKER,
        html = current_html,
    )
}

/// System prompt plus user prompt for one generation request.
/// Follow-ups without a current document are treated as first generations.
pub fn build_messages(request: &GenerateRequest) -> Vec<ChatMessage> {
    let system = match request.context_html() {
        Some(html) => follow_up_prompt(html),
        None => FIRST_GENERATION_PROMPT.to_string(),
    };
    vec![ChatMessage::system(system), ChatMessage::user(request.prompt.clone())]
}
