//! Grounding prompt construction.

use std::fmt;
use std::sync::Arc;

use trailhead_core::model::CatalogItem;
use trailhead_core::ports::ChatMessage;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for an outdoor camping store. \
Always reply with a short, friendly and lightly humorous message. \
If you do not know an answer, say 'I don't know that.' \
Only answer questions about outdoor camping products; for any other topic, explain that you \
can only help with outdoor camping products. \
Never claim a product exists unless it is given to you. \
Do not keep any memory of the conversation.";

/// The fixed instruction that scopes the assistant's domain and tone.
///
/// Set once from configuration and shared read-only by every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt(Arc<str>);

impl SystemPrompt {
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl fmt::Display for SystemPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the two-message instruction for a query.
///
/// With a match, the user message carries the query and the matched item's
/// name, description, and price. Without one, it states that nothing in the
/// catalog matched and carries no item data at all.
#[must_use]
pub fn build_messages(
    system: &SystemPrompt,
    query: &str,
    matched: Option<&CatalogItem>,
) -> [ChatMessage; 2] {
    let user = match matched {
        Some(item) => matched_instruction(query, item),
        None => unmatched_instruction(query),
    };
    [ChatMessage::system(system.as_str()), ChatMessage::user(user)]
}

fn matched_instruction(query: &str, item: &CatalogItem) -> String {
    format!(
        "You are helping a customer search for outdoor products. \
Write a catchy and friendly message using the following information:\n\
  - User question: {query}\n\
  - Found product name: {}\n\
  - Found product description: {}\n\
  - Found product price: {}\n\
Include the found product's name and price in your reply to the user's question.",
        item.name, item.description, item.price
    )
}

fn unmatched_instruction(query: &str) -> String {
    format!(
        "A customer asked: {query}\n\
No product in the catalog matched this question. \
Tell the customer, briefly and kindly, that you could not find a matching product. \
Do not suggest, name, or invent any product."
    )
}
