use voice_core::{ConversationContext, Message};

use crate::config::FillerConfig;

/// Build the short context handed to the fast model.
///
/// Instructions and function-call records are stripped, only the
/// `max_context_items` most recent remaining items are kept, the filler
/// prompt goes first and `new_message` last. `history` may or may not already
/// contain `new_message`; it appears exactly once either way.
pub fn build_speculative_context(
    history: &ConversationContext,
    new_message: &Message,
    config: &FillerConfig,
) -> Vec<Message> {
    let prior: Vec<Message> = history
        .copy_filtered(true, true)
        .into_messages()
        .into_iter()
        .filter(|m| m.id != new_message.id)
        .collect();

    let recent = ConversationContext::from_messages(prior)
        .truncate(config.max_context_items)
        .into_messages();

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(config.system_prompt.clone()));
    messages.extend(recent);
    messages.push(new_message.clone());
    messages
}
