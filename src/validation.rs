use crate::errors::ValidationError;
use crate::models::BroadcastDraft;

pub const MAX_BROADCAST_CHARS: usize = 500;

pub fn validate_broadcast(draft: &BroadcastDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() || draft.message.trim().is_empty() {
        return Err(ValidationError::MissingTitleOrMessage);
    }
    if draft.message.chars().count() > MAX_BROADCAST_CHARS {
        return Err(ValidationError::MessageTooLong {
            max: MAX_BROADCAST_CHARS,
        });
    }
    Ok(())
}

pub fn validate_ticket_response(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::MissingMessage);
    }
    Ok(())
}

pub fn validate_search(query: &str) -> Result<&str, ValidationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptySearch);
    }
    Ok(query)
}
