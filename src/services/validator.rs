use crate::core::error::ValidationError;
use crate::core::model::{RawInput, StoryRequest, DEFAULT_MOOD, MAX_KEYWORDS};

/// Checks run in order and the first failure wins. An empty mood set is not
/// an error: it becomes `["calm"]`.
pub fn validate(raw: RawInput) -> Result<StoryRequest, ValidationError> {
    let keywords = raw.keywords.trim();
    if keywords.is_empty() {
        return Err(ValidationError::EmptyKeywords);
    }

    let keywords: Vec<String> = keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        return Err(ValidationError::NoValidKeywords);
    }
    if keywords.len() > MAX_KEYWORDS {
        return Err(ValidationError::TooManyKeywords);
    }

    let moods = if raw.moods.is_empty() {
        vec![DEFAULT_MOOD.to_string()]
    } else {
        raw.moods
    };

    Ok(StoryRequest {
        keywords,
        theme: raw.theme,
        duration_minutes: raw.duration_minutes,
        moods,
    })
}
