use crate::core::error::StoryError;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const MAX_KEYWORDS: usize = 10;
pub const DEFAULT_MOOD: &str = "calm";

// Option sets offered by the story form.
pub const THEMES: [&str; 7] = [
    "adventure",
    "mystery",
    "romance",
    "fantasy",
    "comedy",
    "horror",
    "children",
];
pub const DURATIONS: [u32; 4] = [1, 3, 5, 10];
pub const MOODS: [&str; 9] = [
    "excitement",
    "joy",
    "sadness",
    "anger",
    "fear",
    "surprise",
    "calm",
    "mysterious",
    "neutral",
];

/// Form values as read, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub keywords: String,
    pub theme: String,
    pub duration_minutes: u32,
    pub moods: Vec<String>,
}

/// Body of `POST /api/generate-story`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryRequest {
    pub keywords: Vec<String>,
    pub theme: String,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub moods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryResult {
    pub story: String,
    pub duration_estimate: String,
    pub emotions_used: Vec<String>,
    pub word_count: u64,
    /// `None` when the backend produced the text but audio synthesis failed.
    pub audio_url: Option<String>,
}

/// Wire shape shared by success and failure responses.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub error: Option<String>,
    pub story: Option<String>,
    pub duration_estimate: Option<String>,
    pub emotions_used: Option<Vec<String>>,
    pub word_count: Option<u64>,
    pub audio_url: Option<String>,
    pub message: Option<String>,
    pub segments_count: Option<u64>,
}

impl GenerateResponse {
    pub fn into_result(self) -> Result<StoryResult, StoryError> {
        if !self.success {
            return Err(StoryError::Application(self.error));
        }

        if let Some(message) = &self.message {
            log::info!("Server: {}", message);
        }
        if let Some(count) = self.segments_count {
            log::debug!("Story narrated in {} emotional segments", count);
        }

        Ok(StoryResult {
            story: required(self.story, "story")?,
            duration_estimate: required(self.duration_estimate, "duration_estimate")?,
            emotions_used: required(self.emotions_used, "emotions_used")?,
            word_count: required(self.word_count, "word_count")?,
            audio_url: self.audio_url.filter(|url| !url.is_empty()),
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, StoryError> {
    value.ok_or_else(|| {
        StoryError::Transport(anyhow!("Malformed response: missing `{}`", field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = StoryRequest {
            keywords: vec!["dragon".to_string(), "forest".to_string()],
            theme: "adventure".to_string(),
            duration_minutes: 5,
            moods: vec!["calm".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keywords": ["dragon", "forest"],
                "theme": "adventure",
                "duration": 5,
                "moods": ["calm"]
            })
        );
    }

    #[test]
    fn test_success_response() {
        let body = r#"{
            "success": true,
            "story": "Once upon a time",
            "duration_estimate": "5 min",
            "emotions_used": ["calm"],
            "word_count": 120,
            "audio_url": "/audio/1.mp3",
            "segments_count": 4,
            "message": "Story and audio generated successfully!"
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.word_count, 120);
        assert_eq!(result.audio_url.as_deref(), Some("/audio/1.mp3"));
        assert_eq!(result.emotions_used, vec!["calm".to_string()]);
    }

    #[test]
    fn test_success_without_audio() {
        let body = r#"{"success": true, "story": "s", "duration_estimate": "1 minutes",
            "emotions_used": [], "word_count": 1, "audio_url": null}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_result().unwrap().audio_url, None);
    }

    #[test]
    fn test_failure_response() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"success": false, "error": "Rate limited"}"#).unwrap();
        match response.into_result() {
            Err(StoryError::Application(Some(message))) => assert_eq!(message, "Rate limited"),
            other => panic!("unexpected result: {:?}", other),
        }

        let response: GenerateResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(matches!(
            response.into_result(),
            Err(StoryError::Application(None))
        ));
    }

    #[test]
    fn test_success_missing_field_is_transport_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"success": true, "story": "s"}"#).unwrap();
        assert!(matches!(
            response.into_result(),
            Err(StoryError::Transport(_))
        ));
    }
}
