use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;

/// Language routing passed verbatim to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// ISO 639-1 codes the server may detect
    pub languages: Vec<String>,
    /// Allow switching language mid-utterance
    pub code_switching: bool,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            languages: ["es", "ru", "en", "fr"].iter().map(|l| l.to_string()).collect(),
            code_switching: true,
        }
    }
}

/// Static streaming configuration sent once at negotiation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub language_config: LanguageConfig,
}

/// Body of the negotiation request: audio format fields merged with the streaming configuration
#[derive(Debug, Clone, Serialize)]
pub struct InitiateRequest {
    #[serde(flatten)]
    pub format: AudioFormat,
    #[serde(flatten)]
    pub streaming: StreamingConfig,
}

/// Successful negotiation response
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateResponse {
    #[serde(default)]
    pub id: Option<String>,
    /// WebSocket endpoint for the streaming connection
    pub url: String,
    /// Remaining session fields, kept for logging
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_is_flat() {
        let request = InitiateRequest {
            format: AudioFormat {
                encoding: "wav/pcm".to_string(),
                sample_rate: 16000,
                bit_depth: 16,
                channels: 1,
            },
            streaming: StreamingConfig::default(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["encoding"], "wav/pcm");
        assert_eq!(json["sample_rate"], 16000);
        assert_eq!(json["bit_depth"], 16);
        assert_eq!(json["channels"], 1);
        assert_eq!(json["language_config"]["languages"][2], "en");
        assert_eq!(json["language_config"]["code_switching"], true);
    }

    #[test]
    fn test_response_keeps_extra_fields() {
        let json = r#"{
            "id": "45463597-20b7-4af7-b3b3-f5fb778203ab",
            "url": "wss://api.gladia.io/v2/live?token=abc",
            "created_at": "2024-09-10T12:00:00Z"
        }"#;

        let response: InitiateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.url, "wss://api.gladia.io/v2/live?token=abc");
        assert_eq!(
            response.id.as_deref(),
            Some("45463597-20b7-4af7-b3b3-f5fb778203ab")
        );
        assert!(response.extra.contains_key("created_at"));
    }
}
