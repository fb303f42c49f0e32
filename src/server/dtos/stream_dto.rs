use serde::{Deserialize, Serialize};

use crate::database::channel::ChannelDescriptor;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub id: Option<String>,
    // "redirect" (default) or "url" for players that want the address as text
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub genre: String,
    pub language: String,
}

impl From<&ChannelDescriptor> for ChannelSummary {
    fn from(channel: &ChannelDescriptor) -> Self {
        Self {
            id: channel.id.clone(),
            name: channel.name.clone(),
            genre: channel.genre.clone(),
            language: channel.language.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreamUrlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamUrlResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: None,
            stream_url: None,
            base_url: None,
            expires_in: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub total: usize,
    pub channels: Vec<ChannelDescriptor>,
}

/// facets for building filter dropdowns
#[derive(Debug, Serialize)]
pub struct ChannelStatsResponse {
    pub total: usize,
    pub genres: Vec<String>,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
}
