use serde::{Deserialize, Serialize};

/// one entry of the channel directory, read only once loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub name: String,
    pub genre: String,
    pub language: String,
    pub url: String,
    pub logo: String,
    pub chno: String,
    pub country: String,
}

/// shape of the channels file on disk, title and developers are carried along but unused
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDirectory {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub developers: Option<String>,
    pub data: Vec<ChannelDescriptor>,
}
