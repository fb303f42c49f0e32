use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::database::channel::{ChannelDescriptor, ChannelDirectory};

/// optional filters for listing channels, all of them combine
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// immutable channel snapshot, loaded once at startup
pub struct Catalog {
    channels: Vec<ChannelDescriptor>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Channel data file not found: {}", path.display()))?;
        let directory: ChannelDirectory = serde_json::from_str(&raw)
            .with_context(|| format!("Channel data file is malformed: {}", path.display()))?;

        let catalog = Self::from_channels(directory.data);
        info!("Loaded {} channels from {}", catalog.len(), path.display());

        Ok(catalog)
    }

    /// later duplicates of an id lose to the first one, same as a linear scan would
    pub fn from_channels(channels: Vec<ChannelDescriptor>) -> Self {
        let mut by_id = HashMap::with_capacity(channels.len());
        for (i, channel) in channels.iter().enumerate() {
            by_id.entry(channel.id.clone()).or_insert(i);
        }

        Self { channels, by_id }
    }

    pub fn lookup(&self, id: &str) -> Option<&ChannelDescriptor> {
        self.by_id.get(id).map(|&i| &self.channels[i])
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn search(&self, filter: &ChannelFilter) -> Vec<&ChannelDescriptor> {
        let query = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        self.channels
            .iter()
            .filter(|c| match &query {
                Some(q) => {
                    c.name.to_lowercase().contains(q)
                        || c.genre.to_lowercase().contains(q)
                        || c.language.to_lowercase().contains(q)
                        || c.id.to_lowercase().contains(q)
                }
                None => true,
            })
            .filter(|c| Self::matches(&filter.genre, &c.genre))
            .filter(|c| Self::matches(&filter.language, &c.language))
            .filter(|c| {
                filter
                    .country
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .is_none_or(|v| c.country.to_uppercase() == v.to_uppercase())
            })
            .collect()
    }

    pub fn genres(&self) -> Vec<String> {
        self.distinct(|c| &c.genre)
    }

    pub fn languages(&self) -> Vec<String> {
        self.distinct(|c| &c.language)
    }

    pub fn countries(&self) -> Vec<String> {
        self.distinct(|c| &c.country)
    }

    fn matches(wanted: &Option<String>, actual: &str) -> bool {
        wanted
            .as_deref()
            .filter(|v| !v.is_empty())
            .is_none_or(|v| v.eq_ignore_ascii_case(actual))
    }

    fn distinct(&self, field: impl Fn(&ChannelDescriptor) -> &String) -> Vec<String> {
        self.channels
            .iter()
            .map(|c| field(c).clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
