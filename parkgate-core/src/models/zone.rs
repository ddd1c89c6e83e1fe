//! Zone to barrier-channel defaults.

use std::collections::{BTreeMap, HashMap};

/// Channels used when a record carries none, keyed by zone.
const DEFAULT_CHANNELS: &[(&str, &str)] = &[
    ("P3", "8dc9685f-a80b-4d95-ae19-da340efe89ab"),
    ("P3-05", "aa7eec70-cda7-493f-a523-809877fe4d34"),
    ("P3-06", "8dc9685f-a80b-4d95-ae19-da340efe89ab"),
    ("P4", "a6c7cccc-d00c-4d6d-8717-b38c2a97172e"),
];

/// Static zone → channel table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneChannels {
    channels: BTreeMap<String, String>,
}

impl Default for ZoneChannels {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS
                .iter()
                .map(|(zone, channel)| ((*zone).to_string(), (*channel).to_string()))
                .collect(),
        }
    }
}

impl ZoneChannels {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            channels: BTreeMap::new(),
        }
    }

    /// Returns the defaults with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        for (zone, channel) in overrides {
            table.channels.insert(zone.clone(), channel.clone());
        }
        table
    }

    /// Channel configured for `zone`.
    pub fn get(&self, zone: &str) -> Option<&str> {
        self.channels.get(zone).map(String::as_str)
    }

    /// Prefers a non-empty record channel, then the table.
    pub fn resolve(&self, record_channel: Option<&str>, zone: &str) -> Option<String> {
        record_channel
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| self.get(zone))
            .map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_record() {
        let table = ZoneChannels::default();
        assert_eq!(table.resolve(Some("own"), "P3").as_deref(), Some("own"));
        assert_eq!(
            table.resolve(Some(" "), "P3").as_deref(),
            Some("8dc9685f-a80b-4d95-ae19-da340efe89ab")
        );
        assert_eq!(table.resolve(None, "P9"), None);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("P9".to_string(), "chan-9".to_string());
        let table = ZoneChannels::with_overrides(&overrides);
        assert_eq!(table.get("P9"), Some("chan-9"));
        assert!(table.get("P4").is_some());
    }
}
