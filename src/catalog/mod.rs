//! Static language catalog
//!
//! The fixed table of language/country/region triples that rounds are drawn
//! from, plus the region enumeration used to filter it.

mod languages;

pub use languages::{entries_for, LanguageEntry, LANGUAGES};

use serde::{Deserialize, Serialize};

/// Map regions a round can be drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Africa,
    Asia,
    Europe,
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "South America")]
    SouthAmerica,
    Oceania,
    /// Wildcard: no region filter applied
    World,
}

impl Region {
    /// The concrete regions, excluding the `World` wildcard
    pub const CONCRETE: [Region; 6] = [
        Region::Africa,
        Region::Asia,
        Region::Europe,
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Oceania,
    ];

    pub fn is_world(self) -> bool {
        self == Region::World
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Africa => "Africa",
            Region::Asia => "Asia",
            Region::Europe => "Europe",
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Oceania => "Oceania",
            Region::World => "World",
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::World
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prebuilt TTS voices offered by the content service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voice {
    Kore,
    Puck,
}

impl Voice {
    /// Voice used to read a sentence in the given language.
    ///
    /// French and Japanese are read by Kore, everything else by Puck.
    pub fn for_language(language: &str) -> Self {
        match language {
            "French" | "Japanese" => Voice::Kore,
            _ => Voice::Puck,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_serializes_with_display_name() {
        let json = serde_json::to_string(&Region::NorthAmerica).unwrap();
        assert_eq!(json, r#""North America""#);

        let region: Region = serde_json::from_str(r#""South America""#).unwrap();
        assert_eq!(region, Region::SouthAmerica);
    }

    #[test]
    fn test_concrete_regions_exclude_world() {
        assert!(!Region::CONCRETE.contains(&Region::World));
        assert_eq!(Region::CONCRETE.len(), 6);
    }

    #[test]
    fn test_voice_rule() {
        assert_eq!(Voice::for_language("French"), Voice::Kore);
        assert_eq!(Voice::for_language("Japanese"), Voice::Kore);
        assert_eq!(Voice::for_language("German"), Voice::Puck);
        // The per-entry hint does not override the rule
        assert_eq!(Voice::for_language("Italian"), Voice::Puck);
    }
}
