//! The language table

use serde::Serialize;

use super::{Region, Voice};

/// One language as spoken in one country
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub language: &'static str,
    pub country: &'static str,
    pub region: Region,
    pub voice_hint: Voice,
}

const fn entry(
    language: &'static str,
    country: &'static str,
    region: Region,
    voice_hint: Voice,
) -> LanguageEntry {
    LanguageEntry {
        language,
        country,
        region,
        voice_hint,
    }
}

/// Every concrete region must keep at least one entry here.
pub static LANGUAGES: [LanguageEntry; 22] = [
    entry("French", "France", Region::Europe, Voice::Kore),
    entry("German", "Germany", Region::Europe, Voice::Puck),
    entry("Italian", "Italy", Region::Europe, Voice::Kore),
    entry("Spanish", "Spain", Region::Europe, Voice::Puck),
    entry("Dutch", "Netherlands", Region::Europe, Voice::Kore),
    entry("Japanese", "Japan", Region::Asia, Voice::Kore),
    entry("Chinese", "China", Region::Asia, Voice::Puck),
    entry("Korean", "South Korea", Region::Asia, Voice::Kore),
    entry("Hindi", "India", Region::Asia, Voice::Puck),
    entry("Vietnamese", "Vietnam", Region::Asia, Voice::Kore),
    entry("Swahili", "Kenya", Region::Africa, Voice::Puck),
    entry("Yoruba", "Nigeria", Region::Africa, Voice::Kore),
    entry("Arabic", "Egypt", Region::Africa, Voice::Puck),
    entry("Zulu", "South Africa", Region::Africa, Voice::Kore),
    entry("Portuguese", "Brazil", Region::SouthAmerica, Voice::Puck),
    entry("Spanish", "Argentina", Region::SouthAmerica, Voice::Kore),
    entry("Spanish", "Colombia", Region::SouthAmerica, Voice::Puck),
    entry("English", "USA", Region::NorthAmerica, Voice::Kore),
    entry("English", "Canada", Region::NorthAmerica, Voice::Puck),
    entry("Spanish", "Mexico", Region::NorthAmerica, Voice::Kore),
    entry("English", "Australia", Region::Oceania, Voice::Puck),
    entry("English", "New Zealand", Region::Oceania, Voice::Kore),
];

/// Candidate entries for a region; `World` returns the whole table
pub fn entries_for(region: Region) -> Vec<&'static LanguageEntry> {
    LANGUAGES
        .iter()
        .filter(|e| region.is_world() || e.region == region)
        .collect()
}
