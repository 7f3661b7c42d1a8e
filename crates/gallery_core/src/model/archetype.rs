//! Archetype catalog model.
//!
//! # Responsibility
//! - Define the archetype record and name normalization rules.
//! - Provide the built-in default catalog used in degraded mode.
//! - Map archetype names onto display colors.
//!
//! # Invariants
//! - Names are trimmed and non-empty once normalized.
//! - Name uniqueness is case-insensitive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an archetype catalog entry.
pub type ArchetypeId = Uuid;

/// A named category applicable to gallery items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archetype {
    pub id: ArchetypeId,
    pub name: String,
    /// Unix epoch milliseconds. `None` for built-in defaults.
    pub created_at: Option<i64>,
}

impl Archetype {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: None,
        }
    }

    /// Case-insensitive name comparison used for uniqueness and filtering.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// Normalizes a user-provided archetype name.
///
/// Returns `None` when the trimmed name is empty.
pub fn normalize_archetype_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

const DEFAULT_ARCHETYPE_NAMES: &[&str] = &[
    "Monster",
    "Hunter",
    "Shapeshifter",
    "Monk",
    "Enchanter",
    "Spaceman",
    "Engineer",
    "Black Star",
    "Royalty",
    "Sun",
    "Moon",
    "Crystal Children",
    "Warlord",
    "AI Golem",
    "Alien",
    "Starseed",
    "Toy Box",
    "Glitch Starfighter",
];

/// Built-in archetype list substituted when the catalog cannot be read.
///
/// Ids are deterministic (`1..=18`) so callers can vote against them once the
/// store is reachable again and the same seed was imported.
pub fn default_archetypes() -> Vec<Archetype> {
    let mut archetypes: Vec<Archetype> = DEFAULT_ARCHETYPE_NAMES
        .iter()
        .zip(1u128..)
        .map(|(name, index)| Archetype {
            id: Uuid::from_u128(index),
            name: (*name).to_string(),
            created_at: None,
        })
        .collect();
    sort_archetypes(&mut archetypes);
    archetypes
}

/// Sorts archetypes by name, case-insensitively.
pub fn sort_archetypes(archetypes: &mut [Archetype]) {
    archetypes.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Display color pair for an archetype badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchetypeColor {
    pub background: &'static str,
    pub text: &'static str,
}

const WHITE: &str = "white";
const DARK: &str = "#333";

/// Fallback for unknown or malformed names.
pub const DEFAULT_ARCHETYPE_COLOR: ArchetypeColor = ArchetypeColor {
    background: "#FF6A5A",
    text: WHITE,
};

const ARCHETYPE_COLORS: &[(&str, &str, &str)] = &[
    ("monster", "#FF6A5A", WHITE),
    ("hunter", "#E17A56", WHITE),
    ("shapeshifter", "#FF8C94", WHITE),
    ("monk", "#41BFB3", WHITE),
    ("enchanter", "#5394D6", WHITE),
    ("spaceman", "#7EA1E5", WHITE),
    ("engineer", "#F8D575", DARK),
    ("black_star", "#333333", WHITE),
    ("royalty", "#9979C1", WHITE),
    ("sun", "#FFA45C", DARK),
    ("moon", "#C0E5F2", DARK),
    ("crystal_children", "#CDB4DB", DARK),
    ("warlord", "#7D1D3F", WHITE),
    ("ai_golem", "#495057", WHITE),
    ("alien", "#8FC93A", DARK),
    ("starseed", "#E0FBFC", DARK),
    ("toy_box", "#F4ACB7", DARK),
    ("glitch_starfighter", "#00B4D8", WHITE),
];

/// Returns the badge color for an archetype name.
///
/// Spaces and underscores are equivalent and matching ignores case.
pub fn archetype_color(name: Option<&str>) -> ArchetypeColor {
    let Some(key) = name.and_then(color_key) else {
        return DEFAULT_ARCHETYPE_COLOR;
    };

    ARCHETYPE_COLORS
        .iter()
        .find(|(candidate, _, _)| *candidate == key)
        .map(|&(_, background, text)| ArchetypeColor { background, text })
        .unwrap_or(DEFAULT_ARCHETYPE_COLOR)
}

fn color_key(name: &str) -> Option<String> {
    let key = name
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::{
        archetype_color, default_archetypes, normalize_archetype_name, DEFAULT_ARCHETYPE_COLOR,
    };

    #[test]
    fn default_catalog_has_eighteen_sorted_unique_entries() {
        let archetypes = default_archetypes();
        assert_eq!(archetypes.len(), 18);
        assert_eq!(archetypes[0].name, "AI Golem");
        let mut ids = archetypes.iter().map(|a| a.id).collect::<Vec<_>>();
        ids.dedup();
        assert_eq!(ids.len(), 18);
    }

    #[test]
    fn normalize_rejects_blank_names() {
        assert_eq!(normalize_archetype_name("   "), None);
        assert_eq!(
            normalize_archetype_name("  Sky Pirate ").as_deref(),
            Some("Sky Pirate")
        );
    }

    #[test]
    fn color_lookup_treats_spaces_and_underscores_alike() {
        let spaced = archetype_color(Some("Black Star"));
        let underscored = archetype_color(Some("black_star"));
        assert_eq!(spaced, underscored);
        assert_eq!(spaced.background, "#333333");
    }

    #[test]
    fn color_lookup_defaults_for_unknown_or_missing_names() {
        assert_eq!(archetype_color(None), DEFAULT_ARCHETYPE_COLOR);
        assert_eq!(archetype_color(Some("  ")), DEFAULT_ARCHETYPE_COLOR);
        assert_eq!(archetype_color(Some("Pirate")), DEFAULT_ARCHETYPE_COLOR);
    }
}
