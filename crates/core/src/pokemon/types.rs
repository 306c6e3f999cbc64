//! Types for catalog entries and cached Pokémon records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A catalog entry as listed on a catalog page: just a name and a detail URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Unique name (e.g., "clefairy").
    pub name: String,
    /// URL of the detail resource.
    pub detail_url: String,
    /// Numeric id guessed from the detail URL. Provisional until details are fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guessed_id: Option<u32>,
}

impl CatalogEntry {
    /// Create an entry, guessing the numeric id from the detail URL.
    pub fn new(name: impl Into<String>, detail_url: impl Into<String>) -> Self {
        let detail_url = detail_url.into();
        let guessed_id = guess_id_from_url(&detail_url);
        Self {
            name: name.into(),
            detail_url,
            guessed_id,
        }
    }
}

/// Guess the numeric id of a resource from the last path segment of its URL.
///
/// `https://pokeapi.co/api/v2/pokemon/35/` yields `Some(35)`. A trailing slash
/// is ignored; a query string or fragment is not part of the path.
pub fn guess_id_from_url(url: &str) -> Option<u32> {
    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?
        .parse()
        .ok()
}

/// Kind of base statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatKind {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
}

impl StatKind {
    /// All statistic kinds in display order.
    pub const ALL: [StatKind; 6] = [
        StatKind::Hp,
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpecialAttack,
        StatKind::SpecialDefense,
        StatKind::Speed,
    ];

    /// Map an upstream statistic name (e.g., "special-attack").
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.api_name() == name)
    }

    /// The upstream name of this statistic.
    pub fn api_name(&self) -> &'static str {
        match self {
            StatKind::Hp => "hp",
            StatKind::Attack => "attack",
            StatKind::Defense => "defense",
            StatKind::SpecialAttack => "special-attack",
            StatKind::SpecialDefense => "special-defense",
            StatKind::Speed => "speed",
        }
    }

    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Hp => "HP",
            StatKind::Attack => "Attack",
            StatKind::Defense => "Defense",
            StatKind::SpecialAttack => "Sp. Atk",
            StatKind::SpecialDefense => "Sp. Def",
            StatKind::Speed => "Speed",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Elemental type of a Pokémon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl PokemonType {
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Electric,
        PokemonType::Grass,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    /// Map an upstream type name (e.g., "fairy").
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.api_name() == name)
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            PokemonType::Normal => "normal",
            PokemonType::Fire => "fire",
            PokemonType::Water => "water",
            PokemonType::Electric => "electric",
            PokemonType::Grass => "grass",
            PokemonType::Ice => "ice",
            PokemonType::Fighting => "fighting",
            PokemonType::Poison => "poison",
            PokemonType::Ground => "ground",
            PokemonType::Flying => "flying",
            PokemonType::Psychic => "psychic",
            PokemonType::Bug => "bug",
            PokemonType::Rock => "rock",
            PokemonType::Ghost => "ghost",
            PokemonType::Dragon => "dragon",
            PokemonType::Dark => "dark",
            PokemonType::Steel => "steel",
            PokemonType::Fairy => "fairy",
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// A base statistic value. Unique by kind within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub kind: StatKind,
    pub value: u32,
}

/// A type in a given slot (1 or 2). Unique by slot within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub slot: u8,
    pub kind: PokemonType,
}

/// What a record still needs from the network, in the order it is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDownload {
    /// Nothing left to fetch.
    None,
    /// Full details (stats, types, image URL).
    Details,
    /// Image bytes from the known image URL.
    Image,
}

/// A cached Pokémon.
///
/// Created as a stub from a catalog page, then hydrated in place: first with
/// details, then with image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    /// Unique key.
    pub name: String,
    pub detail_url: String,
    /// National dex number; 0 when unknown.
    pub numeric_id: u32,
    pub height_decimeters: u32,
    /// Weight in hectograms; 0 means details have not been fetched yet.
    pub weight_hectograms: u32,
    pub base_experience: u32,
    pub sort_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub image_bytes: Option<Vec<u8>>,
    #[serde(default)]
    pub statistics: Vec<StatEntry>,
    #[serde(default)]
    pub types: Vec<TypeEntry>,
}

impl PokemonRecord {
    /// Create an empty record with just a name and detail URL.
    pub fn new(name: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail_url: detail_url.into(),
            numeric_id: 0,
            height_decimeters: 0,
            weight_hectograms: 0,
            base_experience: 0,
            sort_order: 0,
            image_url: None,
            image_bytes: None,
            statistics: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Create the stub record for a catalog entry.
    pub fn stub(entry: &CatalogEntry) -> Self {
        let mut record = Self::new(entry.name.clone(), entry.detail_url.clone());
        record.numeric_id = entry.guessed_id.unwrap_or(0);
        record
    }

    /// Whether details have been fetched.
    ///
    /// Real data never has zero weight, so a non-zero weight marks a hydrated
    /// record. A genuine weight of zero is indistinguishable from a stub.
    pub fn is_hydrated(&self) -> bool {
        self.weight_hectograms != 0
    }

    pub fn has_image(&self) -> bool {
        self.image_bytes.is_some()
    }

    /// Decide the next fetch for this record.
    pub fn next_download(&self) -> NextDownload {
        if self.image_bytes.is_some() {
            NextDownload::None
        } else if self.image_url.is_none() {
            if self.is_hydrated() {
                NextDownload::None
            } else {
                NextDownload::Details
            }
        } else {
            NextDownload::Image
        }
    }

    /// Sum of all base statistics.
    pub fn total_statistic(&self) -> u32 {
        self.statistics.iter().map(|s| s.value).sum()
    }

    pub fn statistic(&self, kind: StatKind) -> Option<u32> {
        self.statistics
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.value)
    }

    pub fn type_in_slot(&self, slot: u8) -> Option<PokemonType> {
        self.types.iter().find(|t| t.slot == slot).map(|t| t.kind)
    }
}

/// Decoded detail response, already mapped to domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct PokemonDetails {
    pub id: u32,
    pub name: String,
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub height: u32,
    pub weight: u32,
    pub base_experience: u32,
    pub order: i32,
    pub statistics: Vec<StatEntry>,
    pub types: Vec<TypeEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_id_from_url_with_trailing_slash() {
        assert_eq!(
            guess_id_from_url("https://pokeapi.co/api/v2/pokemon/35/"),
            Some(35)
        );
    }

    #[test]
    fn test_guess_id_from_url_without_trailing_slash() {
        assert_eq!(
            guess_id_from_url("https://pokeapi.co/api/v2/pokemon/10118"),
            Some(10118)
        );
    }

    #[test]
    fn test_guess_id_from_url_non_numeric() {
        assert_eq!(
            guess_id_from_url("https://pokeapi.co/api/v2/pokemon/clefairy/"),
            None
        );
        assert_eq!(guess_id_from_url("not a url"), None);
    }

    #[test]
    fn test_catalog_entry_guesses_id() {
        let entry = CatalogEntry::new("clefairy", "https://pokeapi.co/api/v2/pokemon/35/");
        assert_eq!(entry.guessed_id, Some(35));

        let record = PokemonRecord::stub(&entry);
        assert_eq!(record.numeric_id, 35);
        assert!(!record.is_hydrated());
    }

    #[test]
    fn test_stat_kind_api_names() {
        assert_eq!(
            StatKind::from_api_name("special-attack"),
            Some(StatKind::SpecialAttack)
        );
        assert_eq!(StatKind::from_api_name("hp"), Some(StatKind::Hp));
        assert_eq!(StatKind::from_api_name("unknown-stat"), None);
        assert_eq!(StatKind::SpecialDefense.api_name(), "special-defense");
    }

    #[test]
    fn test_stat_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&StatKind::SpecialAttack).unwrap(),
            "\"special-attack\""
        );
    }

    #[test]
    fn test_pokemon_type_api_names() {
        for kind in PokemonType::ALL {
            assert_eq!(PokemonType::from_api_name(kind.api_name()), Some(kind));
        }
        assert_eq!(PokemonType::from_api_name("shadow"), None);
        assert_eq!(
            serde_json::to_string(&PokemonType::Fairy).unwrap(),
            "\"fairy\""
        );
    }

    #[test]
    fn test_next_download_order() {
        let mut record = PokemonRecord::new("clefairy", "https://pokeapi.co/api/v2/pokemon/35/");
        assert_eq!(record.next_download(), NextDownload::Details);

        record.weight_hectograms = 75;
        assert_eq!(record.next_download(), NextDownload::None);

        record.image_url = Some("https://example.com/35.png".to_string());
        assert_eq!(record.next_download(), NextDownload::Image);

        record.image_bytes = Some(vec![1, 2, 3]);
        assert_eq!(record.next_download(), NextDownload::None);
    }

    #[test]
    fn test_total_statistic_and_lookups() {
        let mut record = PokemonRecord::new("clefairy", "https://pokeapi.co/api/v2/pokemon/35/");
        record.statistics = vec![
            StatEntry {
                kind: StatKind::Hp,
                value: 70,
            },
            StatEntry {
                kind: StatKind::Attack,
                value: 45,
            },
        ];
        record.types = vec![TypeEntry {
            slot: 1,
            kind: PokemonType::Fairy,
        }];

        assert_eq!(record.total_statistic(), 115);
        assert_eq!(record.statistic(StatKind::Attack), Some(45));
        assert_eq!(record.statistic(StatKind::Speed), None);
        assert_eq!(record.type_in_slot(1), Some(PokemonType::Fairy));
        assert_eq!(record.type_in_slot(2), None);
    }

    #[test]
    fn test_record_serialization_skips_image_bytes() {
        let mut record = PokemonRecord::new("clefairy", "https://pokeapi.co/api/v2/pokemon/35/");
        record.image_bytes = Some(vec![0; 16]);

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("image_bytes"));
        assert!(!json.contains("image_url")); // None should be skipped
    }
}
