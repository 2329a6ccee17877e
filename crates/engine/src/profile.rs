use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::SabanaError;
use crate::table::Field;

// ---------------------------------------------------------------------------
// Top-level profile
// ---------------------------------------------------------------------------

/// Analysis profile. Every section is optional; defaults reproduce the
/// built-in behaviour exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Extra header aliases keyed by canonical column name, appended after
    /// the built-in ones.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub overnight: OvernightWindow,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub map: MapConfig,
}

// ---------------------------------------------------------------------------
// Overnight window
// ---------------------------------------------------------------------------

/// Time-of-day window, both bounds inclusive.
///
/// When `start > end` the window wraps midnight (`t >= start || t <= end`),
/// otherwise it is the plain interval `start <= t <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OvernightWindow {
    #[serde(default = "default_overnight_start")]
    pub start: NaiveTime,
    #[serde(default = "default_overnight_end")]
    pub end: NaiveTime,
}

fn default_overnight_start() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_overnight_end() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for OvernightWindow {
    fn default() -> Self {
        Self {
            start: default_overnight_start(),
            end: default_overnight_end(),
        }
    }
}

impl OvernightWindow {
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start > self.end {
            t >= self.start || t <= self.end
        } else {
            t >= self.start && t <= self.end
        }
    }
}

// ---------------------------------------------------------------------------
// Ranking + Location + Map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RankingConfig {
    /// Rows kept by the tower ranking.
    #[serde(default = "default_towers")]
    pub towers: usize,
    /// Distinct numbers kept by the frequent-contact view.
    #[serde(default = "default_contacts")]
    pub contacts: usize,
}

fn default_towers() -> usize {
    15
}

fn default_contacts() -> usize {
    10
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            towers: default_towers(),
            contacts: default_contacts(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LocationConfig {
    /// Decimal places coordinates are rounded to before location matching.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    4
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self { decimals: default_decimals() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_tiles")]
    pub tiles: String,
    #[serde(default = "default_attribution")]
    pub attribution: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

fn default_tiles() -> String {
    "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png".into()
}

fn default_attribution() -> String {
    "&copy; OpenStreetMap contributors &copy; CARTO".into()
}

fn default_zoom() -> u8 {
    12
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tiles: default_tiles(),
            attribution: default_attribution(),
            zoom: default_zoom(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Profile {
    pub fn from_toml(input: &str) -> Result<Self, SabanaError> {
        let profile: Profile =
            toml::from_str(input).map_err(|e| SabanaError::ProfileParse(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), SabanaError> {
        if self.ranking.towers == 0 {
            return Err(SabanaError::ProfileValidation(
                "ranking.towers must be at least 1".into(),
            ));
        }
        if self.ranking.contacts == 0 {
            return Err(SabanaError::ProfileValidation(
                "ranking.contacts must be at least 1".into(),
            ));
        }
        if self.location.decimals > 10 {
            return Err(SabanaError::ProfileValidation(format!(
                "location.decimals must be 10 or less, got {}",
                self.location.decimals
            )));
        }
        if self.map.zoom > 20 {
            return Err(SabanaError::ProfileValidation(format!(
                "map.zoom must be 20 or less, got {}",
                self.map.zoom
            )));
        }
        if self.map.tiles.trim().is_empty() {
            return Err(SabanaError::ProfileValidation("map.tiles is empty".into()));
        }
        for (field, aliases) in &self.aliases {
            if Field::from_name(field).is_none() {
                return Err(SabanaError::ProfileValidation(format!(
                    "aliases.{field}: not a canonical column"
                )));
            }
            if aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(SabanaError::ProfileValidation(format!(
                    "aliases.{field}: empty alias"
                )));
            }
        }
        Ok(())
    }

    /// Extra aliases configured for one field (empty when none).
    pub fn extra_aliases(&self, field: Field) -> &[String] {
        self.aliases.get(field.name()).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
