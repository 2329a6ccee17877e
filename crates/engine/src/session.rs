//! Working state of one analysis session: up to two loaded tables.
//!
//! A slot is only ever replaced wholesale by a successful load. A failed
//! load reports `Unreadable` and leaves whatever was loaded before in place.

use serde::{Deserialize, Serialize};

use crate::crossref::MatchCriterion;
use crate::error::SabanaError;
use crate::normalize::{normalize, NormalizationReport};
use crate::points::{map_points, MapPoint, MapScope};
use crate::profile::Profile;
use crate::table::Table;
use crate::view::{apply, SearchTarget, ViewOutcome, ViewRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Secondary,
}

/// A normalized table and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub name: String,
    pub table: Table,
    pub report: NormalizationReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Overview,
    Overnight,
    Towers,
    Contacts,
    Search,
    Cross,
}

/// Owned description of a view, turned into a `ViewRequest` at run time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSpec {
    pub mode: ViewMode,
    pub query: String,
    pub target: SearchTarget,
    pub criterion: MatchCriterion,
}

impl ViewSpec {
    pub fn new(mode: ViewMode) -> Self {
        Self { mode, ..Self::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    profile: Profile,
    primary: Option<LoadedTable>,
    secondary: Option<LoadedTable>,
}

impl Session {
    pub fn new(profile: Profile) -> Self {
        Self { profile, primary: None, secondary: None }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Normalize `raw` into `slot`. Reader failures are mapped to
    /// `Unreadable` and the slot keeps its previous table.
    pub fn load<E: std::fmt::Display>(
        &mut self,
        slot: Slot,
        name: &str,
        raw: Result<Table, E>,
    ) -> Result<&LoadedTable, SabanaError> {
        let raw = raw.map_err(|e| {
            log::error!("failed to load '{name}': {e}");
            SabanaError::Unreadable { name: name.into(), reason: e.to_string() }
        })?;
        let (table, report) = normalize(raw, &self.profile);
        log::info!("loaded '{name}' into {slot:?}: {} rows, {} columns", table.len(), table.columns().len());

        let target = match slot {
            Slot::Primary => &mut self.primary,
            Slot::Secondary => &mut self.secondary,
        };
        Ok(target.insert(LoadedTable { name: name.into(), table, report }))
    }

    pub fn primary(&self) -> Option<&LoadedTable> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&LoadedTable> {
        self.secondary.as_ref()
    }

    pub fn run(&self, spec: &ViewSpec) -> Result<ViewOutcome, SabanaError> {
        let primary = self.primary.as_ref().ok_or(SabanaError::NoTable)?;
        let request = match spec.mode {
            ViewMode::Overview => ViewRequest::Overview,
            ViewMode::Overnight => ViewRequest::Overnight,
            ViewMode::Towers => ViewRequest::TowerRanking,
            ViewMode::Contacts => ViewRequest::FrequentContacts,
            ViewMode::Search => ViewRequest::NumberSearch { query: &spec.query, target: spec.target },
            ViewMode::Cross => ViewRequest::CrossReference {
                other: self.secondary.as_ref().map(|s| &s.table),
                criterion: spec.criterion,
            },
        };
        apply(&primary.table, &request, &self.profile)
    }

    /// Map markers for either the given view result or the whole primary table.
    pub fn map_points(&self, scope: MapScope, outcome: &ViewOutcome) -> Result<Vec<MapPoint>, SabanaError> {
        match scope {
            MapScope::CurrentView => Ok(map_points(&outcome.table)),
            MapScope::Full => {
                let primary = self.primary.as_ref().ok_or(SabanaError::NoTable)?;
                Ok(map_points(&primary.table))
            }
        }
    }
}
