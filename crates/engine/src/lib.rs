//! `sabana-engine`: Call-detail record normalization, views and cross-reference.
//!
//! Pure engine crate: receives pre-loaded tables, returns derived tables.
//! No CLI or IO dependencies.

pub mod crossref;
pub mod error;
pub mod normalize;
pub mod points;
pub mod profile;
pub mod session;
pub mod table;
pub mod view;

pub use crossref::{cross_reference, CrossMatch, MatchCriterion};
pub use error::SabanaError;
pub use normalize::{normalize, NormalizationReport};
pub use points::{has_coordinates, map_points, MapPoint, MapScope};
pub use profile::Profile;
pub use session::{LoadedTable, Session, Slot, ViewMode, ViewSpec};
pub use table::{Field, Table, Value, UNKNOWN_LINE};
pub use view::{apply, SearchTarget, ViewOutcome, ViewRequest, ViewStatus};
