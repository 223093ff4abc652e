///! Pedigree matching
///!
///! ## Main Components
///! - `position_labels`: ancestry slot labels in pedigree-table order
///! - `normalize_name`: matching key for a horse name
///! - `ReferenceIndex`: reference names with their images
///! - `match_pedigree`: ancestors found in the reference list

mod labels;
pub use labels::{
    label_count, position_labels, PositionLabel, DEFAULT_PEDIGREE_DEPTH, MATERNAL, MAX_PEDIGREE_DEPTH,
    PATERNAL,
};

mod normalize;
pub use normalize::normalize_name;

mod types;
pub use types::{render_matches, Ancestor, MatchEntry, Pedigree};

mod reference;
pub use reference::{ReferenceEntry, ReferenceIndex};

mod matcher;
pub use matcher::match_pedigree;
