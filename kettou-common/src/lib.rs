pub mod types;

pub use types::{
    CacheSource, EntrantEvent, RaceId, RaceResultRow, SearchEvent, Venue, MATCH_SEPARATOR,
    NO_MATCH,
};
