///! Race search
///!
///! ## Flow
///! 1. Cached rows for the race, if wanted and present, are replayed
///! 2. Otherwise the entrants are listed and handled one at a time:
///!    pedigree fetch, reference match, rendering
///! 3. Successful rows replace the race's cached rows
///!
///! Progress is reported as a stream of `SearchEvent`s.

mod source;
pub use source::{Entrant, EntrantList, RaceSource, MIN_ENTRANT_NAME_CHARS};

mod orchestrator;
pub use orchestrator::{CacheFallback, RaceSearch, SearchOptions, DEFAULT_REQUEST_DELAY};
