///! netkeiba adapter for the race search

mod parser;
pub use parser::{horse_id_from_url, parse_ancestor_cells, parse_entrants, DB_BASE_URL};

mod client;
pub use client::{pedigree_url, race_card_url, NetkeibaSource, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
