pub mod cache;
pub mod netkeiba;
pub mod pedigree;
pub mod schedule;
pub mod search;
