///! External race data the search depends on
use anyhow::Result;
use async_trait::async_trait;
use kettou_common::RaceId;
use std::collections::HashSet;

/// Names shorter than this (in characters) are link noise, not horses
pub const MIN_ENTRANT_NAME_CHARS: usize = 2;

/// One horse in a race listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    pub name: String,
    /// Where the horse's pedigree can be fetched from
    pub profile_url: String,
}

impl Entrant {
    pub fn new(name: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_url: profile_url.into(),
        }
    }
}

/// Ordered entrant listing, unique by name
#[derive(Debug, Clone, Default)]
pub struct EntrantList {
    entrants: Vec<Entrant>,
    seen: HashSet<String>,
}

impl EntrantList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first entrant of each name; drop too-short names.
    /// Returns whether the entrant was added.
    pub fn push(&mut self, entrant: Entrant) -> bool {
        let name = entrant.name.trim();
        if name.chars().count() < MIN_ENTRANT_NAME_CHARS || self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.entrants.push(Entrant {
            name: name.to_string(),
            profile_url: entrant.profile_url,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    pub fn into_vec(self) -> Vec<Entrant> {
        self.entrants
    }
}

impl FromIterator<Entrant> for EntrantList {
    fn from_iter<T: IntoIterator<Item = Entrant>>(iter: T) -> Self {
        let mut list = EntrantList::new();
        for entrant in iter {
            list.push(entrant);
        }
        list
    }
}

/// Race listing and pedigree provider
#[async_trait]
pub trait RaceSource: Send + Sync {
    /// Entrants of a race in listing order
    async fn fetch_entrants(&self, race_id: &RaceId) -> Result<Vec<Entrant>>;

    /// Ancestor cells of the entrant's pedigree table in table order.
    ///
    /// `None` for a cell without a name. A missing table is an empty list.
    async fn fetch_ancestor_cells(&self, entrant: &Entrant) -> Result<Vec<Option<String>>>;
}
