///! Plain-text rendering of stored match lists
use regex::Regex;
use std::sync::LazyLock;

use kettou_common::{CacheSource, EntrantEvent, SearchEvent, MATCH_SEPARATOR};

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid img pattern"));

/// One line per match, image tags removed.
///
/// `<img …>【父】Name<br>【母】Other` becomes `【父】Name\n【母】Other`.
pub fn to_terminal(rendered: &str) -> String {
    IMG_TAG
        .replace_all(rendered, "")
        .split(MATCH_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text block for one entrant; `html` keeps the stored markup as is
pub fn entrant_block(entrant: &EntrantEvent, html: bool) -> String {
    let matches = if html {
        entrant.rendered_matches.clone()
    } else {
        to_terminal(&entrant.rendered_matches)
    };
    format!(
        "{}. {}\n該当数: {}\n{}\n---",
        entrant.index, entrant.entrant_name, entrant.match_count, matches
    )
}

/// Human-readable line(s) for a search event
pub fn describe_event(event: &SearchEvent, html: bool) -> String {
    match event {
        SearchEvent::CacheHit { source, rows } => {
            let from = match source {
                CacheSource::Remote => "remote cache",
                CacheSource::Local => "local cache",
            };
            format!("Loaded {} rows from {}", rows, from)
        }
        SearchEvent::CacheUnavailable { error } => format!("Cache unavailable: {}", error),
        SearchEvent::EntrantsListed { count } => format!("出走馬数: {}頭", count),
        SearchEvent::ListingFailed { error } => format!("Failed to list entrants: {}", error),
        SearchEvent::Entrant(entrant) => entrant_block(entrant, html),
        SearchEvent::EntrantFailed {
            index,
            entrant_name,
            error,
        } => format!("{}. {}: error: {}\n---", index, entrant_name, error),
        SearchEvent::Persisted { rows } => format!("Cached {} rows", rows),
        SearchEvent::PersistFailed { error } => format!("Failed to cache results: {}", error),
        SearchEvent::NothingToPersist => "No results to cache".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kettou_common::NO_MATCH;

    fn entrant() -> EntrantEvent {
        EntrantEvent {
            index: 3,
            entrant_name: "ホースA".to_string(),
            match_count: 2,
            rendered_matches: "<img src='u' width='100'>【父】A<br>【母】B".to_string(),
        }
    }

    #[test]
    fn test_entrant_block() {
        assert_eq!(
            entrant_block(&entrant(), false),
            "3. ホースA\n該当数: 2\n【父】A\n【母】B\n---"
        );
        assert!(entrant_block(&entrant(), true).contains("<img src='u' width='100'>"));
    }

    #[test]
    fn test_describe_cache_hit() {
        let event = SearchEvent::CacheHit {
            source: CacheSource::Local,
            rows: 5,
        };
        assert_eq!(describe_event(&event, false), "Loaded 5 rows from local cache");
    }

    #[test]
    fn test_strips_images_and_breaks() {
        let rendered = "<img src='https://img.example/a.png' width='100'>【父】A<br>【母父】B";
        assert_eq!(to_terminal(rendered), "【父】A\n【母父】B");
    }

    #[test]
    fn test_placeholder_unchanged() {
        assert_eq!(to_terminal(NO_MATCH), NO_MATCH);
    }

    #[test]
    fn test_uppercase_tag() {
        assert_eq!(to_terminal("<IMG SRC='x'>【父】A"), "【父】A");
    }
}
