use super::normalize::normalize_name;
use super::reference::ReferenceIndex;
use super::types::{MatchEntry, Pedigree};

/// Every ancestor whose normalized name is in the reference list, in pedigree order.
pub fn match_pedigree(pedigree: &Pedigree, reference: &ReferenceIndex) -> Vec<MatchEntry> {
    let mut matched = Vec::new();

    for ancestor in pedigree.iter() {
        let key = normalize_name(&ancestor.name);
        if !reference.contains(&key) {
            continue;
        }
        matched.push(MatchEntry {
            position: ancestor.position.clone(),
            name: ancestor.name.clone(),
            image_url: reference.image_for(&ancestor.name).map(str::to_string),
        });
    }

    tracing::trace!("Matched {} of {} ancestors", matched.len(), pedigree.len());
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::pedigree::reference::ReferenceEntry;

    fn reference(names: &[(&str, Option<&str>)]) -> ReferenceIndex {
        ReferenceIndex::from_entries(names.iter().map(|(name, url)| ReferenceEntry {
            canonical_name: name.to_string(),
            image_url: url.map(str::to_string),
        }))
    }

    #[test]
    fn test_case_insensitive_hit() {
        let index = reference(&[("special horse", None)]);
        let pedigree: Pedigree = [("父", "Special Horse"), ("母", "Other")].into_iter().collect();

        let matches = match_pedigree(&pedigree, &index);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position.as_str(), "父");
        assert_eq!(matches[0].name, "Special Horse");
    }

    #[test]
    fn test_full_width_hit_keeps_original_name() {
        let index = reference(&[("Gold Ship", Some("https://img.example/gs.png"))]);
        let pedigree: Pedigree = [("母父", "ＧＯＬＤ ＳＨＩＰ")].into_iter().collect();

        let matches = match_pedigree(&pedigree, &index);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "ＧＯＬＤ ＳＨＩＰ");
        assert_eq!(matches[0].image_url.as_deref(), Some("https://img.example/gs.png"));
    }

    #[test]
    fn test_order_follows_pedigree() {
        // reference order is the reverse of pedigree order
        let index = reference(&[("Zeta", None), ("Alpha", None)]);
        let pedigree: Pedigree = [("父", "Alpha"), ("父父", "Nobody"), ("母", "Zeta")]
            .into_iter()
            .collect();

        let matches = match_pedigree(&pedigree, &index);
        let positions: Vec<&str> = matches.iter().map(|m| m.position.as_str()).collect();
        assert_eq!(positions, vec!["父", "母"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let index = reference(&[("Alpha", None)]);
        assert!(match_pedigree(&Pedigree::new(), &index).is_empty());

        let pedigree: Pedigree = [("父", "Beta")].into_iter().collect();
        assert!(match_pedigree(&pedigree, &index).is_empty());
    }

    #[test]
    fn test_repeated_ancestor_matches_each_slot() {
        // inbreeding: the same name can fill more than one slot
        let index = reference(&[("Sunday Silence", None)]);
        let pedigree: Pedigree = [("父父", "Sunday Silence"), ("母父", "Sunday Silence")]
            .into_iter()
            .collect();
        assert_eq!(match_pedigree(&pedigree, &index).len(), 2);
    }
}
