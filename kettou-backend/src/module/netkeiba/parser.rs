///! netkeiba HTML parsers
///!
///! Pure functions over already-decoded page text, so they can be tested
///! against saved pages without network access.
use anyhow::Result;
use scraper::{Html, Selector};

use crate::module::search::{Entrant, EntrantList};

pub const DB_BASE_URL: &str = "https://db.netkeiba.com";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid CSS selector '{}': {:?}", css, e))
}

/// Entrants of a race card (出馬表) page.
///
/// Every horse link inside the `RaceTable01` tables, in page order. The
/// same horse is usually linked more than once; the first link wins.
pub fn parse_entrants(html: &str) -> Result<EntrantList> {
    let document = Html::parse_document(html);
    let link_sel = selector("table.RaceTable01 a[href]")?;

    let mut entrants = EntrantList::new();
    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains("/horse/") {
            continue;
        }
        let name = link.text().collect::<String>();
        entrants.push(Entrant::new(name.trim(), absolute_url(href)));
    }

    if entrants.is_empty() {
        tracing::warn!("No horse links found in race card page");
    }
    Ok(entrants)
}

/// Ancestor cells of a pedigree (血統) page, in table order.
///
/// A cell yields the trimmed text of its first link, or `None` when it has
/// no named link. A page without a `blood_table` yields no cells.
pub fn parse_ancestor_cells(html: &str) -> Result<Vec<Option<String>>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.blood_table")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a")?;

    let Some(table) = document.select(&table_sel).next() else {
        tracing::debug!("Pedigree page has no blood_table");
        return Ok(Vec::new());
    };

    let cells = table
        .select(&cell_sel)
        .map(|td| {
            td.select(&link_sel)
                .next()
                .map(|a| a.text().collect::<String>().trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .collect();
    Ok(cells)
}

/// Horse id: the last path segment of a profile URL
pub fn horse_id_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("{}{}", DB_BASE_URL, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RACE_CARD: &str = r#"
<html><body>
<table class="Shutuba_Table RaceTable01">
  <tr class="HorseList">
    <td class="HorseInfo"><span class="HorseName">
      <a href="https://db.netkeiba.com/horse/2022105081" title="ホースA">ホースA</a>
    </span></td>
    <td class="Jockey"><a href="https://db.netkeiba.com/jockey/result/recent/01167/">騎手</a></td>
  </tr>
  <tr class="HorseList">
    <td class="HorseInfo"><a href="/horse/2022104702/"> ホースB </a></td>
  </tr>
  <tr class="HorseList">
    <td><a href="/horse/2022105081/">ホースA</a></td>
    <td><a href="/horse/x/">A</a></td>
  </tr>
</table>
<table class="Other"><tr><td><a href="/horse/2000000000/">Outside</a></td></tr></table>
</body></html>
"#;

    const PEDIGREE: &str = r#"
<html><body>
<table class="blood_table detail">
  <tr>
    <td rowspan="16"><a href="/horse/ped/000a0012bf/">Sire Name</a><br>2012 黒鹿</td>
    <td rowspan="8"><a href="/horse/ped/000a000258/"> Grand Sire </a></td>
  </tr>
  <tr><td></td></tr>
  <tr><td><a href="/horse/ped/empty/">  </a></td></tr>
  <tr><td>No link<a href="/horse/ped/1/">Dam Line</a><a href="/horse/ped/2/">Second</a></td></tr>
</table>
</body></html>
"#;

    #[test]
    fn test_parse_entrants() {
        let entrants = parse_entrants(RACE_CARD).unwrap().into_vec();
        assert_eq!(entrants.len(), 2);
        assert_eq!(entrants[0].name, "ホースA");
        assert_eq!(entrants[0].profile_url, "https://db.netkeiba.com/horse/2022105081");
        assert_eq!(entrants[1].name, "ホースB");
        assert_eq!(entrants[1].profile_url, "https://db.netkeiba.com/horse/2022104702/");
    }

    #[test]
    fn test_parse_entrants_without_table() {
        assert!(parse_entrants("<html><body><p>closed</p></body></html>")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_ancestor_cells() {
        let cells = parse_ancestor_cells(PEDIGREE).unwrap();
        assert_eq!(
            cells,
            vec![
                Some("Sire Name".to_string()),
                Some("Grand Sire".to_string()),
                None,
                None,
                Some("Dam Line".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_blood_table_is_empty() {
        let cells = parse_ancestor_cells("<html><body><table><tr><td>x</td></tr></table></body></html>")
            .unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn test_horse_id_from_url() {
        assert_eq!(horse_id_from_url("https://db.netkeiba.com/horse/2022105081/"), Some("2022105081"));
        assert_eq!(horse_id_from_url("https://db.netkeiba.com/horse/2022105081"), Some("2022105081"));
        assert_eq!(horse_id_from_url("https://db.netkeiba.com/horse/2019/?pid=1"), Some("2019"));
        assert_eq!(horse_id_from_url(""), None);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("/horse/1/"), "https://db.netkeiba.com/horse/1/");
        assert_eq!(absolute_url("//db.netkeiba.com/horse/1/"), "https://db.netkeiba.com/horse/1/");
        assert_eq!(absolute_url("https://x/horse/1/"), "https://x/horse/1/");
    }
}
