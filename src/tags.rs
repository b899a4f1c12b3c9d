//! Tag sanity checks for map-making.app locations.
//!
//! A location's tags are plain strings; dated locations carry a `YYYY` and
//! an `MM` tag, optionally a car-generation tag, a `YY-M` tag written by the
//! coverage-update tooling and an `Updated` marker.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const UPDATED_TAG: &str = "Updated";
pub const META_TAG_PREFIX: &str = "Meta -";
const FIRST_COVERAGE_YEAR: i32 = 2005;

/// Independently toggleable checks; each one flags a location when it fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagChecks {
    pub no_year: bool,
    pub duplicate_year: bool,
    pub no_month: bool,
    pub duplicate_month: bool,
    pub no_car: bool,
    pub duplicate_car: bool,
    pub no_yymm: bool,
    pub duplicate_yymm: bool,
    pub no_copyright: bool,
    pub duplicate_copyright: bool,
    pub bad_update: bool,
}

impl TagChecks {
    pub fn all() -> Self {
        Self {
            no_year: true,
            duplicate_year: true,
            no_month: true,
            duplicate_month: true,
            no_car: true,
            duplicate_car: true,
            no_yymm: true,
            duplicate_yymm: true,
            no_copyright: true,
            duplicate_copyright: true,
            bad_update: true,
        }
    }

    pub fn any(&self) -> bool {
        *self != Self::default()
    }

    /// Union of two check sets
    pub fn merge(self, other: Self) -> Self {
        Self {
            no_year: self.no_year || other.no_year,
            duplicate_year: self.duplicate_year || other.duplicate_year,
            no_month: self.no_month || other.no_month,
            duplicate_month: self.duplicate_month || other.duplicate_month,
            no_car: self.no_car || other.no_car,
            duplicate_car: self.duplicate_car || other.duplicate_car,
            no_yymm: self.no_yymm || other.no_yymm,
            duplicate_yymm: self.duplicate_yymm || other.duplicate_yymm,
            no_copyright: self.no_copyright || other.no_copyright,
            duplicate_copyright: self.duplicate_copyright || other.duplicate_copyright,
            bad_update: self.bad_update || other.bad_update,
        }
    }
}

/// A map-making.app location; fields we don't touch are carried through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pano_id: Option<String>,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }
}

/// Where locations come from (the editor's loaded map, a file, ...)
pub trait LocationProvider {
    fn locations(&self) -> &[Location];
}

/// Receives the result of a selection
pub trait SelectionController {
    fn select_locations(&mut self, locations: Vec<Location>);
}

impl LocationProvider for Vec<Location> {
    fn locations(&self) -> &[Location] {
        self
    }
}

/// Collects selected locations, for callers that just want the list
#[derive(Debug, Default)]
pub struct CollectingSelection {
    pub selected: Vec<Location>,
}

impl SelectionController for CollectingSelection {
    fn select_locations(&mut self, locations: Vec<Location>) {
        self.selected = locations;
    }
}

fn month_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(0[1-9]|1[0-2])$").expect("valid regex"))
}

fn yymm_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})-(\d{1,2})$").expect("valid regex"))
}

fn copyright_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:©|\(c\)|copyright)\s*(\d{4})$").expect("valid regex")
    })
}

/// Year tag: an integer between the first coverage year and `current_year`
pub fn is_year_tag(tag: &str, current_year: i32) -> bool {
    tag.parse::<i32>()
        .map(|y| (FIRST_COVERAGE_YEAR..=current_year).contains(&y))
        .unwrap_or(false)
}

pub fn is_month_tag(tag: &str) -> bool {
    month_pattern().is_match(tag)
}

pub fn is_car_tag(tag: &str) -> bool {
    tag == "Gen2" || tag == "Gen3" || tag.starts_with("gen4-")
}

pub fn is_yymm_tag(tag: &str) -> bool {
    yymm_pattern().is_match(tag)
}

pub fn copyright_year(tag: &str) -> Option<i32> {
    copyright_pattern()
        .captures(tag)
        .and_then(|c| c[1].parse().ok())
}

/// `"23-7"` -> `("2023", "07")`
pub fn split_yymm(tag: &str) -> Option<(String, String)> {
    let caps = yymm_pattern().captures(tag)?;
    Some((format!("20{}", &caps[1]), format!("{:0>2}", &caps[2])))
}

fn count(tags: &[String], pred: impl Fn(&str) -> bool) -> usize {
    tags.iter().filter(|t| pred(t)).count()
}

fn fires(no: bool, duplicate: bool, matches: usize) -> bool {
    (no && matches == 0) || (duplicate && matches > 1)
}

/// True when any enabled check flags the tag list.
/// A location without a tag list is always flagged.
pub fn has_bad_tags(tags: Option<&[String]>, checks: &TagChecks, current_year: i32) -> bool {
    let Some(tags) = tags else {
        return true;
    };

    fires(
        checks.no_year,
        checks.duplicate_year,
        count(tags, |t| is_year_tag(t, current_year)),
    ) || fires(checks.no_month, checks.duplicate_month, count(tags, is_month_tag))
        || fires(checks.no_car, checks.duplicate_car, count(tags, is_car_tag))
        || fires(checks.no_yymm, checks.duplicate_yymm, count(tags, is_yymm_tag))
        || fires(
            checks.no_copyright,
            checks.duplicate_copyright,
            count(tags, |t| copyright_year(t).is_some()),
        )
        || (checks.bad_update && update_verdict(tags).is_bad())
}

/// How an `Updated` location's YY-M tag relates to its year/month tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum UpdateVerdict {
    NotUpdated,
    MissingDateTag,
    MissingYearMonth,
    /// YY-M and year/month name the same month
    FalseUpdate,
    /// Within one month of each other
    PossibleFalseUpdate,
    /// Year/month is newer than the YY-M tag
    OlderThanTagged,
    Genuine,
}

impl UpdateVerdict {
    pub fn is_bad(&self) -> bool {
        !matches!(self, UpdateVerdict::NotUpdated | UpdateVerdict::Genuine)
    }
}

fn month_index(year: &str, month: &str) -> Option<i32> {
    Some(year.parse::<i32>().ok()? * 12 + month.parse::<i32>().ok()?)
}

/// Most recent YY-M tag as a month index
fn latest_yymm(tags: &[String]) -> Option<i32> {
    tags.iter()
        .filter_map(|t| split_yymm(t))
        .filter_map(|(y, m)| month_index(&y, &m))
        .max()
}

pub fn update_verdict(tags: &[String]) -> UpdateVerdict {
    if !tags.iter().any(|t| t == UPDATED_TAG) {
        return UpdateVerdict::NotUpdated;
    }
    let Some(updated) = latest_yymm(tags) else {
        return UpdateVerdict::MissingDateTag;
    };

    // four-digit, any range: the YY-M tooling only looks at the shape
    let years: Vec<&String> = tags
        .iter()
        .filter(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()))
        .collect();
    let months: Vec<&String> = tags.iter().filter(|t| is_month_tag(t)).collect();
    let tagged = match (years.as_slice(), months.as_slice()) {
        ([year], [month]) => month_index(year, month),
        _ => None,
    };
    let Some(tagged) = tagged else {
        return UpdateVerdict::MissingYearMonth;
    };

    match updated - tagged {
        0 => UpdateVerdict::FalseUpdate,
        d if d.abs() < 2 => UpdateVerdict::PossibleFalseUpdate,
        d if d < 0 => UpdateVerdict::OlderThanTagged,
        _ => UpdateVerdict::Genuine,
    }
}

/// Replace each YY-M tag with its `YYYY` and `MM` tags; `None` if unchanged
pub fn split_yymm_tags(tags: &[String]) -> Option<Vec<String>> {
    let mut found = false;
    let mut out = Vec::with_capacity(tags.len() + 1);
    for tag in tags {
        match split_yymm(tag) {
            Some((year, month)) => {
                found = true;
                out.push(year);
                out.push(month);
            }
            None => out.push(tag.clone()),
        }
    }
    found.then_some(out)
}

/// Drop every YY-M tag; `None` if unchanged
pub fn remove_yymm_tags(tags: &[String]) -> Option<Vec<String>> {
    let out: Vec<String> = tags.iter().filter(|t| !is_yymm_tag(t)).cloned().collect();
    (out.len() != tags.len()).then_some(out)
}

/// Tags to display, hiding `Meta -` tags when requested
pub fn visible_tags(tags: &[String], hide_meta: bool) -> Vec<&str> {
    tags.iter()
        .map(String::as_str)
        .filter(|t| !(hide_meta && t.starts_with(META_TAG_PREFIX)))
        .collect()
}

/// Select every location the checks flag; returns how many were selected
pub fn select_bad_locations<P, S>(
    provider: &P,
    selection: &mut S,
    checks: &TagChecks,
    current_year: i32,
) -> usize
where
    P: LocationProvider + ?Sized,
    S: SelectionController + ?Sized,
{
    let bad: Vec<Location> = provider
        .locations()
        .iter()
        .filter(|loc| has_bad_tags(loc.tags(), checks, current_year))
        .cloned()
        .collect();
    let n = bad.len();
    debug!(
        checked = provider.locations().len(),
        flagged = n,
        "tag sanity check"
    );
    selection.select_locations(bad);
    n
}

/// Apply `rewrite` to each location's tags, keeping only locations it changed
pub fn rewrite_locations<F>(locations: &[Location], rewrite: F) -> Vec<Location>
where
    F: Fn(&[String]) -> Option<Vec<String>>,
{
    locations
        .iter()
        .filter_map(|loc| {
            let tags = rewrite(loc.tags()?)?;
            Some(Location {
                tags: Some(tags),
                ..loc.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2025;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn check(list: &[&str], checks: TagChecks) -> bool {
        has_bad_tags(Some(&tags(list)), &checks, YEAR)
    }

    #[test]
    fn test_tag_classes() {
        assert!(is_year_tag("2005", YEAR));
        assert!(is_year_tag("2025", YEAR));
        assert!(!is_year_tag("2004", YEAR));
        assert!(!is_year_tag("2026", YEAR));
        assert!(!is_year_tag("Gen3", YEAR));

        assert!(is_month_tag("01"));
        assert!(is_month_tag("12"));
        assert!(!is_month_tag("1"));
        assert!(!is_month_tag("13"));

        assert!(is_car_tag("Gen2"));
        assert!(is_car_tag("gen4-trekker"));
        assert!(!is_car_tag("gen4"));

        assert!(is_yymm_tag("23-7"));
        assert!(is_yymm_tag("23-11"));
        assert!(!is_yymm_tag("2023-11"));

        assert_eq!(copyright_year("© 2019"), Some(2019));
        assert_eq!(copyright_year("Copyright 2021"), Some(2021));
        assert_eq!(copyright_year("(C)2018"), Some(2018));
        assert_eq!(copyright_year("2018"), None);
    }

    #[test]
    fn test_split_yymm() {
        assert_eq!(split_yymm("23-7"), Some(("2023".into(), "07".into())));
        assert_eq!(split_yymm("19-12"), Some(("2019".into(), "12".into())));
        assert_eq!(split_yymm("Updated"), None);
    }

    #[test]
    fn test_missing_tag_list_is_bad() {
        assert!(has_bad_tags(None, &TagChecks::default(), YEAR));
    }

    #[test]
    fn test_no_checks_never_flags() {
        assert!(!check(&[], TagChecks::default()));
        assert!(!check(&["2019", "2020", "05"], TagChecks::default()));
    }

    #[test]
    fn test_year_checks() {
        let no = TagChecks {
            no_year: true,
            ..Default::default()
        };
        let dup = TagChecks {
            duplicate_year: true,
            ..Default::default()
        };
        assert!(check(&["05", "Gen3"], no));
        assert!(!check(&["2019", "05"], no));
        assert!(check(&["2019", "2020"], dup));
        assert!(!check(&["2019"], dup));
    }

    #[test]
    fn test_month_and_car_checks() {
        let checks = TagChecks {
            no_month: true,
            duplicate_car: true,
            ..Default::default()
        };
        assert!(check(&["2019", "Gen3"], checks));
        assert!(check(&["2019", "05", "Gen2", "gen4-x"], checks));
        assert!(!check(&["2019", "05", "Gen3"], checks));
    }

    #[test]
    fn test_yymm_and_copyright_checks() {
        let checks = TagChecks {
            duplicate_yymm: true,
            no_copyright: true,
            ..Default::default()
        };
        assert!(check(&["23-7", "24-1", "© 2023"], checks));
        assert!(check(&["23-7"], checks));
        assert!(!check(&["23-7", "© 2023"], checks));
    }

    #[test]
    fn test_update_verdicts() {
        assert_eq!(update_verdict(&tags(&["2019", "05"])), UpdateVerdict::NotUpdated);
        assert_eq!(
            update_verdict(&tags(&["Updated", "2019", "05"])),
            UpdateVerdict::MissingDateTag
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "23-7", "05"])),
            UpdateVerdict::MissingYearMonth
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "23-7", "2023", "07"])),
            UpdateVerdict::FalseUpdate
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "23-8", "2023", "07"])),
            UpdateVerdict::PossibleFalseUpdate
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "24-1", "2023", "12"])),
            UpdateVerdict::PossibleFalseUpdate
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "22-1", "2023", "07"])),
            UpdateVerdict::OlderThanTagged
        );
        assert_eq!(
            update_verdict(&tags(&["Updated", "24-3", "2023", "07"])),
            UpdateVerdict::Genuine
        );
    }

    #[test]
    fn test_update_verdict_uses_latest_yymm_tag() {
        // the older YY-M tag comes first; the newest one decides
        let t = tags(&["Updated", "22-1", "24-3", "2023", "07"]);
        assert_eq!(update_verdict(&t), UpdateVerdict::Genuine);
    }

    #[test]
    fn test_bad_update_check() {
        let checks = TagChecks {
            bad_update: true,
            ..Default::default()
        };
        assert!(check(&["Updated", "23-7", "2023", "07"], checks));
        assert!(!check(&["Updated", "24-7", "2023", "07"], checks));
        assert!(!check(&["2023", "07"], checks));
    }

    #[test]
    fn test_split_yymm_tags() {
        assert_eq!(
            split_yymm_tags(&tags(&["Gen3", "23-7"])),
            Some(tags(&["Gen3", "2023", "07"]))
        );
        assert_eq!(split_yymm_tags(&tags(&["Gen3"])), None);
    }

    #[test]
    fn test_remove_yymm_tags() {
        assert_eq!(
            remove_yymm_tags(&tags(&["23-7", "Updated", "19-12"])),
            Some(tags(&["Updated"]))
        );
        assert_eq!(remove_yymm_tags(&tags(&["2023"])), None);
    }

    #[test]
    fn test_visible_tags() {
        let t = tags(&["2023", "Meta - bollard", "Gen3"]);
        assert_eq!(visible_tags(&t, true), vec!["2023", "Gen3"]);
        assert_eq!(visible_tags(&t, false).len(), 3);
    }

    #[test]
    fn test_checks_merge_and_any() {
        assert!(!TagChecks::default().any());
        let merged = TagChecks {
            no_year: true,
            ..Default::default()
        }
        .merge(TagChecks {
            bad_update: true,
            ..Default::default()
        });
        assert!(merged.no_year && merged.bad_update && !merged.no_car);
        assert_eq!(TagChecks::default().merge(TagChecks::all()), TagChecks::all());
    }

    #[test]
    fn test_select_bad_locations() {
        let locations: Vec<Location> = serde_json::from_str(
            r#"[
                {"id": 1, "lat": 1.0, "lng": 2.0, "tags": ["2019", "05"]},
                {"id": 2, "lat": 1.0, "lng": 2.0, "tags": ["05"]},
                {"id": 3, "lat": 1.0, "lng": 2.0}
            ]"#,
        )
        .unwrap();
        let checks = TagChecks {
            no_year: true,
            ..Default::default()
        };
        let mut selection = CollectingSelection::default();

        let n = select_bad_locations(&locations, &mut selection, &checks, YEAR);
        assert_eq!(n, 2);
        let ids: Vec<_> = selection.selected.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_rewrite_locations_keeps_extra_fields() {
        let locations: Vec<Location> = serde_json::from_str(
            r#"[
                {"id": 7, "panoId": "p", "lat": 1.5, "lng": 2.5, "heading": 90, "tags": ["23-7"]},
                {"id": 8, "lat": 0.0, "lng": 0.0, "tags": ["2020"]}
            ]"#,
        )
        .unwrap();

        let out = rewrite_locations(&locations, split_yymm_tags);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tags, Some(tags(&["2023", "07"])));
        assert_eq!(out[0].pano_id.as_deref(), Some("p"));

        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["heading"], 90);
        assert_eq!(json["panoId"], "p");
    }
}
