// ⚙️ View Engine - Filter and sort station records
// Pure function of (data, criteria): the source slice is never touched

use crate::columns::Column;
use crate::criteria::{FilterCriteria, RouteMatching, SortOrder};
use crate::station::StationRecord;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::trace;

// ============================================================================
// VIEW
// ============================================================================

/// Ordered, filtered subset of `data` for the given criteria
pub fn view<'a>(data: &'a [StationRecord], criteria: &FilterCriteria) -> Vec<&'a StationRecord> {
    view_indices(data, criteria)
        .into_iter()
        .map(|i| &data[i])
        .collect()
}

/// Same as [`view`] but as positions into `data`.
///
/// The whole dataset is sorted first and the sorted sequence is filtered
/// afterwards. With no sort the dataset order is kept.
pub fn view_indices(data: &[StationRecord], criteria: &FilterCriteria) -> Vec<usize> {
    let mut order: Vec<usize> = (0..data.len()).collect();

    if let Some(sort) = criteria.sort {
        order.sort_by(|&a, &b| compare(&data[a], &data[b], sort));
    }

    let matcher = Matcher::new(criteria);
    let matched: Vec<usize> = order
        .into_iter()
        .filter(|&i| matcher.matches(&data[i]))
        .collect();

    trace!(total = data.len(), matched = matched.len(), "view recomputed");
    matched
}

/// True when `record` passes search, route and borough filters
pub fn matches(record: &StationRecord, criteria: &FilterCriteria) -> bool {
    Matcher::new(criteria).matches(record)
}

// ============================================================================
// MATCHING
// ============================================================================

struct Matcher<'c> {
    query: String,
    routes: &'c BTreeSet<String>,
    boroughs: &'c BTreeSet<String>,
    route_matching: RouteMatching,
}

impl<'c> Matcher<'c> {
    fn new(criteria: &'c FilterCriteria) -> Self {
        Matcher {
            query: criteria.query.trim().to_lowercase(),
            routes: &criteria.routes,
            boroughs: &criteria.boroughs,
            route_matching: criteria.route_matching,
        }
    }

    fn matches(&self, record: &StationRecord) -> bool {
        self.matches_search(record) && self.matches_route(record) && self.matches_borough(record)
    }

    /// Naive scan: any field whose lowercase text contains the query
    fn matches_search(&self, record: &StationRecord) -> bool {
        if self.query.is_empty() {
            return true;
        }
        record
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&self.query))
    }

    fn matches_route(&self, record: &StationRecord) -> bool {
        if self.routes.is_empty() {
            return true;
        }
        match self.route_matching {
            RouteMatching::Substring => self
                .routes
                .iter()
                .any(|route| record.daytime_routes.contains(route.as_str())),
            RouteMatching::Token => record.routes().any(|token| self.routes.contains(token)),
        }
    }

    fn matches_borough(&self, record: &StationRecord) -> bool {
        self.boroughs.is_empty() || self.boroughs.contains(record.borough_name())
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum SortValue<'a> {
    Number(f64),
    Text(Cow<'a, str>),
}

/// Comparable value of `column`, or `None` when it belongs at the edge of
/// the ordering (absent, or a numeric string with no number in it).
fn sort_value(record: &StationRecord, column: Column) -> Option<SortValue<'_>> {
    let text: Cow<'_, str> = match column {
        Column::Income | Column::WeekdayRidership | Column::WeekendRidership => {
            let value = column.measure(record)?.as_f64();
            return (!value.is_nan()).then_some(SortValue::Number(value));
        }
        Column::StopName => Cow::Borrowed(&record.stop_name),
        Column::Borough => Cow::Borrowed(&record.borough),
        Column::Routes => Cow::Borrowed(&record.daytime_routes),
        Column::Accessible => Cow::Borrowed(bool_text(record.ada_accessible)),
        Column::Police => Cow::Borrowed(bool_text(record.police_station)),
        Column::Bathroom => Cow::Borrowed(bool_text(record.bathroom)),
    };
    Some(SortValue::Text(text))
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Order two records for `sort`. Edge values sort after everything in
/// ascending order, which puts them first once the direction is reversed.
pub fn compare(a: &StationRecord, b: &StationRecord, sort: SortOrder) -> Ordering {
    let ascending = match (sort_value(a, sort.column), sort_value(b, sort.column)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(SortValue::Number(x)), Some(SortValue::Number(y))) => x.total_cmp(&y),
        (Some(SortValue::Text(x)), Some(SortValue::Text(y))) => collate(&x, &y),
        // A column yields one kind of value only
        (Some(SortValue::Number(_)), Some(SortValue::Text(_))) => Ordering::Less,
        (Some(SortValue::Text(_)), Some(SortValue::Number(_))) => Ordering::Greater,
    };

    if sort.direction.is_descending() {
        ascending.reverse()
    } else {
        ascending
    }
}

/// Locale-style text ordering: punctuation and spaces before digits before
/// letters, letters compared without case first, then lowercase before
/// uppercase. Falls back to code point order so the result is total.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

fn primary_key(c: char) -> (u8, char) {
    let class = if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    };
    (class, base_letter(c.to_lowercase().next().unwrap_or(c)))
}

/// Accented Latin letters collate with their base letter; the accent only
/// breaks ties through the final code point comparison.
fn base_letter(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ì'..='ï' | 'ī' | 'į' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' => 't',
        'ù'..='ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => c,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::SortDirection;
    use crate::station::Measure;
    use serde_json::json;

    fn dataset() -> Vec<StationRecord> {
        serde_json::from_value(json!([
            { "station_id": 1, "stop_name": "Astoria-Ditmars Blvd", "borough": "Q",
              "daytime_routes": "N W", "median_household_income": 50000,
              "2023_average_weekday_ridership": 11200, "ada_accessible": false },
            { "station_id": 2, "stop_name": "Times Sq-42 St", "borough": "M",
              "daytime_routes": "N Q R W S 1 2 3 7", "median_household_income": null,
              "2023_average_weekday_ridership": 160000, "ada_accessible": true,
              "bathroom": true },
            { "station_id": 3, "stop_name": "Jay St-MetroTech", "borough": "Bk",
              "daytime_routes": "A C F R", "median_household_income": 80000,
              "ada_accessible": true },
            { "station_id": 4, "stop_name": "St George", "borough": "SI",
              "daytime_routes": "SIR", "median_household_income": "$61,500",
              "police_station": true },
            { "station_id": 5, "stop_name": "161 St-Yankee Stadium", "borough": "Bx",
              "daytime_routes": "B D 4", "median_household_income": "n/a" }
        ]))
        .unwrap()
    }

    fn ids(rows: &[&StationRecord]) -> Vec<String> {
        rows.iter().map(|r| r.station_id.to_string()).collect()
    }

    fn income_dataset() -> Vec<StationRecord> {
        serde_json::from_value(json!([
            { "station_id": "a", "stop_name": "A", "borough": "M", "median_household_income": 50000 },
            { "station_id": "b", "stop_name": "B", "borough": "M", "median_household_income": null },
            { "station_id": "c", "stop_name": "C", "borough": "M", "median_household_income": 80000 }
        ]))
        .unwrap()
    }

    #[test]
    fn test_no_criteria_keeps_dataset_order() {
        let data = dataset();
        let rows = view(&data, &FilterCriteria::new());
        assert_eq!(ids(&rows), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_absent_values_follow_direction() {
        let data = income_dataset();
        let asc = FilterCriteria::new().sorted_by(Column::Income);
        assert_eq!(ids(&view(&data, &asc)), vec!["a", "c", "b"]);

        let desc = asc.sorted_by(Column::Income);
        assert_eq!(desc.sort.unwrap().direction, SortDirection::Descending);
        assert_eq!(ids(&view(&data, &desc)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_unparseable_numeric_sorts_with_absent() {
        let data = dataset();
        let asc = FilterCriteria::new().sorted_by(Column::Income);
        // 50000, $61,500, 80000, then null and "n/a" in dataset order
        assert_eq!(ids(&view(&data, &asc)), vec!["1", "4", "3", "2", "5"]);
    }

    #[test]
    fn test_formatted_income_sorts_like_number() {
        let mut data = income_dataset();
        data[1].median_household_income = Some(Measure::Text("$65,000".to_string()));
        let asc = FilterCriteria::new().sorted_by(Column::Income);
        assert_eq!(ids(&view(&data, &asc)), vec!["a", "b", "c"]);

        let mut as_number = income_dataset();
        as_number[1].median_household_income = Some(Measure::Number(65000.0));
        assert_eq!(ids(&view(&as_number, &asc)), ids(&view(&data, &asc)));
    }

    #[test]
    fn test_text_sort_by_stop_name() {
        let data = dataset();
        let asc = FilterCriteria::new().sorted_by(Column::StopName);
        assert_eq!(ids(&view(&data, &asc)), vec!["5", "1", "3", "4", "2"]);
    }

    #[test]
    fn test_borough_sort_uses_raw_code() {
        let data = dataset();
        let asc = FilterCriteria::new().sorted_by(Column::Borough);
        // Bk, Bx, M, Q, SI
        assert_eq!(ids(&view(&data, &asc)), vec!["3", "5", "2", "1", "4"]);
    }

    #[test]
    fn test_flag_sort_false_first() {
        let data = dataset();
        let asc = FilterCriteria::new().sorted_by(Column::Accessible);
        assert_eq!(ids(&view(&data, &asc)), vec!["1", "4", "5", "2", "3"]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_trimmed() {
        let data = dataset();
        let criteria = FilterCriteria::new().with_query("  METROTECH ");
        assert_eq!(ids(&view(&data, &criteria)), vec!["3"]);
    }

    #[test]
    fn test_search_scans_raw_values() {
        let data = dataset();
        // Income number text
        assert_eq!(ids(&view(&data, &FilterCriteria::new().with_query("80000"))), vec!["3"]);
        // Raw borough code, not the translated name
        assert_eq!(ids(&view(&data, &FilterCriteria::new().with_query("bx"))), vec!["5"]);
        assert!(view(&data, &FilterCriteria::new().with_query("bronx")).is_empty());
    }

    #[test]
    fn test_search_is_literal() {
        let data = dataset();
        assert!(view(&data, &FilterCriteria::new().with_query("bathroom")).is_empty());
        // Flags are searched as true/false text
        assert_eq!(view(&data, &FilterCriteria::new().with_query("true")).len(), 3);
    }

    #[test]
    fn test_route_substring_over_matches() {
        let data = dataset();
        let criteria = FilterCriteria::new().with_routes(["S"]);
        assert_eq!(ids(&view(&data, &criteria)), vec!["2", "4"]);
    }

    #[test]
    fn test_route_token_matching() {
        let data = dataset();
        let criteria = FilterCriteria::new()
            .with_routes(["S"])
            .with_route_matching(RouteMatching::Token);
        assert_eq!(ids(&view(&data, &criteria)), vec!["2"]);

        let criteria = criteria.with_routes(["SIR", "A"]);
        assert_eq!(ids(&view(&data, &criteria)), vec!["3", "4"]);
    }

    #[test]
    fn test_borough_filter_translates_codes() {
        let data = dataset();
        let criteria = FilterCriteria::new().with_boroughs(["Brooklyn", "Staten Island"]);
        assert_eq!(ids(&view(&data, &criteria)), vec!["3", "4"]);
    }

    #[test]
    fn test_unknown_borough_code_matches_literally() {
        let mut data = dataset();
        data[0].borough = "Nassau".to_string();
        let criteria = FilterCriteria::new().with_boroughs(["Nassau"]);
        assert_eq!(ids(&view(&data, &criteria)), vec!["1"]);
    }

    #[test]
    fn test_all_filters_combine() {
        let data = dataset();
        let criteria = FilterCriteria::new()
            .with_query("st")
            .with_routes(["R"])
            .with_boroughs(["Manhattan", "Brooklyn"])
            .sorted_by(Column::WeekdayRidership)
            .sorted_by(Column::WeekdayRidership);
        // Descending: absent weekday ridership (3) first, then 160000 (2)
        assert_eq!(ids(&view(&data, &criteria)), vec!["3", "2"]);
    }

    #[test]
    fn test_nothing_matches() {
        let data = dataset();
        let criteria = FilterCriteria::new().with_query("zzz");
        assert!(view_indices(&data, &criteria).is_empty());
    }

    #[test]
    fn test_view_does_not_modify_data() {
        let data = dataset();
        let before = data.clone();
        let criteria = FilterCriteria::new().with_query("st").sorted_by(Column::StopName);
        let first = view_indices(&data, &criteria);
        let second = view_indices(&data, &criteria);
        assert_eq!(first, second);
        assert_eq!(data, before);
    }

    #[test]
    fn test_collate() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("a", "A"), Ordering::Less);
        assert_eq!(collate("3 Av", "30 Av"), Ordering::Less);
        assert_eq!(collate("42 St", "Astor Pl"), Ordering::Less);
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_collate_accented_letters_sit_with_base_letter() {
        assert_eq!(collate("Émile", "Fulton"), Ordering::Less);
        assert_eq!(collate("Émile", "Zerega"), Ordering::Less);
        assert_eq!(collate("Dyre", "Émile"), Ordering::Less);
        assert_eq!(collate("Emile", "Émile"), Ordering::Less);
        assert_eq!(collate("Cañon", "Canyon"), Ordering::Less);
    }
}
