// View engine properties over generated station sets

use proptest::prelude::*;
use serde_json::{json, Value};
use subway_explorer::{
    compare, matches, view, view_indices, Column, FilterCriteria, RouteMatching, SortDirection,
    SortOrder, StationRecord,
};

fn income() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (0u32..300_000).prop_map(|n| json!(n)),
        (0u32..300_000).prop_map(|n| json!(format!("${}", n))),
        Just(json!("250,001+")),
        Just(json!("n/a")),
    ]
}

fn station() -> impl Strategy<Value = Value> {
    (
        "[A-Za-z0-9 -]{0,10}",
        prop::sample::select(vec!["Q", "M", "Bk", "Bx", "SI", "X"]),
        prop::sample::subsequence(vec!["1", "4", "7", "A", "G", "N", "Q", "SIR", "W"], 0..4),
        income(),
        prop::option::of(0u32..200_000),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, borough, routes, income, ridership, ada, bathroom)| {
            json!({
                "stop_name": name,
                "borough": borough,
                "daytime_routes": routes.join(" "),
                "median_household_income": income,
                "2023_average_weekday_ridership": ridership,
                "ada_accessible": ada,
                "bathroom": bathroom,
            })
        })
}

fn stations() -> impl Strategy<Value = Vec<StationRecord>> {
    prop::collection::vec(station(), 0..24).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(id, mut value)| {
                value["station_id"] = json!(id);
                serde_json::from_value(value).unwrap()
            })
            .collect()
    })
}

fn sort_order() -> impl Strategy<Value = SortOrder> {
    (prop::sample::select(Column::ALL.to_vec()), any::<bool>()).prop_map(|(column, desc)| {
        SortOrder {
            column,
            direction: if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        }
    })
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::sample::select(vec!["", "a", " st ", "Q", "7", "true", "$1"]),
        prop::sample::subsequence(vec!["A", "N", "7", "S"], 0..3),
        prop::sample::subsequence(vec!["Queens", "Brooklyn", "Manhattan", "X"], 0..3),
        prop::option::of(sort_order()),
        any::<bool>(),
    )
        .prop_map(|(query, routes, boroughs, sort, token)| {
            FilterCriteria::new()
                .with_query(query)
                .with_routes(routes)
                .with_boroughs(boroughs)
                .with_sort(sort)
                .with_route_matching(if token {
                    RouteMatching::Token
                } else {
                    RouteMatching::Substring
                })
        })
}

fn is_subsequence(needle: &[usize], haystack: &[usize]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|n| rest.any(|h| h == n))
}

proptest! {
    #[test]
    fn prop_view_is_filtered_subsequence_of_sorted(data in stations(), criteria in criteria()) {
        let sorted = view_indices(&data, &FilterCriteria::new().with_sort(criteria.sort));
        let filtered = view_indices(&data, &criteria);

        prop_assert!(is_subsequence(&filtered, &sorted));
        for &i in &filtered {
            prop_assert!(matches(&data[i], &criteria));
        }
        let dropped = sorted.iter().filter(|i| !filtered.contains(*i));
        for &i in dropped {
            prop_assert!(!matches(&data[i], &criteria));
        }
    }

    #[test]
    fn prop_view_is_idempotent_and_pure(data in stations(), criteria in criteria()) {
        let before = data.clone();
        let first: Vec<StationRecord> = view(&data, &criteria).into_iter().cloned().collect();
        let second: Vec<StationRecord> = view(&data, &criteria).into_iter().cloned().collect();

        prop_assert_eq!(first, second);
        prop_assert_eq!(data, before);
    }

    #[test]
    fn prop_unfiltered_view_is_stable_sort(data in stations(), sort in prop::option::of(sort_order())) {
        let criteria = FilterCriteria::new().with_sort(sort);

        let mut expected: Vec<usize> = (0..data.len()).collect();
        if let Some(sort) = sort {
            expected.sort_by(|&a, &b| compare(&data[a], &data[b], sort));
        }

        prop_assert_eq!(view_indices(&data, &criteria), expected);
    }

    #[test]
    fn prop_double_toggle_restores_ascending(
        data in stations(),
        column in prop::sample::select(Column::ALL.to_vec()),
    ) {
        let once = FilterCriteria::new().sorted_by(column);
        let thrice = once.clone().sorted_by(column).sorted_by(column);

        prop_assert_eq!(once.sort.map(|s| s.direction), Some(SortDirection::Ascending));
        prop_assert_eq!(&thrice, &once);
        prop_assert_eq!(view_indices(&data, &thrice), view_indices(&data, &once));
    }

    #[test]
    fn prop_absent_values_sort_last_ascending(data in stations()) {
        let criteria = FilterCriteria::new().sorted_by(Column::Income);
        let incomes: Vec<bool> = view(&data, &criteria)
            .iter()
            .map(|s| {
                s.median_household_income
                    .as_ref()
                    .map(|m| !m.as_f64().is_nan())
                    .unwrap_or(false)
            })
            .collect();

        // Once an absent/unparseable value shows up, no parseable one follows
        let first_absent = incomes.iter().position(|present| !present).unwrap_or(incomes.len());
        prop_assert!(incomes[first_absent..].iter().all(|present| !present));
    }
}
