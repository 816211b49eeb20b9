use std::cmp::Ordering;

use analytics_dashboard::{query, QueryOptions, Queryable, Record, SortSpec};
use proptest::prelude::*;
use serde_json::json;

fn record(idx: usize, name: &str, score: i64) -> Record {
    json!({"idx": idx, "name": name, "score": score})
        .as_object()
        .cloned()
        .unwrap()
}

fn records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(("[a-cA-C]{0,4}", -3i64..4), 0..24).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(idx, (name, score))| record(idx, name.as_str(), score))
            .collect()
    })
}

fn idx(row: &Record) -> u64 {
    row["idx"].as_u64().unwrap()
}

proptest! {
    #[test]
    fn search_only_narrows(rows in records(), needle in "[a-cA-C]{0,2}") {
        let view = query(&rows, &QueryOptions::search(needle.clone()));
        prop_assert!(view.len() <= rows.len());
        let needle = needle.to_lowercase();
        for row in &view {
            let hit = row
                .all_fields()
                .iter()
                .any(|value| value.display().to_lowercase().contains(needle.as_str()));
            prop_assert!(hit);
        }
        // Unsorted results keep input order.
        prop_assert!(view.windows(2).all(|pair| idx(pair[0]) < idx(pair[1])));
    }

    #[test]
    fn ascending_sort_is_ordered_and_stable(rows in records()) {
        let options = QueryOptions::default().sorted(Some(SortSpec::ascending("score")));
        let view = query(&rows, &options);
        prop_assert_eq!(view.len(), rows.len());
        for pair in view.windows(2) {
            let order = pair[0].field("score").compare(&pair[1].field("score"));
            prop_assert_ne!(order, Ordering::Greater);
            if order == Ordering::Equal {
                prop_assert!(idx(pair[0]) < idx(pair[1]));
            }
        }
    }

    #[test]
    fn descending_sort_is_ordered_and_stable(rows in records()) {
        let options = QueryOptions::default().sorted(Some(SortSpec::descending("score")));
        let view = query(&rows, &options);
        for pair in view.windows(2) {
            let order = pair[0].field("score").compare(&pair[1].field("score"));
            prop_assert_ne!(order, Ordering::Less);
            if order == Ordering::Equal {
                prop_assert!(idx(pair[0]) < idx(pair[1]));
            }
        }
    }

    #[test]
    fn query_is_pure(rows in records(), needle in "[a-c]{0,1}") {
        let before = rows.clone();
        let options = QueryOptions::search(needle).sorted(Some(SortSpec::descending("name")));
        let first: Vec<Record> = query(&rows, &options).into_iter().cloned().collect();
        let second: Vec<Record> = query(&rows, &options).into_iter().cloned().collect();
        prop_assert_eq!(first, second);
        prop_assert_eq!(rows, before);
    }
}
