use idb_rs::models::{Cell, RawTable};
use idb_rs::summarize::{age_distribution, summarize_countries, summarize_series};
use idb_rs::view::{self, SortDirection, SortKey, SortMode, filter_by_name, sort_records};
use idb_rs::{CountrySummary, ViewInput};
use proptest::prelude::*;

const NAMES: [&str; 5] = ["Norway", "Chad", "Peru", "Fiji", "Oman"];

fn country_table(rows: &[(usize, u32, u8)]) -> RawTable {
    let mut cells: Vec<Vec<Cell>> = Vec::new();
    for &(n, pop, sex) in rows {
        let name = NAMES[n % NAMES.len()];
        cells.push(vec![
            Cell::from(name),
            Cell::from(&name[..2]),
            Cell::from(pop.to_string().as_str()),
            Cell::from(sex.to_string().as_str()),
        ]);
    }
    RawTable {
        header: ["NAME", "GENC", "POP", "SEX"].map(String::from).to_vec(),
        rows: cells,
        malformed_rows: 0,
    }
}

fn pct(s: &str) -> f64 {
    view::parse_percent(s).unwrap()
}

proptest! {
    #[test]
    fn shares_add_up_to_one_hundred(rows in prop::collection::vec((0usize..5, 0u32..2_000_000, 1u8..=2), 0..40)) {
        for c in summarize_countries(&country_table(&rows)) {
            if c.population > 0.0 {
                prop_assert!((pct(&c.male) + pct(&c.female) - 100.0).abs() <= 0.1 + 1e-9, "{:?}", c);
            } else {
                prop_assert_eq!(c.male.as_str(), "0%");
                prop_assert_eq!(c.female.as_str(), "0%");
            }
        }
    }

    #[test]
    fn age_buckets_are_fixed(rows in prop::collection::vec((-5i32..110, 0u32..10_000, 0u8..4), 0..60)) {
        let mut cells = vec![vec![Cell::from("AGE"), Cell::from("POP"), Cell::from("SEX")]];
        for (age, pop, sex) in rows {
            cells.push(vec![Cell::from(age as f64), Cell::from(pop as f64), Cell::from(sex as f64)]);
        }
        let buckets = age_distribution(&RawTable::from_rows(cells));
        prop_assert_eq!(buckets.len(), 101);
        for (i, b) in buckets.iter().enumerate() {
            prop_assert_eq!(b.age as usize, i);
        }
    }

    #[test]
    fn series_is_ordered_for_any_permutation(years in prop::collection::vec(1950i32..2030, 0..40)) {
        let mut json = vec![serde_json::json!(["NAME", "GENC", "YR", "POP", "SEX"])];
        for (i, y) in years.iter().enumerate() {
            json.push(serde_json::json!(["Oman", "OM", y.to_string(), (i * 10).to_string(), "1"]));
        }
        let table = RawTable::from_json(&serde_json::Value::Array(json)).unwrap();
        let series = summarize_series(&table);
        prop_assert!(series.windows(2).all(|w| w[0].year <= w[1].year));

        let mut resorted = series.clone();
        resorted.sort_by_key(|s| s.year);
        prop_assert_eq!(resorted, series);
    }

    #[test]
    fn population_desc_reversed_is_asc(pops in prop::collection::vec(0u32..1_000, 0..30)) {
        let items: Vec<CountrySummary> = pops
            .iter()
            .enumerate()
            .map(|(i, p)| CountrySummary {
                country: format!("C{i}"),
                code: format!("{i}"),
                population: *p as f64,
                male: "50.0%".into(),
                female: "50.0%".into(),
            })
            .collect();

        let mut desc: Vec<&CountrySummary> = items.iter().collect();
        sort_records(&mut desc, SortMode::new(SortKey::Population, SortDirection::Desc));
        let mut asc: Vec<&CountrySummary> = items.iter().collect();
        sort_records(&mut asc, SortMode::new(SortKey::Population, SortDirection::Asc));

        // Compare keys only; tie order is unspecified.
        let rev: Vec<f64> = desc.iter().rev().map(|c| c.population).collect();
        let fwd: Vec<f64> = asc.iter().map(|c| c.population).collect();
        prop_assert_eq!(rev, fwd);
    }

    #[test]
    fn empty_filter_keeps_everything(rows in prop::collection::vec((0usize..5, 0u32..1_000, 1u8..=2), 0..30)) {
        let items = summarize_countries(&country_table(&rows));
        let kept = filter_by_name(&items, "");
        prop_assert_eq!(kept.len(), items.len());
        prop_assert!(kept.iter().zip(&items).all(|(a, b)| std::ptr::eq(*a, b)));

        let view = ViewInput::default().apply(&items);
        prop_assert_eq!(view.rows.len(), items.len());
    }

    #[test]
    fn sorting_never_panics_on_odd_percentages(texts in prop::collection::vec("[0-9a-z.%-]{0,6}", 0..20)) {
        let items: Vec<CountrySummary> = texts
            .iter()
            .map(|t| CountrySummary {
                country: t.clone(),
                code: String::new(),
                population: f64::NAN,
                male: t.clone(),
                female: t.clone(),
            })
            .collect();
        for mode in SortMode::MENU {
            let mut refs: Vec<&CountrySummary> = items.iter().collect();
            sort_records(&mut refs, mode);
            prop_assert_eq!(refs.len(), items.len());
        }
    }
}
