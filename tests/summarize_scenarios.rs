use idb_rs::api::decode_body;
use idb_rs::error::ErrorKind;
use idb_rs::models::RawTable;
use idb_rs::summarize::{
    age_distribution, age_distribution_report, latest, summarize_countries,
    summarize_countries_report, summarize_series, summarize_series_report,
};
use idb_rs::{CountrySummary, IdbError};
use pretty_assertions::assert_eq;

fn table(json: &str) -> RawTable {
    json.parse().unwrap()
}

#[test]
fn norway_male_and_female_rows() {
    let t = RawTable::from_rows(vec![
        vec!["NAME", "GENC", "POP", "SEX"],
        vec!["Norway", "NO", "100", "1"],
        vec!["Norway", "NO", "150", "2"],
    ]);
    assert_eq!(
        summarize_countries(&t),
        vec![CountrySummary {
            country: "Norway".into(),
            code: "NO".into(),
            population: 250.0,
            male: "40.0%".into(),
            female: "60.0%".into(),
        }]
    );
}

#[test]
fn reported_total_wins_over_sum() {
    let t = table(
        r#"[["NAME","GENC","POP","SEX"],
            ["Chad","TD","1000","0"],
            ["Chad","TD","480","1"],
            ["Chad","TD","520","2"],
            ["Peru","PE","0","0"]]"#,
    );
    let rows = summarize_countries(&t);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].population, 1000.0);
    assert_eq!(rows[0].male, "48.0%");
    assert_eq!(rows[0].female, "52.0%");
    // zero total
    assert_eq!(rows[1].population, 0.0);
    assert_eq!(rows[1].male, "0%");
    assert_eq!(rows[1].female, "0%");
}

#[test]
fn country_summary_ignores_header_names() {
    // Positional: the header is discarded whatever it says.
    let t = table(r#"[["a","b","c","d"],["Fiji","FJ","10","1"],["Fiji","FJ","30","2"]]"#);
    let rows = summarize_countries(&t);
    assert_eq!(rows[0].country, "Fiji");
    assert_eq!(rows[0].population, 40.0);
    assert_eq!(rows[0].male, "25.0%");
}

#[test]
fn country_summary_groups_by_name() {
    let t = table(
        r#"[["NAME","GENC","POP","SEX"],
            ["Congo","CG","10","1"],
            ["Congo","CD","10","2"]]"#,
    );
    let rows = summarize_countries(&t);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].code, "CG");
    assert_eq!(rows[0].population, 20.0);
}

#[test]
fn malformed_cells_are_counted_as_zero() {
    let t = table(
        r#"[["NAME","GENC","POP","SEX"],
            ["Mali","ML","abc","1"],
            ["Mali","ML","200","2"],
            ["Mali","ML","50","7"],
            ["short","row"]]"#,
    );
    let report = summarize_countries_report(&t);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].population, 200.0);
    assert_eq!(report.records[0].male, "0.0%");
    assert_eq!(report.records[0].female, "100.0%");
    assert_eq!(report.coercions.defaulted_cells, 1);
    assert_eq!(report.coercions.unknown_sex, 1);
    assert_eq!(report.coercions.dropped_rows, 1);
}

#[test]
fn age_five_sums_across_sexes() {
    let t = RawTable::from_rows(vec![
        vec!["AGE", "POP", "SEX"],
        vec!["5", "1000", "1"],
        vec!["5", "500", "2"],
    ]);
    let buckets = age_distribution(&t);
    assert_eq!(buckets.len(), 101);
    for b in &buckets {
        let expected = if b.age == 5 { 1500.0 } else { 0.0 };
        assert_eq!(b.population, expected, "age {}", b.age);
    }
}

#[test]
fn ages_out_of_range_are_ignored() {
    let t = table(
        r#"[["AGE","POP","SEX"],
            ["-1","7","1"],
            ["101","7","1"],
            ["2.5","7","1"],
            ["100","3","2"]]"#,
    );
    let report = age_distribution_report(&t);
    assert_eq!(report.records.len(), 101);
    assert_eq!(report.records[100].population, 3.0);
    assert_eq!(report.records.iter().map(|b| b.population).sum::<f64>(), 3.0);
    assert_eq!(report.coercions.dropped_rows, 3);
}

#[test]
fn missing_columns_give_empty_results() {
    let t = table(r#"[["NAME","GENC","POP"],["Norway","NO","100"]]"#);
    assert!(summarize_series(&t).is_empty());
    assert!(age_distribution(&t).is_empty());
}

#[test]
fn series_is_sorted_by_year_with_numeric_percentages() {
    let t = table(
        r#"[["NAME","GENC","YR","AGE","POP","SEX"],
            ["Norway","NO","2021","0","60","2"],
            ["Norway","NO","2020","0","30","1"],
            ["Norway","NO","2020","1","70","2"],
            ["Norway","NO","2021","1","40","1"]]"#,
    );
    let series = summarize_series(&t);
    assert_eq!(series.iter().map(|s| s.year).collect::<Vec<_>>(), vec![2020, 2021]);
    assert_eq!(series[0].population, 100.0);
    assert_eq!(series[0].male, 30.0);
    assert_eq!(series[0].female, 70.0);

    let last = latest(&series).unwrap();
    assert_eq!(last.year, 2021);
    assert_eq!(last.male, 40.0);
}

#[test]
fn series_groups_by_code_and_year() {
    let t = table(
        r#"[["NAME","GENC","YR","POP","SEX"],
            ["Congo","CG","2020","10","1"],
            ["Congo","CD","2020","10","1"],
            [null,"XK","2020","5","2"],
            ["Bad","BD","soon","5","2"]]"#,
    );
    let report = summarize_series_report(&t);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.coercions.dropped_rows, 1);
    let kosovo = report.records.iter().find(|r| r.code == "XK").unwrap();
    assert_eq!(kosovo.country, "XK");
    assert_eq!(kosovo.female, 100.0);
}

#[test]
fn empty_series_has_no_latest() {
    let t = table(r#"[["NAME","GENC","YR","POP","SEX"]]"#);
    let series = summarize_series(&t);
    assert!(series.is_empty());
    assert!(latest(&series).is_none());
}

#[test]
fn non_array_response_is_a_shape_failure() {
    let err = decode_body("{}").unwrap_err();
    assert!(matches!(err, IdbError::Shape(_)));
    assert_eq!(err.kind(), ErrorKind::Shape);

    assert!(matches!(decode_body("[]"), Err(IdbError::Shape(_))));
    assert!(matches!(decode_body(r#"["NAME"]"#), Err(IdbError::Shape(_))));
    assert_eq!(decode_body("<html>").unwrap_err().kind(), ErrorKind::Transport);
}

#[test]
fn non_array_data_rows_become_empty_rows() {
    let t = table(r#"[["NAME","GENC","POP","SEX"],{"x":1},["Fiji","FJ","5","1"]]"#);
    assert_eq!(t.malformed_rows, 1);
    let report = summarize_countries_report(&t);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.coercions.dropped_rows, 1);
}

#[test]
fn small_shares_are_rounded_once() {
    let snapshot = table(
        r#"[["NAME","GENC","POP","SEX"],
            ["Tuvalu","TV","3","1"],
            ["Tuvalu","TV","19","2"],
            ["Tuvalu","TV","2000","0"]]"#,
    );
    let countries = summarize_countries(&snapshot);
    assert_eq!(countries[0].male, "0.1%");
    assert_eq!(countries[0].female, "0.9%");

    let history = table(
        r#"[["NAME","GENC","YR","POP","SEX"],
            ["Tuvalu","TV","2020","3","1"],
            ["Tuvalu","TV","2020","1997","2"]]"#,
    );
    let series = summarize_series(&history);
    assert_eq!(series[0].male, 0.1);
    assert!((series[0].male + series[0].female - 100.0).abs() <= 0.1 + 1e-9);
}

#[test]
fn blank_sex_cells_are_unknown_not_totals() {
    let t = table(
        r#"[["NAME","GENC","POP","SEX"],
            ["Togo","TG","900",null],
            ["Togo","TG","900",""],
            ["Togo","TG","400","1"],
            ["Togo","TG","600","2"]]"#,
    );
    let report = summarize_countries_report(&t);
    assert_eq!(report.records[0].population, 1000.0);
    assert_eq!(report.records[0].male, "40.0%");
    assert_eq!(report.coercions.unknown_sex, 2);
}
