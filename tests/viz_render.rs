use idb_rs::models::{AgeBucket, YearlySummary};
use idb_rs::viz;
use std::fs;
use tempfile::tempdir;

fn series() -> Vec<YearlySummary> {
    (2000..=2010)
        .map(|year| YearlySummary {
            country: "Norway".into(),
            code: "NO".into(),
            year,
            population: 4_500_000.0 + (year - 2000) as f64 * 50_000.0,
            male: 49.6 + (year - 2000) as f64 * 0.05,
            female: 50.4 - (year - 2000) as f64 * 0.05,
        })
        .collect()
}

fn ages() -> Vec<AgeBucket> {
    (0..=100u8)
        .map(|age| AgeBucket { age, population: (100 - age) as f64 * 1_000.0 })
        .collect()
}

#[test]
fn series_chart_svg() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("series.svg");
    viz::plot_series(&series(), &path, 900, 500, "en").unwrap();
    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Norway"));
}

#[test]
fn series_chart_png_single_year() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("series.png");
    let one = &series()[..1];
    viz::plot_series(one, &path, 640, 400, "de").unwrap();
    assert!(fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn age_chart_svg() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ages.svg");
    viz::plot_age_distribution(&ages(), "Norway: population by age", &path, 900, 500, "en")
        .unwrap();
    let meta = fs::metadata(&path).expect("file created");
    assert!(meta.len() > 0, "svg has content");
}

#[test]
fn empty_inputs_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.svg");
    let err = viz::plot_series(&[], &path, 400, 300, "en").unwrap_err();
    assert!(err.to_string().contains("no data"));
    assert!(viz::plot_age_distribution(&[], "", &path, 400, 300, "en").is_err());
    assert!(!path.exists());
}

#[test]
fn all_zero_ages_still_render() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("zero.svg");
    let zeros: Vec<AgeBucket> = (0..=100u8).map(|age| AgeBucket { age, population: 0.0 }).collect();
    viz::plot_age_distribution(&zeros, "", &path, 400, 300, "en").unwrap();
    assert!(fs::metadata(&path).unwrap().len() > 0);
}
