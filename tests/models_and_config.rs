use idb_rs::api::{IdbQuery, normalize_code};
use idb_rs::config::{ClientConfig, DEFAULT_BASE_URL};
use idb_rs::models::{Cell, Field, RawTable};
use idb_rs::{AgeRange, Client, IdbError, Sex, SortMode, YearSpec};

#[test]
fn year_specs() {
    assert_eq!("2023".parse::<YearSpec>(), Ok(YearSpec::Year(2023)));
    assert_eq!(
        " 1950:2025 ".parse::<YearSpec>(),
        Ok(YearSpec::Range { start: 1950, end: 2025 })
    );
    assert!("2025:1950".parse::<YearSpec>().is_err());
    assert!("soon".parse::<YearSpec>().is_err());
}

#[test]
fn age_ranges() {
    assert_eq!("0:14".parse::<AgeRange>(), Ok(AgeRange { min: 0, max: 14 }));
    assert_eq!(AgeRange::default(), AgeRange::FULL);
    assert!("0:101".parse::<AgeRange>().is_err());
    assert!("20:10".parse::<AgeRange>().is_err());
    assert!("20".parse::<AgeRange>().is_err());
}

#[test]
fn sort_modes_accept_name_alias() {
    assert_eq!("name-desc".parse::<SortMode>().unwrap().to_string(), "country-desc");
    assert_eq!(SortMode::default().to_string(), "population-desc");
    assert!("population".parse::<SortMode>().is_err());
}

#[test]
fn cells_coerce_to_numbers() {
    assert_eq!(Cell::from("12").number(), Field::Valid(12.0));
    assert_eq!(Cell::from(" 7.5 ").number(), Field::Valid(7.5));
    assert_eq!(Cell::from("n/a").number(), Field::Defaulted(0.0));
    assert_eq!(Cell::Null.number(), Field::Defaulted(0.0));
    assert_eq!(Cell::from(f64::NAN).number(), Field::Defaulted(0.0));
    assert_eq!(Sex::from_code(2.0), Some(Sex::Female));
    assert_eq!(Sex::from_code(3.0), None);
}

#[test]
fn tables_decode_numbers_and_nulls() {
    let t: RawTable = r#"[["NAME","POP"],["Fiji",42],["Tonga",null]]"#.parse().unwrap();
    assert_eq!(t.column("POP"), Some(1));
    assert_eq!(t.column("YR"), None);
    assert_eq!(t.rows[0][1], Cell::Number(42.0));
    assert!(t.rows[1][1].is_null());
    assert!(matches!("nope".parse::<RawTable>(), Err(IdbError::Decode(_))));
}

#[test]
fn client_urls_follow_config() {
    let default = Client::default();
    assert_eq!(default.base_url, DEFAULT_BASE_URL);
    assert!(!default.has_key());

    let cfg = ClientConfig::default()
        .with_base_url("http://localhost:8080/idb/")
        .with_api_key(Some("  ".into()));
    let client = Client::new(&cfg).unwrap();
    assert!(!client.has_key());
    let q = IdbQuery::country_history("pe", YearSpec::Year(2020)).unwrap();
    assert_eq!(
        client.query_url(&q),
        "http://localhost:8080/idb?get=NAME,GENC,YR,AGE,POP,SEX&YR=2020&AGE=0:100&SEX=0,1,2\
         &for=genc+standard+countries+and+areas:PE"
    );
}

#[test]
fn bad_codes_fail_before_any_request() {
    assert!(matches!(normalize_code("N O"), Err(IdbError::InvalidCode(_))));
    let client = Client::new(&ClientConfig::default().with_base_url("http://127.0.0.1:9")).unwrap();
    let err = client.fetch_history("../etc", YearSpec::Year(2020)).unwrap_err();
    assert!(matches!(err, IdbError::InvalidCode(_)));
}
