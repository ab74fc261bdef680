use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn equal_dates_form_a_valid_range() {
    let range = DateRange::new(date(2022, 1, 1), date(2022, 1, 1)).expect("inclusive");
    assert_eq!(range.days(), 1);
    assert!(range.contains(date(2022, 1, 1)));
}

#[test]
fn inverted_dates_are_rejected() {
    let err = DateRange::new(date(2022, 2, 1), date(2022, 1, 1)).expect_err("inverted");
    assert!(matches!(err, LoadError::InvalidDateRange { .. }));
}

#[test]
fn partial_selection_is_no_range() {
    assert_eq!(DateRange::from_selection(Some(date(2022, 1, 1)), None), None);
    assert_eq!(DateRange::from_selection(None, Some(date(2022, 1, 1))), None);
    assert_eq!(
        DateRange::from_selection(Some(date(2022, 2, 1)), Some(date(2022, 1, 1))),
        None
    );
}

#[test]
fn deserializing_an_inverted_range_fails() {
    let raw = r#"{"start":"2022-02-01","end":"2022-01-01"}"#;
    assert!(serde_json::from_str::<DateRange>(raw).is_err());

    let raw = r#"{"start":"2022-01-01","end":"2022-02-01"}"#;
    let range: DateRange = serde_json::from_str(raw).expect("ordered range");
    assert_eq!(range.days(), 32);
}

#[test]
fn metric_parses_from_column_name() {
    assert_eq!("parks".parse::<Metric>(), Ok(Metric::Parks));
    assert_eq!(" Total_Deaths ".parse::<Metric>(), Ok(Metric::TotalDeaths));
    assert!("date; DROP TABLE covid_london".parse::<Metric>().is_err());
}

#[test]
fn only_map_stats_graph_are_date_dependent() {
    assert!(!SceneId::Welcome.is_date_dependent());
    for id in [SceneId::Map, SceneId::Stats, SceneId::Graph] {
        assert!(id.is_date_dependent());
        assert_eq!(id.as_str().parse::<SceneId>(), Ok(id));
    }
}
