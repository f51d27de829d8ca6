use super::validation::{parse_clock, parse_offset};
use super::*;
use crate::astro::OffsetDirection;
use crate::constants::DEFAULT_DRIFT_CHECK_PERIOD_MS;
use std::fs;
use tempfile::tempdir;

fn parse(text: &str) -> Config {
    toml::from_str(text).unwrap()
}

fn single_entry(text: &str) -> TriggerEntry {
    let config = parse(text);
    assert_eq!(config.triggers.len(), 1);
    config.triggers.into_iter().next().unwrap()
}

#[test]
fn full_file_loads_and_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[daemon]
debug_logging = true

[[trigger]]
kind = "interval"
name = "heartbeat"
timeout = { nominal_ms = 10000, tolerance_ms = 2000 }
duration = { nominal_ms = 250 }

[[trigger]]
kind = "calendar"
name = "evening-lights"
days = ["weekdays"]
time = "19:30"
tolerance = "00:30"

[[trigger]]
kind = "calendar"
name = "porch-lamp"
phenomenon = "sunset"
latitude = 37.7749
longitude = -122.4194
offset = "-00:45"
trip_limit = 2
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.daemon.debug_logging, Some(true));
    assert_eq!(config.triggers.len(), 3);
    assert_eq!(config.triggers[0].kind, TriggerKind::Interval);
    assert_eq!(config.triggers[2].trip_limit, Some(2));
}

#[test]
fn default_template_is_loadable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    write_default_config(&path).unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.triggers.len(), 1);
    assert_eq!(config.triggers[0].name.as_deref(), Some("heartbeat"));

    // A second write must not clobber the file.
    assert!(write_default_config(&path).is_err());
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let error = load_from_path(&path).unwrap_err();
    assert!(format!("{error:#}").contains("Failed to read config file"));
}

#[test]
fn interval_entry_becomes_interval_params() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "interval"
timeout = { nominal_ms = 10000, tolerance_ms = 2000 }
"#,
    );
    let params = entry.trigger_params(false).unwrap();
    assert_eq!(params.schedule, ScheduleKind::Interval);
    assert_eq!(params.timeout, Some(TimeRange::new(10_000, 2_000)));
    assert_eq!(params.duration, None);
    assert_eq!(params.trip_limit, TRIP_LIMIT_UNLIMITED);
}

#[test]
fn calendar_entry_builds_the_full_spec() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "calendar"
days = ["monday", "weekends"]
time = "19:30"
tolerance = "00:30"
drift_check_period_ms = 5000
"#,
    );
    let params = entry.trigger_params(false).unwrap();
    let ScheduleKind::Calendar(spec) = params.schedule else {
        panic!("expected a calendar schedule");
    };
    assert_eq!(spec.days, DayMask::MONDAY | DayMask::WEEKEND);
    assert_eq!(spec.time, Some(ClockTime::new(19, 30)));
    assert_eq!(spec.tolerance, ClockTime::new(0, 30));
    assert_eq!(spec.astronomical, None);
    assert_eq!(spec.drift_check_period_ms, 5_000);
}

#[test]
fn astronomical_entry_parses_location_and_offset() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "calendar"
phenomenon = "sunset"
latitude = 37.7749
longitude = -122.4194
offset = "-00:45"
"#,
    );
    let params = entry.trigger_params(false).unwrap();
    let ScheduleKind::Calendar(spec) = params.schedule else {
        panic!("expected a calendar schedule");
    };
    let astro = spec.astronomical.unwrap();
    assert_eq!(astro.phenomenon, Phenomenon::Sunset);
    assert_eq!(astro.location.latitude, 37.7749);
    assert_eq!(astro.offset.offset_minutes(), -45);
    assert_eq!(spec.days, DayMask::ALL_DAYS);
    assert_eq!(spec.drift_check_period_ms, DEFAULT_DRIFT_CHECK_PERIOD_MS);
}

#[test]
fn daemon_debug_default_flows_into_entries() {
    let config = parse(
        r#"
[daemon]
debug_logging = true

[[trigger]]
kind = "interval"

[[trigger]]
kind = "interval"
debug_logging = false
"#,
    );
    let inherited = config.triggers[0].trigger_params(true).unwrap();
    assert!(inherited.debug_logging);
    let overridden = config.triggers[1].trigger_params(true).unwrap();
    assert!(!overridden.debug_logging);
}

#[test]
fn interval_rejects_calendar_fields() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "interval"
time = "19:30"
"#,
    );
    let error = entry.trigger_params(false).unwrap_err();
    assert!(error.to_string().contains("only applies to calendar"));
}

#[test]
fn calendar_without_a_target_is_rejected() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "calendar"
days = ["monday"]
"#,
    );
    assert!(entry.trigger_params(false).is_err());
}

#[test]
fn phenomenon_without_coordinates_is_rejected() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "calendar"
phenomenon = "sunrise"
latitude = 37.7749
"#,
    );
    let error = entry.trigger_params(false).unwrap_err();
    assert!(error.to_string().contains("'latitude' and 'longitude'"));
}

#[test]
fn coordinates_without_a_phenomenon_are_rejected() {
    let entry = single_entry(
        r#"
[[trigger]]
kind = "calendar"
time = "19:30"
latitude = 37.7749
longitude = -122.4194
"#,
    );
    let error = entry.trigger_params(false).unwrap_err();
    assert!(error.to_string().contains("need a 'phenomenon'"));
}

#[test]
fn clock_strings_are_parsed_strictly() {
    assert_eq!(parse_clock("07:05", "time").unwrap(), ClockTime::new(7, 5));
    assert_eq!(parse_clock("7:05", "time").unwrap(), ClockTime::new(7, 5));
    assert_eq!(parse_clock(" 23:59 ", "time").unwrap(), ClockTime::new(23, 59));
    assert!(parse_clock("25:00", "time").is_err());
    assert!(parse_clock("12:60", "time").is_err());
    assert!(parse_clock("12:5", "time").is_err());
    assert!(parse_clock("noon", "time").is_err());
}

#[test]
fn offsets_carry_their_direction() {
    let before = parse_offset("-01:30").unwrap();
    assert_eq!(before.direction, OffsetDirection::Before);
    assert_eq!(before.offset_minutes(), -90);

    let explicit_after = parse_offset("+00:15").unwrap();
    assert_eq!(explicit_after.direction, OffsetDirection::After);
    assert_eq!(explicit_after.offset_minutes(), 15);

    let implicit_after = parse_offset("00:15").unwrap();
    assert_eq!(implicit_after.direction, OffsetDirection::After);

    assert!(parse_offset("--01:30").is_err());
    assert!(parse_offset("01:99").is_err());
}

#[test]
fn validate_reports_the_entry_index() {
    let config = parse(
        r#"
[[trigger]]
kind = "interval"

[[trigger]]
kind = "calendar"
"#,
    );
    let error = config.validate().unwrap_err();
    assert!(format!("{error:#}").contains("entry 2"));
}
