//! Astronomical data collaborator boundary.
//!
//! A provider resolves one local calendar day of solar and lunar phenomenon
//! times. Failures stay on this side of the boundary as `Err` values and
//! missing phenomena are simply absent fields, so a trigger never panics
//! because a horizon event does not occur on the requested day.

pub mod solar;

use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ASTRO_REQUEST_ID, MAXIMUM_HOUR, MAXIMUM_LATITUDE, MAXIMUM_LONGITUDE, MAXIMUM_MINUTE,
    MINIMUM_HOUR, MINIMUM_LATITUDE, MINIMUM_LONGITUDE, MINIMUM_MINUTE,
};

/// The eight schedulable astronomical phenomena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phenomenon {
    TwilightStart,
    Sunrise,
    SolarTransit,
    Sunset,
    TwilightEnd,
    MoonRise,
    LunarTransit,
    MoonSet,
}

impl Phenomenon {
    pub fn display_name(&self) -> &'static str {
        match self {
            Phenomenon::TwilightStart => "twilight_start",
            Phenomenon::Sunrise => "sunrise",
            Phenomenon::SolarTransit => "solar_transit",
            Phenomenon::Sunset => "sunset",
            Phenomenon::TwilightEnd => "twilight_end",
            Phenomenon::MoonRise => "moon_rise",
            Phenomenon::LunarTransit => "lunar_transit",
            Phenomenon::MoonSet => "moon_set",
        }
    }
}

impl std::fmt::Display for Phenomenon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Which way an offset shifts the phenomenon time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetDirection {
    None,
    Before,
    After,
}

/// Signed shift applied to a fetched phenomenon time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventOffset {
    pub direction: OffsetDirection,
    pub hour: i32,
    pub minute: i32,
}

impl Default for EventOffset {
    fn default() -> Self {
        Self {
            direction: OffsetDirection::None,
            hour: 0,
            minute: 0,
        }
    }
}

impl EventOffset {
    /// Offset in whole minutes: negative before the phenomenon, positive
    /// after it, zero when no direction is configured.
    pub fn offset_minutes(&self) -> i64 {
        let polarity: i64 = match self.direction {
            OffsetDirection::None => 0,
            OffsetDirection::Before => -1,
            OffsetDirection::After => 1,
        };
        polarity * (i64::from(self.hour) * 60 + i64::from(self.minute))
    }

    /// Bounds check shared with nominal trigger times. The range is one
    /// wider than a clock reads on each side.
    pub fn validate(&self) -> Result<()> {
        if !(MINIMUM_HOUR..=MAXIMUM_HOUR).contains(&self.hour) {
            bail!(
                "offset hour must be between {MINIMUM_HOUR} and {MAXIMUM_HOUR} (got {})",
                self.hour
            );
        }
        if !(MINIMUM_MINUTE..=MAXIMUM_MINUTE).contains(&self.minute) {
            bail!(
                "offset minute must be between {MINIMUM_MINUTE} and {MAXIMUM_MINUTE} (got {})",
                self.minute
            );
        }
        Ok(())
    }
}

/// Geographic point the phenomenon times are computed for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn validate(&self) -> Result<()> {
        if !(MINIMUM_LATITUDE..=MAXIMUM_LATITUDE).contains(&self.latitude) {
            bail!(
                "latitude must be between {MINIMUM_LATITUDE} and {MAXIMUM_LATITUDE} (got {})",
                self.latitude
            );
        }
        if !(MINIMUM_LONGITUDE..=MAXIMUM_LONGITUDE).contains(&self.longitude) {
            bail!(
                "longitude must be between {MINIMUM_LONGITUDE} and {MAXIMUM_LONGITUDE} (got {})",
                self.longitude
            );
        }
        Ok(())
    }
}

/// Request for one local calendar day of data.
#[derive(Debug, Clone)]
pub struct AstroRequest {
    /// Requester tag carried on the wire, at most eight characters.
    pub id: String,
    pub date: NaiveDate,
    pub location: Location,
}

impl AstroRequest {
    pub fn for_day(date: NaiveDate, location: Location) -> Self {
        Self {
            id: ASTRO_REQUEST_ID.to_string(),
            date,
            location,
        }
    }
}

/// One resolved day of astronomical data.
///
/// `valid` reports whether the provider considers the response usable at
/// all. Individual phenomena stay `None` when they do not occur on the day
/// (no moonrise, polar night) or when the provider cannot compute them.
#[derive(Debug, Clone, PartialEq)]
pub struct AstronomicalDay {
    pub valid: bool,
    pub date: NaiveDate,
    pub lunar_phase: Option<String>,
    pub twilight_start: Option<DateTime<Local>>,
    pub sunrise: Option<DateTime<Local>>,
    pub solar_transit: Option<DateTime<Local>>,
    pub sunset: Option<DateTime<Local>>,
    pub twilight_end: Option<DateTime<Local>>,
    pub moon_rise: Option<DateTime<Local>>,
    pub lunar_transit: Option<DateTime<Local>>,
    pub moon_set: Option<DateTime<Local>>,
}

impl AstronomicalDay {
    /// A response carrying no usable data for `date`.
    pub fn invalid(date: NaiveDate) -> Self {
        Self {
            valid: false,
            date,
            lunar_phase: None,
            twilight_start: None,
            sunrise: None,
            solar_transit: None,
            sunset: None,
            twilight_end: None,
            moon_rise: None,
            lunar_transit: None,
            moon_set: None,
        }
    }

    /// Time of the given phenomenon, when present for the day.
    pub fn phenomenon_time(&self, phenomenon: Phenomenon) -> Option<DateTime<Local>> {
        match phenomenon {
            Phenomenon::TwilightStart => self.twilight_start,
            Phenomenon::Sunrise => self.sunrise,
            Phenomenon::SolarTransit => self.solar_transit,
            Phenomenon::Sunset => self.sunset,
            Phenomenon::TwilightEnd => self.twilight_end,
            Phenomenon::MoonRise => self.moon_rise,
            Phenomenon::LunarTransit => self.lunar_transit,
            Phenomenon::MoonSet => self.moon_set,
        }
    }
}

/// Collaborator that resolves astronomical data one day at a time.
#[cfg_attr(test, automock)]
pub trait AstronomicalProvider: Send + Sync {
    /// Resolves the data for `request.date` at `request.location`. Transport
    /// or computation failures are an `Err`; a well-formed response with no
    /// usable data reports `valid: false` or absent phenomena instead.
    fn one_day(&self, request: &AstroRequest) -> Result<AstronomicalDay>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn offset_polarity_follows_the_direction() {
        let before = EventOffset {
            direction: OffsetDirection::Before,
            hour: 1,
            minute: 30,
        };
        assert_eq!(before.offset_minutes(), -90);

        let after = EventOffset {
            direction: OffsetDirection::After,
            hour: 0,
            minute: 45,
        };
        assert_eq!(after.offset_minutes(), 45);

        let none = EventOffset {
            direction: OffsetDirection::None,
            hour: 5,
            minute: 15,
        };
        assert_eq!(none.offset_minutes(), 0);
    }

    #[test]
    fn offset_bounds_are_one_wider_than_a_clock() {
        let permissive = EventOffset {
            direction: OffsetDirection::After,
            hour: -1,
            minute: 60,
        };
        assert!(permissive.validate().is_ok());

        let bad_hour = EventOffset {
            hour: 25,
            ..EventOffset::default()
        };
        assert!(bad_hour.validate().is_err());

        let bad_minute = EventOffset {
            minute: 61,
            ..EventOffset::default()
        };
        assert!(bad_minute.validate().is_err());
    }

    #[test]
    fn location_bounds_are_enforced() {
        let valid = Location {
            latitude: 37.7749,
            longitude: -122.4194,
        };
        assert!(valid.validate().is_ok());

        assert!(
            Location {
                latitude: 90.1,
                longitude: 0.0
            }
            .validate()
            .is_err()
        );
        assert!(
            Location {
                latitude: 0.0,
                longitude: -180.5
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn phenomenon_lookup_matches_the_field() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let sunrise = Local.with_ymd_and_hms(2024, 6, 21, 5, 48, 0).unwrap();
        let day = AstronomicalDay {
            sunrise: Some(sunrise),
            valid: true,
            ..AstronomicalDay::invalid(date)
        };

        assert_eq!(day.phenomenon_time(Phenomenon::Sunrise), Some(sunrise));
        assert_eq!(day.phenomenon_time(Phenomenon::MoonRise), None);
    }

    #[test]
    fn config_names_deserialize_to_phenomena() {
        for (text, expected) in [
            ("\"twilight_start\"", Phenomenon::TwilightStart),
            ("\"sunrise\"", Phenomenon::Sunrise),
            ("\"solar_transit\"", Phenomenon::SolarTransit),
            ("\"sunset\"", Phenomenon::Sunset),
            ("\"twilight_end\"", Phenomenon::TwilightEnd),
            ("\"moon_rise\"", Phenomenon::MoonRise),
            ("\"lunar_transit\"", Phenomenon::LunarTransit),
            ("\"moon_set\"", Phenomenon::MoonSet),
        ] {
            let parsed: Phenomenon = serde_json::from_str(text).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(format!("\"{parsed}\""), text);
        }
    }

    #[test]
    fn request_carries_the_registered_tag() {
        let request = AstroRequest::for_day(
            NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            Location {
                latitude: 0.0,
                longitude: 0.0,
            },
        );
        assert!(request.id.len() <= 8);
    }
}
