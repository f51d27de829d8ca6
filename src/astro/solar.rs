//! Locally computed solar data provider.
//!
//! Twilight, sunrise, and sunset come from the NOAA solar calculations in
//! the `sunrise` crate. Solar transit is taken as the midpoint of sunrise
//! and sunset. Lunar phenomena are not computed locally and stay absent, so
//! lunar-scheduled triggers need a provider backed by an ephemeris service.

use anyhow::{Result, anyhow};
use chrono::Local;
use sunrise::{Coordinates, DawnType, SolarDay, SolarEvent};

use crate::astro::{AstroRequest, AstronomicalDay, AstronomicalProvider};

/// Provider computing solar phenomena on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarCalculator;

impl AstronomicalProvider for SolarCalculator {
    fn one_day(&self, request: &AstroRequest) -> Result<AstronomicalDay> {
        let coord = Coordinates::new(request.location.latitude, request.location.longitude)
            .ok_or_else(|| {
                anyhow!(
                    "solar calculator rejected coordinates (got {:.4}, {:.4})",
                    request.location.latitude,
                    request.location.longitude
                )
            })?;
        let solar_day = SolarDay::new(coord, request.date);

        let twilight_start = solar_day.event_time(SolarEvent::Dawn(DawnType::Civil));
        let sunrise = solar_day.event_time(SolarEvent::Sunrise);
        let sunset = solar_day.event_time(SolarEvent::Sunset);
        let twilight_end = solar_day.event_time(SolarEvent::Dusk(DawnType::Civil));
        let solar_transit = sunrise + (sunset - sunrise) / 2;

        Ok(AstronomicalDay {
            valid: true,
            date: request.date,
            lunar_phase: None,
            twilight_start: Some(twilight_start.with_timezone(&Local)),
            sunrise: Some(sunrise.with_timezone(&Local)),
            solar_transit: Some(solar_transit.with_timezone(&Local)),
            sunset: Some(sunset.with_timezone(&Local)),
            twilight_end: Some(twilight_end.with_timezone(&Local)),
            moon_rise: None,
            lunar_transit: None,
            moon_set: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::astro::Location;

    fn mid_latitude_request() -> AstroRequest {
        AstroRequest::for_day(
            NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            Location {
                latitude: 37.7749,
                longitude: -122.4194,
            },
        )
    }

    #[test]
    fn solar_phenomena_come_back_in_daylight_order() {
        let day = SolarCalculator.one_day(&mid_latitude_request()).unwrap();

        assert!(day.valid);
        assert_eq!(day.date, mid_latitude_request().date);

        let twilight_start = day.twilight_start.unwrap();
        let sunrise = day.sunrise.unwrap();
        let transit = day.solar_transit.unwrap();
        let sunset = day.sunset.unwrap();
        let twilight_end = day.twilight_end.unwrap();

        assert!(twilight_start < sunrise);
        assert!(sunrise < transit);
        assert!(transit < sunset);
        assert!(sunset < twilight_end);
    }

    #[test]
    fn transit_splits_the_day_evenly() {
        let day = SolarCalculator.one_day(&mid_latitude_request()).unwrap();
        let morning = day.solar_transit.unwrap() - day.sunrise.unwrap();
        let evening = day.sunset.unwrap() - day.solar_transit.unwrap();
        assert!((morning.num_milliseconds() - evening.num_milliseconds()).abs() <= 1);
    }

    #[test]
    fn lunar_phenomena_are_absent() {
        let day = SolarCalculator.one_day(&mid_latitude_request()).unwrap();
        assert_eq!(day.moon_rise, None);
        assert_eq!(day.lunar_transit, None);
        assert_eq!(day.moon_set, None);
        assert_eq!(day.lunar_phase, None);
    }

    #[test]
    fn out_of_range_coordinates_are_an_error() {
        let mut request = mid_latitude_request();
        request.location.latitude = 90.5;
        assert!(SolarCalculator.one_day(&request).is_err());
    }
}
