//! Day-of-week eligibility masks and circular day arithmetic.
//!
//! Days are numbered from Sunday: Sunday is 0 and Saturday is 6, matching
//! `chrono::Weekday::num_days_from_sunday`. A mask holds one bit per day
//! with Sunday in bit 0.

use anyhow::{Result, bail};
use chrono::Weekday;

use crate::constants::{DAYS_PER_WEEK, MAX_DAY_NUMBER, MIN_DAY_NUMBER};

/// Bitmask of weekdays a scheduled trigger may fire on.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct DayMask(u8);

impl DayMask {
    pub const SUNDAY: DayMask = DayMask(0b000_0001);
    pub const MONDAY: DayMask = DayMask(0b000_0010);
    pub const TUESDAY: DayMask = DayMask(0b000_0100);
    pub const WEDNESDAY: DayMask = DayMask(0b000_1000);
    pub const THURSDAY: DayMask = DayMask(0b001_0000);
    pub const FRIDAY: DayMask = DayMask(0b010_0000);
    pub const SATURDAY: DayMask = DayMask(0b100_0000);
    /// Monday through Friday.
    pub const WEEKDAY: DayMask = DayMask(0b011_1110);
    /// Saturday and Sunday.
    pub const WEEKEND: DayMask = DayMask(0b100_0001);
    pub const ALL_DAYS: DayMask = DayMask(0b111_1111);

    /// Builds a mask from raw bits. At least one day must be selected, and
    /// no bit outside the seven day bits may be set.
    pub fn from_bits(bits: u8) -> Result<DayMask> {
        if bits == 0 {
            bail!("day mask must select at least one day (got {bits:#010b})");
        }
        if bits > Self::ALL_DAYS.0 {
            bail!(
                "day mask has bits outside Sunday..Saturday (got {bits:#010b})"
            );
        }
        Ok(DayMask(bits))
    }

    /// Mask for one day name as written in configuration files. Accepts the
    /// seven weekday names plus the `weekday`, `weekend`, and `all` groups.
    pub fn from_name(name: &str) -> Result<DayMask> {
        let mask = match name.to_ascii_lowercase().as_str() {
            "sunday" => Self::SUNDAY,
            "monday" => Self::MONDAY,
            "tuesday" => Self::TUESDAY,
            "wednesday" => Self::WEDNESDAY,
            "thursday" => Self::THURSDAY,
            "friday" => Self::FRIDAY,
            "saturday" => Self::SATURDAY,
            "weekday" | "weekdays" => Self::WEEKDAY,
            "weekend" | "weekends" => Self::WEEKEND,
            "all" | "daily" => Self::ALL_DAYS,
            other => bail!("unknown day name '{other}'"),
        };
        Ok(mask)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when `day_number` (0 = Sunday) is selected.
    pub fn contains(self, day_number: u8) -> bool {
        day_number <= MAX_DAY_NUMBER && self.0 & (1 << day_number) != 0
    }

    /// Selected day numbers in firing order, starting from `today` and
    /// wrapping through the week. `today` itself comes first when selected.
    /// Never empty for a validly constructed mask.
    pub fn candidates_from(self, today: u8) -> Vec<u8> {
        (0..DAYS_PER_WEEK)
            .map(|offset| (today + offset) % DAYS_PER_WEEK)
            .filter(|&day| self.contains(day))
            .collect()
    }
}

impl std::ops::BitOr for DayMask {
    type Output = DayMask;

    fn bitor(self, rhs: DayMask) -> DayMask {
        DayMask(self.0 | rhs.0)
    }
}

// Serialized as the raw bits; deserialization revalidates them.
impl serde::Serialize for DayMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DayMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        DayMask::from_bits(bits).map_err(serde::de::Error::custom)
    }
}

impl Default for DayMask {
    fn default() -> Self {
        Self::ALL_DAYS
    }
}

/// Day number (0 = Sunday) for a chrono weekday.
pub fn day_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Forward circular distance in days from `reference` to `target`, both
/// numbered from Sunday. Zero when they are the same day, never negative.
pub fn day_delta(reference: u8, target: u8) -> Result<u8> {
    for (label, day) in [("reference", reference), ("target", target)] {
        if day > MAX_DAY_NUMBER {
            bail!(
                "{label} day must be between {MIN_DAY_NUMBER} and {MAX_DAY_NUMBER} (got {day})"
            );
        }
    }
    let delta = if target >= reference {
        target - reference
    } else {
        (MAX_DAY_NUMBER - reference) + target + 1
    };
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_masks_carry_the_published_bits() {
        assert_eq!(DayMask::SUNDAY.bits(), 1);
        assert_eq!(DayMask::SATURDAY.bits(), 64);
        assert_eq!(DayMask::WEEKDAY.bits(), 62);
        assert_eq!(DayMask::WEEKEND.bits(), 65);
        assert_eq!(DayMask::ALL_DAYS.bits(), 127);
    }

    #[test]
    fn empty_and_overflowing_masks_are_rejected() {
        assert!(DayMask::from_bits(0).is_err());
        assert!(DayMask::from_bits(128).is_err());
        assert!(DayMask::from_bits(0b1111_1111).is_err());
        assert_eq!(DayMask::from_bits(127).unwrap(), DayMask::ALL_DAYS);
    }

    #[test]
    fn day_names_parse_case_insensitively() {
        assert_eq!(DayMask::from_name("Monday").unwrap(), DayMask::MONDAY);
        assert_eq!(DayMask::from_name("WEEKEND").unwrap(), DayMask::WEEKEND);
        assert_eq!(DayMask::from_name("daily").unwrap(), DayMask::ALL_DAYS);
        assert!(DayMask::from_name("someday").is_err());
    }

    #[test]
    fn masks_combine_with_bitor() {
        let mask = DayMask::MONDAY | DayMask::WEDNESDAY | DayMask::FRIDAY;
        assert_eq!(mask.bits(), 2 + 8 + 32);
        assert!(mask.contains(1));
        assert!(!mask.contains(2));
        assert!(mask.contains(3));
    }

    #[test]
    fn candidates_start_today_and_wrap_forward() {
        // Wednesday (3) start against a Mon/Wed/Fri mask.
        let mask = DayMask::MONDAY | DayMask::WEDNESDAY | DayMask::FRIDAY;
        assert_eq!(mask.candidates_from(3), vec![3, 5, 1]);
        // Saturday (6) start: Friday is almost a week away.
        assert_eq!(mask.candidates_from(6), vec![1, 3, 5]);
        // Full mask lists the whole week in rotation.
        assert_eq!(
            DayMask::ALL_DAYS.candidates_from(5),
            vec![5, 6, 0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn day_delta_is_forward_and_circular() {
        assert_eq!(day_delta(3, 3).unwrap(), 0);
        assert_eq!(day_delta(1, 4).unwrap(), 3);
        assert_eq!(day_delta(5, 2).unwrap(), 4);
        assert_eq!(day_delta(6, 0).unwrap(), 1);
        assert_eq!(day_delta(0, 6).unwrap(), 6);
    }

    #[test]
    fn day_delta_rejects_out_of_range_days() {
        assert!(day_delta(7, 0).is_err());
        assert!(day_delta(0, 7).is_err());
    }

    #[test]
    fn weekday_numbering_matches_sunday_origin() {
        assert_eq!(day_number(Weekday::Sun), 0);
        assert_eq!(day_number(Weekday::Wed), 3);
        assert_eq!(day_number(Weekday::Sat), 6);
    }

    #[test]
    fn serde_round_trips_bits_and_revalidates() {
        assert_eq!(serde_json::to_string(&DayMask::WEEKEND).unwrap(), "65");
        let parsed: DayMask = serde_json::from_str("62").unwrap();
        assert_eq!(parsed, DayMask::WEEKDAY);
        assert!(serde_json::from_str::<DayMask>("0").is_err());
        assert!(serde_json::from_str::<DayMask>("128").is_err());
    }
}
