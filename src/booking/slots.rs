use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Width of the bookable grid in minutes.
pub const SLOT_GRID_MINUTES: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// One point on the business day's bookable grid, e.g. "9:00 AM".
///
/// Slots are value types defined by the catalog below; they are stored in the
/// database as their 12-hour label text and never as a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    hour: u8,
    minute: u8,
    meridiem: Meridiem,
}

impl Slot {
    pub const fn new(hour: u8, minute: u8, meridiem: Meridiem) -> Self {
        Self {
            hour,
            minute,
            meridiem,
        }
    }

    /// Minutes since local midnight. 12:00 AM maps to 0, 12:00 PM to 720.
    pub fn minute_of_day(&self) -> u16 {
        let hour = (self.hour % 12) as u16;
        let base = match self.meridiem {
            Meridiem::Am => 0,
            Meridiem::Pm => 720,
        };
        base + hour * 60 + self.minute as u16
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minute_of_day().cmp(&other.minute_of_day())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meridiem = match self.meridiem {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        };
        write!(f, "{}:{:02} {}", self.hour, self.minute, meridiem)
    }
}

#[derive(Debug, Error)]
#[error("malformed slot label: {0:?}")]
pub struct ParseSlotError(String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSlotError(s.to_string());
        let (clock, meridiem) = s.split_once(' ').ok_or_else(err)?;
        let meridiem = match meridiem {
            "AM" => Meridiem::Am,
            "PM" => Meridiem::Pm,
            _ => return Err(err()),
        };
        let (hour, minute) = clock.split_once(':').ok_or_else(err)?;
        if minute.len() != 2 {
            return Err(err());
        }
        let hour: u8 = hour.parse().map_err(|_| err())?;
        let minute: u8 = minute.parse().map_err(|_| err())?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(err());
        }
        Ok(Slot::new(hour, minute, meridiem))
    }
}

// Wire format is the label itself: "9:00 AM", "1:30 PM".
impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(de::Error::custom)
    }
}

// Business hours on a 30-minute grid, with the unpaid lunch gap between the
// two blocks. The split is used for display grouping only.
const MORNING: [Slot; 6] = [
    Slot::new(9, 0, Meridiem::Am),
    Slot::new(9, 30, Meridiem::Am),
    Slot::new(10, 0, Meridiem::Am),
    Slot::new(10, 30, Meridiem::Am),
    Slot::new(11, 0, Meridiem::Am),
    Slot::new(11, 30, Meridiem::Am),
];

const AFTERNOON: [Slot; 8] = [
    Slot::new(1, 0, Meridiem::Pm),
    Slot::new(1, 30, Meridiem::Pm),
    Slot::new(2, 0, Meridiem::Pm),
    Slot::new(2, 30, Meridiem::Pm),
    Slot::new(3, 0, Meridiem::Pm),
    Slot::new(3, 30, Meridiem::Pm),
    Slot::new(4, 0, Meridiem::Pm),
    Slot::new(4, 30, Meridiem::Pm),
];

static CATALOG: Lazy<Vec<Slot>> = Lazy::new(|| {
    MORNING
        .iter()
        .chain(AFTERNOON.iter())
        .copied()
        .collect()
});

/// The full ordered catalog of bookable slots.
pub fn catalog() -> &'static [Slot] {
    CATALOG.as_slice()
}

pub fn morning() -> &'static [Slot] {
    &MORNING
}

pub fn afternoon() -> &'static [Slot] {
    &AFTERNOON
}

pub fn is_catalog_slot(slot: Slot) -> bool {
    catalog().contains(&slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_of_day_follows_twelve_hour_convention() {
        assert_eq!(Slot::new(12, 0, Meridiem::Am).minute_of_day(), 0);
        assert_eq!(Slot::new(12, 0, Meridiem::Pm).minute_of_day(), 720);
        assert_eq!(Slot::new(9, 0, Meridiem::Am).minute_of_day(), 540);
        assert_eq!(Slot::new(1, 30, Meridiem::Pm).minute_of_day(), 810);
        assert_eq!(Slot::new(11, 30, Meridiem::Pm).minute_of_day(), 1410);
    }

    #[test]
    fn labels_use_space_before_meridiem() {
        assert_eq!(Slot::new(9, 0, Meridiem::Am).to_string(), "9:00 AM");
        assert_eq!(Slot::new(1, 30, Meridiem::Pm).to_string(), "1:30 PM");
    }

    #[test]
    fn labels_round_trip() {
        for slot in catalog() {
            let parsed: Slot = slot.to_string().parse().unwrap();
            assert_eq!(&parsed, slot);
        }
    }

    #[test]
    fn malformed_labels_are_rejected() {
        for label in ["", "9:00", "13:00 AM", "9:0 AM", "9:00 am", "9:60 PM", "0:00 AM"] {
            assert!(label.parse::<Slot>().is_err(), "accepted {label:?}");
        }
    }

    #[test]
    fn catalog_is_sorted_and_unique() {
        let minutes: Vec<u16> = catalog().iter().map(Slot::minute_of_day).collect();
        let mut sorted = minutes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(minutes, sorted);
    }

    #[test]
    fn catalog_excludes_the_lunch_gap() {
        let noon: Slot = "12:00 PM".parse().unwrap();
        let half_past: Slot = "12:30 PM".parse().unwrap();
        assert!(!is_catalog_slot(noon));
        assert!(!is_catalog_slot(half_past));
        assert_eq!(catalog().len(), morning().len() + afternoon().len());
    }
}
