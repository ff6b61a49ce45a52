//! The booking core: the slot catalog, the availability resolver and the
//! conflict guard, plus the clock and persistence capabilities they consume.

pub mod availability;
pub mod clock;
pub mod guard;
pub mod slots;
pub mod store;
