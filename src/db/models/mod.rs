mod reservation;

pub use reservation::*;
