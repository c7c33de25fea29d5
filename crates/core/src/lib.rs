#![forbid(unsafe_code)]

pub mod gate;
pub mod model;
pub mod pool;
pub mod progression;
pub mod time;
pub mod timer;

pub use time::Clock;
