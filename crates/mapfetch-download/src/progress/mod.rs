//! Progress rate-limiting for node transfer events.

mod throttle;

pub use throttle::ProgressThrottle;
