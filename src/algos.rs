pub use self::round_robin::{Plan, RoundRobin};

mod round_robin;
