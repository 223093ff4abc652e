///! Race meeting calendar
///!
///! Loads the yearly JRA schedule CSV (one row per venue and race day) and
///! turns a (date, venue, race number) choice into a race id.

mod calendar;
pub use calendar::{Meeting, Schedule, DAYS_AHEAD, DAYS_BACK};
