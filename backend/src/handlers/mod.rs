pub mod bookings;
pub mod common;
pub mod transitions;
pub mod trip_records;
