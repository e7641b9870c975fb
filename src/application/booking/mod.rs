mod booking_service;
mod errors;

pub use booking_service::{
    ServiceDependencies, create_booking, delete_booking, get_booking, list_bookings,
    update_booking,
};
pub use errors::{BookingApplicationError, ErrorKind, Result};
