pub mod bookings;
pub mod chats;
pub mod contracts;
pub mod error;
pub mod jwt;
pub mod private_requests;
pub mod reviews;
pub mod rides;
pub mod users;
