pub mod bookings;
pub mod chats;
pub mod middleware;
pub mod private_requests;
pub mod reviews;
pub mod rides;
pub mod users;
