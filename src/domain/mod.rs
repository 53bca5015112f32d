pub mod booking;
pub mod chat_message;
pub mod private_request;
pub mod review;
pub mod ride;
pub mod user;
