pub mod booking;
pub mod car;
pub mod notification;
pub mod reservation;
pub mod user;
