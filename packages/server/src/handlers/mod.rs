pub mod health;
pub mod notify;
pub mod upload;
pub mod user;
