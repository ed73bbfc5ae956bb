pub mod notify;
pub mod upload;
pub mod user;
pub mod work;
