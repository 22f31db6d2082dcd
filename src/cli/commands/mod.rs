pub mod auth;
pub mod discount;
pub mod job;
pub mod org;
pub mod resource;
pub mod server;
