// handlers/public/auth/mod.rs - Account creation and session cookie management

pub mod login;
pub mod logout;
pub mod register;

pub use login::login;
pub use logout::logout;
pub use register::register;
