// handlers/mod.rs - HTTP handlers grouped by access tier
//
// Public (no token) → Protected (JWT plus resolved organization context)

pub mod protected;
pub mod public;
pub mod utils;
