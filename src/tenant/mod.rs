//! Per-request tenant resolution and its propagation into the database session.

pub mod context;
pub mod isolation;

pub use context::{NotAMember, TenantContext, ORGANIZATION_HEADER};
pub use isolation::{SessionContext, TENANT_TABLES};
