// handlers/protected/mod.rs - Endpoints behind JWT authentication
//
// Every handler here receives the request's TenantContext from the tenant
// middleware and scopes its work to the context's organization.

pub mod defaults;
pub mod discounts;
pub mod jobs;
pub mod me;
pub mod organizations;
pub mod resources;
