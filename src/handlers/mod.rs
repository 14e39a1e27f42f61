// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (tenant only) → Protected (JWT + known user) → Elevated (admin role)
//
// Every tier runs behind tenant resolution so handlers receive the tenant
// pool as a `TenantContext` extension. Route tables live in `app.rs`.
pub mod elevated; // Tier 3: Admin role required
pub mod protected; // Tier 2: JWT authentication required
pub mod public; // Tier 1: No authentication required
pub mod utils;

pub use utils::PageQuery;
