//! Role name constants stored in the `users.role` column.

/// Regular storefront customer.
pub const ROLE_USER: &str = "user";

/// Staff account with access to the management endpoints.
pub const ROLE_ADMIN: &str = "admin";
