// Token acquisition and registration endpoints that do not require
// authentication.

pub mod auth;
