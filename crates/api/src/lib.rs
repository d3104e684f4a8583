//! HTTP boundary for the authorization core: bearer authentication,
//! permission guards, and error-to-response mapping.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
