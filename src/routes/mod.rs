/// Router Module Index
///
/// Splits the HTTP surface by who may reach it. Authentication is applied per module as an
/// axum layer; the finer Admin/owner decisions are made by the access policy inside handlers.

/// Health check and the token-issuing auth endpoints. No identity required.
pub mod public;

/// Directory reads and employee self-service. Requires a valid bearer token.
pub mod authenticated;

/// Mutations the access policy reserves for the Admin role.
pub mod admin;
