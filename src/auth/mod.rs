// Authentication module
// Resolves the caller's identity and role from a JWT bearer token.
// Credential handling lives with the campus identity provider that issues the tokens.

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::AuthenticatedUser;
pub use models::Role;
pub use token::{Claims, TokenService};
