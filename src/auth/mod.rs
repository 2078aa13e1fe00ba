//! Authentication and authorization module

pub mod api_key;
pub mod jwt;
pub mod lockout;
pub mod middleware;
pub mod password;

pub use api_key::ApiKeyGenerator;
pub use jwt::{Claims, IssuedToken, JwtService};
pub use lockout::{LockoutPolicy, LockoutState, LoginGate};
pub use middleware::{extract_token, jwt_auth_middleware, optional_auth_middleware, AuthContext};
pub use password::PasswordHasher;
