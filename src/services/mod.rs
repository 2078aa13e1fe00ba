//! Business logic services layer

pub mod activity_service;
pub mod api_key_service;
pub mod auth_service;
pub mod role_service;

pub use activity_service::ActivityService;
pub use api_key_service::ApiKeyService;
pub use auth_service::AuthService;
pub use role_service::RoleService;
