//! Database repository layer

pub mod account_repo;
pub mod activity_repo;
pub mod api_key_repo;
pub mod customer_repo;
pub mod role_repo;

pub use account_repo::AccountRepository;
pub use activity_repo::ActivityRepository;
pub use api_key_repo::ApiKeyRepository;
pub use customer_repo::CustomerRepository;
pub use role_repo::RoleRepository;
