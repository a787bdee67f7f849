pub mod app_config;
pub mod availability_repo;
pub mod booking_repo;
pub mod content_repo;
pub mod database;
pub mod listener;
pub mod memory;
pub mod notify;
pub mod object_store;
pub mod redis_repo;
pub mod role_repo;

pub use availability_repo::PgAvailabilityRepository;
pub use booking_repo::PgBookingRepository;
pub use content_repo::PgContentRepository;
pub use database::DbClient;
pub use memory::InMemoryStore;
pub use notify::ChangeHub;
pub use object_store::LocalObjectStore;
pub use redis_repo::RedisClient;
pub use role_repo::PgRoleRepository;
