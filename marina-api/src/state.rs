use std::sync::Arc;

use marina_core::repository::{
    AvailabilityRepository, BookingRepository, ContentRepository, ObjectStore, RoleRepository,
};
use marina_core::{BookingService, ContentService, LifecycleRules};
use marina_store::app_config::BusinessRules;
use marina_store::{ChangeHub, InMemoryStore, RedisClient};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub admin_role: String,
}

/// Storage the services run on, chosen at startup.
pub struct Backends {
    pub bookings: Arc<dyn BookingRepository>,
    pub availability: Arc<dyn AvailabilityRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Backends {
    pub fn in_memory(store: Arc<InMemoryStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            bookings: store.clone(),
            availability: store.clone(),
            content: store.clone(),
            roles: store,
            objects,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingService,
    pub content: ContentService,
    pub roles: Arc<dyn RoleRepository>,
    pub hub: Arc<ChangeHub>,
    /// Intake rate limiter; absent means unlimited
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        backends: Backends,
        hub: Arc<ChangeHub>,
        redis: Option<Arc<RedisClient>>,
        auth: AuthConfig,
        business_rules: BusinessRules,
        max_upload_bytes: usize,
    ) -> Self {
        let rules = LifecycleRules {
            block_dates_on_confirm: business_rules.block_dates_on_confirm,
        };
        Self {
            bookings: BookingService::new(backends.bookings, backends.availability, rules),
            content: ContentService::new(backends.content, backends.objects, max_upload_bytes),
            roles: backends.roles,
            hub,
            redis,
            auth,
            business_rules,
            allowed_origins: Vec::new(),
            max_upload_bytes,
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}
