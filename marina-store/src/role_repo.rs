use async_trait::async_trait;
use marina_core::repository::RoleRepository;
use marina_core::CoreResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn has_role(&self, user_id: Uuid, role: &str) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
