use anyhow::Result;
use uuid::Uuid;

use crate::app::auth::user_from_row;
use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, handle, email, display_name, phone, role, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        phone: Option<String>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users \
             SET display_name = COALESCE($2, display_name), \
                 phone = COALESCE($3, phone) \
             WHERE id = $1 \
             RETURNING id, handle, email, display_name, phone, role, created_at",
        )
        .bind(user_id)
        .bind(display_name)
        .bind(phone)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// Admin-only roster, newest first.
    pub async fn list_users(&self, limit: i64) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, handle, email, display_name, phone, role, created_at \
             FROM users ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}
