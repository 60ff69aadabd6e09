//! Database repository for CRUD operations.
//!
//! Uses prepared statements; deletes report "nothing deleted" so handlers can
//! resolve races (two concurrent deletes of one row) to one success and one
//! not-found.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Account, Category, CreateCategoryRequest, CreateThemeRequest, ExternalIdentity, Theme,
    UpdateCategoryRequest, Vote, VotingCategory,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== ACCOUNT OPERATIONS ====================

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query(
            "SELECT external_id, display_name, avatar_url, created_at, level, flags FROM accounts ORDER BY level DESC, external_id"
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    /// Get an account by external id (case-insensitive).
    pub async fn get_account(&self, external_id: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query(
            "SELECT external_id, display_name, avatar_url, created_at, level, flags FROM accounts WHERE external_id = ?"
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Create an account bound to a verified external identity.
    ///
    /// The identity carries the provider's canonical casing; a duplicate key
    /// (any casing) maps to `Conflict` through the unique constraint.
    pub async fn create_account(
        &self,
        identity: &ExternalIdentity,
        level: i64,
        flags: &serde_json::Value,
    ) -> Result<Account, AppError> {
        let flags_json = serde_json::to_string(flags)?;

        sqlx::query(
            "INSERT INTO accounts (external_id, display_name, avatar_url, created_at, level, flags) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&identity.name)
        .bind(&identity.name)
        .bind(&identity.avatar_url)
        .bind(identity.created_utc)
        .bind(level)
        .bind(&flags_json)
        .execute(&self.pool)
        .await?;

        Ok(Account {
            external_id: identity.name.clone(),
            display_name: identity.name.clone(),
            avatar_url: identity.avatar_url.clone(),
            created_at: identity.created_utc,
            level,
            flags: flags.clone(),
        })
    }

    /// Delete an account and cascade to its votes.
    pub async fn delete_account(&self, external_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Account {} not found",
                external_id
            )));
        }

        sqlx::query("DELETE FROM votes WHERE account_external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete an account and its votes without requiring the account to
    /// exist. Used by self-deregistration, which is idempotent by name.
    pub async fn purge_account(&self, external_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM accounts WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM votes WHERE account_external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== VOTE OPERATIONS ====================

    /// Record a vote for an account in a category.
    pub async fn create_vote(
        &self,
        account_external_id: &str,
        category_id: &str,
    ) -> Result<Vote, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO votes (id, account_external_id, category_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(account_external_id)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(Vote {
            id,
            account_external_id: account_external_id.to_string(),
            category_id: category_id.to_string(),
        })
    }

    /// List the votes recorded for an account.
    pub async fn list_votes_for_account(
        &self,
        account_external_id: &str,
    ) -> Result<Vec<Vote>, AppError> {
        let rows = sqlx::query(
            "SELECT id, account_external_id, category_id FROM votes WHERE account_external_id = ?",
        )
        .bind(account_external_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Vote {
                id: row.get("id"),
                account_external_id: row.get("account_external_id"),
                category_id: row.get("category_id"),
            })
            .collect())
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, grp, position, created_at FROM categories ORDER BY position, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row =
            sqlx::query("SELECT id, name, grp, position, created_at FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a new category.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO categories (id, name, grp, position, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.group)
        .bind(request.position)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Category {
            id,
            name: request.name.clone(),
            group: request.group.clone(),
            position: request.position,
            created_at: now,
        })
    }

    /// Apply a partial update to a category and return the full result.
    pub async fn update_category(
        &self,
        id: &str,
        request: &UpdateCategoryRequest,
    ) -> Result<Category, AppError> {
        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let group = request.group.as_ref().unwrap_or(&existing.group);
        let position = request.position.unwrap_or(existing.position);

        let result =
            sqlx::query("UPDATE categories SET name = ?, grp = ?, position = ? WHERE id = ?")
                .bind(name)
                .bind(group)
                .bind(position)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            // Deleted between the read and the write
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        Ok(Category {
            id: id.to_string(),
            name: name.clone(),
            group: group.clone(),
            position,
            created_at: existing.created_at,
        })
    }

    /// Delete a category.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        Ok(())
    }

    /// List the voting projection of a group's categories.
    pub async fn list_voting_categories(
        &self,
        group: &str,
    ) -> Result<Vec<VotingCategory>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, position FROM categories WHERE grp = ? ORDER BY position, name",
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| VotingCategory {
                id: row.get("id"),
                name: row.get("name"),
                position: row.get("position"),
            })
            .collect())
    }

    // ==================== THEME OPERATIONS ====================

    /// List all themes.
    pub async fn list_themes(&self) -> Result<Vec<Theme>, AppError> {
        let rows = sqlx::query(
            "SELECT id, theme_type, name, config, created_at FROM themes ORDER BY theme_type, name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(theme_from_row).collect()
    }

    /// Create a new theme.
    pub async fn create_theme(&self, request: &CreateThemeRequest) -> Result<Theme, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let config_json = request
            .config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO themes (id, theme_type, name, config, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.theme_type)
        .bind(&request.name)
        .bind(&config_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Theme {
            id,
            theme_type: request.theme_type.clone(),
            name: request.name.clone(),
            config: request.config.clone(),
            created_at: now,
        })
    }

    /// Delete every theme of the given type.
    pub async fn delete_themes_by_type(&self, theme_type: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM themes WHERE theme_type = ?")
            .bind(theme_type)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Account, AppError> {
    let flags_json: String = row.get("flags");
    let flags = serde_json::from_str(&flags_json)?;

    Ok(Account {
        external_id: row.get("external_id"),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        level: row.get("level"),
        flags,
    })
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        group: row.get("grp"),
        position: row.get("position"),
        created_at: row.get("created_at"),
    }
}

fn theme_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Theme, AppError> {
    let config_json: Option<String> = row.get("config");
    let config = config_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Theme {
        id: row.get("id"),
        theme_type: row.get("theme_type"),
        name: row.get("name"),
        config,
        created_at: row.get("created_at"),
    })
}
