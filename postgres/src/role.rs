//! Role repository (`roles`, `permissions`, `role_permissions`, `user_roles`).

use crate::error::{RepositoryError, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for the `roles` table.
///
/// `path` is the role's LTREE-style materialized path (e.g. `admin.billing`);
/// role hierarchy implies permissions transitively, so a descendant's
/// effective permission set is the union of every ancestor's own grants.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub version: i64,
}

/// A permission identifier (26-char identifier per the table-level schema).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Repository port over the role/permission hierarchy.
pub trait RoleRepository: Send + Sync {
    /// Find a role by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_id(&self, id: Uuid) -> Result<RoleRow>;

    /// Find a role by its unique name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_name(&self, name: &str) -> Result<RoleRow>;

    /// List every descendant of `path` (exclusive), ordered shallowest-first.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn find_descendants(&self, path: &str) -> Result<Vec<RoleRow>>;

    /// Create a role under `parent_id` (or as a root role, if `None`).
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if `name` is already taken, or
    /// a database error.
    async fn create(&self, role: &RoleRow) -> Result<RoleRow>;

    /// Grant `permission_id` to `role_id`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn grant_permission(&self, role_id: Uuid, permission_id: &str) -> Result<()>;

    /// Every permission granted to `role_id` or to any of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn effective_permissions(&self, role_id: Uuid) -> Result<Vec<PermissionRow>>;

    /// Assign `role_id` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<()>;

    /// Remove `role_id` from `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn revoke_from_user(&self, user_id: Uuid, role_id: Uuid) -> Result<()>;

    /// Every role assigned to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<RoleRow>>;
}

/// `sqlx`-backed [`RoleRepository`].
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<RoleRow> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_name(&self, name: &str) -> Result<RoleRow> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_descendants(&self, path: &str) -> Result<Vec<RoleRow>> {
        sqlx::query_as::<_, RoleRow>(
            "SELECT * FROM roles WHERE path <@ $1::ltree AND path != $1::ltree ORDER BY nlevel(path)",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn create(&self, role: &RoleRow) -> Result<RoleRow> {
        sqlx::query_as::<_, RoleRow>(
            r"
            INSERT INTO roles (id, name, description, path, parent_id, version)
            VALUES ($1, $2, $3, $4::ltree, $5, 0)
            RETURNING *
            ",
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(&role.path)
        .bind(role.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn effective_permissions(&self, role_id: Uuid) -> Result<Vec<PermissionRow>> {
        sqlx::query_as::<_, PermissionRow>(
            r"
            SELECT DISTINCT p.id, p.name, p.description
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN roles r ON r.id = rp.role_id
            WHERE r.path @> (SELECT path FROM roles WHERE id = $1)
            ",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn revoke_from_user(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<RoleRow>> {
        sqlx::query_as::<_, RoleRow>(
            r"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }
}
