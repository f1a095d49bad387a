//! PostgreSQL-backed role catalog repository.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use netdock_application::RoleRepository;
use netdock_core::{AppError, AppResult};
use netdock_domain::{Capability, Role, RoleId, Slug, UserId};

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    slug: String,
    capability: Option<String>,
}

/// Folds joined role/capability rows into domain roles.
///
/// Rows must be ordered by role id so each role's capabilities arrive
/// contiguously.
fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();
    let mut current: Option<(RoleRow, BTreeSet<Capability>)> = None;

    for row in rows {
        match current.as_mut() {
            Some((head, capabilities)) if head.id == row.id => {
                if let Some(capability) = row.capability {
                    capabilities.insert(decode_capability(&capability)?);
                }
            }
            _ => {
                if let Some(done) = current.take() {
                    roles.push(build_role(done)?);
                }

                let mut capabilities = BTreeSet::new();
                if let Some(ref capability) = row.capability {
                    capabilities.insert(decode_capability(capability)?);
                }
                current = Some((row, capabilities));
            }
        }
    }

    if let Some(done) = current.take() {
        roles.push(build_role(done)?);
    }

    Ok(roles)
}

fn build_role((row, capabilities): (RoleRow, BTreeSet<Capability>)) -> AppResult<Role> {
    let slug = Slug::new(row.slug.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "failed to decode slug '{}' for role '{}': {error}",
            row.slug, row.name
        ))
    })?;

    Role::new(RoleId::from_uuid(row.id), row.name, Some(slug), capabilities)
}

fn decode_capability(value: &str) -> AppResult<Capability> {
    Capability::new(value)
        .map_err(|error| AppError::Internal(format!("failed to decode capability: {error}")))
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.slug, capabilities.capability
            FROM roles
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            WHERE LOWER(roles.slug) = LOWER($1)
                OR LOWER(roles.name) = LOWER($1)
            ORDER BY roles.id, capabilities.capability
            "#,
        )
        .bind(identifier)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find role by identifier: {error}"))
        })?;

        Ok(aggregate_roles(rows)?.pop())
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.slug, capabilities.capability
            FROM roles
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            WHERE roles.id = $1
            ORDER BY roles.id, capabilities.capability
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role by id: {error}")))?;

        Ok(aggregate_roles(rows)?.pop())
    }

    async fn find_assigned(&self, user_id: UserId, role_id: RoleId) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.slug, capabilities.capability
            FROM roles
            INNER JOIN user_roles
                ON user_roles.role_id = roles.id
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            WHERE user_roles.user_id = $1
                AND roles.id = $2
            ORDER BY roles.id, capabilities.capability
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find assigned role: {error}")))?;

        Ok(aggregate_roles(rows)?.pop())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.slug, capabilities.capability
            FROM roles
            INNER JOIN user_roles
                ON user_roles.role_id = roles.id
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            WHERE user_roles.user_id = $1
            ORDER BY roles.id, capabilities.capability
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        let mut roles = aggregate_roles(rows)?;
        roles.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(roles)
    }

    async fn list_all(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.slug, capabilities.capability
            FROM roles
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            ORDER BY roles.id, capabilities.capability
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        let mut roles = aggregate_roles(rows)?;
        roles.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(roles)
    }
}
