//! Postgres-backed auth store.
//!
//! Runtime queries (no compile-time checked macros) against the schema in
//! `migrations/0001_auth_schema.sql`, which [`PostgresAuthStore::ensure_schema`]
//! applies idempotently.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (check constraint violation) | `23514` | `Invalid` |
//! | Database (other) | Any other | `Invalid` |
//! | RowNotFound | N/A | `NotFound` |
//! | PoolClosed, PoolTimedOut, Io, Tls, other | N/A | `Unavailable` |
//!
//! ## Atomicity
//!
//! `set_active_token` is one `UPDATE`. `replace_grants_for_role` and
//! `update_resource` run in a transaction; an early return through `?` drops
//! the transaction, which rolls it back.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use menugate_auth::{
    CrudFlags, Grant, GrantSpec, GrantStore, Identity, IdentityStatus, IdentityStore, NewIdentity, ResourceGrant,
    ResourceNode, ResourceStore, Role, RoleStore, StoreError, normalize_grant_set, would_create_cycle,
};
use menugate_core::{GrantId, IdentityId, ResourceId, RoleId};

const SCHEMA: &str = include_str!("../../migrations/0001_auth_schema.sql");

const MENU_COLUMNS: &str = r#"m.id, m.name, m.path, m.icon, m.parent_id, m."order", m.hidden"#;

/// Postgres implementation of every storage port.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PostgresAuthStore {
    pool: Arc<PgPool>,
}

impl PostgresAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for PostgresAuthStore {
    #[instrument(skip(self, identity), fields(identity_id = tracing::field::Empty), err)]
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let identity = identity.into_identity()?;

        sqlx::query(
            r#"
            INSERT INTO blog_users (id, username, password_hash, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(identity.id.as_uuid())
        .bind(&identity.username)
        .bind(&identity.credential_hash)
        .bind(identity.is_active())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_identity", e))?;

        Span::current().record("identity_id", tracing::field::display(identity.id));
        Ok(identity)
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, is_active, token
            FROM blog_users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_identity", e))?;

        row.as_ref().map(identity_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_identity_by_credential(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, is_active, token
            FROM blog_users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_identity_by_credential", e))?;

        row.as_ref().map(identity_from_row).transpose()
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn set_identity_status(&self, id: IdentityId, status: IdentityStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE blog_users SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status == IdentityStatus::Active)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_identity_status", e))?;

        require_affected(result.rows_affected(), || format!("identity {id}"))
    }

    #[instrument(skip(self, token), fields(identity_id = %id, clearing = token.is_none()), err)]
    async fn set_active_token(&self, id: IdentityId, token: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE blog_users SET token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(token)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_active_token", e))?;

        require_affected(result.rows_affected(), || format!("identity {id}"))
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn get_active_token(&self, id: IdentityId) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT token FROM blog_users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_active_token", e))?
            .ok_or_else(|| StoreError::NotFound(format!("identity {id}")))?;

        row.try_get::<Option<String>, _>("token")
            .map_err(|e| map_sqlx_error("decode_token", e))
    }
}

#[async_trait]
impl RoleStore for PostgresAuthStore {
    #[instrument(skip(self, role), fields(role_id = %role.id), err)]
    async fn create_role(&self, role: Role) -> Result<Role, StoreError> {
        sqlx::query("INSERT INTO blog_roles (id, name, description) VALUES ($1, $2, $3)")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.description.as_deref())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_role", e))?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query("SELECT id, name, description FROM blog_roles ORDER BY name, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;

        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn delete_role(&self, id: RoleId) -> Result<(), StoreError> {
        // Assignments and grants go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM blog_roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;

        require_affected(result.rows_affected(), || format!("role {id}"))
    }

    #[instrument(skip(self), fields(identity_id = %identity_id, role_id = %role_id), err)]
    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO blog_user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_role", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %identity_id, role_id = %role_id), err)]
    async fn revoke_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM blog_user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(identity_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_role", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn find_roles_for_identity(&self, identity_id: IdentityId) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name, r.description
            FROM blog_roles r
            JOIN blog_user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name, r.id
            "#,
        )
        .bind(identity_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_roles_for_identity", e))?;

        rows.iter().map(role_from_row).collect()
    }
}

#[async_trait]
impl ResourceStore for PostgresAuthStore {
    #[instrument(skip(self, node), fields(resource_id = %node.id), err)]
    async fn create_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        node.validate()?;

        sqlx::query(
            r#"
            INSERT INTO blog_menus (id, name, path, icon, parent_id, "order", hidden)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(node.id.as_uuid())
        .bind(&node.name)
        .bind(&node.path)
        .bind(node.icon.as_deref())
        .bind(node.parent_id.map(uuid::Uuid::from))
        .bind(node.order)
        .bind(node.hidden)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_resource", e))?;
        Ok(node)
    }

    #[instrument(skip(self, node), fields(resource_id = %node.id), err)]
    async fn update_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        node.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the hierarchy so a concurrent re-parent cannot slip a cycle past the check.
        let rows = sqlx::query(&format!("SELECT {MENU_COLUMNS} FROM blog_menus m FOR UPDATE"))
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_menus", e))?;
        let nodes = rows.iter().map(menu_from_row).collect::<Result<Vec<_>, _>>()?;

        if !nodes.iter().any(|n| n.id == node.id) {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(format!("resource {}", node.id)));
        }
        if let Some(parent) = node.parent_id {
            if would_create_cycle(&nodes, node.id, parent) {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Invalid(format!(
                    "moving resource {} under {parent} would create a cycle",
                    node.id
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE blog_menus
            SET name = $2, path = $3, icon = $4, parent_id = $5, "order" = $6, hidden = $7
            WHERE id = $1
            "#,
        )
        .bind(node.id.as_uuid())
        .bind(&node.name)
        .bind(&node.path)
        .bind(node.icon.as_deref())
        .bind(node.parent_id.map(uuid::Uuid::from))
        .bind(node.order)
        .bind(node.hidden)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_resource", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(node)
    }

    #[instrument(skip(self), fields(resource_id = %id), err)]
    async fn delete_resource(&self, id: ResourceId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM blog_menus WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_resource", e))?;

        require_affected(result.rows_affected(), || format!("resource {id}"))
    }

    #[instrument(skip(self), fields(node_count = tracing::field::Empty), err)]
    async fn find_all_resource_nodes(&self) -> Result<Vec<ResourceNode>, StoreError> {
        let rows = sqlx::query(&format!(r#"SELECT {MENU_COLUMNS} FROM blog_menus m ORDER BY m."order", m.id"#))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all_resource_nodes", e))?;

        Span::current().record("node_count", rows.len());
        rows.iter().map(menu_from_row).collect()
    }
}

#[async_trait]
impl GrantStore for PostgresAuthStore {
    #[instrument(skip(self, flags), fields(role_id = %role_id, resource_id = %resource_id), err)]
    async fn create_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let grant = Grant::new(role_id, resource_id, flags);
        insert_grant(&*self.pool, &grant)
            .await
            .map_err(|e| map_sqlx_error("create_grant", e))?;
        Ok(grant)
    }

    #[instrument(skip(self), fields(role_id = %role_id, resource_id = %resource_id), err)]
    async fn get_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<Grant>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, role_id, menu_id, can_create, can_read, can_update, can_delete
            FROM blog_role_menus
            WHERE role_id = $1 AND menu_id = $2
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(resource_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_grant", e))?;

        row.as_ref().map(grant_from_row).transpose()
    }

    #[instrument(skip(self, flags), fields(role_id = %role_id, resource_id = %resource_id), err)]
    async fn update_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE blog_role_menus
            SET can_create = $3, can_read = $4, can_update = $5, can_delete = $6
            WHERE role_id = $1 AND menu_id = $2
            RETURNING id, role_id, menu_id, can_create, can_read, can_update, can_delete
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(resource_id.as_uuid())
        .bind(flags.can_create)
        .bind(flags.can_read)
        .bind(flags.can_update)
        .bind(flags.can_delete)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_grant", e))?
        .ok_or_else(|| StoreError::NotFound(format!("grant for role {role_id} on resource {resource_id}")))?;

        grant_from_row(&row)
    }

    #[instrument(skip(self, flags), fields(role_id = %role_id, resource_id = %resource_id), err)]
    async fn upsert_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO blog_role_menus (id, role_id, menu_id, can_create, can_read, can_update, can_delete)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (role_id, menu_id)
            DO UPDATE SET
                can_create = EXCLUDED.can_create,
                can_read = EXCLUDED.can_read,
                can_update = EXCLUDED.can_update,
                can_delete = EXCLUDED.can_delete
            RETURNING id, role_id, menu_id, can_create, can_read, can_update, can_delete
            "#,
        )
        .bind(GrantId::new().as_uuid())
        .bind(role_id.as_uuid())
        .bind(resource_id.as_uuid())
        .bind(flags.can_create)
        .bind(flags.can_read)
        .bind(flags.can_update)
        .bind(flags.can_delete)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_grant", e))?;

        grant_from_row(&row)
    }

    #[instrument(skip(self), fields(role_id = %role_id, resource_id = %resource_id), err)]
    async fn delete_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM blog_role_menus WHERE role_id = $1 AND menu_id = $2")
            .bind(role_id.as_uuid())
            .bind(resource_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_grant", e))?;

        require_affected(result.rows_affected(), || {
            format!("grant for role {role_id} on resource {resource_id}")
        })
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn list_grants_for_role(&self, role_id: RoleId) -> Result<Vec<Grant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, role_id, menu_id, can_create, can_read, can_update, can_delete
            FROM blog_role_menus
            WHERE role_id = $1
            ORDER BY menu_id
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_grants_for_role", e))?;

        rows.iter().map(grant_from_row).collect()
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn find_grants_for_role(&self, role_id: RoleId) -> Result<Vec<ResourceGrant>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MENU_COLUMNS}, rm.can_create, rm.can_read, rm.can_update, rm.can_delete
            FROM blog_role_menus rm
            JOIN blog_menus m ON m.id = rm.menu_id
            WHERE rm.role_id = $1
            ORDER BY m."order", m.id
            "#
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_grants_for_role", e))?;

        rows.iter()
            .map(|row| {
                Ok(ResourceGrant {
                    role_id,
                    resource: menu_from_row(row)?,
                    flags: flags_from_row(row)?,
                })
            })
            .collect()
    }

    #[instrument(
        skip(self, grants),
        fields(
            role_id = %role_id,
            grant_count = grants.len(),
            installed = tracing::field::Empty
        ),
        err
    )]
    async fn replace_grants_for_role(
        &self,
        role_id: RoleId,
        grants: Vec<GrantSpec>,
    ) -> Result<Vec<Grant>, StoreError> {
        let specs = normalize_grant_set(grants)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Row lock on the role serialises concurrent replacements of the same set.
        let role = sqlx::query("SELECT id FROM blog_roles WHERE id = $1 FOR UPDATE")
            .bind(role_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_role", e))?;
        if role.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }

        sqlx::query("DELETE FROM blog_role_menus WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_grants", e))?;

        let mut installed = Vec::with_capacity(specs.len());
        for spec in specs {
            let grant = Grant::new(role_id, spec.resource_id, spec.flags);
            insert_grant(&mut *tx, &grant)
                .await
                .map_err(|e| map_sqlx_error("insert_grant", e))?;
            installed.push(grant);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("installed", installed.len());
        Ok(installed)
    }
}

async fn insert_grant<'e, E>(executor: E, grant: &Grant) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO blog_role_menus (id, role_id, menu_id, can_create, can_read, can_update, can_delete)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(grant.id.as_uuid())
    .bind(grant.role_id.as_uuid())
    .bind(grant.resource_id.as_uuid())
    .bind(grant.flags.can_create)
    .bind(grant.flags.can_read)
    .bind(grant.flags.can_update)
    .bind(grant.flags.can_delete)
    .execute(executor)
    .await?;
    Ok(())
}

fn require_affected(rows: u64, what: impl FnOnce() -> String) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound(what()))
    } else {
        Ok(())
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity, StoreError> {
    let decode = |e| map_sqlx_error("decode_identity", e);
    let is_active: bool = row.try_get("is_active").map_err(decode)?;
    Ok(Identity {
        id: IdentityId::from_uuid(row.try_get("id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        credential_hash: row.try_get("password_hash").map_err(decode)?,
        status: if is_active {
            IdentityStatus::Active
        } else {
            IdentityStatus::Disabled
        },
        active_token: row.try_get("token").map_err(decode)?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    let decode = |e| map_sqlx_error("decode_role", e);
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
    })
}

fn menu_from_row(row: &PgRow) -> Result<ResourceNode, StoreError> {
    let decode = |e| map_sqlx_error("decode_menu", e);
    let parent: Option<uuid::Uuid> = row.try_get("parent_id").map_err(decode)?;
    Ok(ResourceNode {
        id: ResourceId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        path: row.try_get("path").map_err(decode)?,
        icon: row.try_get("icon").map_err(decode)?,
        parent_id: parent.map(ResourceId::from_uuid),
        order: row.try_get("order").map_err(decode)?,
        hidden: row.try_get("hidden").map_err(decode)?,
    })
}

fn flags_from_row(row: &PgRow) -> Result<CrudFlags, StoreError> {
    let decode = |e| map_sqlx_error("decode_flags", e);
    Ok(CrudFlags::new(
        row.try_get("can_create").map_err(decode)?,
        row.try_get("can_read").map_err(decode)?,
        row.try_get("can_update").map_err(decode)?,
        row.try_get("can_delete").map_err(decode)?,
    ))
}

fn grant_from_row(row: &PgRow) -> Result<Grant, StoreError> {
    let decode = |e| map_sqlx_error("decode_grant", e);
    Ok(Grant {
        id: GrantId::from_uuid(row.try_get("id").map_err(decode)?),
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(decode)?),
        resource_id: ResourceId::from_uuid(row.try_get("menu_id").map_err(decode)?),
        flags: flags_from_row(row)?,
    })
}

/// Map SQLx errors to storage-port errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                Some("23514") => StoreError::Invalid(msg),
                _ => StoreError::Invalid(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            StoreError::Invalid(format!("decode error in {operation}: {err}"))
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {operation}")),
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}
