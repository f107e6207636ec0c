//! Tenant provisioning and membership queries.
//!
//! Every authenticated user resolves to exactly one active
//! (organization, workspace) pair. Provisioning creates all four
//! records - organization, owner membership, default workspace, admin
//! membership - in a single transaction; a partial unique index on
//! "one personal-default organization per creator" serializes
//! concurrent first logins, and the loser returns the winner's rows.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    Organization, OrganizationMember, OrgRole, User, Workspace, WorkspaceMember, WorkspaceRole,
};
use crate::services::ServiceError;

#[derive(Clone)]
pub struct TenancyService {
    pool: PgPool,
}

impl TenancyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the user's active tenant, provisioning one when none
    /// exists. This is also the recovery path for users who deleted
    /// every organization they owned.
    pub async fn ensure_tenant(
        &self,
        user: &User,
    ) -> Result<(Organization, Workspace), ServiceError> {
        if !user.is_active {
            return Err(ServiceError::UserDeactivated);
        }

        if let Some(org) = self.first_organization(user.user_id).await? {
            let workspace = self.default_workspace_of(&org, user.user_id).await?;
            return Ok((org, workspace));
        }

        match self.provision_personal_tenant(user).await {
            Ok(pair) => Ok(pair),
            Err(ServiceError::Database(sqlx::Error::Database(ref db)))
                if db.is_unique_violation() =>
            {
                // A concurrent first login already provisioned; the
                // transaction rolled back without partial state.
                tracing::debug!(user_id = %user.user_id, "Concurrent tenant provisioning detected");
                let org = self.first_organization(user.user_id).await?.ok_or_else(|| {
                    ServiceError::Internal(anyhow::anyhow!(
                        "provisioning conflicted but no organization found"
                    ))
                })?;
                let workspace = self.default_workspace_of(&org, user.user_id).await?;
                Ok((org, workspace))
            }
            Err(e) => {
                // Rollback already happened; this points at a datastore
                // problem, not a user mistake.
                tracing::error!(user_id = %user.user_id, error = %e, "Tenant provisioning failed");
                Err(e)
            }
        }
    }

    /// Explicit organization creation; the creator becomes owner and
    /// receives a default workspace with admin membership.
    pub async fn create_organization(
        &self,
        user: &User,
        org_name: String,
    ) -> Result<(Organization, Workspace), ServiceError> {
        let org = Organization::new(org_name, user.user_id);
        let workspace = Workspace::new_default(org.org_id, user.user_id);

        let mut tx = self.pool.begin().await?;
        insert_tenant_rows(&mut tx, &org, &workspace, user.user_id).await?;
        tx.commit().await?;

        tracing::info!(org_id = %org.org_id, user_id = %user.user_id, "Organization created");

        Ok((org, workspace))
    }

    /// Explicit workspace creation inside an organization the caller
    /// administers.
    pub async fn create_workspace(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        workspace_name: String,
    ) -> Result<Workspace, ServiceError> {
        self.find_organization(org_id)
            .await?
            .ok_or(ServiceError::OrganizationNotFound)?;

        let role = self
            .org_role(org_id, user_id)
            .await?
            .ok_or(ServiceError::Forbidden)?;
        if !role.can_manage_workspaces() {
            return Err(ServiceError::Forbidden);
        }

        let workspace = Workspace::new(org_id, workspace_name, user_id);
        let member = WorkspaceMember::new(workspace.workspace_id, user_id, WorkspaceRole::Admin);

        let mut tx = self.pool.begin().await?;
        insert_workspace_row(&mut tx, &workspace).await?;
        insert_workspace_member_row(&mut tx, &member).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace.workspace_id,
            org_id = %org_id,
            "Workspace created"
        );

        Ok(workspace)
    }

    /// Delete an organization. Owner only; members and workspaces are
    /// removed by cascade. The user's next authentication provisions
    /// a fresh tenant if this was their last organization.
    pub async fn delete_organization(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.find_organization(org_id)
            .await?
            .ok_or(ServiceError::OrganizationNotFound)?;

        let role = self
            .org_role(org_id, user_id)
            .await?
            .ok_or(ServiceError::Forbidden)?;
        if role != OrgRole::Owner {
            return Err(ServiceError::Forbidden);
        }

        sqlx::query("DELETE FROM organizations WHERE org_id = $1")
            .bind(org_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(org_id = %org_id, user_id = %user_id, "Organization deleted");

        Ok(())
    }

    /// First organization the user belongs to, by creation time.
    pub async fn first_organization(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Organization>, ServiceError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.org_id, o.org_name, o.tier_code, o.trial_ends_utc,
                   o.created_by, o.is_personal_default, o.created_utc
            FROM organizations o
            JOIN organization_members m ON m.org_id = o.org_id
            WHERE m.user_id = $1
            ORDER BY o.created_utc ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    pub async fn find_organization(
        &self,
        org_id: Uuid,
    ) -> Result<Option<Organization>, ServiceError> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT org_id, org_name, tier_code, trial_ends_utc,
                   created_by, is_personal_default, created_utc
            FROM organizations
            WHERE org_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    /// The organization's default workspace, falling back to the
    /// earliest-created one when none carries the flag. An
    /// organization that somehow lost every workspace gets a fresh
    /// default so the invariant holds again.
    pub async fn default_workspace_of(
        &self,
        org: &Organization,
        user_id: Uuid,
    ) -> Result<Workspace, ServiceError> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT workspace_id, org_id, workspace_name, is_default, created_by, created_utc
            FROM workspaces
            WHERE org_id = $1
            ORDER BY is_default DESC, created_utc ASC
            LIMIT 1
            "#,
        )
        .bind(org.org_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(workspace) = workspace {
            return Ok(workspace);
        }

        tracing::warn!(org_id = %org.org_id, "Organization has no workspace; restoring default");

        let workspace = Workspace::new_default(org.org_id, user_id);
        let member = WorkspaceMember::new(workspace.workspace_id, user_id, WorkspaceRole::Admin);

        let mut tx = self.pool.begin().await?;
        insert_workspace_row(&mut tx, &workspace).await?;
        insert_workspace_member_row(&mut tx, &member).await?;
        tx.commit().await?;

        Ok(workspace)
    }

    pub async fn org_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, ServiceError> {
        let role_code: Option<String> = sqlx::query_scalar(
            r#"
            SELECT role_code
            FROM organization_members
            WHERE org_id = $1 AND user_id = $2
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        role_code
            .map(|code| {
                code.parse::<OrgRole>()
                    .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))
            })
            .transpose()
    }

    /// Re-confirm live membership of the (user, organization,
    /// workspace) triple a credential claims. Deactivated users,
    /// revoked memberships, and workspaces moved outside the
    /// organization all fail with `NoLongerMember`.
    pub async fn verify_membership(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<(OrgRole, WorkspaceRole), ServiceError> {
        let org_role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT m.role_code
            FROM organization_members m
            JOIN users u ON u.user_id = m.user_id
            WHERE m.org_id = $1 AND m.user_id = $2 AND u.is_active
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(org_role) = org_role else {
            return Err(ServiceError::NoLongerMember);
        };

        let ws_role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT wm.role_code
            FROM workspace_members wm
            JOIN workspaces w ON w.workspace_id = wm.workspace_id
            WHERE wm.workspace_id = $1 AND wm.user_id = $2 AND w.org_id = $3
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(ws_role) = ws_role else {
            return Err(ServiceError::NoLongerMember);
        };

        let org_role = org_role
            .parse::<OrgRole>()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;
        let ws_role = ws_role
            .parse::<WorkspaceRole>()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        Ok((org_role, ws_role))
    }

    async fn provision_personal_tenant(
        &self,
        user: &User,
    ) -> Result<(Organization, Workspace), ServiceError> {
        let org = Organization::new_personal(user);
        let workspace = Workspace::new_default(org.org_id, user.user_id);

        let mut tx = self.pool.begin().await?;
        insert_tenant_rows(&mut tx, &org, &workspace, user.user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user.user_id,
            org_id = %org.org_id,
            workspace_id = %workspace.workspace_id,
            "Provisioned personal tenant"
        );

        Ok((org, workspace))
    }
}

/// Insert the four provisioning records inside one transaction:
/// organization, owner membership, workspace, admin membership.
async fn insert_tenant_rows(
    tx: &mut Transaction<'_, Postgres>,
    org: &Organization,
    workspace: &Workspace,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO organizations
            (org_id, org_name, tier_code, trial_ends_utc, created_by, is_personal_default, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(org.org_id)
    .bind(&org.org_name)
    .bind(&org.tier_code)
    .bind(org.trial_ends_utc)
    .bind(org.created_by)
    .bind(org.is_personal_default)
    .bind(org.created_utc)
    .execute(&mut **tx)
    .await?;

    let owner = OrganizationMember::new(org.org_id, user_id, OrgRole::Owner);
    sqlx::query(
        r#"
        INSERT INTO organization_members (org_id, user_id, role_code, created_utc)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(owner.org_id)
    .bind(owner.user_id)
    .bind(&owner.role_code)
    .bind(owner.created_utc)
    .execute(&mut **tx)
    .await?;

    insert_workspace_row(tx, workspace).await?;

    let admin = WorkspaceMember::new(workspace.workspace_id, user_id, WorkspaceRole::Admin);
    insert_workspace_member_row(tx, &admin).await?;

    Ok(())
}

async fn insert_workspace_row(
    tx: &mut Transaction<'_, Postgres>,
    workspace: &Workspace,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO workspaces
            (workspace_id, org_id, workspace_name, is_default, created_by, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(workspace.workspace_id)
    .bind(workspace.org_id)
    .bind(&workspace.workspace_name)
    .bind(workspace.is_default)
    .bind(workspace.created_by)
    .bind(workspace.created_utc)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_workspace_member_row(
    tx: &mut Transaction<'_, Postgres>,
    member: &WorkspaceMember,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role_code, created_utc)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(member.workspace_id)
    .bind(member.user_id)
    .bind(&member.role_code)
    .bind(member.created_utc)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
