//! Permission computation from organization and workspace roles.
//!
//! Permissions are flat "resource:action" strings carried inside the
//! session token and consumed by downstream resource handlers. The
//! set is fully derived from the caller's two membership roles; it is
//! recomputed on every token issuance, never stored.

use std::collections::BTreeSet;

use crate::models::{OrgRole, WorkspaceRole};

/// Compute the effective permission set for a member holding
/// `org_role` in the organization and `ws_role` in the workspace.
///
/// Returned in deterministic sorted order so equal role pairs always
/// produce byte-identical token payloads.
pub fn effective_permissions(org_role: OrgRole, ws_role: WorkspaceRole) -> Vec<String> {
    let mut perms: BTreeSet<&'static str> = BTreeSet::new();

    // Every member can read the assistants and knowledge bases of the
    // workspace their session is scoped to.
    perms.extend(["assistant:read", "knowledge_base:read", "analytics:read"]);

    if ws_role.rank() >= WorkspaceRole::Editor.rank() {
        perms.extend(["assistant:write", "knowledge_base:write"]);
    }

    if ws_role.rank() >= WorkspaceRole::Admin.rank() {
        perms.extend(["assistant:deploy", "workspace:manage"]);
    }

    if org_role.rank() >= OrgRole::Admin.rank() {
        perms.extend(["workspace:create", "org:members"]);
    }

    if org_role == OrgRole::Owner {
        perms.extend(["org:manage", "org:billing", "org:delete"]);
    }

    perms.into_iter().map(String::from).collect()
}
