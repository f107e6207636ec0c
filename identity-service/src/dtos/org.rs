use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{OrganizationResponse, WorkspaceResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[schema(example = "Acme Support Bots")]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrganizationResponse {
    pub organization: OrganizationResponse,
    pub workspace: WorkspaceResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[schema(example = "Production Assistants")]
    pub name: String,
}
