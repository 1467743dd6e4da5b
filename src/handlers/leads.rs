use crate::db::lead_repository::LeadRepository;
use crate::db::user_repository::UserRepository;
use crate::errors::ApiError;
use crate::models::lead::{Lead, LeadStatus};
use crate::models::user::{Principal, Role};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeadRequest {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub panels: String,
    pub inverter: String,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    pub capacity: f64,
    pub structure: String,
    pub invoice_no: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeadRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub panels: Option<String>,
    pub inverter: Option<String>,
    pub status: Option<LeadStatus>,
    pub capacity: Option<f64>,
    pub structure: Option<String>,
    pub invoice_no: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ArchiveLeadsRequest {
    pub ids: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignLeadRequest {
    pub lead_id: String,
    pub user_id: String,
}

/// A lead together with the projection of its creator.
#[derive(Serialize, ToSchema)]
pub struct LeadWithCreator {
    #[serde(flatten)]
    pub lead: Lead,
    pub creator: Option<Principal>,
}

#[derive(Serialize, ToSchema)]
pub struct LeadResponse {
    pub success: bool,
    pub message: String,
    pub data: LeadWithCreator,
}

#[derive(Serialize, ToSchema)]
pub struct LeadListResponse {
    pub success: bool,
    pub data: Vec<LeadWithCreator>,
}

#[derive(Serialize, ToSchema)]
pub struct ArchiveLeadsResponse {
    pub success: bool,
    pub message: String,
    pub archived: usize,
}

#[derive(Serialize, ToSchema)]
pub struct StatusLeadsResponse {
    pub count: usize,
    pub leads: Vec<LeadWithCreator>,
}

fn validate_lead_fields(
    name: &str,
    phone: &str,
    panels: &str,
    inverter: &str,
    capacity: f64,
    structure: &str,
    invoice_no: &str,
) -> Result<(), ApiError> {
    if name.trim().len() < 2 {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("Phone must be 10 digits".to_string()));
    }
    if panels.is_empty() {
        return Err(ApiError::Validation("Panels field is required".to_string()));
    }
    if inverter.is_empty() {
        return Err(ApiError::Validation("Inverter field is required".to_string()));
    }
    if capacity <= 0.0 {
        return Err(ApiError::Validation(
            "Capacity must be a positive number".to_string(),
        ));
    }
    if structure.is_empty() {
        return Err(ApiError::Validation(
            "Structure field is required".to_string(),
        ));
    }
    if invoice_no.is_empty() {
        return Err(ApiError::Validation(
            "Invoice number is required".to_string(),
        ));
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<LeadStatus, ApiError> {
    raw.parse::<LeadStatus>().map_err(|_| {
        let allowed: Vec<&str> = LeadStatus::ALL.iter().map(|s| s.as_str()).collect();
        ApiError::Validation(format!(
            "Invalid status '{}'. Allowed: {}",
            raw.to_lowercase(),
            allowed.join(", ")
        ))
    })
}

async fn with_creator(
    users: &UserRepository,
    lead: Lead,
) -> Result<LeadWithCreator, ApiError> {
    let creator = users.get_by_id(&lead.created_by).await?.map(Principal::from);
    Ok(LeadWithCreator { lead, creator })
}

async fn with_creators(
    users: &UserRepository,
    leads: Vec<Lead>,
) -> Result<Vec<LeadWithCreator>, ApiError> {
    let mut out = Vec::with_capacity(leads.len());
    for lead in leads {
        out.push(with_creator(users, lead).await?);
    }
    Ok(out)
}

/// Create a new lead owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 201, description = "Lead created successfully", body = LeadResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn create_lead(
    leads: web::Data<LeadRepository>,
    principal: web::ReqData<Principal>,
    payload: web::Json<CreateLeadRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_lead_fields(
        &payload.name,
        &payload.phone,
        &payload.panels,
        &payload.inverter,
        payload.capacity,
        &payload.structure,
        &payload.invoice_no,
    )?;

    let lead = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name.clone(),
        phone: payload.phone.clone(),
        address: payload.address.clone(),
        panels: payload.panels.clone(),
        inverter: payload.inverter.clone(),
        status: payload.status.unwrap_or_default(),
        capacity: payload.capacity,
        structure: payload.structure.clone(),
        invoice_no: payload.invoice_no.clone(),
        created_by: principal.id.clone(),
        assigned_to: None,
        created_at: chrono::Utc::now(),
    };

    let lead = leads.create(lead).await?;

    info!(lead_id = %lead.id, user_id = %principal.id, "Lead created");

    Ok(HttpResponse::Created().json(LeadResponse {
        success: true,
        message: "Lead created successfully".to_string(),
        data: LeadWithCreator {
            lead,
            creator: Some(principal.into_inner()),
        },
    }))
}

/// List all leads, newest first
#[utoipa::path(
    get,
    path = "/api/v1/leads",
    responses(
        (status = 200, description = "Leads retrieved", body = LeadListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn get_leads(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
) -> Result<HttpResponse, ApiError> {
    let all = leads.list_all().await?;
    let data = with_creators(&users, all).await?;

    Ok(HttpResponse::Ok().json(LeadListResponse {
        success: true,
        data,
    }))
}

/// Fetch a single lead
#[utoipa::path(
    get,
    path = "/api/v1/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead retrieved", body = LeadResponse),
        (status = 404, description = "Lead not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn get_lead(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let lead = leads
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    Ok(HttpResponse::Ok().json(LeadResponse {
        success: true,
        message: "Lead retrieved successfully".to_string(),
        data: with_creator(&users, lead).await?,
    }))
}

/// Update a lead; absent fields keep their stored values
#[utoipa::path(
    put,
    path = "/api/v1/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    request_body = UpdateLeadRequest,
    responses(
        (status = 200, description = "Lead updated successfully", body = LeadResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Lead not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn update_lead(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
    path: web::Path<String>,
    payload: web::Json<UpdateLeadRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut lead = leads
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    if let Some(ref name) = payload.name {
        lead.name = name.clone();
    }
    if let Some(ref phone) = payload.phone {
        lead.phone = phone.clone();
    }
    if payload.address.is_some() {
        lead.address = payload.address.clone();
    }
    if let Some(ref panels) = payload.panels {
        lead.panels = panels.clone();
    }
    if let Some(ref inverter) = payload.inverter {
        lead.inverter = inverter.clone();
    }
    if let Some(status) = payload.status {
        lead.status = status;
    }
    if let Some(capacity) = payload.capacity {
        lead.capacity = capacity;
    }
    if let Some(ref structure) = payload.structure {
        lead.structure = structure.clone();
    }
    if let Some(ref invoice_no) = payload.invoice_no {
        lead.invoice_no = invoice_no.clone();
    }

    validate_lead_fields(
        &lead.name,
        &lead.phone,
        &lead.panels,
        &lead.inverter,
        lead.capacity,
        &lead.structure,
        &lead.invoice_no,
    )?;

    let lead = leads
        .update(lead)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    Ok(HttpResponse::Ok().json(LeadResponse {
        success: true,
        message: "Lead updated successfully".to_string(),
        data: with_creator(&users, lead).await?,
    }))
}

/// Delete a lead
#[utoipa::path(
    delete,
    path = "/api/v1/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead deleted successfully"),
        (status = 404, description = "Lead not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn delete_lead(
    leads: web::Data<LeadRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !leads.delete(&id).await? {
        return Err(ApiError::NotFound("Lead not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Lead deleted successfully"
    })))
}

/// Bulk-archive leads by id
#[utoipa::path(
    post,
    path = "/api/v1/leads/archive",
    request_body = ArchiveLeadsRequest,
    responses(
        (status = 200, description = "Leads archived", body = ArchiveLeadsResponse),
        (status = 400, description = "Empty id list"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn archive_leads(
    leads: web::Data<LeadRepository>,
    payload: web::Json<ArchiveLeadsRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.ids.is_empty() {
        return Err(ApiError::Validation(
            "Please provide an array of lead IDs to archive".to_string(),
        ));
    }

    let archived = leads.archive_many(&payload.ids).await?;

    Ok(HttpResponse::Ok().json(ArchiveLeadsResponse {
        success: true,
        message: format!("{} lead(s) archived successfully", archived),
        archived,
    }))
}

/// Leads created by the caller, filtered by status
#[utoipa::path(
    get,
    path = "/api/v1/leads/my/status/{status}",
    params(("status" = String, Path, description = "Lead status")),
    responses(
        (status = 200, description = "Leads retrieved", body = StatusLeadsResponse),
        (status = 400, description = "Invalid status value"),
        (status = 404, description = "No leads with this status"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn my_leads_by_status(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
    principal: web::ReqData<Principal>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let status = parse_status(&path.into_inner())?;

    let found = leads
        .find_by_creator_and_status(&principal.id, status)
        .await?;
    if found.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No {} leads found for this user.",
            status.as_str()
        )));
    }

    let leads = with_creators(&users, found).await?;
    Ok(HttpResponse::Ok().json(StatusLeadsResponse {
        count: leads.len(),
        leads,
    }))
}

/// All leads with the given status; ADMIN only
#[utoipa::path(
    get,
    path = "/api/v1/leads/status/{status}",
    params(("status" = String, Path, description = "Lead status")),
    responses(
        (status = 200, description = "Leads retrieved", body = StatusLeadsResponse),
        (status = 400, description = "Invalid status value"),
        (status = 403, description = "Caller is not an admin"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn leads_by_status(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
    principal: web::ReqData<Principal>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if principal.role != Role::Admin {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let status = parse_status(&path.into_inner())?;
    let found = leads.find_by_status(status).await?;

    let leads = with_creators(&users, found).await?;
    Ok(HttpResponse::Ok().json(StatusLeadsResponse {
        count: leads.len(),
        leads,
    }))
}

/// Assign a lead to a user
#[utoipa::path(
    post,
    path = "/api/v1/leads/assign",
    request_body = AssignLeadRequest,
    responses(
        (status = 200, description = "Lead assigned", body = LeadResponse),
        (status = 400, description = "Missing or unknown user"),
        (status = 404, description = "Lead not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("cookie_auth" = [])),
    tag = "Leads"
)]
pub async fn assign_lead(
    leads: web::Data<LeadRepository>,
    users: web::Data<UserRepository>,
    payload: web::Json<AssignLeadRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.user_id.is_empty() || payload.lead_id.is_empty() {
        return Err(ApiError::Validation(
            "user_id/lead_id is missing".to_string(),
        ));
    }

    if users.get_by_id(&payload.user_id).await?.is_none() {
        return Err(ApiError::Validation(format!(
            "Invalid user {}",
            payload.user_id
        )));
    }

    let lead = leads
        .assign(&payload.lead_id, &payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    info!(lead_id = %lead.id, assigned_to = %payload.user_id, "Lead assigned");

    Ok(HttpResponse::Ok().json(LeadResponse {
        success: true,
        message: "Lead assigned successfully".to_string(),
        data: with_creator(&users, lead).await?,
    }))
}
