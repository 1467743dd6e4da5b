use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Pipeline status of a lead. New leads default to `contacted`; the bulk
/// archive operation moves leads to `archived`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Encode, Decode, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Archived,
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::Contacted
    }
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Archived => "archived",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    // Path parameters arrive in arbitrary case; normalize before matching.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            "archived" => Ok(LeadStatus::Archived),
            other => Err(format!("Invalid status '{}'", other)),
        }
    }
}

/// A sales lead for a solar installation.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub panels: String,
    pub inverter: String,
    pub status: LeadStatus,
    pub capacity: f64,
    pub structure: String,
    pub invoice_no: String,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}
