use crate::db::{Database, StoreError};
use crate::models::lead::{Lead, LeadStatus};
use bincode::{Decode, Encode};
use tracing::info;

const LEADS_TREE: &str = "leads";

#[derive(Debug, Encode, Decode)]
struct StoredLead {
    id: String,
    name: String,
    phone: String,
    address: Option<String>,
    panels: String,
    inverter: String,
    status: LeadStatus,
    capacity: f64,
    structure: String,
    invoice_no: String,
    created_by: String,
    assigned_to: Option<String>,
    created_at: i64,
}

impl From<Lead> for StoredLead {
    fn from(lead: Lead) -> Self {
        StoredLead {
            id: lead.id,
            name: lead.name,
            phone: lead.phone,
            address: lead.address,
            panels: lead.panels,
            inverter: lead.inverter,
            status: lead.status,
            capacity: lead.capacity,
            structure: lead.structure,
            invoice_no: lead.invoice_no,
            created_by: lead.created_by,
            assigned_to: lead.assigned_to,
            created_at: lead.created_at.timestamp(),
        }
    }
}

impl From<StoredLead> for Lead {
    fn from(stored: StoredLead) -> Self {
        Lead {
            id: stored.id,
            name: stored.name,
            phone: stored.phone,
            address: stored.address,
            panels: stored.panels,
            inverter: stored.inverter,
            status: stored.status,
            capacity: stored.capacity,
            structure: stored.structure,
            invoice_no: stored.invoice_no,
            created_by: stored.created_by,
            assigned_to: stored.assigned_to,
            created_at: chrono::DateTime::from_timestamp(stored.created_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

#[derive(Clone)]
pub struct LeadRepository {
    db: Database,
}

impl LeadRepository {
    pub fn new(db: Database) -> Self {
        LeadRepository { db }
    }

    fn encode(lead: &Lead) -> Result<Vec<u8>, StoreError> {
        let stored = StoredLead::from(lead.clone());
        Ok(bincode::encode_to_vec(&stored, bincode::config::standard())?)
    }

    fn decode(data: &[u8]) -> Result<Lead, StoreError> {
        let (stored, _): (StoredLead, usize) =
            bincode::decode_from_slice(data, bincode::config::standard())?;
        Ok(Lead::from(stored))
    }

    pub async fn create(&self, lead: Lead) -> Result<Lead, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;
        tree.insert(lead.id.as_bytes(), Self::encode(&lead)?.as_slice())?;

        info!(lead_id = %lead.id, created_by = %lead.created_by, "Lead created in database");

        Ok(lead)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        match tree.get(id.as_bytes())? {
            Some(data) => Ok(Some(Self::decode(&data)?)),
            None => Ok(None),
        }
    }

    /// All leads, newest first.
    pub async fn list_all(&self) -> Result<Vec<Lead>, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        let mut leads = Vec::new();
        for item in tree.iter() {
            let (_, data) = item?;
            leads.push(Self::decode(&data)?);
        }
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    /// Replaces the stored lead; returns None when the id is unknown.
    pub async fn update(&self, lead: Lead) -> Result<Option<Lead>, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        if !tree.contains_key(lead.id.as_bytes())? {
            return Ok(None);
        }

        tree.insert(lead.id.as_bytes(), Self::encode(&lead)?.as_slice())?;

        info!(lead_id = %lead.id, "Lead updated in database");

        Ok(Some(lead))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        let removed = tree.remove(id.as_bytes())?.is_some();
        if removed {
            info!(lead_id = %id, "Lead deleted from database");
        }
        Ok(removed)
    }

    /// Bulk-archives the given leads; ids that match no lead are skipped.
    /// Returns how many leads were actually archived.
    pub async fn archive_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        let mut archived = 0;
        for id in ids {
            if let Some(data) = tree.get(id.as_bytes())? {
                let mut lead = Self::decode(&data)?;
                lead.status = LeadStatus::Archived;
                tree.insert(id.as_bytes(), Self::encode(&lead)?.as_slice())?;
                archived += 1;
            }
        }

        info!(requested = ids.len(), archived, "Leads archived in database");

        Ok(archived)
    }

    pub async fn find_by_status(&self, status: LeadStatus) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.list_all().await?;
        leads.retain(|lead| lead.status == status);
        Ok(leads)
    }

    pub async fn find_by_creator_and_status(
        &self,
        user_id: &str,
        status: LeadStatus,
    ) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.list_all().await?;
        leads.retain(|lead| lead.status == status && lead.created_by == user_id);
        Ok(leads)
    }

    /// Points the lead's `assigned_to` at the given user; returns None when
    /// the lead is unknown.
    pub async fn assign(&self, lead_id: &str, user_id: &str) -> Result<Option<Lead>, StoreError> {
        let tree = self.db.db.open_tree(LEADS_TREE)?;

        match tree.get(lead_id.as_bytes())? {
            Some(data) => {
                let mut lead = Self::decode(&data)?;
                lead.assigned_to = Some(user_id.to_string());
                tree.insert(lead_id.as_bytes(), Self::encode(&lead)?.as_slice())?;

                info!(lead_id = %lead_id, assigned_to = %user_id, "Lead assigned");

                Ok(Some(lead))
            }
            None => Ok(None),
        }
    }
}
