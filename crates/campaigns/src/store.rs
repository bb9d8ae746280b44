//! The campaign collection store.
//!
//! The whole collection lives in memory and is written in full through the
//! injected [`BlobStore`] after every successful mutation.  Writes are
//! best-effort: a failed write is logged and counted, and the in-memory
//! collection stays authoritative for the rest of the session.
//!
//! Operations given an unknown campaign id do nothing and report it through
//! their return value.

use std::collections::HashSet;

use chrono::Utc;
use flow::Flow;
use serde_json::Value;
use storage::{decode_versioned, encode_versioned, BlobStore, StorageError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Campaign, CampaignDocument, CampaignQuery, StoredDocument};
use crate::{CampaignError, StoreConfig};

/// Schema version written by this store.
pub const DOCUMENT_VERSION: u32 = 1;

pub struct CampaignStore<B> {
    backend: B,
    config: StoreConfig,
    campaigns: Vec<Campaign>,
    persist_failures: usize,
}

impl<B: BlobStore> CampaignStore<B> {
    /// Load with the default configuration.
    pub fn open(backend: B) -> Self {
        Self::load(backend, StoreConfig::default())
    }

    /// Read the collection from `backend`.
    ///
    /// Never fails: a missing or unreadable document loads as an empty
    /// collection, and a campaign record that cannot be decoded is dropped
    /// while the others load.  Whenever something is dropped, the stored
    /// bytes are first copied to [`StoreConfig::backup_key`] so the next
    /// write cannot destroy them.  Every flow is repaired so that its edges
    /// only reference nodes it contains.
    pub fn load(backend: B, config: StoreConfig) -> Self {
        let campaigns = match backend.read(&config.storage_key) {
            Ok(None) => {
                debug!(key = %config.storage_key, "no stored campaigns");
                Vec::new()
            }
            Ok(Some(bytes)) => match decode_collection(&bytes) {
                Ok((campaigns, 0)) => campaigns,
                Ok((campaigns, dropped)) => {
                    warn!(dropped, kept = campaigns.len(), "some stored campaigns were unreadable");
                    keep_backup(&backend, &config, &bytes);
                    campaigns
                }
                Err(e) => {
                    warn!(key = %config.storage_key, "stored campaigns unreadable, starting empty: {e}");
                    keep_backup(&backend, &config, &bytes);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(key = %config.storage_key, "cannot read stored campaigns, starting empty: {e}");
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(campaigns.len());
        let campaigns: Vec<Campaign> = campaigns
            .into_iter()
            .filter(|c| {
                let first = seen.insert(c.id);
                if !first {
                    warn!(campaign_id = %c.id, "dropping duplicate campaign");
                }
                first
            })
            .map(|mut c| {
                c.flow.repair();
                c
            })
            .collect();

        info!(count = campaigns.len(), "campaigns loaded");

        Self {
            backend,
            config,
            campaigns,
            persist_failures: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Read model
    // -----------------------------------------------------------------------

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    /// Like [`get`](Self::get), for callers that treat a missing id as an error.
    pub fn require(&self, id: Uuid) -> Result<&Campaign, CampaignError> {
        self.get(id).ok_or(CampaignError::NotFound(id))
    }

    pub fn query(&self, query: &CampaignQuery) -> Vec<&Campaign> {
        query.apply(&self.campaigns)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of writes that failed since the store was loaded.
    pub fn persist_failures(&self) -> usize {
        self.persist_failures
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.campaigns.iter().position(|c| c.id == id)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a new inactive campaign with an empty flow.
    pub fn create(&mut self) -> Campaign {
        let campaign = Campaign::new(self.config.default_name(self.campaigns.len() + 1));
        info!(campaign_id = %campaign.id, name = %campaign.name, "campaign created");
        self.campaigns.push(campaign.clone());
        self.persist();
        campaign
    }

    /// Replace the stored campaign with the same id, stamping `updated_at`.
    ///
    /// Returns `false` (and changes nothing) if no campaign has that id.
    pub fn update(&mut self, mut campaign: Campaign) -> bool {
        let Some(index) = self.position(campaign.id) else {
            debug!(campaign_id = %campaign.id, "update of unknown campaign ignored");
            return false;
        };
        campaign.flow.repair();
        campaign.updated_at = Utc::now();
        self.campaigns[index] = campaign;
        self.persist();
        true
    }

    pub fn rename(&mut self, id: Uuid, name: impl Into<String>) -> bool {
        let Some(mut campaign) = self.get(id).cloned() else {
            return false;
        };
        campaign.name = name.into();
        self.update(campaign)
    }

    pub fn set_description(&mut self, id: Uuid, description: Option<String>) -> bool {
        let Some(mut campaign) = self.get(id).cloned() else {
            return false;
        };
        campaign.description = description;
        self.update(campaign)
    }

    pub fn set_active(&mut self, id: Uuid, active: bool) -> bool {
        let Some(mut campaign) = self.get(id).cloned() else {
            return false;
        };
        campaign.active = active;
        self.update(campaign)
    }

    /// Delete by id.  Returns `false` if no campaign has that id.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let Some(index) = self.position(id) else {
            debug!(campaign_id = %id, "remove of unknown campaign ignored");
            return false;
        };
        let removed = self.campaigns.remove(index);
        info!(campaign_id = %id, name = %removed.name, "campaign removed");
        self.persist();
        true
    }

    /// Copy a campaign under a new id.
    ///
    /// The copy is inactive, carries fresh timestamps and a suffixed name,
    /// and its flow is structurally equal to the original's, node and edge
    /// ids included.
    pub fn clone_campaign(&mut self, id: Uuid) -> Option<Campaign> {
        let original = self.get(id)?;
        let now = Utc::now();
        let copy = Campaign {
            id: Uuid::new_v4(),
            name: self.config.copy_name(&original.name),
            description: original.description.clone(),
            active: false,
            flow: original.flow.clone(),
            created_at: now,
            updated_at: now,
        };
        info!(source_id = %id, campaign_id = %copy.id, "campaign cloned");
        self.campaigns.push(copy.clone());
        self.persist();
        Some(copy)
    }

    /// Replace only the flow of a campaign, stamping `updated_at`.
    pub fn update_flow(&mut self, id: Uuid, mut flow: Flow) -> bool {
        let Some(index) = self.position(id) else {
            debug!(campaign_id = %id, "flow update of unknown campaign ignored");
            return false;
        };
        flow.repair();
        let campaign = &mut self.campaigns[index];
        campaign.flow = flow;
        campaign.updated_at = Utc::now();
        debug!(
            campaign_id = %id,
            nodes = campaign.flow.nodes.len(),
            edges = campaign.flow.edges.len(),
            "flow updated"
        );
        self.persist();
        true
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the full collection.  Returns `false` if the write failed.
    #[instrument(skip(self), fields(key = %self.config.storage_key, campaigns = self.campaigns.len()))]
    fn persist(&mut self) -> bool {
        let document = CampaignDocument {
            campaigns: self.campaigns.clone(),
        };
        let result = encode_versioned(DOCUMENT_VERSION, &document)
            .and_then(|bytes| self.backend.write(&self.config.storage_key, &bytes));

        match result {
            Ok(()) => {
                debug!("campaigns persisted");
                true
            }
            Err(e) => {
                self.persist_failures += 1;
                warn!(failures = self.persist_failures, "failed to persist campaigns: {e}");
                false
            }
        }
    }
}

/// Decode a stored collection record by record.
///
/// Returns the campaigns that decoded and how many records were dropped.
fn decode_collection(bytes: &[u8]) -> Result<(Vec<Campaign>, usize), StorageError> {
    let (version, document) =
        decode_versioned::<StoredDocument, Vec<Value>>(bytes, DOCUMENT_VERSION)?;
    if version < DOCUMENT_VERSION {
        info!(version, "read legacy campaign document");
    }

    let mut dropped = 0;
    let campaigns = document
        .campaigns
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<Campaign>(record) {
            Ok(campaign) => Some(campaign),
            Err(e) => {
                warn!(index, "dropping unreadable campaign: {e}");
                dropped += 1;
                None
            }
        })
        .collect();
    Ok((campaigns, dropped))
}

fn keep_backup<B: BlobStore>(backend: &B, config: &StoreConfig, bytes: &[u8]) {
    let backup = config.backup_key();
    match backend.write(&backup, bytes) {
        Ok(()) => warn!(%backup, "copied stored campaigns aside before dropping any"),
        Err(e) => warn!(%backup, "could not copy stored campaigns aside: {e}"),
    }
}
