//! Campaign records and the collection query.

use chrono::{DateTime, Utc};
use flow::Flow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

/// A named, activatable container for one flow.
///
/// Serialised with camelCase keys (`createdAt`, `updatedAt`) inside the
/// persisted collection document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub flow: Flow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// A fresh, inactive campaign with an empty flow.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            active: false,
            flow: Flow::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of the persisted collection document, as written.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct CampaignDocument {
    pub campaigns: Vec<Campaign>,
}

/// Body of the persisted collection document, as read.
///
/// Campaigns stay undecoded so that one unreadable record does not take
/// the rest of the collection down with it.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StoredDocument {
    #[serde(default)]
    pub campaigns: Vec<Value>,
}

/// Collections written before the document was versioned were a bare array.
impl From<Vec<Value>> for StoredDocument {
    fn from(campaigns: Vec<Value>) -> Self {
        Self { campaigns }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    fn accepts(self, active: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => active,
            StatusFilter::Inactive => !active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// By `created_at`, newest first.
    #[default]
    NewestFirst,
    OldestFirst,
    /// By name, case-insensitive.
    Name,
}

/// Filter and ordering for listing campaigns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignQuery {
    pub status: StatusFilter,
    /// Case-insensitive substring matched against name and description.
    pub search: Option<String>,
    pub order: SortOrder,
}

impl CampaignQuery {
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn matches(&self, campaign: &Campaign) -> bool {
        if !self.status.accepts(campaign.active) {
            return false;
        }
        let needle = match self.search.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => return true,
        };
        campaign.name.to_lowercase().contains(&needle)
            || campaign
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Apply the filter and ordering to `campaigns`.
    pub fn apply<'a>(&self, campaigns: &'a [Campaign]) -> Vec<&'a Campaign> {
        let mut hits: Vec<&Campaign> = campaigns.iter().filter(|c| self.matches(c)).collect();
        match self.order {
            SortOrder::NewestFirst => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => hits.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Name => hits.sort_by_key(|c| c.name.to_lowercase()),
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn campaign(name: &str, active: bool, age_minutes: i64) -> Campaign {
        let mut c = Campaign::new(name);
        c.active = active;
        c.created_at -= Duration::minutes(age_minutes);
        c
    }

    #[test]
    fn campaign_serializes_camel_case() {
        let c = Campaign::new("Welcome");
        let value = serde_json::to_value(&c).unwrap();

        assert_eq!(value["name"], json!("Welcome"));
        assert_eq!(value["active"], json!(false));
        assert_eq!(value["flow"], json!({ "nodes": [], "edges": [] }));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn missing_optional_fields_default_on_read() {
        let c: Campaign = serde_json::from_value(json!({
            "id": "6f1c1a52-2d0e-4d55-9c8e-0b5f7f0a1c11",
            "name": "Old",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }))
        .unwrap();

        assert!(!c.active);
        assert!(c.flow.is_empty());
        assert_eq!(c.description, None);
    }

    #[test]
    fn query_filters_by_status_and_search() {
        let mut promo = campaign("Spring Promo", true, 10);
        promo.description = Some("discount codes".into());
        let list = vec![promo, campaign("Welcome", false, 5), campaign("Winback", true, 1)];

        let active = CampaignQuery::default().with_status(StatusFilter::Active);
        let names: Vec<_> = active.apply(&list).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Winback", "Spring Promo"]);

        let search = CampaignQuery::default().with_search("DISCOUNT");
        assert_eq!(search.apply(&list).len(), 1);

        let blank = CampaignQuery::default().with_search("   ");
        assert_eq!(blank.apply(&list).len(), 3);
    }

    #[test]
    fn query_orders() {
        let list = vec![campaign("b", false, 1), campaign("A", false, 3), campaign("c", false, 2)];

        let oldest = CampaignQuery::default().with_order(SortOrder::OldestFirst);
        let names: Vec<_> = oldest.apply(&list).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "c", "b"]);

        let by_name = CampaignQuery::default().with_order(SortOrder::Name);
        let names: Vec<_> = by_name.apply(&list).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "b", "c"]);
    }
}
