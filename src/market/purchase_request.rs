//! Purchase requests submitted through the public form

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::store::{SelectQuery, SortOrder};

pub const PURCHASE_REQUESTS_TABLE: &str = "purchase_requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseRequestStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl PurchaseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseRequestStatus::Pending => "pending",
            PurchaseRequestStatus::Reviewing => "reviewing",
            PurchaseRequestStatus::Approved => "approved",
            PurchaseRequestStatus::Rejected => "rejected",
        }
    }
}

/// Stored purchase request row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: Uuid,
    pub twitter_username: String,
    pub desired_price: i64,
    pub contact_email: Option<String>,
    pub contact_twitter: Option<String>,
    pub contact_instagram: Option<String>,
    pub message: Option<String>,
    pub has_image_tweet: bool,
    pub status: PurchaseRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Validated `purchase_request.create` body
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseRequestInput {
    pub twitter_username: String,
    pub desired_price: i64,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_twitter: Option<String>,
    #[serde(default)]
    pub contact_instagram: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub has_image_tweet: bool,
}

impl CreatePurchaseRequestInput {
    /// Row to insert. Status starts at pending; unused contacts are null.
    pub fn into_row(self) -> Value {
        let blank_to_null = |v: Option<String>| v.filter(|s| !s.is_empty());
        json!({
            "twitter_username": self.twitter_username,
            "desired_price": self.desired_price,
            "contact_email": blank_to_null(self.contact_email),
            "contact_twitter": blank_to_null(self.contact_twitter),
            "contact_instagram": blank_to_null(self.contact_instagram),
            "message": blank_to_null(self.message),
            "has_image_tweet": self.has_image_tweet,
            "status": PurchaseRequestStatus::Pending.as_str(),
        })
    }
}

/// Validated `purchase_request.update.partial` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePurchaseRequestInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PurchaseRequestStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestSortKey {
    #[default]
    CreatedAt,
    DesiredPrice,
}

impl PurchaseRequestSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            PurchaseRequestSortKey::CreatedAt => "created_at",
            PurchaseRequestSortKey::DesiredPrice => "desired_price",
        }
    }
}

/// Validated `purchase_request.query` parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequestQuery {
    #[serde(default)]
    pub status: Option<PurchaseRequestStatus>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub sort_by: PurchaseRequestSortKey,
    pub order: SortOrder,
    pub page: u64,
    pub limit: u64,
}

/// Same layout the store writes, so string comparison orders instants
fn stored_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl PurchaseRequestQuery {
    pub fn to_select_query(&self) -> SelectQuery {
        let mut query = SelectQuery::new();
        if let Some(status) = self.status {
            query = query.eq("status", status.as_str());
        }
        if let Some(start) = &self.start_date {
            query = query.gte("created_at", stored_timestamp(start));
        }
        if let Some(end) = &self.end_date {
            query = query.lte("created_at", stored_timestamp(end));
        }

        query
            .order(self.sort_by.column(), self.order)
            .page(self.page, self.limit)
            .with_count()
    }
}
