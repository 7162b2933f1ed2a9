//! Listed accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{SelectQuery, SortOrder};

pub const ACCOUNTS_TABLE: &str = "accounts";

/// Category labels as the storefront shows and stores them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ビジネス")]
    Business,
    #[serde(rename = "エンタメ")]
    Entertainment,
    #[serde(rename = "スポーツ")]
    Sports,
    #[serde(rename = "ニュース")]
    News,
    #[serde(rename = "その他")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Available,
    Sold,
    Pending,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Available => "available",
            AccountStatus::Sold => "sold",
            AccountStatus::Pending => "pending",
        }
    }
}

/// Stored account row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub category: Option<Category>,
    pub followers_count: i64,
    pub tweets_count: i64,
    /// `YYYY-MM-DD`
    pub account_created_at: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated `account.create` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountInput {
    pub username: String,
    pub followers_count: i64,
    pub tweets_count: i64,
    #[serde(default)]
    pub account_created_at: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CreateAccountInput {
    /// Row to insert. New listings start out available.
    pub fn into_row(self) -> serde_json::Value {
        let mut row = serde_json::json!({
            "username": self.username,
            "followers_count": self.followers_count,
            "tweets_count": self.tweets_count,
            "account_created_at": self.account_created_at,
            "price": self.price,
            "category": self.category,
            "description": self.description,
            "image_url": self.image_url,
        });
        row["status"] = serde_json::json!(AccountStatus::default());
        row
    }
}

/// Validated `account.update` / `account.update.partial` body.
///
/// Serializes only the fields that were sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweets_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSortKey {
    Price,
    FollowersCount,
    #[default]
    CreatedAt,
}

impl AccountSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            AccountSortKey::Price => "price",
            AccountSortKey::FollowersCount => "followers_count",
            AccountSortKey::CreatedAt => "created_at",
        }
    }
}

/// Validated `account.query` parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    #[serde(default)]
    pub min_followers: Option<i64>,
    #[serde(default)]
    pub max_followers: Option<i64>,
    #[serde(default)]
    pub status: Option<AccountStatus>,
    pub sort_by: AccountSortKey,
    pub order: SortOrder,
    pub page: u64,
    pub limit: u64,
}

impl AccountQuery {
    /// Store query for this page. Numeric bounds of zero are ignored.
    pub fn to_select_query(&self) -> SelectQuery {
        let nonzero = |v: Option<i64>| v.filter(|n| *n != 0);

        let mut query = SelectQuery::new();
        if let Some(status) = self.status {
            query = query.eq("status", status.as_str());
        }
        if let Some(category) = self.category {
            query = query.eq("category", serde_json::json!(category));
        }
        if let Some(min) = nonzero(self.min_price) {
            query = query.gte("price", min);
        }
        if let Some(max) = nonzero(self.max_price) {
            query = query.lte("price", max);
        }
        if let Some(min) = nonzero(self.min_followers) {
            query = query.gte("followers_count", min);
        }
        if let Some(max) = nonzero(self.max_followers) {
            query = query.lte("followers_count", max);
        }

        query
            .order(self.sort_by.column(), self.order)
            .page(self.page, self.limit)
            .with_count()
    }
}
