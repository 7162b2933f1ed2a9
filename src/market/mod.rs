//! # Marketplace Records
//!
//! Stored rows and the typed inputs the validated request bodies and query
//! strings deserialize into.

mod account;
mod purchase_request;

pub use account::{
    Account, AccountQuery, AccountSortKey, AccountStatus, Category, CreateAccountInput,
    UpdateAccountInput, ACCOUNTS_TABLE,
};
pub use purchase_request::{
    CreatePurchaseRequestInput, PurchaseRequest, PurchaseRequestQuery, PurchaseRequestSortKey,
    PurchaseRequestStatus, UpdatePurchaseRequestInput, PURCHASE_REQUESTS_TABLE,
};

use crate::store::TableSpec;

/// Tables the marketplace needs
pub fn table_specs() -> Vec<TableSpec> {
    vec![
        TableSpec::new(ACCOUNTS_TABLE)
            .unique("username")
            .with_updated_at(),
        TableSpec::new(PURCHASE_REQUESTS_TABLE),
    ]
}
