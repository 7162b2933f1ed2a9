//! Schema registry
//!
//! Holds every input shape the application accepts. Built once at startup;
//! a schema name can be registered only once and registered schemas are
//! shared read-only behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{CharClass, FieldDef, Refinement, Schema, StringFormat};

/// Names of the builtin schemas
pub mod names {
    pub const ACCOUNT_CREATE: &str = "account.create";
    pub const ACCOUNT_UPDATE: &str = "account.update";
    pub const ACCOUNT_UPDATE_PARTIAL: &str = "account.update.partial";
    pub const ACCOUNT_QUERY: &str = "account.query";
    pub const PURCHASE_REQUEST_CREATE: &str = "purchase_request.create";
    pub const PURCHASE_REQUEST_UPDATE: &str = "purchase_request.update";
    pub const PURCHASE_REQUEST_UPDATE_PARTIAL: &str = "purchase_request.update.partial";
    pub const PURCHASE_REQUEST_QUERY: &str = "purchase_request.query";
    pub const LOGIN: &str = "auth.login";
    pub const ADMIN_CREATE: &str = "admin.create";
}

/// Upper bound for any listed or desired price
pub const MAX_PRICE: i64 = 10_000_000;

/// Lowest price a seller may ask for in a purchase request
pub const MIN_DESIRED_PRICE: i64 = 1_000;

/// Upper bound for a list page size
pub const MAX_PAGE_SIZE: i64 = 1_000;

/// Listing categories, stored and filtered by these exact labels
pub const CATEGORIES: &[&str] = &["ビジネス", "エンタメ", "スポーツ", "ニュース", "その他"];
pub const ACCOUNT_STATUSES: &[&str] = &["available", "sold", "pending"];
pub const PURCHASE_REQUEST_STATUSES: &[&str] = &["pending", "reviewing", "approved", "rejected"];

/// `@handle` or `handle`: 1-15 letters, digits or underscores
const HANDLE_PATTERN: &str = r"^@?[A-Za-z0-9_]{1,15}$";
const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

/// Registry of named, immutable schemas
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every builtin schema.
    ///
    /// # Errors
    ///
    /// Any malformed definition aborts construction.
    pub fn builtin() -> SchemaResult<Self> {
        let mut registry = Self::new();

        let account_create = account_create()?;
        let account_update = account_create
            .partial()
            .extend([(
                "status",
                FieldDef::one_of(ACCOUNT_STATUSES).optional(),
            )])?
            .named(names::ACCOUNT_UPDATE);
        let account_update_partial = account_update.partial().named(names::ACCOUNT_UPDATE_PARTIAL);

        let purchase_request_update = purchase_request_update()?;
        let purchase_request_update_partial = purchase_request_update
            .partial()
            .named(names::PURCHASE_REQUEST_UPDATE_PARTIAL);

        registry.register(account_create)?;
        registry.register(account_update)?;
        registry.register(account_update_partial)?;
        registry.register(account_query()?)?;
        registry.register(purchase_request_create()?)?;
        registry.register(purchase_request_update)?;
        registry.register(purchase_request_update_partial)?;
        registry.register(purchase_request_query()?)?;
        registry.register(login()?)?;
        registry.register(admin_create()?)?;

        Ok(registry)
    }

    /// Registers a schema under its own name.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the name is taken; the existing schema
    /// is left untouched.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<Arc<Schema>> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::AlreadyRegistered(schema.name().to_string()));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> SchemaResult<Arc<Schema>> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn handle() -> FieldDef {
    FieldDef::string()
        .min_len(1, "Enter a Twitter handle")
        .pattern(
            HANDLE_PATTERN,
            "Twitter handles use 1-15 letters, digits or underscores",
        )
        .strip_prefix('@')
}

fn email() -> FieldDef {
    FieldDef::string().format(StringFormat::Email, "Enter a valid email address")
}

fn sort_order() -> FieldDef {
    FieldDef::one_of(&["asc", "desc"]).default_value("desc")
}

fn page() -> FieldDef {
    FieldDef::int().min(1, "Page must be 1 or greater").default_value(1)
}

fn page_size(default: i64) -> FieldDef {
    FieldDef::int()
        .min(1, "Limit must be 1 or greater")
        .max(MAX_PAGE_SIZE, "Limit must be 1000 or less")
        .default_value(default)
}

fn account_create() -> SchemaResult<Schema> {
    Schema::define(
        names::ACCOUNT_CREATE,
        [
            ("username", handle()),
            (
                "followers_count",
                FieldDef::int().min(0, "Follower count must be 0 or greater"),
            ),
            (
                "tweets_count",
                FieldDef::int().min(0, "Tweet count must be 0 or greater"),
            ),
            (
                "account_created_at",
                FieldDef::string()
                    .pattern(DATE_PATTERN, "Dates use the YYYY-MM-DD format")
                    .optional(),
            ),
            (
                "price",
                FieldDef::int()
                    .min(1, "Price must be at least 1 yen")
                    .max(MAX_PRICE, "Price must be 10,000,000 yen or less"),
            ),
            ("category", FieldDef::one_of(CATEGORIES).optional()),
            (
                "description",
                FieldDef::string()
                    .max_len(1000, "Descriptions are limited to 1000 characters")
                    .optional(),
            ),
            (
                "image_url",
                FieldDef::string()
                    .format(StringFormat::Url, "Enter a valid URL")
                    .optional(),
            ),
        ],
    )
}

fn account_query() -> SchemaResult<Schema> {
    Schema::define(
        names::ACCOUNT_QUERY,
        [
            ("category", FieldDef::one_of(CATEGORIES).optional()),
            (
                "minPrice",
                FieldDef::int().min(0, "minPrice must be 0 or greater").optional(),
            ),
            (
                "maxPrice",
                FieldDef::int()
                    .max(MAX_PRICE, "maxPrice must be 10,000,000 or less")
                    .optional(),
            ),
            (
                "minFollowers",
                FieldDef::int().min(0, "minFollowers must be 0 or greater").optional(),
            ),
            ("maxFollowers", FieldDef::int().optional()),
            ("status", FieldDef::one_of(ACCOUNT_STATUSES).optional()),
            (
                "sortBy",
                FieldDef::one_of(&["price", "followers_count", "created_at"])
                    .default_value("created_at"),
            ),
            ("order", sort_order()),
            ("page", page()),
            ("limit", page_size(12)),
        ],
    )
}

fn purchase_request_create() -> SchemaResult<Schema> {
    Schema::define(
        names::PURCHASE_REQUEST_CREATE,
        [
            ("twitter_username", handle()),
            (
                "desired_price",
                FieldDef::int()
                    .min(MIN_DESIRED_PRICE, "Desired price must be at least 1,000 yen")
                    .max(MAX_PRICE, "Desired price is too high (limit: 10,000,000 yen)")
                    .required_message("Desired price is required")
                    .type_message("Enter a number"),
            ),
            ("contact_email", email().optional().empty_as_absent()),
            ("contact_twitter", FieldDef::string().optional().empty_as_absent()),
            ("contact_instagram", FieldDef::string().optional().empty_as_absent()),
            (
                "message",
                FieldDef::string()
                    .max_len(1000, "Messages are limited to 1000 characters")
                    .optional()
                    .empty_as_absent(),
            ),
            (
                "has_image_tweet",
                FieldDef::boolean().must_be(
                    true,
                    "Confirm the account has an image tweet without hashtags or mentions",
                ),
            ),
        ],
    )?
    .refine(Refinement::any_present(
        &["contact_email", "contact_twitter", "contact_instagram"],
        "contact_email",
        "Provide at least one way to contact you",
    ))
}

fn purchase_request_update() -> SchemaResult<Schema> {
    Schema::define(
        names::PURCHASE_REQUEST_UPDATE,
        [(
            "status",
            FieldDef::one_of(PURCHASE_REQUEST_STATUSES).required_message("Select a status"),
        )],
    )
}

fn purchase_request_query() -> SchemaResult<Schema> {
    Schema::define(
        names::PURCHASE_REQUEST_QUERY,
        [
            ("status", FieldDef::one_of(PURCHASE_REQUEST_STATUSES).optional()),
            (
                "startDate",
                FieldDef::string()
                    .format(StringFormat::DateTime, "startDate must be an RFC 3339 timestamp")
                    .optional(),
            ),
            (
                "endDate",
                FieldDef::string()
                    .format(StringFormat::DateTime, "endDate must be an RFC 3339 timestamp")
                    .optional(),
            ),
            (
                "sortBy",
                FieldDef::one_of(&["created_at", "desired_price"]).default_value("created_at"),
            ),
            ("order", sort_order()),
            ("page", page()),
            ("limit", page_size(20)),
        ],
    )
}

fn login() -> SchemaResult<Schema> {
    Schema::define(
        names::LOGIN,
        [
            ("email", email()),
            (
                "password",
                FieldDef::string().min_len(8, "Passwords are at least 8 characters"),
            ),
        ],
    )
}

fn admin_create() -> SchemaResult<Schema> {
    Schema::define(
        names::ADMIN_CREATE,
        [
            ("email", email()),
            (
                "password",
                FieldDef::string()
                    .min_len(8, "Passwords are at least 8 characters")
                    .require_classes(
                        &[CharClass::Upper, CharClass::Lower, CharClass::Digit],
                        "Passwords need an uppercase letter, a lowercase letter and a digit",
                    ),
            ),
            (
                "name",
                FieldDef::string().min_len(1, "Enter a name").optional(),
            ),
        ],
    )
}
