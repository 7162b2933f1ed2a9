//! CLI command implementations

use std::io;
use std::path::Path;

use serde_json::{json, Value};

use crate::auth::crypto::hash_password as argon2_hash;
use crate::auth::CreateAdminRequest;
use crate::http_server::{BootstrapAdmin, HttpServer, HttpServerConfig};
use crate::observability::init_logging;
use crate::schema::{names, SchemaRegistry};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_line, write_stdout};

const REDACTED: &str = "<redacted>";

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::HashPassword {
            email,
            name,
            password,
        } => hash_password(email, name, password),
        Command::CheckConfig { config } => check_config(config.as_deref()),
    }
}

/// Load configuration, install logging and serve until stopped
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = HttpServerConfig::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }

    init_logging(&config.log_filter, config.log_format)?;
    let server = HttpServer::with_config(config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print a ready-to-use `bootstrap_admin` entry
pub fn hash_password(email: String, name: Option<String>, password: Option<String>) -> CliResult<()> {
    let password = match password {
        Some(password) => password,
        None => read_line(&mut io::stdin().lock())?,
    };
    let entry = bootstrap_entry(email, name, password)?;
    write_stdout(&json!({ "bootstrap_admin": entry }))
}

/// Validates the admin against `admin.create` and hashes the password
pub fn bootstrap_entry(
    email: String,
    name: Option<String>,
    password: String,
) -> CliResult<BootstrapAdmin> {
    let registry = SchemaRegistry::builtin()
        .map_err(|e| CliError::boot_failed(format!("schema setup failed: {}", e)))?;
    let schema = registry
        .get(names::ADMIN_CREATE)
        .map_err(|e| CliError::boot_failed(e.to_string()))?;

    let mut input = json!({ "email": email, "password": password });
    if let Some(name) = name {
        input["name"] = json!(name);
    }
    let request: CreateAdminRequest = schema
        .validate(&input)
        .into_typed()?
        .into_result()
        .map_err(|errors| CliError::invalid_input(errors.to_string()))?;

    let password_hash = argon2_hash(&request.password)
        .map_err(|e| CliError::boot_failed(format!("hashing failed: {}", e)))?;

    Ok(BootstrapAdmin {
        email: request.email,
        password_hash,
        name: request.name,
    })
}

/// Print the effective configuration with secrets redacted
pub fn check_config(config_path: Option<&Path>) -> CliResult<()> {
    let config = HttpServerConfig::load(config_path)?;
    write_stdout(&effective_config(&config)?)
}

/// Effective configuration as JSON, secrets redacted, plus warnings
pub fn effective_config(config: &HttpServerConfig) -> CliResult<Value> {
    let mut warnings = Vec::new();
    if config.uses_default_secret() {
        warnings.push("jwt_secret is the built-in default; set MARKETGATE_JWT_SECRET");
    }
    if config.bootstrap_admin.is_none() {
        warnings.push("no bootstrap_admin configured; nobody can sign in");
    }
    if config.cors_origins.is_empty() {
        warnings.push("cors_origins is empty; any origin is allowed");
    }

    let mut effective = serde_json::to_value(config)?;
    effective["jwt_secret"] = json!(REDACTED);
    if let Some(admin) = effective.get_mut("bootstrap_admin").and_then(Value::as_object_mut) {
        admin.insert("password_hash".to_string(), json!(REDACTED));
    }

    Ok(json!({
        "status": "ok",
        "config": effective,
        "warnings": warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::verify_password;
    use crate::cli::errors::CliErrorCode;

    #[test]
    fn test_bootstrap_entry_hashes_password() {
        let entry = bootstrap_entry(
            "owner@example.com".to_string(),
            Some("Owner".to_string()),
            "Sup3rSecret".to_string(),
        )
        .unwrap();

        assert_eq!(entry.email, "owner@example.com");
        assert_eq!(entry.name.as_deref(), Some("Owner"));
        assert_ne!(entry.password_hash, "Sup3rSecret");
        assert!(verify_password("Sup3rSecret", &entry.password_hash).unwrap());
    }

    #[test]
    fn test_bootstrap_entry_rejects_weak_password() {
        let err = bootstrap_entry("owner@example.com".to_string(), None, "password".to_string())
            .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidInput);
        assert!(err.message().contains("password"));
    }

    #[test]
    fn test_effective_config_redacts_secrets() {
        let config = HttpServerConfig {
            bootstrap_admin: Some(BootstrapAdmin {
                email: "owner@example.com".to_string(),
                password_hash: "$argon2id$...".to_string(),
                name: None,
            }),
            ..Default::default()
        };
        let out = effective_config(&config).unwrap();

        assert_eq!(out["config"]["jwt_secret"], REDACTED);
        assert_eq!(out["config"]["bootstrap_admin"]["password_hash"], REDACTED);
        assert_eq!(out["config"]["bootstrap_admin"]["email"], "owner@example.com");
        assert_eq!(out["warnings"].as_array().unwrap().len(), 1);
    }
}
