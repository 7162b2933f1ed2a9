//! CLI argument definitions using clap
//!
//! Commands:
//! - marketgate serve [--config <path>] [--port <port>]
//! - marketgate hash-password --email <email> [--name <name>] [--password <password>]
//! - marketgate check-config [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// marketgate - account marketplace API with request admission
#[derive(Parser, Debug)]
#[command(name = "marketgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to bind to, overriding the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a `bootstrap_admin` entry with a hashed password
    HashPassword {
        /// Admin email address
        #[arg(long)]
        email: String,

        /// Admin display name
        #[arg(long)]
        name: Option<String>,

        /// Password to hash; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Load the configuration and print the effective values
    CheckConfig {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["marketgate", "serve", "--config", "mg.json", "--port", "8080"])
            .unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, Some(PathBuf::from("mg.json")));
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_hash_password() {
        let cli =
            Cli::try_parse_from(["marketgate", "hash-password", "--email", "a@example.com"]).unwrap();
        match cli.command {
            Command::HashPassword {
                email,
                name,
                password,
            } => {
                assert_eq!(email, "a@example.com");
                assert!(name.is_none());
                assert!(password.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["marketgate", "hash-password"]).is_err());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["marketgate", "serve", "--port", "70000"]).is_err());
    }
}
