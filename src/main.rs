use anyhow::{Context, Result};
use authtoken::{Config, Token, TokenStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Manage users and bearer tokens in a local token store.
#[derive(Parser, Debug)]
#[command(name = "authtoken", version, about)]
struct Cli {
    /// Config file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace a user's password.
    AddUser {
        identity: String,
        #[arg(long, env = "AUTHTOKEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Remove a user's password record.
    DeleteUser { identity: String },
    /// Issue a token; prints `identity:hex`.
    Issue {
        identity: String,
        #[arg(long, env = "AUTHTOKEN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Check a token given as `identity:hex`. Exits with 1 when invalid.
    Validate { token: String },
    /// Remove the token stored for an identity.
    Revoke { identity: String },
    /// Delete every expired token.
    Purge,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;
    let store = TokenStore::open(&config)
        .with_context(|| format!("Failed to open token store: {}", config.db_path().display()))?;

    match cli.command {
        Command::AddUser { identity, password } => {
            store.add_user(&identity, &password)?;
            println!("user '{identity}' stored");
        }
        Command::DeleteUser { identity } => {
            store.delete_user(&identity)?;
            println!("user '{identity}' deleted");
        }
        Command::Issue { identity, password } => {
            let token = store.issue_token(&identity, &password)?;
            println!("{token}");
        }
        Command::Validate { token } => {
            let valid = match token.parse::<Token>() {
                Ok(token) => store.validate_token(&token),
                Err(e) => {
                    tracing::debug!(error = %e, "Unparseable token");
                    false
                }
            };
            if valid {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        Command::Revoke { identity } => {
            store.revoke_token(&identity)?;
            println!("token for '{identity}' revoked");
        }
        Command::Purge => {
            let removed = store.purge_expired()?;
            println!("{removed} expired token(s) removed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_issue_with_password_flag() {
        let cli = Cli::try_parse_from([
            "authtoken",
            "--config",
            "/etc/authtoken.toml",
            "issue",
            "test",
            "--password",
            "password",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/authtoken.toml")));
        assert!(matches!(
            cli.command,
            Command::Issue { ref identity, ref password } if identity == "test" && password == "password"
        ));
    }

    #[test]
    fn parses_purge() {
        let cli = Cli::try_parse_from(["authtoken", "purge"]).unwrap();
        assert!(matches!(cli.command, Command::Purge));
    }
}
