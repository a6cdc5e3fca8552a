//! Keys command - operator key management against the credential store

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::api_key::ApiKeyValue;
use crate::infrastructure::logging;

#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// Issue a new key and print its signed token
    Issue {
        /// Free text stored with the key
        #[arg(long)]
        details: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
    },

    /// Move a key's expiry and print the re-signed token
    Edit {
        /// Current token for the key (may already be expired)
        #[arg(long)]
        token: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
    },

    /// Delete a key; its tokens stop validating immediately
    Revoke {
        /// The key value (not the token)
        #[arg(long)]
        key: String,
    },

    /// List stored keys
    List,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ExpiryArgs {
    /// Hours from now
    #[arg(long)]
    pub ttl_hours: Option<i64>,

    /// Absolute expiry (RFC 3339)
    #[arg(long)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExpiryArgs {
    fn resolve(&self, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
        match (self.expires_at, self.ttl_hours) {
            (Some(at), _) => Ok(at),
            (None, Some(hours)) => Duration::try_hours(hours)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| anyhow::anyhow!("--ttl-hours is out of range")),
            (None, None) => anyhow::bail!("either --ttl-hours or --expires-at is required"),
        }
    }
}

/// Run a key management command
pub async fn run(args: KeysArgs) -> anyhow::Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let service = crate::create_api_key_service(&config).await?;

    match args.command {
        KeysCommand::Issue { details, expiry } => {
            let expires_at = expiry.resolve(Utc::now())?;
            let issued = service.issue(&details, expires_at).await?;

            println!("key:        {}", issued.api_key.key());
            println!("expires_at: {}", expires_at.to_rfc3339());
            println!("token:      {}", issued.token);
        }
        KeysCommand::Edit { token, expiry } => {
            let new_expiry = expiry.resolve(Utc::now())?;
            let edited = service.edit(&token, new_expiry).await?;

            println!("key:        {}", edited.key());
            println!("expires_at: {}", edited.deadline().to_rfc3339());
            println!("token:      {}", edited.signed().unwrap_or_default());
        }
        KeysCommand::Revoke { key } => {
            let key = ApiKeyValue::new(key)?;
            service.revoke(&key).await?;

            println!("revoked {}", key);
        }
        KeysCommand::List => {
            let keys = service.list().await?;
            debug!(count = keys.len(), "Listing keys");

            for key in keys {
                let state = if key.is_expired() { "expired" } else { "active" };
                println!(
                    "{:>4}  {}  {}  {:<7}  {}",
                    key.id().unwrap_or_default(),
                    key.key(),
                    key.deadline().to_rfc3339(),
                    state,
                    key.details()
                );
            }
        }
    }

    Ok(())
}
