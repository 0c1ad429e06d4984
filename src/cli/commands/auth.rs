use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::TokenCodec;
use crate::cli::utils::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::types::Role;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Hash a password for the users.password_hash column")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
    },

    #[command(about = "Issue a session token signed with JWT_SECRET")]
    IssueToken {
        #[arg(help = "User id (token subject)")]
        user_id: Uuid,
        #[arg(long, help = "Role, e.g. TEACHER or ADMIN_GLOBAL")]
        role: Role,
        #[arg(long, help = "School id; omit for ADMIN_GLOBAL")]
        tenant: Option<Uuid>,
        #[arg(long, help = "Lifetime in minutes (defaults to the configured expiry)")]
        minutes: Option<i64>,
    },

    #[command(about = "Verify a session token and print its claims")]
    VerifyToken {
        #[arg(help = "Bearer token")]
        token: String,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;

    match cmd {
        AuthCommands::HashPassword { password } => {
            let hash = hash_password(&password, security.password_pepper.as_deref())
                .context("failed to hash password")?;
            output_success(&output_format, &hash, Some(json!({ "hash": hash })))
        }
        AuthCommands::IssueToken {
            user_id,
            role,
            tenant,
            minutes,
        } => {
            if role.is_global() != tenant.is_none() {
                anyhow::bail!("ADMIN_GLOBAL takes no --tenant; every other role requires one");
            }

            let codec = TokenCodec::new(security)?;
            let ttl = minutes.map(chrono::Duration::minutes).unwrap_or_else(|| codec.default_ttl());
            let issued = codec.issue(user_id, tenant, role, ttl)?;

            output_fields(
                &output_format,
                &[
                    ("token", issued.token),
                    ("expiresAt", issued.expires_at.to_rfc3339()),
                ],
            )
        }
        AuthCommands::VerifyToken { token } => {
            let codec = TokenCodec::new(security)?;
            let verified = codec.verify(&token).context("token rejected")?;

            output_fields(
                &output_format,
                &[
                    ("subject", verified.subject_id.to_string()),
                    (
                        "tenantId",
                        verified.tenant_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    ),
                    ("role", verified.role.to_string()),
                    ("issuedAt", verified.issued_at.to_rfc3339()),
                    ("expiresAt", verified.expires_at.to_rfc3339()),
                ],
            )
        }
    }
}
