//! Permgrid CLI
//!
//! Edits a permission fixture file through the matrix editor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use permgrid::error::{PermgridError, Result};
use permgrid::{EngineConfig, InMemoryPermissionStore, PermissionEditor};

#[derive(Parser)]
#[command(name = "permgrid")]
#[command(about = "Role permission matrix CLI")]
#[command(version)]
struct Cli {
    /// Fixture file holding catalog and role permissions
    #[arg(
        long,
        env = "PERMGRID_STATE",
        default_value = "~/.local/share/permgrid/state.json"
    )]
    state: String,

    /// Engine config (TOML)
    #[arg(long, env = "PERMGRID_CONFIG")]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "PERMGRID_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog groups
    Groups,
    /// Summarize every role
    Roles,
    /// Show one role's confirmed permissions and version
    Show {
        /// Role ID
        role: String,
    },
    /// Grant and revoke codes, then save
    Apply {
        /// role=code to grant (repeatable)
        #[arg(short, long = "grant")]
        grants: Vec<String>,
        /// role=code to revoke (repeatable)
        #[arg(short, long = "revoke")]
        revokes: Vec<String>,
        /// Print the diff without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy one role's permissions onto another
    Clone {
        /// Role that receives the permissions
        target: String,
        /// Role to copy from
        source: String,
        /// Commit instead of only previewing
        #[arg(short, long)]
        yes: bool,
    },
}

fn init_logging(json: bool) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(shellexpand::tilde(path).as_ref()),
        None => match EngineConfig::default_path() {
            Some(path) if path.exists() => EngineConfig::from_file(path),
            _ => Ok(EngineConfig::default()),
        },
    }
}

fn parse_assignment(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((role, code)) if !role.trim().is_empty() && !code.trim().is_empty() => {
            Ok((role.trim().to_string(), code.trim().to_string()))
        }
        _ => Err(PermgridError::InvalidInput(format!(
            "Expected role=code, got {:?}",
            s
        ))),
    }
}

fn persist(store: &InMemoryPermissionStore, path: &Path) -> Result<()> {
    store.save(path)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(cli.config.as_deref())?;

    // Expand ~ in path
    let state_path = PathBuf::from(shellexpand::tilde(&cli.state).to_string());
    if !state_path.exists() {
        return Err(PermgridError::Config(format!(
            "State file not found: {}",
            state_path.display()
        )));
    }

    let store = Arc::new(InMemoryPermissionStore::load(&state_path)?);
    let editor = PermissionEditor::with_config(store.clone(), &config)?;
    editor.load(&store.roles()).await?;

    match cli.command {
        Commands::Groups => {
            for group in editor.groups() {
                println!("{} ({})", group.group, group.items.len());
                for item in group.items {
                    println!("  {:<32} {}", item.code, item.description);
                }
            }
        }

        Commands::Roles => {
            for summary in editor.summaries() {
                println!(
                    "{:<16} {:<24} {} granted",
                    summary.role_id, summary.name, summary.granted
                );
            }
        }

        Commands::Show { role } => {
            let state = editor
                .role(&role)
                .ok_or_else(|| PermgridError::NotFound(role.clone()))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Apply {
            grants,
            revokes,
            dry_run,
        } => {
            let grants = grants
                .iter()
                .map(|g| parse_assignment(g).map(|a| (a, true)));
            let revokes = revokes
                .iter()
                .map(|r| parse_assignment(r).map(|a| (a, false)));
            for assignment in grants.chain(revokes) {
                let ((role, code), checked) = assignment?;
                if editor.role(&role).is_none() {
                    return Err(PermgridError::NotFound(role));
                }
                editor.toggle(&role, &code, checked);
            }

            for role_id in editor.dirty_roles() {
                if let Some(diff) = editor.diff(&role_id) {
                    println!("{}: +{:?} -{:?}", role_id, diff.added, diff.removed);
                }
            }
            if dry_run {
                return Ok(());
            }

            let summary = editor.save_all().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.success_count > 0 {
                persist(&store, &state_path)?;
            }
            summary.ensure_saved()?;
        }

        Commands::Clone {
            target,
            source,
            yes,
        } => {
            let preview = editor
                .preview_clone(&target, &source)
                .ok_or_else(|| PermgridError::NotFound(format!("{} or {}", target, source)))?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
            if yes && !preview.is_empty() {
                editor.commit_clone(&target, &source).await?;
                persist(&store, &state_path)?;
                println!("Cloned {} onto {}", source, target);
            }
        }
    }

    Ok(())
}
