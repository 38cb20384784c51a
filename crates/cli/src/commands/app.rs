//! App Commands

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use serde::Serialize;
use tracing::{info, warn};

use edgecheck_common::{ApiDeployApp, AppSummary};
use edgecheck_e2e::TestEnv;

use crate::output::{
    print_info, print_item, print_list, print_success, print_warning, OutputFormat, TableDisplay,
};

#[derive(Subcommand)]
pub enum AppCommands {
    /// Get app details from the backend
    Get {
        /// App ID
        id: String,
    },

    /// List apps in a namespace, newest first
    List {
        /// Namespace (defaults to WASMER_NAMESPACE)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Delete an app with the deploy tool
    Delete {
        /// App ID
        id: String,
    },

    /// Delete old test apps through the backend
    Cleanup {
        /// Namespace (defaults to WASMER_NAMESPACE)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Only delete apps created more than this many hours ago
        #[arg(long, default_value = "24", value_parser = clap::value_parser!(u32))]
        older_than_hours: u32,

        /// Print what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
pub struct AppDisplay {
    pub id: String,
    pub url: String,
}

impl From<ApiDeployApp> for AppDisplay {
    fn from(app: ApiDeployApp) -> Self {
        Self {
            id: app.id,
            url: app.url,
        }
    }
}

impl TableDisplay for AppDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "URL"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.clone(), self.url.clone()]
    }
}

#[derive(Serialize)]
pub struct AppSummaryDisplay {
    pub id: String,
    pub created_at: String,
    pub deleted: bool,
}

impl From<&AppSummary> for AppSummaryDisplay {
    fn from(app: &AppSummary) -> Self {
        Self {
            id: app.id.clone(),
            created_at: app.created_at.clone(),
            deleted: app.deleted,
        }
    }
}

impl TableDisplay for AppSummaryDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Created", "Deleted"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.created_at.clone(),
            if self.deleted { "yes" } else { "no" }.to_string(),
        ]
    }
}

/// Maximum app age for `--older-than-hours`
pub fn max_age(hours: u32) -> Result<Duration> {
    Duration::try_hours(i64::from(hours))
        .with_context(|| format!("--older-than-hours {} is out of range", hours))
}

/// Apps that are not deleted and were created before `now - max_age`.
///
/// A negative `max_age` counts as zero. Entries with an unparseable
/// `createdAt` are skipped; a cutoff before the earliest representable
/// time selects nothing.
pub fn stale_apps<'a>(
    apps: &'a [AppSummary],
    now: DateTime<Utc>,
    max_age: Duration,
) -> Vec<&'a AppSummary> {
    let Some(cutoff) = now.checked_sub_signed(max_age.max(Duration::zero())) else {
        return Vec::new();
    };
    apps.iter()
        .filter(|app| !app.deleted)
        .filter(|app| match DateTime::parse_from_rfc3339(&app.created_at) {
            Ok(created) => created.with_timezone(&Utc) < cutoff,
            Err(e) => {
                warn!("Skipping app {} with bad createdAt '{}': {}", app.id, app.created_at, e);
                false
            }
        })
        .collect()
}

pub async fn execute(cmd: AppCommands, format: OutputFormat) -> Result<()> {
    let env = TestEnv::from_env()?;

    match cmd {
        AppCommands::Get { id } => {
            let app = env.backend().get_app_by_id(&id).await?;
            print_item(&AppDisplay::from(app), format)?;
        }

        AppCommands::List { namespace } => {
            let namespace = namespace.unwrap_or_else(|| env.config().namespace.clone());
            let apps = env.backend().all_apps_in_namespace(&namespace).await?;
            let displays: Vec<AppSummaryDisplay> = apps.iter().map(AppSummaryDisplay::from).collect();
            print_list(&displays, format)?;
        }

        AppCommands::Delete { id } => {
            env.delete_app_by_id(&id).await?;
            print_success(&format!("App {} deleted", id));
        }

        AppCommands::Cleanup {
            namespace,
            older_than_hours,
            dry_run,
        } => {
            let namespace = namespace.unwrap_or_else(|| env.config().namespace.clone());
            let apps = env.backend().all_apps_in_namespace(&namespace).await?;
            let stale = stale_apps(&apps, Utc::now(), max_age(older_than_hours)?);

            if stale.is_empty() {
                print_info(&format!("No apps older than {}h in {}", older_than_hours, namespace));
                return Ok(());
            }

            if dry_run {
                let displays: Vec<AppSummaryDisplay> =
                    stale.iter().copied().map(AppSummaryDisplay::from).collect();
                return print_list(&displays, format);
            }

            let mut failed = Vec::new();
            for app in &stale {
                info!("Deleting app {} (created {})", app.id, app.created_at);
                if let Err(e) = env.backend().delete_app(&app.id).await {
                    print_warning(&format!("Failed to delete {}: {}", app.id, e));
                    failed.push(app.id.clone());
                }
            }

            if !failed.is_empty() {
                bail!("{} of {} apps could not be deleted: {}", failed.len(), stale.len(), failed.join(", "));
            }
            print_success(&format!("Deleted {} apps from {}", stale.len(), namespace));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, created_at: &str, deleted: bool) -> AppSummary {
        AppSummary {
            id: id.to_string(),
            deleted,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_stale_apps_filters_by_age_and_deleted() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let apps = vec![
            summary("old", "2026-03-08T12:00:00+00:00", false),
            summary("old-deleted", "2026-03-01T00:00:00Z", true),
            summary("fresh", "2026-03-10T11:00:00Z", false),
            summary("garbage", "yesterday", false),
            summary("offset", "2026-03-09T13:00:00+02:00", false),
        ];

        let stale: Vec<&str> = stale_apps(&apps, now, Duration::hours(24))
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(stale, vec!["old", "offset"]);
    }

    #[test]
    fn test_negative_age_never_selects_fresh_apps() {
        let now = Utc::now();
        let created = (now - Duration::minutes(1)).to_rfc3339();
        let apps = vec![summary("fresh", &created, false)];

        assert!(stale_apps(&apps, now, Duration::hours(-24)).is_empty());
    }

    #[test]
    fn test_huge_age_selects_nothing_instead_of_panicking() {
        let now = Utc::now();
        let apps = vec![summary("ancient", "1970-01-01T00:00:00Z", false)];

        let age = max_age(u32::MAX).unwrap();
        assert!(stale_apps(&apps, now, age).is_empty());
    }

    #[derive(clap::Parser)]
    struct AppCli {
        #[command(subcommand)]
        command: AppCommands,
    }

    #[test]
    fn test_cleanup_rejects_negative_hours() {
        use clap::Parser;

        assert!(AppCli::try_parse_from(["app", "cleanup", "--older-than-hours", "-24"]).is_err());
        assert!(AppCli::try_parse_from(["app", "cleanup", "--older-than-hours", "99999999999"]).is_err());

        let cli = AppCli::try_parse_from(["app", "cleanup", "--older-than-hours", "48"]).unwrap();
        match cli.command {
            AppCommands::Cleanup { older_than_hours, .. } => assert_eq!(older_than_hours, 48),
            _ => panic!("expected cleanup"),
        }
    }

    #[test]
    fn test_stale_apps_zero_age_takes_everything_past() {
        let now = Utc::now();
        let apps = vec![summary("a", "2020-01-01T00:00:00Z", false)];
        assert_eq!(stale_apps(&apps, now, Duration::zero()).len(), 1);
    }
}
