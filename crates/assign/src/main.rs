//! itrack-assign: pick the assignee of an issue from the terminal
//!
//! Without a choice, prints the picker entries with the current one marked.
//! With a choice, submits it and prints the save notification.

use anyhow::{bail, Context, Result};
use clap::Parser;
use itrack_assign::{AssigneeSelector, Choice, HttpIssueApi, IssueApi, Notification, SelectorState};
use std::sync::mpsc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "itrack-assign", version)]
#[command(about = "Assign an itrack issue to a user", long_about = None)]
struct Args {
    /// Server root URL
    #[arg(long, env = "ITRACK_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Issue to assign
    issue: i64,

    /// User id, or "unassigned"; omit to list the choices
    choice: Option<Choice>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let api = HttpIssueApi::with_timeout(&args.server, Duration::from_secs(args.timeout));
    let issue = api
        .show_issue(args.issue)
        .with_context(|| format!("Failed to load issue {}", args.issue))?;

    let (tx, rx) = mpsc::channel();
    let mut selector = AssigneeSelector::new(&issue, tx);

    let Some(choice) = args.choice else {
        if let SelectorState::Unavailable = selector.activate(&api) {
            bail!("User list is unavailable");
        }
        println!("#{} {}", issue.id, issue.title);
        for (value, label) in selector.options() {
            let marker = if &value == selector.selection() { "*" } else { " " };
            println!("{} {:<12} {}", marker, value.to_string(), label);
        }
        return Ok(());
    };

    selector.select(&api, choice);
    match rx.try_recv() {
        Ok(notification) => match &notification {
            Notification::Saved { .. } => {
                println!("{}", notification);
                Ok(())
            }
            Notification::Failed { reason, .. } => bail!("{} {}", notification, reason),
        },
        Err(_) => bail!("No outcome reported for issue {}", selector.issue_id()),
    }
}
