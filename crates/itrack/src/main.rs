//! itrack administration CLI
//!
//! Seeds the user directory and manages issues directly against the SQLite
//! database, through the same service the HTTP server uses.

use anyhow::Context;
use clap::Parser;
use itrack::cli::{Cli, Commands, IssueCommands, UserCommands};
use itrack::config::{DatabaseLocation, TrackerConfig};
use itrack::domain::{Issue, IssueFilter, IssueQuery, OrderBy, Status, User};
use itrack::output::{ExitCode, JsonError, JsonOutput};
use itrack::storage::SqliteStorage;
use itrack::{IssueService, ServiceError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Service(e) => ExitCode::from(e),
            CliError::InvalidArgument(_) => ExitCode::InvalidArgument,
            CliError::Other(_) => ExitCode::GenericError,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let command = command_name(&cli.command);

    let exit_code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            if json {
                let error = match &e {
                    CliError::Service(service_error) => {
                        JsonError::from_service_error(service_error, command)
                    }
                    other => JsonError::new("ERROR", format!("{:#}", other), command),
                };
                match error.to_json_string() {
                    Ok(s) => println!("{}", s),
                    Err(_) => eprintln!("Error: {}", e),
                }
            } else {
                eprintln!("Error: {}", e);
                if let CliError::Other(ref inner) = e {
                    for cause in inner.chain().skip(1) {
                        eprintln!("  caused by: {}", cause);
                    }
                }
            }
            e.exit_code()
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::User(UserCommands::Add { .. }) => "user add",
        Commands::User(UserCommands::List) => "user list",
        Commands::User(UserCommands::Show { .. }) => "user show",
        Commands::Issue(IssueCommands::Create { .. }) => "issue create",
        Commands::Issue(IssueCommands::List { .. }) => "issue list",
        Commands::Issue(IssueCommands::Show { .. }) => "issue show",
        Commands::Issue(IssueCommands::Update { .. }) => "issue update",
        Commands::Issue(IssueCommands::Delete { .. }) => "issue delete",
        Commands::Issue(IssueCommands::Summary) => "issue summary",
    }
}

fn init_tracing(config: &TrackerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter().unwrap_or_else(|| "warn".into())))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let current_dir = env::current_dir().context("Failed to read current directory")?;
    let config = TrackerConfig::discover(cli.config.as_deref(), &current_dir)?;
    init_tracing(&config);

    let location = DatabaseLocation::parse(
        &cli.database
            .clone()
            .unwrap_or_else(|| config.database_path()),
    );
    let storage = location.open()?;
    let service = IssueService::new(storage);
    let json = cli.json;
    let command = command_name(&cli.command);

    match cli.command {
        Commands::Init => {
            service.init()?;
            let path = match &location {
                DatabaseLocation::InMemory => ":memory:".to_string(),
                DatabaseLocation::File(path) => path.display().to_string(),
            };
            emit(json, command, json!({ "database": path }), || {
                println!("Initialized itrack database at {}", path)
            })
        }

        Commands::User(UserCommands::Add { name, email, id }) => {
            let user = add_user(service.storage(), name, email, id)?;
            emit(json, command, &user, || {
                println!("Added user {} <{}> with id {}", user.name, user.email, user.id)
            })
        }

        Commands::User(UserCommands::List) => {
            let users = service.list_users()?;
            emit(json, command, &users, || {
                if users.is_empty() {
                    println!("No users");
                }
                for user in &users {
                    println!("{}  {} <{}>", user.id, user.name, user.email);
                }
            })
        }

        Commands::User(UserCommands::Show { id }) => {
            let user = service.show_user(&id)?;
            emit(json, command, &user, || {
                println!("{}  {} <{}>", user.id, user.name, user.email)
            })
        }

        Commands::Issue(IssueCommands::Create {
            title,
            description,
            status,
        }) => {
            let mut payload = Map::new();
            payload.insert("title".into(), Value::String(title));
            payload.insert("description".into(), Value::String(description));
            if let Some(status) = status {
                payload.insert("status".into(), Value::String(status));
            }
            let issue = service.create_issue(&Value::Object(payload))?;
            emit(json, command, &issue, || {
                println!("Created issue #{}: {}", issue.id, issue.title)
            })
        }

        Commands::Issue(IssueCommands::List {
            status,
            assignee,
            order_by,
            page,
            page_size,
        }) => {
            let query = IssueQuery {
                filter: IssueFilter {
                    status: status
                        .map(|s| s.parse::<Status>())
                        .transpose()
                        .map_err(CliError::InvalidArgument)?,
                    assignee,
                },
                order_by: order_by
                    .parse::<OrderBy>()
                    .map_err(CliError::InvalidArgument)?,
                page,
                page_size,
            };
            let page = service.list_issues(query)?;
            emit(json, command, &page, || {
                for issue in &page.items {
                    println!("{}", issue_line(issue));
                }
                println!(
                    "Page {} of {} ({} issues)",
                    page.page,
                    page.page_count.max(1),
                    page.total
                );
            })
        }

        Commands::Issue(IssueCommands::Show { id }) => {
            let issue = service.show_issue(id)?;
            emit(json, command, &issue, || print_issue(&issue))
        }

        Commands::Issue(IssueCommands::Update {
            id,
            title,
            description,
            status,
            assignee,
            unassign,
        }) => {
            let mut payload = Map::new();
            if let Some(title) = title {
                payload.insert("title".into(), Value::String(title));
            }
            if let Some(description) = description {
                payload.insert("description".into(), Value::String(description));
            }
            if let Some(status) = status {
                payload.insert("status".into(), Value::String(status));
            }
            if let Some(assignee) = assignee {
                payload.insert("assignedToUserId".into(), Value::String(assignee));
            } else if unassign {
                payload.insert("assignedToUserId".into(), Value::Null);
            }
            let issue = service.patch_issue(id, &Value::Object(payload))?;
            emit(json, command, &issue, || {
                println!("Updated issue #{}", issue.id);
                print_issue(&issue);
            })
        }

        Commands::Issue(IssueCommands::Delete { id }) => {
            service.delete_issue(id)?;
            emit(json, command, json!({ "id": id, "deleted": true }), || {
                println!("Deleted issue #{}", id)
            })
        }

        Commands::Issue(IssueCommands::Summary) => {
            let summary = service.status_summary()?;
            emit(json, command, summary, || {
                for status in Status::ALL {
                    println!("{:<12} {}", status.label(), summary.count(status));
                }
                println!("{:<12} {}", "Total", summary.total);
            })
        }
    }
}

/// Print `data` as a JSON envelope, or run `text` for human output.
fn emit<T: Serialize>(
    json: bool,
    command: &str,
    data: T,
    text: impl FnOnce(),
) -> Result<(), CliError> {
    if json {
        let output = JsonOutput::success(data, command);
        println!(
            "{}",
            output
                .to_json_string()
                .context("Failed to serialize output")?
        );
    } else {
        text();
    }
    Ok(())
}

fn add_user(
    storage: &SqliteStorage,
    name: String,
    email: String,
    id: Option<String>,
) -> Result<User, CliError> {
    if name.trim().is_empty() {
        return Err(CliError::InvalidArgument("Name must not be empty".into()));
    }
    let email_pattern = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .context("Invalid email pattern")?;
    if !email_pattern.is_match(&email) {
        return Err(CliError::InvalidArgument(format!(
            "Invalid email address '{}'",
            email
        )));
    }
    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    itrack::validation::validate_user_id(&id).map_err(CliError::InvalidArgument)?;

    let user = User { id, name, email };
    storage.insert_user(&user)?;
    Ok(user)
}

fn issue_line(issue: &Issue) -> String {
    format!(
        "#{:<5} {:<12} {:<10} {}",
        issue.id,
        issue.status.as_str(),
        issue.assigned_to_user_id.as_deref().unwrap_or("-"),
        issue.title
    )
}

fn print_issue(issue: &Issue) {
    println!("ID: {}", issue.id);
    println!("Title: {}", issue.title);
    println!("Status: {}", issue.status.label());
    println!(
        "Assignee: {}",
        issue.assigned_to_user_id.as_deref().unwrap_or("Unassigned")
    );
    println!("Created: {}", issue.created_at.format("%a %b %d %Y"));
    println!("Updated: {}", issue.updated_at.to_rfc3339());
    println!();
    println!("{}", issue.description);
}
