mod api;
mod app;
mod callback;
mod config;
mod dispatch;
mod error;
mod form;
mod models;
mod stats;
mod store;
mod table;
mod tui;

use anyhow::{anyhow, Context, Result};
use api::{Backend, HttpBackend};
use clap::{Args, Parser, Subcommand};
use config::Config;
use form::{parse_status, Field, JobForm, Submission};
use models::{JobApplication, JobPatch, JobQuery};
use stats::Stats;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications against the job-tracker backend")]
struct Cli {
    /// Backend base URL (overrides JOBTRACK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive tracker (the default)
    Tui {
        /// URL the browser landed on after connecting Gmail
        #[arg(long)]
        launch_url: Option<String>,
    },

    /// List applications
    List {
        /// Filter by status (applied, screening, interviewing, offer, rejected, withdrawn)
        #[arg(short, long)]
        status: Option<String>,

        /// Search company and position
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Number of applications to skip
        #[arg(long)]
        skip: Option<u32>,

        /// Maximum number of applications (backend caps at 100)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Add an application
    Add {
        #[command(flatten)]
        fields: JobFields,
    },

    /// Edit an application; only the given fields change, "" clears one
    Edit {
        /// Application ID
        id: i64,

        #[command(flatten)]
        fields: JobFields,
    },

    /// Change an application's status
    Status {
        /// Application ID
        id: i64,

        /// New status
        status: String,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show application statistics
    Stats,

    /// Show Gmail connection status
    Auth,

    /// Connect Gmail (opens the consent page in a browser)
    Login,

    /// Disconnect Gmail
    Logout,

    /// Scan Gmail for new applications
    Sync,

    /// Check the backend's Gmail connection
    GmailTest,
}

#[derive(Args, Default)]
struct JobFields {
    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    position: Option<String>,

    /// applied, screening, interviewing, offer, rejected, withdrawn
    #[arg(long)]
    status: Option<String>,

    /// Applied date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    source: Option<String>,

    #[arg(long)]
    salary: Option<String>,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

impl JobFields {
    /// Overlay the given flags onto a form; the form does the validation.
    fn apply(&self, form: &mut JobForm) -> Result<()> {
        let text_fields = [
            (Field::Company, &self.company),
            (Field::Position, &self.position),
            (Field::AppliedDate, &self.date),
            (Field::Location, &self.location),
            (Field::Source, &self.source),
            (Field::SalaryRange, &self.salary),
            (Field::JobUrl, &self.url),
            (Field::Notes, &self.notes),
        ];
        for (field, value) in text_fields {
            if let Some(value) = value {
                form.set_text(field, value.as_str());
            }
        }
        if let Some(status) = &self.status {
            form.set_status_str(status)?;
        }
        Ok(())
    }
}

/// File logging for the TUI (stdout belongs to the screen), stderr otherwise.
fn init_logging(is_tui: bool) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobtrack=info"));

    if !is_tui {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    let log_dir = Config::log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: failed to create logs directory {}: {}", log_dir.display(), e);
        return None;
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "jobtrack.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui { launch_url: None });

    let _log_guard = init_logging(matches!(command, Commands::Tui { .. }));

    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    let backend = HttpBackend::new(&config).context("Failed to set up backend client")?;
    tracing::debug!(api = %backend.base_url(), "backend configured");

    match command {
        Commands::Tui { launch_url } => {
            tui::run(&config, Arc::new(backend), launch_url.as_deref())?;
        }

        Commands::List {
            status,
            search,
            skip,
            limit,
        } => {
            let query = JobQuery {
                skip,
                limit: Some(limit.unwrap_or(config.effective_page_limit()).clamp(1, 100)),
                status: status.as_deref().map(parse_status).transpose()?,
                search,
            };
            let list = backend.list_jobs(&query)?;
            if list.items.is_empty() {
                println!("No job applications found.");
            } else {
                println!(
                    "{:<6} {:<13} {:<24} {:<28} {:<11}",
                    "ID", "STATUS", "COMPANY", "POSITION", "APPLIED"
                );
                println!("{}", "-".repeat(86));
                for job in &list.items {
                    println!(
                        "{:<6} {:<13} {:<24} {:<28} {:<11}",
                        job.id,
                        job.status.as_ref(),
                        truncate(&job.company, 22),
                        truncate(&job.position, 26),
                        applied_label(job)
                    );
                }
                println!("\nShowing {} of {} applications", list.items.len(), list.total);
            }
        }

        Commands::Show { id } => {
            let job = backend.get_job(id)?;
            print_job(&job);
        }

        Commands::Add { fields } => {
            let mut form = JobForm::new_entry(chrono::Local::now().date_naive());
            fields.apply(&mut form)?;
            let draft = form.to_draft()?;
            let job = backend.create_job(&draft)?;
            println!("Added application #{} ({} at {})", job.id, job.position, job.company);
        }

        Commands::Edit { id, fields } => {
            let current = backend.get_job(id)?;
            let mut form = JobForm::edit(&current);
            fields.apply(&mut form)?;
            let Submission::Update { id, patch } = form.submit()? else {
                return Err(anyhow!("Application #{} did not load in edit mode", id));
            };
            let job = backend.update_job(id, &patch)?;
            println!("Updated application #{}", job.id);
        }

        Commands::Status { id, status } => {
            let status = parse_status(&status)?;
            let job = backend.update_job(id, &JobPatch::status(status))?;
            println!("Application #{} is now {}", job.id, job.status.label());
        }

        Commands::Delete { id, yes } => {
            let job = backend.get_job(id)?;
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete the application for {} at {}?",
                        job.position, job.company
                    ))
                    .default(false)
                    .interact()?;
            if confirmed {
                backend.delete_job(id)?;
                println!("Deleted application #{}", id);
            } else {
                println!("Nothing deleted.");
            }
        }

        Commands::Stats => {
            let list = backend.list_jobs(&JobQuery {
                limit: Some(config.effective_page_limit()),
                ..Default::default()
            })?;
            let stats = Stats::from_jobs(&list.items);
            for (title, value) in stats.tiles() {
                println!("{:<20} {:>5}", title, value);
            }
            if (list.items.len() as i64) < list.total {
                println!(
                    "\n(Counted the first {} of {} applications)",
                    list.items.len(),
                    list.total
                );
            }
        }

        Commands::Auth => {
            let auth = backend.auth_status()?;
            match (auth.authenticated, auth.email) {
                (true, Some(email)) => println!("Gmail connected as {}", email),
                (true, None) => println!("Gmail connected"),
                (false, _) => println!("Gmail not connected. Run: jobtrack login"),
            }
        }

        Commands::Login => {
            let url = backend.login_url()?;
            println!("Open this URL to connect Gmail:\n{}", url);
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "failed to open browser");
            }
        }

        Commands::Logout => {
            backend.logout()?;
            println!("Gmail disconnected.");
        }

        Commands::Sync => {
            println!("Syncing Gmail...");
            let report = backend.sync_gmail()?;
            println!("{}", report.message);
        }

        Commands::GmailTest => {
            let probe = backend.test_gmail()?;
            if probe.connected {
                println!("Gmail connection OK");
                if let Some(email) = &probe.email {
                    println!("  Account:  {}", email);
                }
                if let Some(total) = probe.total_messages {
                    println!("  Messages: {}", total);
                }
            } else {
                println!("Gmail not connected");
                if let Some(error) = &probe.error {
                    println!("  Error: {}", error);
                }
            }
        }
    }

    Ok(())
}

fn print_job(job: &JobApplication) {
    println!("Application #{}", job.id);
    println!("Company: {}", job.company);
    println!("Position: {}", job.position);
    println!("Status: {}", job.status.label());
    let optional = [
        ("Location", &job.location),
        ("Salary", &job.salary_range),
        ("Source", &job.source),
        ("URL", &job.job_url),
        ("Email ID", &job.email_id),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    println!("Applied: {}", applied_label(job));
    println!("Created: {}", job.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", job.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(notes) = &job.notes {
        println!("\n--- Notes ---\n{}", textwrap::fill(notes, 80));
    }
}

fn applied_label(job: &JobApplication) -> String {
    job.applied_date
        .map(|d| form::format_date(d.date_naive()))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
