mod body;
mod config;
mod date;
mod enrich;
mod error;
mod labels;
mod providers;
mod store;
mod summarizer;
mod tasks;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mail-tasks")]
#[command(about = "Turn labelled mail into a task list with AI summaries")]
struct Cli {
    /// Mailbox bearer token (overrides the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Summarizer API key (overrides the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or update settings
    Config {
        /// Store the mailbox bearer token
        #[arg(long)]
        token: Option<String>,
        /// Store the summarizer API key
        #[arg(long)]
        api_key: Option<String>,
        /// Record an OAuth scope granted to the token (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },
    /// List user labels, most recently active first
    Labels,
    /// Show the newest messages of a label as tasks and summarize the latest ones
    Tasks {
        /// Label id or name
        label: String,
    },
    /// Show how a label's tasks spread over days
    Calendar {
        /// Label id or name
        label: String,
        /// Only list the tasks of this day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let overrides = commands::Overrides {
        token: cli.token,
        api_key: cli.api_key,
    };

    match cli.command {
        Commands::Config {
            token,
            api_key,
            scopes,
        } => {
            commands::config(token, api_key, scopes)?;
        }
        Commands::Labels => {
            commands::labels(&overrides).await?;
        }
        Commands::Tasks { label } => {
            commands::tasks(&overrides, &label).await?;
        }
        Commands::Calendar { label, day } => {
            commands::calendar(&overrides, &label, day.as_deref()).await?;
        }
    }

    Ok(())
}

mod commands {
    use crate::config::Config;
    use crate::labels::{Label, LabelSync};
    use crate::providers::gmail::GmailClient;
    use crate::providers::MailboxProvider;
    use crate::store::{Store, TaskBoard};
    use crate::summarizer::{GeminiSummarizer, Summarizer};
    use crate::tasks::{Synced, Task, TaskSync};
    use anyhow::{Context, Result};
    use chrono::{Local, NaiveDate};
    use std::collections::HashSet;
    use std::sync::Arc;

    pub struct Overrides {
        pub token: Option<String>,
        pub api_key: Option<String>,
    }

    /// Clients and state shared by one command run.
    struct Session {
        mailbox: Arc<dyn MailboxProvider>,
        summarizer: Arc<dyn Summarizer>,
        store: Store,
    }

    impl Session {
        fn open(overrides: &Overrides) -> Result<Self> {
            let cfg = Config::load()?;
            let token = configured(&overrides.token, &cfg.access_token)
                .context("No mailbox token. Run 'mail-tasks config --token <token>' first")?;
            let api_key = configured(&overrides.api_key, &cfg.api_key);
            if api_key.is_none() {
                eprintln!("Warning: no summarizer API key configured, tasks won't get summaries");
            }

            Ok(Self {
                mailbox: Arc::new(GmailClient::with_base_url(&token, cfg.mailbox_url())),
                summarizer: Arc::new(GeminiSummarizer::with_endpoint(api_key, cfg.summarizer_url())),
                store: Store::new(),
            })
        }

        async fn sync_labels(&self) -> Result<Vec<Label>> {
            LabelSync::new(self.mailbox.clone(), self.store.clone())
                .sync()
                .await
        }

        async fn sync_tasks(&self, label: &str) -> Result<Synced> {
            let labels = self.sync_labels().await?;
            let label_id = resolve_label(&labels, label);
            TaskSync::new(self.mailbox.clone(), self.summarizer.clone(), self.store.clone())
                .sync(&label_id)
                .await
        }
    }

    /// Flag value over stored value; blank strings count as unset.
    fn configured(flag: &Option<String>, stored: &Option<String>) -> Option<String> {
        flag.clone()
            .or_else(|| stored.clone())
            .filter(|v| !v.trim().is_empty())
    }

    /// Match by id first, then by case-insensitive name; unknown input is taken as an id.
    fn resolve_label(labels: &[Label], wanted: &str) -> String {
        labels
            .iter()
            .find(|l| l.id == wanted)
            .or_else(|| labels.iter().find(|l| l.name.eq_ignore_ascii_case(wanted)))
            .map(|l| l.id.clone())
            .unwrap_or_else(|| wanted.to_string())
    }

    pub fn config(token: Option<String>, api_key: Option<String>, scopes: Vec<String>) -> Result<()> {
        let mut cfg = Config::load()?;

        if token.is_none() && api_key.is_none() && scopes.is_empty() {
            println!("Current settings:");
            println!("  token: {}", if cfg.access_token.is_some() { "set" } else { "not set" });
            println!("  api_key: {}", if cfg.api_key.is_some() { "set" } else { "not set" });
            println!("  scopes: {:?}", cfg.scopes);
            println!("  mailbox_url: {}", cfg.mailbox_url());
            println!("  summarizer_url: {}", cfg.summarizer_url());
            return Ok(());
        }

        if let Some(token) = token {
            cfg.access_token = Some(token);
            println!("Mailbox token saved.");
        }
        if let Some(key) = api_key {
            cfg.api_key = Some(key);
            println!("Summarizer API key saved.");
        }
        if !scopes.is_empty() {
            println!("Scopes set to: {:?}", scopes);
            cfg.scopes = scopes;
        }
        cfg.save()
    }

    pub async fn labels(overrides: &Overrides) -> Result<()> {
        let session = Session::open(overrides)?;
        let labels = session.sync_labels().await?;

        if labels.is_empty() {
            println!("No user labels.");
        }
        for label in &labels {
            let latest = label
                .latest_message_at
                .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<17} {} ({})", latest, label.name, label.id);
        }
        Ok(())
    }

    pub async fn tasks(overrides: &Overrides, label: &str) -> Result<()> {
        let session = Session::open(overrides)?;
        let mut updates = session.store.subscribe_tasks();
        let synced = session.sync_tasks(label).await?;

        match synced.tasks.first() {
            Some(first) => println!("{} ({} tasks)", first.label_name, synced.tasks.len()),
            None => println!("No messages under this label."),
        }
        for task in &synced.tasks {
            print_task(task);
        }

        let Some(mut enrichment) = synced.enrichment else {
            return Ok(());
        };

        let mut printed = HashSet::new();
        let _ = updates.borrow_and_update();
        loop {
            tokio::select! {
                done = &mut enrichment => {
                    let attached = done.context("Summary task panicked")?;
                    log::info!("{} summaries attached", attached);
                    break;
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let board = updates.borrow_and_update().clone();
                    print_new_summaries(&board, &mut printed);
                }
            }
        }
        print_new_summaries(&session.store.tasks(), &mut printed);
        Ok(())
    }

    pub async fn calendar(overrides: &Overrides, label: &str, day: Option<&str>) -> Result<()> {
        let day = day
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .context("Day must look like 2024-05-10")?;

        let session = Session::open(overrides)?;
        let synced = session.sync_tasks(label).await?;
        if let Some(enrichment) = synced.enrichment {
            enrichment.abort();
        }

        match day {
            Some(day) => {
                let tasks = session.store.tasks_on(day, &Local);
                println!("{}: {} tasks", day.format("%Y-%m-%d (%a)"), tasks.len());
                for task in &tasks {
                    print_task(task);
                }
            }
            None => {
                for (day, count) in session.store.task_counts(&Local) {
                    println!("{}  {}", day.format("%Y-%m-%d (%a)"), count);
                }
            }
        }
        Ok(())
    }

    fn print_task(task: &Task) {
        let status = if task.completed { "✓" } else { " " };
        println!(
            "{} {} | {} | {}",
            status,
            task.created_at.with_timezone(&Local).format("%m-%d %H:%M"),
            task.sender.chars().take(30).collect::<String>(),
            task.title.chars().take(60).collect::<String>()
        );
    }

    fn print_new_summaries(board: &TaskBoard, printed: &mut HashSet<String>) {
        for task in &board.tasks {
            if let Some(summary) = &task.ai_summary {
                if printed.insert(task.id.clone()) {
                    println!("\n── {}\n{}", task.title, summary);
                }
            }
        }
    }

}
