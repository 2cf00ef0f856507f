mod backend;
mod commands;
mod config;
mod firebase_auth;
mod firestore;
mod server;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::backend::Connection;
use crate::commands::{
    cmd_chart, cmd_delete, cmd_food, cmd_history, cmd_login, cmd_logout, cmd_show, cmd_weight,
    cmd_whoami,
};
use crate::config::Config;
use crate::session::Backend;
use weighlog_core::error::{Locale, LogError};

#[derive(Parser)]
#[command(
    name = "weighlog",
    version,
    about = "A personal weight and food diary",
    long_about = "A personal weight and food diary.\n\nLog your weight and meals per day, \
                  see your trend and history, and keep the data locally or in Firebase."
)]
struct Cli {
    /// Where the log lives when signing in
    #[arg(long, global = true, value_enum, env = "WEIGHLOG_BACKEND", default_value = "local")]
    backend: Backend,
    /// Language for error messages: en, zh-tw
    #[arg(
        long,
        global = true,
        env = "WEIGHLOG_LANG",
        default_value = "en",
        value_parser = parse_locale
    )]
    lang: Locale,
    #[command(subcommand)]
    command: Commands,
}

fn parse_locale(s: &str) -> Result<Locale> {
    Locale::parse(s)
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Account password, Firebase backend only (prompted if omitted)
        #[arg(long, env = "WEIGHLOG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Display name for a new local account
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out and forget the session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show who is signed in
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record the weight (kg) for a day
    Weight {
        /// Weight in kg, e.g. 82.5
        value: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a food item to a day
    Food {
        /// What you ate
        text: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "breakfast")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a food item from a day, by its number in history or its exact text
    Delete {
        /// Date of the entry
        date: String,
        /// Item number from history (1, 2, ...) or the text, e.g. "lunch: ramen"
        item: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current weight and history
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every day, newest first
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plot weight over time
    Chart {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server for the signed-in user
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let locale = cli.lang;

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<LogError>() {
            Some(log_err) => {
                tracing::debug!("{e:#}");
                eprintln!("Error: {}", log_err.alert(locale));
            }
            None => eprintln!("Error: {e:#}"),
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Login {
            email,
            password,
            name,
            json,
        } => cmd_login(&config, cli.backend, email, password, name, json).await,
        Commands::Logout { json } => cmd_logout(&config, json).await,
        Commands::Whoami { json } => cmd_whoami(&config, json),
        Commands::Weight { value, date, json } => {
            let conn = Connection::open(&config).await?;
            cmd_weight(&conn, &value, date, json).await
        }
        Commands::Food {
            text,
            meal,
            date,
            json,
        } => {
            let conn = Connection::open(&config).await?;
            cmd_food(&conn, &text, &meal, date, json).await
        }
        Commands::Delete {
            date,
            item,
            yes,
            json,
        } => {
            let conn = Connection::open(&config).await?;
            cmd_delete(&conn, &date, &item, yes, json).await
        }
        Commands::Show { json } => cmd_show(&Connection::open(&config).await?, json).await,
        Commands::History { json } => cmd_history(&Connection::open(&config).await?, json).await,
        Commands::Chart { json } => cmd_chart(&Connection::open(&config).await?, json).await,
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let conn = Connection::open(&config).await?;
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?)
            };
            let user = conn.user().clone();
            server::start_server(conn.service, user, cli.lang, port, &bind, api_key).await
        }
    }
}
