use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use users_etl::cli;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Users ETL: load users.csv into a SQLite users table, once or on a schedule
#[derive(Parser)]
#[command(name = "users-etl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from, if it exists
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// DAG configuration file (YAML); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input CSV file, overriding the configured path
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// SQLite database file, overriding the configured path
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline once, now
    Run,

    /// Create the users table and clear it
    Setup,

    /// Run the pipeline on its schedule until interrupted
    Schedule,

    /// Print the task order and the effective configuration
    Show,

    /// Print the rows currently in the users table
    Users,

    /// Write a default configuration file
    InitConfig {
        /// The configuration file to create
        #[arg(default_value = "dag.yml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    if std::path::Path::new(&args.env).exists() {
        dotenvy::from_filename(&args.env)?;
    }

    let log_level = match args.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let config = || {
        cli::load_config(
            args.config.as_deref(),
            args.input.clone(),
            args.database.clone(),
        )
    };

    match &args.command {
        Commands::Run => {
            let run = cli::run_once(config()?).await?;
            let run_id = run.run_id.clone();
            let count = run.into_result()?;
            log::info!(
                "✓ {} loaded {} user record(s)",
                run_id.bright_black(),
                count.cyan()
            );
        }
        Commands::Setup => cli::setup_database(&config()?)?,
        Commands::Schedule => cli::schedule(config()?).await?,
        Commands::Show => print!("{}", cli::describe(&config()?)?),
        Commands::Users => {
            let config = config()?;
            let users = cli::list_users(&config)?;
            for user in &users {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    user.record.id,
                    user.record.first_name,
                    user.record.last_name,
                    user.record.email,
                    user.record.gender,
                    user.record.ip_address,
                    user.created_at.bright_black()
                );
            }
            log::info!(
                "{} user(s) in {}",
                users.len(),
                config.paths.database.display()
            );
        }
        Commands::InitConfig { path } => cli::init_config(path)?,
    }

    Ok(())
}
