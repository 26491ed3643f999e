mod assistant;
mod cli;
mod config;
mod logging;
mod matcher;
mod store;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use cli::commands;
use cli::output::OutputEvent;
use std::path::PathBuf;

fn brand_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(matcher::KNOWN_BRANDS.iter().copied())
}

#[derive(Parser)]
#[command(name = "liftassist")]
#[command(about = "Diagnostic assistant for elevator-repair technicians")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (merged over user and project config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key-value database path (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Act as this user (e-mail)
    #[arg(long = "as", global = true, requires = "password")]
    user: Option<String>,

    /// Password for --as
    #[arg(long, global = true, requires = "user")]
    password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write logs to the default log file
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a problem description
    Analyze {
        /// Problem description
        #[arg(required = true)]
        problem: Vec<String>,

        /// Restrict matching to this brand (plus general knowledge)
        #[arg(long, value_parser = brand_parser())]
        brand: Option<String>,
    },

    /// Analyse a captured photo
    Photo {
        /// Image file
        path: PathBuf,
    },

    /// Mark a diagnostic resolved and learn from it
    Resolve {
        /// Diagnostic id
        id: u64,
    },

    /// Record the solution that actually fixed a diagnostic
    Correct {
        /// Diagnostic id
        id: u64,

        /// What fixed the problem
        solution: String,
    },

    /// Teach the assistant a problem/solution pair
    Learn {
        /// Problem description
        problem: String,

        /// Solution; sentences become steps
        solution: String,

        /// Brand the knowledge applies to (default: general)
        #[arg(long, value_parser = brand_parser())]
        brand: Option<String>,

        /// The intervention did not succeed
        #[arg(long)]
        failed: bool,
    },

    /// Search the knowledge base
    Search {
        query: String,

        #[arg(long, value_parser = brand_parser())]
        brand: Option<String>,
    },

    /// Show knowledge base and storage statistics
    Stats,

    /// List logged diagnostics
    Diagnostics,

    /// Check credentials
    Login { email: String, password: String },

    /// Manage users (admin)
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },

    /// List or manage documents
    Documents {
        #[command(subcommand)]
        command: DocumentsCommand,
    },

    /// Delete all stored data (admin)
    Wipe {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show configuration, storage and integration status
    Doctor,
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List users
    List {
        /// Only users with this role
        #[arg(long, value_parser = commands::parse_role)]
        role: Option<store::Role>,
    },

    /// Add a user
    Add {
        email: String,
        password: String,
        name: String,

        #[arg(long, default_value = "technicien", value_parser = commands::parse_role)]
        role: store::Role,

        /// Brand the technician specialises in
        #[arg(long)]
        specialty: Option<String>,
    },

    /// Delete a user
    Delete { id: u64 },
}

#[derive(Subcommand)]
enum DocumentsCommand {
    /// List documents
    List {
        #[arg(long, value_parser = brand_parser())]
        brand: Option<String>,
    },

    /// Add a document (admin)
    Add {
        name: String,

        #[arg(long, value_parser = brand_parser())]
        brand: String,

        /// Document type (manuel, schema, procedure...)
        #[arg(long, default_value = "manuel")]
        kind: String,
    },

    /// Delete a document (admin)
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = if cli.log {
        Some(logging::default_log_path()?)
    } else {
        cli.log_file.clone()
    };
    logging::init_logging(cli.debug, cli.quiet, log_file)?;

    let config = config::AssistConfig::load(None, cli.config.as_deref())?;
    let database = match cli.db {
        Some(ref path) => path.clone(),
        None => config.database_path()?,
    };

    let kv = store::KvStore::open(&database)
        .with_context(|| format!("opening {}", database.display()))?;
    let db = store::Database::open(kv)?;
    let mut assistant = assistant::Assistant::new(config, db);

    let handler = cli::create_handler(
        cli::OutputMode::from_flags(cli.json, cli.quiet),
        cli.debug,
    );
    let handler = handler.as_ref();
    handler.emit(OutputEvent::Debug {
        message: format!("Using database {}", database.display()),
    });

    if let (Some(email), Some(password)) = (&cli.user, &cli.password) {
        if let Err(e) = assistant.login(email, password) {
            handler.emit(OutputEvent::Error {
                error: e.to_string(),
            });
            std::process::exit(1);
        }
    }

    let code = match cli.command {
        Commands::Analyze { problem, brand } => {
            let problem = problem.join(" ");
            commands::analyze(&assistant, &problem, brand.as_deref(), handler).await?
        }
        Commands::Photo { path } => commands::photo(&assistant, &path, handler).await?,
        Commands::Resolve { id } => commands::resolve(&assistant, id, handler)?,
        Commands::Correct { id, solution } => {
            commands::correct(&assistant, id, &solution, handler)?
        }
        Commands::Learn {
            problem,
            solution,
            brand,
            failed,
        } => commands::learn(
            &assistant,
            &problem,
            &solution,
            !failed,
            brand.as_deref(),
            handler,
        )?,
        Commands::Search { query, brand } => {
            commands::search(&assistant, &query, brand.as_deref(), handler)?
        }
        Commands::Stats => commands::stats(&assistant, handler)?,
        Commands::Diagnostics => commands::diagnostics(&assistant, handler)?,
        Commands::Login { email, password } => {
            commands::login(&mut assistant, &email, &password, handler)?
        }
        Commands::Users { command } => match command {
            UsersCommand::List { role } => commands::list_users(&assistant, role, handler)?,
            UsersCommand::Add {
                email,
                password,
                name,
                role,
                specialty,
            } => commands::add_user(
                &assistant,
                store::NewUser {
                    email,
                    password,
                    name,
                    role,
                    specialty,
                },
                handler,
            )?,
            UsersCommand::Delete { id } => commands::delete_user(&assistant, id, handler)?,
        },
        Commands::Documents { command } => match command {
            DocumentsCommand::List { brand } => {
                commands::list_documents(&assistant, brand.as_deref(), handler)?
            }
            DocumentsCommand::Add { name, brand, kind } => commands::add_document(
                &assistant,
                store::NewDocument { name, brand, kind },
                handler,
            )?,
            DocumentsCommand::Delete { id } => {
                commands::delete_document(&assistant, id, handler)?
            }
        },
        Commands::Wipe { yes } => commands::wipe(&assistant, yes, handler)?,
        Commands::Doctor => commands::doctor(&assistant, &database, handler)?,
    };

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
