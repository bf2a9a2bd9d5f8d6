use std::error::Error;

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use engine::{Actor, Engine, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

/// Identity recorded for operations run from the command line.
const OPERATOR_ID: &str = "relief_admin";

#[derive(Parser, Debug)]
#[command(name = "relief_admin")]
#[command(about = "Operator utilities for Relief Desk (funding repair, dev tokens)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./relief_desk.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Campaign(Campaign),
    Token(Token),
}

#[derive(Args, Debug)]
struct Campaign {
    #[command(subcommand)]
    command: CampaignCommand,
}

#[derive(Subcommand, Debug)]
enum CampaignCommand {
    /// Recompute `current_amount` from the donation ledger and fix drift.
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// Only this campaign; all campaigns when omitted.
    #[arg(long)]
    campaign_id: Option<String>,
}

#[derive(Args, Debug)]
struct Token {
    #[command(subcommand)]
    command: TokenCommand,
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a bearer token for local development.
    Issue(TokenIssueArgs),
}

#[derive(Args, Debug)]
struct TokenIssueArgs {
    #[arg(long)]
    user_id: String,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, default_value = "editor")]
    role: String,
    #[arg(long, default_value_t = 24)]
    ttl_hours: i64,
    #[arg(long, env = "RELIEF_DESK__SERVER__JWT_SECRET")]
    secret: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Campaign(Campaign {
            command: CampaignCommand::Reconcile(args),
        }) => {
            let db = connect_db(&cli.database_url).await?;
            let engine = Engine::builder().database(db).build().await?;
            let operator = Actor::new(OPERATOR_ID, Role::Admin);

            let corrections = engine
                .reconcile_campaign_funding(args.campaign_id.as_deref(), &operator)
                .await?;
            if corrections.is_empty() {
                println!("all campaign counters match the donation ledger");
            }
            for correction in corrections {
                println!(
                    "corrected campaign {}: {} -> {}",
                    correction.campaign_id, correction.stored, correction.recomputed
                );
            }
        }
        Command::Token(Token {
            command: TokenCommand::Issue(args),
        }) => {
            let role = match Role::try_from(args.role.as_str()) {
                Ok(role) => role,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };
            let token = server::issue_token(
                &args.secret,
                &args.user_id,
                args.username.as_deref(),
                role,
                Duration::hours(args.ttl_hours),
            )?;
            println!("{token}");
        }
    }

    Ok(())
}
