use std::{fs::File, path::PathBuf};

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, LateFeePolicy, Money, NewGroupCmd, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use uuid::Uuid;

use error::{AdminError, ResultAdmin};

mod error;
mod import;
mod prompt;

/// Operator name recorded on entries written by this tool.
const OPERATOR: &str = "gsla_admin";

#[derive(Parser, Debug)]
#[command(name = "gsla_admin")]
#[command(about = "Admin utilities for the GSLA ledger (bootstrap, imports, batch runs)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./gsla.db?mode=rwc")]
    database_url: String,

    /// Log level for this tool and the engine.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
    Member(Member),
    Loans(Loans),
    Report(Report),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create an operator account; the password is prompted.
    Create(UserCreateArgs),
    /// Let a group leader manage a group.
    Grant(UserGrantArgs),
    /// Take a group away from a group leader.
    Revoke(UserGrantArgs),
    /// Accounts with their roles and groups.
    List,
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// super-admin, admin or group-leader
    #[arg(long, default_value = "group-leader", value_parser = parse_role)]
    role: Role,
}

#[derive(Args, Debug)]
struct UserGrantArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    group: Uuid,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Create a group and open its first cycle.
    Create(GroupCreateArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    name: String,
    /// Value of one share, e.g. `500` or `1,000 RWF`.
    #[arg(long, value_parser = parse_money)]
    share_value: Money,
    /// First day of the first cycle (YYYY-MM-DD).
    #[arg(long)]
    cycle_start: NaiveDate,
    /// Monthly loan interest, in percent.
    #[arg(long, default_value_t = 0.0)]
    interest_rate: f64,
    #[arg(long, default_value = "")]
    branch: String,
    #[arg(long, default_value = "")]
    location: String,
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    /// Load members from a CSV sheet.
    Import(MemberImportArgs),
}

#[derive(Args, Debug)]
struct MemberImportArgs {
    #[arg(long)]
    group: Uuid,
    file: PathBuf,
}

#[derive(Args, Debug)]
struct Loans {
    #[command(subcommand)]
    command: LoansCommand,
}

#[derive(Subcommand, Debug)]
enum LoansCommand {
    /// Charge a penalty on every overdue loan of a group.
    LateFees(LateFeesArgs),
}

#[derive(Args, Debug)]
struct LateFeesArgs {
    #[arg(long)]
    group: Uuid,
    /// Flat fee per overdue loan.
    #[arg(
        long,
        value_parser = parse_money,
        conflicts_with = "percentage",
        required_unless_present = "percentage"
    )]
    fixed: Option<Money>,
    /// Fee as a percentage of the remaining balance.
    #[arg(long)]
    percentage: Option<f64>,
    /// Run date (default: today).
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct Report {
    #[command(subcommand)]
    command: ReportCommand,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Totals and ledger figures of a group.
    Group(GroupArg),
    /// Share-out preview for the open cycle.
    ShareOut(GroupArg),
}

#[derive(Args, Debug)]
struct GroupArg {
    #[arg(long)]
    group: Uuid,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    let normalized = raw.trim().to_uppercase().replace('-', "_");
    Role::try_from(normalized.as_str()).map_err(|err| err.to_string())
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> ResultAdmin<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(database_url: &str) -> ResultAdmin<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(engine: &Engine, command: Command) -> ResultAdmin<()> {
    match command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt::new_password()?;
            let user = engine
                .create_user(&args.username, &password, args.role)
                .await?;
            println!("created user: {} ({})", user.username, user.role.as_str());
        }
        Command::User(User {
            command: UserCommand::Grant(args),
        }) => {
            engine.grant_group(&args.username, args.group).await?;
            println!("{} now manages group {}", args.username, args.group);
        }
        Command::User(User {
            command: UserCommand::Revoke(args),
        }) => {
            engine.revoke_group(&args.username, args.group).await?;
            println!("{} no longer manages group {}", args.username, args.group);
        }
        Command::User(User {
            command: UserCommand::List,
        }) => {
            for user in engine.list_users().await? {
                let caller = engine.caller(&user.username).await?;
                let mut groups: Vec<String> =
                    caller.managed_groups.iter().map(Uuid::to_string).collect();
                groups.sort();
                println!(
                    "{}\t{}\t{}",
                    user.username,
                    user.role.as_str(),
                    groups.join(",")
                );
            }
        }
        Command::Group(Group {
            command: GroupCommand::Create(args),
        }) => {
            let cmd = NewGroupCmd::new(args.name, args.share_value.francs(), args.cycle_start)
                .interest_rate(args.interest_rate)
                .branch(args.branch)
                .location(args.location);
            let group = engine.create_group(cmd).await?;
            println!("created group: {} ({})", group.name, group.id);
        }
        Command::Member(Member {
            command: MemberCommand::Import(args),
        }) => {
            let rows = import::read_members(File::open(&args.file)?)?;
            if rows.is_empty() {
                return Err(AdminError::InvalidArgument(format!(
                    "{} has no member rows",
                    args.file.display()
                )));
            }
            let report = engine.import_members(args.group, rows).await?;
            for failure in &report.failures {
                tracing::warn!("row {}: {}", failure.index + 1, failure.error);
            }
            println!(
                "imported {} of {} members",
                report.succeeded, report.attempted
            );
        }
        Command::Loans(Loans {
            command: LoansCommand::LateFees(args),
        }) => {
            let policy = match (args.fixed, args.percentage) {
                (Some(amount), None) => LateFeePolicy::Fixed(amount.francs()),
                (None, Some(rate)) => LateFeePolicy::Percentage(rate),
                _ => {
                    return Err(AdminError::InvalidArgument(
                        "pass exactly one of --fixed or --percentage".to_string(),
                    ));
                }
            };
            let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
            let report = engine
                .apply_late_fees(args.group, policy, today, OPERATOR)
                .await?;
            for failure in &report.failures {
                tracing::warn!("loan #{}: {}", failure.index, failure.error);
            }
            println!(
                "charged {} loans, {} in fees",
                report.count,
                Money::new(report.total_fees)
            );
        }
        Command::Report(Report {
            command: ReportCommand::Group(args),
        }) => print_json(&engine.group_summary(args.group).await?)?,
        Command::Report(Report {
            command: ReportCommand::ShareOut(args),
        }) => print_json(&engine.share_out_preview(args.group).await?)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AdminError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "gsla_admin={level},engine={level}",
            level = cli.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    run(&engine, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_accept_cli_spelling() {
        assert_eq!(parse_role("group-leader"), Ok(Role::GroupLeader));
        assert_eq!(parse_role("SUPER_ADMIN"), Ok(Role::SuperAdmin));
        assert_eq!(parse_role("admin"), Ok(Role::Admin));
        assert!(parse_role("treasurer").is_err());
    }

    #[test]
    fn cli_parses_late_fee_run() {
        let cli = Cli::try_parse_from([
            "gsla_admin",
            "loans",
            "late-fees",
            "--group",
            "6f1c2b9e-5d6a-4c1e-9a43-0c7d2f7b8e11",
            "--fixed",
            "500",
            "--today",
            "2026-05-01",
        ])
        .unwrap();

        let Command::Loans(Loans {
            command: LoansCommand::LateFees(args),
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(args.fixed, Some(Money::new(500)));
        assert_eq!(args.percentage, None);
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2026, 5, 1));
    }

    #[test]
    fn cli_rejects_two_fee_policies() {
        let parsed = Cli::try_parse_from([
            "gsla_admin",
            "loans",
            "late-fees",
            "--group",
            "6f1c2b9e-5d6a-4c1e-9a43-0c7d2f7b8e11",
            "--fixed",
            "500",
            "--percentage",
            "2.5",
        ]);
        assert!(parsed.is_err());
    }
}
