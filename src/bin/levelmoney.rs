//! CLI binary for browsing Level Money accounts and monthly spending.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use levelmoney_rs::credentials::Credentials;
use levelmoney_rs::error::LevelMoneyError;
use levelmoney_rs::level_money::LevelMoneyBlocking;
use levelmoney_rs::models::{Account, Money, MonthKey, RawTransaction, from_centocents};
use levelmoney_rs::transaction_log::{LogOptions, TransactionLog};
use owo_colors::OwoColorize;

/// Environment variable naming the credentials directory.
const CREDENTIALS_DIR_ENV: &str = "LEVELMONEY_CREDENTIALS_DIR";

/// Credentials directory used when neither flag nor env var is set.
const DEFAULT_CREDENTIALS_DIR: &str = "data";

/// Level Money CLI: list accounts and summarize monthly spending.
#[derive(Debug, Parser)]
#[command(name = "levelmoney", version, about)]
struct Cli {
    /// Directory holding `.api_token`, `.auth_token` and `.userid`.
    #[arg(long, global = true, value_name = "DIR")]
    credentials_dir: Option<PathBuf>,
    /// Override the API base URL.
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List linked accounts.
    Accounts,
    /// Show spent and income per month for one account.
    Log(LogArgs),
    /// List projected transactions for a month.
    Projected {
        /// Calendar year (default: current).
        #[arg(long, requires = "month")]
        year: Option<i32>,
        /// Month of the year, 1-12 (default: current).
        #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

/// Arguments for the `log` subcommand.
#[derive(Debug, Args)]
struct LogArgs {
    /// Institution id of the account.
    institution_id: String,
    /// Exclude merchants matching this regular expression.
    #[arg(long, value_name = "REGEX")]
    ignore: Option<String>,
    /// Include this month's projected transactions.
    #[arg(long)]
    crystal_ball: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl LogArgs {
    /// Converts CLI flags into log options.
    fn options(&self) -> LogOptions {
        let options = LogOptions::new().crystal_ball(self.crystal_ball);
        match self.ignore.as_deref() {
            Some(pattern) => options.ignore(pattern),
            None => options,
        }
    }
}

/// Picks the credentials directory: flag, then environment, then `./data`.
fn credentials_dir(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|val| !val.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_DIR))
}

/// Prints `err` to stderr in the CLI's error style.
fn report(context: &str, err: &LevelMoneyError) -> io::Result<ExitCode> {
    tracing::debug!(error = %err, "{context}");
    writeln!(
        io::stderr().lock(),
        "{} {}",
        "error:".red().bold(),
        err.user_message()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let dir = credentials_dir(cli.credentials_dir, std::env::var(CREDENTIALS_DIR_ENV).ok());
    let credentials = match Credentials::from_dir(&dir) {
        Ok(credentials) => credentials,
        Err(err) => {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "{} {err}", "error:".red().bold())?;
            writeln!(
                stderr,
                "  {} pass --credentials-dir or set {}",
                "hint:".cyan(),
                CREDENTIALS_DIR_ENV
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut builder = LevelMoneyBlocking::builder().credentials(credentials);
    if let Some(url) = cli.base_url {
        builder = builder.base_url(url);
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(err) => return report("failed to build client", &err),
    };

    dispatch(&client, cli.command)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch(client: &LevelMoneyBlocking, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Accounts => cmd_accounts(client),
        Command::Log(args) => cmd_log(client, &args),
        Command::Projected { year, month } => {
            let current = MonthKey::current();
            cmd_projected(
                client,
                year.unwrap_or_else(|| current.year()),
                month.unwrap_or_else(|| current.month()),
            )
        }
    }
}

/// Fetches the dataset behind a spinner.
fn load(client: &LevelMoneyBlocking) -> Result<(), LevelMoneyError> {
    let spinner = make_spinner("Fetching accounts and transactions...");
    let result = client.refresh();
    spinner.finish_and_clear();
    result.map(|_snapshot| ())
}

/// Executes the `accounts` subcommand.
fn cmd_accounts(client: &LevelMoneyBlocking) -> io::Result<ExitCode> {
    if let Err(err) = load(client) {
        return report("failed to load dataset", &err);
    }
    match client.accounts() {
        Ok(accounts) => {
            print_accounts_table(&accounts)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read accounts", &err),
    }
}

/// Executes the `log` subcommand.
fn cmd_log(client: &LevelMoneyBlocking, args: &LogArgs) -> io::Result<ExitCode> {
    if let Err(err) = load(client) {
        return report("failed to load dataset", &err);
    }
    let log = match client.build_log(&args.institution_id, &args.options()) {
        Ok(log) => log,
        Err(err) => return report("failed to build log", &err),
    };
    if args.json {
        print_log_json(&log)?;
    } else {
        let name = client
            .resolve(&args.institution_id)
            .map_or_else(|_| args.institution_id.clone(), |found| found.display_name);
        print_log_table(&name, &log)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `projected` subcommand.
fn cmd_projected(client: &LevelMoneyBlocking, year: i32, month: u32) -> io::Result<ExitCode> {
    let spinner = make_spinner("Querying projected transactions...");
    let result = client.client().projected_transactions_for_month(year, month);
    spinner.finish_and_clear();
    match result {
        Ok(response) => {
            print_projected_table(&response.transactions)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to fetch projected transactions", &err),
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints accounts in a table.
fn print_accounts_table(accounts: &[Account]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if accounts.is_empty() {
        writeln!(out, "{}", "No accounts found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Institution ID").fg(Color::Cyan),
        Cell::new("Account ID").fg(Color::Cyan),
        Cell::new("Balance").fg(Color::Cyan),
    ]);

    for acc in accounts {
        let balance = acc
            .balance_amount()
            .map_or_else(|| "\u{2014}".to_owned(), |bal| Money::new(bal).to_string());
        _ = table.add_row(vec![
            Cell::new(acc.display_name()),
            Cell::new(&acc.institution_id),
            Cell::new(&acc.account_id),
            Cell::new(balance),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Accounts".green().bold(),
        format_args!("({})", accounts.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints a monthly log in a table with a trailing average row.
fn print_log_table(name: &str, log: &TransactionLog) -> io::Result<()> {
    let mut out = io::stdout().lock();

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Month").fg(Color::Cyan),
        Cell::new("Spent").fg(Color::Cyan),
        Cell::new("Income").fg(Color::Cyan),
    ]);

    for (month, summary) in log.months() {
        _ = table.add_row(vec![
            Cell::new(month),
            Cell::new(summary.spent).fg(Color::Red),
            Cell::new(summary.income).fg(Color::Green),
        ]);
    }
    let average = log.average();
    _ = table.add_row(vec![
        Cell::new("Average").fg(Color::Cyan),
        Cell::new(average.spent),
        Cell::new(average.income),
    ]);

    writeln!(
        out,
        "{} {}",
        name.green().bold(),
        format_args!("({} months)", log.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints a monthly log as pretty JSON.
fn print_log_json(log: &TransactionLog) -> io::Result<()> {
    let json = serde_json::to_string_pretty(log).map_err(io::Error::other)?;
    writeln!(io::stdout().lock(), "{json}")
}

/// Prints projected transactions in a table.
fn print_projected_table(transactions: &[RawTransaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if transactions.is_empty() {
        writeln!(out, "{}", "No projected transactions.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("Account").fg(Color::Cyan),
        Cell::new("Merchant").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);

    for tx in transactions {
        let account = tx
            .account_id
            .as_ref()
            .map_or("\u{2014}", |id| id.as_inner());
        let amount_cell = match tx.amount.as_i64().map(from_centocents) {
            Some(amount) if amount.is_sign_negative() => {
                Cell::new(Money::new(amount.abs())).fg(Color::Red)
            }
            Some(amount) => Cell::new(Money::new(amount)).fg(Color::Green),
            None => Cell::new(&tx.amount).fg(Color::DarkGrey),
        };
        _ = table.add_row(vec![
            Cell::new(&tx.transaction_time),
            Cell::new(account),
            Cell::new(&tx.merchant),
            amount_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Projected Transactions".green().bold(),
        format_args!("({})", transactions.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
