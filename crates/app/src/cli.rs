use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Currency, GroupRole, Money, Polarity};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cashflow")]
#[command(about = "Track personal and group wallets from the command line")]
pub struct Cli {
    /// Database connection string, overrides the configured database.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Username of the acting user.
    #[arg(long, short, global = true, env = "CASHFLOW_USER")]
    pub user: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    User(User),
    Group(Group),
    Category(Category),
    Tx(Tx),
    Wallet(Wallet),
}

#[derive(Args, Debug)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create an account and its first wallet. The password is prompted.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Check an email/password pair. The password is prompted.
    Verify {
        #[arg(long)]
        email: String,
    },
    /// List every registered user.
    List,
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create a group and its shared wallet, owned by the acting user.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Username to add as member, repeatable.
        #[arg(long = "member")]
        members: Vec<String>,
    },
    AddMember {
        #[arg(long)]
        group: Uuid,
        #[arg(long)]
        member: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Member)]
        role: RoleArg,
    },
    RemoveMember {
        #[arg(long)]
        group: Uuid,
        #[arg(long)]
        member: String,
    },
    Members {
        #[arg(long)]
        group: Uuid,
    },
    /// List the groups the acting user belongs to.
    List,
    /// Show a group with its wallet and members.
    Show {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct Category {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type", value_enum)]
        polarity: PolarityArg,
        /// Share the category with a group instead of keeping it private.
        #[arg(long)]
        group: Option<Uuid>,
    },
    List,
    /// Rename a private or group category. Its type is kept.
    Rename {
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Delete a category no transaction refers to.
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct Tx {
    #[command(subcommand)]
    pub command: TxCommand,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    Create {
        #[arg(long)]
        wallet: Uuid,
        /// Category name or id.
        #[arg(long)]
        category: String,
        #[arg(long)]
        title: String,
        /// Positive decimal amount, e.g. `12.50`.
        #[arg(long, value_parser = parse_positive_amount)]
        amount: Money,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 timestamp, defaults to now.
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_positive_amount)]
        amount: Option<Money>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
    },
    Delete {
        id: Uuid,
        #[arg(long)]
        wallet: Uuid,
    },
    Show {
        id: Uuid,
    },
    List {
        #[arg(long)]
        wallet: Option<Uuid>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args, Debug)]
pub struct Wallet {
    #[command(subcommand)]
    pub command: WalletCommand,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Open another personal wallet.
    Create {
        #[arg(long)]
        name: String,
        /// ISO code: IDR, EUR or USD.
        #[arg(long, value_parser = parse_currency, default_value = "IDR")]
        currency: Currency,
    },
    List,
    /// Show a wallet and its latest transactions.
    Show {
        id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Rebuild the cached balance from the ledger.
    Recompute {
        id: Uuid,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Admin,
    Member,
    Guest,
}

impl From<RoleArg> for GroupRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => GroupRole::Admin,
            RoleArg::Member => GroupRole::Member,
            RoleArg::Guest => GroupRole::Guest,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolarityArg {
    Income,
    Expense,
}

impl From<PolarityArg> for Polarity {
    fn from(value: PolarityArg) -> Self {
        match value {
            PolarityArg::Income => Polarity::Income,
            PolarityArg::Expense => Polarity::Expense,
        }
    }
}

fn parse_positive_amount(raw: &str) -> Result<Money, String> {
    let amount: Money = raw.parse().map_err(|err: engine::EngineError| err.to_string())?;
    if !amount.is_positive() {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|err| format!("invalid date, expected RFC 3339: {err}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn amounts_must_be_positive() {
        assert_eq!(parse_positive_amount("12.50").unwrap(), Money::new(1250));
        assert!(parse_positive_amount("0").is_err());
        assert!(parse_positive_amount("-3").is_err());
        assert!(parse_positive_amount("abc").is_err());
    }

    #[test]
    fn parses_tx_create() {
        let cli = Cli::try_parse_from([
            "cashflow",
            "--user",
            "alice",
            "tx",
            "create",
            "--wallet",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "--category",
            "Food",
            "--title",
            "Lunch",
            "--amount",
            "200",
            "--date",
            "2026-02-02T15:04:05Z",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        let Command::Tx(Tx {
            command: TxCommand::Create { amount, date, .. },
        }) = cli.command
        else {
            panic!("expected tx create");
        };
        assert_eq!(amount, Money::new(20_000));
        assert!(date.is_some());
    }

    #[test]
    fn parses_wallet_create_currency() {
        let cli = Cli::try_parse_from([
            "cashflow", "-u", "alice", "wallet", "create", "--name", "Travel", "--currency", "eur",
        ])
        .unwrap();
        let Command::Wallet(Wallet {
            command: WalletCommand::Create { name, currency },
        }) = cli.command
        else {
            panic!("expected wallet create");
        };
        assert_eq!(name, "Travel");
        assert_eq!(currency, Currency::Eur);

        let cli =
            Cli::try_parse_from(["cashflow", "wallet", "create", "--name", "Cash"]).unwrap();
        let Command::Wallet(Wallet {
            command: WalletCommand::Create { currency, .. },
        }) = cli.command
        else {
            panic!("expected wallet create");
        };
        assert_eq!(currency, Currency::Idr);

        assert!(
            Cli::try_parse_from(["cashflow", "wallet", "create", "--name", "X", "--currency", "JPY"])
                .is_err()
        );
    }
}
