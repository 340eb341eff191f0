use std::{error::Error, process::ExitCode};

use chrono::Utc;
use clap::Parser;
use engine::{
    CreateGroupCmd, CreateTransactionCmd, Engine, EngineError, TransactionListFilter,
    UpdateTransactionCmd,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use uuid::Uuid;

use cli::{CategoryCommand, Cli, Command, GroupCommand, TxCommand, UserCommand, WalletCommand};

mod cli;
mod output;
mod prompt;
mod settings;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<EngineError>() {
                Some(engine_err) => eprintln!("error [{}]: {engine_err}", engine_err.kind()),
                None => eprintln!("error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cashflow={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database_url());
    let db = connect_database(&url).await?;
    let engine = Engine::builder().database(db).build().await?;

    dispatch(&engine, cli).await
}

async fn connect_database(url: &str) -> AppResult<sea_orm::DatabaseConnection> {
    tracing::debug!("connecting to {url}");
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Resolves `--user` to the acting user's id.
async fn acting_user(engine: &Engine, username: Option<&str>) -> AppResult<Uuid> {
    let username = username.ok_or("this command needs --user <username>")?;
    Ok(engine.user_by_username(username).await?.id)
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T) -> String) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human(value));
    }
    Ok(())
}

async fn dispatch(engine: &Engine, cli: Cli) -> AppResult<()> {
    let json = cli.json;
    let username = cli.user.as_deref();

    match cli.command {
        Command::User(cli::User { command }) => match command {
            UserCommand::Register { username, email } => {
                let password = prompt::read_new_password()?;
                let (user, wallet) = engine.register_user(&username, &email, &password).await?;
                emit(json, &(user, wallet), |(user, wallet)| {
                    format!(
                        "registered {} ({})\n{}",
                        user.username,
                        user.id,
                        output::wallet_line(wallet)
                    )
                })
            }
            UserCommand::Verify { email } => {
                let password = prompt::read_password("Password: ")?;
                let user = engine.verify_credentials(&email, &password).await?;
                emit(json, &user, |user| {
                    format!("credentials valid for {} ({})", user.username, user.id)
                })
            }
            UserCommand::List => {
                let actor = acting_user(engine, username).await?;
                let users = engine.list_users(actor).await?;
                emit(json, &users, |users| output::lines(users, output::user_line))
            }
        },
        Command::Group(cli::Group { command }) => {
            let actor = acting_user(engine, username).await?;
            match command {
                GroupCommand::Create {
                    name,
                    description,
                    members,
                } => {
                    let mut cmd = CreateGroupCmd::new(actor, name);
                    if let Some(description) = description {
                        cmd = cmd.description(description);
                    }
                    for member in members {
                        cmd = cmd.member(engine.user_by_username(&member).await?.id);
                    }
                    let (group, wallet) = engine.create_group(cmd).await?;
                    emit(json, &(group, wallet), |(group, wallet)| {
                        format!(
                            "created group {} ({})\n{}",
                            group.name,
                            group.id,
                            output::wallet_line(wallet)
                        )
                    })
                }
                GroupCommand::AddMember {
                    group,
                    member,
                    role,
                } => {
                    let member_id = engine.user_by_username(&member).await?.id;
                    engine
                        .add_group_member(actor, group, member_id, role.into())
                        .await?;
                    println!("added {member} to {group}");
                    Ok(())
                }
                GroupCommand::RemoveMember { group, member } => {
                    let member_id = engine.user_by_username(&member).await?.id;
                    engine.remove_group_member(actor, group, member_id).await?;
                    println!("removed {member} from {group}");
                    Ok(())
                }
                GroupCommand::Members { group } => {
                    let members = engine.group_members(actor, group).await?;
                    emit(json, &members, |members| {
                        output::lines(members, output::member_line)
                    })
                }
                GroupCommand::List => {
                    let groups = engine.list_groups(actor).await?;
                    emit(json, &groups, |groups| {
                        output::lines(groups, output::group_line)
                    })
                }
                GroupCommand::Show { id } => {
                    let detail = engine.group(actor, id).await?;
                    emit(json, &detail, output::group_detail)
                }
            }
        }
        Command::Category(cli::Category { command }) => {
            let actor = acting_user(engine, username).await?;
            match command {
                CategoryCommand::Create {
                    name,
                    polarity,
                    group,
                } => {
                    let category = engine
                        .create_category(actor, &name, polarity.into(), group)
                        .await?;
                    emit(json, &category, output::category_line)
                }
                CategoryCommand::List => {
                    let categories = engine.list_categories(actor).await?;
                    emit(json, &categories, |categories| {
                        output::lines(categories, output::category_line)
                    })
                }
                CategoryCommand::Rename { id, name } => {
                    let category = engine.rename_category(actor, id, &name).await?;
                    emit(json, &category, output::category_line)
                }
                CategoryCommand::Delete { id } => {
                    engine.delete_category(actor, id).await?;
                    println!("deleted {id}");
                    Ok(())
                }
            }
        }
        Command::Tx(cli::Tx { command }) => {
            let actor = acting_user(engine, username).await?;
            match command {
                TxCommand::Create {
                    wallet,
                    category,
                    title,
                    amount,
                    description,
                    date,
                } => {
                    let mut cmd = CreateTransactionCmd::new(
                        actor,
                        wallet,
                        category,
                        title,
                        amount.minor(),
                        date.unwrap_or_else(Utc::now),
                    );
                    if let Some(description) = description {
                        cmd = cmd.description(description);
                    }
                    let tx = engine.create_transaction(cmd).await?;
                    emit(json, &tx, output::transaction_line)
                }
                TxCommand::Update {
                    id,
                    title,
                    amount,
                    description,
                    date,
                } => {
                    let mut cmd = UpdateTransactionCmd::new(actor, id);
                    if let Some(title) = title {
                        cmd = cmd.title(title);
                    }
                    if let Some(amount) = amount {
                        cmd = cmd.amount_minor(amount.minor());
                    }
                    if let Some(description) = description {
                        cmd = cmd.description(description);
                    }
                    if let Some(date) = date {
                        cmd = cmd.occurred_at(date);
                    }
                    let tx = engine.update_transaction(cmd).await?;
                    emit(json, &tx, output::transaction_line)
                }
                TxCommand::Delete { id, wallet } => {
                    engine.delete_transaction(actor, id, wallet).await?;
                    println!("deleted {id}");
                    Ok(())
                }
                TxCommand::Show { id } => {
                    let tx = engine.transaction(actor, id).await?;
                    emit(json, &tx, output::transaction_line)
                }
                TxCommand::List { wallet, limit } => {
                    let filter = TransactionListFilter {
                        wallet_id: wallet,
                        limit,
                        ..Default::default()
                    };
                    let txs = engine.list_transactions(actor, &filter).await?;
                    emit(json, &txs, |txs| output::lines(txs, output::transaction_line))
                }
            }
        }
        Command::Wallet(cli::Wallet { command }) => {
            let actor = acting_user(engine, username).await?;
            match command {
                WalletCommand::Create { name, currency } => {
                    let wallet = engine.create_wallet(actor, &name, currency).await?;
                    emit(json, &wallet, output::wallet_line)
                }
                WalletCommand::List => {
                    let wallets = engine.list_wallets(actor).await?;
                    emit(json, &wallets, |wallets| {
                        output::lines(wallets, output::wallet_line)
                    })
                }
                WalletCommand::Show { id, limit } => {
                    let wallet = engine.wallet(actor, id).await?;
                    let txs = engine.wallet_transactions(actor, id, Some(limit)).await?;
                    emit(json, &(wallet, txs), |(wallet, txs)| {
                        let mut out = output::wallet_line(wallet);
                        if !txs.is_empty() {
                            out.push('\n');
                            out.push_str(&output::lines(txs, output::transaction_line));
                        }
                        out
                    })
                }
                WalletCommand::Recompute { id } => {
                    let outcome = engine.recompute_wallet_balance(actor, id).await?;
                    emit(json, &outcome, |outcome| {
                        if outcome.drifted() {
                            format!(
                                "balance corrected: {} -> {}",
                                outcome.previous, outcome.recomputed
                            )
                        } else {
                            format!("balance verified: {}", outcome.recomputed)
                        }
                    })
                }
            }
        }
    }
}
