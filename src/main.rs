//! Slipbook main entry point

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use slipbook_config::Config;
use slipbook_core::dispatch::{Identity, UiQueue, Workers};
use slipbook_core::display::column_labels;
use slipbook_core::summary::AccountSummary;
use slipbook_core::{
    Account, AccountLookup, AccountType, CommitOutcome, CoreResult, CurrencyNode, Engine, EntryOptions, LedgerView, MemoryEngine, MessageBus,
    ReconcileToggle, RegisterOptions, SlipForm, SlipType, SortColumn,
};
use slipbook_store::{JournalSnapshot, JournalStore, JsonJournalStore};

#[derive(Parser, Debug)]
#[command(name = "slipbook")]
#[command(version = "0.1.0")]
#[command(about = "Running-balance registers and split transaction entry", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default configuration file
    InitConfig {
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
    /// Create an account
    AddAccount {
        #[arg(long)]
        name: String,
        #[arg(long = "type", default_value = "bank")]
        account_type: AccountType,
        /// Currency code, defaults to the configured currency
        #[arg(long)]
        currency: Option<String>,
    },
    /// Print an account register with running balances
    Register {
        #[arg(long)]
        account: String,
        /// One row per split entry
        #[arg(long)]
        detail: bool,
        #[arg(long)]
        sort: Option<SortColumn>,
        #[arg(long)]
        descending: bool,
    },
    /// Enter a transaction from one account's point of view
    Enter {
        #[arg(long)]
        account: String,
        /// Account on the other side
        #[arg(long)]
        to: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Post as a decrease of the account
        #[arg(long)]
        decrease: bool,
        /// Amount in the other account's currency
        #[arg(long)]
        exchanged: Option<Decimal>,
        #[arg(long, default_value = "")]
        payee: String,
        #[arg(long, default_value = "")]
        memo: String,
        #[arg(long, default_value = "")]
        number: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Mark the account side cleared
        #[arg(long)]
        cleared: bool,
        #[arg(long)]
        attach: Option<PathBuf>,
    },
    /// Balances of every account as JSON
    Summary,
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

fn find_account<'a>(engine: &'a MemoryEngine, name: &str) -> Result<&'a Account> {
    engine
        .find_account_by_name(name)
        .ok_or_else(|| anyhow!("no account named {}", name))
}

fn format_value(config: &Config, account: &Account, value: Decimal) -> String {
    slipbook_utils::format_amount(
        value,
        account.currency.scale,
        &config.currency.thousands_separator,
        &config.currency.decimal_separator,
    )
}

fn print_register(config: &Config, view: &mut LedgerView, engine: &MemoryEngine) {
    let account = view.account().clone();
    let labels = column_labels(account.account_type, config.entry.accounting_terms);
    println!(
        "{:<10} {:<6} {:<24} {:<20} {:<16} {:>12} {:>12} {:>14}",
        "Date", "Num", "Payee", "Memo", "Account", labels.increase, labels.decrease, "Balance"
    );

    for index in 0..view.row_count() {
        let Some(row) = view.row(index).cloned() else {
            continue;
        };
        let balance = view.balance_at(index);
        let other = row
            .opposite_account(&account.id)
            .and_then(|id| engine.account(&id))
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "[split]".to_string());
        let amount = |v: Option<Decimal>| v.map(|v| format_value(config, &account, v)).unwrap_or_default();

        let (date, number, payee) = if row.show_transaction_fields() {
            (
                row.transaction.date.to_string(),
                row.transaction.number.clone(),
                row.transaction.payee.clone(),
            )
        } else {
            Default::default()
        };
        println!(
            "{:<10} {:<6} {:<24} {:<20} {:<16} {:>12} {:>12} {:>14} {}",
            date,
            number,
            payee,
            row.memo(),
            other,
            amount(row.increase()),
            amount(row.decrease()),
            format_value(config, &account, balance.value()),
            row.reconciled(&account.id).marker(),
        );
    }
}

struct SummaryScreen {
    generation: u64,
    summaries: Vec<AccountSummary>,
}

impl Identity for SummaryScreen {
    type Key = u64;

    fn active_key(&self) -> u64 {
        self.generation
    }
}

async fn summarize(engine: &MemoryEngine) -> Result<Vec<AccountSummary>> {
    let mut queue = UiQueue::<SummaryScreen>::new();
    let workers = Workers::new(queue.handle(), tokio::runtime::Handle::current());
    let mut screen = SummaryScreen {
        generation: 1,
        summaries: Vec::new(),
    };

    let mut jobs = Vec::new();
    for account in engine.accounts() {
        let account = account.clone();
        let transactions = engine.sorted_transactions(&account.id);
        jobs.push(workers.spawn_for(
            screen.generation,
            move || AccountSummary::compute(&account, &transactions),
            |s: &mut SummaryScreen, summary: CoreResult<AccountSummary>| match summary {
                Ok(summary) => s.summaries.push(summary),
                Err(e) => log::error!("could not summarize an account: {}", e),
            },
        ));
    }
    for job in jobs {
        job.await.context("summary worker")?;
    }
    queue.run_pending(&mut screen);

    screen.summaries.sort_by(|a, b| a.account.cmp(&b.account));
    Ok(screen.summaries)
}

async fn run(config: Config, command: Command) -> Result<()> {
    let store = JsonJournalStore::new(config.journal_path());
    let bus = MessageBus::new();
    let mut engine = store.load_or_default().await?.into_engine(bus.clone());

    match command {
        Command::InitConfig { .. } => bail!("init-config does not open a journal"),

        Command::AddAccount {
            name,
            account_type,
            currency,
        } => {
            if engine.find_account_by_name(&name).is_some() {
                bail!("an account named {} already exists", name);
            }
            let code = currency.unwrap_or_else(|| config.currency.default_currency.clone());
            let account = Account::new(name, account_type, CurrencyNode::new(code, config.currency.decimal_places));
            log::info!("created account {} ({})", account.name, account.account_type);
            engine.add_account(account);
            store.save(&JournalSnapshot::from_engine(&engine)).await?;
        }

        Command::Register {
            account,
            detail,
            sort,
            descending,
        } => {
            let account = find_account(&engine, &account)?.clone();
            let mut options = RegisterOptions::from(&config);
            options.show_split_detail |= detail;
            let mut view = LedgerView::new(account.clone(), engine.sorted_transactions(&account.id), options);
            if let Some(column) = sort {
                if !config.register.sortable {
                    bail!("register sorting is disabled in the configuration");
                }
                view.sort_by(column, !descending, &engine);
            }
            print_register(&config, &mut view, &engine);
        }

        Command::Enter {
            account,
            to,
            amount,
            decrease,
            exchanged,
            payee,
            memo,
            number,
            date,
            cleared,
            attach,
        } => {
            let current = find_account(&engine, &account)?.clone();
            let opposite = find_account(&engine, &to)?.clone();
            let slip_type = if decrease { SlipType::Decrease } else { SlipType::Increase };

            let mut slip = SlipForm::new(current.clone(), slip_type, EntryOptions::from(&config));
            slip.set_amount_text(amount);
            slip.select_account(&opposite);
            slip.set_exchanged_amount(exchanged);
            slip.set_payee(payee);
            slip.set_memo(memo);
            slip.set_number(number);
            if let Some(date) = date {
                slip.set_date(date);
            }
            if cleared {
                slip.set_reconcile(ReconcileToggle::Indeterminate);
            }
            if let Some(path) = attach {
                slip.set_attachment(path);
            }

            let mut view = LedgerView::new(
                current.clone(),
                engine.sorted_transactions(&current.id),
                RegisterOptions::from(&config),
            );
            let mut updates = bus.subscribe(current.id);

            match slip.commit(&mut engine) {
                CommitOutcome::Added(id) => log::info!("entered transaction {}", id),
                CommitOutcome::Replaced { old, new } => log::info!("replaced {} with {}", old, new),
                CommitOutcome::Invalid(issue) => bail!("transaction not entered: {}", issue),
                CommitOutcome::EngineRejected(e) => bail!("transaction rejected: {}", e),
            }
            store.save(&JournalSnapshot::from_engine(&engine)).await?;

            view.pump(&mut updates);
            if view.row_count() > 0 {
                let balance = view.balance_at(view.row_count() - 1);
                println!("{} balance: {}", current.name, format_value(&config, &current, balance.value()));
            }
        }

        Command::Summary => {
            let summaries = summarize(&engine).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { output } = &args.command {
        std::fs::write(output, Config::generate_default())
            .with_context(|| format!("writing {}", output.display()))?;
        println!("wrote {}", output.display());
        return Ok(());
    }

    let config = load_config(&args.config)?;
    config.validate()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();
    log::debug!("journal at {}", config.journal_path().display());

    let rt = Runtime::new()?;
    rt.block_on(run(config, args.command))
}
