//! Command dispatch: resolve configuration and data directory, then run one
//! club operation against a [`FileStore`] and print the result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use api::models::{Contribution, Loan, NewContribution, NewLoan, NewMember, NewNotification};
use api::{
    attendance, auth, contributions, ledger, loans, members, notifications, reports, LoanDecision,
    Route,
};
use chrono::{Local, NaiveDate};
use store::{ClubConfig, FileStore};
use tracing::{debug, info};

use crate::cli::{
    AmountArgs, AttendanceCommand, Cli, ClubCommand, Command, ContributionCommand, LoanCommand,
    MarkArgs, MemberCommand, NotifyCommand, ReportCommand, ResetCommand,
};
use crate::session::SessionFile;

pub struct Context {
    pub store: FileStore,
    pub config: ClubConfig,
    pub session: SessionFile,
}

impl Context {
    pub fn new(data_dir: PathBuf, config: ClubConfig) -> Self {
        Self {
            session: SessionFile::new(&data_dir),
            store: FileStore::new(data_dir),
            config,
        }
    }

    /// E-mail of the signed-in chairperson.
    async fn chair(&self) -> Result<String> {
        let token = self
            .session
            .load()
            .context("failed to read session file")?
            .context("not signed in; run `nkhonde login` first")?;
        let admin = auth::current_admin(&self.store, &token).await?;
        Ok(admin.email)
    }
}

/// Data directory: `--data-dir`, then `[storage] data_dir`, then the platform
/// data directory.
pub fn resolve_data_dir(flag: Option<&Path>, config: &ClubConfig) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if !config.storage.data_dir.trim().is_empty() {
        return PathBuf::from(config.storage.data_dir.trim());
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nkhonde")
}

/// Amount in kwacha with thousands separators, e.g. `MK 12,500`.
pub fn kwacha(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-MK {grouped}")
    } else {
        format!("MK {grouped}")
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(ClubConfig::filename()));

    let command = match cli.command {
        Command::InitConfig { force } => return init_config(&config_path, force),
        Command::Club(command) => command,
    };

    let config = ClubConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let data_dir = resolve_data_dir(cli.data_dir.as_deref(), &config);
    debug!(config = %config_path.display(), data_dir = %data_dir.display(), "starting");

    let ctx = Context::new(data_dir, config);
    dispatch(&ctx, command).await
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    let content = ClubConfig::default()
        .to_toml()
        .context("failed to render default configuration")?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

async fn dispatch(ctx: &Context, command: ClubCommand) -> Result<()> {
    match command {
        ClubCommand::Register {
            email,
            name,
            password,
        } => {
            let admin =
                auth::register_admin(&ctx.store, &ctx.config.auth, &email, &password, &name).await?;
            println!("Registered {} <{}>", admin.display_name(), admin.email);
            Ok(())
        }
        ClubCommand::Login { email, password } => {
            let session = auth::sign_in(&ctx.store, &ctx.config.auth, &email, &password).await?;
            ctx.session
                .store(&session.token)
                .context("failed to save session")?;
            println!(
                "Signed in as {} until {}",
                session.admin_email,
                session.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }
        ClubCommand::Logout => {
            if let Some(token) = ctx.session.load().context("failed to read session file")? {
                auth::sign_out(&ctx.store, &token).await?;
            }
            ctx.session.clear().context("failed to remove session")?;
            println!("Signed out");
            Ok(())
        }
        ClubCommand::Whoami => {
            let token = ctx
                .session
                .load()
                .context("failed to read session file")?
                .context("not signed in")?;
            let admin = auth::current_admin(&ctx.store, &token).await?;
            println!("{} <{}>", admin.display_name(), admin.email);
            Ok(())
        }
        ClubCommand::ResetPassword(cmd) => reset_password(ctx, cmd).await,
        ClubCommand::Member(cmd) => member(ctx, cmd).await,
        ClubCommand::Contribution(cmd) => contribution(ctx, cmd).await,
        ClubCommand::Loan(cmd) => loan(ctx, cmd).await,
        ClubCommand::Attendance(cmd) => attendance_cmd(ctx, cmd).await,
        ClubCommand::Notify(cmd) => notify(ctx, cmd).await,
        ClubCommand::Report(cmd) => report(ctx, cmd).await,
        ClubCommand::Routes => {
            for route in Route::ALL {
                let nav = if Route::BOTTOM_NAV.contains(&route) {
                    "  [nav]"
                } else {
                    ""
                };
                println!("{:<18} {}{}", route.path(), route.title(), nav);
            }
            Ok(())
        }
    }
}

async fn reset_password(ctx: &Context, cmd: ResetCommand) -> Result<()> {
    match cmd {
        ResetCommand::Request { email } => {
            match auth::request_password_reset(&ctx.store, &ctx.config.auth, &email).await? {
                Some(ticket) => println!(
                    "Reset token: {}\nValid until {}",
                    ticket.token,
                    ticket.expires_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("If an account exists for {email}, a reset token was issued."),
            }
        }
        ResetCommand::Complete { token, password } => {
            auth::reset_password(&ctx.store, &ctx.config.auth, &token, &password).await?;
            ctx.session.clear().context("failed to remove session")?;
            println!("Password changed. Sign in again with the new password.");
        }
    }
    Ok(())
}

async fn member(ctx: &Context, cmd: MemberCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    match cmd {
        MemberCommand::Add {
            id,
            first,
            last,
            phone,
            email,
            photo,
        } => {
            let photo = match photo {
                Some(path) => Some(
                    std::fs::read(&path)
                        .with_context(|| format!("failed to read photo {}", path.display()))?,
                ),
                None => None,
            };
            let member = members::add_member(
                &ctx.store,
                &chair,
                NewMember {
                    member_id: id,
                    first_name: first,
                    last_name: last,
                    phone_number: phone,
                    email,
                    photo,
                },
            )
            .await?;
            println!("Added {} ({})", member.display_name(), member.member_id);
        }
        MemberCommand::List => {
            let list = members::list_members(&ctx.store, &chair).await?;
            for m in &list {
                println!("{:<10} {:<24} {}", m.member_id, m.display_name(), m.phone_number);
            }
            println!("{} members", list.len());
        }
        MemberCommand::Search { text } => {
            let list = members::list_members(&ctx.store, &chair).await?;
            for m in members::search_members(&list, &text) {
                println!("{:<10} {:<24} {}", m.member_id, m.display_name(), m.phone_number);
            }
        }
    }
    Ok(())
}

fn print_contributions(list: &[Contribution]) {
    for c in list {
        println!(
            "{}  {:<24} {:>14}",
            c.date,
            c.member_name,
            kwacha(c.amount)
        );
    }
    println!("Total: {}", kwacha(reports::total_savings(list)));
}

async fn contribution(ctx: &Context, cmd: ContributionCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    match cmd {
        ContributionCommand::Add(AmountArgs {
            member,
            amount,
            date,
        }) => {
            let c = contributions::add_contribution(
                &ctx.store,
                &chair,
                NewContribution {
                    member_id: member,
                    amount,
                    date: date.unwrap_or_else(today),
                },
            )
            .await?;
            println!("Recorded {} from {}", kwacha(c.amount), c.member_name);
        }
        ContributionCommand::List => {
            print_contributions(&contributions::list_contributions(&ctx.store, &chair).await?);
        }
        ContributionCommand::Watch { interval } => {
            let mut feed = contributions::watch_contributions(&ctx.store, &chair).await?;
            print_contributions(&feed.current()?);

            let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
            ticker.tick().await;
            info!("watching contributions, Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        let (list, delta) = feed.poll().await?;
                        if !delta.is_empty() {
                            println!(
                                "-- {} added, {} modified, {} removed",
                                delta.added, delta.modified, delta.removed
                            );
                            print_contributions(&list);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_loan(l: &Loan) {
    println!(
        "{}  {}  {:<24} {:>14}  {}",
        l.id,
        l.date,
        l.member_name,
        kwacha(l.amount),
        l.status
    );
}

async fn loan(ctx: &Context, cmd: LoanCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    match cmd {
        LoanCommand::Apply(AmountArgs {
            member,
            amount,
            date,
        }) => {
            let l = loans::apply_for_loan(
                &ctx.store,
                &chair,
                NewLoan {
                    member_id: member,
                    amount,
                    date: date.unwrap_or_else(today),
                },
            )
            .await?;
            print_loan(&l);
        }
        LoanCommand::List { status } => {
            for l in loans::list_loans(&ctx.store, &chair, status).await? {
                print_loan(&l);
            }
        }
        LoanCommand::Approve { id } => {
            let decision = LoanDecision::new(&chair, &id);
            let adj = ledger::approve_loan(&ctx.store, &ctx.config.ledger, &decision).await?;
            println!(
                "Approved {} for {}; balance now {}",
                kwacha(adj.loan.amount),
                adj.loan.member_name,
                kwacha(adj.contribution.amount)
            );
        }
        LoanCommand::Unapprove { id } => {
            let decision = LoanDecision::new(&chair, &id);
            let adj = ledger::unapprove_loan(&ctx.store, &ctx.config.ledger, &decision).await?;
            println!(
                "Loan of {} for {} back to pending; balance now {}",
                kwacha(adj.loan.amount),
                adj.loan.member_name,
                kwacha(adj.contribution.amount)
            );
        }
    }
    Ok(())
}

fn print_sheet(sheet: &attendance::AttendanceSheet) {
    println!("Attendance for {}", sheet.date());
    for row in sheet.rows() {
        let mark = if row.present { "present" } else { "ABSENT" };
        let penalty = sheet.penalty_for(&row.member_id);
        if penalty > 0 {
            println!("{:<10} {:<24} {:<8} {}", row.member_id, row.name, mark, kwacha(penalty));
        } else {
            println!("{:<10} {:<24} {}", row.member_id, row.name, mark);
        }
    }
    println!(
        "{} absent, total penalty {}",
        sheet.absent_count(),
        kwacha(sheet.total_penalty())
    );
}

async fn attendance_cmd(ctx: &Context, cmd: AttendanceCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    let cfg = &ctx.config.attendance;
    match cmd {
        AttendanceCommand::Show { date } => {
            let sheet = attendance::load_sheet(&ctx.store, cfg, &chair, date.unwrap_or_else(today)).await?;
            print_sheet(&sheet);
        }
        AttendanceCommand::Mark(MarkArgs {
            date,
            absent,
            present,
        }) => {
            let mut sheet =
                attendance::load_sheet(&ctx.store, cfg, &chair, date.unwrap_or_else(today)).await?;
            for id in &absent {
                sheet.set_present(id, false)?;
            }
            for id in &present {
                sheet.set_present(id, true)?;
            }
            attendance::save_sheet(&ctx.store, &chair, &sheet).await?;
            print_sheet(&sheet);
        }
        AttendanceCommand::Save { date } => {
            let sheet = attendance::load_sheet(&ctx.store, cfg, &chair, date.unwrap_or_else(today)).await?;
            attendance::save_sheet(&ctx.store, &chair, &sheet).await?;
            print_sheet(&sheet);
        }
    }
    Ok(())
}

async fn notify(ctx: &Context, cmd: NotifyCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    match cmd {
        NotifyCommand::Send {
            title,
            message,
            to,
            category,
        } => {
            let n = notifications::send_notification(
                &ctx.store,
                &chair,
                NewNotification {
                    title,
                    message,
                    user_email: to,
                    category,
                },
            )
            .await?;
            println!("Sent \"{}\" ({})", n.title, n.category);
        }
        NotifyCommand::List { viewer } => {
            for n in notifications::list_notifications(&ctx.store, &chair, viewer.as_deref()).await? {
                println!(
                    "{}  [{}] {}: {}",
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.category,
                    n.title,
                    n.message
                );
            }
        }
        NotifyCommand::Feed => {
            let contributions = contributions::list_contributions(&ctx.store, &chair).await?;
            let loans = loans::list_loans(&ctx.store, &chair, None).await?;
            for a in notifications::activity_feed(&contributions, &loans) {
                println!("{}  {}: {}", a.date, a.title, a.message);
            }
        }
    }
    Ok(())
}

async fn report(ctx: &Context, cmd: ReportCommand) -> Result<()> {
    let chair = ctx.chair().await?;
    match cmd {
        ReportCommand::Dashboard { recent } => {
            let d = reports::build_dashboard(&ctx.store, &chair).await?;
            println!("Total savings: {} ({})", kwacha(d.total_savings), d.growth_label());
            println!("Members:       {}", d.member_count);
            println!(
                "Loans:         {} pending ({}), {} approved ({} outstanding)",
                d.loans.pending_count,
                kwacha(d.loans.pending_total),
                d.loans.approved_count,
                kwacha(d.loans.outstanding())
            );
            println!("Recent activity:");
            for t in d.recent.iter().take(recent) {
                let sign = match t.kind {
                    reports::TransactionKind::Credit => '+',
                    reports::TransactionKind::Debit => '-',
                };
                println!("  {}  {} {:<32} {}", t.date, sign, t.description, kwacha(t.amount));
            }
        }
        ReportCommand::Series { period } => {
            let list = contributions::list_contributions(&ctx.store, &chair).await?;
            println!("{period} contributions");
            for point in reports::contribution_series(&list, period) {
                println!("{:<10} {:>14}", point.label, kwacha(point.total));
            }
        }
        ReportCommand::Statements => {
            let roster = members::list_members(&ctx.store, &chair).await?;
            let list = contributions::list_contributions(&ctx.store, &chair).await?;
            let loans = loans::list_loans(&ctx.store, &chair, None).await?;
            println!(
                "{:<10} {:<24} {:>14} {:>14} {:>14}",
                "ID", "Name", "Deposits", "Debits", "Balance"
            );
            for row in reports::member_statements(&roster, &list, &loans) {
                println!(
                    "{:<10} {:<24} {:>14} {:>14} {:>14}",
                    row.member_id,
                    row.name,
                    kwacha(row.deposits),
                    kwacha(row.debits),
                    kwacha(row.balance)
                );
            }
        }
    }
    Ok(())
}
