//! Command-line argument parsing.

use std::path::PathBuf;

use api::models::NotificationCategory;
use api::reports::Period;
use api::LoanStatus;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// nkhonde - run a savings club from the terminal
///
/// Examples:
///   nkhonde register --email chair@club.mw --name "Chair"
///   nkhonde login --email chair@club.mw
///   nkhonde member add --id M1 --first Mary --last Chirwa --phone 0888123456
///   nkhonde contribution add --member M1 --amount 5000
///   nkhonde loan approve <LOAN_ID>
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding club data (default: platform data dir / nkhonde)
    #[arg(long, global = true, value_name = "DIR", env = "NKHONDE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (default: ./nkhonde.toml)
    #[arg(long, global = true, value_name = "FILE", env = "NKHONDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default nkhonde.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    #[command(flatten)]
    Club(ClubCommand),
}

/// Commands that run against the club's data directory.
#[derive(Subcommand, Debug)]
pub enum ClubCommand {
    /// Create a chairperson account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "NKHONDE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "NKHONDE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the current session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Password reset tickets
    #[command(subcommand)]
    ResetPassword(ResetCommand),

    #[command(subcommand)]
    Member(MemberCommand),

    #[command(subcommand)]
    Contribution(ContributionCommand),

    #[command(subcommand)]
    Loan(LoanCommand),

    #[command(subcommand)]
    Attendance(AttendanceCommand),

    #[command(subcommand)]
    Notify(NotifyCommand),

    #[command(subcommand)]
    Report(ReportCommand),

    /// List the app's navigation routes
    Routes,
}

#[derive(Subcommand, Debug)]
pub enum ResetCommand {
    /// Issue a reset token for an account
    Request {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token
    Complete {
        #[arg(long)]
        token: String,
        #[arg(long, env = "NKHONDE_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Photo to upload
        #[arg(long, value_name = "FILE")]
        photo: Option<PathBuf>,
    },
    List,
    /// Match names and member ids
    Search { text: String },
}

#[derive(Args, Debug)]
pub struct AmountArgs {
    /// Member id
    #[arg(long)]
    pub member: String,
    /// Amount in kwacha
    #[arg(long)]
    pub amount: i64,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum ContributionCommand {
    Add(AmountArgs),
    List,
    /// Follow the contribution list until interrupted
    Watch {
        /// Seconds between checks
        #[arg(long, default_value = "2")]
        interval: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum LoanCommand {
    Apply(AmountArgs),
    List {
        /// pending or approved
        #[arg(long)]
        status: Option<LoanStatus>,
    },
    /// Approve a pending loan and debit the member's balance
    Approve { id: String },
    /// Return an approved loan to pending and credit the balance back
    Unapprove { id: String },
}

#[derive(Args, Debug)]
pub struct MarkArgs {
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Member ids to mark absent
    #[arg(long, value_delimiter = ',')]
    pub absent: Vec<String>,
    /// Member ids to mark present
    #[arg(long, value_delimiter = ',')]
    pub present: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCommand {
    /// Show the sheet and penalties for a day
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Change marks and store the sheet
    Mark(MarkArgs),
    /// Store the sheet as shown, recording everyone's mark
    Save {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    Send {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Only this e-mail will see it
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value = "general")]
        category: NotificationCategory,
    },
    List {
        /// View as this e-mail (includes notifications addressed to it)
        #[arg(long = "as", value_name = "EMAIL")]
        viewer: Option<String>,
    },
    /// Activity derived from contributions and loans
    Feed,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    Dashboard {
        /// Number of recent transactions to show
        #[arg(long, default_value = "10")]
        recent: usize,
    },
    Series {
        #[arg(long, default_value = "yearly")]
        period: Period,
    },
    Statements,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nkhonde").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["loan", "approve", "abc", "--data-dir", "/tmp/club", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/club")));
        assert!(matches!(
            cli.command,
            Command::Club(ClubCommand::Loan(LoanCommand::Approve { ref id })) if id == "abc"
        ));
    }

    #[test]
    fn test_typed_values() {
        let cli = parse(&[
            "contribution", "add", "--member", "M1", "--amount", "5000", "--date", "2025-10-26",
        ]);
        let Command::Club(ClubCommand::Contribution(ContributionCommand::Add(args))) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.amount, 5000);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 10, 26));

        let cli = parse(&["loan", "list", "--status", "approved"]);
        assert!(matches!(
            cli.command,
            Command::Club(ClubCommand::Loan(LoanCommand::List {
                status: Some(LoanStatus::Approved)
            }))
        ));

        let cli = parse(&["report", "series", "--period", "Quarterly"]);
        assert!(matches!(
            cli.command,
            Command::Club(ClubCommand::Report(ReportCommand::Series {
                period: Period::Quarterly
            }))
        ));
    }

    #[test]
    fn test_mark_lists() {
        let cli = parse(&["attendance", "mark", "--absent", "M1,M2", "--present", "M3"]);
        let Command::Club(ClubCommand::Attendance(AttendanceCommand::Mark(args))) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.absent, vec!["M1", "M2"]);
        assert_eq!(args.present, vec!["M3"]);
        assert!(args.date.is_none());
    }

    #[test]
    fn test_init_config_is_separate_from_club_commands() {
        let cli = parse(&["init-config", "--force"]);
        assert!(matches!(cli.command, Command::InitConfig { force: true }));

        let cli = parse(&["routes"]);
        assert!(matches!(cli.command, Command::Club(ClubCommand::Routes)));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_date = ["nkhonde", "attendance", "show", "--date", "26/10/2025"];
        assert!(Cli::try_parse_from(bad_date).is_err());
        let bad_status = ["nkhonde", "loan", "list", "--status", "repaid"];
        assert!(Cli::try_parse_from(bad_status).is_err());
    }
}
