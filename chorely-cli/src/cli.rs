use std::path::PathBuf;

use chorely_shared::auth::Role;
use chorely_shared::domain::{ChoreStatus, Frequency};
use clap::{Args, Parser, Subcommand, ValueEnum};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $CHORELY_CONFIG
  3) XDG default: ~/.config/chorely/cli.yaml

The session token is kept in a `token` file next to the config.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "chorely",
    version,
    about = "Command-line client for the Chorely family chore tracker",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account, then log in with it
    ///
    /// Parents start a new family with --family-name. Children join an
    /// existing one with the invite code a parent sees in `whoami`.
    Register {
        /// Server URL (e.g., http://127.0.0.1:5151). Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        family_name: Option<String>,
        #[arg(long)]
        invite_code: Option<String>,
    },
    /// Log in and store the session token
    Login {
        /// Server URL (e.g., http://127.0.0.1:5151). Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        /// Email. Falls back to prompt.
        #[arg(long)]
        email: Option<String>,
    },
    /// Revoke the session on the server and forget the token
    Logout,
    /// Show the logged-in user and their family
    Whoami,
    /// Manage chores
    #[command(subcommand)]
    Chores(ChoresCommand),
    /// Manage rewards
    #[command(subcommand)]
    Rewards(RewardsCommand),
    /// List family members with their balances
    Members,
    /// Adjust balances or show the points ledger
    #[command(subcommand)]
    Points(PointsCommand),
    /// Role-specific overview
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum ChoresCommand {
    /// List chores (children only see their own)
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Only chores assigned to this user id
        #[arg(long)]
        assignee: Option<String>,
        /// Due on or after (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,
        /// Due before (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,
    },
    /// Create a chore and assign it
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        points: i32,
        /// User id of the assignee
        #[arg(long)]
        assignee: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        frequency: Option<FrequencyArg>,
    },
    /// Show a chore with its completion history
    Show { id: String },
    /// Change fields of a chore
    Edit {
        id: String,
        #[command(flatten)]
        fields: ChoreEditArgs,
    },
    Delete { id: String },
    /// Mark your chore as done
    Complete { id: String },
    /// Approve a completed chore and award its points
    Approve { id: String },
}

#[derive(Debug, Args)]
pub struct ChoreEditArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub points: Option<i32>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long, value_enum)]
    pub frequency: Option<FrequencyArg>,
}

#[derive(Debug, Subcommand)]
pub enum RewardsCommand {
    /// List active rewards, cheapest first
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        points: i32,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        points: Option<i32>,
    },
    /// Deactivate a reward
    Delete { id: String },
    /// Spend points on a reward
    Redeem { id: String },
}

#[derive(Debug, Subcommand)]
pub enum PointsCommand {
    /// Add or remove points (negative deltas allowed)
    Adjust {
        /// User id of the member
        user: String,
        #[arg(long, allow_hyphen_values = true)]
        delta: i32,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Ledger entries, newest first
    History {
        /// User id; defaults to yourself
        user: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        per_page: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Parent,
    Child,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Parent => Role::Parent,
            RoleArg::Child => Role::Child,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Completed,
    Approved,
}

impl From<StatusArg> for ChoreStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Pending => ChoreStatus::Pending,
            StatusArg::Completed => ChoreStatus::Completed,
            StatusArg::Approved => ChoreStatus::Approved,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    OneTime,
    Daily,
    Weekly,
}

impl From<FrequencyArg> for Frequency {
    fn from(f: FrequencyArg) -> Self {
        match f {
            FrequencyArg::OneTime => Frequency::OneTime,
            FrequencyArg::Daily => Frequency::Daily,
            FrequencyArg::Weekly => Frequency::Weekly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_adjustments_parse() {
        let cli = Cli::try_parse_from(["chorely", "points", "adjust", "u1", "--delta", "-5"])
            .unwrap();
        match cli.command {
            Command::Points(PointsCommand::Adjust { user, delta, .. }) => {
                assert_eq!(user, "u1");
                assert_eq!(delta, -5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn frequency_uses_kebab_case() {
        let cli = Cli::try_parse_from([
            "chorely", "chores", "add", "--title", "Dishes", "--points", "3", "--assignee", "k1",
            "--frequency", "one-time",
        ])
        .unwrap();
        match cli.command {
            Command::Chores(ChoresCommand::Add { frequency, .. }) => {
                assert_eq!(frequency.map(Frequency::from), Some(Frequency::OneTime));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn due_and_clear_due_conflict() {
        let res = Cli::try_parse_from([
            "chorely", "chores", "edit", "c1", "--due", "2030-01-01", "--clear-due",
        ]);
        assert!(res.is_err());
    }
}
