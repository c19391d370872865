use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use loanboard::cli::loans::LoanChanges;
use loanboard::core::log::init_logging;
use loanboard::core::loan::{LoanDraft, LoanStatus, LoanType};
use loanboard::core::stats::StatusFilter;
use loanboard::{AppCommand, LoanCommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Use built-in demo data instead of the hosted backend
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Display loan statistics, monthly volume and recent loans
    Dashboard,
    /// Manage loan applications
    #[command(subcommand)]
    Loans(LoansCommand),
}

#[derive(Subcommand)]
enum LoansCommand {
    /// List loans, optionally filtered
    List {
        /// Case-insensitive match on the loan purpose
        #[arg(short, long)]
        search: Option<String>,
        /// all, pending, approved, rejected or paid
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
    /// Show a single loan
    Show { id: String },
    /// Apply for a new loan
    New(NewLoanArgs),
    /// Edit an existing loan application
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditLoanArgs,
    },
    /// Approve a pending loan
    Approve { id: String },
    /// Reject a pending loan
    Reject { id: String },
    /// Mark an approved loan as paid
    MarkPaid { id: String },
    /// Delete one or more loans
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args)]
struct NewLoanArgs {
    #[arg(long)]
    amount: String,
    #[arg(long)]
    purpose: String,
    #[arg(long)]
    borrower: String,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    due_date: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Annual interest rate in percent
    #[arg(long, default_value = "5.0")]
    interest_rate: String,
    /// Term in months
    #[arg(long, default_value = "12")]
    term: String,
    /// personal, business, education, mortgage or vehicle
    #[arg(long, default_value = "personal")]
    loan_type: LoanType,
}

#[derive(Args)]
struct EditLoanArgs {
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    purpose: Option<String>,
    #[arg(long)]
    borrower: Option<String>,
    #[arg(long)]
    due_date: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    interest_rate: Option<String>,
    #[arg(long)]
    term: Option<String>,
    #[arg(long)]
    loan_type: Option<LoanType>,
}

impl From<LoansCommand> for LoanCommand {
    fn from(cmd: LoansCommand) -> LoanCommand {
        match cmd {
            LoansCommand::List { search, status } => LoanCommand::List { search, status },
            LoansCommand::Show { id } => LoanCommand::Show { id },
            LoansCommand::New(args) => LoanCommand::New(LoanDraft {
                amount: args.amount,
                purpose: args.purpose,
                description: args.description,
                borrower_name: args.borrower,
                interest_rate: args.interest_rate,
                term: args.term,
                loan_type: args.loan_type,
                due_date: args.due_date,
            }),
            LoansCommand::Edit { id, fields } => LoanCommand::Edit {
                id,
                changes: LoanChanges {
                    amount: fields.amount,
                    purpose: fields.purpose,
                    description: fields.description,
                    borrower_name: fields.borrower,
                    interest_rate: fields.interest_rate,
                    term: fields.term,
                    loan_type: fields.loan_type,
                    due_date: fields.due_date,
                },
            },
            LoansCommand::Approve { id } => LoanCommand::SetStatus {
                id,
                status: LoanStatus::Approved,
            },
            LoansCommand::Reject { id } => LoanCommand::SetStatus {
                id,
                status: LoanStatus::Rejected,
            },
            LoansCommand::MarkPaid { id } => LoanCommand::SetStatus {
                id,
                status: LoanStatus::Paid,
            },
            LoansCommand::Delete { ids } => LoanCommand::Delete { ids },
        }
    }
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Signup {
                email,
                password,
                name,
            } => AppCommand::SignUp {
                email,
                password,
                name,
            },
            Commands::Login { email, password } => AppCommand::Login { email, password },
            Commands::Logout => AppCommand::Logout,
            Commands::Whoami => AppCommand::WhoAmI,
            Commands::Dashboard => AppCommand::Dashboard,
            Commands::Loans(cmd) => AppCommand::Loans(cmd.into()),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => loanboard::cli::setup::setup_at_path(path),
            None => loanboard::cli::setup::setup(),
        },
        Some(cmd) => {
            loanboard::run_command(cmd.into(), cli.config_path.as_deref(), cli.offline).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
