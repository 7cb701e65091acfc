use crate::commands::{
    self, CreatePropertyArgs, CreateShowingArgs, EmailArgs, ExportArgs, FilterArgs,
    ListShowingsArgs, LoginArgs, RegisterArgs, ResetArgs, UpdatePropertyArgs, VerifyArgs,
};
use crate::context::Context;
use clap::{Parser, Subcommand};
use realty_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "realty-desk",
    about = "Work with listings and showings on the realty-desk backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the token pair in the session file
    Login(LoginArgs),
    /// Forget the stored tokens
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Create an account; a verification code is emailed
    Register(RegisterArgs),
    /// Confirm the emailed code and sign in
    Verify(VerifyArgs),
    /// Send a fresh verification code
    ResendCode(EmailArgs),
    /// Password recovery
    Password {
        #[command(subcommand)]
        command: PasswordCommand,
    },
    /// Browse and manage listings
    Properties {
        #[command(subcommand)]
        command: PropertiesCommand,
    },
    /// Viewing appointments
    Showings {
        #[command(subcommand)]
        command: ShowingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PasswordCommand {
    /// Email a reset code
    Forgot(EmailArgs),
    /// Set a new password using the emailed code
    Reset(ResetArgs),
}

#[derive(Subcommand, Debug)]
enum PropertiesCommand {
    /// List the feed, optionally filtered
    List(FilterArgs),
    /// Show one listing with its images
    Show { id: u64 },
    Create(CreatePropertyArgs),
    /// Change only the given fields
    Update(UpdatePropertyArgs),
    Delete { id: u64 },
    /// Write the filtered feed as CSV
    Export(ExportArgs),
}

#[derive(Subcommand, Debug)]
enum ShowingsCommand {
    List(ListShowingsArgs),
    Create(CreateShowingArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let ctx = Context::load()?;

    let result = dispatch(&ctx, cli.command).await;
    ctx.settle();
    result
}

async fn dispatch(ctx: &Context, command: Command) -> Result<(), AppError> {
    match command {
        Command::Login(args) => commands::login(ctx, args).await,
        Command::Logout => commands::logout(ctx),
        Command::Whoami => commands::whoami(ctx).await,
        Command::Register(args) => commands::register(ctx, args).await,
        Command::Verify(args) => commands::verify(ctx, args).await,
        Command::ResendCode(args) => commands::resend_code(ctx, args).await,
        Command::Password { command } => match command {
            PasswordCommand::Forgot(args) => commands::password_forgot(ctx, args).await,
            PasswordCommand::Reset(args) => commands::password_reset(ctx, args).await,
        },
        Command::Properties { command } => match command {
            PropertiesCommand::List(args) => commands::list_properties(ctx, args).await,
            PropertiesCommand::Show { id } => commands::show_property(ctx, id).await,
            PropertiesCommand::Create(args) => commands::create_property(ctx, args).await,
            PropertiesCommand::Update(args) => commands::update_property(ctx, args).await,
            PropertiesCommand::Delete { id } => commands::delete_property(ctx, id).await,
            PropertiesCommand::Export(args) => commands::export_properties(ctx, args).await,
        },
        Command::Showings { command } => match command {
            ShowingsCommand::List(args) => commands::list_showings(ctx, args).await,
            ShowingsCommand::Create(args) => commands::create_showing(ctx, args).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_accepts_filters_and_output() {
        let cli = Cli::try_parse_from([
            "realty-desk",
            "properties",
            "export",
            "--deal-type",
            "rent",
            "--output",
            "feed.csv",
            "--all-pages",
        ])
        .expect("parses");

        match cli.command {
            Command::Properties {
                command: PropertiesCommand::Export(args),
            } => {
                assert!(args.all_pages);
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("feed.csv")));
                assert!(args.filters.deal_type.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn password_reset_requires_code() {
        let result = Cli::try_parse_from([
            "realty-desk",
            "password",
            "reset",
            "--email",
            "agent@example.com",
            "--new-password",
            "hunter22",
        ]);
        assert!(result.is_err());
    }
}
