use crate::demo::{run_demo, run_search, DemoArgs, SearchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use icms::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "ICMS",
    about = "Run the import licence and export certificate case service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a set of sample applications through the case workflow
    Demo(DemoArgs),
    /// Search the sample applications and print or export the results
    Search(SearchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Search(args) => run_search(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icms::flow::CaseType;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["icms"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn search_arguments_parse() {
        let cli = Cli::try_parse_from([
            "icms",
            "search",
            "--case-type",
            "export",
            "--case-ref",
            "CA/%",
            "--submitted-from",
            "2024-01-31",
            "--limit",
            "3",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Search(args)) => {
                assert_eq!(args.case_type, CaseType::Export);
                assert_eq!(args.case_ref.as_deref(), Some("CA/%"));
                assert_eq!(args.limit, Some(3));
                assert!(args.submitted_from.is_some());
            }
            other => panic!("expected search command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_case_type_is_rejected() {
        assert!(Cli::try_parse_from(["icms", "search", "--case-type", "transit"]).is_err());
    }
}
