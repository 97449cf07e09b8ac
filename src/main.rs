use clap::{Args, Parser as ClapParser, Subcommand};
use prune_lang::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "prune")]
#[command(about = "Prune - A field-selection language for projecting JSON documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a filter and project JSON through it
    Check(CheckArgs),

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'prune docs' to list categories)
        category: String,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// The filter, e.g. 'id,owner{email}'
    filter: String,

    /// JSON input (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't project
    #[arg(long)]
    syntax_only: bool,

    /// View used for typed records
    #[arg(long)]
    view: Option<String>,

    /// Variable binding for @name references (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

impl From<CheckArgs> for CheckOptions {
    fn from(args: CheckArgs) -> Self {
        CheckOptions {
            filter: args.filter,
            input: args.input,
            pretty: args.pretty,
            syntax_only: args.syntax_only,
            view: args.view,
            vars: args.vars,
        }
    }
}

/// Log to stderr, filtered by `PRUNE_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env("PRUNE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    let result = match Cli::parse().command {
        Commands::Check(args) => run_check(args.into()),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(mut options: CheckOptions) -> Result<(), CliError> {
    if options.input.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.input = Some(buffer);
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) if options.pretty => println!("{}", serde_json::to_string_pretty(&output)?),
        CheckResult::Success(output) => println!("{}", serde_json::to_string(&output)?),
    }
    Ok(())
}
