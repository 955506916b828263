pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::catalog::CatalogArgs;
use commands::image_url::ImageUrlArgs;
use commands::suggest::SuggestArgs;

#[derive(Debug, Parser)]
#[command(
    name = "tuhfa",
    about = "Tuhfa storefront operator CLI",
    long_about = "Run the gift assistant, resolve CDN image URLs, browse the catalog, and check runtime readiness.",
    after_help = "Examples:\n  tuhfa suggest --occasion birthday --interest reading --budget 100-250\n  tuhfa image-url https://images.pexels.com/photos/1.jpeg --width 400 --placeholder\n  tuhfa catalog --category flowers --locale ar\n  tuhfa doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Score the catalog against questionnaire answers and print the picks")]
    Suggest(SuggestArgs),
    #[command(about = "Resolve an image URL through the CDN quality policy")]
    ImageUrl(ImageUrlArgs),
    #[command(about = "List catalog products with optional category, occasion and text filters")]
    Catalog(CatalogArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, catalog data and the image URL policy")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Suggest(args) => commands::suggest::run(&args),
        Command::ImageUrl(args) => commands::image_url::run(&args),
        Command::Catalog(args) => commands::catalog::run(&args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
