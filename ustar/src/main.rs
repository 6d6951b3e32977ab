use std::path::PathBuf;

use anyhow::Context;
use structopt::StructOpt;
use ustar_format::ChecksumPolicy;

mod commands;
mod error;

use structopt::clap::AppSettings::*;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "c", visible_alias = "create", about = "Create a new archive")]
    Create {
        #[structopt(
            name = "archive",
            parse(from_os_str),
            help = "Path to the .tar archive"
        )]
        path: PathBuf,

        #[structopt(
            name = "files",
            parse(from_os_str),
            help = "Files/directories to add to the archive, recursively"
        )]
        selected_files: Vec<PathBuf>,
    },

    #[structopt(name = "l", visible_alias = "list", about = "List entries of an archive")]
    List {
        #[structopt(
            name = "archive",
            parse(from_os_str),
            help = "Path to the .tar archive"
        )]
        path: PathBuf,
    },

    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract files from an archive"
    )]
    Extract {
        #[structopt(
            name = "archive",
            parse(from_os_str),
            help = "Path to the .tar archive"
        )]
        path: PathBuf,

        #[structopt(
            short = "C",
            long = "directory",
            parse(from_os_str),
            default_value = ".",
            help = "Directory to extract into"
        )]
        output: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ustar",
    about = "Create, list and extract ustar archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "ustar (c|l|x) [FLAGS|OPTIONS] <archive> [files]..."
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(
        long,
        help = "Accept headers with bad checksums, logging a warning instead",
        global = true
    )]
    lenient: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());

    let level = if opts.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let policy = if opts.lenient {
        ChecksumPolicy::Warn
    } else {
        ChecksumPolicy::Strict
    };

    let result: anyhow::Result<()> = match opts.cmd {
        Commands::Create {
            path,
            selected_files,
        } => commands::create(path.clone(), selected_files, opts.verbose)
            .with_context(|| format!("Creating `{}` failed", path.display())),
        Commands::List { path } => commands::list(path.clone(), policy)
            .with_context(|| format!("Listing `{}` failed", path.display())),
        Commands::Extract { path, output } => {
            commands::extract(path.clone(), output, policy, opts.verbose)
                .map(|_| ())
                .with_context(|| format!("Extracting `{}` failed", path.display()))
        }
    };

    if let Err(e) = result {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
