use clap::Parser;
use clap_verbosity_flag::Verbosity;
use std::path::PathBuf;

mod commands;
mod error;

#[derive(Parser, Debug)]
#[command(name = "collider")]
#[command(about = "Client-side resource bookkeeping for a synthesis server", long_about = None)]
struct Args {
    #[command(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print the effective server options as TOML
    Options {
        /// Server options file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Allocate buses, buffers and node ids and print the results
    Alloc {
        /// Server options file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Number of stereo audio buses to allocate
        #[arg(long, default_value_t = 4)]
        buses: u32,
        /// Number of single buffers to allocate
        #[arg(long, default_value_t = 4)]
        buffers: u32,
        /// Number of temporary node ids to allocate
        #[arg(long, default_value_t = 4)]
        nodes: u32,
    },

    /// Run a local reply-correlation round trip
    Responders {
        /// Number of caller threads
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Replies awaited per caller thread
        #[arg(short, long, default_value_t = 100)]
        messages: u32,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    match args.command {
        Command::Options { config } => commands::options::handle_options(config)?,
        Command::Alloc { config, buses, buffers, nodes } => {
            commands::alloc::handle_alloc(config, buses, buffers, nodes)?
        }
        Command::Responders { threads, messages } => {
            commands::responders::handle_responders(threads, messages)?
        }
    }
    Ok(())
}
