use anyhow::Result;
use clap::Parser;

use reshade_linux::{cli, commands, logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, args.command.name());
    let log = logging::Logger::new(args.command.name());

    match &args.command {
        cli::Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        cli::Command::Uninstall(opts) => commands::uninstall::run(&args.global, opts, &log),
        cli::Command::Reinstall(opts) => commands::reinstall::run(&args.global, opts, &log),
        cli::Command::List => commands::list::run(&args.global, &log),
        cli::Command::Classify(opts) => commands::classify::run(opts, &log),
        cli::Command::Merge => commands::merge::run(&args.global, &log),
        cli::Command::UpdateShaders(opts) => {
            commands::update_shaders::run(&args.global, opts, &log)
        }
        cli::Command::UpdateReshade => commands::update_reshade::run(&args.global, &log),
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
