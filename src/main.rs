use clap::{error::ErrorKind, CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use mozsession::cli::{Action, Cli};
use mozsession::SessionError;
use std::io;

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "mozsession", &mut io::stdout());
        return;
    }

    // argument consistency, checked before any file is opened
    let action = cli.action();
    if action == Some(Action::Wselect) && cli.window.is_none() {
        usage_error("for action 'wselect' --window must be specified");
    }
    if action == Some(Action::Tselect) && cli.tab.is_none() {
        usage_error("for action 'tselect' --tab must be specified");
    }
    if cli.pretend && action.is_none() {
        usage_error("no action selected - nothing for --pretend to preview");
    }

    if let Err(err) = mozsession::cli::run(&cli) {
        // out-of-range indices exit through the usage path, like any other
        // bad argument
        if let Some(range @ SessionError::Range { .. }) = err.downcast_ref::<SessionError>() {
            usage_error(&range.to_string());
        }
        eprintln!("{}", format!("Error: {:#}", err).red());
        std::process::exit(1);
    }
}

fn usage_error(message: &str) -> ! {
    let mut cmd = Cli::command();
    cmd.error(ErrorKind::InvalidValue, message).exit()
}
