//! Command-line surface and the one-shot run pipeline
//!
//! A run is strictly sequential: resolve the session files, load them,
//! print what was found, apply at most one action, then either preview the
//! change as a diff (dry-run) or write the files back.

use clap::{Parser, ValueEnum};
use clap_complete::Shell;

use crate::locator;
use crate::store::SessionStore;
use crate::ui::{diff, printer};
use crate::Result;

/// Mutating actions applicable to saved session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Change the current window to the selected one
    Wselect,
    /// Change the current tab to the selected one
    Tselect,
    /// Close the selected (or current) window
    Wclose,
    /// Close the selected (or current) tab
    Tclose,
    /// Repair saved session state
    Fix,
}

/// Process Firefox session-restore files
#[derive(Debug, Parser)]
#[command(name = "mozsession", version)]
#[command(about = "Inspect and repair Firefox session-restore state")]
pub struct Cli {
    /// Path to a session file, a profile directory, or a profile name
    #[arg(value_name = "FILE")]
    pub sessionstore: Option<String>,

    /// Be less verbose
    #[arg(short, long)]
    pub quiet: bool,

    /// Do nothing - only show changes
    #[arg(short = 'n', long, visible_alias = "dry-run")]
    pub pretend: bool,

    /// Use window N instead of the current one
    #[arg(short, long, value_name = "N")]
    pub window: Option<usize>,

    /// Use tab N instead of the current one
    #[arg(short, long, value_name = "N")]
    pub tab: Option<usize>,

    /// Find tabs with URL containing STR
    #[arg(short, long, visible_alias = "find", value_name = "STR")]
    pub grep: Option<String>,

    /// Change saved session state (use only while the browser is down)
    #[arg(long, value_enum, value_name = "ACTION", group = "act")]
    pub action: Option<Action>,

    /// Short form for --action=wselect
    #[arg(long, group = "act")]
    pub wselect: bool,

    /// Short form for --action=tselect
    #[arg(long, group = "act")]
    pub tselect: bool,

    /// Short form for --action=wclose
    #[arg(short = 'W', long, group = "act")]
    pub wclose: bool,

    /// Short form for --action=tclose
    #[arg(short = 'T', long, group = "act")]
    pub tclose: bool,

    /// Short form for --action=fix
    #[arg(short = 'f', long, group = "act")]
    pub fix: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// The requested action, from either spelling
    pub fn action(&self) -> Option<Action> {
        if self.wselect {
            Some(Action::Wselect)
        } else if self.tselect {
            Some(Action::Tselect)
        } else if self.wclose {
            Some(Action::Wclose)
        } else if self.tclose {
            Some(Action::Tclose)
        } else if self.fix {
            Some(Action::Fix)
        } else {
            self.action
        }
    }
}

/// Execute one resolved command line
pub fn run(cli: &Cli) -> Result<()> {
    let action = cli.action();
    let want_write = action.is_some();

    let profile = locator::resolve(cli.sessionstore.as_deref())?;
    let mut store = SessionStore::load(profile, want_write)?;

    let window = store.resolve_window(cli.window)?;
    let tab = store.resolve_tab(window, cli.tab)?;

    printer::print_file_info(store.file_info(), cli.quiet);
    if !cli.quiet {
        printer::print_session_meta(store.document());
    }
    if let Some(checkpoints) = store.checkpoints() {
        println!("checkpoint: {}", checkpoints.describe());
    }
    printer::print_windows(store.document(), window, tab, cli.quiet, cli.grep.as_deref());

    let Some(action) = action else {
        return Ok(());
    };

    // snapshots for the dry-run diff, taken before the mutation
    let data_name = file_name(&store);
    let before_doc = cli
        .pretend
        .then(|| diff::dump_for_diff(store.document().root(), "sessionstore"));
    let before_checkpoints = cli.pretend.then(|| {
        store
            .checkpoints()
            .map(|c| diff::dump_for_diff(&c.to_value(), "checkpoints"))
    });

    match action {
        Action::Wselect => store.select_window(window)?,
        Action::Tselect => store.select_tab(window, tab)?,
        Action::Wclose => store.close_window(window),
        Action::Tclose => store.close_tab(window, tab),
        Action::Fix => store.fix(),
    }

    if cli.pretend {
        if let Some(before) = before_doc {
            let after = diff::dump_for_diff(store.document().root(), "sessionstore");
            diff::print_unified(
                &before,
                &after,
                &format!("{} orig", data_name),
                &format!("{} changed", data_name),
            );
        }
        if let Some(Some(before)) = before_checkpoints {
            if let Some(checkpoints) = store.checkpoints() {
                let after = diff::dump_for_diff(&checkpoints.to_value(), "checkpoints");
                diff::print_unified(
                    &before,
                    &after,
                    "sessionCheckpoints.json orig",
                    "sessionCheckpoints.json changed",
                );
            }
        }
        return Ok(());
    }

    store.save()?;
    Ok(())
}

fn file_name(store: &SessionStore) -> String {
    store
        .data_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sessionstore".to_string())
}
