//! `depotview view` subcommands: inspect and transform the client view.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use depotview_core::mapping::{Direction, PathMapper, ViewFile};

use crate::style;

#[derive(Subcommand, Debug)]
pub enum ViewAction {
    /// Show the view rules.
    Show {
        /// Print the rules as view-file lines instead of a table.
        #[arg(long)]
        raw: bool,
    },

    /// Translate paths through the view.
    Translate {
        /// Paths to translate.
        #[arg(required = true)]
        paths: Vec<String>,

        /// Translate client paths back to depot paths.
        #[arg(short, long)]
        reverse: bool,
    },

    /// Check whether paths are mapped by the view.
    Includes {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the view with every rule's sides swapped.
    Reverse {
        /// Write the result to a view file.
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Compose the view with a second view whose left side is this view's
    /// right side.
    Join {
        /// View file mapping this view's right side onward.
        other: std::path::PathBuf,

        /// Write the result to a view file.
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
}

/// Dispatch a view subcommand.
pub fn run_view(mapper: PathMapper, action: ViewAction) -> Result<()> {
    match action {
        ViewAction::Show { raw } => run_show(&mapper, raw),
        ViewAction::Translate { paths, reverse } => run_translate(&mapper, &paths, reverse),
        ViewAction::Includes { paths } => run_includes(&mapper, &paths),
        ViewAction::Reverse { output } => emit(&mapper.reversed(), output.as_deref()),
        ViewAction::Join { other, output } => {
            let other = ViewFile::load(&other)
                .with_context(|| format!("failed to load view file {}", other.display()))?;
            let joined = PathMapper::join(&mapper, &other).context("failed to join views")?;
            emit(&joined, output.as_deref())
        }
    }
}

fn run_show(mapper: &PathMapper, raw: bool) -> Result<()> {
    if raw {
        for line in mapper.to_lines() {
            println!("{}", line);
        }
        return Ok(());
    }

    if mapper.is_empty() {
        println!();
        println!("{}", style::warn("No view rules configured"));
        println!();
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("View Rules ({})", mapper.count())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Kind", "Depot", "Client"]);

    for (i, rule) in mapper.rules().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(style::kind(rule.kind)),
            Cell::new(&rule.left),
            Cell::new(&rule.right),
        ]);
    }

    println!("{}", table);
    println!();
    Ok(())
}

fn run_translate(mapper: &PathMapper, paths: &[String], reverse: bool) -> Result<()> {
    let direction = if reverse {
        Direction::RightToLeft
    } else {
        Direction::LeftToRight
    };

    let mut unmapped = 0;
    for path in paths {
        match mapper.translate(path, direction) {
            Some(translated) => println!("{} -> {}", path, translated),
            None => {
                unmapped += 1;
                println!("{} -> {}", path, style::dim("(not mapped)"));
            }
        }
    }

    if unmapped > 0 {
        anyhow::bail!("{} of {} path(s) not mapped", unmapped, paths.len());
    }
    Ok(())
}

fn run_includes(mapper: &PathMapper, paths: &[String]) -> Result<()> {
    for path in paths {
        if mapper.includes(path) {
            println!("{}", style::success(path));
        } else {
            println!("{}", style::error(path));
        }
    }

    if !mapper.includes_all(paths) {
        anyhow::bail!("not every path is in the view");
    }
    Ok(())
}

fn emit(mapper: &PathMapper, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            ViewFile::save(path, mapper)
                .with_context(|| format!("failed to write view file {}", path.display()))?;
            println!(
                "{}",
                style::success(&format!("{} rule(s) written to {}", mapper.count(), path.display()))
            );
        }
        None => {
            for line in mapper.to_lines() {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
