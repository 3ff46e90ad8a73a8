//! picshard - converts any file into pictures and back.
//!
//! Mostly used in combination with cloud storage that only accepts images.

use clap::Parser;
use picshard::{compile, spread};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picshard")]
#[command(version)]
#[command(about = "Converts any file or directory into pictures and back. \
Mostly used in combination with cloud storage that only accepts images.")]
struct Cli {
    /// Action to perform (spread or compile)
    #[arg(short, long, value_name = "action")]
    action: Option<String>,

    /// Source file or directory
    #[arg(short, long, value_name = "path")]
    source: Option<PathBuf>,

    /// Target directory
    #[arg(short, long, value_name = "path")]
    target: Option<PathBuf>,
}

enum Action {
    Spread,
    Compile,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    std::process::exit(run(cli));
}

/// Validate arguments and dispatch. Each kind of misuse gets its own exit
/// code so scripts driving the tool can tell them apart.
fn run(cli: Cli) -> i32 {
    let Some(action) = cli.action else {
        error!("no action given");
        return -1;
    };
    let action = match action.as_str() {
        "spread" => Action::Spread,
        "compile" => Action::Compile,
        other => {
            error!(action = other, "unknown action");
            return -2;
        }
    };

    let Some(source) = cli.source else {
        error!("source not given");
        return -3;
    };
    let source = absolutize(&source);
    if !source.exists() {
        error!(source = %source.display(), "source does not exist");
        return -4;
    }
    if !source.is_file() && !source.is_dir() {
        error!(source = %source.display(), "source is neither a file nor a directory");
        return -5;
    }

    let Some(target) = cli.target else {
        error!("target not given");
        return -6;
    };
    let target = absolutize(&target);
    if target.exists() && !target.is_dir() {
        error!(target = %target.display(), "target exists and is not a directory");
        return -7;
    }

    let result = match action {
        Action::Spread => spread(&source, &target),
        Action::Compile => compile(&source, &target),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            -8
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
