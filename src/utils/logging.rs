// file: src/utils/logging.rs
// description: tracing subscriber setup and console status-line helpers

use colored::{ColoredString, Colorize};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flag
/// so one-off debugging never needs a CLI change.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_ansi(colored_output)
        .init();
}

fn status_line(icon: ColoredString, body: impl std::fmt::Display) -> String {
    format!("{} {}", icon.bold(), body)
}

pub fn format_success(msg: &str) -> String {
    status_line("✓".green(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    status_line("✗".red(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    status_line("⚠".yellow(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    status_line("ℹ".blue(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    status_line(format!("[{}/{}]", step, total).cyan(), msg)
}
