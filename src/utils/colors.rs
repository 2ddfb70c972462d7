// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::Colorize;
use console::Term;

/// Decide whether to emit colours
///
/// An explicit setting wins; otherwise colours are on for an interactive
/// stdout unless `NO_COLOR` is set.
pub fn should_use_colors(explicit: Option<bool>) -> bool {
    if let Some(color) = explicit {
        return color;
    }

    // Respect NO_COLOR environment variable
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    Term::stdout().features().colors_supported()
}

/// Apply the colour decision process-wide
pub fn configure_colors(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Whether stdout is an interactive terminal (spinners only make sense there)
pub fn is_interactive() -> bool {
    Term::stdout().is_term()
}

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.len().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}
