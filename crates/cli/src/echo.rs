use owo_colors::OwoColorize;
use quill_core::{ImageOrigin, PublishOutcome, RunReport};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Quill".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Feed headlines in, illustrated posts out\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print an indented detail line under a step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the run summary
pub fn print_summary(report: &RunReport, elapsed: std::time::Duration) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Run Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    let origin = match report.cover.origin {
        ImageOrigin::Sourced => "reused from source".bright_green().to_string(),
        ImageOrigin::Synthesized => "synthesized".bright_white().to_string(),
    };
    let tags: Vec<&str> = report.document.tags.iter().map(|t| t.name.as_str()).collect();

    print_detail("Title", &report.topic.title);
    print_detail("Slug", &report.document.slug);
    eprintln!("  {} {}", "Cover:".dimmed(), origin);
    print_detail("Inline images", &report.inline_images.len().to_string());
    print_detail("Tags", &tags.join(", "));
    print_detail("Words", &report.document.markdown_body.split_whitespace().count().to_string());
    eprintln!("  {} {:>8.1}s\n", "Elapsed:".dimmed(), elapsed.as_secs_f64());

    match &report.receipt {
        Some(receipt) => {
            if receipt.cover_dropped {
                print_warning("Cover image was rejected and the post went out without it");
            }
            match &receipt.outcome {
                PublishOutcome::Published { url } => {
                    print_success(&format!("Published at {}", url.bright_white().underline()))
                }
                PublishOutcome::Unconfirmed => {
                    print_warning("Publish accepted but no post URL was returned; check the dashboard")
                }
            }
        }
        None => print_info("Dry run: nothing was published"),
    }
}
