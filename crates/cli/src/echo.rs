use offprint_core::Document;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Offprint".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Save column articles for offline reading\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print one labelled field of a summary block
pub fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white());
}

/// Print the assembled article header and how many comments were kept
pub fn print_document_summary(document: &Document) {
    print_field("Title", &document.title);
    print_field("Author", &document.author_name);
    print_field("Published", &document.published_time);
    if !document.topics.is_empty() {
        print_field("Topics", &document.topics.join(", "));
    }
    print_field("Comments", &comment_coverage(document.comments.len(), document.comments_count));
    eprintln!();
}

/// "shown of total", or just the count when everything was fetched
pub fn comment_coverage(shown: usize, total: u64) -> String {
    if total > shown as u64 { format!("{shown} of {total}") } else { shown.to_string() }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
