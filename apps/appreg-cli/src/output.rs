//! Terminal output helpers for consistent CLI formatting

/// Check if color output is enabled
pub fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Print a success message (green checkmark)
pub fn print_success(message: &str) {
    if use_color() {
        println!("\x1b[32m✓\x1b[0m {}", message);
    } else {
        println!("OK: {}", message);
    }
}

/// Print a warning message (yellow)
pub fn print_warning(message: &str) {
    if use_color() {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", message);
    } else {
        eprintln!("Warning: {}", message);
    }
}

/// Print an info message (blue)
pub fn print_info(message: &str) {
    if use_color() {
        println!("\x1b[34mℹ\x1b[0m {}", message);
    } else {
        println!("Info: {}", message);
    }
}

/// Print a key-value pair with consistent formatting
pub fn print_key_value(key: &str, value: &str) {
    if use_color() {
        println!("  \x1b[1m{}:\x1b[0m {}", key, value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Truncate a string for table display, handling Unicode safely.
///
/// If the string exceeds `max_len`, it is truncated with "..." appended.
/// Uses character boundaries to avoid panicking on multi-byte characters.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
