use colored::*;
use std::io::Write;

use crate::core::{ChatMessage, Role};

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_warning(text: &str) {
    eprintln!("{}", text.yellow());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = std::io::stdout().flush();
}

/// One history entry, role label coloured by speaker.
pub fn print_message(message: &ChatMessage) {
    let label = match message.role {
        Role::System => "system".dimmed(),
        Role::User => "you".yellow().bold(),
        Role::Assistant => "buddy".green().bold(),
    };
    println!("{}: {}", label, message.content);
}
