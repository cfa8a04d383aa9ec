use std::io::Write;

use admitchat_ai::{Message, Role};
use admitchat_cli::{FALLBACK_REPLY, SessionEvent};
use colored::Colorize;

pub fn print_message(message: &Message) {
    match message.role {
        Role::Assistant => println!("{} {}", "Assistant:".cyan().bold(), message.content),
        Role::User => println!("{} {}", "You:".green().bold(), message.content),
        Role::System => {}
    }
}

pub fn print_hint(hint: &str) {
    println!("{}\n", hint.dimmed());
}

pub fn print_prompt() {
    print!("{} ", "You:".green().bold());
    let _ = std::io::stdout().flush();
}

/// Render one session event on the terminal.
pub fn render_event(event: &SessionEvent) {
    let mut stdout = std::io::stdout();
    match event {
        SessionEvent::Sending => {
            print!("{}", "Sending...".dimmed());
        }
        SessionEvent::Streaming => {
            // Replace the indicator with the reply label.
            print!("\r{}\r{} ", " ".repeat(10), "Assistant:".cyan().bold());
        }
        SessionEvent::TextDelta(text) => {
            print!("{}", text);
        }
        SessionEvent::Completed { .. } => {
            println!("\n");
        }
        SessionEvent::Failed { .. } => {
            println!("\n{} {}\n", "Assistant:".cyan().bold(), FALLBACK_REPLY.red());
        }
        SessionEvent::Cancelled => {
            println!(" {}\n", "[cancelled]".yellow());
        }
    }
    let _ = stdout.flush();
}
