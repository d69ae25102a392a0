//! Rendering of transcript snapshots.
//!
//! Incoming entries render as two stacked lines — the message and its
//! feedback annotation (or the placeholder while the annotation is still in
//! flight). Outgoing entries render as a single line.

use colored::Colorize;
use tutor_transcript::{Entry, Origin};

pub fn render_transcript(entries: &[Entry]) {
    println!("{}", "────────────────────────────────".dimmed());
    for entry in entries {
        render_entry(entry);
    }
}

fn render_entry(entry: &Entry) {
    match entry.origin {
        Origin::Incoming => {
            println!("{} {}", "you:".bold().blue(), entry.text());
            if let Some(feedback) = entry.feedback() {
                for line in feedback.lines() {
                    println!("     {}", line.yellow());
                }
            }
        }
        Origin::Outgoing => {
            println!("{} {}", "tutor:".bold().green(), entry.text());
        }
    }
}
