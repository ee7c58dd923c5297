use console::{measure_text_width, style};
use std::fmt::Display;

fn box_width_limit() -> usize {
    let terminal_width = console::Term::stdout().size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), 120).max(60)
}

/// Breaks `text` into lines no wider than `max_width` columns, preferring spaces.
pub fn wrap_lines(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut wrapped = Vec::new();

    for line in text.lines() {
        if measure_text_width(line) <= max_width {
            wrapped.push(line.to_string());
            continue;
        }

        let start = wrapped.len();
        let mut current = String::new();
        for word in line.split(' ') {
            let candidate_width = if current.is_empty() {
                measure_text_width(word)
            } else {
                measure_text_width(&current) + 1 + measure_text_width(word)
            };

            if candidate_width <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            if !current.is_empty() {
                wrapped.push(std::mem::take(&mut current));
            }

            // No good break point, cut the word itself
            let mut chunk = String::new();
            for ch in word.chars() {
                chunk.push(ch);
                if measure_text_width(&chunk) >= max_width {
                    wrapped.push(std::mem::take(&mut chunk));
                }
            }
            current = chunk;
        }
        if !current.is_empty() || wrapped.len() == start {
            wrapped.push(current);
        }
    }

    wrapped
}

/// Display an assistant reply in a formatted box
pub fn display_response(response: &str) {
    let max_width = box_width_limit();
    let wrapped_lines = wrap_lines(response, max_width.saturating_sub(4));

    let content_max_len = wrapped_lines
        .iter()
        .map(|line| measure_text_width(line))
        .max()
        .unwrap_or(0);
    let box_width = std::cmp::min(max_width, content_max_len + 4);

    let top_border = "┌".to_string() + &"─".repeat(box_width - 2) + "┐";
    let bottom_border = "└".to_string() + &"─".repeat(box_width - 2) + "┘";

    println!("\n{}", style("🤖 ASSISTANT").bold().blue());
    println!("{}", style(&top_border).dim().blue());

    for line in wrapped_lines {
        let padding = box_width.saturating_sub(measure_text_width(&line) + 3);
        println!("│ {}{}│", style(&line).white(), " ".repeat(padding));
    }

    println!("{}", style(&bottom_border).dim().blue());
}

pub fn display_error(error: &dyn Display) {
    eprintln!("{} {}", style("✗").bold().red(), style(error).red());
}

pub fn display_info(message: &str) {
    println!("{}", style(message).dim());
}

pub fn display_welcome(provider: &str, model: &str) {
    println!(
        "{} {}",
        style("lmchat").bold().magenta(),
        style(format!("({} · {})", provider, model)).dim()
    );
    println!(
        "Type '/help' for available commands. Press Ctrl+D or type /quit to exit."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(wrap_lines("one\ntwo", 20), vec!["one", "two"]);
    }

    #[test]
    fn long_lines_break_at_spaces() {
        let lines = wrap_lines("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().all(|l| measure_text_width(l) <= 10));
    }

    #[test]
    fn unbroken_words_are_cut() {
        let lines = wrap_lines("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }
}
