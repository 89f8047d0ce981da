//! Helpers over message text: embedded GIF tokens, links and reaction tallies.

use std::collections::BTreeMap;

use shared::domain::Reactions;
use url::Url;

const GIF_OPEN: &str = "[GIF:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody<'a> {
    /// Text with the GIF token removed and trimmed.
    pub text: String,
    pub gif_url: Option<&'a str>,
}

/// Splits `"hello [GIF:https://...]"` into its text and GIF url.
/// Only the first token is recognized.
pub fn parse(content: &str) -> MessageBody<'_> {
    let Some(start) = content.find(GIF_OPEN) else {
        return MessageBody {
            text: content.to_string(),
            gif_url: None,
        };
    };
    let url_start = start + GIF_OPEN.len();
    let Some(len) = content[url_start..].find(']') else {
        return MessageBody {
            text: content.to_string(),
            gif_url: None,
        };
    };
    let url_end = url_start + len;
    let text = format!("{}{}", &content[..start], &content[url_end + 1..]);
    MessageBody {
        text: text.trim().to_string(),
        gif_url: Some(&content[url_start..url_end]),
    }
}

/// Content for a send that carries a GIF next to optional text.
pub fn embed_gif(text: &str, gif_url: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        format!("{GIF_OPEN}{gif_url}]")
    } else {
        format!("{text} {GIF_OPEN}{gif_url}]")
    }
}

/// First http(s) link in the text portion of a message, GIF token excluded.
pub fn first_link(content: &str) -> Option<Url> {
    parse(content)
        .text
        .split_whitespace()
        .filter(|word| word.starts_with("http://") || word.starts_with("https://"))
        .find_map(|word| Url::parse(word.trim_end_matches(['.', ',', ')', '!', '?'])).ok())
}

/// Emoji -> number of users who reacted with it.
pub fn reaction_counts(reactions: &Reactions) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for emoji in reactions.values() {
        *counts.entry(emoji.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Short single-line excerpt used as a reply snippet.
pub fn snippet(content: &str, max_chars: usize) -> String {
    let text = parse(content).text;
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
#[path = "tests/content_tests.rs"]
mod tests;
