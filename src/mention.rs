//! `@username` extraction and resolution.
//!
//! Links win over mentions: a mention-looking token that falls inside a URL
//! (`https://x.com/@someone`) is part of the link, not a mention. An `@` glued
//! to a preceding word (`ana@example.com`) does not start a mention, and
//! trailing periods are sentence punctuation, not part of the username.

use std::collections::BTreeSet;
use std::ops::Range;

use regex::Regex;

use crate::error::Result;
use crate::models::{Profile, UserId};
use crate::store::Store;

lazy_static::lazy_static! {
    static ref URL: Regex = Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url pattern");
    static ref MENTION: Regex =
        Regex::new(r"(?:^|[^\w.@])(@([A-Za-z0-9._]+))").expect("valid mention pattern");
}

/// A piece of body text, as a renderer would treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Url(&'a str),
    /// The username, without the leading `@`.
    Mention(&'a str),
}

fn url_spans(text: &str) -> Vec<Range<usize>> {
    URL.find_iter(text).map(|m| m.range()).collect()
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Mention matches that do not overlap a URL: (`@name` span, username).
fn mention_spans<'a>(text: &'a str, urls: &[Range<usize>]) -> Vec<(Range<usize>, &'a str)> {
    MENTION
        .captures_iter(text)
        .filter_map(|caps| {
            let token = caps.get(1)?;
            let name = caps.get(2)?.as_str().trim_end_matches('.');
            if name.is_empty() {
                return None;
            }
            let span = token.start()..token.start() + 1 + name.len();
            (!urls.iter().any(|u| overlaps(u, &token.range()))).then_some((span, name))
        })
        .collect()
}

/// Usernames mentioned in `text`, deduplicated.
pub fn extract_mentions(text: &str) -> BTreeSet<String> {
    let urls = url_spans(text);
    mention_spans(text, &urls)
        .into_iter()
        .map(|(_, name)| name.to_owned())
        .collect()
}

/// Splits `text` into plain text, links and mentions.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let urls = url_spans(text);
    let mut marks: Vec<(Range<usize>, Segment<'_>)> = urls
        .iter()
        .map(|r| (r.clone(), Segment::Url(&text[r.clone()])))
        .chain(
            mention_spans(text, &urls)
                .into_iter()
                .map(|(r, name)| (r, Segment::Mention(name))),
        )
        .collect();
    marks.sort_by_key(|(r, _)| r.start);

    let mut out = Vec::with_capacity(marks.len() * 2 + 1);
    let mut cursor = 0;
    for (range, seg) in marks {
        if range.start > cursor {
            out.push(Segment::Text(&text[cursor..range.start]));
        }
        out.push(seg);
        cursor = range.end;
    }
    if cursor < text.len() {
        out.push(Segment::Text(&text[cursor..]));
    }
    out
}

/// Whether `name` is a well-formed username (the mention grammar minus `@`).
pub fn is_username(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

/// Shortens `text` to at most `max_chars` characters, marking the cut with an
/// ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        None => text.to_owned(),
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
    }
}

/// Profiles addressed by `mentions`, minus the author. Unknown usernames are
/// dropped.
pub(crate) async fn resolve(
    store: &Store,
    mentions: &BTreeSet<String>,
    author_id: UserId,
) -> Result<Vec<Profile>> {
    if mentions.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = mentions.iter().map(String::as_str).collect();
    let mut found = store.profiles_by_usernames(&names).await?;
    found.retain(|p| p.id != author_id);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn mentions_inside_urls_are_ignored() {
        assert_eq!(
            extract_mentions("hey @bob check https://x.com/@notamention and @alice"),
            set(&["alice", "bob"])
        );
        assert_eq!(extract_mentions("see www.example.com/@nobody"), set(&[]));
    }

    #[test]
    fn mentions_are_deduplicated() {
        assert_eq!(extract_mentions("@ana @ana.b @ana"), set(&["ana", "ana.b"]));
        assert!(extract_mentions("no mentions @ here").is_empty());
    }

    #[test]
    fn sentence_punctuation_and_emails() {
        assert_eq!(extract_mentions("thanks @bob."), set(&["bob"]));
        assert_eq!(extract_mentions("ping @ana.b... and @..."), set(&["ana.b"]));
        assert_eq!(extract_mentions("mail ana@bob.com or @carol"), set(&["carol"]));
        assert_eq!(extract_mentions("@a@b"), set(&["a"]));
        assert_eq!(
            segments("thanks @bob."),
            vec![
                Segment::Text("thanks "),
                Segment::Mention("bob"),
                Segment::Text("."),
            ]
        );
    }

    #[test]
    fn token_grammar() {
        assert_eq!(extract_mentions("(@x_y.z9)!"), set(&["x_y.z9"]));
        assert_eq!(extract_mentions("@joão"), set(&["jo"]));
        assert!(is_username("a.b_c1"));
        assert!(!is_username(""));
        assert!(!is_username("a-b"));
    }

    #[test]
    fn segments_prefer_urls() {
        let text = "hi @bob, https://x.com/@carol ok";
        assert_eq!(
            segments(text),
            vec![
                Segment::Text("hi "),
                Segment::Mention("bob"),
                Segment::Text(", "),
                Segment::Url("https://x.com/@carol"),
                Segment::Text(" ok"),
            ]
        );
        assert!(segments("").is_empty());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("  padded  ", 100), "padded");

        let long = "é".repeat(150);
        let p = preview(&long, 100);
        assert_eq!(p.chars().count(), 101);
        assert!(p.ends_with('…'));

        assert_eq!(preview("abcd efgh", 5), "abcd…");
    }
}
