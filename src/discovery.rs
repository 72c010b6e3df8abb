//! Input file discovery
//!
//! Resolves the discovery pattern into an ordered list of slide files.
//! Three pattern shapes are understood:
//!
//! - `a.html, b.html`: an explicit comma-separated list
//! - `*.html`: every regular file in the directory with that extension
//!   (case-insensitive)
//! - anything else: a single literal file name
//!
//! Results are always in natural order, so `2.html` sorts before `10.html`.

use regex::Regex;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::Result;

fn suffix_glob() -> &'static Regex {
    static SUFFIX_GLOB: OnceLock<Regex> = OnceLock::new();
    SUFFIX_GLOB.get_or_init(|| Regex::new(r"^\*\.(\w+)$").expect("static pattern"))
}

/// Resolve `pattern` against the given directory entries (file names only)
pub fn discover<S: AsRef<str>>(pattern: &str, entries: &[S]) -> Vec<String> {
    let mut list: Vec<String> = if pattern.contains(',') {
        pattern
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    } else if let Some(caps) = suffix_glob().captures(pattern.trim()) {
        let suffix = format!(".{}", caps[1].to_lowercase());
        entries
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| name.to_lowercase().ends_with(&suffix))
            .map(str::to_string)
            .collect()
    } else {
        vec![pattern.trim().to_string()]
    };

    list.sort_by(|a, b| natural_cmp(a, b));
    list
}

/// Resolve `pattern` against the regular files of `dir`
pub fn discover_in(dir: &Path, pattern: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    debug!("Scanned {} files in {}", names.len(), dir.display());
    Ok(discover(pattern, &names))
}

/// Numeric-aware, case-insensitive ordering
///
/// Runs of ASCII digits compare by numeric value. Other characters compare
/// ignoring case, with punctuation before digits and digits before letters.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        let (x, y) = match (left.peek(), right.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&x), Some(&y)) => (x, y),
        };

        let ord = if x.is_ascii_digit() && y.is_ascii_digit() {
            cmp_digits(&take_digits(&mut left), &take_digits(&mut right))
        } else {
            left.next();
            right.next();
            char_rank(x)
                .cmp(&char_rank(y))
                .then_with(|| x.to_lowercase().cmp(y.to_lowercase()))
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn char_rank(c: char) -> u8 {
    if c.is_ascii_digit() {
        1
    } else if c.is_alphabetic() {
        2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_suffix_glob_sorts_naturally() {
        let entries = ["2.html", "10.html", "1.html", "notes.txt"];
        assert_eq!(
            discover("*.html", &entries),
            vec!["1.html", "2.html", "10.html"]
        );
    }

    #[test]
    fn test_suffix_glob_is_case_insensitive() {
        let entries = ["A.HTML", "b.html", "c.htm"];
        assert_eq!(discover("*.HTML", &entries), vec!["A.HTML", "b.html"]);
        assert_eq!(discover("*.htm", &entries), vec!["c.htm"]);
    }

    #[test]
    fn test_comma_list_is_trimmed() {
        let entries: [&str; 0] = [];
        assert_eq!(
            discover("a.html, b.html", &entries),
            vec!["a.html", "b.html"]
        );
        assert_eq!(discover(" , x.html,,", &entries), vec!["x.html"]);
    }

    #[test]
    fn test_literal_name() {
        let entries = ["deck.html"];
        assert_eq!(discover("missing.html", &entries), vec!["missing.html"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let entries = ["a.txt"];
        assert!(discover("*.html", &entries).is_empty());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("2.html", "10.html"), Ordering::Less);
        assert_eq!(natural_cmp("slide-9", "slide-10"), Ordering::Less);
        assert_eq!(natural_cmp("007", "7"), Ordering::Equal);
        assert_eq!(natural_cmp("Intro", "intro"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "B"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn test_punctuation_sorts_before_digits() {
        assert_eq!(natural_cmp("slide.html", "slide10.html"), Ordering::Less);
        assert_eq!(natural_cmp("1.html", "1a.html"), Ordering::Less);
        assert_eq!(natural_cmp("9z", "10a"), Ordering::Less);
    }
}
