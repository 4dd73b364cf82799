//! Split display text into plain and highlighted spans for matched search terms.

#![forbid(unsafe_code)]

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Span<'a> {
    Plain(&'a str),
    Highlighted(&'a str),
}

impl<'a> Span<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Span::Plain(s) | Span::Highlighted(s) => s,
        }
    }

    pub fn is_highlighted(&self) -> bool { matches!(self, Span::Highlighted(_)) }
}

// Simple case folding: first char of the lowercase mapping, so one text char
// always compares against one keyword char.
fn fold(c: char) -> char { c.to_lowercase().next().unwrap_or(c) }

/// Lazy span iterator returned by [`highlight`].
pub struct Highlights<'a> {
    text: &'a str,
    // (byte offset, folded char) per char of `text`
    chars: Vec<(usize, char)>,
    keywords: Vec<Vec<char>>,
    pos: usize,
}

/// Case-insensitive highlight of `keywords` inside `text`.
///
/// The earliest match wins (the longest keyword on a tie) and scanning resumes
/// after it, so highlighted spans never overlap. Concatenating the span texts
/// yields `text` unchanged.
pub fn highlight<'a, S: AsRef<str>>(text: &'a str, keywords: &[S]) -> Highlights<'a> {
    let mut keywords: Vec<Vec<char>> = keywords
        .iter()
        .map(|k| k.as_ref().chars().map(fold).collect::<Vec<char>>())
        .filter(|k| !k.is_empty())
        .collect();
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    keywords.dedup();
    Highlights { text, chars: text.char_indices().map(|(i, c)| (i, fold(c))).collect(), keywords, pos: 0 }
}

impl<'a> Highlights<'a> {
    fn byte_at(&self, char_idx: usize) -> usize {
        self.chars.get(char_idx).map(|(b, _)| *b).unwrap_or(self.text.len())
    }

    // Longest keyword matching at `at`, in chars.
    fn match_len_at(&self, at: usize) -> Option<usize> {
        self.keywords.iter().find_map(|kw| {
            let end = at + kw.len();
            if end > self.chars.len() {
                return None;
            }
            let hit = self.chars[at..end].iter().zip(kw.iter()).all(|((_, c), k)| c == k);
            hit.then_some(kw.len())
        })
    }
}

impl<'a> Iterator for Highlights<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Span<'a>> {
        if self.pos >= self.chars.len() {
            return None;
        }
        let start = self.pos;
        for at in start..self.chars.len() {
            if let Some(len) = self.match_len_at(at) {
                if at == start {
                    self.pos = at + len;
                    return Some(Span::Highlighted(&self.text[self.byte_at(start)..self.byte_at(self.pos)]));
                }
                self.pos = at;
                return Some(Span::Plain(&self.text[self.byte_at(start)..self.byte_at(at)]));
            }
        }
        self.pos = self.chars.len();
        Some(Span::Plain(&self.text[self.byte_at(start)..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(text: &'static str, kws: &[&str]) -> Vec<Span<'static>> { highlight(text, kws).collect() }

    fn joined(text: &str, kws: &[&str]) -> String { highlight(text, kws).map(|s| s.text()).collect() }

    #[test]
    fn highlights_case_insensitively() {
        assert_eq!(
            spans("db.Example.com", &["example"]),
            vec![Span::Plain("db."), Span::Highlighted("Example"), Span::Plain(".com")]
        );
    }

    #[test]
    fn no_keywords_is_one_plain_span() {
        assert_eq!(spans("hello", &[]), vec![Span::Plain("hello")]);
        assert_eq!(spans("hello", &[""]), vec![Span::Plain("hello")]);
        assert!(spans("", &["x"]).is_empty());
    }

    #[test]
    fn overlapping_keywords_do_not_overlap() {
        let out = spans("aaaa", &["aa", "aaa"]);
        assert_eq!(out, vec![Span::Highlighted("aaa"), Span::Plain("a")]);
        let out = spans("abcabc", &["bc", "ab"]);
        assert_eq!(out, vec![Span::Highlighted("ab"), Span::Plain("c"), Span::Highlighted("ab"), Span::Plain("c")]);
    }

    #[test]
    fn adjacent_matches_are_separate_spans() {
        assert_eq!(spans("foofoo", &["foo"]), vec![Span::Highlighted("foo"), Span::Highlighted("foo")]);
    }

    #[test]
    fn reconstruction_is_lossless() {
        let cases: &[(&str, &[&str])] = &[
            ("teleport-local", &["tele", "local", "-"]),
            ("ÄÖÜ straße", &["ö", "STRASSE", "ß"]),
            ("x", &["x", "xx"]),
            ("postgres://db.example.com:5432", &["db.example.com", "5432", "post"]),
            ("İstanbul", &["i", "stan"]),
            ("日本語テキスト", &["本", "キス"]),
        ];
        for (text, kws) in cases {
            assert_eq!(joined(text, kws), *text, "text {:?} kws {:?}", text, kws);
        }
    }

    #[test]
    fn unicode_boundaries_are_respected() {
        assert_eq!(spans("ÄBc", &["ä"]), vec![Span::Highlighted("Ä"), Span::Plain("Bc")]);
    }
}
