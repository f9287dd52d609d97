//! Article reference parsing for Korean statute citations.
//!
//! Parent-law links carry a free-text `related_articles` field such as
//! `"제3조, 제5조의2 제1항"`. This module extracts the article numbers in it
//! and orders them the way the articles sit in the statute.
//!
//! # Korean article numbering conventions
//!
//! - Plain article: 제1조, 제2조, ..., 제10조
//! - Branch article (inserted by amendment): 제5조의2 sits between 제5조 and 제6조
//! - Paragraphs and items (제1항, 제2호) narrow a citation but do not change
//!   which article is cited; they are ignored here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One cited article: `제{article}조` or `제{article}조의{branch}`.
///
/// Ordering is by article, then branch, so 제5조의2 sits between 제5조 and 제6조.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArticleRef {
    pub article: u32,
    /// `0` for a plain article.
    pub branch: u32,
}

impl ArticleRef {
    pub fn new(article: u32, branch: u32) -> Self {
        Self { article, branch }
    }
}

impl fmt::Display for ArticleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.branch == 0 {
            write!(f, "제{}조", self.article)
        } else {
            write!(f, "제{}조의{}", self.article, self.branch)
        }
    }
}

/// Whether a `related_articles` value scopes the link to specific articles.
///
/// Only "non-empty after trimming" counts; the text has no defined grammar.
pub fn is_scoped(related_articles: Option<&str>) -> bool {
    related_articles.is_some_and(|s| !s.trim().is_empty())
}

/// Extract every article reference from free text, sorted by article number
/// and deduplicated.
///
/// Input: `"제5조의2, 제3조 제1항, 제3조"`
/// Output: `[제3조, 제5조의2]`
///
/// # Algorithm
///
/// 1. Scan for `제`, skip whitespace, read ASCII digits
/// 2. Require `조` after the digits, otherwise discard the candidate
/// 3. An optional `의` followed by digits sets the branch number
/// 4. Sort and deduplicate
pub fn parse_articles(text: &str) -> Vec<ArticleRef> {
    let chars: Vec<char> = text.chars().collect();
    let mut refs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '제' {
            i += 1;
            continue;
        }
        let mut j = skip_spaces(&chars, i + 1);
        let (article, after_digits) = read_number(&chars, j);
        let Some(article) = article else {
            i += 1;
            continue;
        };
        j = skip_spaces(&chars, after_digits);
        if chars.get(j) != Some(&'조') {
            i = after_digits;
            continue;
        }
        j += 1;

        // Branch suffix: 의2
        let mut branch = 0;
        let k = skip_spaces(&chars, j);
        if chars.get(k) == Some(&'의') {
            let (num, after) = read_number(&chars, skip_spaces(&chars, k + 1));
            if let Some(num) = num {
                branch = num;
                j = after;
            }
        }

        refs.push(ArticleRef::new(article, branch));
        i = j;
    }

    refs.sort();
    refs.dedup();
    refs
}

fn skip_spaces(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn read_number(chars: &[char], start: usize) -> (Option<u32>, usize) {
    let mut end = start;
    let mut value: u32 = 0;
    while end < chars.len() {
        let Some(d) = chars[end].to_digit(10) else {
            break;
        };
        value = value.saturating_mul(10).saturating_add(d);
        end += 1;
    }
    if end == start {
        (None, start)
    } else {
        (Some(value), end)
    }
}
