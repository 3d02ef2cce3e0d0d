//! The outline document: Markdown headings, three levels deep.
//!
//! An [`Outline`] is replaced wholesale (a fresh generation or a user edit),
//! never patched, so it is a thin owned wrapper around the markup. Heading
//! analysis is informational only: the renderer accepts any markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ATX heading: 1–6 `#`, whitespace, title, optional closing `#`s.
static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ ]{0,3}(#{1,6})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").unwrap());

/// Deepest heading level the outline format uses.
pub const OUTLINE_DEPTH: u8 = 3;

/// Hierarchical outline markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(String);

impl Outline {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True when the markup holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// All heading lines in document order.
    ///
    /// Lines inside fenced code blocks are skipped.
    pub fn headings(&self) -> Vec<Heading> {
        let mut in_fence = false;
        let mut out = Vec::new();
        for line in self.0.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            if let Some(caps) = RE_HEADING.captures(line) {
                out.push(Heading {
                    level: caps[1].len() as u8,
                    title: caps[2].to_string(),
                });
            }
        }
        out
    }

    pub fn stats(&self) -> OutlineStats {
        let mut stats = OutlineStats::default();
        for h in self.headings() {
            match h.level {
                1 => stats.topics += 1,
                2 => stats.subtopics += 1,
                3 => stats.details += 1,
                _ => stats.deeper += 1,
            }
            stats.max_level = stats.max_level.max(h.level);
        }
        stats
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Outline {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Outline {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Outline {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One heading line of an outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 = topic, 2 = subtopic, 3 = detail; 4–6 are outside the format.
    pub level: u8,
    pub title: String,
}

/// Heading counts per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineStats {
    pub topics: usize,
    pub subtopics: usize,
    pub details: usize,
    /// Headings at level 4 or deeper.
    pub deeper: usize,
    /// Deepest level seen; 0 when there are no headings.
    pub max_level: u8,
}

impl OutlineStats {
    pub fn total(&self) -> usize {
        self.topics + self.subtopics + self.details + self.deeper
    }

    /// True when every heading stays within [`OUTLINE_DEPTH`] levels.
    pub fn within_depth(&self) -> bool {
        self.max_level <= OUTLINE_DEPTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_levels() {
        let o = Outline::from("# Pets\n## Cats\n## Dogs\n### Cats are friendly");
        let s = o.stats();
        assert_eq!(s.topics, 1);
        assert_eq!(s.subtopics, 2);
        assert_eq!(s.details, 1);
        assert_eq!(s.deeper, 0);
        assert_eq!(s.max_level, 3);
        assert_eq!(s.total(), 4);
        assert!(s.within_depth());
    }

    #[test]
    fn heading_titles_drop_closing_hashes() {
        let o = Outline::from("## Cats ##\n#Not a heading\n- bullet");
        let hs = o.headings();
        assert_eq!(
            hs,
            vec![Heading {
                level: 2,
                title: "Cats".into()
            }]
        );
    }

    #[test]
    fn deep_headings_are_flagged() {
        let o = Outline::from("# A\n#### Too deep");
        let s = o.stats();
        assert_eq!(s.deeper, 1);
        assert_eq!(s.max_level, 4);
        assert!(!s.within_depth());
    }

    #[test]
    fn fenced_code_is_ignored() {
        let o = Outline::from("# Real\n```\n# comment in code\n```\n## Also real");
        assert_eq!(o.headings().len(), 2);
    }

    #[test]
    fn blank_outline() {
        assert!(Outline::from("  \n\t").is_blank());
        assert!(!Outline::from("# A").is_blank());
        assert_eq!(Outline::from("").stats().max_level, 0);
    }
}
