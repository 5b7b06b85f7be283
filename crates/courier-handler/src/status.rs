//! Status code patterns.
//!
//! A pattern is a comma-separated list of literal codes (`404`) and class
//! wildcards (`4xx`). Entries that are neither are ignored.

use tracing::debug;

/// Codes that complete a job unless configured otherwise.
pub const DEFAULT_COMPLETION_PATTERN: &str = "1xx,2xx";

/// Codes that fail a job unless configured otherwise.
pub const DEFAULT_FAILURE_PATTERN: &str = "3xx,4xx,5xx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
  Exact(u16),
  Class(u16),
}

/// A parsed status code pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodePattern {
  entries: Vec<Entry>,
}

impl StatusCodePattern {
  pub fn parse(pattern: &str) -> Self {
    let entries = pattern
      .split(',')
      .map(str::trim)
      .filter(|entry| !entry.is_empty())
      .filter_map(|entry| {
        let parsed = parse_entry(entry);
        if parsed.is_none() {
          debug!(entry = %entry, "ignoring status code pattern entry");
        }
        parsed
      })
      .collect();

    Self { entries }
  }

  pub fn matches(&self, status: u16) -> bool {
    self.entries.iter().any(|entry| match entry {
      Entry::Exact(code) => *code == status,
      Entry::Class(class) => status / 100 == *class,
    })
  }
}

fn parse_entry(entry: &str) -> Option<Entry> {
  if entry.len() != 3 || !entry.is_ascii() {
    return None;
  }

  let (head, tail) = entry.split_at(1);
  let head = head.parse::<u16>().ok()?;

  if tail.eq_ignore_ascii_case("xx") {
    Some(Entry::Class(head))
  } else {
    entry.parse::<u16>().ok().map(Entry::Exact)
  }
}
