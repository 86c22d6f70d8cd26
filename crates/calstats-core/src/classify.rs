//! Event categorisation.
//!
//! Every event lands in exactly one [`Category`]. Rules are tried in a fixed
//! priority order and the first one that matches wins; an event no rule claims
//! is a [`Category::Meeting`].

use std::fmt;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::event::{Event, ResponseStatus};

/// Description marker identifying a recruiting interview.
pub const DEFAULT_HIRING_MARKER: &str = "https://hire.lever.co/interviews";

/// The category assigned to an event.
///
/// Discriminants follow report column order, which differs from the order
/// rules are evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Personal = 0,
    Ignored = 1,
    Declined = 2,
    NotAccepted = 3,
    Hiring = 4,
    Meeting = 5,
}

impl Category {
    /// All categories in report column order.
    pub const ALL: [Category; 6] = [
        Category::Personal,
        Category::Ignored,
        Category::Declined,
        Category::NotAccepted,
        Category::Hiring,
        Category::Meeting,
    ];

    /// Column name as it appears in the CSV header.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Ignored => "ignored",
            Category::Declined => "declined",
            Category::NotAccepted => "not accepted",
            Category::Hiring => "hiring",
            Category::Meeting => "meeting",
        }
    }

    /// Whether time in this category makes a slot busy and counts toward load.
    pub fn is_counted(self) -> bool {
        matches!(self, Category::Hiring | Category::Meeting)
    }

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title patterns for events the viewer does not consider meetings.
///
/// Each pattern is anchored at both ends, so `1:1.*` matches `1:1 with Bob`
/// but not `Weekly 1:1`. Matching is case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Regex>,
}

impl IgnorePatterns {
    /// Compiles each pattern.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPattern`] for the first pattern that is not
    /// a valid regular expression.
    pub fn new<I, S>(patterns: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    CoreError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Parses an ignore list: one pattern per line with surrounding
    /// whitespace removed; blank lines and `#` comments skipped.
    pub fn from_lines(text: &str) -> CoreResult<Self> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Returns `true` if any pattern matches the whole title.
    pub fn matches(&self, title: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(title))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Non-fallback rules, in evaluation order.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Hiring,
    Personal,
    Ignored,
    Declined,
    NotAccepted,
}

const RULES: [Rule; 5] = [
    Rule::Hiring,
    Rule::Personal,
    Rule::Ignored,
    Rule::Declined,
    Rule::NotAccepted,
];

impl Rule {
    fn category(self) -> Category {
        match self {
            Rule::Hiring => Category::Hiring,
            Rule::Personal => Category::Personal,
            Rule::Ignored => Category::Ignored,
            Rule::Declined => Category::Declined,
            Rule::NotAccepted => Category::NotAccepted,
        }
    }
}

/// Assigns categories relative to one viewer.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    viewer: &'a str,
    patterns: &'a IgnorePatterns,
    hiring_marker: &'a str,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier for the calendar owned by `viewer`.
    pub fn new(viewer: &'a str, patterns: &'a IgnorePatterns, hiring_marker: &'a str) -> Self {
        Self {
            viewer,
            patterns,
            hiring_marker,
        }
    }

    /// Returns the category of `event`. Never fails.
    pub fn classify(&self, event: &Event) -> Category {
        RULES
            .into_iter()
            .find(|rule| self.matches(*rule, event))
            .map_or(Category::Meeting, Rule::category)
    }

    fn matches(&self, rule: Rule, event: &Event) -> bool {
        match rule {
            Rule::Hiring => {
                !self.hiring_marker.is_empty() && event.description.contains(self.hiring_marker)
            }
            Rule::Personal => {
                event.created_by_self()
                    && match event.attendees.as_slice() {
                        [] => true,
                        [only] => only.email == self.viewer,
                        _ => false,
                    }
            }
            Rule::Ignored => self.patterns.matches(&event.title),
            Rule::Declined => event
                .attendee_records(self.viewer)
                .any(|a| a.response_status == Some(ResponseStatus::Declined)),
            Rule::NotAccepted => event
                .attendee_records(self.viewer)
                .any(|a| a.response_status.is_some_and(|s| s != ResponseStatus::Accepted)),
        }
    }
}
