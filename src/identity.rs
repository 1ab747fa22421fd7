//! Book identity derived from folder names.
//!
//! Every stage (extraction, consolidation, audit, backfill) goes through
//! [`BookIdentity::from_folder_name`], so a physical book resolves to the same
//! identity no matter which stage or run looks at it.

use std::fmt;

use crate::util::strip_whitespace;

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookIdentity {
    pub title: String,
    pub author: String,
}

impl BookIdentity {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// `Title_Parts_Author` → title `"Title Parts"`, author `"Author"`.
    /// A name without an underscore is all title with an unknown author.
    pub fn from_folder_name(folder_name: &str) -> Self {
        let trimmed = folder_name.trim();
        let parts: Vec<&str> = trimmed
            .split('_')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        match parts.split_last() {
            Some((author, title_parts)) if !title_parts.is_empty() => {
                let title = title_parts.join(" ");
                Self::new(title, *author)
            }
            _ => {
                let title = if parts.is_empty() {
                    trimmed.to_string()
                } else {
                    parts.join(" ")
                };
                Self::new(title, UNKNOWN_AUTHOR)
            }
        }
    }

    pub fn has_known_author(&self) -> bool {
        self.author != UNKNOWN_AUTHOR
    }

    /// Output folder name used when writing page records.
    pub fn slug(&self) -> String {
        format!(
            "{}_{}",
            strip_whitespace(&self.title),
            strip_whitespace(&self.author)
        )
    }

    /// Grouping key for consolidation; tolerant of whitespace and case drift.
    pub fn title_key(&self) -> String {
        strip_whitespace(&self.title).to_lowercase()
    }
}

impl fmt::Display for BookIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_underscore_part_is_the_author() {
        let identity = BookIdentity::from_folder_name("The_Winter_Of_My_Soul_JaneDoe");
        assert_eq!(identity.title, "The Winter Of My Soul");
        assert_eq!(identity.author, "JaneDoe");
        assert_eq!(identity.slug(), "TheWinterOfMySoul_JaneDoe");
    }

    #[test]
    fn name_without_separator_has_unknown_author() {
        let identity = BookIdentity::from_folder_name("TheWinterOfMySoul");
        assert_eq!(identity.title, "TheWinterOfMySoul");
        assert_eq!(identity.author, UNKNOWN_AUTHOR);
        assert!(!identity.has_known_author());
    }

    #[test]
    fn identity_is_a_pure_function_of_the_name() {
        let a = BookIdentity::from_folder_name("TheWinterOfMySoul_JaneDoe");
        let b = BookIdentity::from_folder_name("TheWinterOfMySoul_JaneDoe");
        assert_eq!(a, b);
        assert_eq!(
            a.title_key(),
            BookIdentity::from_folder_name("TheWinterOfMySoul").title_key()
        );
    }

    #[test]
    fn stray_separators_are_ignored() {
        let identity = BookIdentity::from_folder_name("_Dune__Herbert_");
        assert_eq!(identity.title, "Dune");
        assert_eq!(identity.author, "Herbert");
    }
}
