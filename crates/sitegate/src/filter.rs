//! Client-side list filtering.
//!
//! Every record list supports the same two kinds of narrowing: a free-text
//! search across a handful of text fields, and zero or more "dropdown"
//! facets that must match exactly (case-insensitively). A facet value of
//! `all` is the dropdown's "no filter" option and is ignored.

use tracing::trace;

/// Facet value that disables a dropdown filter.
pub const ALL: &str = "all";

/// A record that can be narrowed by a [`ListFilter`].
pub trait Searchable {
    /// Text fields scanned by the free-text search.
    fn search_fields(&self) -> Vec<&str>;

    /// Value of a named dropdown facet, if the record has one.
    fn facet(&self, name: &str) -> Option<String>;
}

/// Free-text search plus dropdown facets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    search: Option<String>,
    facets: Vec<(String, String)>,
}

impl ListFilter {
    /// A filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text search term. Blank terms are ignored.
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let term = term.trim();
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        };
        self
    }

    /// Require a facet to equal the given value. `all` clears the facet.
    #[must_use]
    pub fn facet(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        self.facets.retain(|(n, _)| *n != name);
        if !value.trim().eq_ignore_ascii_case(ALL) && !value.trim().is_empty() {
            self.facets.push((name, value.trim().to_string()));
        }
        self
    }

    /// Add a facet only when a value is present.
    #[must_use]
    pub fn facet_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.facet(name, value),
            None => self,
        }
    }

    /// Check whether the filter narrows anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.facets.is_empty()
    }

    /// Check a single record against the filter.
    #[must_use]
    pub fn matches<T: Searchable>(&self, item: &T) -> bool {
        if let Some(term) = &self.search {
            let hit = item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(term.as_str()));
            if !hit {
                return false;
            }
        }

        self.facets.iter().all(|(name, wanted)| {
            item.facet(name)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted))
        })
    }

    /// Keep only the records that match.
    #[must_use]
    pub fn apply<T: Searchable>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        let before = items.len();
        let kept: Vec<T> = items.into_iter().filter(|item| self.matches(item)).collect();
        trace!(before, after = kept.len(), "Applied list filter");
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
        trade: &'static str,
        role: &'static str,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name, self.trade]
        }

        fn facet(&self, name: &str) -> Option<String> {
            match name {
                "role" => Some(self.role.to_string()),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "Aisha Khan",
                trade: "Bricklayer",
                role: "operative",
            },
            Row {
                name: "Tom Reed",
                trade: "Scaffolder",
                role: "operative",
            },
            Row {
                name: "Jo Park",
                trade: "Site management",
                role: "manager",
            },
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = ListFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(rows()).len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filter = ListFilter::new().search("BRICK");
        let kept = filter.apply(rows());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Aisha Khan");
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = ListFilter::new().search("   ");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_facet_filters_exactly() {
        let filter = ListFilter::new().facet("role", "Operative");
        assert_eq!(filter.apply(rows()).len(), 2);
    }

    #[test]
    fn test_all_facet_is_ignored() {
        let filter = ListFilter::new().facet("role", "all");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_facet_replaces_previous_value() {
        let filter = ListFilter::new()
            .facet("role", "manager")
            .facet("role", "operative");
        assert_eq!(filter.apply(rows()).len(), 2);
    }

    #[test]
    fn test_unknown_facet_matches_nothing() {
        let filter = ListFilter::new().facet("status", "active");
        assert!(filter.apply(rows()).is_empty());
    }

    #[test]
    fn test_search_and_facet_combined() {
        let filter = ListFilter::new().search("re").facet("role", "operative");
        let kept = filter.apply(rows());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Tom Reed");
    }

    #[test]
    fn test_facet_opt_none() {
        let filter = ListFilter::new().facet_opt("role", None::<String>);
        assert!(filter.is_empty());
    }
}
