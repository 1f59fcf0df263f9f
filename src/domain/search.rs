use serde::{Deserialize, Serialize};

use crate::domain::lounge::Lounge;
use crate::domain::post::{normalize_tag, Post};

pub const PREVIEW_LOUNGES: i64 = 5;
pub const PREVIEW_POSTS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    All,
    Lounge,
    Post,
}

impl SearchScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "lounge" => Some(Self::Lounge),
            "post" => Some(Self::Post),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Text(String),
    Tag(String),
}

impl SearchTerm {
    pub fn parse(query: &str) -> Result<Self, &'static str> {
        let query = query.trim();
        if query.is_empty() {
            return Err("q cannot be empty");
        }
        if query.starts_with('#') {
            let tag = normalize_tag(query);
            if tag.is_empty() {
                return Err("tag cannot be empty");
            }
            return Ok(Self::Tag(tag));
        }
        Ok(Self::Text(query.to_string()))
    }
}

/// LIMIT/OFFSET pair for one sub-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

/// Which sub-searches run, and over which window. `None` skips the sub-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPlan {
    pub lounges: Option<Window>,
    pub posts: Option<Window>,
}

impl SearchPlan {
    pub fn new(term: &SearchTerm, scope: SearchScope, page: i64, limit: i64) -> Self {
        let paged = Window {
            limit,
            offset: (page - 1) * limit,
        };
        let preview = |limit| Window { limit, offset: 0 };

        let lounges = match (term, scope) {
            (SearchTerm::Tag(_), _) => None,
            (_, SearchScope::All) => Some(preview(PREVIEW_LOUNGES)),
            (_, SearchScope::Lounge) => Some(paged),
            (_, SearchScope::Post) => None,
        };
        let posts = match scope {
            SearchScope::All => Some(preview(PREVIEW_POSTS)),
            SearchScope::Post => Some(paged),
            SearchScope::Lounge => None,
        };

        Self { lounges, posts }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSection<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> ResultSection<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultSet {
    pub lounges: ResultSection<Lounge>,
    pub posts: ResultSection<Post>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_rejected() {
        assert!(SearchTerm::parse("").is_err());
        assert!(SearchTerm::parse("   ").is_err());
        assert_eq!(SearchTerm::parse(" # ").unwrap_err(), "tag cannot be empty");
    }

    #[test]
    fn hash_prefix_selects_tag_search() {
        assert_eq!(
            SearchTerm::parse("  #KPop ").unwrap(),
            SearchTerm::Tag("kpop".to_string())
        );
        assert_eq!(
            SearchTerm::parse(" idol #1 ").unwrap(),
            SearchTerm::Text("idol #1".to_string())
        );
    }

    #[test]
    fn scope_parsing_is_case_insensitive() {
        assert_eq!(SearchScope::parse("ALL"), Some(SearchScope::All));
        assert_eq!(SearchScope::parse("Lounge"), Some(SearchScope::Lounge));
        assert_eq!(SearchScope::parse("post"), Some(SearchScope::Post));
        assert_eq!(SearchScope::parse("users"), None);
    }

    #[test]
    fn all_scope_uses_fixed_previews() {
        let term = SearchTerm::Text("idol".to_string());
        let plan = SearchPlan::new(&term, SearchScope::All, 7, 50);
        assert_eq!(plan.lounges, Some(Window { limit: 5, offset: 0 }));
        assert_eq!(plan.posts, Some(Window { limit: 10, offset: 0 }));
    }

    #[test]
    fn single_scope_paginates() {
        let term = SearchTerm::Text("idol".to_string());
        let plan = SearchPlan::new(&term, SearchScope::Lounge, 3, 20);
        assert_eq!(plan.lounges, Some(Window { limit: 20, offset: 40 }));
        assert_eq!(plan.posts, None);

        let plan = SearchPlan::new(&term, SearchScope::Post, 1, 20);
        assert_eq!(plan.lounges, None);
        assert_eq!(plan.posts, Some(Window { limit: 20, offset: 0 }));
    }

    #[test]
    fn tag_search_never_touches_lounges() {
        let term = SearchTerm::Tag("abc".to_string());
        for scope in [SearchScope::All, SearchScope::Lounge, SearchScope::Post] {
            assert_eq!(SearchPlan::new(&term, scope, 1, 20).lounges, None);
        }
    }
}
