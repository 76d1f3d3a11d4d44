//! ============================================================================
//! Page Policy - Which pages each tier may reach
//! ============================================================================
//! - The landing page hosts the key prompt and is never redirected
//! - The blocked page is shown on denial and never checks the session
//! - Every other page needs a session whose tier lists it
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::access::AccessTier;

/// Page served when the path has no file segment
pub const DEFAULT_PAGE: &str = "index.html";

/// Landing page with the key prompt
pub const LANDING_PAGE: &str = "index.html";

/// Page shown when a tier is too low
pub const BLOCKED_PAGE: &str = "blocked.html";

/// Pages reachable with a free key
pub const FREE_PAGES: &[&str] = &["games.html"];

/// Pages reachable with a premium key
pub const PREMIUM_PAGES: &[&str] = &[
    "games.html",
    "apps.html",
    "tools.html",
    "roadmap.html",
    "themes.html",
    "credits.html",
    "settings.html",
];

/// Hint attached to categories a free key cannot open
pub const PREMIUM_HINT: &str = "Enter premium key to access";

/// Static mapping from page to the tiers allowed on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePolicy {
    pub landing_page: String,
    pub blocked_page: String,
    pub free_pages: Vec<String>,
    pub premium_pages: Vec<String>,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            landing_page: LANDING_PAGE.to_string(),
            blocked_page: BLOCKED_PAGE.to_string(),
            free_pages: FREE_PAGES.iter().map(|p| p.to_string()).collect(),
            premium_pages: PREMIUM_PAGES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// How a category tile on the landing page should render for a tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUnlock {
    /// Link target as it appears on the tile
    pub href: String,
    /// Category name (link target without `.html` and slashes)
    pub category: String,
    /// Dimmed, and clicking asks for a premium key
    pub restricted: bool,
    pub hint: Option<String>,
}

impl PagePolicy {
    /// Whether `tier` may open `page`. No tier denies everything.
    pub fn can_access(&self, tier: Option<AccessTier>, page: &str) -> bool {
        match tier {
            Some(AccessTier::Free) => self.free_pages.iter().any(|p| p == page),
            Some(AccessTier::Premium) => self.premium_pages.iter().any(|p| p == page),
            None => false,
        }
    }

    /// Lowest tier that can open `page`, if any
    pub fn required_tier(&self, page: &str) -> Option<AccessTier> {
        if self.can_access(Some(AccessTier::Free), page) {
            Some(AccessTier::Free)
        } else if self.can_access(Some(AccessTier::Premium), page) {
            Some(AccessTier::Premium)
        } else {
            None
        }
    }

    /// Pages that run the key prompt instead of the session check
    pub fn is_landing(&self, page: &str) -> bool {
        page == self.landing_page || page == self.blocked_page
    }

    pub fn is_blocked_page(&self, page: &str) -> bool {
        page == self.blocked_page
    }

    /// Render plan for each category tile
    pub fn unlock_plan(&self, tier: AccessTier, hrefs: &[String]) -> Vec<CategoryUnlock> {
        hrefs
            .iter()
            .map(|href| {
                let restricted = !self.can_access(Some(tier), page_from_path(href));
                CategoryUnlock {
                    href: href.clone(),
                    category: category_name(href),
                    restricted,
                    hint: restricted.then(|| PREMIUM_HINT.to_string()),
                }
            })
            .collect()
    }
}

/// Last path segment, defaulting to the index page
pub fn page_from_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(page) if !page.is_empty() => page,
        _ => DEFAULT_PAGE,
    }
}

fn category_name(href: &str) -> String {
    href.replacen(".html", "", 1).replacen('/', "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_pages() {
        let policy = PagePolicy::default();
        assert!(policy.can_access(Some(AccessTier::Free), "games.html"));
        assert!(!policy.can_access(Some(AccessTier::Free), "tools.html"));
        assert!(!policy.can_access(Some(AccessTier::Free), "settings.html"));
    }

    #[test]
    fn test_premium_tier_pages() {
        let policy = PagePolicy::default();
        for page in PREMIUM_PAGES {
            assert!(policy.can_access(Some(AccessTier::Premium), page), "{}", page);
        }
        assert!(!policy.can_access(Some(AccessTier::Premium), "secret.html"));
    }

    #[test]
    fn test_no_tier_denies_all() {
        let policy = PagePolicy::default();
        for page in PREMIUM_PAGES {
            assert!(!policy.can_access(None, page));
        }
    }

    #[test]
    fn test_required_tier() {
        let policy = PagePolicy::default();
        assert_eq!(policy.required_tier("games.html"), Some(AccessTier::Free));
        assert_eq!(policy.required_tier("tools.html"), Some(AccessTier::Premium));
        assert_eq!(policy.required_tier("nowhere.html"), None);
    }

    #[test]
    fn test_page_from_path() {
        assert_eq!(page_from_path("/site/tools.html"), "tools.html");
        assert_eq!(page_from_path("tools.html"), "tools.html");
        assert_eq!(page_from_path("/site/"), "index.html");
        assert_eq!(page_from_path(""), "index.html");
        assert_eq!(page_from_path("/games.html?level=2#top"), "games.html");
    }

    #[test]
    fn test_landing_pages() {
        let policy = PagePolicy::default();
        assert!(policy.is_landing("index.html"));
        assert!(policy.is_landing("blocked.html"));
        assert!(!policy.is_landing("games.html"));
    }

    #[test]
    fn test_unlock_plan_free_dims_premium_categories() {
        let policy = PagePolicy::default();
        let hrefs = vec!["games.html".to_string(), "/tools.html".to_string()];

        let plan = policy.unlock_plan(AccessTier::Free, &hrefs);
        assert_eq!(plan[0].category, "games");
        assert!(!plan[0].restricted);
        assert_eq!(plan[0].hint, None);
        assert_eq!(plan[1].category, "tools");
        assert!(plan[1].restricted);
        assert_eq!(plan[1].hint.as_deref(), Some(PREMIUM_HINT));

        let plan = policy.unlock_plan(AccessTier::Premium, &hrefs);
        assert!(plan.iter().all(|c| !c.restricted));
    }
}
