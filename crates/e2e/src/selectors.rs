//! Stable DocSearch selectors and texts the suite relies on.
//!
//! These are part of the widget's public surface; renaming any of them in
//! the widget breaks the suite.

/// Search button rendered in the navbar
pub const BUTTON: &str = ".DocSearch-Button";

/// The dialog itself
pub const MODAL: &str = ".DocSearch-Modal";

/// Query input inside the modal
pub const INPUT: &str = ".DocSearch-Input";

/// Full-viewport backdrop around the modal; clicking it outside the modal closes it
pub const CONTAINER: &str = ".DocSearch-Container";

/// Result list
pub const HITS: &str = ".DocSearch-Hits";

/// Clears the current query
pub const RESET: &str = ".DocSearch-Reset";

/// Element carrying the page-level active-state class
pub const PAGE_ROOT: &str = "body";

/// Class set on the page root while the modal is open
pub const ACTIVE_CLASS: &str = "DocSearch--active";

pub const NO_RECENT_TEXT: &str = "No recent searches";
pub const NO_RESULTS_TEXT: &str = "No results for";

pub const SAVE_RECENT_TITLE: &str = "Save this search";
pub const REMOVE_RECENT_TITLE: &str = "Remove this search from history";
pub const REMOVE_FAVORITE_TITLE: &str = "Remove this search from favorites";

/// Result item `item` in hit group `group`
pub fn hit_item(group: usize, item: usize) -> String {
    format!("#docsearch-hits{}-item-{}", group, item)
}

pub fn recent_item(index: usize) -> String {
    format!("#docsearch-recentSearches-item-{}", index)
}

pub fn favorite_item(index: usize) -> String {
    format!("#docsearch-favoriteSearches-item-{}", index)
}

/// Action button with `title` nested inside the item matched by `item`
pub fn item_action(item: &str, title: &str) -> String {
    format!("{} [title=\"{}\"]", item, title)
}
