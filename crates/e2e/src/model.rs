//! Model of the DocSearch widget state the scenarios drive.
//!
//! The widget is only ever observed through the page, so this is what the
//! scenarios *expect* it to be. `ScenarioBuilder` keeps one of these in
//! step with the actions it emits and derives its assertions from it.

use serde::{Deserialize, Serialize};

/// Visibility of the search modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalState {
    #[default]
    Closed,
    Open,
}

/// Keyboard shortcuts the widget listens for on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortcut {
    CtrlK,
    CtrlShiftK,
    MetaK,
    MetaShiftK,
    Slash,
}

impl Shortcut {
    pub const ALL: [Shortcut; 5] = [
        Shortcut::CtrlK,
        Shortcut::CtrlShiftK,
        Shortcut::MetaK,
        Shortcut::MetaShiftK,
        Shortcut::Slash,
    ];

    /// Key combination in Playwright's `keyboard.press` syntax
    pub fn key(self) -> &'static str {
        match self {
            Shortcut::CtrlK => "Control+k",
            Shortcut::CtrlShiftK => "Control+Shift+k",
            Shortcut::MetaK => "Meta+k",
            Shortcut::MetaShiftK => "Meta+Shift+k",
            Shortcut::Slash => "/",
        }
    }

    /// Whether pressing this while the modal is open closes it.
    ///
    /// `/` lands in the focused input instead.
    pub fn toggles(self) -> bool {
        !matches!(self, Shortcut::Slash)
    }
}

/// Something the user does that may move the modal between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEvent {
    TriggerClick,
    Shortcut(Shortcut),
    Escape,
    OutsideClick,
}

impl ModalState {
    pub fn apply(self, event: ModalEvent) -> ModalState {
        match (self, event) {
            (ModalState::Closed, ModalEvent::TriggerClick) => ModalState::Open,
            (ModalState::Closed, ModalEvent::Shortcut(_)) => ModalState::Open,
            (ModalState::Closed, ModalEvent::Escape | ModalEvent::OutsideClick) => {
                ModalState::Closed
            }
            (ModalState::Open, ModalEvent::Shortcut(s)) if s.toggles() => ModalState::Closed,
            (ModalState::Open, ModalEvent::Shortcut(_)) => ModalState::Open,
            // the button sits under the backdrop
            (ModalState::Open, ModalEvent::TriggerClick) => ModalState::Open,
            (ModalState::Open, ModalEvent::Escape | ModalEvent::OutsideClick) => {
                ModalState::Closed
            }
        }
    }

    pub fn is_open(self) -> bool {
        self == ModalState::Open
    }
}

/// Ways to open the modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenTrigger {
    Click,
    CtrlK,
    CtrlShiftK,
    MetaK,
    MetaShiftK,
    Slash,
}

impl OpenTrigger {
    pub const ALL: [OpenTrigger; 6] = [
        OpenTrigger::Click,
        OpenTrigger::CtrlK,
        OpenTrigger::CtrlShiftK,
        OpenTrigger::MetaK,
        OpenTrigger::MetaShiftK,
        OpenTrigger::Slash,
    ];

    pub fn event(self) -> ModalEvent {
        match self {
            OpenTrigger::Click => ModalEvent::TriggerClick,
            OpenTrigger::CtrlK => ModalEvent::Shortcut(Shortcut::CtrlK),
            OpenTrigger::CtrlShiftK => ModalEvent::Shortcut(Shortcut::CtrlShiftK),
            OpenTrigger::MetaK => ModalEvent::Shortcut(Shortcut::MetaK),
            OpenTrigger::MetaShiftK => ModalEvent::Shortcut(Shortcut::MetaShiftK),
            OpenTrigger::Slash => ModalEvent::Shortcut(Shortcut::Slash),
        }
    }

    pub fn shortcut(self) -> Option<Shortcut> {
        match self.event() {
            ModalEvent::Shortcut(shortcut) => Some(shortcut),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OpenTrigger::Click => "click",
            OpenTrigger::CtrlK => "Ctrl+K",
            OpenTrigger::CtrlShiftK => "Ctrl+Shift+K",
            OpenTrigger::MetaK => "Cmd+K",
            OpenTrigger::MetaShiftK => "Cmd+Shift+K",
            OpenTrigger::Slash => "/",
        }
    }
}

/// Ways to close the modal. `/` is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseTrigger {
    Escape,
    OutsideClick,
    CtrlK,
    CtrlShiftK,
    MetaK,
    MetaShiftK,
}

impl CloseTrigger {
    pub fn event(self) -> ModalEvent {
        match self {
            CloseTrigger::Escape => ModalEvent::Escape,
            CloseTrigger::OutsideClick => ModalEvent::OutsideClick,
            CloseTrigger::CtrlK => ModalEvent::Shortcut(Shortcut::CtrlK),
            CloseTrigger::CtrlShiftK => ModalEvent::Shortcut(Shortcut::CtrlShiftK),
            CloseTrigger::MetaK => ModalEvent::Shortcut(Shortcut::MetaK),
            CloseTrigger::MetaShiftK => ModalEvent::Shortcut(Shortcut::MetaShiftK),
        }
    }

    pub fn shortcut(self) -> Option<Shortcut> {
        match self.event() {
            ModalEvent::Shortcut(shortcut) => Some(shortcut),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CloseTrigger::Escape => "Esc",
            CloseTrigger::OutsideClick => "outside click",
            CloseTrigger::CtrlK => "Ctrl+K",
            CloseTrigger::CtrlShiftK => "Ctrl+Shift+K",
            CloseTrigger::MetaK => "Cmd+K",
            CloseTrigger::MetaShiftK => "Cmd+Shift+K",
        }
    }
}

/// Keys that move through or pick from the result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavKey {
    ArrowDown,
    ArrowUp,
    Enter,
}

impl NavKey {
    pub fn key(self) -> &'static str {
        match self {
            NavKey::ArrowDown => "ArrowDown",
            NavKey::ArrowUp => "ArrowUp",
            NavKey::Enter => "Enter",
        }
    }
}

/// A hit as the suite can address it.
///
/// Keyboard selection only knows the flat position in the list while pointer
/// clicks know the group too. Positions in group 0 are the first entries of
/// the flat list, so they normalise to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitRef {
    Active(usize),
    Position { group: usize, item: usize },
}

impl HitRef {
    pub fn at(group: usize, item: usize) -> Self {
        if group == 0 {
            HitRef::Active(item)
        } else {
            HitRef::Position { group, item }
        }
    }
}

/// A hit picked after typing `query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub query: String,
    pub hit: HitRef,
}

pub const MAX_RECENT_SEARCHES: usize = 7;
pub const MAX_RECENT_SEARCHES_WITH_FAVORITES: usize = 4;
pub const MAX_FAVORITE_SEARCHES: usize = 10;

/// Recent and favorite searches, both most-recent-first.
///
/// A selection lives in at most one of the two lists. The recent limit is
/// fixed when the modal mounts and only applies when a search is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHistory {
    recent: Vec<Selection>,
    favorites: Vec<Selection>,
    recent_limit: usize,
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self {
            recent: Vec::new(),
            favorites: Vec::new(),
            recent_limit: MAX_RECENT_SEARCHES,
        }
    }
}

impl SearchHistory {
    pub fn recent(&self) -> &[Selection] {
        &self.recent
    }

    pub fn favorites(&self) -> &[Selection] {
        &self.favorites
    }

    /// True when the modal shows "No recent searches"
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.favorites.is_empty()
    }

    /// Re-read the stored lists as the modal mounts
    pub fn mount(&mut self) {
        self.recent_limit = if self.favorites.is_empty() {
            MAX_RECENT_SEARCHES
        } else {
            MAX_RECENT_SEARCHES_WITH_FAVORITES
        };
    }

    pub fn record(&mut self, selection: Selection) {
        if self.favorites.contains(&selection) {
            return;
        }
        self.recent.retain(|s| s != &selection);
        self.recent.insert(0, selection);
        self.recent.truncate(self.recent_limit);
    }

    /// Promote recent entry `index` to the front of the favorites
    pub fn save(&mut self, index: usize) -> Option<&Selection> {
        if index >= self.recent.len() {
            return None;
        }
        let selection = self.recent.remove(index);
        self.favorites.insert(0, selection);
        self.favorites.truncate(MAX_FAVORITE_SEARCHES);
        self.favorites.first()
    }

    pub fn remove_recent(&mut self, index: usize) -> Option<Selection> {
        (index < self.recent.len()).then(|| self.recent.remove(index))
    }

    pub fn remove_favorite(&mut self, index: usize) -> Option<Selection> {
        (index < self.favorites.len()).then(|| self.favorites.remove(index))
    }
}

/// Everything the suite expects about the widget at one point of a scenario
#[derive(Debug, Clone, Default)]
pub struct WidgetModel {
    pub modal: ModalState,
    pub query: Option<String>,
    /// Flat index of the highlighted hit while a query is shown
    pub active_hit: usize,
    pub history: SearchHistory,
}

impl WidgetModel {
    pub fn apply(&mut self, event: ModalEvent) -> ModalState {
        let next = self.modal.apply(event);
        if self.modal == ModalState::Closed && next == ModalState::Open {
            self.history.mount();
        }
        if next == ModalState::Closed {
            self.query = None;
            self.active_hit = 0;
        }
        self.modal = next;
        next
    }

    /// Results for `query` have rendered; the first hit is highlighted
    pub fn set_query(&mut self, query: &str) {
        self.query = Some(query.to_string());
        self.active_hit = 0;
    }

    pub fn clear_query(&mut self) {
        self.query = None;
        self.active_hit = 0;
    }

    /// Apply a navigation key; returns the selection when it is `Enter`
    pub fn navigate(&mut self, key: NavKey) -> Option<Selection> {
        match key {
            NavKey::ArrowDown => {
                self.active_hit += 1;
                None
            }
            NavKey::ArrowUp => {
                self.active_hit = self.active_hit.saturating_sub(1);
                None
            }
            NavKey::Enter => {
                let query = self.query.clone()?;
                let selection = Selection {
                    query,
                    hit: HitRef::Active(self.active_hit),
                };
                self.select(selection.clone());
                Some(selection)
            }
        }
    }

    /// A hit was picked: it is remembered and the page navigates away
    pub fn select(&mut self, selection: Selection) {
        self.history.record(selection);
        self.modal = ModalState::Closed;
        self.query = None;
        self.active_hit = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sel(query: &str, item: usize) -> Selection {
        Selection {
            query: query.to_string(),
            hit: HitRef::Active(item),
        }
    }

    #[test_case(OpenTrigger::Click ; "click")]
    #[test_case(OpenTrigger::CtrlK ; "ctrl k")]
    #[test_case(OpenTrigger::CtrlShiftK ; "ctrl shift k")]
    #[test_case(OpenTrigger::MetaK ; "meta k")]
    #[test_case(OpenTrigger::MetaShiftK ; "meta shift k")]
    #[test_case(OpenTrigger::Slash ; "slash")]
    fn test_open_triggers_open_closed_modal(trigger: OpenTrigger) {
        assert_eq!(ModalState::Closed.apply(trigger.event()), ModalState::Open);
    }

    #[test_case(CloseTrigger::Escape ; "escape")]
    #[test_case(CloseTrigger::OutsideClick ; "outside click")]
    #[test_case(CloseTrigger::CtrlK ; "ctrl k")]
    #[test_case(CloseTrigger::MetaK ; "meta k")]
    #[test_case(CloseTrigger::CtrlShiftK ; "ctrl shift k")]
    fn test_close_triggers_close_open_modal(trigger: CloseTrigger) {
        assert_eq!(ModalState::Open.apply(trigger.event()), ModalState::Closed);
    }

    #[test]
    fn test_shortcuts_toggle_except_slash() {
        for shortcut in Shortcut::ALL {
            let event = ModalEvent::Shortcut(shortcut);
            let reopened = ModalState::Closed.apply(event).apply(event);
            if shortcut.toggles() {
                assert_eq!(reopened, ModalState::Closed, "{:?}", shortcut);
            } else {
                assert_eq!(reopened, ModalState::Open, "{:?}", shortcut);
            }
        }
    }

    #[test]
    fn test_dismissal_of_closed_modal_is_noop() {
        assert_eq!(ModalState::Closed.apply(ModalEvent::Escape), ModalState::Closed);
        assert_eq!(ModalState::Closed.apply(ModalEvent::OutsideClick), ModalState::Closed);
        assert_eq!(ModalState::Open.apply(ModalEvent::TriggerClick), ModalState::Open);
    }

    #[test]
    fn test_closing_forgets_query() {
        let mut model = WidgetModel::default();
        model.apply(ModalEvent::TriggerClick);
        model.set_query("g");
        model.navigate(NavKey::ArrowDown);
        model.apply(ModalEvent::Escape);
        assert_eq!(model.query, None);
        assert_eq!(model.active_hit, 0);
    }

    #[test]
    fn test_keyboard_selection_picks_second_hit() {
        let mut model = WidgetModel::default();
        model.apply(ModalEvent::TriggerClick);
        model.set_query("g");
        let mut picked = None;
        for key in [NavKey::ArrowDown, NavKey::ArrowDown, NavKey::ArrowUp, NavKey::Enter] {
            picked = model.navigate(key);
        }
        assert_eq!(picked, Some(sel("g", 1)));
        assert_eq!(model.modal, ModalState::Closed);
        assert_eq!(model.history.recent(), &[sel("g", 1)]);
    }

    #[test]
    fn test_arrow_up_clamps_at_first_hit() {
        let mut model = WidgetModel::default();
        model.set_query("g");
        model.navigate(NavKey::ArrowUp);
        assert_eq!(model.active_hit, 0);
    }

    #[test]
    fn test_enter_without_query_selects_nothing() {
        let mut model = WidgetModel::default();
        assert_eq!(model.navigate(NavKey::Enter), None);
        assert!(model.history.is_empty());
    }

    #[test]
    fn test_group_zero_positions_match_keyboard_selection() {
        assert_eq!(HitRef::at(0, 3), HitRef::Active(3));
        assert_eq!(HitRef::at(1, 0), HitRef::Position { group: 1, item: 0 });
    }

    #[test]
    fn test_recent_is_most_recent_first_and_deduplicated() {
        let mut history = SearchHistory::default();
        history.record(sel("a", 0));
        history.record(sel("b", 0));
        history.record(sel("a", 0));
        assert_eq!(history.recent(), &[sel("a", 0), sel("b", 0)]);
    }

    #[test]
    fn test_recent_limit_is_fixed_when_the_modal_mounts() {
        let mut history = SearchHistory::default();
        history.mount();
        for i in 0..10 {
            history.record(sel("q", i));
        }
        assert_eq!(history.recent().len(), MAX_RECENT_SEARCHES);

        // saving keeps every shown recent search until the next mount
        history.save(0);
        assert_eq!(history.favorites().len(), 1);
        assert_eq!(history.recent().len(), MAX_RECENT_SEARCHES - 1);
        history.record(sel("r", 0));
        assert_eq!(history.recent().len(), MAX_RECENT_SEARCHES);

        history.mount();
        history.record(sel("s", 0));
        assert_eq!(history.recent().len(), MAX_RECENT_SEARCHES_WITH_FAVORITES);
        assert_eq!(history.recent()[0], sel("s", 0));
    }

    #[test]
    fn test_opening_the_modal_mounts_history() {
        let mut model = WidgetModel::default();
        for i in 0..6 {
            model.apply(ModalEvent::TriggerClick);
            model.set_query("g");
            model.select(sel("g", i));
        }
        model.apply(ModalEvent::TriggerClick);
        model.history.save(0);
        assert_eq!(model.history.recent().len(), 5);
        model.apply(ModalEvent::Escape);

        model.apply(ModalEvent::Shortcut(Shortcut::CtrlK));
        model.set_query("g");
        model.select(sel("g", 9));
        assert_eq!(model.history.recent().len(), MAX_RECENT_SEARCHES_WITH_FAVORITES);
    }

    #[test]
    fn test_saved_search_leaves_recent() {
        let mut history = SearchHistory::default();
        history.record(sel("g", 0));
        let saved = history.save(0).cloned();
        assert_eq!(saved, Some(sel("g", 0)));
        assert!(history.recent().is_empty());
        assert_eq!(history.favorites(), &[sel("g", 0)]);

        // picking it again does not duplicate it into recent
        history.record(sel("g", 0));
        assert!(history.recent().is_empty());
    }

    #[test]
    fn test_removing_last_entry_empties_history() {
        let mut history = SearchHistory::default();
        history.record(sel("g", 0));
        assert!(!history.is_empty());
        assert_eq!(history.remove_recent(0), Some(sel("g", 0)));
        assert!(history.is_empty());

        history.record(sel("g", 0));
        history.save(0);
        assert_eq!(history.remove_favorite(0), Some(sel("g", 0)));
        assert!(history.is_empty());
    }

    #[test]
    fn test_out_of_range_history_edits() {
        let mut history = SearchHistory::default();
        assert!(history.save(0).is_none());
        assert!(history.remove_recent(0).is_none());
        assert!(history.remove_favorite(3).is_none());
    }
}
