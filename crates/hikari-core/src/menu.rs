//! Quality-selection menu
//!
//! Menu entries are plain data records rendered from the resolved variant
//! set; selection state lives here, not in UI component instances. Entry
//! identifiers carry a per-menu-session nonce so re-renders for a
//! different episode never collide with stale entries. The playback
//! session holds at most one menu at a time; mounting a new one replaces
//! and disposes the previous instance.

use crate::types::QualityVariant;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// One selectable menu row
#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    /// Stable, addressable identifier: `q-item-{nonce}-{index}`
    pub id: String,
    pub label: String,
    pub uri: Url,
    pub selected: bool,
}

/// Quality menu bound to the player control surface
#[derive(Debug, Clone)]
pub struct QualityMenu {
    nonce: Uuid,
    entries: Vec<MenuEntry>,
}

impl QualityMenu {
    /// Render a menu from an ordered variant set, marking `selected` as the
    /// current choice. Exactly one entry is selected at construction.
    pub fn render(variants: &[QualityVariant], selected: usize) -> Self {
        let nonce = Uuid::new_v4();
        let entries = variants
            .iter()
            .enumerate()
            .map(|(index, variant)| MenuEntry {
                id: format!("q-item-{nonce}-{index}"),
                label: variant.menu_label(),
                uri: variant.uri.clone(),
                selected: index == selected,
            })
            .collect();

        debug!(%nonce, entries = variants.len(), "quality menu rendered");
        Self { nonce, entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the currently selected entry
    pub fn selected_index(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.selected)
    }

    pub fn entry(&self, index: usize) -> Option<&MenuEntry> {
        self.entries.get(index)
    }

    /// Mark exactly `index` selected and every other entry unselected
    pub fn select(&mut self, index: usize) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.selected = i == index;
        }
    }
}

impl Drop for QualityMenu {
    fn drop(&mut self) {
        debug!(nonce = %self.nonce, "quality menu disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QualityTier, QualityVariant};

    fn variants() -> Vec<QualityVariant> {
        let tiers = [QualityTier::FullHd, QualityTier::Hd, QualityTier::Sd];
        tiers
            .iter()
            .enumerate()
            .map(|(i, &tier)| QualityVariant {
                tier,
                uri: Url::parse(&format!(
                    "https://cdn.example.com/ep1/{}.m3u8",
                    tier.label()
                ))
                .unwrap(),
                is_auto: i == 0,
            })
            .collect()
    }

    #[test]
    fn render_marks_exactly_one_selected() {
        let menu = QualityMenu::render(&variants(), 0);
        assert_eq!(menu.len(), 3);
        assert_eq!(menu.entries().iter().filter(|e| e.selected).count(), 1);
        assert_eq!(menu.selected_index(), Some(0));
        assert_eq!(menu.entries()[0].label, "Auto (1080p)");
        assert_eq!(menu.entries()[1].label, "720p");
    }

    #[test]
    fn select_moves_the_single_mark() {
        let mut menu = QualityMenu::render(&variants(), 0);
        menu.select(2);
        assert_eq!(menu.selected_index(), Some(2));
        assert_eq!(menu.entries().iter().filter(|e| e.selected).count(), 1);

        menu.select(1);
        assert_eq!(menu.selected_index(), Some(1));
        assert_eq!(menu.entries().iter().filter(|e| e.selected).count(), 1);
    }

    #[test]
    fn entry_ids_are_unique_across_menu_sessions() {
        let first = QualityMenu::render(&variants(), 0);
        let second = QualityMenu::render(&variants(), 0);

        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn entry_ids_are_stable_within_a_session() {
        let menu = QualityMenu::render(&variants(), 0);
        let ids: Vec<_> = menu.entries().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.starts_with("q-item-")));
        // Index suffix keeps entries addressable
        assert!(ids[0].ends_with("-0"));
        assert!(ids[2].ends_with("-2"));
    }
}
