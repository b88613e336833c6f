//! Multi-select over the flattened transaction list.
//!
//! A [SelectionState] belongs to one list view and is only changed through the
//! methods here. Positions are always global indices into the canonical,
//! cross-page sequence of transactions, never positions within a day group.

use std::collections::HashSet;

use crate::{database_id::TransactionId, transaction::Transaction};

/// The modifier keys held when a row or day header was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// The control key.
    pub ctrl: bool,
    /// The meta/command key.
    pub meta: bool,
    /// The shift key.
    pub shift: bool,
}

/// What a click does to the selection, decided once at the input boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// A plain click. Leaves the selection alone, the click opens details instead.
    Replace,
    /// Ctrl/meta click. Toggles a single transaction and moves the anchor to it.
    ToggleOne,
    /// Shift click. Selects the range between the anchor and the clicked row.
    RangeTo,
}

impl SelectionMode {
    /// Pick the mode for a click. Shift wins over ctrl/meta.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.shift {
            SelectionMode::RangeTo
        } else if modifiers.ctrl || modifiers.meta {
            SelectionMode::ToggleOne
        } else {
            SelectionMode::Replace
        }
    }
}

/// The selected transactions and the anchor used for range selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selected: HashSet<TransactionId>,
    anchor_index: Option<usize>,
}

impl SelectionState {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is selected.
    pub fn is_selected(&self, id: TransactionId) -> bool {
        self.selected.contains(&id)
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    /// The number of selected transactions.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The global index range selections are extended from, if any.
    pub fn anchor_index(&self) -> Option<usize> {
        self.anchor_index
    }

    /// The selected IDs in no particular order.
    pub fn selected_ids(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.selected.iter().copied()
    }

    /// The selected transactions that are in `items`, in the order of `items`.
    pub fn selected_in<'a>(&self, items: &'a [Transaction]) -> Vec<&'a Transaction> {
        items
            .iter()
            .filter(|transaction| self.is_selected(transaction.id))
            .collect()
    }

    /// Deselect everything and forget the anchor.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor_index = None;
    }

    /// Apply a click on the transaction `id` found at `global_index` in `items`.
    ///
    /// With [SelectionMode::RangeTo] the selection becomes exactly the
    /// transactions between the anchor and `global_index` inclusive. Without an
    /// anchor it behaves like [SelectionMode::ToggleOne].
    pub fn toggle_selection(
        &mut self,
        items: &[Transaction],
        id: TransactionId,
        global_index: usize,
        mode: SelectionMode,
    ) {
        debug_assert!(
            global_index < items.len(),
            "global index {global_index} is outside of the {} loaded transactions",
            items.len()
        );

        match (mode, self.anchor_index) {
            (SelectionMode::Replace, _) => {}
            (SelectionMode::ToggleOne, _) | (SelectionMode::RangeTo, None) => {
                if !self.selected.remove(&id) {
                    self.selected.insert(id);
                }
                self.anchor_index = Some(global_index);
            }
            (SelectionMode::RangeTo, Some(anchor)) => {
                let Some(last) = items.len().checked_sub(1) else {
                    return;
                };
                let start = anchor.min(global_index).min(last);
                let end = anchor.max(global_index).min(last);

                self.selected = items[start..=end]
                    .iter()
                    .map(|transaction| transaction.id)
                    .collect();
            }
        }
    }

    /// Toggle a batch of transactions, e.g. a whole day.
    ///
    /// If every ID in `ids` is already selected they are all deselected,
    /// otherwise the missing ones are added. The anchor is left alone.
    pub fn toggle_items(&mut self, ids: &[TransactionId]) {
        let all_selected = ids.iter().all(|id| self.selected.contains(id));

        if all_selected {
            for id in ids {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(ids.iter().copied());
        }
    }

    /// Apply a click on a day header whose transactions are `day`.
    ///
    /// Shift selects the range from the anchor to the day's last transaction,
    /// ctrl/meta toggles the whole day and a plain click does nothing.
    pub fn toggle_day(&mut self, items: &[Transaction], day: &[&Transaction], mode: SelectionMode) {
        let (Some(first), Some(last)) = (day.first(), day.last()) else {
            return;
        };

        match mode {
            SelectionMode::Replace => {}
            SelectionMode::ToggleOne => {
                let ids: Vec<TransactionId> = day.iter().map(|transaction| transaction.id).collect();
                self.toggle_items(&ids);
            }
            SelectionMode::RangeTo => {
                let Some(first_index) = items
                    .iter()
                    .position(|transaction| transaction.id == first.id)
                else {
                    tracing::warn!(
                        "Day header click for transaction {} which is not in the loaded list",
                        first.id
                    );
                    return;
                };

                self.toggle_selection(items, last.id, first_index + day.len() - 1, mode);
            }
        }
    }

    /// Forget `ids`, e.g. after they were deleted.
    pub fn deselect(&mut self, ids: &[TransactionId]) {
        for id in ids {
            self.selected.remove(id);
        }
    }

    /// Keep the anchor on the same row after the rows at `removed_indices` left the list.
    ///
    /// The anchor moves up by the number of removed rows above it, and is
    /// forgotten if its own row was removed.
    pub fn rows_removed(&mut self, removed_indices: &[usize]) {
        let Some(anchor) = self.anchor_index else {
            return;
        };

        if removed_indices.contains(&anchor) {
            self.anchor_index = None;
        } else {
            let above = removed_indices.iter().filter(|&&index| index < anchor).count();
            self.anchor_index = Some(anchor - above);
        }
    }
}
