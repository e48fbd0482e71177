//! Address card editing.
//!
//! Each address slot edits a local copy. The copy is committed only when
//! all four required lines are present; cancelling drops it.

use crate::models::{AddressField, AddressSlot};

impl AddressSlot {
    /// Open the card, seeding the local copy from the committed address.
    pub fn begin_edit(&mut self) {
        self.pending = Some(self.address.clone());
        self.editing = true;
        self.validating = false;
    }

    /// Change one line of the local copy. Returns `false` when the card is
    /// not open.
    pub fn update_field(&mut self, field: AddressField, value: String) -> bool {
        match self.pending.as_mut() {
            Some(pending) if self.editing => {
                pending.set(field, value);
                true
            }
            _ => false,
        }
    }

    /// Commit the local copy if it is complete.
    ///
    /// An incomplete copy stays open with `validating` set so the missing
    /// lines can be flagged.
    pub fn finish_edit(&mut self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };

        if !pending.is_complete() {
            self.validating = true;
            return false;
        }

        if let Some(pending) = self.pending.take() {
            self.address = pending;
        }
        self.editing = false;
        self.validating = false;
        true
    }

    /// Close the card and drop the local copy.
    pub fn cancel_edit(&mut self) {
        self.pending = None;
        self.editing = false;
        self.validating = false;
    }

    /// Lines of the local copy to flag, empty unless a commit was refused.
    pub fn flagged_fields(&self) -> Vec<AddressField> {
        match (&self.pending, self.validating) {
            (Some(pending), true) => pending.missing_fields(),
            _ => Vec::new(),
        }
    }
}
