//! # Rotation: ordered members plus a last-used cursor.
//!
//! The selection/eviction state behind [`Dispatcher`](crate::Dispatcher). It is
//! a plain data structure; the dispatcher serializes access with one lock.
//!
//! ```text
//! members: [A, B, C, D]      last = Some(1) (B was used last)
//! advance()             →    C, last = Some(2)
//! remove(C)             →    [A, B, D], last = Some(1)  (next is D)
//! remove(D)             →    [A, B],    last = Some(1)  (next wraps to A)
//! ```
//!
//! ## Invariants
//! - `last` is `None` or a valid index into `members`.
//! - Removal keeps the relative order of the remaining members.
//! - After a removal, the member that would have come next still comes next.

/// Round-robin sequence with a cursor on the last selected position.
#[derive(Debug)]
pub(crate) struct Rotation<T> {
    members: Vec<T>,
    last: Option<usize>,
}

impl<T> Default for Rotation<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            last: None,
        }
    }
}

impl<T> Rotation<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a member at the end of the rotation.
    pub(crate) fn push(&mut self, member: T) {
        self.members.push(member);
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.members.iter()
    }

    /// Moves the cursor one step (wrapping) and returns the member under it.
    ///
    /// Returns `None` and resets the cursor when the rotation is empty.
    pub(crate) fn advance(&mut self) -> Option<&T> {
        if self.members.is_empty() {
            self.last = None;
            return None;
        }
        let next = match self.last {
            Some(i) => (i + 1) % self.members.len(),
            None => 0,
        };
        self.last = Some(next);
        self.members.get(next)
    }

    /// Removes the first member matching `pred` and re-bases the cursor.
    pub(crate) fn remove_first<F>(&mut self, pred: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let idx = self.members.iter().position(pred)?;
        let removed = self.members.remove(idx);
        self.rebase_after_removal(idx);
        Some(removed)
    }

    /// Removes every member matching `pred`; returns them in rotation order.
    pub(crate) fn remove_all<F>(&mut self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut removed = Vec::new();
        while let Some(m) = self.remove_first(&pred) {
            removed.push(m);
        }
        removed
    }

    /// Keeps `last` pointing just before whatever member now follows it.
    fn rebase_after_removal(&mut self, removed: usize) {
        if self.members.is_empty() {
            self.last = None;
            return;
        }
        self.last = match self.last {
            Some(last) if removed < last => Some(last - 1),
            // The last-used member itself left: step back so the member that
            // slid into its slot is selected next.
            Some(last) if removed == last => last.checked_sub(1),
            other => other,
        };
    }
}
