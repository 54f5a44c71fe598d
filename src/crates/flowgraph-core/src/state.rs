//! State container and per-field merge policies
//!
//! A graph runs over one state value of a user-defined type implementing
//! [`GraphState`]. Nodes never mutate that value directly. They read it through
//! a shared reference and return a delta of type [`GraphState::Update`]; the
//! executor is the only place that calls [`GraphState::merge`].
//!
//! # Merge policies
//!
//! Every field has a policy fixed by its type, not looked up at run time:
//!
//! | Field kind | Update type | Policy |
//! |------------|-------------|--------|
//! | plain (replace-on-write) | [`Patch<T>`] | [`Patch::apply_to`]: keep, overwrite, or delete |
//! | reducible | the reducer's input, e.g. `Vec<T>` | [`Reducer::reduce`], e.g. [`Append`] |
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::state::{Append, GraphState, Patch, Reducer};
//!
//! #[derive(Clone, Default)]
//! struct Notes {
//!     title: Option<String>,
//!     lines: Vec<String>,
//! }
//!
//! #[derive(Default)]
//! struct NotesUpdate {
//!     title: Patch<String>,
//!     lines: Vec<String>,
//! }
//!
//! impl GraphState for Notes {
//!     type Update = NotesUpdate;
//!
//!     fn merge(&mut self, update: NotesUpdate) {
//!         update.title.apply_to(&mut self.title);
//!         Append::reduce(&mut self.lines, update.lines);
//!     }
//! }
//!
//! let mut notes = Notes::default();
//! notes.merge(NotesUpdate { title: Patch::Set("draft".into()), lines: vec!["a".into()] });
//! notes.merge(NotesUpdate { title: Patch::Delete, lines: vec!["b".into()] });
//!
//! assert_eq!(notes.title, None);
//! assert_eq!(notes.lines, vec!["a", "b"]);
//! ```

/// A state type a graph can run over
///
/// `Clone` is required so the executor can hand out snapshots (streaming, and
/// the partial state returned on failure). Implementations must make `merge`
/// infallible: unknown or absent fields are simply left alone.
pub trait GraphState: Clone + Send + Sync + 'static {
    /// Partial update returned by a node
    type Update: Send + 'static;

    /// Fold one node's update into the current state, field by field
    fn merge(&mut self, update: Self::Update);

    /// Check the caller-supplied initial state before any node runs
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Combining function for a reducible field
pub trait Reducer<T> {
    /// Fold `update` into `current`
    fn reduce(current: &mut T, update: T);
}

/// Last write wins
#[derive(Debug, Clone, Copy, Default)]
pub struct Overwrite;

impl<T> Reducer<T> for Overwrite {
    fn reduce(current: &mut T, update: T) {
        *current = update;
    }
}

/// Sequence concatenation, preserving order, no deduplication
///
/// Appending `a` then `b` is the same as appending `a ++ b` once, and appending
/// an empty sequence is a no-op, so an empty vector means "no change".
#[derive(Debug, Clone, Copy, Default)]
pub struct Append;

impl<T> Reducer<Vec<T>> for Append {
    fn reduce(current: &mut Vec<T>, update: Vec<T>) {
        current.extend(update);
    }
}

/// Update for a plain field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Leave the field as it is
    #[default]
    Keep,
    /// Overwrite the field
    Set(T),
    /// Remove the field
    Delete,
}

impl<T> Patch<T> {
    /// Apply replace-on-write semantics to an optional field
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => *slot = Some(value),
            Patch::Delete => *slot = None,
        }
    }

    /// Combine with the current value using `R` instead of overwriting
    ///
    /// An absent field starts from `T::default()`.
    pub fn reduce_into<R: Reducer<T>>(self, slot: &mut Option<T>)
    where
        T: Default,
    {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => R::reduce(slot.get_or_insert_with(T::default), value),
            Patch::Delete => *slot = None,
        }
    }

    /// True if this patch changes nothing
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Set(value)
    }
}
