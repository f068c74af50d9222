//! Update translation
//!
//! Rewrites a caller's update map into the store's update request. Plain
//! values stay as they are; every action is swapped for the mutation token
//! the store builds for it. Translation is purely syntactic and never
//! fails: an action that does not fit its field is refused by the store.

use super::action::Action;
use super::updates::{UpdateValue, Updates};
use crate::store::{MutationToken, Store, UpdateEntry, UpdateRequest};

/// Translate an update map for `store`
pub fn translate<S: Store + ?Sized>(store: &S, updates: Updates) -> UpdateRequest {
    updates
        .into_iter()
        .map(|(path, value)| {
            let entry = match value {
                UpdateValue::Set(value) => UpdateEntry::Set(value),
                UpdateValue::Action(action) => UpdateEntry::Mutation(token(store, action)),
            };
            (path, entry)
        })
        .collect()
}

fn token<S: Store + ?Sized>(store: &S, action: Action) -> MutationToken {
    match action {
        Action::Trim => store.make_trim(),
        Action::Increment(delta) => store.make_increment(delta),
        Action::Append(value) => store.make_append(value),
        Action::Prepend(value) => store.make_prepend(value),
    }
}
