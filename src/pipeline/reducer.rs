//! Per-field merge policy for record writes.
//!
//! A stage or fan-out branch proposes a value for a field; the proposal wins
//! when it carries a value, otherwise the current value stays. Sequential
//! stages and parallel branches go through the same law, so a later writer
//! can never erase what an earlier one found.

/// Merge law attached to every optional record field.
pub trait Reduce {
    fn reduce(&mut self, incoming: Self);
}

impl<T> Reduce for Option<T> {
    fn reduce(&mut self, incoming: Self) {
        if incoming.is_some() {
            *self = incoming;
        }
    }
}
