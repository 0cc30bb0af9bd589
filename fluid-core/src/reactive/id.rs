//! Identifiers for the reactive arena.
//!
//! Signals, computations and ownership scopes are addressed by integer ids.
//! The dependency graph stores only ids, so a link between a signal and a
//! computation never keeps either side alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique id.
            pub(crate) fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw id value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies a signal in the dependency graph.
    SignalId,
    "signal"
);

arena_id!(
    /// Identifies an effect or memo computation.
    ComputationId,
    "computation"
);

arena_id!(
    /// Identifies an ownership scope.
    ScopeId,
    "scope"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let id1 = ComputationId::next();
        let id2 = ComputationId::next();
        let id3 = ComputationId::next();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn debug_names_the_kind() {
        let id = SignalId::next();
        assert_eq!(format!("{id:?}"), format!("signal#{}", id.raw()));
    }
}
