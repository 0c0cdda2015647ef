use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

use crate::traefik::DisplayRouter;

/// One complete, immutable view of the router table.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub routers: Arc<[DisplayRouter]>,
    /// When the last successful poll published this snapshot
    pub refreshed_at: Option<Instant>,
}

/// Holds the most recent successful router snapshot.
///
/// Writers swap the whole snapshot and readers clone the `Arc`, so the lock
/// is only ever held for a pointer copy and a reader sees either the old or
/// the new list, never a mix.
#[derive(Debug, Default)]
pub struct RouterStore {
    current: RwLock<Snapshot>,
}

impl RouterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the current routers.
    pub fn routers(&self) -> Arc<[DisplayRouter]> {
        self.snapshot().routers
    }

    /// Replaces the snapshot wholesale.
    pub fn replace(&self, routers: Vec<DisplayRouter>) {
        let next = Snapshot {
            routers: routers.into(),
            refreshed_at: Some(Instant::now()),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Fills in icons for routers of the current snapshot, matched by name.
    ///
    /// Routers published after the icons were looked up keep what they have,
    /// and `refreshed_at` is left alone. Returns how many routers changed.
    pub fn apply_icons(&self, icons: &HashMap<String, String>) -> usize {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let mut changed = 0;
        let routers: Vec<DisplayRouter> = current
            .routers
            .iter()
            .map(|router| {
                let mut router = router.clone();
                if let Some(icon) = icons.get(&router.name) {
                    if router.icon.as_ref() != Some(icon) {
                        router.icon = Some(icon.clone());
                        changed += 1;
                    }
                }
                router
            })
            .collect();

        if changed > 0 {
            current.routers = routers.into();
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.routers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
