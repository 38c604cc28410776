use foundation::time::Millis;

#[derive(Debug, Clone)]
struct Pending<K, C> {
    key: K,
    due: Millis,
    command: C,
}

/// Keyed trailing-edge debouncer.
///
/// Each key holds at most one pending command. Submitting again for the same
/// key replaces the command and restarts its window, so only the last
/// parameters of a burst are ever released. Commands carry everything they
/// need; nothing is captured.
#[derive(Debug, Clone)]
pub struct Debouncer<K, C> {
    pending: Vec<Pending<K, C>>,
}

impl<K: PartialEq, C> Default for Debouncer<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, C> Debouncer<K, C> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn submit(&mut self, key: K, command: C, now: Millis, window_ms: f64) {
        let due = now.after(window_ms);
        match self.pending.iter_mut().find(|p| p.key == key) {
            Some(p) => {
                p.due = due;
                p.command = command;
            }
            None => self.pending.push(Pending { key, due, command }),
        }
    }

    /// Releases every command whose window has elapsed, earliest first.
    pub fn poll(&mut self, now: Millis) -> Vec<C> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due <= now {
                due.push(self.pending.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.0.total_cmp(&b.due.0));
        due.into_iter().map(|p| p.command).collect()
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| &p.key != key);
        self.pending.len() != before
    }

    /// Drops everything pending; call on teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending
            .iter()
            .map(|p| p.due)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.iter().any(|p| &p.key == key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
