use foundation::time::Millis;

/// A command together with when and in which order it was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<C> {
    pub seq: u64,
    pub at: Millis,
    pub command: C,
}

/// The single channel every state mutation goes through.
///
/// Producers (pointer handlers, debouncers, fetch completions) only dispatch;
/// one consumer drains in dispatch order and applies.
#[derive(Debug)]
pub struct CommandBus<C> {
    next_seq: u64,
    pending: Vec<Envelope<C>>,
}

impl<C> Default for CommandBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandBus<C> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, at: Millis, command: C) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(Envelope { seq, at, command });
        seq
    }

    pub fn extend(&mut self, at: Millis, commands: impl IntoIterator<Item = C>) {
        for c in commands {
            self.dispatch(at, c);
        }
    }

    pub fn pending(&self) -> &[Envelope<C>] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Envelope<C>> {
        std::mem::take(&mut self.pending)
    }
}
