/// Kinds of remote request. Each has its own loading flag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestKind {
    Route,
    Isochrone,
    Height,
    Locate,
    ReverseGeocode,
    Search,
    Status,
}

/// A logical request slot. Responses are last-write-wins per slot: reverse
/// geocodes are per waypoint, everything else has one slot per kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSlot {
    pub kind: RequestKind,
    pub index: u32,
}

impl RequestSlot {
    pub const fn new(kind: RequestKind, index: u32) -> Self {
        Self { kind, index }
    }

    pub const fn single(kind: RequestKind) -> Self {
        Self::new(kind, 0)
    }
}

/// Handed out when a request starts; presented again when it completes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub slot: RequestSlot,
    pub generation: u64,
}
