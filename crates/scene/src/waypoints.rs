use foundation::coords::LatLng;
use formats::api::GeocodeResult;

/// Stable identity of a waypoint slot across reorders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaypointId(pub u64);

/// One stop of a directions request: what the user typed and what the
/// geocoder offered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    pub user_input: String,
    pub geocode_results: Vec<GeocodeResult>,
}

impl Waypoint {
    pub fn new(id: WaypointId) -> Self {
        Self {
            id,
            user_input: String::new(),
            geocode_results: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<&GeocodeResult> {
        self.geocode_results.iter().find(|r| r.selected)
    }

    pub fn position(&self) -> Option<LatLng> {
        self.selected()
            .map(GeocodeResult::display_position)
            .filter(|p| p.is_valid())
    }

    /// Replaces the candidates with a single selected result at `position`.
    pub fn place_at(&mut self, position: LatLng) {
        let result = GeocodeResult::from_position(position);
        self.user_input = result.title.clone();
        self.geocode_results = vec![result];
    }

    pub fn set_results(&mut self, results: Vec<GeocodeResult>) {
        if let Some(selected) = results.iter().find(|r| r.selected) {
            self.user_input = selected.title.clone();
        }
        self.geocode_results = results;
    }

    /// Marks the candidate at `address_index` as the chosen one.
    pub fn select(&mut self, address_index: usize) -> bool {
        if !self
            .geocode_results
            .iter()
            .any(|r| r.address_index == address_index)
        {
            return false;
        }
        for r in &mut self.geocode_results {
            r.selected = r.address_index == address_index;
            if r.selected {
                self.user_input = r.title.clone();
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.user_input.clear();
        self.geocode_results.clear();
    }
}

/// Ordered waypoint slots. There are always at least two (origin and
/// destination), empty or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoints {
    next_id: u64,
    items: Vec<Waypoint>,
}

pub const MIN_WAYPOINTS: usize = 2;

impl Default for Waypoints {
    fn default() -> Self {
        Self::new()
    }
}

impl Waypoints {
    pub fn new() -> Self {
        let mut out = Self {
            next_id: 0,
            items: Vec::new(),
        };
        for _ in 0..MIN_WAYPOINTS {
            let w = out.fresh();
            out.items.push(w);
        }
        out
    }

    fn fresh(&mut self) -> Waypoint {
        let id = WaypointId(self.next_id);
        self.next_id += 1;
        Waypoint::new(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|w| w.selected().is_none())
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Waypoint> {
        self.items.get_mut(index)
    }

    pub fn index_of(&self, id: WaypointId) -> Option<usize> {
        self.items.iter().position(|w| w.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> + '_ {
        self.items.iter()
    }

    pub fn last_index(&self) -> usize {
        self.items.len() - 1
    }

    /// Inserts an empty slot before the destination and returns its index.
    pub fn insert_via(&mut self) -> usize {
        let w = self.fresh();
        let index = self.last_index();
        self.items.insert(index, w);
        index
    }

    /// Appends an empty slot at the end and returns its index.
    pub fn push(&mut self) -> usize {
        let w = self.fresh();
        self.items.push(w);
        self.last_index()
    }

    /// Removes a slot; below the minimum count it is cleared instead.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        if self.items.len() > MIN_WAYPOINTS {
            self.items.remove(index);
        } else {
            self.items[index].clear();
        }
        true
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let w = self.items.remove(from);
        self.items.insert(to, w);
        true
    }

    pub fn reset(&mut self) {
        self.items.truncate(MIN_WAYPOINTS);
        for w in &mut self.items {
            w.clear();
        }
    }

    /// Positions of all slots that have a selected result, in order.
    pub fn positions(&self) -> Vec<LatLng> {
        self.items.iter().filter_map(Waypoint::position).collect()
    }

    /// True once at least two slots hold a position.
    pub fn is_routable(&self) -> bool {
        self.items.iter().filter(|w| w.position().is_some()).count() >= 2
    }
}
