//! Screen geometry for the height profile chart.

use foundation::screen::ScreenPoint;

use crate::heightgraph::{HeightgraphDataset, HeightSample, SteepnessBucket};

/// Linear map from a data domain onto a pixel range. The range may be
/// reversed (y grows downward on screen).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, v: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 {
            return self.range.0;
        }
        let pct = (v - self.domain.0) / span;
        self.range.0 + pct * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if span == 0.0 {
            return self.domain.0;
        }
        let pct = (px - self.range.0) / span;
        self.domain.0 + pct * (self.domain.1 - self.domain.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChartMargins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for ChartMargins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 30.0,
            left: 50.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChartDimensions {
    pub width: f64,
    pub height: f64,
    pub margins: ChartMargins,
}

impl ChartDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: ChartMargins::default(),
        }
    }

    pub fn inner_width(&self) -> f64 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margins.top - self.margins.bottom).max(0.0)
    }
}

/// One filled polygon under the profile for a run of equal steepness.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaBand {
    pub bucket: SteepnessBucket,
    pub color: &'static str,
    /// Closed outline: profile points left to right, then back along the baseline.
    pub outline: Vec<ScreenPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub dims: ChartDimensions,
    pub x: LinearScale,
    pub y: LinearScale,
    pub bands: Vec<AreaBand>,
}

impl ChartLayout {
    /// Lays out `dataset` in plot-area coordinates (margins excluded). The y
    /// domain is padded by a tenth of the elevation span.
    pub fn build(dataset: &HeightgraphDataset, dims: ChartDimensions) -> Self {
        let x = LinearScale::new((0.0, dataset.total_distance()), (0.0, dims.inner_width()));
        let (lo, hi) = dataset.elevation_range().unwrap_or((0.0, 0.0));
        let pad = ((hi - lo) * 0.1).max(1.0);
        let y = LinearScale::new((lo - pad, hi + pad), (dims.inner_height(), 0.0));
        let baseline = dims.inner_height();

        let bands = dataset
            .runs
            .iter()
            .filter_map(|run| {
                let samples = dataset.samples.get(run.start..=run.end)?;
                let mut outline: Vec<ScreenPoint> = samples
                    .iter()
                    .map(|s| ScreenPoint::new(x.map(s.distance), y.map(s.elevation)))
                    .collect();
                let last_x = outline.last()?.x;
                let first_x = outline.first()?.x;
                outline.push(ScreenPoint::new(last_x, baseline));
                outline.push(ScreenPoint::new(first_x, baseline));
                Some(AreaBand {
                    bucket: run.bucket,
                    color: run.bucket.color(),
                    outline,
                })
            })
            .collect();

        Self { dims, x, y, bands }
    }

    /// Resolves a pointer x (plot-area pixels) to the nearest sample.
    pub fn hover_at<'a>(&self, dataset: &'a HeightgraphDataset, px: f64) -> Option<&'a HeightSample> {
        dataset.nearest(self.x.invert(px))
    }

    /// Where the hover marker sits for a sample.
    pub fn marker_for(&self, sample: &HeightSample) -> ScreenPoint {
        ScreenPoint::new(self.x.map(sample.distance), self.y.map(sample.elevation))
    }
}

/// Edges the chart container can be dragged from. It is anchored bottom
/// right, so only west and north move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResizeEdge {
    West,
    North,
    NorthWest,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct ActiveResize {
    edge: ResizeEdge,
    origin: ScreenPoint,
    start_width: f64,
    start_height: f64,
}

/// Size overrides applied while the user drags an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub width: f64,
    pub height: f64,
    /// Inline size currently forced on the container, if any.
    pub override_size: Option<(f64, f64)>,
    pub min_width: f64,
    pub min_height: f64,
    active: Option<ActiveResize>,
}

impl ResizeState {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            override_size: None,
            min_width: 300.0,
            min_height: 150.0,
            active: None,
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, edge: ResizeEdge, at: ScreenPoint) {
        self.active = Some(ActiveResize {
            edge,
            origin: at,
            start_width: self.width,
            start_height: self.height,
        });
    }

    /// Applies the pointer position; returns true if the size changed and
    /// the chart must be re-laid out.
    pub fn drag(&mut self, at: ScreenPoint) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let delta = at - active.origin;
        let (grow_w, grow_h) = match active.edge {
            ResizeEdge::West => (true, false),
            ResizeEdge::North => (false, true),
            ResizeEdge::NorthWest => (true, true),
        };
        let mut width = self.width;
        let mut height = self.height;
        // Dragging west or north grows the box.
        if grow_w {
            width = (active.start_width - delta.x).max(self.min_width);
        }
        if grow_h {
            height = (active.start_height - delta.y).max(self.min_height);
        }
        let changed = width != self.width || height != self.height;
        self.width = width;
        self.height = height;
        self.override_size = Some((width, height));
        changed
    }

    /// Ends the drag and drops the inline override so layout reverts to the
    /// stylesheet.
    pub fn stop(&mut self) {
        self.active = None;
        self.override_size = None;
    }
}
