//! Distance/elevation profile of a route.

use foundation::coords::LatLng;
use foundation::geodesy::cumulative_distances_m;

/// Grade classes used to colour the profile, from steep descent to steep
/// climb. Thresholds are whole percents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SteepnessBucket {
    DescentExtreme,
    DescentSteep,
    DescentHard,
    DescentModerate,
    DescentGentle,
    Flat,
    ClimbGentle,
    ClimbModerate,
    ClimbHard,
    ClimbSteep,
    ClimbExtreme,
}

impl SteepnessBucket {
    pub const ALL: [SteepnessBucket; 11] = [
        SteepnessBucket::DescentExtreme,
        SteepnessBucket::DescentSteep,
        SteepnessBucket::DescentHard,
        SteepnessBucket::DescentModerate,
        SteepnessBucket::DescentGentle,
        SteepnessBucket::Flat,
        SteepnessBucket::ClimbGentle,
        SteepnessBucket::ClimbModerate,
        SteepnessBucket::ClimbHard,
        SteepnessBucket::ClimbSteep,
        SteepnessBucket::ClimbExtreme,
    ];

    /// Classifies a grade given in percent.
    pub fn from_grade(percent: f64) -> Self {
        let g = percent.round();
        let magnitude = g.abs();
        let level = if magnitude < 1.0 {
            0
        } else if magnitude < 4.0 {
            1
        } else if magnitude < 7.0 {
            2
        } else if magnitude < 10.0 {
            3
        } else if magnitude < 16.0 {
            4
        } else {
            5
        };
        let index = if g < 0.0 { 5 - level } else { 5 + level };
        Self::ALL[index]
    }

    /// Signed level, `-5..=5`.
    pub fn level(self) -> i8 {
        self as i8 - 5
    }

    pub fn color(self) -> &'static str {
        match self {
            SteepnessBucket::DescentExtreme => "#028306",
            SteepnessBucket::DescentSteep => "#2aaa2e",
            SteepnessBucket::DescentHard => "#53d257",
            SteepnessBucket::DescentModerate => "#7cfa80",
            SteepnessBucket::DescentGentle => "#a5ffa8",
            SteepnessBucket::Flat => "#cccccc",
            SteepnessBucket::ClimbGentle => "#ffcc99",
            SteepnessBucket::ClimbModerate => "#f29898",
            SteepnessBucket::ClimbHard => "#e07575",
            SteepnessBucket::ClimbSteep => "#cf5352",
            SteepnessBucket::ClimbExtreme => "#be312f",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeightSample {
    /// Meters along the route.
    pub distance: f64,
    /// Meters above sea level.
    pub elevation: f64,
    pub bucket: SteepnessBucket,
    pub position: LatLng,
}

/// Contiguous samples sharing a bucket. `end` is inclusive and equals the
/// next run's `start`, so adjacent bands touch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BucketRun {
    pub bucket: SteepnessBucket,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeightgraphError {
    /// The service answered for a different number of points than were sent.
    LengthMismatch { points: usize, elevations: usize },
}

impl std::fmt::Display for HeightgraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeightgraphError::LengthMismatch { points, elevations } => write!(
                f,
                "{elevations} elevation sample(s) for {points} point(s)"
            ),
        }
    }
}

impl std::error::Error for HeightgraphError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightgraphDataset {
    pub samples: Vec<HeightSample>,
    pub runs: Vec<BucketRun>,
    pub incline_total: f64,
    pub decline_total: f64,
}

impl HeightgraphDataset {
    /// Pairs each point with its elevation. Points without an elevation are
    /// dropped; distances are measured along the full geometry.
    pub fn build(
        geometry: &[LatLng],
        elevations: &[Option<f64>],
    ) -> Result<Self, HeightgraphError> {
        if geometry.len() != elevations.len() {
            return Err(HeightgraphError::LengthMismatch {
                points: geometry.len(),
                elevations: elevations.len(),
            });
        }

        let distances = cumulative_distances_m(geometry);
        let known: Vec<(f64, f64, LatLng)> = geometry
            .iter()
            .zip(&distances)
            .zip(elevations)
            .filter_map(|((p, d), e)| e.filter(|e| e.is_finite()).map(|e| (*d, e, *p)))
            .collect();

        let mut samples = Vec::with_capacity(known.len());
        for (i, &(distance, elevation, position)) in known.iter().enumerate() {
            // A sample takes the grade of the segment that ends at it; the
            // first one borrows the grade of the segment that starts at it.
            let segment = if i > 0 {
                Some((known[i - 1], known[i]))
            } else {
                known.get(1).map(|next| (known[0], *next))
            };
            let bucket = segment
                .map(|(a, b)| SteepnessBucket::from_grade(grade_percent(a.0, a.1, b.0, b.1)))
                .unwrap_or(SteepnessBucket::Flat);
            samples.push(HeightSample {
                distance,
                elevation,
                bucket,
                position,
            });
        }

        let mut incline_total = 0.0;
        let mut decline_total = 0.0;
        for pair in samples.windows(2) {
            let dy = pair[1].elevation - pair[0].elevation;
            if dy < 0.0 {
                decline_total -= dy;
            } else {
                incline_total += dy;
            }
        }

        let runs = bucket_runs(&samples);
        Ok(Self {
            samples,
            runs,
            incline_total,
            decline_total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn total_distance(&self) -> f64 {
        self.samples.last().map(|s| s.distance).unwrap_or(0.0)
    }

    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?.elevation;
        Some(self.samples.iter().fold((first, first), |(lo, hi), s| {
            (lo.min(s.elevation), hi.max(s.elevation))
        }))
    }

    /// The sample closest to `distance`. Bisects to the left insertion point
    /// and compares the two neighbours; a tie goes to the earlier sample.
    pub fn nearest(&self, distance: f64) -> Option<&HeightSample> {
        let i = self.samples.partition_point(|s| s.distance < distance);
        let right = self.samples.get(i);
        let left = i.checked_sub(1).and_then(|j| self.samples.get(j));
        match (left, right) {
            (Some(l), Some(r)) => {
                if (distance - l.distance).abs() <= (r.distance - distance).abs() {
                    Some(l)
                } else {
                    Some(r)
                }
            }
            (l, r) => l.or(r),
        }
    }

    /// Distance of the nearest sample; this is what hover reports upward.
    pub fn hover_distance(&self, distance: f64) -> Option<f64> {
        self.nearest(distance).map(|s| s.distance)
    }

    /// Map position of the sample at exactly `distance` (as reported by
    /// hover), or of the nearest one otherwise.
    pub fn position_at(&self, distance: f64) -> Option<LatLng> {
        self.nearest(distance).map(|s| s.position)
    }
}

fn grade_percent(d0: f64, e0: f64, d1: f64, e1: f64) -> f64 {
    let run = d1 - d0;
    if run <= f64::EPSILON {
        return 0.0;
    }
    (e1 - e0) / run * 100.0
}

fn bucket_runs(samples: &[HeightSample]) -> Vec<BucketRun> {
    let mut runs: Vec<BucketRun> = Vec::new();
    for (i, s) in samples.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.bucket == s.bucket => run.end = i,
            Some(run) => {
                run.end = i;
                runs.push(BucketRun {
                    bucket: s.bucket,
                    start: i,
                    end: i,
                });
            }
            None => runs.push(BucketRun {
                bucket: s.bucket,
                start: i,
                end: i,
            }),
        }
    }
    runs
}

/// Reduces a route geometry to at most `max_points` for the elevation
/// request, always keeping both ends.
pub fn sample_shape(geometry: &[LatLng], max_points: usize) -> Vec<LatLng> {
    if geometry.len() <= max_points || max_points < 2 {
        return geometry.to_vec();
    }
    let step = (geometry.len() - 1) as f64 / (max_points - 1) as f64;
    (0..max_points)
        .map(|i| geometry[((i as f64) * step).round() as usize])
        .collect()
}

/// Remembers the last elevation payload sent, so re-opening the chart for an
/// unchanged route does not hit the network again.
#[derive(Debug, Clone, Default)]
pub struct ElevationFetchGuard {
    last_sent: Option<Vec<LatLng>>,
}

impl ElevationFetchGuard {
    /// True (and records `shape`) if it differs from the previous payload.
    pub fn should_fetch(&mut self, shape: &[LatLng]) -> bool {
        if self.last_sent.as_deref() == Some(shape) {
            return false;
        }
        self.last_sent = Some(shape.to_vec());
        true
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
