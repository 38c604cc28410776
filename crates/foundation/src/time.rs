/// Time primitives
///
/// Timestamps are milliseconds on whatever monotonic-ish clock the host
/// provides (`performance.now()` / `Date.now()` in the browser).
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Millis(pub f64);

impl Millis {
    pub fn elapsed_since(self, earlier: Millis) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn after(self, delay_ms: f64) -> Millis {
        Millis(self.0 + delay_ms)
    }
}
