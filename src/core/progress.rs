/// Receives percentage updates (0..=100) for one file's pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressReporter for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent.min(100));
    }
}

pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _percent: u8) {}
}

/// Maps step `done` of `total` linearly into `start..=end`.
pub fn scaled(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 || end <= start {
        return end.max(start);
    }

    let span = f64::from(end - start);
    let fraction = done.min(total) as f64 / total as f64;
    start + (span * fraction).floor() as u8
}
