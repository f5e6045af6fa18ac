use std::sync::atomic::{AtomicU64, Ordering};

/// Stamps overlapping fetch-and-render cycles so only the most recently
/// started one renders.
#[derive(Debug, Default)]
pub struct FetchGeneration(AtomicU64);

impl FetchGeneration {
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }
}
