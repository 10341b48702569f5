//! Counting enumerators

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use polyload_artifact::BinaryEnumerator;

/// Enumerator answering a fixed list and counting how often it is asked
pub struct CountingEnumerator {
    binaries: Vec<PathBuf>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingEnumerator {
    pub fn new<I, P>(binaries: I) -> Arc<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_delay(binaries, Duration::ZERO)
    }

    /// Enumerator that finds nothing
    pub fn empty() -> Arc<Self> {
        Self::new(Vec::<PathBuf>::new())
    }

    /// Enumerator that sleeps before answering, widening race windows
    pub fn with_delay<I, P>(binaries: I, delay: Duration) -> Arc<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Arc::new(CountingEnumerator {
            binaries: binaries.into_iter().map(Into::into).collect(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BinaryEnumerator for CountingEnumerator {
    fn enumerate_binaries(&self) -> Vec<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.binaries.clone()
    }
}
