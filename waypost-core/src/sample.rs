//! Bounded Inertial Sample Buffer
//!
//! ## Overview
//!
//! The only cross-thread shared structure in the system: the sampling
//! thread appends, the consumer drains. One mutex serializes both sides
//! — no reader/writer split, no lock-free path — and a condvar wakes
//! consumers blocked on a fill level, so the calibration wait is not a
//! poll loop.
//!
//! ## Overflow policy
//!
//! Capacity is a const generic, sized for the sampling window (default
//! 600 slots — 30 s at the 50 ms tick). When full, new samples are
//! **dropped** rather than overwriting old ones: the consumer drains
//! whole batches and drop-newest keeps each batch a contiguous,
//! in-order prefix of the tick sequence. Drops are silent to the
//! producer (the tick completes normally) but counted, so an operator
//! can see a stalled consumer in the numbers.
//!
//! ## Ordering
//!
//! There is a single producer, so buffer order is tick order. `drain`
//! holds the mutex across the whole read-and-clear; a consumer never
//! observes a partially written or partially cleared buffer.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::errors::SampleWaitTimeout;

/// One inertial sample: three acceleration components (m/s²), three
/// angular-rate components (deg/s), and a monotonically increasing
/// per-producer sequence number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Acceleration, m/s², body frame x/y/z.
    pub accel: [f32; 3],
    /// Angular rate, deg/s, body frame x/y/z.
    pub gyro: [f32; 3],
    /// Producer tick counter.
    pub seq: u32,
}

struct Inner<const N: usize> {
    samples: heapless::Vec<ImuSample, N>,
    dropped: u64,
}

/// Mutex-guarded bounded sample buffer with drop-newest overflow.
///
/// `N` is the capacity. Appends beyond `N` are dropped and counted until
/// the next drain; size never exceeds `N`.
pub struct SampleBuffer<const N: usize> {
    inner: Mutex<Inner<N>>,
    filled: Condvar,
}

impl<const N: usize> SampleBuffer<N> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                samples: heapless::Vec::new(),
                dropped: 0,
            }),
            filled: Condvar::new(),
        }
    }

    /// Append one sample. Returns `false` if the buffer was full and the
    /// sample was dropped; the producer treats that as a normal tick.
    pub fn push(&self, sample: ImuSample) -> bool {
        let mut inner = self.lock();
        match inner.samples.push(sample) {
            Ok(()) => {
                drop(inner);
                self.filled.notify_all();
                true
            }
            Err(_) => {
                inner.dropped += 1;
                false
            }
        }
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity `N`.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Samples dropped since the buffer was created.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Copy out the current contents in append order and clear the
    /// buffer. Holding the mutex across the read-and-clear makes this
    /// atomic; draining an empty buffer yields an empty vec.
    pub fn drain(&self) -> Vec<ImuSample> {
        let mut inner = self.lock();
        let out = inner.samples.iter().copied().collect();
        inner.samples.clear();
        out
    }

    /// Block until at least `at_least` samples are buffered, then drain.
    ///
    /// The wait and the drain happen under one lock acquisition, so the
    /// returned batch holds exactly the samples present the moment the
    /// fill level was observed. Gives up after `timeout`.
    pub fn wait_drain(
        &self,
        at_least: usize,
        timeout: Duration,
    ) -> Result<Vec<ImuSample>, SampleWaitTimeout> {
        let inner = self.lock();
        let (mut inner, wait) = self
            .filled
            .wait_timeout_while(inner, timeout, |inner| inner.samples.len() < at_least)
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out() && inner.samples.len() < at_least {
            return Err(SampleWaitTimeout {
                needed: at_least,
                have: inner.samples.len(),
                waited_ms: timeout.as_millis() as u64,
            });
        }

        let out = inner.samples.iter().copied().collect();
        inner.samples.clear();
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<N>> {
        // A poisoned lock only means a producer panicked mid-append; the
        // buffer contents are still structurally sound.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn sample(seq: u32) -> ImuSample {
        ImuSample {
            accel: [seq as f32, 0.0, 0.0],
            gyro: [0.0, 0.0, 0.0],
            seq,
        }
    }

    #[test]
    fn empty_buffer() {
        let buffer: SampleBuffer<4> = SampleBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.capacity(), 4);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let buffer: SampleBuffer<3> = SampleBuffer::new();
        for seq in 0..5 {
            buffer.push(sample(seq));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 2);
    }

    #[test]
    fn overflow_drops_newest() {
        let buffer: SampleBuffer<3> = SampleBuffer::new();
        for seq in 0..4 {
            buffer.push(sample(seq));
        }
        let seqs: Vec<u32> = buffer.drain().iter().map(|s| s.seq).collect();
        // The fourth sample was dropped, not the first.
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn drain_preserves_append_order_and_is_idempotent() {
        let buffer: SampleBuffer<8> = SampleBuffer::new();
        for seq in 0..5 {
            buffer.push(sample(seq));
        }
        let first: Vec<u32> = buffer.drain().iter().map(|s| s.seq).collect();
        assert_eq!(first, vec![0, 1, 2, 3, 4]);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn push_resumes_after_drain() {
        let buffer: SampleBuffer<2> = SampleBuffer::new();
        assert!(buffer.push(sample(0)));
        assert!(buffer.push(sample(1)));
        assert!(!buffer.push(sample(2)));
        buffer.drain();
        assert!(buffer.push(sample(3)));
        assert_eq!(buffer.drain()[0].seq, 3);
    }

    #[test]
    fn wait_drain_wakes_on_fill() {
        let buffer: Arc<SampleBuffer<16>> = Arc::new(SampleBuffer::new());
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for seq in 0..4 {
                    thread::sleep(Duration::from_millis(5));
                    buffer.push(sample(seq));
                }
            })
        };

        let batch = buffer
            .wait_drain(4, Duration::from_secs(5))
            .expect("producer fills the buffer");
        assert_eq!(batch.len(), 4);
        assert!(buffer.is_empty());
        producer.join().unwrap();
    }

    #[test]
    fn wait_drain_times_out_with_counts() {
        let buffer: SampleBuffer<8> = SampleBuffer::new();
        buffer.push(sample(0));
        let err = buffer
            .wait_drain(3, Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err.needed, 3);
        assert_eq!(err.have, 1);
        // The timeout is not a drain: contents stay put.
        assert_eq!(buffer.len(), 1);
    }
}
