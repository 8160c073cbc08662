use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One stereo output frame, `[left, right]`.
pub type Frame = [f32; 2];

/// Single-producer / single-consumer ring buffer of stereo `f32` frames.
///
/// The APU (producer) runs on the emulation thread and the host's audio
/// callback (consumer) drains it without taking a lock. Frames are written
/// whole before `head` is published, so the consumer never sees a torn frame.
///
/// This queue is *lossy* when full: new pushes are dropped.
///
/// Each end exists exactly once; handles can be moved to another thread but
/// not duplicated:
///
/// ```compile_fail
/// let (_tx, rx) = pocket_emu_core::audio_queue::audio_queue(4);
/// let _second = rx.clone();
/// ```
pub struct AudioConsumer {
    inner: Arc<Inner>,
}

/// Write end of [`audio_queue`]. Not `Clone`:
///
/// ```compile_fail
/// let (tx, _rx) = pocket_emu_core::audio_queue::audio_queue(4);
/// let _second = tx.clone();
/// ```
pub struct AudioProducer {
    inner: Arc<Inner>,
}

struct Inner {
    // One extra slot so head==tail is unambiguously empty.
    buf: Box<[UnsafeCell<MaybeUninit<Frame>>]>,
    cap: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// Only the producer writes `buf[head]` and only the consumer reads
// `buf[tail]`; the atomics order the hand-off.
unsafe impl Sync for Inner {}

impl Inner {
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            (self.cap - tail) + head
        }
    }

    fn capacity_frames(&self) -> usize {
        self.cap.saturating_sub(1)
    }

    #[inline]
    fn next_index(&self, idx: usize) -> usize {
        let next = idx + 1;
        if next == self.cap { 0 } else { next }
    }
}

pub fn audio_queue(capacity_frames: usize) -> (AudioProducer, AudioConsumer) {
    let cap = capacity_frames.saturating_add(1).max(2);
    let buf: Box<[UnsafeCell<MaybeUninit<Frame>>]> = (0..cap)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();

    let inner = Arc::new(Inner {
        buf,
        cap,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        AudioProducer {
            inner: Arc::clone(&inner),
        },
        AudioConsumer { inner },
    )
}

impl AudioProducer {
    /// Returns `false` (and drops the frame) when the queue is full.
    #[inline]
    pub fn push_frame(&self, frame: Frame) -> bool {
        let head = self.inner.head.load(Ordering::Relaxed);
        let next = self.inner.next_index(head);
        let tail = self.inner.tail.load(Ordering::Acquire);
        if next == tail {
            return false;
        }

        unsafe {
            (*self.inner.buf[head].get()).write(frame);
        }
        self.inner.head.store(next, Ordering::Release);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.inner.capacity_frames()
    }
}

impl AudioConsumer {
    #[inline]
    pub fn pop_frame(&self) -> Option<Frame> {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let head = self.inner.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        let frame = unsafe { (*self.inner.buf[tail].get()).assume_init_read() };
        let next = self.inner.next_index(tail);
        self.inner.tail.store(next, Ordering::Release);
        Some(frame)
    }

    /// Pop up to `out.len()` frames; returns how many were written.
    pub fn pop_into(&self, out: &mut [Frame]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.pop_frame() {
                Some(frame) => {
                    out[n] = frame;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.inner.capacity_frames()
    }
}
