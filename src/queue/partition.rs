//! Segmented concurrent FIFO partition
//!
//! A partition is a chain of fixed-size segments. Producers reserve a slot in
//! the tail segment with a single `fetch_add` and publish the item into it;
//! when the tail is full the next segment is linked in and the tail moves on.
//! Appends never take a lock.
//!
//! Every consumer group reads the partition through its own
//! [`PartitionReader`], which walks the chain from the group's offset. A reader
//! stops at the first slot that has been reserved but not yet written, so items
//! come out in slot order even while appends race.
//!
//! Each group publishes its offset after a drain. The smallest offset across
//! groups is the partition's low watermark: items below it have been drained by
//! every group, they no longer count towards `approximate_length`, and whole
//! segments below it are unlinked from the head so their memory is freed once
//! no reader still points at them.
//!
//! ```text
//!  head                                       tail
//!   │                                           │
//!   ▼                                           ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ 0 1 2 3 ...  │──▶│ 1024 ...     │──▶│ 2048 2049 _  │
//! └──────────────┘   └──────────────┘   └──────────────┘
//!        ▲                   ▲
//!   group "audit"      group "billing"
//! ```

use crate::core::sync::{lock_or_fail, read_or_fail, write_or_fail};
use crate::queue::error::QueueResult;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

struct Segment<T> {
    /// Partition offset of `slots[0]`
    start: u64,
    slots: Box<[OnceLock<Arc<T>>]>,
    /// Slots handed out so far; may overshoot `slots.len()` under contention
    reserved: AtomicUsize,
    next: OnceLock<Arc<Segment<T>>>,
}

impl<T> Segment<T> {
    fn new(start: u64, size: usize) -> Self {
        Self {
            start,
            slots: (0..size).map(|_| OnceLock::new()).collect(),
            reserved: AtomicUsize::new(0),
            next: OnceLock::new(),
        }
    }

    fn end(&self) -> u64 {
        self.start + self.slots.len() as u64
    }
}

impl<T> Drop for Segment<T> {
    // Unlink iteratively so a long chain does not recurse through Arc drops
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(segment) = next {
            match Arc::try_unwrap(segment) {
                Ok(mut owned) => next = owned.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// One ordered shard of a topic
pub struct Partition<T> {
    index: usize,
    segment_size: usize,
    /// Oldest segment still reachable by a new reader
    head: Mutex<Arc<Segment<T>>>,
    head_start: AtomicU64,
    tail: ArcSwap<Segment<T>>,
    appended: AtomicU64,
    /// Published drain offsets, one per consumer group
    group_offsets: RwLock<Vec<Arc<AtomicU64>>>,
    low_watermark: AtomicU64,
}

impl<T> Partition<T> {
    pub fn new(index: usize, segment_size: usize) -> Self {
        let segment_size = segment_size.max(1);
        let first = Arc::new(Segment::new(0, segment_size));
        Self {
            index,
            segment_size,
            head: Mutex::new(Arc::clone(&first)),
            head_start: AtomicU64::new(0),
            tail: ArcSwap::new(first),
            appended: AtomicU64::new(0),
            group_offsets: RwLock::new(Vec::new()),
            low_watermark: AtomicU64::new(0),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Append an item and return its offset within the partition
    ///
    /// Safe to call from any number of threads at once.
    pub fn append(&self, item: T) -> u64 {
        let item = Arc::new(item);
        loop {
            let tail = self.tail.load_full();
            let slot = tail.reserved.fetch_add(1, Ordering::AcqRel);
            if slot < tail.slots.len() {
                // The slot index is unique to this call, so the cell is empty
                let _ = tail.slots[slot].set(item);
                self.appended.fetch_add(1, Ordering::Release);
                return tail.start + slot as u64;
            }

            let next = tail
                .next
                .get_or_init(|| Arc::new(Segment::new(tail.end(), self.segment_size)));
            // Losing this race is fine: somebody else already moved the tail
            let _ = self.tail.compare_and_swap(&tail, Arc::clone(next));
        }
    }

    /// Items appended over the partition's lifetime
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Acquire)
    }

    /// Offset below which every consumer group has drained
    pub fn low_watermark(&self) -> u64 {
        self.low_watermark.load(Ordering::Acquire)
    }

    /// Best-effort count of items not yet drained by every group
    ///
    /// Not synchronised with concurrent appends or drains.
    pub fn approximate_length(&self) -> u64 {
        self.appended().saturating_sub(self.low_watermark())
    }

    /// Number of segments still linked from the head
    pub fn retained_segments(&self) -> QueueResult<usize> {
        let head = lock_or_fail(&self.head, "partition head")?;
        let mut count = 1;
        let mut segment = Arc::clone(&*head);
        drop(head);
        while let Some(next) = segment.next.get().cloned() {
            count += 1;
            segment = next;
        }
        Ok(count)
    }

    /// Start reading this partition on behalf of a new consumer group
    ///
    /// The group starts at the low watermark: the oldest item some existing
    /// group has not drained yet, or the first retained item if this is the
    /// only group.
    pub(crate) fn register_reader(self: &Arc<Self>) -> QueueResult<PartitionReader<T>> {
        let mut offsets = write_or_fail(&self.group_offsets, "partition group offsets")?;
        let head = lock_or_fail(&self.head, "partition head")?;

        let start = self.low_watermark().max(head.start);
        let mut segment = Arc::clone(&*head);
        drop(head);
        while start >= segment.end() {
            match segment.next.get().cloned() {
                Some(next) => segment = next,
                None => break,
            }
        }

        let position = Arc::new(AtomicU64::new(start));
        offsets.push(Arc::clone(&position));
        if offsets.len() == 1 {
            self.low_watermark.store(start, Ordering::Release);
        }

        Ok(PartitionReader {
            partition: Arc::clone(self),
            segment,
            offset: start,
            position,
        })
    }

    /// Recompute the low watermark and unlink fully drained segments
    fn release_drained(&self) -> QueueResult<()> {
        let offsets = read_or_fail(&self.group_offsets, "partition group offsets")?;
        let Some(min) = offsets.iter().map(|o| o.load(Ordering::Acquire)).min() else {
            return Ok(());
        };
        self.low_watermark.fetch_max(min, Ordering::AcqRel);

        if min < self.head_start.load(Ordering::Acquire) + self.segment_size as u64 {
            return Ok(());
        }

        let mut head = lock_or_fail(&self.head, "partition head")?;
        while head.end() <= min {
            let Some(next) = head.next.get().cloned() else {
                break;
            };
            *head = next;
        }
        self.head_start.store(head.start, Ordering::Release);
        log::trace!(
            "partition {} reclaimed segments below offset {}",
            self.index,
            head.start
        );
        Ok(())
    }
}

/// A consumer group's read position in one partition
///
/// Owned by exactly one pull consumer; `drain` takes `&mut self`, so a
/// partition is never drained twice concurrently for the same group.
pub struct PartitionReader<T> {
    partition: Arc<Partition<T>>,
    segment: Arc<Segment<T>>,
    offset: u64,
    position: Arc<AtomicU64>,
}

impl<T> PartitionReader<T> {
    pub fn partition_index(&self) -> usize {
        self.partition.index
    }

    /// Next offset this reader will deliver
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Shared handle to the offset published after each drain
    pub(crate) fn position(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.position)
    }

    /// Move up to `max_count` items into `out` in partition order
    ///
    /// Returns the number of items taken; zero when nothing is available.
    /// Never blocks.
    pub fn drain_into(&mut self, max_count: usize, out: &mut Vec<Arc<T>>) -> QueueResult<usize> {
        let mut taken = 0;
        while taken < max_count {
            if self.offset >= self.segment.end() {
                match self.segment.next.get().cloned() {
                    Some(next) => {
                        self.segment = next;
                        continue;
                    }
                    None => break,
                }
            }

            let slot = (self.offset - self.segment.start) as usize;
            match self.segment.slots[slot].get() {
                Some(item) => {
                    out.push(Arc::clone(item));
                    self.offset += 1;
                    taken += 1;
                }
                // Reserved but not yet written; keep FIFO by waiting for it
                None => break,
            }
        }

        if taken > 0 {
            self.position.store(self.offset, Ordering::Release);
            self.partition.release_drained()?;
        }
        Ok(taken)
    }

    /// Convenience wrapper over [`drain_into`](Self::drain_into)
    pub fn drain(&mut self, max_count: usize) -> QueueResult<Vec<Arc<T>>> {
        let mut out = Vec::with_capacity(max_count.min(self.partition.segment_size));
        self.drain_into(max_count, &mut out)?;
        Ok(out)
    }
}
