//! Mixed-radix encoding of sensor multisets.
//!
//! Digit `i` of a subset index counts how many copies of sensor `i` the
//! subset uses, in `0..=max_counts[i]`. Index `0` is the empty set and
//! `slot_count() - 1` the full set.

use std::fmt;

use super::error::{EngineError, Result};

/// Sensor-count limit; the index space must stay within a signed 31-bit range.
pub const MAX_SENSORS: usize = 31;

/// Converts between subsets and their indices. Built once per computation.
#[derive(Debug, Clone)]
pub struct SubsetIndexer {
    max_counts: Vec<usize>,
    /// `radix[i]` is the place value of digit `i`.
    radix: Vec<usize>,
    slots: usize,
}

/// A subset being enumerated: per-sensor counts plus cached index and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSet {
    counts: Vec<usize>,
    index: usize,
    size: usize,
}

impl SubsetIndexer {
    /// Fails with a capacity error when the index space would overflow.
    pub fn new(max_counts: &[usize]) -> Result<Self> {
        if max_counts.len() >= MAX_SENSORS {
            return Err(EngineError::Capacity(format!(
                "{} sensors given; at most {} are supported",
                max_counts.len(),
                MAX_SENSORS - 1
            )));
        }
        let limit = i32::MAX as usize;
        let mut radix = Vec::with_capacity(max_counts.len());
        let mut pow = 1usize;
        for (i, &max) in max_counts.iter().enumerate() {
            radix.push(pow);
            pow = max
                .checked_add(1)
                .and_then(|digits| digits.checked_mul(pow))
                .filter(|&slots| slots <= limit)
                .ok_or_else(|| {
                    EngineError::Capacity(format!(
                        "sensor {} with {} copies overflows the subset index space",
                        i, max
                    ))
                })?;
        }
        Ok(Self {
            max_counts: max_counts.to_vec(),
            radix,
            slots: pow,
        })
    }

    /// Number of subsets, including the empty one.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn sensor_count(&self) -> usize {
        self.max_counts.len()
    }

    /// Sum of all copy counts: the size of the full set.
    pub fn total_copies(&self) -> usize {
        self.max_counts.iter().sum()
    }

    pub fn max_count(&self, sensor: usize) -> usize {
        self.max_counts[sensor]
    }

    /// The set holding one copy of `sensor`, if it has any copies.
    pub fn single(&self, sensor: usize) -> Option<SensorSet> {
        if self.max_counts[sensor] == 0 {
            return None;
        }
        let mut counts = vec![0; self.max_counts.len()];
        counts[sensor] = 1;
        Some(SensorSet {
            counts,
            index: self.radix[sensor],
            size: 1,
        })
    }

    /// First set of `size` elements, filling low-index sensors first.
    pub fn first_of_size(&self, size: usize) -> Option<SensorSet> {
        let mut remaining = size;
        let mut counts = vec![0; self.max_counts.len()];
        for (count, &max) in counts.iter_mut().zip(&self.max_counts) {
            *count = max.min(remaining);
            remaining -= *count;
        }
        if remaining > 0 {
            return None;
        }
        Some(self.encode(counts))
    }

    /// Advances `set` to the next set of the same size; false when exhausted.
    pub fn next_same_size(&self, set: &mut SensorSet) -> bool {
        let mut diff: isize = 0;
        loop {
            match self.step(set) {
                None => return false,
                Some(d) => diff += d,
            }
            if diff == 0 {
                return true;
            }
        }
    }

    /// Lexicographic increment; returns the change in size, or `None` past
    /// the last set.
    fn step(&self, set: &mut SensorSet) -> Option<isize> {
        let mut diff: isize = 0;
        for i in 0..set.counts.len() {
            if set.counts[i] < self.max_counts[i] {
                set.counts[i] += 1;
                set.index += self.radix[i];
                set.size += 1;
                return Some(diff + 1);
            }
            let dropped = set.counts[i];
            set.counts[i] = 0;
            set.index -= dropped * self.radix[i];
            set.size -= dropped;
            diff -= dropped as isize;
        }
        None
    }

    /// Index of `set` without one copy of `sensor`, or `None` if absent.
    pub fn minus(&self, set: &SensorSet, sensor: usize) -> Option<usize> {
        (set.counts[sensor] > 0).then(|| set.index - self.radix[sensor])
    }

    /// The set with the given index.
    pub fn decode(&self, mut index: usize) -> SensorSet {
        let mut counts = vec![0; self.max_counts.len()];
        for (i, count) in counts.iter_mut().enumerate().rev() {
            *count = index / self.radix[i];
            index %= self.radix[i];
        }
        self.encode(counts)
    }

    fn encode(&self, counts: Vec<usize>) -> SensorSet {
        let index = counts.iter().zip(&self.radix).map(|(c, r)| c * r).sum();
        let size = counts.iter().sum();
        SensorSet {
            counts,
            index,
            size,
        }
    }

    /// Every set of exactly `size` elements, in enumeration order.
    pub fn sets_of_size(&self, size: usize) -> impl Iterator<Item = SensorSet> + '_ {
        let mut next = self.first_of_size(size);
        std::iter::from_fn(move || {
            let current = next.take()?;
            let mut advanced = current.clone();
            if self.next_same_size(&mut advanced) {
                next = Some(advanced);
            }
            Some(current)
        })
    }
}

impl SensorSet {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of sensor copies in the set.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count(&self, sensor: usize) -> usize {
        self.counts[sensor]
    }

    /// Sensors with at least one copy in the set.
    pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, _)| i)
    }
}

/// Highest-index sensor first, sensor 0 rightmost: `{ 1 0}`.
impl fmt::Display for SensorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for c in self.counts.iter().rev() {
            write!(f, " {}", c)?;
        }
        write!(f, "}}")
    }
}
