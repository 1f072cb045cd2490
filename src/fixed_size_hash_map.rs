use crate::VariableID;
use fnv::FnvHashMap;

const DEFAULT_BUCKET_SIZE: usize = 16;
const LOAD_MARGIN: usize = 2;

/// Open-addressed hash map sized once at setup, with no deletions.
///
/// Move evaluation looks up a handful of coefficients per candidate move,
/// millions of times per second. A general-purpose map pays for modulo
/// hashing and tombstone logic it never needs here; this table is built once
/// from the sensitivity map and then only read.
///
/// `at` returns the zero element when the key is absent. Keys are arena
/// indices spread over the buckets with a Fibonacci multiplier.
#[derive(Debug, Clone)]
pub struct FixedSizeHashMap {
    bucket_mask: usize,
    keys: Vec<VariableID>,
    values: Vec<f64>,
    is_occupied: Vec<bool>,
}

impl Default for FixedSizeHashMap {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedSizeHashMap {
    pub fn new() -> Self {
        Self {
            bucket_mask: DEFAULT_BUCKET_SIZE - 1,
            keys: vec![VariableID::from(0usize); DEFAULT_BUCKET_SIZE],
            values: vec![0.0; DEFAULT_BUCKET_SIZE],
            is_occupied: vec![false; DEFAULT_BUCKET_SIZE],
        }
    }

    fn compute_index(&self, key: VariableID) -> usize {
        // Fibonacci mix spreads consecutive arena indices over the table.
        ((*key as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize & self.bucket_mask
    }

    /// Rebuild the table from the source map. The bucket count is the
    /// smallest power of two not below twice the source size.
    pub fn setup(&mut self, source: &FnvHashMap<VariableID, f64>) {
        let minimum_bucket_size = (source.len() * LOAD_MARGIN).max(DEFAULT_BUCKET_SIZE);
        let bucket_size = minimum_bucket_size.next_power_of_two();

        self.bucket_mask = bucket_size - 1;
        self.keys = vec![VariableID::from(0usize); bucket_size];
        self.values = vec![0.0; bucket_size];
        self.is_occupied = vec![false; bucket_size];

        for (&key, &value) in source {
            self.insert(key, value);
        }
    }

    fn insert(&mut self, key: VariableID, value: f64) {
        let mut index = self.compute_index(key);
        while self.is_occupied[index] {
            index = (index + 1) & self.bucket_mask;
        }
        self.is_occupied[index] = true;
        self.keys[index] = key;
        self.values[index] = value;
    }

    /// The stored value for `key`, or `0.0` when the slot chain terminates
    /// without a match. Never mutates.
    #[inline]
    pub fn at(&self, key: VariableID) -> f64 {
        let mut index = self.compute_index(key);
        if !self.is_occupied[index] {
            return 0.0;
        }
        while self.keys[index] != key {
            if !self.is_occupied[index] {
                return 0.0;
            }
            index = (index + 1) & self.bucket_mask;
        }
        self.values[index]
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_mask + 1
    }
}
