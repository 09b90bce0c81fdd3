//! Sorting configuration.

use crate::record::RECORD_SIZE;

/// Default I/O block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;
/// Default number of runs merged at once.
pub const DEFAULT_FAN_IN: usize = 4;
/// Default heap memory budget in bytes (16 blocks).
pub const DEFAULT_MEMORY_BUDGET: usize = 16 * DEFAULT_BLOCK_SIZE;

/// Validated sorting parameters. Heap capacity is derived from the memory budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    block_size: usize,
    fan_in: usize,
    heap_capacity: usize,
}

impl SortConfig {
    /// Validates sorting parameters.
    ///
    /// # Arguments
    /// * `block_size` - I/O block size in bytes, a positive multiple of the record size
    /// * `fan_in` - Number of runs merged together in one merge group, at least 2
    /// * `memory_budget` - Heap memory in bytes; rounded down to whole blocks and required to hold
    ///   at least one block per merged run
    pub fn new(block_size: usize, fan_in: usize, memory_budget: usize) -> Result<Self, String> {
        if block_size == 0 || block_size % RECORD_SIZE != 0 {
            return Err(format!(
                "block size {} is not a positive multiple of the record size {}",
                block_size, RECORD_SIZE
            ));
        }
        if fan_in < 2 {
            return Err(format!("fan-in {} is less than 2", fan_in));
        }

        let records_per_block = block_size / RECORD_SIZE;
        let heap_blocks = memory_budget / block_size;
        if heap_blocks < fan_in {
            return Err(format!(
                "memory budget {} bytes holds {} blocks, at least {} (one per merged run) required",
                memory_budget, heap_blocks, fan_in
            ));
        }

        return Ok(SortConfig {
            block_size,
            fan_in,
            heap_capacity: heap_blocks * records_per_block,
        });
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn records_per_block(&self) -> usize {
        self.block_size / RECORD_SIZE
    }

    pub fn fan_in(&self) -> usize {
        self.fan_in
    }

    /// Number of records held by the replacement selection heap.
    pub fn heap_capacity(&self) -> usize {
        self.heap_capacity
    }

    /// Worst-case number of records held by the merge heap: one block per merged run.
    pub fn merge_heap_capacity(&self) -> usize {
        self.fan_in * self.records_per_block()
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            fan_in: DEFAULT_FAN_IN,
            heap_capacity: DEFAULT_MEMORY_BUDGET / RECORD_SIZE,
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::SortConfig;

    #[test]
    fn test_default_config() {
        let config = SortConfig::default();

        assert_eq!(config.block_size(), 8192);
        assert_eq!(config.records_per_block(), 1024);
        assert_eq!(config.fan_in(), 4);
        assert_eq!(config.heap_capacity(), 16384);
        assert_eq!(SortConfig::new(8192, 4, 128 * 1024), Ok(config));
    }

    #[rstest]
    #[case(256, 4, 2048, 256)]
    #[case(256, 4, 2100, 256)]
    #[case(64, 2, 128, 16)]
    fn test_heap_capacity(
        #[case] block_size: usize,
        #[case] fan_in: usize,
        #[case] budget: usize,
        #[case] expected: usize,
    ) {
        let config = SortConfig::new(block_size, fan_in, budget).unwrap();
        assert_eq!(config.heap_capacity(), expected);
    }

    #[rstest]
    #[case(0, 4, 1024)]
    #[case(12, 4, 1024)]
    #[case(64, 1, 1024)]
    #[case(64, 4, 255)]
    fn test_invalid_config(#[case] block_size: usize, #[case] fan_in: usize, #[case] budget: usize) {
        assert!(SortConfig::new(block_size, fan_in, budget).is_err());
    }
}
