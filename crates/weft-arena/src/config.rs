//! Arena configuration parameters.

use weft_core::AllocError;

/// Size of the free-list link every slot must be able to hold.
const LINK_BYTES: usize = std::mem::size_of::<u32>();

/// Largest supported slot alignment (64 KiB).
const MAX_ALIGN_LOG2: u32 = 16;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Immutable after the arena is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Requested object size in bytes.
    ///
    /// The slot size is this rounded up to a power of two, at least the
    /// size of a free-list link and at least the alignment.
    pub object_size: usize,

    /// Slots reserved per block. Must be at least 1.
    pub objects_per_block: usize,

    /// Log2 of the slot alignment within the block.
    pub align_log2: u32,
}

impl ArenaConfig {
    /// Default slots per block.
    pub const DEFAULT_OBJECTS_PER_BLOCK: usize = 64;

    /// Configuration sized and aligned for `T`.
    pub fn for_type<T>(objects_per_block: usize) -> Self {
        Self {
            object_size: std::mem::size_of::<T>(),
            objects_per_block,
            align_log2: std::mem::align_of::<T>().trailing_zeros(),
        }
    }

    /// Slot alignment in bytes.
    pub fn align(&self) -> usize {
        1usize << self.align_log2.min(MAX_ALIGN_LOG2)
    }

    /// Bytes occupied by one slot, or `None` on overflow.
    pub fn slot_size(&self) -> Option<usize> {
        let raw = self.object_size.max(LINK_BYTES).checked_next_power_of_two()?;
        Some(raw.max(self.align()))
    }

    /// Bytes reserved per block, or `None` on overflow.
    pub fn block_bytes(&self) -> Option<usize> {
        self.slot_size()?.checked_mul(self.objects_per_block)
    }

    /// Check that the parameters can form a block.
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.objects_per_block == 0 {
            return Err(AllocError::InvalidArena {
                reason: "objects_per_block must be at least 1".to_string(),
            });
        }
        if self.align_log2 > MAX_ALIGN_LOG2 {
            return Err(AllocError::InvalidArena {
                reason: format!(
                    "align_log2 {} exceeds maximum {MAX_ALIGN_LOG2}",
                    self.align_log2
                ),
            });
        }
        if self.block_bytes().is_none() {
            return Err(AllocError::InvalidArena {
                reason: format!(
                    "{} objects of {} bytes overflow a block",
                    self.objects_per_block, self.object_size
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            object_size: LINK_BYTES,
            objects_per_block: Self::DEFAULT_OBJECTS_PER_BLOCK,
            align_log2: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_size_rounds_to_power_of_two() {
        let cfg = ArenaConfig {
            object_size: 12,
            objects_per_block: 4,
            align_log2: 2,
        };
        assert_eq!(cfg.slot_size(), Some(16));
        assert_eq!(cfg.block_bytes(), Some(64));
    }

    #[test]
    fn slot_holds_at_least_a_link() {
        let cfg = ArenaConfig {
            object_size: 1,
            objects_per_block: 1,
            align_log2: 0,
        };
        assert_eq!(cfg.slot_size(), Some(4));
    }

    #[test]
    fn alignment_widens_slot() {
        let cfg = ArenaConfig {
            object_size: 8,
            objects_per_block: 2,
            align_log2: 5,
        };
        assert_eq!(cfg.slot_size(), Some(32));
    }

    #[test]
    fn for_type_uses_layout_of_t() {
        let cfg = ArenaConfig::for_type::<[u64; 3]>(10);
        assert_eq!(cfg.object_size, 24);
        assert_eq!(cfg.align(), std::mem::align_of::<u64>());
        assert_eq!(cfg.slot_size(), Some(32));
    }

    #[test]
    fn zero_objects_rejected() {
        let cfg = ArenaConfig {
            objects_per_block: 0,
            ..ArenaConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn huge_alignment_rejected() {
        let cfg = ArenaConfig {
            align_log2: 40,
            ..ArenaConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overflowing_block_rejected() {
        let cfg = ArenaConfig {
            object_size: usize::MAX / 2,
            objects_per_block: 4,
            align_log2: 0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_is_valid() {
        assert!(ArenaConfig::default().validate().is_ok());
    }
}
