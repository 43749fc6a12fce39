//! # Candidate Number Blocks
//!
//! Pure arithmetic for the first-stage drawing: how many candidates a raffle
//! gets and which contiguous block of lottery numbers each one is assigned.
//! The random sampling itself lives in the service layer; this module only
//! deals in sizes and partitions so it can be tested exhaustively.

/// The 45-number universe of the weekly 6-from-45 lottery.
pub const NUMBER_UNIVERSE: u32 = 45;

/// Allowed candidate-pool sizes: the divisors of 45 that are ≥ 3, descending.
/// Divisibility guarantees the universe partitions into equal blocks.
pub const POOL_SIZES: [u32; 5] = [45, 15, 9, 5, 3];

/// The largest allowed pool size not exceeding the raffle's target quantity.
///
/// `target_quantity` is invariantly ≥ 3 (validated at raffle creation), so
/// the final fallback of 3 is always reachable.
pub fn candidate_pool_size(target_quantity: u32) -> u32 {
    POOL_SIZES
        .iter()
        .copied()
        .find(|&n| n <= target_quantity)
        .unwrap_or(3)
}

/// Partitions 1..=45 into `num_candidates` contiguous equal blocks.
/// Block `i` gets `{i*size+1, ..., i*size+size}`.
pub fn number_blocks(num_candidates: u32) -> Vec<Vec<u8>> {
    let block_size = NUMBER_UNIVERSE / num_candidates;
    (0..num_candidates)
        .map(|i| {
            (i * block_size + 1..=(i + 1) * block_size)
                .map(|n| n as u8)
                .collect()
        })
        .collect()
}
