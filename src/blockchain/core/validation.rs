use crate::blockchain::core::chain::{meets_difficulty, Block};

/// Structural validation of a whole chain: every adjacent pair must link by
/// hash, and every non-genesis block's stored hash must meet the difficulty.
///
/// Stored hashes are trusted as-is (a block's hash is fixed at admission and
/// never recomputed); a block with no hash at all fails. Returns a single
/// boolean with no indication of which link failed.
pub fn validate_chain(blocks: &[Block], difficulty: usize) -> bool {
    if blocks.is_empty() {
        return false;
    }

    for window in blocks.windows(2) {
        let (parent, child) = (&window[0], &window[1]);
        match parent.hash.as_deref() {
            Some(parent_hash) if parent_hash == child.previous_hash => {}
            _ => return false,
        }
    }

    blocks
        .iter()
        .skip(1)
        .all(|block| matches!(block.hash.as_deref(), Some(h) if meets_difficulty(h, difficulty)))
}
