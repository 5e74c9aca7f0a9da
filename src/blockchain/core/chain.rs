use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A block in the chain.
///
/// Wire field names are fixed: `{index, nonce, transactions, timestamp,
/// previousHash, hash}`. `hash` is `None` while the block is a mining
/// candidate and assigned exactly once at admission; it is never recomputed
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Proof-of-work search variable.
    pub nonce: u64,
    /// Point-in-time snapshots of the included transactions, not live
    /// mempool handles.
    pub transactions: Vec<Transaction>,
    pub timestamp: String,
    pub previous_hash: String,
    #[serde(default)]
    pub hash: Option<String>,
}

impl Block {
    /// Create an unmined candidate block, timestamped now.
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: String) -> Self {
        Block {
            index,
            nonce: 0,
            transactions,
            timestamp: chrono::Utc::now().to_rfc3339(),
            previous_hash,
            hash: None,
        }
    }

    /// SHA-256 over the canonical encoding of `{index, nonce, transactions,
    /// timestamp, previousHash}`, as a lowercase hex string.
    ///
    /// The block's own `hash` field is excluded from its input. serde_json
    /// maps keep keys in lexicographic order at every level, which is what
    /// makes the encoding canonical.
    pub fn compute_hash(&self) -> String {
        let payload = serde_json::json!({
            "index": self.index,
            "nonce": self.nonce,
            "transactions": self.transactions,
            "timestamp": self.timestamp,
            "previousHash": self.previous_hash,
        });
        hex::encode(Sha256::digest(payload.to_string().as_bytes()))
    }
}

/// Whether `hash` starts with `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.as_bytes()[..difficulty].iter().all(|&b| b == b'0')
}

/// The append-only block ledger.
///
/// Construction installs the genesis block, so the chain is never empty; a
/// caller that manages to produce an empty candidate gets [`ChainError::EmptyChain`]
/// at the replacement boundary instead of a per-call check.
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: usize,
}

impl Blockchain {
    pub fn new(difficulty: usize) -> Self {
        let mut genesis = Block::new(0, Vec::new(), GENESIS_PREVIOUS_HASH.to_string());
        let hash = genesis.compute_hash();
        genesis.hash = Some(hash);
        Blockchain {
            blocks: vec![genesis],
            difficulty,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The current chain tip.
    pub fn tip(&self) -> &Block {
        // Invariant: the constructor installs genesis and replace() rejects
        // empty candidates.
        self.blocks.last().expect("chain contains at least genesis")
    }

    fn tip_hash(&self) -> &str {
        self.tip()
            .hash
            .as_deref()
            .expect("admitted blocks carry their hash")
    }

    /// Build an unmined candidate referencing the current tip.
    pub fn next_block(&self, transactions: Vec<Transaction>) -> Block {
        Block::new(
            self.tip().index + 1,
            transactions,
            self.tip_hash().to_string(),
        )
    }

    /// Brute-force the nonce until the block's hash meets `difficulty`.
    ///
    /// Deterministic for a fixed block: the search always restarts from
    /// nonce 0. Unbounded and CPU-hot; the node layer runs it on a blocking
    /// thread so request handling never sits behind it.
    pub fn search_proof(block: &mut Block, difficulty: usize) -> String {
        block.nonce = 0;
        let mut computed = block.compute_hash();
        while !meets_difficulty(&computed, difficulty) {
            block.nonce += 1;
            computed = block.compute_hash();
        }
        computed
    }

    /// [`search_proof`](Self::search_proof) at this chain's difficulty.
    pub fn proof_of_work(&self, block: &mut Block) -> String {
        Self::search_proof(block, self.difficulty)
    }

    /// A claimed hash is only good if re-hashing the block with its current
    /// nonce reproduces it exactly and it meets the difficulty. Both checks
    /// are needed: either alone would let a stale or forged claim through
    /// after the block's fields changed.
    pub fn check_proof(&self, block: &Block, claimed: &str) -> bool {
        meets_difficulty(claimed, self.difficulty) && claimed == block.compute_hash()
    }

    /// Admit a mined block: it must reference the current tip and carry a
    /// verifiable proof. On success the claimed hash becomes the block's
    /// permanent hash and the block is appended; otherwise the chain is
    /// unchanged and `false` is returned.
    pub fn add_block(&mut self, mut block: Block, claimed: &str) -> bool {
        if block.previous_hash != self.tip_hash() || !self.check_proof(&block, claimed) {
            return false;
        }
        block.hash = Some(claimed.to_string());
        self.blocks.push(block);
        true
    }

    /// Wholesale chain replacement, used by consensus. All-or-nothing: the
    /// candidate has already been validated by the caller.
    pub fn replace(&mut self, blocks: Vec<Block>) -> Result<()> {
        if blocks.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        self.blocks = blocks;
        Ok(())
    }

    /// Structural validity of the local chain.
    pub fn is_valid(&self) -> bool {
        super::validation::validate_chain(&self.blocks, self.difficulty)
    }
}
