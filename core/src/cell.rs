mod bag_of_cells;
mod builder;
mod dict_builder;
mod error;
mod parser;

use std::fmt;
use std::sync::Arc;

pub use bag_of_cells::*;
pub use builder::*;
pub use dict_builder::*;
pub use error::*;
pub use parser::*;
use sha2::{Digest, Sha256};

use crate::types::TonHash;

pub(crate) const MAX_CELL_BITS: usize = 1023;
pub(crate) const MAX_CELL_REFERENCES: usize = 4;

pub type ArcCell = Arc<Cell>;

/// An ordinary TON cell: up to 1023 data bits and up to 4 references.
///
/// Exotic cells (pruned branches, library cells, merkle proofs) are not
/// representable; the wallet engine never produces or consumes them.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<ArcCell>,
    hash: TonHash,
    depth: u16,
}

impl Cell {
    pub fn new(
        data: Vec<u8>,
        bit_len: usize,
        references: Vec<ArcCell>,
    ) -> Result<Cell, TonCellError> {
        if bit_len > MAX_CELL_BITS {
            return Err(TonCellError::InvalidCellData(format!(
                "Cell must contain at most {} bits, got {}",
                MAX_CELL_BITS, bit_len
            )));
        }
        if references.len() > MAX_CELL_REFERENCES {
            return Err(TonCellError::InvalidCellData(format!(
                "Cell must contain at most {} references, got {}",
                MAX_CELL_REFERENCES,
                references.len()
            )));
        }
        if data.len() < (bit_len + 7) / 8 {
            return Err(TonCellError::InvalidCellData(format!(
                "Cell data too short: {} bytes for {} bits",
                data.len(),
                bit_len
            )));
        }
        let depth = references
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or_default();
        let hash = representation_hash(&data, bit_len, &references);
        Ok(Cell {
            data,
            bit_len,
            references,
            hash,
            depth,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn references(&self) -> &[ArcCell] {
        &self.references
    }

    /// The sha256 representation hash, the identity of the cell on-ledger.
    pub fn cell_hash(&self) -> TonHash {
        self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn parser(&self) -> CellParser {
        CellParser::new(self)
    }

    pub fn to_arc(self) -> ArcCell {
        Arc::new(self)
    }

    /// Data bytes with the completion tag applied to the last partial byte.
    pub(crate) fn data_with_completion_tag(&self) -> Vec<u8> {
        let byte_len = (self.bit_len + 7) / 8;
        let mut data = self.data[0..byte_len].to_vec();
        let partial_bits = self.bit_len % 8;
        if partial_bits != 0 {
            let pad = 8 - partial_bits;
            let last = &mut data[byte_len - 1];
            *last &= (0xffu16 << pad) as u8;
            *last |= 1 << (pad - 1);
        }
        data
    }

    pub(crate) fn descriptor_bytes(&self) -> [u8; 2] {
        let d1 = self.references.len() as u8;
        let full_bytes = self.bit_len / 8;
        let d2 = (full_bytes + (self.bit_len + 7) / 8) as u8;
        [d1, d2]
    }
}

fn representation_hash(data: &[u8], bit_len: usize, references: &[ArcCell]) -> TonHash {
    let mut hasher = Sha256::new();
    let full_bytes = bit_len / 8;
    let byte_len = (bit_len + 7) / 8;
    hasher.update([references.len() as u8, (full_bytes + byte_len) as u8]);
    let mut tagged = data[0..byte_len].to_vec();
    let partial_bits = bit_len % 8;
    if partial_bits != 0 {
        let pad = 8 - partial_bits;
        tagged[byte_len - 1] &= (0xffu16 << pad) as u8;
        tagged[byte_len - 1] |= 1 << (pad - 1);
    }
    hasher.update(&tagged);
    for r in references {
        hasher.update(r.depth().to_be_bytes());
    }
    for r in references {
        hasher.update(r.cell_hash());
    }
    hasher.finalize().into()
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell{{ bits: {}, refs: {}, data: {} }}",
            self.bit_len,
            self.references.len(),
            hex::encode(&self.data[0..(self.bit_len + 7) / 8])
        )
    }
}
