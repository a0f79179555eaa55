use num_bigint::BigUint;
use num_traits::Zero;

use crate::cell::{ArcCell, Cell, TonCellError};
use crate::types::{TonHash, TON_HASH_BYTES};
use crate::TonAddress;

pub struct CellParser<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    next_ref: usize,
}

impl<'a> CellParser<'a> {
    pub(crate) fn new(cell: &'a Cell) -> CellParser<'a> {
        CellParser {
            cell,
            bit_pos: 0,
            next_ref: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.references().len() - self.next_ref
    }

    pub fn load_bit(&mut self) -> Result<bool, TonCellError> {
        if self.remaining_bits() == 0 {
            return Err(TonCellError::cell_parser_error(
                "No more bits to read in cell",
            ));
        }
        let byte = self.cell.data()[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1 == 1;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_u8(&mut self, bit_len: usize) -> Result<u8, TonCellError> {
        Ok(self.load_u64(bit_len)? as u8)
    }

    pub fn load_u32(&mut self, bit_len: usize) -> Result<u32, TonCellError> {
        Ok(self.load_u64(bit_len)? as u32)
    }

    pub fn load_i32(&mut self, bit_len: usize) -> Result<i32, TonCellError> {
        Ok(self.load_u64(bit_len)? as i32)
    }

    pub fn load_u64(&mut self, bit_len: usize) -> Result<u64, TonCellError> {
        if bit_len > 64 {
            return Err(TonCellError::cell_parser_error(format!(
                "Cannot read {} bits into u64",
                bit_len
            )));
        }
        let mut val = 0u64;
        for _ in 0..bit_len {
            val = (val << 1) | self.load_bit()? as u64;
        }
        Ok(val)
    }

    pub fn load_uint(&mut self, bit_len: usize) -> Result<BigUint, TonCellError> {
        let mut val = BigUint::zero();
        for _ in 0..bit_len {
            val = (val << 1usize) + self.load_bit()? as u8;
        }
        Ok(val)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, TonCellError> {
        let mut buf = vec![0u8; len];
        self.load_slice(&mut buf)?;
        Ok(buf)
    }

    pub fn load_slice(&mut self, slice: &mut [u8]) -> Result<(), TonCellError> {
        for val in slice.iter_mut() {
            *val = self.load_u8(8)?;
        }
        Ok(())
    }

    pub fn load_tonhash(&mut self) -> Result<TonHash, TonCellError> {
        let mut hash: TonHash = [0; TON_HASH_BYTES];
        self.load_slice(&mut hash)?;
        Ok(hash)
    }

    pub fn load_coins(&mut self) -> Result<BigUint, TonCellError> {
        let byte_len = self.load_u8(4)? as usize;
        self.load_uint(byte_len * 8)
    }

    pub fn load_address(&mut self) -> Result<TonAddress, TonCellError> {
        match self.load_u8(2)? {
            0 => Ok(TonAddress::NULL),
            2 => {
                if self.load_bit()? {
                    return Err(TonCellError::cell_parser_error(
                        "Anycast addresses are not supported",
                    ));
                }
                let workchain = self.load_u8(8)? as i8 as i32;
                let hash_part = self.load_tonhash()?;
                Ok(TonAddress::new(workchain, &hash_part))
            }
            t => Err(TonCellError::InvalidAddressType(t)),
        }
    }

    pub fn next_reference(&mut self) -> Result<ArcCell, TonCellError> {
        let reference = self
            .cell
            .references()
            .get(self.next_ref)
            .ok_or(TonCellError::InvalidIndex {
                idx: self.next_ref,
                ref_count: self.cell.references().len(),
            })?
            .clone();
        self.next_ref += 1;
        Ok(reference)
    }

    /// Inverse of `CellBuilder::store_snake_data`: whole bytes from the
    /// current position, following single continuation references.
    pub fn load_snake_data(&mut self) -> Result<Vec<u8>, TonCellError> {
        let mut data = Vec::new();
        let mut chunk = self.load_bytes(self.remaining_bits() / 8)?;
        data.append(&mut chunk);
        let mut next = match self.remaining_refs() {
            0 => None,
            _ => Some(self.next_reference()?),
        };
        while let Some(cell) = next {
            if cell.bit_len() % 8 != 0 {
                return Err(TonCellError::cell_parser_error(
                    "Snake continuation is not byte-aligned",
                ));
            }
            data.extend_from_slice(&cell.data()[0..cell.bit_len() / 8]);
            next = cell.references().first().cloned();
        }
        Ok(data)
    }

    pub fn ensure_empty(&self) -> Result<(), TonCellError> {
        if self.remaining_bits() == 0 && self.remaining_refs() == 0 {
            Ok(())
        } else {
            Err(TonCellError::NonEmptyReader {
                remaining_bits: self.remaining_bits(),
                remaining_refs: self.remaining_refs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn read_past_end_fails() -> anyhow::Result<()> {
        let cell = CellBuilder::new().store_u8(3, 5)?.build()?;
        let mut parser = cell.parser();
        assert_eq!(parser.load_u8(3)?, 5);
        assert!(parser.load_bit().is_err());
        Ok(())
    }

    #[test]
    fn ensure_empty_reports_leftovers() -> anyhow::Result<()> {
        let leaf = CellBuilder::new().build()?.to_arc();
        let cell = CellBuilder::new()
            .store_bit(true)?
            .store_reference(&leaf)?
            .build()?;
        let mut parser = cell.parser();
        assert!(parser.ensure_empty().is_err());
        parser.load_bit()?;
        assert!(parser.ensure_empty().is_err());
        parser.next_reference()?;
        parser.ensure_empty()?;
        Ok(())
    }
}
