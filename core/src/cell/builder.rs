use std::sync::Arc;

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use num_bigint::BigUint;
use num_traits::Zero;

use crate::cell::error::{MapTonCellError, TonCellError};
use crate::cell::{ArcCell, Cell, MAX_CELL_BITS, MAX_CELL_REFERENCES};
use crate::TonAddress;

pub struct CellBuilder {
    bit_writer: BitWriter<Vec<u8>, BigEndian>,
    bits_to_write: usize,
    references: Vec<ArcCell>,
}

impl CellBuilder {
    pub fn new() -> CellBuilder {
        let bit_writer = BitWriter::endian(Vec::new(), BigEndian);
        CellBuilder {
            bit_writer,
            bits_to_write: 0,
            references: Vec::new(),
        }
    }

    pub fn bits_written(&self) -> usize {
        self.bits_to_write
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_CELL_BITS - self.bits_to_write
    }

    pub fn references_written(&self) -> usize {
        self.references.len()
    }

    pub fn store_bit(&mut self, val: bool) -> Result<&mut Self, TonCellError> {
        self.bit_writer.write_bit(val).map_cell_builder_error()?;
        self.bits_to_write += 1;
        Ok(self)
    }

    pub fn store_u8(&mut self, bit_len: usize, val: u8) -> Result<&mut Self, TonCellError> {
        self.bit_writer
            .write(bit_len as u32, val)
            .map_cell_builder_error()?;
        self.bits_to_write += bit_len;
        Ok(self)
    }

    pub fn store_u32(&mut self, bit_len: usize, val: u32) -> Result<&mut Self, TonCellError> {
        self.bit_writer
            .write(bit_len as u32, val)
            .map_cell_builder_error()?;
        self.bits_to_write += bit_len;
        Ok(self)
    }

    pub fn store_i32(&mut self, bit_len: usize, val: i32) -> Result<&mut Self, TonCellError> {
        self.bit_writer
            .write(bit_len as u32, val)
            .map_cell_builder_error()?;
        self.bits_to_write += bit_len;
        Ok(self)
    }

    pub fn store_u64(&mut self, bit_len: usize, val: u64) -> Result<&mut Self, TonCellError> {
        self.bit_writer
            .write(bit_len as u32, val)
            .map_cell_builder_error()?;
        self.bits_to_write += bit_len;
        Ok(self)
    }

    pub fn store_uint(&mut self, bit_len: usize, val: &BigUint) -> Result<&mut Self, TonCellError> {
        let needed = if val.is_zero() { 0 } else { val.bits() as usize };
        if needed > bit_len {
            return Err(TonCellError::cell_builder_error(format!(
                "Value {} doesn't fit in {} bits (takes {} bits)",
                val, bit_len, needed
            )));
        }
        for i in (0..bit_len).rev() {
            self.store_bit(val.bit(i as u64))?;
        }
        Ok(self)
    }

    /// Stores whole bytes, bit-by-bit aligned to the current position.
    pub fn store_slice(&mut self, slice: &[u8]) -> Result<&mut Self, TonCellError> {
        for val in slice {
            self.store_u8(8, *val)?;
        }
        Ok(self)
    }

    /// Stores the first `bit_len` bits of `data` (MSB first).
    pub fn store_bits(&mut self, bit_len: usize, data: &[u8]) -> Result<&mut Self, TonCellError> {
        if data.len() * 8 < bit_len {
            return Err(TonCellError::cell_builder_error(format!(
                "Slice of {} bytes is shorter than {} bits",
                data.len(),
                bit_len
            )));
        }
        let full_bytes = bit_len / 8;
        self.store_slice(&data[0..full_bytes])?;
        let rem = bit_len % 8;
        if rem != 0 {
            self.store_u8(rem, data[full_bytes] >> (8 - rem))?;
        }
        Ok(self)
    }

    /// Variable-length coin amount: 4-bit byte length then big-endian value.
    pub fn store_coins(&mut self, val: &BigUint) -> Result<&mut Self, TonCellError> {
        if val.is_zero() {
            return self.store_u8(4, 0);
        }
        let bytes = val.to_bytes_be();
        if bytes.len() > 15 {
            return Err(TonCellError::cell_builder_error(format!(
                "Coin amount {} takes more than 15 bytes",
                val
            )));
        }
        self.store_u8(4, bytes.len() as u8)?;
        self.store_slice(&bytes)
    }

    /// `addr_none` for the null address, `addr_std` without anycast otherwise.
    pub fn store_address(&mut self, address: &TonAddress) -> Result<&mut Self, TonCellError> {
        if address == &TonAddress::NULL {
            return self.store_u8(2, 0);
        }
        self.store_u8(2, 2)?; // addr_std
        self.store_bit(false)?; // no anycast
        self.store_u8(8, (address.workchain & 0xff) as u8)?;
        self.store_slice(address.hash_part.as_slice())
    }

    pub fn store_reference(&mut self, cell: &ArcCell) -> Result<&mut Self, TonCellError> {
        if self.references.len() == MAX_CELL_REFERENCES {
            return Err(TonCellError::cell_builder_error(format!(
                "Cell must contain at most {} references",
                MAX_CELL_REFERENCES
            )));
        }
        self.references.push(cell.clone());
        Ok(self)
    }

    pub fn store_child(&mut self, cell: Cell) -> Result<&mut Self, TonCellError> {
        self.store_reference(&Arc::new(cell))
    }

    pub fn store_maybe_cell_ref(
        &mut self,
        cell: &Option<ArcCell>,
    ) -> Result<&mut Self, TonCellError> {
        match cell {
            Some(cell) => {
                self.store_bit(true)?;
                self.store_reference(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Copies another cell's data bits and references into this builder.
    pub fn store_cell(&mut self, other: &Cell) -> Result<&mut Self, TonCellError> {
        self.store_bits(other.bit_len(), other.data())?;
        for r in other.references() {
            self.store_reference(r)?;
        }
        Ok(self)
    }

    /// Snake encoding: fills this cell with whole bytes, chaining the
    /// remainder through single continuation references.
    pub fn store_snake_data(&mut self, data: &[u8]) -> Result<&mut Self, TonCellError> {
        let fit = (self.remaining_bits() / 8).min(data.len());
        self.store_slice(&data[0..fit])?;
        let rest = &data[fit..];
        if !rest.is_empty() {
            let mut child = CellBuilder::new();
            child.store_snake_data(rest)?;
            self.store_child(child.build()?)?;
        }
        Ok(self)
    }

    pub fn build(&mut self) -> Result<Cell, TonCellError> {
        while !self.bit_writer.byte_aligned() {
            self.bit_writer.write_bit(false).map_cell_builder_error()?;
        }
        let vec = self
            .bit_writer
            .writer()
            .ok_or_else(|| TonCellError::CellBuilderError("Stream is not byte-aligned".to_string()))?
            .clone();
        Cell::new(vec, self.bits_to_write, self.references.clone())
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn write_then_parse_round_trip() -> anyhow::Result<()> {
        let addr = TonAddress::from_str("EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR")?;
        let cell = CellBuilder::new()
            .store_bit(true)?
            .store_u8(4, 0x0a)?
            .store_u32(32, 0xdeadbeef)?
            .store_u64(48, 0x1234_5678_9abc)?
            .store_coins(&BigUint::from(1_500_000_000u64))?
            .store_address(&addr)?
            .build()?;

        let mut parser = cell.parser();
        assert!(parser.load_bit()?);
        assert_eq!(parser.load_u8(4)?, 0x0a);
        assert_eq!(parser.load_u32(32)?, 0xdeadbeef);
        assert_eq!(parser.load_u64(48)?, 0x1234_5678_9abc);
        assert_eq!(parser.load_coins()?, BigUint::from(1_500_000_000u64));
        assert_eq!(parser.load_address()?, addr);
        parser.ensure_empty()?;
        Ok(())
    }

    #[test]
    fn store_uint_writes_exact_bit_width() -> anyhow::Result<()> {
        let val = BigUint::from(0x15afb4u32);
        let cell = CellBuilder::new().store_uint(100, &val)?.build()?;
        assert_eq!(cell.bit_len(), 100);
        let mut parser = cell.parser();
        assert_eq!(parser.load_uint(100)?, val);
        Ok(())
    }

    #[test]
    fn store_uint_rejects_overflow() {
        let val = BigUint::from(0xffffu32);
        assert!(CellBuilder::new().store_uint(8, &val).is_err());
    }

    #[test]
    fn snake_data_spans_multiple_cells() -> anyhow::Result<()> {
        let data: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let cell = CellBuilder::new()
            .store_u32(32, 0)?
            .store_snake_data(&data)?
            .build()?;
        assert_eq!(cell.references().len(), 1);

        let mut parser = cell.parser();
        parser.load_u32(32)?;
        assert_eq!(parser.load_snake_data()?, data);
        Ok(())
    }

    #[test]
    fn null_address_takes_two_bits() -> anyhow::Result<()> {
        let cell = CellBuilder::new().store_address(&TonAddress::NULL)?.build()?;
        assert_eq!(cell.bit_len(), 2);
        let mut parser = cell.parser();
        assert_eq!(parser.load_address()?, TonAddress::NULL);
        Ok(())
    }
}
