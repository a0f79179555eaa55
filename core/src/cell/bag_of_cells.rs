use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crc::Crc;
use lazy_static::lazy_static;

use crate::cell::{ArcCell, Cell, MapTonCellError, TonCellError};
use crate::types::TonHash;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

lazy_static! {
    static ref CRC_32_ISCSI: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISCSI);
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct BagOfCells {
    pub roots: Vec<ArcCell>,
}

impl BagOfCells {
    pub fn from_root(root: Cell) -> BagOfCells {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    pub fn single_root(mut self) -> Result<ArcCell, TonCellError> {
        let roots_count = self.roots.len();
        if roots_count == 1 {
            Ok(self.roots.pop().unwrap())
        } else {
            Err(TonCellError::boc_deserialization_error(format!(
                "Single root expected, got {}",
                roots_count
            )))
        }
    }

    pub fn parse_hex(hex_str: &str) -> Result<BagOfCells, TonCellError> {
        let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
        let bin = hex::decode(cleaned.as_str()).map_boc_deserialization_error()?;
        Self::parse(&bin)
    }

    pub fn parse_base64(base64_str: &str) -> Result<BagOfCells, TonCellError> {
        let bin = STANDARD
            .decode(base64_str.trim())
            .map_boc_deserialization_error()?;
        Self::parse(&bin)
    }

    pub fn parse(serial: &[u8]) -> Result<BagOfCells, TonCellError> {
        let mut reader = ByteReader::new(serial);
        if reader.read_bytes(4)? != BOC_MAGIC.as_slice() {
            return Err(TonCellError::boc_deserialization_error("Invalid magic"));
        }
        let flags = reader.read_byte()?;
        let has_idx = flags & 0x80 != 0;
        let has_crc32 = flags & 0x40 != 0;
        let size_bytes = (flags & 0x07) as usize;
        let offset_bytes = reader.read_byte()? as usize;
        if size_bytes == 0 || size_bytes > 4 || offset_bytes == 0 || offset_bytes > 8 {
            return Err(TonCellError::boc_deserialization_error(
                "Invalid size/offset byte widths",
            ));
        }
        let cells_count = reader.read_uint(size_bytes)? as usize;
        let roots_count = reader.read_uint(size_bytes)? as usize;
        let _absent_count = reader.read_uint(size_bytes)?;
        let total_cells_size = reader.read_uint(offset_bytes)? as usize;
        let mut root_indexes = Vec::with_capacity(roots_count);
        for _ in 0..roots_count {
            root_indexes.push(reader.read_uint(size_bytes)? as usize);
        }
        if has_idx {
            reader.skip(cells_count * offset_bytes)?;
        }

        let cells_start = reader.position();
        let mut raw_cells = Vec::with_capacity(cells_count);
        for _ in 0..cells_count {
            let d1 = reader.read_byte()?;
            let d2 = reader.read_byte()?;
            if d1 & 0x08 != 0 {
                return Err(TonCellError::boc_deserialization_error(
                    "Exotic cells are not supported",
                ));
            }
            let ref_count = (d1 & 0x07) as usize;
            let byte_len = (d2 as usize + 1) / 2;
            let data = reader.read_bytes(byte_len)?.to_vec();
            let bit_len = if d2 % 2 == 0 {
                byte_len * 8
            } else {
                // recover the exact length from the completion tag
                let trailing = data
                    .last()
                    .map(|b| b.trailing_zeros() as usize)
                    .unwrap_or_default();
                if trailing >= 8 {
                    return Err(TonCellError::boc_deserialization_error(
                        "Missing completion tag in cell data",
                    ));
                }
                byte_len * 8 - trailing - 1
            };
            let mut references = Vec::with_capacity(ref_count);
            for _ in 0..ref_count {
                references.push(reader.read_uint(size_bytes)? as usize);
            }
            raw_cells.push((data, bit_len, references));
        }
        if reader.position() - cells_start != total_cells_size {
            return Err(TonCellError::boc_deserialization_error(
                "Total cells size mismatch",
            ));
        }
        if has_crc32 {
            let checksum = CRC_32_ISCSI.checksum(&serial[0..reader.position()]);
            let stored = u32::from_le_bytes(
                reader.read_bytes(4)?.try_into().unwrap_or_default(),
            );
            if checksum != stored {
                return Err(TonCellError::boc_deserialization_error("CRC32C mismatch"));
            }
        }

        let mut cells: Vec<Option<ArcCell>> = vec![None; cells_count];
        for (index, (data, bit_len, ref_indexes)) in raw_cells.into_iter().enumerate().rev() {
            let mut references = Vec::with_capacity(ref_indexes.len());
            for ref_index in ref_indexes {
                let reference = match cells.get(ref_index) {
                    Some(Some(cell)) if ref_index > index => cell.clone(),
                    _ => {
                        return Err(TonCellError::boc_deserialization_error(
                            "Cell references must point to later cells",
                        ))
                    }
                };
                references.push(reference);
            }
            cells[index] = Some(Cell::new(data, bit_len, references)?.to_arc());
        }

        let mut roots = Vec::with_capacity(roots_count);
        for root_index in root_indexes {
            roots.push(
                cells
                    .get(root_index)
                    .and_then(|c| c.clone())
                    .ok_or_else(|| {
                        TonCellError::boc_deserialization_error("Invalid root index")
                    })?,
            );
        }
        Ok(BagOfCells { roots })
    }

    pub fn serialize(&self, has_crc32: bool) -> Result<Vec<u8>, TonCellError> {
        let root = match self.roots.as_slice() {
            [root] => root,
            roots => {
                return Err(TonCellError::boc_serialization_error(format!(
                    "Single root expected, got {}",
                    roots.len()
                )))
            }
        };
        let ordered = topological_order(root);
        let index_by_hash: HashMap<TonHash, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, c)| (c.cell_hash(), i))
            .collect();

        let size_bytes: usize = if ordered.len() < 256 { 1 } else { 2 };
        let be = |val: usize, width: usize| (val as u64).to_be_bytes()[8 - width..].to_vec();
        let mut cells_data = Vec::new();
        for cell in &ordered {
            cells_data.extend_from_slice(&cell.descriptor_bytes());
            cells_data.extend_from_slice(&cell.data_with_completion_tag());
            for r in cell.references() {
                cells_data.extend_from_slice(&be(index_by_hash[&r.cell_hash()], size_bytes));
            }
        }
        let offset_bytes = (((u64::BITS - (cells_data.len() as u64).leading_zeros()) as usize)
            .div_ceil(8))
        .max(1);

        let mut out = Vec::with_capacity(cells_data.len() + 32);
        out.extend_from_slice(&BOC_MAGIC);
        out.push((if has_crc32 { 0x40 } else { 0 }) | size_bytes as u8);
        out.push(offset_bytes as u8);
        out.extend_from_slice(&be(ordered.len(), size_bytes)); // cells
        out.extend_from_slice(&be(1, size_bytes)); // roots
        out.extend_from_slice(&be(0, size_bytes)); // absent
        out.extend_from_slice(&be(cells_data.len(), offset_bytes));
        out.extend_from_slice(&be(0, size_bytes)); // root index
        out.extend_from_slice(&cells_data);
        if has_crc32 {
            let checksum = CRC_32_ISCSI.checksum(&out);
            out.extend_from_slice(&checksum.to_le_bytes());
        }
        Ok(out)
    }
}

/// Orders the DAG so that every reference points to a later cell: cells are
/// sorted by their longest distance from the root, which is strictly greater
/// for a child than for any of its parents.
fn topological_order(root: &ArcCell) -> Vec<ArcCell> {
    let mut distance: HashMap<TonHash, (ArcCell, usize, usize)> = HashMap::new();
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((cell, dist)) = stack.pop() {
        let descend = distance
            .get(&cell.cell_hash())
            .map_or(true, |entry| entry.1 < dist);
        if descend {
            let first_seen = distance.len();
            distance
                .entry(cell.cell_hash())
                .and_modify(|entry| entry.1 = dist)
                .or_insert_with(|| (cell.clone(), dist, first_seen));
            for r in cell.references() {
                stack.push((r.clone(), dist + 1));
            }
        }
    }
    let mut ordered: Vec<_> = distance.into_values().collect();
    ordered.sort_by_key(|(_, dist, first_seen)| (*dist, *first_seen));
    ordered.into_iter().map(|(cell, _, _)| cell).collect()
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read_byte(&mut self) -> Result<u8, TonCellError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], TonCellError> {
        if self.pos + len > self.data.len() {
            return Err(TonCellError::boc_deserialization_error(
                "Unexpected end of data",
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_uint(&mut self, len: usize) -> Result<u64, TonCellError> {
        let mut val = 0u64;
        for byte in self.read_bytes(len)? {
            val = (val << 8) | *byte as u64;
        }
        Ok(val)
    }

    fn skip(&mut self, len: usize) -> Result<(), TonCellError> {
        self.read_bytes(len).map(|_| ())
    }
}
