use std::collections::BTreeMap;

use crate::cell::{Cell, CellBuilder, TonCellError};

/// Serializes a small dictionary (`HashmapE n V`) with fixed-width unsigned
/// keys. Only building is supported; the engine never parses dictionaries.
///
/// The returned cell is the hashmap root (`hm_edge`); the caller stores the
/// usual `Maybe ^Cell` bit outside. Values are written by `write_value` into
/// the leaf cells.
pub fn build_dict<V, F>(
    key_len_bits: usize,
    entries: &BTreeMap<u64, V>,
    write_value: F,
) -> Result<Cell, TonCellError>
where
    F: Fn(&mut CellBuilder, &V) -> Result<(), TonCellError> + Copy,
{
    if entries.is_empty() {
        return Err(TonCellError::InvalidInput(
            "Cannot build an empty dictionary".to_string(),
        ));
    }
    let mut keyed: Vec<(Vec<bool>, &V)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if key_len_bits < 64 && *key >> key_len_bits != 0 {
            return Err(TonCellError::InvalidInput(format!(
                "Key {} doesn't fit in {} bits",
                key, key_len_bits
            )));
        }
        let bits = (0..key_len_bits)
            .rev()
            .map(|i| (key >> i) & 1 == 1)
            .collect();
        keyed.push((bits, value));
    }
    let mut builder = CellBuilder::new();
    fill_node(&mut builder, key_len_bits, &keyed, write_value)?;
    builder.build()
}

fn fill_node<V, F>(
    builder: &mut CellBuilder,
    key_len_left: usize,
    keys: &[(Vec<bool>, &V)],
    write_value: F,
) -> Result<(), TonCellError>
where
    F: Fn(&mut CellBuilder, &V) -> Result<(), TonCellError> + Copy,
{
    let prefix_len = common_prefix_len(keys);
    let label = &keys[0].0[0..prefix_len];
    store_label(builder, key_len_left, label)?;

    if prefix_len == key_len_left {
        // single full key left, the leaf holds the value
        return write_value(builder, keys[0].1);
    }

    let split = keys.partition_point(|(bits, _)| !bits[prefix_len]);
    let (left, right) = keys.split_at(split);
    for (keys, _bit) in [(left, false), (right, true)] {
        let stripped: Vec<(Vec<bool>, &V)> = keys
            .iter()
            .map(|(bits, value)| (bits[prefix_len + 1..].to_vec(), *value))
            .collect();
        let mut child = CellBuilder::new();
        fill_node(&mut child, key_len_left - prefix_len - 1, &stripped, write_value)?;
        builder.store_child(child.build()?)?;
    }
    Ok(())
}

fn common_prefix_len<V>(keys: &[(Vec<bool>, &V)]) -> usize {
    let first = &keys[0].0;
    let last = &keys[keys.len() - 1].0;
    first
        .iter()
        .zip(last.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

/// `hml_short` / `hml_long` / `hml_same`, whichever is the most compact.
fn store_label(
    builder: &mut CellBuilder,
    key_len_left: usize,
    label: &[bool],
) -> Result<(), TonCellError> {
    let len = label.len();
    let len_len = (usize::BITS - key_len_left.leading_zeros()) as usize;
    let all_same = len > 0 && label.iter().all(|b| *b == label[0]);

    let short_size = 2 * len + 2;
    let long_size = 2 + len_len + len;
    let same_size = if all_same { 3 + len_len } else { usize::MAX };

    if same_size < short_size && same_size < long_size {
        builder.store_u8(2, 0b11)?;
        builder.store_bit(label[0])?;
        builder.store_u32(len_len, len as u32)?;
    } else if long_size < short_size {
        builder.store_u8(2, 0b10)?;
        builder.store_u32(len_len, len as u32)?;
        for bit in label {
            builder.store_bit(*bit)?;
        }
    } else {
        builder.store_bit(false)?;
        for _ in 0..len {
            builder.store_bit(true)?;
        }
        builder.store_bit(false)?;
        for bit in label {
            builder.store_bit(*bit)?;
        }
    }
    Ok(())
}
