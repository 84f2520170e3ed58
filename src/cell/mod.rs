/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific EVERX DEV software governing permissions and
* limitations under the License.
*/

use crate::{
    fail, types::{ExceptionCode, Result, UInt256}, wrappers::Sha256
};
use sha2::Digest;
use smallvec::SmallVec;
use std::{
    collections::HashSet, fmt::{self, Write}, hash::{Hash, Hasher}, sync::Arc
};

pub const MAX_REFERENCES_COUNT: usize = 4;
pub const MAX_DATA_BITS: usize = 1023;
pub const MAX_DATA_BYTES: usize = 128; // including tag
// no cell is built deeper, so every cell can be serialized and dropped without exhausting the stack
pub const MAX_SAFE_DEPTH: u16 = 2048;

lazy_static::lazy_static! {
    static ref CELL_DEFAULT: Cell = Cell(Arc::new(DataCell::new()));
}

// Serialized cell: two descriptor bytes followed by up to 128 data bytes.
// d1 = level mask (3 bits) | store hashes | exotic | refs count (3 bits)
// d2 = floor(bits / 8) + ceil(bits / 8), odd d2 means the last data byte carries the completion tag
// Only ordinary level 0 cells are accepted, so everything above the refs count must be zero.
pub(crate) const REFS_D1_MASK: u8 = 0b0000_0111;

#[inline(always)]
pub(crate) fn calc_d1(refs_count: usize) -> u8 {
    refs_count as u8 & REFS_D1_MASK
}

#[inline(always)]
pub(crate) fn calc_d2(data_bit_len: usize) -> u8 {
    (data_bit_len / 8 + data_bit_len.div_ceil(8)) as u8
}

// The accessors below index the buffer directly, validate it with check_cell_buf first
#[inline(always)]
pub(crate) fn refs_count(buf: &[u8]) -> usize {
    usize::from(buf[0] & REFS_D1_MASK)
}

#[inline(always)]
pub(crate) fn cell_data_len(buf: &[u8]) -> usize {
    usize::from(buf[1]).div_ceil(2)
}

#[inline(always)]
pub(crate) fn full_len(buf: &[u8]) -> usize {
    2 + cell_data_len(buf)
}

#[inline(always)]
pub(crate) fn cell_data(buf: &[u8]) -> &[u8] {
    &buf[2..full_len(buf)]
}

#[inline(always)]
pub(crate) fn bit_len(buf: &[u8]) -> usize {
    match buf[1] % 2 {
        0 => usize::from(buf[1]) * 4,
        _ => find_tag(cell_data(buf)),
    }
}

pub(crate) fn check_cell_buf(buf: &[u8]) -> Result<()> {
    let (d1, d2) = match buf {
        [d1, d2, ..] => (*d1, *d2),
        _ => fail!(ExceptionCode::MalformedEncoding, "{} bytes can't hold cell descriptors", buf.len())
    };
    if d1 & !REFS_D1_MASK != 0 {
        fail!(ExceptionCode::MalformedEncoding, "only ordinary cells are supported, d1: {:#04x}", d1)
    }
    if refs_count(buf) > MAX_REFERENCES_COUNT {
        fail!(ExceptionCode::MalformedEncoding, "cell declares {} references", refs_count(buf))
    }
    if buf.len() != full_len(buf) {
        fail!(ExceptionCode::MalformedEncoding, "cell of {} bytes declares {}", buf.len(), full_len(buf))
    }
    if d2 % 2 == 1 {
        // a tag in the top bit would mean the byte holds no data
        let tagged = cell_data(buf).last().map_or(false, |last| last & 0x7f != 0);
        if !tagged {
            fail!(ExceptionCode::MalformedEncoding, "overly long or missing completion tag")
        }
    }
    if bit_len(buf) > MAX_DATA_BITS {
        fail!(ExceptionCode::MalformedEncoding, "cell declares {} data bits", bit_len(buf))
    }
    Ok(())
}

/// Length in bits of tagged data: everything before the last set bit
pub fn find_tag(bitstring: &[u8]) -> usize {
    match bitstring.iter().rposition(|byte| *byte != 0) {
        Some(index) => index * 8 + 7 - bitstring[index].trailing_zeros() as usize,
        None => 0
    }
}

/// Keeps `bits` leading bits of `data` and puts the completion tag right after them
pub fn append_tag(data: &mut Vec<u8>, bits: usize) {
    let used = bits % 8;
    data.resize(bits.div_ceil(8), 0);
    if used == 0 {
        data.push(0x80);
    } else if let Some(last) = data.last_mut() {
        *last = (*last & (0xff << (8 - used))) | (0x80 >> used);
    }
}

/// Immutable cell contents with the representation hash and depth computed once on construction
#[derive(Clone, Debug)]
pub struct DataCell {
    buf: Vec<u8>,
    references: SmallVec<[Cell; MAX_REFERENCES_COUNT]>,
    hash: UInt256,
    depth: u16,
}

impl Default for DataCell {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCell {
    pub fn new() -> Self {
        DataCell {
            buf: vec![0, 0],
            references: SmallVec::new(),
            hash: UInt256::DEFAULT_CELL_HASH,
            depth: 0,
        }
    }

    /// `data` must end with the completion tag
    pub fn with_refs_and_data(references: Vec<Cell>, data: &[u8]) -> Result<DataCell> {
        let bit_len = find_tag(data);
        if bit_len > MAX_DATA_BITS || references.len() > MAX_REFERENCES_COUNT {
            fail!(
                ExceptionCode::CapacityExceeded,
                "cell can't hold {} bits and {} references", bit_len, references.len()
            )
        }
        let mut buf = vec![calc_d1(references.len()), calc_d2(bit_len)];
        buf.extend_from_slice(&data[..bit_len.div_ceil(8)]);
        Self::sealed(buf, references.into_iter().collect(), MAX_SAFE_DEPTH, ExceptionCode::CapacityExceeded)
    }

    /// Builds cell from its serialized form `[d1, d2, data]`, as stored in a bag of cells
    pub fn with_raw_data(references: Vec<Cell>, data: Vec<u8>, max_depth: Option<u16>) -> Result<DataCell> {
        check_cell_buf(&data)?;
        if refs_count(&data) != references.len() {
            fail!(
                ExceptionCode::MalformedEncoding,
                "descriptor declares {} references but {} given", refs_count(&data), references.len()
            )
        }
        let max_depth = max_depth.unwrap_or(MAX_SAFE_DEPTH);
        Self::sealed(data, references.into_iter().collect(), max_depth, ExceptionCode::MalformedEncoding)
    }

    // hash = sha256(d1 d2 tagged data, depth of every child as u16 be, hash of every child)
    fn sealed(
        buf: Vec<u8>,
        references: SmallVec<[Cell; MAX_REFERENCES_COUNT]>,
        max_depth: u16,
        too_deep: ExceptionCode,
    ) -> Result<DataCell> {
        let max_depth = max_depth.min(MAX_SAFE_DEPTH);
        let depth = references.iter().map(|child| child.repr_depth() + 1).max().unwrap_or(0);
        if depth > max_depth {
            fail!(too_deep, "cell depth {} exceeds {}", depth, max_depth)
        }
        let mut hasher = Sha256::new();
        hasher.update(&buf[..2]);
        hasher.update(cell_data(&buf));
        references.iter().for_each(|child| hasher.update(child.repr_depth().to_be_bytes()));
        references.iter().for_each(|child| hasher.update(child.repr_hash().as_slice()));
        Ok(DataCell {
            hash: UInt256::with_array(hasher.finalize().into()),
            depth,
            buf,
            references,
        })
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.buf
    }

    // unaligned data keeps its completion tag
    pub fn data(&self) -> &[u8] {
        cell_data(&self.buf)
    }

    pub fn bit_length(&self) -> usize {
        bit_len(&self.buf)
    }

    pub fn references_count(&self) -> usize {
        self.references.len()
    }
}

/// Shared handle to a [`DataCell`], cheap to clone and compared by representation hash
#[derive(Clone)]
pub struct Cell(Arc<DataCell>);

impl From<DataCell> for Cell {
    fn from(cell: DataCell) -> Self {
        Cell(Arc::new(cell))
    }
}

impl Cell {
    pub fn reference(&self, index: usize) -> Result<Cell> {
        match self.0.references.get(index) {
            Some(child) => Ok(child.clone()),
            None => fail!(
                ExceptionCode::CellUnderflow,
                "no reference #{} in cell with {} references", index, self.references_count()
            )
        }
    }

    pub fn references(&self) -> &[Cell] {
        &self.0.references
    }

    pub fn reference_repr_hash(&self, index: usize) -> Result<UInt256> {
        self.reference(index).map(|child| child.repr_hash())
    }

    /// Cell data; the last byte carries the completion tag when the bit length is not aligned
    pub fn data(&self) -> &[u8] {
        self.0.data()
    }

    /// Cell as stored in a bag of cells: description bytes and data
    pub fn raw_data(&self) -> &[u8] {
        self.0.raw_data()
    }

    pub fn bit_length(&self) -> usize {
        self.0.bit_length()
    }

    pub fn references_count(&self) -> usize {
        self.0.references_count()
    }

    pub fn repr_hash(&self) -> UInt256 {
        self.0.hash
    }

    pub fn hash(&self) -> UInt256 {
        self.repr_hash()
    }

    pub fn repr_depth(&self) -> u16 {
        self.0.depth
    }

    /// Counts distinct cells of the tree, failing once `max` is exceeded
    pub fn count_cells(&self, max: usize) -> Result<usize> {
        let mut visited = HashSet::new();
        let mut queue = vec![self.clone()];
        while let Some(cell) = queue.pop() {
            if !visited.insert(cell.repr_hash()) {
                continue
            }
            if visited.len() > max {
                fail!(ExceptionCode::TooManyCells, "count exceeds max {}", max)
            }
            queue.extend(cell.references().iter().cloned());
        }
        Ok(visited.len())
    }

    pub fn to_hex_string(&self, lower: bool) -> String {
        to_hex_string(self.data(), self.bit_length(), lower)
    }

    // `last` is None for the root, otherwise tells whether the node closes its parent's list
    fn write_node(&self, f: &mut fmt::Formatter, indent: &str, last: Option<bool>, full: bool, levels: u16) -> fmt::Result {
        let (branch, continuation) = match last {
            None => ("", ""),
            Some(true) => (" └─", "   "),
            Some(false) => (" ├─", " │ "),
        };
        write!(f, "{}{}bits: {}   refs: {}", indent, branch, self.bit_length(), self.references_count())?;
        if self.data().len() > 100 {
            write!(f, "\n{}{}", indent, continuation)?;
        } else {
            f.write_str("   ")?;
        }
        write!(f, "data: {}", self.to_hex_string(true))?;
        if full {
            write!(f, "\n{}{}hash: {:x}   depth: {}", indent, continuation, self.repr_hash(), self.repr_depth())?;
        }
        if levels == 0 {
            return Ok(())
        }
        let child_indent = match last {
            None => String::new(),
            Some(true) => format!("{}  ", indent),
            Some(false) => format!("{} │", indent),
        };
        let count = self.references_count();
        for (index, child) in self.references().iter().enumerate() {
            writeln!(f)?;
            child.write_node(f, &child_indent, Some(index + 1 == count), full, levels - 1)?;
        }
        Ok(())
    }
}

impl Default for Cell {
    fn default() -> Self {
        CELL_DEFAULT.clone()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Cell) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl PartialEq<UInt256> for Cell {
    fn eq(&self, other_hash: &UInt256) -> bool {
        &self.repr_hash() == other_hash
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.repr_hash())
    }
}

// `{}` prints the root only, `{:.N}` descends N levels, `{:#}` adds hashes and depths
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let levels = f.precision().unwrap_or(0).min(MAX_SAFE_DEPTH as usize) as u16;
        self.write_node(f, "", None, f.alternate(), levels)
    }
}

impl fmt::LowerHex for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex_string(true))
    }
}

impl fmt::UpperHex for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex_string(false))
    }
}

impl fmt::Binary for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.data();
        (0..self.bit_length())
            .map(|bit| if data[bit / 8] & (0x80 >> (bit % 8)) != 0 { '1' } else { '0' })
            .try_for_each(|digit| f.write_char(digit))
    }
}

// Fift style hex: a trailing `_` marks a cut nibble that still holds its completion tag
pub(crate) fn to_hex_string(data: impl AsRef<[u8]>, len: usize, lower: bool) -> String {
    let data = data.as_ref();
    let bytes = &data[..len.div_ceil(8).min(data.len())];
    let mut result = if lower { hex::encode(bytes) } else { hex::encode_upper(bytes) };
    let rem = len % 8;
    if (1..=4).contains(&rem) {
        result.pop();
    }
    if rem != 0 && rem != 4 {
        result.push('_');
    }
    result
}

/// `data` must end with the completion tag
pub fn create_cell(references: Vec<Cell>, data: &[u8]) -> Result<Cell> {
    DataCell::with_refs_and_data(references, data).map(Cell::from)
}

/// Seals `bit_len` leading bits of `data` and the references into an immutable cell
pub fn seal(data: &[u8], bit_len: usize, references: Vec<Cell>) -> Result<Cell> {
    BuilderData::with_raw_and_refs(data.to_vec(), bit_len, references)?.into_cell()
}

mod slice;

pub use self::slice::*;

pub mod builder;

pub use self::builder::*;

mod builder_operations;

pub use self::builder_operations::*;

#[cfg(test)]
#[path = "tests/test_cell.rs"]
mod tests;
