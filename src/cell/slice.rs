/*
* Copyright 2018-2020 TON DEV SOLUTIONS LTD.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific TON DEV software governing permissions and
* limitations under the License.
*/

use std::fmt;
use std::ops::Range;

use crate::{fail, cell::{BuilderData, Cell}};
use crate::types::{ExceptionCode, Result, Status, UInt256};

/// Read cursor over a cell: a window of its data bits and a window of its references
#[derive(Eq, Clone)]
pub struct SliceData {
    cell: Cell,
    data_window: Range<usize>,
    references_window: Range<usize>,
}

impl PartialEq for SliceData {
    fn eq(&self, other: &SliceData) -> bool {
        self.remaining_bits() == other.remaining_bits()
            && self.get_bytestring(0) == other.get_bytestring(0)
            && self.remaining_references() == other.remaining_references()
            && (0..self.remaining_references()).all(|i| self.reference_opt(i) == other.reference_opt(i))
    }
}

impl Default for SliceData {
    fn default() -> Self {
        SliceData::load_cell(Cell::default())
    }
}

impl From<&Cell> for SliceData {
    fn from(cell: &Cell) -> SliceData {
        SliceData::load_cell(cell.clone())
    }
}

impl From<Cell> for SliceData {
    fn from(cell: Cell) -> SliceData {
        SliceData::load_cell(cell)
    }
}

impl SliceData {
    pub fn load_cell(cell: Cell) -> SliceData {
        SliceData {
            data_window: 0..cell.bit_length(),
            references_window: 0..cell.references_count(),
            cell,
        }
    }

    pub fn load_builder(builder: BuilderData) -> Result<SliceData> {
        builder.into_cell().map(SliceData::load_cell)
    }

    pub fn remaining_references(&self) -> usize {
        self.references_window.len()
    }

    pub fn remaining_bits(&self) -> usize {
        self.data_window.len()
    }

    /// No data bits left, references are not taken into account
    pub fn is_empty(&self) -> bool {
        self.data_window.is_empty()
    }

    fn check_remaining(&self, bits: usize, offset: usize) -> Status {
        if offset + bits > self.remaining_bits() {
            fail!(
                ExceptionCode::CellUnderflow,
                "can't read {} bits at {} of {}", bits, offset, self.remaining_bits()
            )
        }
        Ok(())
    }

    pub fn reference(&self, index: usize) -> Result<Cell> {
        match self.reference_opt(index) {
            Some(cell) => Ok(cell),
            None => fail!(ExceptionCode::CellUnderflow, "no reference #{} in slice", index)
        }
    }

    pub fn reference_opt(&self, index: usize) -> Option<Cell> {
        let index = self.references_window.start + index;
        if !self.references_window.contains(&index) {
            return None
        }
        self.cell.references().get(index).cloned()
    }

    pub fn checked_drain_reference(&mut self) -> Result<Cell> {
        let cell = self.reference(0)?;
        self.references_window.start += 1;
        Ok(cell)
    }

    /// Seals the unread bits and references into a cell, an untouched slice gives back its own cell
    pub fn into_cell(self) -> Result<Cell> {
        let whole = self.data_window == (0..self.cell.bit_length())
            && self.references_window == (0..self.cell.references_count());
        if whole {
            return Ok(self.cell)
        }
        let references = self.cell.references()[self.references_window.clone()].to_vec();
        BuilderData::with_raw_and_refs(self.get_bytestring(0), self.remaining_bits(), references)?
            .into_cell()
    }

    pub fn move_by(&mut self, offset: usize) -> Result<()> {
        self.check_remaining(offset, 0)?;
        self.data_window.start += offset;
        Ok(())
    }

    pub fn get_bit_opt(&self, offset: usize) -> Option<bool> {
        if offset >= self.remaining_bits() {
            return None
        }
        let index = self.data_window.start + offset;
        Some(self.cell.data()[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    pub fn get_bit(&self, offset: usize) -> Result<bool> {
        match self.get_bit_opt(offset) {
            Some(bit) => Ok(bit),
            None => fail!(ExceptionCode::CellUnderflow, "no bit at offset {}", offset)
        }
    }

    /// Reads 1..=8 bits at `offset` as the low bits of a byte
    pub fn get_bits(&self, offset: usize, bits: usize) -> Result<u8> {
        self.check_remaining(bits, offset)?;
        if !(1..=8).contains(&bits) {
            fail!("can't read {} bits into a byte", bits)
        }
        let index = self.data_window.start + offset;
        let data = self.cell.data();
        // two bytes around the position, the second one may lie past the data
        let pair = u16::from_be_bytes([data[index / 8], data.get(index / 8 + 1).copied().unwrap_or(0)]);
        Ok((pair << (index % 8) >> (16 - bits)) as u8)
    }

    pub fn get_byte(&self, offset: usize) -> Result<u8> {
        self.get_bits(offset, 8)
    }

    /// Remaining bits from `offset` packed into bytes, the last one padded with zeros
    pub fn get_bytestring(&self, offset: usize) -> Vec<u8> {
        (offset..self.remaining_bits())
            .step_by(8)
            .filter_map(|start| {
                let bits = (self.remaining_bits() - start).min(8);
                self.get_bits(start, bits).ok().map(|value| value << (8 - bits))
            })
            .collect()
    }

    pub fn get_next_bit(&mut self) -> Result<bool> {
        let bit = self.get_bit(0)?;
        self.data_window.start += 1;
        Ok(bit)
    }

    pub fn get_next_bits(&mut self, bits: usize) -> Result<Vec<u8>> {
        self.check_remaining(bits, 0)?;
        let mut head = self.clone();
        head.data_window.end = head.data_window.start + bits;
        self.data_window.start += bits;
        Ok(head.get_bytestring(0))
    }

    pub fn get_next_byte(&mut self) -> Result<u8> {
        let value = self.get_byte(0)?;
        self.data_window.start += 8;
        Ok(value)
    }

    /// Reads up to 64 bits as a big-endian unsigned integer
    pub fn get_next_int(&mut self, bits: usize) -> Result<u64> {
        if bits > 64 {
            fail!("too many bits {} > 64", bits)
        }
        self.check_remaining(bits, 0)?;
        let mut value = 0u64;
        for start in (0..bits).step_by(8) {
            let chunk = (bits - start).min(8);
            value = (value << chunk) | u64::from(self.get_bits(start, chunk)?);
        }
        self.data_window.start += bits;
        Ok(value)
    }

    pub fn get_next_i8(&mut self) -> Result<i8> {
        Ok(self.get_next_byte()? as i8)
    }

    pub fn get_next_u32(&mut self) -> Result<u32> {
        Ok(self.get_next_int(32)? as u32)
    }

    pub fn get_next_u64(&mut self) -> Result<u64> {
        self.get_next_int(64)
    }

    pub fn get_next_bytes(&mut self, bytes: usize) -> Result<Vec<u8>> {
        self.get_next_bits(bytes * 8)
    }

    pub fn get_next_hash(&mut self) -> Result<UInt256> {
        UInt256::from_slice(&self.get_next_bytes(32)?)
    }

    /// Reads Grams (VarUInteger 16)
    pub fn get_next_coins(&mut self) -> Result<u128> {
        let len = self.get_next_int(4)? as usize;
        let bytes = self.get_next_bytes(len)?;
        Ok(bytes.iter().fold(0u128, |value, byte| value << 8 | u128::from(*byte)))
    }

    pub fn as_hex_string(&self) -> String {
        let len = self.remaining_bits();
        let mut data = self.get_bytestring(0);
        super::append_tag(&mut data, len);
        super::to_hex_string(data, len, true)
    }
}

impl fmt::Debug for SliceData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl fmt::Display for SliceData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bits {:?} refs {:?}: {}", self.data_window, self.references_window, self.as_hex_string())
    }
}

impl fmt::LowerHex for SliceData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.as_hex_string())
    }
}

#[cfg(test)]
#[path = "tests/test_slice.rs"]
mod tests;
