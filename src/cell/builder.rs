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

use crate::fail;
use crate::cell::{append_tag, create_cell, find_tag, Cell, SliceData, MAX_DATA_BITS, MAX_DATA_BYTES, MAX_REFERENCES_COUNT};
use crate::types::{ExceptionCode, Result};

/// Mutable accumulator of bits and references, sealed into a [`Cell`] by `into_cell`.
/// `data` holds exactly the bytes covering `length_in_bits`, unused bits of the last byte are zero.
#[derive(Debug, PartialEq, Clone, Eq, Default)]
pub struct BuilderData {
    data: Vec<u8>,
    length_in_bits: usize,
    references: Vec<Cell>,
}

impl TryFrom<&Cell> for BuilderData {
    type Error = crate::Error;
    fn try_from(cell: &Cell) -> Result<Self> {
        BuilderData::with_raw_and_refs(cell.data().to_vec(), cell.bit_length(), cell.references().to_vec())
    }
}

impl BuilderData {
    pub const fn new() -> Self {
        BuilderData {
            data: Vec::new(),
            length_in_bits: 0,
            references: Vec::new(),
        }
    }

    /// Takes the leading `length_in_bits` bits of `data`
    pub fn with_raw(data: Vec<u8>, length_in_bits: usize) -> Result<BuilderData> {
        if length_in_bits > data.len() * 8 {
            fail!(ExceptionCode::FatalError, "{} bits requested from {} bytes", length_in_bits, data.len())
        }
        if length_in_bits > MAX_DATA_BITS {
            fail!(ExceptionCode::CapacityExceeded, "{} bits do not fit cell", length_in_bits)
        }
        let mut builder = BuilderData { data, length_in_bits, references: Vec::new() };
        builder.clear_tail();
        builder.data.reserve_exact(MAX_DATA_BYTES.saturating_sub(builder.data.len()));
        Ok(builder)
    }

    pub fn with_raw_and_refs(
        data: Vec<u8>,
        length_in_bits: usize,
        refs: impl IntoIterator<Item = Cell>,
    ) -> Result<BuilderData> {
        let mut builder = BuilderData::with_raw(data, length_in_bits)?;
        for cell in refs {
            builder.checked_append_reference(cell)?;
        }
        Ok(builder)
    }

    /// Builder from data carrying a completion tag
    pub fn with_bitstring(data: Vec<u8>) -> Result<BuilderData> {
        let length_in_bits = find_tag(&data);
        BuilderData::with_raw(data, length_in_bits)
    }

    pub fn into_cell(self) -> Result<Cell> {
        let data = self.tagged_data();
        create_cell(self.references, &data)
    }

    pub fn into_slice(self) -> Result<SliceData> {
        SliceData::load_builder(self)
    }

    pub fn references(&self) -> &[Cell] {
        &self.references
    }

    /// Data bytes without completion tag
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn length_in_bits(&self) -> usize {
        self.length_in_bits
    }

    pub fn is_empty(&self) -> bool {
        self.length_in_bits == 0 && self.references.is_empty()
    }

    pub fn bits_free(&self) -> usize {
        MAX_DATA_BITS - self.length_in_bits
    }

    pub fn references_free(&self) -> usize {
        MAX_REFERENCES_COUNT - self.references.len()
    }

    pub fn can_append(&self, other: &BuilderData) -> bool {
        self.bits_free() >= other.length_in_bits && self.references_free() >= other.references.len()
    }

    /// Appends the leading `bits` bits of `slice`
    pub fn append_raw(&mut self, slice: &[u8], bits: usize) -> Result<&mut Self> {
        if bits > slice.len() * 8 {
            fail!(ExceptionCode::FatalError, "{} bits requested from {} bytes", bits, slice.len())
        }
        if bits > self.bits_free() {
            fail!(
                ExceptionCode::CapacityExceeded,
                "can't append {} bits to {} of {}", bits, self.length_in_bits, MAX_DATA_BITS
            )
        }
        let source = &slice[..bits.div_ceil(8)];
        match self.length_in_bits % 8 {
            0 => self.data.extend_from_slice(source),
            used => for byte in source {
                // the partial byte takes the head of each incoming byte, its tail starts a new one
                if let Some(last) = self.data.last_mut() {
                    *last |= byte >> used;
                }
                self.data.push(byte << (8 - used));
            }
        }
        self.length_in_bits += bits;
        self.clear_tail();
        Ok(self)
    }

    fn clear_tail(&mut self) {
        self.data.truncate(self.length_in_bits.div_ceil(8));
        let used = self.length_in_bits % 8;
        if used != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= 0xff << (8 - used);
            }
        }
    }

    pub fn append_builder(&mut self, other: &BuilderData) -> Result<&mut Self> {
        if !self.can_append(other) {
            fail!(ExceptionCode::CapacityExceeded, "builder does not fit")
        }
        self.append_raw(&other.data, other.length_in_bits)?;
        self.references.extend_from_slice(&other.references);
        Ok(self)
    }

    pub fn checked_append_reference(&mut self, cell: Cell) -> Result<&mut Self> {
        if self.references_free() == 0 {
            fail!(ExceptionCode::CapacityExceeded, "cell already has {} references", MAX_REFERENCES_COUNT)
        }
        self.references.push(cell);
        Ok(self)
    }

    pub fn trunc(&mut self, length_in_bits: usize) -> Result<()> {
        if length_in_bits > self.length_in_bits {
            fail!(ExceptionCode::FatalError, "can't truncate {} bits to {}", self.length_in_bits, length_in_bits)
        }
        self.length_in_bits = length_in_bits;
        self.clear_tail();
        Ok(())
    }

    fn tagged_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        append_tag(&mut data, self.length_in_bits);
        data
    }
}

impl fmt::Display for BuilderData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = super::to_hex_string(self.tagged_data(), self.length_in_bits, true);
        write!(f, "bits: {}   refs: {}   data: {}", self.length_in_bits, self.references.len(), data)
    }
}

impl fmt::Binary for BuilderData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (0..self.length_in_bits).try_for_each(|i| write!(f, "{}", (self.data[i / 8] >> (7 - i % 8)) & 1))
    }
}

#[cfg(test)]
#[path = "tests/test_builder.rs"]
mod tests;
