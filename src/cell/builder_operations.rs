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

use crate::fail;
use crate::cell::{BuilderData, SliceData, MAX_DATA_BITS};
use crate::types::{ExceptionCode, Result, UInt256};

// Grams are VarUInteger 16: up to 15 bytes behind a 4-bit length
pub const MAX_COINS_BYTES: usize = 15;

impl BuilderData {
    /// Copies the unread bits and references of `other`
    pub fn checked_append_references_and_data(&mut self, other: &SliceData) -> Result<&mut Self> {
        if self.bits_free() < other.remaining_bits() || self.references_free() < other.remaining_references() {
            fail!(ExceptionCode::CapacityExceeded, "slice does not fit builder")
        }
        self.append_raw(&other.get_bytestring(0), other.remaining_bits())?;
        for index in 0..other.remaining_references() {
            self.checked_append_reference(other.reference(index)?)?;
        }
        Ok(self)
    }

    /// Stores Grams as VarUInteger 16, zero is a bare `0000`
    pub fn append_coins(&mut self, value: u128) -> Result<&mut Self> {
        let len = (u128::BITS - value.leading_zeros()).div_ceil(8) as usize;
        if len > MAX_COINS_BYTES || 4 + len * 8 > self.bits_free() {
            fail!(ExceptionCode::CapacityExceeded, "no room for coins {} in builder", value)
        }
        self.append_bits(len, 4)?;
        self.append_raw(&value.to_be_bytes()[16 - len..], len * 8)
    }

    /// Stores bytes in snake format: what fits here, the rest in a chain of child cells
    pub fn append_string_tail(&mut self, data: &[u8]) -> Result<&mut Self> {
        let free = self.bits_free() / 8;
        if data.len() <= free {
            return self.append_raw(data, data.len() * 8)
        }
        if self.references_free() == 0 {
            fail!(ExceptionCode::CapacityExceeded, "no room for string tail reference")
        }
        let (head, rest) = data.split_at(free);
        // the chain is sealed from its last cell back to the first
        let mut tail = None;
        for chunk in rest.chunks(MAX_DATA_BITS / 8).rev() {
            let mut builder = BuilderData::with_raw(chunk.to_vec(), chunk.len() * 8)?;
            if let Some(next) = tail.take() {
                builder.checked_append_reference(next)?;
            }
            tail = Some(builder.into_cell()?);
        }
        self.append_raw(head, head.len() * 8)?;
        if let Some(tail) = tail {
            self.checked_append_reference(tail)?;
        }
        Ok(self)
    }
}

/// Big-endian writers of fixed width values
pub trait IBitstring {
    fn append_bit_zero(&mut self) -> Result<&mut Self>;
    fn append_bit_one(&mut self) -> Result<&mut Self>;
    fn append_bit_bool(&mut self, bit: bool) -> Result<&mut Self>;
    fn append_bits(&mut self, value: usize, bits: usize) -> Result<&mut Self>;
    fn append_u8(&mut self, value: u8) -> Result<&mut Self>;
    fn append_u16(&mut self, value: u16) -> Result<&mut Self>;
    fn append_u32(&mut self, value: u32) -> Result<&mut Self>;
    fn append_u64(&mut self, value: u64) -> Result<&mut Self>;
    fn append_u256(&mut self, value: &UInt256) -> Result<&mut Self>;
    fn append_i8(&mut self, value: i8) -> Result<&mut Self>;
    fn append_i32(&mut self, value: i32) -> Result<&mut Self>;
}

macro_rules! append_be {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, value: $ty) -> Result<&mut Self> {
                self.append_raw(&value.to_be_bytes(), <$ty>::BITS as usize)
            }
        )*
    };
}

impl IBitstring for BuilderData {
    fn append_bit_zero(&mut self) -> Result<&mut Self> {
        self.append_bit_bool(false)
    }
    fn append_bit_one(&mut self) -> Result<&mut Self> {
        self.append_bit_bool(true)
    }
    fn append_bit_bool(&mut self, bit: bool) -> Result<&mut Self> {
        self.append_raw(&[if bit { 0x80 } else { 0 }], 1)
    }
    fn append_bits(&mut self, value: usize, bits: usize) -> Result<&mut Self> {
        if bits > 64 {
            fail!("can't append {} bits of usize", bits)
        }
        let value = (value as u64).checked_shl(64 - bits as u32).unwrap_or(0);
        self.append_raw(&value.to_be_bytes(), bits)
    }
    fn append_u256(&mut self, value: &UInt256) -> Result<&mut Self> {
        self.append_raw(value.as_slice(), 256)
    }

    append_be!(append_u8: u8, append_u16: u16, append_u32: u32, append_u64: u64, append_i8: i8, append_i32: i32);
}
