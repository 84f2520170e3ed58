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

use std::str::FromStr;

use crate::{
    address::{MsgAddressExt, MsgAddressInt},
    boc::read_single_root_boc,
    cell::{BuilderData, Cell, IBitstring, SliceData},
    fail, ExceptionCode, Result, Status, UInt256,
};

/// `tick_tock$_ tick:Bool tock:Bool`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickTock {
    pub tick: bool,
    pub tock: bool,
}

/// `_ fixed_prefix_length:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell) library:(Maybe ^Cell)`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateInit {
    pub fixed_prefix_length: Option<u8>,
    pub special: Option<TickTock>,
    pub code: Option<Cell>,
    pub data: Option<Cell>,
    pub library: Option<Cell>,
}

impl StateInit {
    pub fn with_code_and_data(code: Cell, data: Cell) -> Self {
        Self { code: Some(code), data: Some(data), ..Default::default() }
    }

    pub fn write_to(&self, builder: &mut BuilderData) -> Status {
        match self.fixed_prefix_length {
            Some(length) if length < 32 => {
                builder.append_bit_one()?.append_bits(length as usize, 5)?;
            }
            Some(length) => fail!("fixed prefix length {} does not fit 5 bits", length),
            None => {
                builder.append_bit_zero()?;
            }
        }
        match self.special {
            Some(special) => {
                builder.append_bit_one()?.append_bit_bool(special.tick)?.append_bit_bool(special.tock)?;
            }
            None => {
                builder.append_bit_zero()?;
            }
        }
        for cell in [&self.code, &self.data, &self.library] {
            match cell {
                Some(cell) => {
                    builder.append_bit_one()?.checked_append_reference(cell.clone())?;
                }
                None => {
                    builder.append_bit_zero()?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from(slice: &mut SliceData) -> Result<Self> {
        let fixed_prefix_length = match slice.get_next_bit()? {
            true => Some(slice.get_next_int(5)? as u8),
            false => None,
        };
        let special = match slice.get_next_bit()? {
            true => Some(TickTock { tick: slice.get_next_bit()?, tock: slice.get_next_bit()? }),
            false => None,
        };
        let mut next_maybe_ref = || -> Result<Option<Cell>> {
            match slice.get_next_bit()? {
                true => Ok(Some(slice.checked_drain_reference()?)),
                false => Ok(None),
            }
        };
        Ok(Self {
            fixed_prefix_length,
            special,
            code: next_maybe_ref()?,
            data: next_maybe_ref()?,
            library: next_maybe_ref()?,
        })
    }

    pub fn serialize(&self) -> Result<Cell> {
        let mut builder = BuilderData::new();
        self.write_to(&mut builder)?;
        builder.into_cell()
    }
}

/// Inbound external message:
/// `message$_ info:ext_in_msg_info init:(Maybe (Either StateInit ^StateInit)) body:(Either X ^X)`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalMessage {
    pub src: MsgAddressExt,
    pub dst: MsgAddressInt,
    pub import_fee: u128,
    pub init: Option<StateInit>,
    pub init_to_ref: bool,
    pub body: Cell,
    pub body_to_ref: bool,
}

impl ExternalMessage {
    /// Message with the body stored by reference and nothing else set
    pub fn with_body(dst: MsgAddressInt, body: Cell) -> Self {
        Self { dst, body, body_to_ref: true, ..Default::default() }
    }

    pub fn set_init(&mut self, init: StateInit, to_ref: bool) {
        self.init = Some(init);
        self.init_to_ref = to_ref;
    }

    pub fn construct_from_cell(cell: &Cell) -> Result<Self> {
        let mut slice = SliceData::from(cell);
        Self::read_from(&mut slice)
    }

    pub fn construct_from_boc(data: impl AsRef<[u8]>) -> Result<Self> {
        Self::construct_from_cell(&read_single_root_boc(data)?)
    }

    pub fn read_from(slice: &mut SliceData) -> Result<Self> {
        match slice.get_next_int(2)? {
            0b10 => (),
            0b11 => fail!(ExceptionCode::MalformedEncoding, "outbound external messages are not supported"),
            _ => fail!(ExceptionCode::MalformedEncoding, "internal messages are not supported"),
        }
        let src = MsgAddressExt::read_from(slice)?;
        let dst = MsgAddressInt::read_from(slice)?;
        let import_fee = slice.get_next_coins()?;

        let (init, init_to_ref) = match slice.get_next_bit()? {
            false => (None, false),
            true => match slice.get_next_bit()? {
                false => (Some(StateInit::read_from(slice)?), false),
                true => {
                    let mut init = SliceData::from(slice.checked_drain_reference()?);
                    (Some(StateInit::read_from(&mut init)?), true)
                }
            }
        };

        let (body, body_to_ref) = match slice.get_next_bit()? {
            true => (slice.checked_drain_reference()?, true),
            false => (std::mem::take(slice).into_cell()?, false),
        };

        Ok(Self { src, dst, import_fee, init, init_to_ref, body, body_to_ref })
    }

    pub fn write_to(&self, builder: &mut BuilderData) -> Status {
        builder.append_bits(0b10, 2)?;
        self.src.write_to(builder)?;
        self.dst.write_to(builder)?;
        builder.append_coins(self.import_fee)?;

        match &self.init {
            None => {
                builder.append_bit_zero()?;
            }
            Some(init) if self.init_to_ref => {
                builder.append_bits(0b11, 2)?;
                builder.checked_append_reference(init.serialize()?)?;
            }
            Some(init) => {
                builder.append_bits(0b10, 2)?;
                init.write_to(builder)?;
            }
        }

        if self.body_to_ref {
            builder.append_bit_one()?.checked_append_reference(self.body.clone())?;
        } else {
            builder.append_bit_zero()?;
            builder.checked_append_references_and_data(&SliceData::from(&self.body))?;
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<Cell> {
        let mut builder = BuilderData::new();
        self.write_to(&mut builder)?;
        builder.into_cell()
    }

    pub fn normalized(&self) -> Result<Cell> {
        normalize(&self.dst, &self.body)
    }

    pub fn normalized_hash(&self) -> Result<UInt256> {
        Ok(self.normalized()?.repr_hash())
    }
}

/// Builds the TEP-467 normalized external message: `ext_in_msg_info` with `addr_none` source,
/// the destination as `addr_std`, zero import fee, no init and the body by reference.
pub fn normalize(dst: &MsgAddressInt, body: &Cell) -> Result<Cell> {
    let mut builder = BuilderData::new();
    builder
        .append_bits(0b10, 2)?
        .append_bits(0b00, 2)?;
    dst.write_to(&mut builder)?;
    builder
        .append_coins(0)?
        .append_bit_zero()?
        .append_bit_one()?
        .checked_append_reference(body.clone())?;
    let cell = builder.into_cell()?;
    log::debug!("normalized message for {}: {:x}", dst, cell.repr_hash());
    Ok(cell)
}

/// Same as [`normalize`] for a raw or user-friendly destination
pub fn normalize_str(address: &str, body: &Cell) -> Result<Cell> {
    normalize(&MsgAddressInt::from_str(address)?, body)
}

/// Normalizes an already built external message, an inline body gets its own cell
pub fn normalize_message(message: &Cell) -> Result<Cell> {
    ExternalMessage::construct_from_cell(message)?.normalized()
}

pub fn normalized_hash_of_boc(data: impl AsRef<[u8]>) -> Result<UInt256> {
    ExternalMessage::construct_from_boc(data)?.normalized_hash()
}

/// Text comment: zero op code followed by the text in snake format
pub fn comment_body(text: &str) -> Result<Cell> {
    let mut builder = BuilderData::new();
    builder.append_u32(0)?.append_string_tail(text.as_bytes())?;
    builder.into_cell()
}

#[cfg(test)]
#[path = "tests/test_message.rs"]
mod tests;
