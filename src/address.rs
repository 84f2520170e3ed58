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

use std::{fmt, str::FromStr};

use crc::{Crc, CRC_16_XMODEM};
const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

use crate::{
    cell::{BuilderData, IBitstring, SliceData},
    error, fail,
    wrappers::{base64_decode, base64_decode_url_safe, base64_encode, base64_encode_url_safe},
    Error, ExceptionCode, Result, Status, UInt256,
};

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TESTNET_FLAG: u8 = 0x80;

const FRIENDLY_BYTES: usize = 36;
const FRIENDLY_CHARS: usize = 48;

/// Standard internal address `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`.
/// Anycast is never produced and rejected on read.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgAddressInt {
    workchain_id: i8,
    address: UInt256,
}

/// Flags carried by the user-friendly text form only
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FriendlyFlags {
    pub bounceable: bool,
    pub testnet: bool,
}

impl MsgAddressInt {
    pub const fn with_standart(workchain_id: i8, address: UInt256) -> Self {
        Self { workchain_id, address }
    }

    pub fn workchain_id(&self) -> i8 {
        self.workchain_id
    }

    pub fn address(&self) -> &UInt256 {
        &self.address
    }

    pub fn write_to(&self, builder: &mut BuilderData) -> Status {
        builder
            .append_bits(0b10, 2)?
            .append_bit_zero()?
            .append_i8(self.workchain_id)?
            .append_u256(&self.address)?;
        Ok(())
    }

    pub fn read_from(slice: &mut SliceData) -> Result<Self> {
        match slice.get_next_int(2)? {
            0b10 => (),
            0b11 => fail!(ExceptionCode::InvalidAddress, "addr_var is not supported"),
            tag => fail!(ExceptionCode::InvalidAddress, "tag {:02b} is not an internal address", tag),
        }
        if slice.get_next_bit()? {
            fail!(ExceptionCode::InvalidAddress, "anycast addresses are not supported")
        }
        let workchain_id = slice.get_next_i8()?;
        let address = slice.get_next_hash()?;
        Ok(Self { workchain_id, address })
    }

    /// Parses `workchain:hex64`
    pub fn from_raw(value: &str) -> Result<Self> {
        let (workchain, account) = match value.split_once(':') {
            Some(parts) => parts,
            None => fail!(ExceptionCode::InvalidAddress, "no workchain separator in {}", value)
        };
        let workchain_id = i8::from_str(workchain)
            .map_err(|err| error!(ExceptionCode::InvalidAddress, "bad workchain {}: {}", workchain, err))?;
        let address = UInt256::from_hex(account)
            .map_err(|err| error!(ExceptionCode::InvalidAddress, "bad account id {}: {}", account, err))?;
        Ok(Self { workchain_id, address })
    }

    /// Parses the 48-character base64 or base64url form and checks its crc16
    pub fn from_friendly(value: &str) -> Result<(Self, FriendlyFlags)> {
        if value.len() != FRIENDLY_CHARS {
            fail!(ExceptionCode::InvalidAddress, "friendly address must be {} chars, got {}", FRIENDLY_CHARS, value.len())
        }
        let decoded = if value.contains(['-', '_']) {
            base64_decode_url_safe(value)
        } else {
            base64_decode(value)
        };
        let bytes = decoded
            .map_err(|err| error!(ExceptionCode::InvalidAddress, "bad base64 in address {}: {}", value, err))?;
        if bytes.len() != FRIENDLY_BYTES {
            fail!(ExceptionCode::InvalidAddress, "friendly address must hold {} bytes", FRIENDLY_BYTES)
        }
        let crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc != XMODEM.checksum(&bytes[..34]) {
            fail!(ExceptionCode::InvalidAddress, "crc mismatch in address {}", value)
        }
        let tag = bytes[0];
        let flags = FriendlyFlags {
            bounceable: match tag & !TESTNET_FLAG {
                BOUNCEABLE_TAG => true,
                NON_BOUNCEABLE_TAG => false,
                _ => fail!(ExceptionCode::InvalidAddress, "unknown address tag {:#04x}", tag)
            },
            testnet: tag & TESTNET_FLAG != 0,
        };
        let address = UInt256::from_slice(&bytes[2..34])?;
        Ok((Self { workchain_id: bytes[1] as i8, address }, flags))
    }

    pub fn to_friendly(&self, flags: FriendlyFlags, url_safe: bool) -> String {
        let mut bytes = Vec::with_capacity(FRIENDLY_BYTES);
        let mut tag = if flags.bounceable { BOUNCEABLE_TAG } else { NON_BOUNCEABLE_TAG };
        if flags.testnet {
            tag |= TESTNET_FLAG;
        }
        bytes.push(tag);
        bytes.push(self.workchain_id as u8);
        bytes.extend_from_slice(self.address.as_slice());
        bytes.extend_from_slice(&XMODEM.checksum(&bytes).to_be_bytes());
        if url_safe {
            base64_encode_url_safe(&bytes)
        } else {
            base64_encode(&bytes)
        }
    }
}

/// Accepts both raw and user-friendly forms, the friendly flags are dropped
impl FromStr for MsgAddressInt {
    type Err = Error;
    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.contains(':') {
            Self::from_raw(value)
        } else {
            Ok(Self::from_friendly(value)?.0)
        }
    }
}

impl fmt::Display for MsgAddressInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{:x}", self.workchain_id, self.address)
    }
}

impl fmt::Debug for MsgAddressInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// `addr_none$00` or `addr_extern$01 len:(## 9) external_address:(bits len)`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MsgAddressExt {
    #[default]
    AddrNone,
    AddrExtern {
        len: usize,
        address: Vec<u8>,
    },
}

impl MsgAddressExt {
    pub fn with_extern(address: Vec<u8>, len: usize) -> Result<Self> {
        if len >= 1 << 9 || len > address.len() * 8 {
            fail!(ExceptionCode::InvalidAddress, "external address of {} bits does not fit", len)
        }
        let address = BuilderData::with_raw(address, len)?.data().to_vec();
        Ok(Self::AddrExtern { len, address })
    }

    pub fn write_to(&self, builder: &mut BuilderData) -> Status {
        match self {
            MsgAddressExt::AddrNone => {
                builder.append_bits(0b00, 2)?;
            }
            MsgAddressExt::AddrExtern { len, address } => {
                builder.append_bits(0b01, 2)?.append_bits(*len, 9)?;
                builder.append_raw(address, *len)?;
            }
        }
        Ok(())
    }

    pub fn read_from(slice: &mut SliceData) -> Result<Self> {
        match slice.get_next_int(2)? {
            0b00 => Ok(MsgAddressExt::AddrNone),
            0b01 => {
                let len = slice.get_next_int(9)? as usize;
                let address = slice.get_next_bits(len)?;
                Ok(MsgAddressExt::AddrExtern { len, address })
            }
            tag => fail!(ExceptionCode::InvalidAddress, "tag {:02b} is not an external address", tag)
        }
    }
}

#[cfg(test)]
#[path = "tests/test_address.rs"]
mod tests;
