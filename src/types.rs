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

use crate::wrappers::{base64_decode, base64_encode, sha256_digest};
use std::{fmt, fmt::{LowerHex, UpperHex}, str::{self, FromStr}};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
pub type Status = Result<()>;

#[macro_export]
macro_rules! error {
    ($error:literal) => {
        $crate::anyhow::anyhow!("{} {}:{}", $error, file!(), line!())
    };
    ($fmt:literal, $($arg:tt)+) => {
        $crate::anyhow::anyhow!("{} {}:{}", format!($fmt, $($arg)+), file!(), line!())
    };
    // error kind with a located explanation, the kind stays downcastable
    ($code:path, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::anyhow::Error::from($code)
            .context(format!("{} {}:{}", format!($fmt $(, $arg)*), file!(), line!()))
    };
    ($error:expr) => {
        $crate::anyhow::Error::from($error)
    };
}

#[macro_export]
macro_rules! fail {
    ($error:literal) => {
        return Err($crate::error!($error))
    };
    ($fmt:literal, $($arg:tt)+) => {
        return Err($crate::error!($fmt, $($arg)+))
    };
    ($code:path, $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::error!($code, $fmt $(, $arg)*))
    };
    ($error:expr) => {
        return Err($crate::error!($error))
    };
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct UInt256([u8; 32]);

impl PartialEq<[u8]> for UInt256 {
    fn eq(&self, other: &[u8]) -> bool {
        self.0.as_slice() == other
    }
}

impl PartialEq<Vec<u8>> for UInt256 {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.0.as_slice() == other.as_slice()
    }
}

impl UInt256 {

    pub const fn new() -> Self {
        Self::ZERO
    }

    pub const fn with_array(data: [u8; 32]) -> Self {
        Self(data)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub const fn as_slice(&self) -> &[u8; 32] {
        &self.0
    }

    // Returns solid string like this: a80b23bfe4d301497f3ce11e753f23e8dec32368945ee279d044dbc1f91ace2a
    pub fn to_hex_string(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_base64(&self) -> String {
        base64_encode(self.0)
    }

    /// Parses 64 hex digits (any case)
    pub fn from_hex(value: &str) -> Result<Self> {
        if value.len() != 64 {
            fail!("invalid hex hash length {} (64 expected)", value.len())
        }
        Self::from_slice(&hex::decode(value)?)
    }

    /// Parses standard base64 of exactly 32 bytes
    pub fn from_base64(value: &str) -> Result<Self> {
        Self::from_slice(&base64_decode(value)?)
    }

    pub fn from_slice(value: &[u8]) -> Result<Self> {
        match <[u8; 32]>::try_from(value) {
            Ok(hash) => Ok(Self(hash)),
            Err(_) => fail!("invalid hash length {} (32 bytes expected)", value.len())
        }
    }

    pub fn calc_file_hash(bytes: &[u8]) -> Self {
        Self(sha256_digest(bytes))
    }

    pub const ZERO: UInt256 = UInt256([0; 32]);
    pub const MAX: UInt256 = UInt256([0xFF; 32]);
    // hash of default cell 0x96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7;
    pub const DEFAULT_CELL_HASH: UInt256 = UInt256([150, 162, 150, 210, 36, 242, 133, 198, 123, 238, 147,
        195, 15, 138, 48, 145, 87, 240, 218, 163, 93, 197, 184, 126, 65, 11, 120, 99, 10, 9, 207, 199]);
}

impl FromStr for UInt256 {
    type Err = Error;
    fn from_str(value: &str) -> Result<Self> {
        match value.len() {
            64 => Self::from_hex(value),
            44 => Self::from_base64(value),
            len => fail!("invalid hash string length {} (64 hex or 44 base64 expected)", len)
        }
    }
}

impl From<[u8; 32]> for UInt256 {
    fn from(data: [u8; 32]) -> Self {
        UInt256(data)
    }
}

impl From<UInt256> for [u8; 32] {
    fn from(value: UInt256) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for UInt256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        LowerHex::fmt(self, f)
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        LowerHex::fmt(self, f)
    }
}

impl UInt256 {
    fn write_hex(&self, f: &mut fmt::Formatter, upper: bool) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        let digits = if upper { hex::encode_upper(self.0) } else { hex::encode(self.0) };
        f.write_str(&digits)
    }
}

impl LowerHex for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_hex(f, false)
    }
}

impl UpperHex for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_hex(f, true)
    }
}

// Exceptions *****************************************************************

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ExceptionCode {
    #[error("cell capacity exceeded")]
    CapacityExceeded,
    #[error("cell underflow")]
    CellUnderflow,
    #[error("invalid address")]
    InvalidAddress,
    #[error("malformed bag of cells")]
    MalformedEncoding,
    #[error("too many cells")]
    TooManyCells,
    #[error("fatal error")]
    FatalError,
}

impl ExceptionCode {
    /// Finds the error kind anywhere in the context chain
    pub fn from_error(error: &Error) -> Option<ExceptionCode> {
        error.downcast_ref::<ExceptionCode>().copied()
    }
}

pub trait ByteOrderRead {
    fn read_be_uint(&mut self, bytes: usize) -> std::io::Result<usize>;
    fn read_byte(&mut self) -> std::io::Result<u8>;
    fn read_be_u32(&mut self) -> std::io::Result<u32>;
    fn read_le_u32(&mut self) -> std::io::Result<u32>;
}

fn read_array<const N: usize>(src: &mut impl std::io::Read) -> std::io::Result<[u8; N]> {
    let mut buf = [0; N];
    src.read_exact(&mut buf)?;
    Ok(buf)
}

impl<T: std::io::Read> ByteOrderRead for T {
    fn read_be_uint(&mut self, bytes: usize) -> std::io::Result<usize> {
        if !(1..=8).contains(&bytes) {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many bytes to read in usize"))
        }
        let mut buf = [0; 8];
        self.read_exact(&mut buf[8 - bytes..])?;
        Ok(u64::from_be_bytes(buf) as usize)
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        read_array(self).map(|[byte]: [u8; 1]| byte)
    }

    fn read_be_u32(&mut self) -> std::io::Result<u32> {
        read_array(self).map(u32::from_be_bytes)
    }

    fn read_le_u32(&mut self) -> std::io::Result<u32> {
        read_array(self).map(u32::from_le_bytes)
    }
}

#[cfg(test)]
#[path = "tests/test_types.rs"]
mod tests;
