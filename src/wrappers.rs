/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
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

use crate::Result;
use base64::{Engine, engine::general_purpose::{STANDARD, URL_SAFE}};
use sha2::Digest;

pub use sha2::Sha256;

pub fn sha256_digest(data: impl AsRef<[u8]>) -> [u8; 32] {
    sha2::Sha256::digest(data).into()
}

pub fn base64_decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(input)?)
}

pub fn base64_encode(input: impl AsRef<[u8]>) -> String {
    STANDARD.encode(input)
}

pub fn base64_decode_url_safe(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(URL_SAFE.decode(input)?)
}

pub fn base64_encode_url_safe(input: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(input)
}
