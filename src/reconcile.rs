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

use std::fmt;

use crate::{indexer::TransactionRecord, UInt256};

/// Record field a hash was found in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashField {
    InMsgHash,
    TransactionHash,
    InMsgBodyHash,
}

impl HashField {
    /// Candidate fields in the order they are checked
    pub const ALL: [HashField; 3] = [HashField::InMsgHash, HashField::TransactionHash, HashField::InMsgBodyHash];

    pub fn value(self, record: &TransactionRecord) -> Option<&str> {
        match self {
            HashField::InMsgHash => record.in_msg_hash(),
            HashField::TransactionHash => record.transaction_hash(),
            HashField::InMsgBodyHash => record.in_msg_body_hash(),
        }
    }
}

impl fmt::Display for HashField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            HashField::InMsgHash => "in_msg.hash",
            HashField::TransactionHash => "transaction_id.hash",
            HashField::InMsgBodyHash => "in_msg.body_hash",
        })
    }
}

/// Decodes a hash as 64 hex digits of any case or standard base64 of 32 bytes
pub fn decode_hash(text: &str) -> Option<UInt256> {
    let text = text.trim();
    if text.is_empty() {
        return None
    }
    UInt256::from_hex(text).or_else(|_| UInt256::from_base64(text)).ok()
}

/// Compares a locally computed hash with the hash fields of indexer records
pub struct HashReconciler;

impl HashReconciler {
    pub fn matching_field(target: &UInt256, record: &TransactionRecord) -> Option<HashField> {
        HashField::ALL.into_iter().find(|field| {
            let Some(text) = field.value(record) else {
                return false
            };
            match decode_hash(text) {
                Some(hash) => hash == *target,
                None => {
                    if !text.is_empty() {
                        log::warn!("skipping malformed {} {:?}", field, text);
                    }
                    false
                }
            }
        })
    }

    pub fn matches(target: &UInt256, record: &TransactionRecord) -> bool {
        Self::matching_field(target, record).is_some()
    }

    /// Same as [`HashReconciler::matches`], a malformed target matches nothing
    pub fn matches_str(target: &str, record: &TransactionRecord) -> bool {
        match decode_hash(target) {
            Some(target) => Self::matches(&target, record),
            None => {
                log::warn!("target hash {:?} is neither hex nor base64", target);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/test_reconcile.rs"]
mod tests;
