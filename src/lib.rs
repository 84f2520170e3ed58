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

// used by the exported error macros
#[doc(hidden)]
pub use anyhow;

pub mod types;
pub use self::types::*;

pub mod wrappers;
pub use self::wrappers::*;

pub mod cell;
pub use self::cell::*;

pub mod boc;
pub use self::boc::*;

pub mod address;
pub use self::address::*;

pub mod message;
pub use self::message::*;

pub mod retry;
pub use self::retry::*;

pub mod indexer;
pub use self::indexer::*;

pub mod reconcile;
pub use self::reconcile::*;

pub mod locator;
pub use self::locator::*;

pub mod toncenter;
pub use self::toncenter::*;

pub mod config;
pub use self::config::*;
