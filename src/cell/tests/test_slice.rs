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

use super::*;
use crate::cell::IBitstring;

fn slice_of(data: &[u8], bits: usize) -> SliceData {
    SliceData::load_builder(BuilderData::with_raw(data.to_vec(), bits).unwrap()).unwrap()
}

fn check_get_bits(data: u16) {
    let slice = slice_of(&data.to_be_bytes(), 16);
    for len in 1..=8 {
        for offset in 0..=16 - len {
            let result = slice.get_bits(offset, len).unwrap();
            let check = ((data >> (16 - len - offset)) & ((1 << len) - 1)) as u8;
            assert_eq!(result, check, "offset: {}, len: {}", offset, len);
        }
    }
}

#[test]
fn test_get_bits_simple() {
    check_get_bits(0xA853);
    check_get_bits(0x3720);
    check_get_bits(0x7342);
}

#[test]
fn test_get_bits_out_of_window() {
    let slice = slice_of(&[0xff], 5);
    assert_eq!(slice.get_bits(0, 5).unwrap(), 0x1f);
    let err = slice.get_bits(1, 5).unwrap_err();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::CellUnderflow));
    assert!(slice.get_bits(0, 0).is_err());
    assert_eq!(slice.get_bit_opt(5), None);
}

#[test]
fn test_get_next_int() {
    let mut slice = slice_of(&[0x12, 0x34, 0x56, 0x78, 0x9a], 40);
    assert_eq!(slice.get_next_int(4).unwrap(), 0x1);
    assert_eq!(slice.get_next_int(12).unwrap(), 0x234);
    assert_eq!(slice.get_next_int(0).unwrap(), 0);
    assert_eq!(slice.get_next_int(24).unwrap(), 0x56789a);
    assert!(slice.is_empty());
    let err = slice.get_next_int(1).unwrap_err();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::CellUnderflow));
}

#[test]
fn test_get_next_bytes_and_hash() {
    let hash = UInt256::calc_file_hash(b"slice");
    let mut builder = BuilderData::new();
    builder.append_bits(0b101, 3).unwrap();
    builder.append_u256(&hash).unwrap();
    let mut slice = builder.into_slice().unwrap();
    assert_eq!(slice.get_next_bits(3).unwrap(), vec![0b1010_0000]);
    assert_eq!(slice.get_next_hash().unwrap(), hash);
    assert!(slice.get_next_bytes(1).is_err());
}

#[test]
fn test_references() {
    let leaf = SliceData::load_builder(BuilderData::with_raw(vec![0x42], 8).unwrap()).unwrap().into_cell().unwrap();
    let mut builder = BuilderData::new();
    builder.checked_append_reference(leaf.clone()).unwrap();
    builder.checked_append_reference(Cell::default()).unwrap();
    let mut slice = builder.into_slice().unwrap();
    assert_eq!(slice.remaining_references(), 2);
    assert_eq!(slice.reference(1).unwrap(), Cell::default());
    assert_eq!(slice.checked_drain_reference().unwrap(), leaf);
    assert_eq!(slice.checked_drain_reference().unwrap(), Cell::default());
    let err = slice.checked_drain_reference().unwrap_err();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::CellUnderflow));
}

#[test]
fn test_into_cell_keeps_remainder() {
    let mut builder = BuilderData::new();
    builder.append_u8(0xaa).unwrap();
    builder.append_bits(0b110, 3).unwrap();
    builder.checked_append_reference(Cell::default()).unwrap();
    let cell = builder.into_cell().unwrap();

    let whole = SliceData::from(&cell).into_cell().unwrap();
    assert_eq!(whole, cell);

    let mut slice = SliceData::from(cell);
    slice.get_next_byte().unwrap();
    let rest = slice.into_cell().unwrap();
    assert_eq!(rest.bit_length(), 3);
    assert_eq!(rest.references_count(), 1);
    assert_eq!(format!("{:x}", rest), "d_");

    let mut expected = BuilderData::new();
    expected.append_bits(0b110, 3).unwrap();
    expected.checked_append_reference(Cell::default()).unwrap();
    assert_eq!(rest, expected.into_cell().unwrap());
}

#[test]
fn test_compare_slices() {
    let mut slice1 = slice_of(&[0xAA, 0x37, 0xA5], 24);
    let slice2 = slice_of(&[0x37, 0xA5], 16);
    slice1.move_by(8).unwrap();
    assert_eq!(slice1, slice2);
    slice1.move_by(1).unwrap();
    assert_ne!(slice1, slice2);
    assert!(slice1.move_by(16).is_err());
}

#[test]
fn test_get_bytestring() {
    let mut slice = slice_of(&[0xAB, 0xCD, 0xEF], 20);
    slice.move_by(8).unwrap();
    assert_eq!(slice.get_bytestring(0), vec![0xCD, 0xE0]);
    assert_eq!(slice.get_bytestring(8), vec![0xE0]);
    assert_eq!(slice.as_hex_string(), "cde");
}
