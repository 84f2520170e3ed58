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

use std::io::Cursor;
use crate::{BuilderData, IBitstring, base64_decode};

use super::*;

const ACCOUNT: &str = "83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

fn build_tree_with_params(mut depth: u16, max_depth: u16, cells_count: &mut u32) -> Result<Cell> {
    let mut b = BuilderData::new();
    b.append_u32(rand::random::<u32>())?;
    b.append_u32(rand::random::<u32>())?;
    depth += 1;
    if depth < max_depth {
        b.checked_append_reference(build_tree_with_params(depth, max_depth, cells_count)?)?;
        b.checked_append_reference(build_tree_with_params(depth, max_depth, cells_count)?)?;
        b.checked_append_reference(build_tree_with_params(depth, max_depth, cells_count)?)?;
    }
    *cells_count += 1;
    b.into_cell()
}

fn u8_cell(value: u8, references: Vec<Cell>) -> Cell {
    let mut b = BuilderData::new();
    b.append_u8(value).unwrap();
    for r in references {
        b.checked_append_reference(r).unwrap();
    }
    b.into_cell().unwrap()
}

/*
            root(0)
        a(1)        b(2)
            leaf(7)
*/
fn build_shared_tree() -> Cell {
    let leaf = u8_cell(7, vec![]);
    let a = u8_cell(1, vec![leaf.clone()]);
    let b = u8_cell(2, vec![leaf]);
    u8_cell(0, vec![a, b])
}

fn comment_cell() -> Cell {
    let mut b = BuilderData::new();
    b.append_u32(0).unwrap();
    b.append_raw(b"Hello TON!", 80).unwrap();
    b.into_cell().unwrap()
}

fn normalized_cell() -> Cell {
    let mut b = BuilderData::new();
    b.append_bits(0b10, 2).unwrap();           // ext_in_msg_info
    b.append_bits(0b00, 2).unwrap();           // addr_none
    b.append_bits(0b100, 3).unwrap();          // addr_std, no anycast
    b.append_i8(0).unwrap();
    b.append_raw(&hex::decode(ACCOUNT).unwrap(), 256).unwrap();
    b.append_bits(0, 4).unwrap();              // import_fee
    b.append_bit_zero().unwrap();              // no init
    b.append_bit_one().unwrap();               // body by reference
    b.checked_append_reference(comment_cell()).unwrap();
    b.into_cell().unwrap()
}

#[test]
fn test_empty_cell_boc() -> Status {
    let data = write_boc(&Cell::default())?;
    assert_eq!(hex::encode(&data), "b5ee9c72010101010002000000");
    assert_eq!(read_single_root_boc(&data)?, Cell::default());
    Ok(())
}

#[test]
fn test_known_bocs() -> Status {
    let body = comment_cell();
    assert_eq!(
        hex::encode(write_boc(&body)?),
        "b5ee9c7201010101001000001c0000000048656c6c6f20544f4e21"
    );

    let message = normalized_cell();
    assert_eq!(message.bit_length(), 277);
    assert_eq!(
        message.repr_hash().to_hex_string(),
        "b463942080869d75c24f3bd55d2b1891001c8cf5952df5540ad6acefcde5f35b"
    );
    assert_eq!(
        hex::encode(write_boc(&message)?),
        "b5ee9c72010102010036000145880107bfaaa5cc6e5368e5f9799188bd798cd22e04ab16d1d8ea4fc37480741e63500c01001c0000000048656c6c6f20544f4e21"
    );
    assert_eq!(
        write_boc_base64(&message)?,
        "te6cckEBAgEANgABRYgBB7+qpcxuU2jl+XmRiL15jNIuBKsW0djqT8N0gHQeY1AMAQAcAAAAAEhlbGxvIFRPTiFoSP/i"
    );
    let restored = read_single_root_boc_base64(
        "te6cckEBAgEANgABRYgBB7+qpcxuU2jl+XmRiL15jNIuBKsW0djqT8N0gHQeY1AMAQAcAAAAAEhlbGxvIFRPTiFoSP/i"
    )?;
    assert_eq!(restored, message);
    Ok(())
}

#[test]
fn test_shared_subtree_is_written_once() -> Status {
    let root = build_shared_tree();
    assert_eq!(
        root.repr_hash().to_hex_string(),
        "bc0c89359c02dabb237a4b23e7595fb3de0fd7936f573feae6b2e233bb14b63a"
    );
    let writer = BocWriter::with_root(&root)?;
    assert_eq!(writer.cells_count(), 4);
    assert_eq!(writer.references_count(), 4);
    let mut data = Vec::new();
    writer.write(&mut data)?;
    // root, b, a, leaf: parents always precede children
    assert_eq!(hex::encode(&data), "b5ee9c720101040100100002020002010102020301020103000207");

    let restored = read_single_root_boc(&data)?;
    assert_eq!(restored.repr_hash(), root.repr_hash());
    let a = restored.reference(0)?;
    let b = restored.reference(1)?;
    assert_eq!(a.reference(0)?, b.reference(0)?);
    Ok(())
}

#[test]
fn test_tree_of_cells_serialization_deserialization() -> Status {
    let mut cells_count = 0;
    let root = build_tree_with_params(0, 5, &mut cells_count)?;
    for include_index in [true, false] {
        for include_crc in [true, false] {
            let mut data = Vec::new();
            BocWriter::with_root(&root)?.write_ex(&mut data, include_index, include_crc)?;

            let result = BocReader::new().read(&mut Cursor::new(&data))?;
            assert_eq!(result.header.index_included, include_index);
            assert_eq!(result.header.has_crc, include_crc);
            assert_eq!(result.header.cells_count, cells_count as usize);
            assert_eq!(result.root, root);
            assert_eq!(result.root.repr_depth(), 4);
        }
    }
    Ok(())
}

#[test]
fn test_many_bocs_in_one_stream() -> Status {
    let mut data = Vec::new();
    let mut roots = vec!();

    for i in 0..10 {
        let root = u8_cell(i, vec![build_shared_tree()]);
        BocWriter::with_root(&root)?.write(&mut data)?;
        roots.push(root);
    }

    let mut cursor = Cursor::new(&data);
    for root in roots {
        let restored = BocReader::new().read(&mut cursor)?.root;
        assert_eq!(root, restored);
    }
    Ok(())
}

#[test]
fn test_number_of_bytes_to_fit() {
    assert_eq!(BocWriter::number_of_bytes_to_fit(0), 0);
    assert_eq!(BocWriter::number_of_bytes_to_fit(255), 1);
    assert_eq!(BocWriter::number_of_bytes_to_fit(256), 2);
    assert_eq!(BocWriter::number_of_bytes_to_fit(16000), 2);
    assert_eq!(BocWriter::number_of_bytes_to_fit(160000), 3);
    assert_eq!(BocWriter::number_of_bytes_to_fit(1073741823), 4);
}

#[test]
fn test_crc_check_value() {
    assert_eq!(CASTAGNOLI.checksum(b"123456789"), 0xe3069283);
}

#[test]
fn test_crc_mismatch() -> Status {
    let mut data = Vec::new();
    BocWriter::with_root(&build_shared_tree())?.write_ex(&mut data, false, true)?;
    let last = data.len() - 1;
    data[last] ^= 0x01;
    let err = read_single_root_boc(&data).unwrap_err();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::MalformedEncoding));
    Ok(())
}

#[test]
fn test_truncated_boc() -> Status {
    let data = write_boc(&normalized_cell())?;
    for len in 0..data.len() {
        let err = read_single_root_boc(&data[..len]).unwrap_err();
        assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::MalformedEncoding), "len {}", len);
    }
    Ok(())
}

#[test]
fn test_deprecated_indexed_magic() -> Status {
    let mut data = vec![0x68, 0xff, 0x65, 0xf3, 1, 1, 1, 1, 0, 2, 2, 0, 0];
    assert_eq!(read_single_root_boc(&data)?, Cell::default());

    data[..4].copy_from_slice(&0xacc3a728_u32.to_be_bytes());
    let crc = CASTAGNOLI.checksum(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    let result = BocReader::new().read(&mut Cursor::new(&data))?;
    assert!(result.header.has_crc);
    assert_eq!(result.root, Cell::default());
    Ok(())
}

#[test]
fn test_too_many_cells() -> Status {
    let root = build_shared_tree();
    let err = BocWriter::with_params(root.clone(), MAX_SAFE_DEPTH, 3).err().unwrap();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::TooManyCells));
    BocWriter::with_params(root.clone(), MAX_SAFE_DEPTH, 4)?;

    let data = write_boc(&root)?;
    let err = BocReader::new().set_max_cells(3).read(&mut Cursor::new(&data)).err().unwrap();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::TooManyCells));
    BocReader::new().set_max_cells(4).read(&mut Cursor::new(&data))?;
    Ok(())
}

#[test]
fn test_max_depth() -> Status {
    let root = build_shared_tree();
    assert!(BocWriter::with_params(root.clone(), 1, MAX_CELLS_COUNT).is_err());

    let data = write_boc(&root)?;
    let err = BocReader::new().set_max_cell_depth(1).read(&mut Cursor::new(&data)).err().unwrap();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::MalformedEncoding));
    BocReader::new().set_max_cell_depth(2).read(&mut Cursor::new(&data))?;
    Ok(())
}

#[test]
fn test_deepest_cell_roundtrip() -> Status {
    let mut root = Cell::default();
    for i in 0..MAX_SAFE_DEPTH {
        root = u8_cell(i as u8, vec![root]);
    }
    assert_eq!(root.repr_depth(), MAX_SAFE_DEPTH);
    let data = write_boc(&root)?;
    let restored = BocReader::new().set_max_cell_depth(u16::MAX).read(&mut Cursor::new(&data))?.root;
    assert_eq!(restored.repr_hash(), root.repr_hash());

    let err = BocWriter::with_params(root, MAX_SAFE_DEPTH - 1, MAX_CELLS_COUNT).err().unwrap();
    assert_eq!(ExceptionCode::from_error(&err), Some(ExceptionCode::CapacityExceeded));
    Ok(())
}

#[test]
fn test_bad_boc_index() -> Status {
    let mut data = Vec::new();
    BocWriter::with_root(&build_shared_tree())?.write_ex(&mut data, true, false)?;
    BocReader::new().read(&mut Cursor::new(&data))?;

    let ref_size = (data[4] & 0b111) as usize;
    let offset_size = data[5] as usize;
    let first_entry_end = 6 + 4 * ref_size + offset_size + offset_size;
    data[first_entry_end - 1] ^= 1;
    test_bad_boc(data);
    Ok(())
}

#[test]
fn test_trailing_bytes_are_left_unread() -> Status {
    let root = build_shared_tree();
    let mut data = write_boc(&root)?;
    let boc_len = data.len() as u64;
    data.extend_from_slice(&[0xde, 0xad]);

    let mut cursor = Cursor::new(&data);
    let result = BocReader::new().read(&mut cursor)?;
    assert_eq!(result.root, root);
    assert_eq!(cursor.position(), boc_len);
    assert_eq!(read_single_root_boc(&data)?, root);
    Ok(())
}

fn test_bad_boc(boc: Vec<u8>) {
    match BocReader::new().read(&mut Cursor::new(&boc)) {
        Ok(_) => panic!("BocReader::new().read must fail"),
        Err(e) => assert_eq!(
            ExceptionCode::from_error(&e), Some(ExceptionCode::MalformedEncoding), "{:?}", e
        ),
    }
}

#[test]
fn test_bad_boc_unknown_magic() {
    test_bad_boc(hex::decode("b5ee9c73010101010002000000").unwrap());
}

#[test]
fn test_bad_boc_too_many_roots() {
    let mut bb = Vec::new();
    bb.extend_from_slice(&0xb5ee9c72_u32.to_be_bytes()); // magic
    bb.push(0b0000_0100); // flags
    bb.push(1); // offset size
    bb.extend_from_slice(&u32::MAX.to_be_bytes()); // cells
    bb.extend_from_slice(&u32::MAX.to_be_bytes()); // roots
    bb.extend_from_slice(&0u32.to_be_bytes()); // absent count
    bb.push(0); // tot_cells_size

    test_bad_boc(bb);
}

#[test]
fn test_bad_boc_zero_cells() {
    test_bad_boc(base64_decode("aP9l8wIGAAAAAAAAAABo8w==").unwrap());

    let mut bb = Vec::new();
    bb.extend_from_slice(&0xb5ee9c72_u32.to_be_bytes()); // magic
    bb.push(0b0000_0100); // flags
    bb.push(1); // offset size
    bb.extend_from_slice(&0_u32.to_be_bytes()); // cells
    bb.extend_from_slice(&0_u32.to_be_bytes()); // roots
    bb.extend_from_slice(&0_u32.to_be_bytes()); // absent count
    bb.push(0); // tot_cells_size

    test_bad_boc(bb);
}

#[test]
fn test_bad_boc_exotic_cell() {
    test_bad_boc(vec![
        0xb5, 0xee, 0x9c, 0x72, // magic
        1,   // flags ref size
        1,   // offset size
        1,   // cells count
        1,   // roots count
        0,   // absent count
        2,   // total cell size
        0,   // root index
        8,   // d1 <-- exotic cell
        0,   // d2 <-- empty data
    ]);
}

#[test]
fn test_bad_boc_references() {
    // self reference
    test_bad_boc(hex::decode("b5ee9c72010102010005000100000000").unwrap());
    // reference past the last cell
    test_bad_boc(hex::decode("b5ee9c72010102010005000100020000").unwrap());
    // five references declared
    test_bad_boc(hex::decode("b5ee9c7201010201000800050001010101010000").unwrap());
}

#[test]
fn test_bad_boc_sizes() {
    // tot_cells_size can't fit three cells
    test_bad_boc(base64_decode("te6ccgEBAwEABgAAAAAAAAAAAAAAAAAAAAAA").unwrap());
    // root index out of range
    test_bad_boc(hex::decode("b5ee9c72010101010002010000").unwrap());
    // size mismatch
    test_bad_boc(hex::decode("b5ee9c720101010100030000000000").unwrap());
    // missing completion tag
    test_bad_boc(hex::decode("b5ee9c7201010101000300000100").unwrap());
}
