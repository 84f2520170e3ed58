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

use std::{
    collections::{HashMap, HashSet},
    io::{Cursor, Read, Seek, SeekFrom, Write},
    time::Instant,
};

use crc::{Crc, CRC_32_ISCSI, Digest};
const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

use crate::{
    cell::{self, Cell, DataCell, MAX_DATA_BYTES, MAX_REFERENCES_COUNT, MAX_SAFE_DEPTH},
    error, fail, wrappers::{base64_decode, base64_encode},
    ByteOrderRead, ExceptionCode, UInt256, Result, Status,
};

const BOC_INDEXED_TAG: u32 = 0x68ff65f3; // deprecated, read only
const BOC_INDEXED_CRC32_TAG: u32 = 0xacc3a728; // deprecated, read only
const BOC_GENERIC_TAG: u32 = 0xb5ee9c72;

// serialized_boc flags byte: has_idx | has_crc32c | has_cache_bits | flags:(## 2) | size:(## 3)
const HAS_INDEX_FLAG: u8 = 0b1000_0000;
const HAS_CRC_FLAG: u8 = 0b0100_0000;
const HAS_CACHE_BITS_FLAG: u8 = 0b0010_0000;
const RESERVED_FLAGS: u8 = 0b0001_1000;
const REF_SIZE_MASK: u8 = 0b0000_0111;

pub const MAX_CELLS_COUNT: usize = 1 << 20;

fn write_uint<T: Write>(dest: &mut T, value: usize, bytes: usize) -> Status {
    dest.write_all(&(value as u64).to_be_bytes()[8 - bytes..])?;
    Ok(())
}

/// Serializes a cell tree into a single-root bag of cells.
/// Shared subtrees are stored once, parents always precede their children and the root is cell #0.
pub struct BocWriter {
    cells: Vec<Cell>,
    indices: HashMap<UInt256, usize>,
    data_size: usize,
    references: usize,
    max_cells: usize,
}

pub fn write_boc(root_cell: &Cell) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    BocWriter::with_root(root_cell)?.write(&mut buf)?;
    Ok(buf)
}

/// Standard base64 of a bag of cells with CRC32-C, the form wallets exchange
pub fn write_boc_base64(root_cell: &Cell) -> Result<String> {
    let mut buf = Vec::new();
    BocWriter::with_root(root_cell)?.write_ex(&mut buf, false, true)?;
    Ok(base64_encode(buf))
}

impl BocWriter {
    pub fn with_root(root_cell: &Cell) -> Result<Self> {
        Self::with_params(root_cell.clone(), MAX_SAFE_DEPTH, MAX_CELLS_COUNT)
    }

    pub fn with_params(root_cell: Cell, max_depth: u16, max_cells: usize) -> Result<Self> {
        let depth = root_cell.repr_depth();
        if depth > max_depth {
            fail!(
                ExceptionCode::CapacityExceeded,
                "cell {:x} is too deep: {} > {}", root_cell.repr_hash(), depth, max_depth
            )
        }
        let mut writer = BocWriter {
            cells: Vec::new(),
            indices: HashMap::new(),
            data_size: 0,
            references: 0,
            max_cells,
        };
        writer.collect(root_cell)?;
        Ok(writer)
    }

    pub fn data_size(&self) -> usize {
        self.data_size
    }

    pub fn references_count(&self) -> usize {
        self.references
    }

    pub fn cells_count(&self) -> usize {
        self.cells.len()
    }

    pub fn write<T: Write>(self, dest: &mut T) -> Status {
        self.write_ex(dest, false, false)
    }

    pub fn write_ex<T: Write>(self, dest: &mut T, include_index: bool, include_crc: bool) -> Status {
        if include_crc {
            let mut crc_dest = IoCrcFilter::new(dest);
            self.write_body(&mut crc_dest, include_index, true)?;
            crc_dest.write_crc()
        } else {
            self.write_body(dest, include_index, false)
        }
    }

    fn write_body<T: Write>(&self, dest: &mut T, include_index: bool, include_crc: bool) -> Status {
        let cells_count = self.cells.len();
        let ref_size = Self::number_of_bytes_to_fit(cells_count);
        let total_cells_size = self.data_size + self.references * ref_size;
        let offset_size = Self::number_of_bytes_to_fit(total_cells_size);
        debug_assert!(ref_size <= 4 && offset_size <= 8);

        let mut flags = ref_size as u8;
        if include_index {
            flags |= HAS_INDEX_FLAG;
        }
        if include_crc {
            flags |= HAS_CRC_FLAG;
        }
        dest.write_all(&BOC_GENERIC_TAG.to_be_bytes())?;
        dest.write_all(&[flags, offset_size as u8])?;
        write_uint(dest, cells_count, ref_size)?;
        write_uint(dest, 1, ref_size)?; // roots
        write_uint(dest, 0, ref_size)?; // absent
        write_uint(dest, total_cells_size, offset_size)?;
        write_uint(dest, 0, ref_size)?; // root index

        if include_index {
            let mut offset = 0;
            for cell in &self.cells {
                offset += cell.raw_data().len() + ref_size * cell.references_count();
                write_uint(dest, offset, offset_size)?;
            }
        }

        for (index, cell) in self.cells.iter().enumerate() {
            dest.write_all(cell.raw_data())?;
            for child in cell.references() {
                let child_index = match self.indices.get(&child.repr_hash()) {
                    Some(child_index) => *child_index,
                    None => fail!("child {:x} of cell #{} was not collected", child.repr_hash(), index)
                };
                debug_assert!(child_index > index);
                write_uint(dest, child_index, ref_size)?;
            }
        }
        Ok(())
    }

    // Depth-first walk that keeps the post-order, its reverse is the serialization order
    fn collect(&mut self, root: Cell) -> Status {
        let mut visited = HashSet::new();
        let mut post_order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((cell, children_done)) = stack.pop() {
            if children_done {
                post_order.push(cell);
                continue;
            }
            if !visited.insert(cell.repr_hash()) {
                continue;
            }
            self.count_cell(&cell, visited.len())?;
            stack.push((cell.clone(), true));
            for child in cell.references().iter().rev() {
                if !visited.contains(&child.repr_hash()) {
                    stack.push((child.clone(), false));
                }
            }
        }
        post_order.reverse();
        self.indices = post_order.iter().enumerate().map(|(index, cell)| (cell.repr_hash(), index)).collect();
        self.cells = post_order;
        Ok(())
    }

    fn count_cell(&mut self, cell: &Cell, cells_count: usize) -> Status {
        if cells_count > self.max_cells {
            fail!(ExceptionCode::TooManyCells, "bag of cells exceeds {} cells", self.max_cells)
        }
        self.data_size += cell.raw_data().len();
        self.references += cell.references_count();
        Ok(())
    }

    fn number_of_bytes_to_fit(value: usize) -> usize {
        (usize::BITS - value.leading_zeros()) as usize / 8
            + ((usize::BITS - value.leading_zeros()) % 8 != 0) as usize
    }
}

struct RawCell {
    data: Vec<u8>,
    refs: [usize; MAX_REFERENCES_COUNT],
}

#[derive(Debug)]
pub struct BocHeader {
    pub magic: u32,
    pub ref_size: usize,
    pub index_included: bool,
    pub cells_count: usize,
    pub offset_size: usize,
    pub has_crc: bool,
    pub has_cache_bits: bool,
    pub root_index: usize,
    pub tot_cells_size: usize,
}

impl BocHeader {
    fn read_from<T: Read>(src: &mut T) -> Result<Self> {
        let magic = src.read_be_u32()?;
        let flags = src.read_byte()?;
        let (ref_size, index_included, has_crc, has_cache_bits) = match magic {
            BOC_INDEXED_TAG => (flags as usize, true, false, false),
            BOC_INDEXED_CRC32_TAG => (flags as usize, true, true, false),
            BOC_GENERIC_TAG => {
                if flags & RESERVED_FLAGS != 0 {
                    fail!("reserved flags {:#04x} are set", flags & RESERVED_FLAGS)
                }
                (
                    (flags & REF_SIZE_MASK) as usize,
                    flags & HAS_INDEX_FLAG != 0,
                    flags & HAS_CRC_FLAG != 0,
                    flags & HAS_CACHE_BITS_FLAG != 0,
                )
            }
            _ => fail!("unknown bag of cells magic {:#010x}", magic)
        };
        if has_cache_bits && !index_included {
            fail!("cache bits require an index")
        }
        if !(1..=4).contains(&ref_size) {
            fail!("reference size must be in 1..=4 bytes, got {}", ref_size)
        }
        let offset_size = src.read_byte()? as usize;
        if !(1..=8).contains(&offset_size) {
            fail!("offset size must be in 1..=8 bytes, got {}", offset_size)
        }

        let cells_count = src.read_be_uint(ref_size)?;
        let roots_count = src.read_be_uint(ref_size)?;
        let absent_count = src.read_be_uint(ref_size)?;
        if cells_count == 0 {
            fail!("bag of cells holds no cells")
        }
        if roots_count != 1 {
            fail!("exactly one root is supported, found {}", roots_count)
        }
        if absent_count != 0 {
            fail!("absent cells are not supported")
        }

        let tot_cells_size = src.read_be_uint(offset_size)?;
        // every cell but the root is referenced at least once
        let min_size = cells_count.saturating_mul(2 + ref_size) - ref_size;
        let max_size = cells_count.saturating_mul(2 + MAX_DATA_BYTES + MAX_REFERENCES_COUNT * ref_size);
        if tot_cells_size < min_size || tot_cells_size > max_size {
            fail!("cells size {} does not fit {} cells", tot_cells_size, cells_count)
        }

        // the deprecated formats have no root list, their root is the first cell
        let root_index = match magic {
            BOC_GENERIC_TAG => src.read_be_uint(ref_size)?,
            _ => 0
        };
        if root_index >= cells_count {
            fail!("root index {} is out of {} cells", root_index, cells_count)
        }

        Ok(BocHeader {
            magic,
            ref_size,
            index_included,
            cells_count,
            offset_size,
            has_crc,
            has_cache_bits,
            root_index,
            tot_cells_size,
        })
    }

    fn index_size(&self) -> usize {
        if self.index_included { self.cells_count * self.offset_size } else { 0 }
    }
}

pub struct BocReaderResult {
    pub root: Cell,
    pub header: BocHeader,
}

/// Deserializes a single-root bag of cells
pub struct BocReader {
    max_depth: u16,
    max_cells: usize,
}

impl Default for BocReader {
    fn default() -> Self {
        Self {
            max_depth: MAX_SAFE_DEPTH,
            max_cells: MAX_CELLS_COUNT,
        }
    }
}

/// Reads the bag of cells at the start of `data`, bytes after its declared end are left unread
pub fn read_single_root_boc(data: impl AsRef<[u8]>) -> Result<Cell> {
    let mut cursor = Cursor::new(data);
    Ok(BocReader::new().read(&mut cursor)?.root)
}

pub fn read_single_root_boc_base64(data: &str) -> Result<Cell> {
    let bytes = base64_decode(data.trim()).map_err(|err| err.context(ExceptionCode::MalformedEncoding))?;
    read_single_root_boc(bytes)
}

impl BocReader {
    pub fn new() -> Self { Self::default() }

    /// Cells are never deeper than `MAX_SAFE_DEPTH`, larger limits are clamped
    pub fn set_max_cell_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth.min(MAX_SAFE_DEPTH);
        self
    }

    pub fn set_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// Consumes exactly the declared bag of cells from `src`, so several of them can be read from one stream.
    /// Every failure without a more specific code is reported as `MalformedEncoding`
    pub fn read<T: Read + Seek>(self, src: &mut T) -> Result<BocReaderResult> {
        self.read_impl(src).map_err(|err| match ExceptionCode::from_error(&err) {
            Some(_) => err,
            None => err.context(ExceptionCode::MalformedEncoding)
        })
    }

    fn read_impl<T: Read + Seek>(self, src: &mut T) -> Result<BocReaderResult> {
        let now = Instant::now();
        let start = src.stream_position()?;
        let available = src.seek(SeekFrom::End(0))? - start;
        src.seek(SeekFrom::Start(start))?;

        let mut src = IoCrcFilter::new(src);
        let header = BocHeader::read_from(&mut src)?;
        if header.cells_count > self.max_cells {
            fail!(ExceptionCode::TooManyCells, "bag of {} cells exceeds {}", header.cells_count, self.max_cells)
        }
        let header_len = src.stream_position()? - start;
        let expected = header_len as usize + header.index_size() + header.tot_cells_size + 4 * header.has_crc as usize;
        if (available as usize) < expected {
            fail!("bag of cells is truncated: {} bytes of {}", available, expected)
        }

        let mut index = vec![0; header.index_size()];
        src.read_exact(&mut index)?;
        let mut cells_data = vec![0; header.tot_cells_size];
        src.read_exact(&mut cells_data)?;
        if header.has_crc {
            src.check_crc()?;
        }

        let raw_cells = Self::parse_raw_cells(&header, &index, &cells_data)?;
        let parsing_time = now.elapsed().as_millis();
        let root = self.build_cells(&header, raw_cells)?;

        log::trace!(
            "TIME read_single_root_boc: {}ms (parsing: {}ms), {} cells",
            now.elapsed().as_millis(), parsing_time, header.cells_count
        );
        Ok(BocReaderResult { root, header })
    }

    // `index` is empty or holds the end offset of every cell, shifted left by one with cache bits
    fn parse_raw_cells(header: &BocHeader, mut index: &[u8], mut data: &[u8]) -> Result<Vec<RawCell>> {
        let mut raw_cells = Vec::with_capacity(header.cells_count);
        for cell_index in 0..header.cells_count {
            if data.len() < 2 {
                fail!("cell #{} is cut off", cell_index)
            }
            let cell_len = cell::full_len(data);
            let refs_count = cell::refs_count(data);
            let refs_len = refs_count * header.ref_size;
            if data.len() < cell_len + refs_len {
                fail!("cell #{} is cut off", cell_index)
            }
            let (buf, rest) = data.split_at(cell_len);
            cell::check_cell_buf(buf)?;
            let (mut refs_data, rest) = rest.split_at(refs_len);

            let mut refs = [0; MAX_REFERENCES_COUNT];
            for reference in refs.iter_mut().take(refs_count) {
                let child = refs_data.read_be_uint(header.ref_size)?;
                // children go strictly after their parent, so loops are impossible
                if child <= cell_index || child >= header.cells_count {
                    fail!("cell #{} refers to #{} of {}", cell_index, child, header.cells_count)
                }
                *reference = child;
            }
            raw_cells.push(RawCell { data: buf.to_vec(), refs });
            data = rest;

            if !index.is_empty() {
                let mut end = index.read_be_uint(header.offset_size)?;
                if header.has_cache_bits {
                    end >>= 1;
                }
                let actual = header.tot_cells_size - data.len();
                if end != actual {
                    fail!("index puts the end of cell #{} at {}, actual {}", cell_index, end, actual)
                }
            }
        }
        if !data.is_empty() {
            fail!("{} bytes left after the last cell", data.len())
        }
        Ok(raw_cells)
    }

    // from the leaves up, every child is built before its parents
    fn build_cells(&self, header: &BocHeader, mut raw_cells: Vec<RawCell>) -> Result<Cell> {
        let mut cells: Vec<Option<Cell>> = vec![None; header.cells_count];
        while let Some(raw_cell) = raw_cells.pop() {
            let cell_index = raw_cells.len();
            let refs = raw_cell.refs[..cell::refs_count(&raw_cell.data)]
                .iter()
                .map(|child| cells[*child].clone().ok_or_else(|| error!("cell #{} is missing", child)))
                .collect::<Result<Vec<_>>>()?;
            let cell = DataCell::with_raw_data(refs, raw_cell.data, Some(self.max_depth))?;
            cells[cell_index] = Some(Cell::from(cell));
        }
        cells.swap_remove(header.root_index)
            .ok_or_else(|| error!("root cell #{} is missing", header.root_index))
    }
}

/// Passes bytes through to the wrapped reader or writer and keeps their CRC32-C
struct IoCrcFilter<'a, T> {
    inner: &'a mut T,
    digest: Digest<'static, u32>,
}

impl<'a, T> IoCrcFilter<'a, T> {
    fn new(inner: &'a mut T) -> Self {
        Self { inner, digest: CASTAGNOLI.digest() }
    }
}

impl<T: Write> IoCrcFilter<'_, T> {
    fn write_crc(self) -> Status {
        self.inner.write_all(&self.digest.finalize().to_le_bytes())?;
        Ok(())
    }
}

impl<T: Read> IoCrcFilter<'_, T> {
    fn check_crc(self) -> Status {
        let expected = self.digest.finalize();
        let stored = self.inner.read_le_u32()?;
        if stored != expected {
            fail!("crc32c mismatch: stored {:#010x}, computed {:#010x}", stored, expected)
        }
        Ok(())
    }
}

impl<T: Seek> IoCrcFilter<'_, T> {
    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }
}

impl<T: Write> Write for IoCrcFilter<'_, T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.digest.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Read> Read for IoCrcFilter<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.digest.update(&buf[..read]);
        Ok(read)
    }
}

#[cfg(test)]
#[path = "tests/test_boc.rs"]
mod tests;
