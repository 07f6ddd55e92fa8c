/*!
Finite-state transducer over byte-labeled arcs.

Accepting paths carry an output combined arc by arc through an
[`Outputs`] algebra. The term dictionary is the main client: input is
the term bytes, output is the serialized term metadata.

Nodes are serialized with their arcs in reverse byte order, so readers
scan arcs forward by walking a decrementing byte cursor. Three node
layouts exist: a linear arc list, a fixed-stride array binary-searched
by label, and a direct-addressed array with gap sentinels for dense
label ranges.
*/

mod builder;
mod bytes_store;
mod outputs;

pub use self::builder::Builder;
pub use self::bytes_store::{BytesStore, ForwardBytesReader, ReverseBytesReader};
pub use self::outputs::{ByteSequenceOutputs, NoOutputs, Outputs, PairOutputs, PositiveIntOutputs};

use std::io;
use std::io::{Read, Write};

use crate::common::{read_vint, write_vint};
use crate::directory::{check_header, write_header};
use crate::Result;

pub(crate) const BIT_FINAL_ARC: u8 = 1 << 0;
pub(crate) const BIT_LAST_ARC: u8 = 1 << 1;
pub(crate) const BIT_TARGET_NEXT: u8 = 1 << 2;
pub(crate) const BIT_STOP_NODE: u8 = 1 << 3;
pub(crate) const BIT_ARC_HAS_OUTPUT: u8 = 1 << 4;
pub(crate) const BIT_ARC_HAS_FINAL_OUTPUT: u8 = 1 << 5;
pub(crate) const BIT_MISSING_ARC: u8 = 1 << 6;

/// Header byte of a binary-searchable fixed-stride arc array.
pub(crate) const ARCS_AS_ARRAY_PACKED: u8 = BIT_ARC_HAS_FINAL_OUTPUT;
/// Header byte of a direct-addressed arc array with gap sentinels.
pub(crate) const ARCS_AS_ARRAY_WITH_GAPS: u8 = BIT_MISSING_ARC;

pub(crate) const FIXED_ARRAY_SHALLOW_DISTANCE: usize = 3;
pub(crate) const FIXED_ARRAY_NUM_ARCS_SHALLOW: usize = 5;
pub(crate) const FIXED_ARRAY_NUM_ARCS_DEEP: usize = 10;
pub(crate) const DIRECT_ARC_LOAD_FACTOR: usize = 4;

/// Virtual label of the arc taken when a path ends at a final node.
pub const END_LABEL: i32 = -1;

pub(crate) const FINAL_END_NODE: i64 = -1;
pub(crate) const NON_FINAL_END_NODE: i64 = 0;

const FST_CODEC_NAME: &str = "FST";
const VERSION_CURRENT: i32 = 4;

/// Sentinel `arc_idx` marking a direct-addressed array cursor.
const DIRECT_ARC_IDX: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputType {
    Byte1,
    Byte2,
    Byte4,
}

/// One decoded arc, doubling as a cursor into its node's arc list.
#[derive(Debug, Clone)]
pub struct Arc<V> {
    pub label: i32,
    pub output: V,
    pub target: i64,
    pub next_final_output: V,
    flags: u8,
    next_arc: i64,
    pos_arcs_start: i64,
    bytes_per_arc: usize,
    arc_idx: i32,
    num_arcs: usize,
}

impl<V> Arc<V> {
    fn flag(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }

    pub fn is_last(&self) -> bool {
        self.flag(BIT_LAST_ARC)
    }

    pub fn is_final(&self) -> bool {
        self.flag(BIT_FINAL_ARC)
    }

    /// True when the arc's target node has outgoing arcs of its own.
    pub fn target_has_arcs(&self) -> bool {
        self.target > 0
    }
}

pub struct Fst<O: Outputs> {
    input_type: InputType,
    empty_output: Option<O::Value>,
    bytes: Vec<u8>,
    start_node: i64,
    outputs: O,
    cached_root_arcs: Vec<Option<Arc<O::Value>>>,
}

impl<O: Outputs> Fst<O> {
    pub(crate) fn from_parts(
        input_type: InputType,
        outputs: O,
        bytes: Vec<u8>,
        start_node: i64,
        empty_output: Option<O::Value>,
    ) -> Fst<O> {
        let mut fst = Fst {
            input_type,
            empty_output,
            bytes,
            start_node,
            outputs,
            cached_root_arcs: Vec::new(),
        };
        fst.cache_root_arcs();
        fst
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn empty_output(&self) -> Option<&O::Value> {
        self.empty_output.as_ref()
    }

    /// Total serialized size of the automaton body.
    pub fn num_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes_reader(&self) -> ReverseBytesReader<'_> {
        ReverseBytesReader::new(&self.bytes)
    }

    /// Caches root arcs by label when the cache stays under 20% of the
    /// FST body.
    fn cache_root_arcs(&mut self) {
        let mut arcs: Vec<Option<Arc<O::Value>>> = vec![None; 0x80];
        let mut count = 0usize;
        let first = self.first_arc();
        if first.target_has_arcs() {
            let mut reader = ReverseBytesReader::new(&self.bytes);
            let mut arc = self.read_first_real_target_arc(first.target, &mut reader);
            loop {
                debug_assert!(arc.label != END_LABEL);
                if (arc.label as usize) < arcs.len() {
                    arcs[arc.label as usize] = Some(arc.clone());
                } else {
                    break;
                }
                if arc.is_last() {
                    break;
                }
                arc = self.read_next_real_arc(arc, &mut reader);
                count += 1;
            }
        }
        let cache_ram = count * std::mem::size_of::<Arc<O::Value>>();
        if count >= FIXED_ARRAY_NUM_ARCS_SHALLOW && cache_ram < self.bytes.len() / 5 {
            self.cached_root_arcs = arcs;
        }
    }

    fn write_label(bytes: &mut BytesStore, input_type: InputType, label: i32) {
        debug_assert!(label >= 0);
        match input_type {
            InputType::Byte1 => {
                debug_assert!(label <= 0xFF);
                bytes.write_byte(label as u8);
            }
            InputType::Byte2 => {
                debug_assert!(label <= 0xFFFF);
                bytes.write_byte(label as u8);
                bytes.write_byte((label >> 8) as u8);
            }
            InputType::Byte4 => {
                bytes.write_vint(label as u64);
            }
        }
    }

    fn read_label(&self, reader: &mut ReverseBytesReader<'_>) -> i32 {
        match self.input_type {
            InputType::Byte1 => i32::from(reader.read_byte()),
            InputType::Byte2 => {
                let low = i32::from(reader.read_byte());
                let high = i32::from(reader.read_byte());
                low | (high << 8)
            }
            InputType::Byte4 => reader.read_vint() as i32,
        }
    }

    /// The pseudo-arc pointing at the root node.
    pub fn first_arc(&self) -> Arc<O::Value> {
        let no_output = self.outputs.no_output();
        let (flags, next_final_output) = match &self.empty_output {
            Some(empty) => {
                let mut flags = BIT_FINAL_ARC | BIT_LAST_ARC;
                if !self.outputs.is_no_output(empty) {
                    flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
                (flags, empty.clone())
            }
            None => (BIT_LAST_ARC, no_output.clone()),
        };
        Arc {
            label: 0,
            output: no_output,
            target: self.start_node,
            next_final_output,
            flags,
            next_arc: 0,
            pos_arcs_start: 0,
            bytes_per_arc: 0,
            arc_idx: 0,
            num_arcs: 0,
        }
    }

    /// First arc leaving `follow`'s target. A final target yields the
    /// virtual `END_LABEL` arc first.
    pub fn read_first_target_arc(
        &self,
        follow: &Arc<O::Value>,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Arc<O::Value> {
        if follow.is_final() {
            let mut flags = BIT_FINAL_ARC;
            let next_arc = if follow.target <= 0 {
                flags |= BIT_LAST_ARC;
                0
            } else {
                follow.target
            };
            return Arc {
                label: END_LABEL,
                output: follow.next_final_output.clone(),
                target: FINAL_END_NODE,
                next_final_output: self.outputs.no_output(),
                flags,
                next_arc,
                pos_arcs_start: 0,
                bytes_per_arc: 0,
                arc_idx: 0,
                num_arcs: 0,
            };
        }
        self.read_first_real_target_arc(follow.target, reader)
    }

    fn read_first_real_target_arc(
        &self,
        node_address: i64,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Arc<O::Value> {
        reader.set_position(node_address);
        let header = reader.read_byte();
        let mut arc = Arc {
            label: 0,
            output: self.outputs.no_output(),
            target: 0,
            next_final_output: self.outputs.no_output(),
            flags: 0,
            next_arc: node_address,
            pos_arcs_start: 0,
            bytes_per_arc: 0,
            arc_idx: 0,
            num_arcs: 0,
        };
        if header == ARCS_AS_ARRAY_PACKED || header == ARCS_AS_ARRAY_WITH_GAPS {
            arc.num_arcs = reader.read_vint() as usize;
            arc.bytes_per_arc = reader.read_vint() as usize;
            arc.arc_idx = if header == ARCS_AS_ARRAY_PACKED {
                -1
            } else {
                DIRECT_ARC_IDX
            };
            let pos = reader.position();
            arc.pos_arcs_start = pos;
            arc.next_arc = pos;
        }
        self.read_next_real_arc(arc, reader)
    }

    /// Next arc out of the same node; handles the virtual final arc.
    pub fn read_next_arc(
        &self,
        arc: Arc<O::Value>,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Arc<O::Value> {
        if arc.label == END_LABEL {
            assert!(arc.next_arc > 0, "cannot read past the last arc");
            return self.read_first_real_target_arc(arc.next_arc, reader);
        }
        self.read_next_real_arc(arc, reader)
    }

    fn read_next_real_arc(
        &self,
        mut arc: Arc<O::Value>,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Arc<O::Value> {
        if arc.bytes_per_arc != 0 {
            if arc.arc_idx > DIRECT_ARC_IDX {
                // binary-searchable array: step by index
                arc.arc_idx += 1;
                debug_assert!((arc.arc_idx as usize) < arc.num_arcs);
                reader
                    .set_position(arc.pos_arcs_start - i64::from(arc.arc_idx) * arc.bytes_per_arc as i64);
                arc.flags = reader.read_byte();
            } else {
                // direct-addressed array: step by slot, skipping gaps
                debug_assert!(
                    arc.next_arc <= arc.pos_arcs_start
                        && arc.next_arc
                            > arc.pos_arcs_start - (arc.num_arcs * arc.bytes_per_arc) as i64
                );
                reader.set_position(arc.next_arc);
                arc.flags = reader.read_byte();
                while arc.flags & BIT_MISSING_ARC != 0 {
                    arc.next_arc -= arc.bytes_per_arc as i64;
                    reader.skip_bytes(arc.bytes_per_arc as i64 - 1);
                    arc.flags = reader.read_byte();
                }
            }
        } else {
            reader.set_position(arc.next_arc);
            arc.flags = reader.read_byte();
        }
        self.read_arc_body(arc, reader)
    }

    fn read_arc_body(
        &self,
        mut arc: Arc<O::Value>,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Arc<O::Value> {
        arc.label = self.read_label(reader);
        arc.output = if arc.flag(BIT_ARC_HAS_OUTPUT) {
            self.outputs.read(reader)
        } else {
            self.outputs.no_output()
        };
        arc.next_final_output = if arc.flag(BIT_ARC_HAS_FINAL_OUTPUT) {
            self.outputs.read_final(reader)
        } else {
            self.outputs.no_output()
        };
        if arc.flag(BIT_STOP_NODE) {
            arc.target = if arc.flag(BIT_FINAL_ARC) {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            };
            if arc.bytes_per_arc == 0 {
                arc.next_arc = reader.position();
            } else {
                arc.next_arc -= arc.bytes_per_arc as i64;
            }
        } else if arc.flag(BIT_TARGET_NEXT) {
            arc.next_arc = reader.position();
            if !arc.flag(BIT_LAST_ARC) {
                if arc.bytes_per_arc == 0 {
                    self.seek_to_next_node(reader);
                } else {
                    reader.set_position(arc.pos_arcs_start);
                    reader.skip_bytes((arc.bytes_per_arc * arc.num_arcs) as i64);
                }
            }
            arc.target = reader.position();
        } else {
            arc.target = reader.read_vint() as i64;
            if arc.bytes_per_arc > 0 && arc.arc_idx == DIRECT_ARC_IDX {
                arc.next_arc -= arc.bytes_per_arc as i64;
            } else {
                arc.next_arc = reader.position();
            }
        }
        arc
    }

    fn seek_to_next_node(&self, reader: &mut ReverseBytesReader<'_>) {
        loop {
            let flags = reader.read_byte();
            self.read_label(reader);
            if flags & BIT_ARC_HAS_OUTPUT != 0 {
                self.outputs.skip(reader);
            }
            if flags & BIT_ARC_HAS_FINAL_OUTPUT != 0 {
                self.outputs.skip_final(reader);
            }
            if flags & BIT_STOP_NODE == 0 && flags & BIT_TARGET_NEXT == 0 {
                reader.read_vint();
            }
            if flags & BIT_LAST_ARC != 0 {
                return;
            }
        }
    }

    /// Finds the arc labeled `label` out of `follow`'s target, or
    /// `None` if there is no such transition.
    pub fn find_target_arc(
        &self,
        label: i32,
        follow: &Arc<O::Value>,
        reader: &mut ReverseBytesReader<'_>,
    ) -> Option<Arc<O::Value>> {
        if label == END_LABEL {
            if !follow.is_final() {
                return None;
            }
            let mut flags = 0u8;
            let mut next_arc = 0i64;
            if follow.target <= 0 {
                flags = BIT_LAST_ARC;
            } else {
                next_arc = follow.target;
            }
            return Some(Arc {
                label: END_LABEL,
                output: follow.next_final_output.clone(),
                target: FINAL_END_NODE,
                next_final_output: self.outputs.no_output(),
                flags,
                next_arc,
                pos_arcs_start: 0,
                bytes_per_arc: 0,
                arc_idx: 0,
                num_arcs: 0,
            });
        }

        if !self.cached_root_arcs.is_empty()
            && follow.target == self.start_node
            && (label as usize) < self.cached_root_arcs.len()
        {
            return self.cached_root_arcs[label as usize].clone();
        }

        if !follow.target_has_arcs() {
            return None;
        }

        reader.set_position(follow.target);
        let header = reader.read_byte();

        if header == ARCS_AS_ARRAY_WITH_GAPS {
            let label_range = reader.read_vint() as usize;
            let bytes_per_arc = reader.read_vint() as usize;
            let pos_arcs_start = reader.position();
            // peek at the first slot's label to anchor the range
            reader.skip_bytes(1);
            let first_label = self.read_label(reader);
            let arc_pos = i64::from(label) - i64::from(first_label);
            let next_arc = if arc_pos == 0 {
                pos_arcs_start
            } else if arc_pos > 0 {
                if arc_pos >= label_range as i64 {
                    return None;
                }
                reader.set_position(pos_arcs_start - bytes_per_arc as i64 * arc_pos);
                let flags = reader.read_byte();
                if flags & BIT_MISSING_ARC != 0 {
                    return None;
                }
                reader.position() + 1
            } else {
                return None;
            };
            let arc = Arc {
                label: 0,
                output: self.outputs.no_output(),
                target: 0,
                next_final_output: self.outputs.no_output(),
                flags: 0,
                next_arc,
                pos_arcs_start,
                bytes_per_arc,
                arc_idx: DIRECT_ARC_IDX,
                num_arcs: label_range,
            };
            return Some(self.read_next_real_arc(arc, reader));
        }

        if header == ARCS_AS_ARRAY_PACKED {
            let num_arcs = reader.read_vint() as usize;
            let bytes_per_arc = reader.read_vint() as usize;
            let pos_arcs_start = reader.position();
            let (mut low, mut high) = (0i64, num_arcs as i64 - 1);
            while low <= high {
                let mid = (low + high) >> 1;
                reader.set_position(pos_arcs_start);
                reader.skip_bytes(bytes_per_arc as i64 * mid + 1);
                let mid_label = self.read_label(reader);
                if mid_label < label {
                    low = mid + 1;
                } else if mid_label > label {
                    high = mid - 1;
                } else {
                    let arc = Arc {
                        label: 0,
                        output: self.outputs.no_output(),
                        target: 0,
                        next_final_output: self.outputs.no_output(),
                        flags: 0,
                        next_arc: 0,
                        pos_arcs_start,
                        bytes_per_arc,
                        arc_idx: mid as i32 - 1,
                        num_arcs,
                    };
                    return Some(self.read_next_real_arc(arc, reader));
                }
            }
            return None;
        }

        // linear scan over an arc list
        let mut arc = self.read_first_real_target_arc(follow.target, reader);
        loop {
            if arc.label == label {
                return Some(arc);
            } else if arc.label > label || arc.is_last() {
                return None;
            }
            arc = self.read_next_real_arc(arc, reader);
        }
    }

    /// Accepts `input` and returns its combined output, or `None`.
    pub fn get(&self, input: &[u8]) -> Option<O::Value> {
        let mut reader = self.bytes_reader();
        let mut arc = self.first_arc();
        let mut output = self.outputs.no_output();
        for &byte in input {
            arc = get!(self.find_target_arc(i32::from(byte), &arc, &mut reader));
            if !self.outputs.is_no_output(&arc.output) {
                output = self.outputs.add(&output, &arc.output);
            }
        }
        if arc.is_final() {
            Some(self.outputs.add(&output, &arc.next_final_output))
        } else {
            None
        }
    }

    /// Serializes `header · empty output · input type · start node ·
    /// body length · body`.
    pub fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_header(out, FST_CODEC_NAME, VERSION_CURRENT)?;
        match &self.empty_output {
            Some(empty) => {
                out.write_all(&[1])?;
                let mut empty_bytes = Vec::new();
                self.outputs.write_final(empty, &mut empty_bytes)?;
                empty_bytes.reverse();
                write_vint(empty_bytes.len() as u64, out)?;
                out.write_all(&empty_bytes)?;
            }
            None => out.write_all(&[0])?,
        }
        let type_byte = match self.input_type {
            InputType::Byte1 => 0u8,
            InputType::Byte2 => 1u8,
            InputType::Byte4 => 2u8,
        };
        out.write_all(&[type_byte])?;
        write_vint(self.start_node as u64, out)?;
        write_vint(self.bytes.len() as u64, out)?;
        out.write_all(&self.bytes)
    }

    pub fn load<R: Read>(reader: &mut R, outputs: O, filename: &str) -> Result<Fst<O>> {
        check_header(reader, filename, FST_CODEC_NAME, VERSION_CURRENT, VERSION_CURRENT)?;
        let mut flag = [0u8; 1];
        reader.read_exact(&mut flag)?;
        let empty_output = if flag[0] == 1 {
            let num_bytes = read_vint(reader)? as usize;
            let mut empty_bytes = vec![0u8; num_bytes];
            reader.read_exact(&mut empty_bytes)?;
            let mut empty_reader = ReverseBytesReader::new(&empty_bytes);
            if num_bytes > 0 {
                empty_reader.set_position(num_bytes as i64 - 1);
            }
            Some(outputs.read_final(&mut empty_reader))
        } else {
            None
        };
        let mut type_byte = [0u8; 1];
        reader.read_exact(&mut type_byte)?;
        let input_type = match type_byte[0] {
            0 => InputType::Byte1,
            1 => InputType::Byte2,
            2 => InputType::Byte4,
            other => {
                return Err(crate::Error::corruption(
                    filename,
                    format!("invalid FST input type {}", other),
                ))
            }
        };
        let start_node = read_vint(reader)? as i64;
        let num_bytes = read_vint(reader)? as usize;
        let mut bytes = vec![0u8; num_bytes];
        reader.read_exact(&mut bytes)?;
        Ok(Fst::from_parts(input_type, outputs, bytes, start_node, empty_output))
    }
}

#[cfg(test)]
mod tests {
    use super::{Builder, ByteSequenceOutputs, Fst, InputType, PositiveIntOutputs};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn build_int_fst(pairs: &[(&[u8], u64)]) -> Fst<PositiveIntOutputs> {
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (key, value) in pairs {
            builder.add(key, *value).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn test_empty_fst() {
        let builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        let fst = builder.finish().unwrap();
        assert_eq!(fst.get(b""), None);
        assert_eq!(fst.get(b"anything"), None);
    }

    #[test]
    fn test_empty_string_only() {
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        builder.add(b"", 42).unwrap();
        let fst = builder.finish().unwrap();
        assert_eq!(fst.get(b""), Some(42));
        assert_eq!(fst.get(b"a"), None);
    }

    #[test]
    fn test_simple_lookup() {
        let fst = build_int_fst(&[
            (b"cat", 5),
            (b"cats", 7),
            (b"dog", 12),
            (b"dogs", 13),
            (b"dot", 1),
        ]);
        assert_eq!(fst.get(b"cat"), Some(5));
        assert_eq!(fst.get(b"cats"), Some(7));
        assert_eq!(fst.get(b"dog"), Some(12));
        assert_eq!(fst.get(b"dogs"), Some(13));
        assert_eq!(fst.get(b"dot"), Some(1));
        assert_eq!(fst.get(b"ca"), None);
        assert_eq!(fst.get(b"catsup"), None);
        assert_eq!(fst.get(b"do"), None);
        assert_eq!(fst.get(b""), None);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        builder.add(b"beta", 1).unwrap();
        assert!(builder.add(b"alpha", 2).is_err());
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        builder.add(b"same", 1).unwrap();
        assert!(builder.add(b"same", 2).is_err());
    }

    #[test]
    fn test_dense_node_uses_direct_addressing() {
        // 26 consecutive labels under the root triggers the
        // direct-addressed array form.
        let pairs: Vec<(Vec<u8>, u64)> =
            (b'a'..=b'z').map(|b| (vec![b], u64::from(b))).collect();
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (key, value) in &pairs {
            builder.add(key, *value).unwrap();
        }
        let fst = builder.finish().unwrap();
        for (key, value) in &pairs {
            assert_eq!(fst.get(key), Some(*value));
        }
        assert_eq!(fst.get(b"A"), None);
        assert_eq!(fst.get(b"{"), None);
    }

    #[test]
    fn test_sparse_wide_node_uses_binary_search() {
        // labels far apart: packed array form with binary search.
        let pairs: Vec<(Vec<u8>, u64)> = (0..12u8)
            .map(|i| (vec![i * 20, b'x'], u64::from(i) + 1))
            .collect();
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (key, value) in &pairs {
            builder.add(key, *value).unwrap();
        }
        let fst = builder.finish().unwrap();
        for (key, value) in &pairs {
            assert_eq!(fst.get(key), Some(*value));
        }
        assert_eq!(fst.get(&[10, b'x']), None);
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut entries = BTreeMap::new();
        while entries.len() < 500 {
            let len = rng.gen_range(1..12);
            let key: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'f')).collect();
            entries.insert(key, rng.gen_range(1u64..1_000_000));
        }
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (key, value) in &entries {
            builder.add(key, *value).unwrap();
        }
        let fst = builder.finish().unwrap();
        for (key, value) in &entries {
            assert_eq!(fst.get(key), Some(*value), "key {:?}", key);
        }
        for _ in 0..500 {
            let len = rng.gen_range(1..12);
            let key: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'f')).collect();
            assert_eq!(fst.get(&key), entries.get(&key).copied(), "key {:?}", key);
        }
    }

    #[test]
    fn test_byte_sequence_outputs_round_trip() {
        let mut builder = Builder::new(InputType::Byte1, ByteSequenceOutputs);
        builder.add(b"apple", b"fruit".to_vec()).unwrap();
        builder.add(b"apricot", b"also fruit".to_vec()).unwrap();
        builder.add(b"azalea", b"flower".to_vec()).unwrap();
        let fst = builder.finish().unwrap();
        assert_eq!(fst.get(b"apple"), Some(b"fruit".to_vec()));
        assert_eq!(fst.get(b"apricot"), Some(b"also fruit".to_vec()));
        assert_eq!(fst.get(b"azalea"), Some(b"flower".to_vec()));
        assert_eq!(fst.get(b"apr"), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let fst = build_int_fst(&[(b"left", 10), (b"right", 20), (b"rigid", 30)]);
        let mut buffer = Vec::new();
        fst.save(&mut buffer).unwrap();
        let loaded =
            Fst::load(&mut &buffer[..], PositiveIntOutputs, "test.fst").unwrap();
        assert_eq!(loaded.get(b"left"), Some(10));
        assert_eq!(loaded.get(b"right"), Some(20));
        assert_eq!(loaded.get(b"rigid"), Some(30));
        assert_eq!(loaded.get(b"rig"), None);
    }

    #[test]
    fn test_shared_suffixes_shrink_the_fst() {
        let mut entries: Vec<(Vec<u8>, u64)> = Vec::new();
        for prefix in [b"con", b"pre", b"pro"] {
            for stem in [&b"cede"[..], b"fer", b"tend"] {
                let mut key = prefix.to_vec();
                key.extend_from_slice(stem);
                entries.push((key, 1));
            }
        }
        entries.sort();
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (key, value) in &entries {
            builder.add(key, *value).unwrap();
        }
        let fst = builder.finish().unwrap();
        let naive: usize = entries.iter().map(|(key, _)| key.len()).sum();
        assert!(fst.num_bytes() < naive * 2);
        for (key, _) in &entries {
            assert_eq!(fst.get(key), Some(1));
        }
    }
}
