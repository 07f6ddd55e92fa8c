//! Incremental FST builder over pre-sorted input.
//!
//! The frontier holds one uncompiled node per label of the current
//! input. When the next input diverges, the nodes past the shared
//! prefix are frozen: serialized into the bytes store and minimized
//! against a hash-consing table of already-compiled nodes. Arc outputs
//! are pushed toward the root by repeated `common`/`subtract` along the
//! frontier.

use std::collections::HashMap;
use std::mem;

use crate::fst::bytes_store::BytesStore;
use crate::fst::outputs::Outputs;
use crate::fst::{
    Fst, InputType, ARCS_AS_ARRAY_PACKED, ARCS_AS_ARRAY_WITH_GAPS, BIT_ARC_HAS_FINAL_OUTPUT,
    BIT_ARC_HAS_OUTPUT, BIT_FINAL_ARC, BIT_LAST_ARC, BIT_MISSING_ARC, BIT_STOP_NODE,
    BIT_TARGET_NEXT, DIRECT_ARC_LOAD_FACTOR, FINAL_END_NODE, FIXED_ARRAY_NUM_ARCS_DEEP,
    FIXED_ARRAY_NUM_ARCS_SHALLOW, FIXED_ARRAY_SHALLOW_DISTANCE, NON_FINAL_END_NODE,
};
use crate::{ErrorKind, Result};

struct BuilderArc<V> {
    label: i32,
    target: i64,
    output: V,
    next_final_output: V,
    is_final: bool,
}

struct UnCompiledNode<V> {
    arcs: Vec<BuilderArc<V>>,
    is_final: bool,
    final_output: V,
    depth: usize,
}

impl<V: Clone> UnCompiledNode<V> {
    fn new(no_output: V, depth: usize) -> UnCompiledNode<V> {
        UnCompiledNode {
            arcs: Vec::new(),
            is_final: false,
            final_output: no_output,
            depth,
        }
    }

    fn add_arc(&mut self, label: i32, no_output: V) {
        debug_assert!(
            self.arcs.last().map_or(true, |arc| arc.label < label),
            "arcs must be appended in label order"
        );
        self.arcs.push(BuilderArc {
            label,
            target: NON_FINAL_END_NODE,
            output: no_output.clone(),
            next_final_output: no_output,
            is_final: false,
        });
    }

    fn replace_last(&mut self, label: i32, target: i64, next_final_output: V, is_final: bool) {
        let arc = self.arcs.last_mut().expect("node has no arcs");
        debug_assert_eq!(arc.label, label, "replace_last label mismatch");
        arc.target = target;
        arc.next_final_output = next_final_output;
        arc.is_final = is_final;
    }

    fn last_output(&self, label: i32) -> &V {
        let arc = self.arcs.last().expect("node has no arcs");
        debug_assert_eq!(arc.label, label);
        &arc.output
    }

    fn set_last_output(&mut self, label: i32, output: V) {
        let arc = self.arcs.last_mut().expect("node has no arcs");
        debug_assert_eq!(arc.label, label);
        arc.output = output;
    }
}

/// Dedup key: the full logical content of a compiled node. Two nodes
/// with equal keys are interchangeable targets.
#[derive(Hash, PartialEq, Eq)]
struct NodeKey {
    arcs: Vec<ArcKey>,
}

#[derive(Hash, PartialEq, Eq)]
struct ArcKey {
    label: i32,
    target: i64,
    is_final: bool,
    output: Vec<u8>,
    final_output: Vec<u8>,
}

pub struct Builder<O: Outputs> {
    input_type: InputType,
    outputs: O,
    bytes: BytesStore,
    frontier: Vec<UnCompiledNode<O::Value>>,
    last_input: Vec<i32>,
    dedup_hash: HashMap<NodeKey, i64>,
    last_frozen_node: i64,
    empty_output: Option<O::Value>,
    reused_bytes_per_arc: Vec<usize>,
    num_entries: u64,
    node_count: u64,
    arc_count: u64,
    allow_array_arcs: bool,
}

impl<O: Outputs> Builder<O> {
    pub fn new(input_type: InputType, outputs: O) -> Builder<O> {
        let no_output = outputs.no_output();
        let mut bytes = BytesStore::with_block_bits(15);
        // pad so no real node lands on address 0, which is reserved
        // for the no-arc stop state
        bytes.write_byte(0);
        Builder {
            input_type,
            outputs,
            bytes,
            frontier: vec![UnCompiledNode::new(no_output, 0)],
            last_input: Vec::new(),
            dedup_hash: HashMap::new(),
            last_frozen_node: 0,
            empty_output: None,
            reused_bytes_per_arc: Vec::new(),
            num_entries: 0,
            node_count: 0,
            arc_count: 0,
            allow_array_arcs: true,
        }
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Adds a byte-labeled input. Inputs must arrive in strictly
    /// increasing order.
    pub fn add(&mut self, input: &[u8], output: O::Value) -> Result<()> {
        let labels: Vec<i32> = input.iter().map(|&b| i32::from(b)).collect();
        self.add_labels(&labels, output)
    }

    pub fn add_labels(&mut self, labels: &[i32], output: O::Value) -> Result<()> {
        if self.num_entries > 0 && labels <= self.last_input.as_slice() {
            return Err(ErrorKind::OutOfOrder(format!(
                "input {:?} is <= the previous input {:?}",
                labels, self.last_input
            ))
            .into());
        }

        if labels.is_empty() {
            self.frontier[0].is_final = true;
            self.empty_output = Some(output);
            self.num_entries += 1;
            return Ok(());
        }

        let no_output = self.outputs.no_output();
        while self.frontier.len() < labels.len() + 1 {
            let depth = self.frontier.len();
            self.frontier.push(UnCompiledNode::new(no_output.clone(), depth));
        }

        let mut prefix_len = 0;
        while prefix_len < self.last_input.len().min(labels.len())
            && self.last_input[prefix_len] == labels[prefix_len]
        {
            prefix_len += 1;
        }
        let prefix_len_plus1 = prefix_len + 1;

        self.freeze_tail(prefix_len_plus1);

        for idx in prefix_len_plus1..=labels.len() {
            self.frontier[idx - 1].add_arc(labels[idx - 1], no_output.clone());
        }

        let last_node = &mut self.frontier[labels.len()];
        last_node.is_final = true;
        last_node.final_output = no_output.clone();

        // push shared output prefixes toward the root
        let mut output = output;
        for idx in 1..prefix_len_plus1 {
            let label = labels[idx - 1];
            let last_output = self.frontier[idx - 1].last_output(label).clone();
            if !self.outputs.is_no_output(&last_output) {
                let common = self.outputs.common(&output, &last_output);
                let word_suffix = self.outputs.subtract(&last_output, &common);
                self.frontier[idx - 1].set_last_output(label, common.clone());
                if !self.outputs.is_no_output(&word_suffix) {
                    self.prepend_output(idx, &word_suffix);
                }
                output = self.outputs.subtract(&output, &common);
            }
        }

        self.frontier[prefix_len_plus1 - 1].set_last_output(labels[prefix_len_plus1 - 1], output);
        self.last_input = labels.to_vec();
        self.num_entries += 1;
        Ok(())
    }

    fn prepend_output(&mut self, node_index: usize, prefix: &O::Value) {
        let outputs = self.outputs.clone();
        let node = &mut self.frontier[node_index];
        for arc in &mut node.arcs {
            arc.output = outputs.add(prefix, &arc.output);
        }
        if node.is_final {
            node.final_output = outputs.add(prefix, &node.final_output);
        }
    }

    /// Compiles frontier nodes past the shared prefix with the next
    /// input, deepest first.
    fn freeze_tail(&mut self, prefix_len_plus1: usize) {
        let down_to = prefix_len_plus1.max(1);
        if self.last_input.len() < down_to {
            return;
        }
        let no_output = self.outputs.no_output();
        for idx in (down_to..=self.last_input.len()).rev() {
            let node = mem::replace(
                &mut self.frontier[idx],
                UnCompiledNode::new(no_output.clone(), idx),
            );
            let next_final_output = node.final_output.clone();
            let is_final = node.is_final || node.arcs.is_empty();
            let address = self.compile_node(node);
            let label = self.last_input[idx - 1];
            self.frontier[idx - 1].replace_last(label, address, next_final_output, is_final);
        }
    }

    fn node_key(&self, node: &UnCompiledNode<O::Value>) -> NodeKey {
        let arcs = node
            .arcs
            .iter()
            .map(|arc| {
                let mut output = Vec::new();
                let mut final_output = Vec::new();
                self.outputs
                    .write(&arc.output, &mut output)
                    .expect("vec write cannot fail");
                self.outputs
                    .write_final(&arc.next_final_output, &mut final_output)
                    .expect("vec write cannot fail");
                ArcKey {
                    label: arc.label,
                    target: arc.target,
                    is_final: arc.is_final,
                    output,
                    final_output,
                }
            })
            .collect();
        NodeKey { arcs }
    }

    fn compile_node(&mut self, node: UnCompiledNode<O::Value>) -> i64 {
        if node.arcs.is_empty() {
            return if node.is_final {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            };
        }
        let key = self.node_key(&node);
        if let Some(&address) = self.dedup_hash.get(&key) {
            // shared suffix: reuse the already-compiled node
            return address;
        }
        let address = self.write_node(&node);
        self.dedup_hash.insert(key, address);
        self.last_frozen_node = address;
        address
    }

    fn should_expand(&self, node: &UnCompiledNode<O::Value>) -> bool {
        self.allow_array_arcs
            && (node.depth <= FIXED_ARRAY_SHALLOW_DISTANCE
                && node.arcs.len() >= FIXED_ARRAY_NUM_ARCS_SHALLOW
                || node.arcs.len() >= FIXED_ARRAY_NUM_ARCS_DEEP)
    }

    fn write_node(&mut self, node: &UnCompiledNode<O::Value>) -> i64 {
        debug_assert!(!node.arcs.is_empty());
        let start_address = self.bytes.position();
        let do_fixed_array = self.should_expand(node);
        if do_fixed_array && self.reused_bytes_per_arc.len() < node.arcs.len() {
            self.reused_bytes_per_arc.resize(node.arcs.len(), 0);
        }
        self.arc_count += node.arcs.len() as u64;

        let last_arc_index = node.arcs.len() - 1;
        let mut last_arc_start = self.bytes.position();
        let mut max_bytes_per_arc = 0usize;
        for (arc_index, arc) in node.arcs.iter().enumerate() {
            let mut flags = 0u8;
            if arc_index == last_arc_index {
                flags |= BIT_LAST_ARC;
            }
            if self.last_frozen_node == arc.target && !do_fixed_array {
                flags |= BIT_TARGET_NEXT;
            }
            if arc.is_final {
                flags |= BIT_FINAL_ARC;
                if !self.outputs.is_no_output(&arc.next_final_output) {
                    flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
            } else {
                debug_assert!(self.outputs.is_no_output(&arc.next_final_output));
            }
            let target_has_arcs = arc.target > 0;
            if !target_has_arcs {
                flags |= BIT_STOP_NODE;
            }
            if !self.outputs.is_no_output(&arc.output) {
                flags |= BIT_ARC_HAS_OUTPUT;
            }

            self.bytes.write_byte(flags);
            Fst::<O>::write_label(&mut self.bytes, self.input_type, arc.label);
            if flags & BIT_ARC_HAS_OUTPUT != 0 {
                self.outputs
                    .write(&arc.output, &mut self.bytes)
                    .expect("bytes store write cannot fail");
            }
            if flags & BIT_ARC_HAS_FINAL_OUTPUT != 0 {
                self.outputs
                    .write_final(&arc.next_final_output, &mut self.bytes)
                    .expect("bytes store write cannot fail");
            }
            if target_has_arcs && flags & BIT_TARGET_NEXT == 0 {
                self.bytes.write_vint(arc.target as u64);
            }

            if do_fixed_array {
                let arc_len = (self.bytes.position() - last_arc_start) as usize;
                self.reused_bytes_per_arc[arc_index] = arc_len;
                last_arc_start = self.bytes.position();
                max_bytes_per_arc = max_bytes_per_arc.max(arc_len);
            }
        }

        if do_fixed_array {
            self.expand_to_fixed_array(node, start_address, max_bytes_per_arc);
        }

        let this_node_address = self.bytes.position() - 1;
        self.bytes.reverse(start_address, this_node_address);
        self.node_count += 1;
        this_node_address as i64
    }

    /// Second pass of the array forms: pads every arc to a fixed
    /// stride (shifting them up in place, backwards), then drops the
    /// array header into the gap that opens at the node start.
    fn expand_to_fixed_array(
        &mut self,
        node: &UnCompiledNode<O::Value>,
        start_address: u64,
        max_bytes_per_arc: usize,
    ) {
        debug_assert!(max_bytes_per_arc > 0);
        let num_arcs = node.arcs.len();
        let label_range =
            (node.arcs[num_arcs - 1].label - node.arcs[0].label + 1) as usize;
        let write_directly = label_range < DIRECT_ARC_LOAD_FACTOR * num_arcs;

        let mut header = Vec::with_capacity(11);
        if write_directly {
            header.push(ARCS_AS_ARRAY_WITH_GAPS);
            crate::common::write_vint(label_range as u64, &mut header).expect("vec write");
        } else {
            header.push(ARCS_AS_ARRAY_PACKED);
            crate::common::write_vint(num_arcs as u64, &mut header).expect("vec write");
        }
        crate::common::write_vint(max_bytes_per_arc as u64, &mut header).expect("vec write");
        let fixed_array_start = start_address + header.len() as u64;

        if write_directly {
            let mut src_pos = self.bytes.position();
            let mut dest_pos = fixed_array_start + (label_range * max_bytes_per_arc) as u64;
            debug_assert!(dest_pos > src_pos);
            self.bytes.skip_bytes((dest_pos - src_pos) as usize);
            let mut arc_index = num_arcs - 1;
            let first_label = node.arcs[0].label;
            let mut next_label = node.arcs[arc_index].label;
            for direct_index in (0..label_range).rev() {
                dest_pos -= max_bytes_per_arc as u64;
                if direct_index == (next_label - first_label) as usize {
                    let arc_len = self.reused_bytes_per_arc[arc_index];
                    src_pos -= arc_len as u64;
                    if src_pos != dest_pos {
                        debug_assert!(dest_pos > src_pos);
                        self.bytes.copy_bytes_inside(src_pos, dest_pos, arc_len);
                    }
                    if arc_index == 0 {
                        break;
                    }
                    arc_index -= 1;
                    next_label = node.arcs[arc_index].label;
                } else {
                    debug_assert!(direct_index > arc_index);
                    self.bytes.write_byte_at(dest_pos, BIT_MISSING_ARC);
                }
            }
        } else {
            let mut src_pos = self.bytes.position();
            let mut dest_pos = fixed_array_start + (num_arcs * max_bytes_per_arc) as u64;
            debug_assert!(dest_pos > src_pos);
            self.bytes.skip_bytes((dest_pos - src_pos) as usize);
            for arc_index in (0..num_arcs).rev() {
                dest_pos -= max_bytes_per_arc as u64;
                src_pos -= self.reused_bytes_per_arc[arc_index] as u64;
                if src_pos != dest_pos {
                    debug_assert!(dest_pos > src_pos);
                    self.bytes
                        .copy_bytes_inside(src_pos, dest_pos, self.reused_bytes_per_arc[arc_index]);
                }
            }
        }

        self.bytes.write_bytes_at(start_address, &header);
    }

    /// Freezes everything left on the frontier and seals the FST.
    pub fn finish(mut self) -> Result<Fst<O>> {
        self.freeze_tail(0);
        let no_output = self.outputs.no_output();
        let root = mem::replace(&mut self.frontier[0], UnCompiledNode::new(no_output, 0));
        let mut start_node = self.compile_node(root);
        if start_node == FINAL_END_NODE && self.empty_output.is_some() {
            start_node = 0;
        }
        debug!(
            "fst finished: {} entries, {} nodes, {} arcs, {} bytes",
            self.num_entries,
            self.node_count,
            self.arc_count,
            self.bytes.position()
        );
        Ok(Fst::from_parts(
            self.input_type,
            self.outputs,
            self.bytes.into_bytes(),
            start_node,
            self.empty_output,
        ))
    }
}
