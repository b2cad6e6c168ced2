//! `io::Read` extensions for decoding crate sections.

use std::{any::type_name, io, mem};

use anyhow::{bail, ensure, Context, Result};
use bytemuck::{bytes_of_mut, cast_slice_mut, AnyBitPattern, NoUninit, Pod};
use num_traits::{AsPrimitive, PrimInt};

use super::coding;
use crate::sdf;

/// A vertex of the path hierarchy encoded in the PATHS section.
///
/// Node indices share the path-index space; node 0 is the pseudo-root.
#[derive(Debug, Default, Clone)]
pub struct Node {
    /// Full path of this node.
    pub path: sdf::Path,
    /// Local element path (the node's own component only).
    pub element_path: sdf::Path,
    /// Parent node index; `None` for the pseudo-root.
    pub parent: Option<usize>,
    /// Child node indices, in file order.
    pub children: Vec<usize>,
}

pub trait ReadExt {
    /// Read a single "size" or "count" value encoded as `u64`.
    fn read_count(&mut self) -> Result<usize>;

    fn read_pod<T: Default + Pod>(&mut self) -> Result<T>;

    /// Read a `u64` count followed by that many raw `T`s.
    fn read_vec<T: Default + NoUninit + AnyBitPattern>(&mut self) -> Result<Vec<T>>;

    /// Read an lz4-compressed block and return decompressed values.
    ///
    /// Format expected:
    /// - u64 compressed size
    /// - lz4 compressed block of data.
    ///
    /// # Arguments:
    /// - `estimated_count`: Count enough to hold uncompressed data.
    fn read_compressed<T: Default + NoUninit + AnyBitPattern>(&mut self, estimated_count: usize) -> Result<Vec<T>>;

    /// Read a sequence of delta-coded compressed integers.
    fn read_encoded_ints<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: PrimInt + 'static,
        i64: AsPrimitive<T>;

    /// Decode the compressed PATHS section into the node hierarchy.
    fn read_compressed_nodes(&mut self, tokens: &[String]) -> Result<Vec<Node>>;
}

impl<R: io::Read> ReadExt for R {
    fn read_count(&mut self) -> Result<usize> {
        let mut count = 0_u64;
        self.read_exact(bytes_of_mut(&mut count))
            .context("Unable to read size from IO stream")?;

        Ok(count as usize)
    }

    fn read_pod<T: Default + Pod>(&mut self) -> Result<T> {
        let mut object = T::default();

        self.read_exact(bytes_of_mut(&mut object))
            .with_context(|| format!("Unable to read pod: {}", type_name::<T>()))?;

        Ok(object)
    }

    fn read_vec<T: Default + NoUninit + AnyBitPattern>(&mut self) -> Result<Vec<T>> {
        let count = self.read_count()?;

        let mut vec = vec![T::default(); count];
        self.read_exact(cast_slice_mut(&mut vec)).context("Unable to read vec")?;

        Ok(vec)
    }

    fn read_compressed<T: Default + NoUninit + AnyBitPattern>(&mut self, estimated_count: usize) -> Result<Vec<T>> {
        // Read compressed data to memory.
        let compressed_size = self.read_count()?;
        let mut input = vec![0_u8; compressed_size];
        self.read_exact(&mut input)?;

        // Decompress to the output buffer.
        let mut output = vec![T::default(); estimated_count];
        let actual_size = decompress_lz4(&input, cast_slice_mut(&mut output))?;

        let actual_count = actual_size / mem::size_of::<T>();
        if actual_count < output.len() {
            output.truncate(actual_count);
        }

        Ok(output)
    }

    fn read_encoded_ints<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: PrimInt + 'static,
        i64: AsPrimitive<T>,
    {
        let estimated_size = coding::encoded_buffer_size::<T>(count);

        let buffer = self.read_compressed::<u8>(estimated_size)?;

        let ints = coding::decode_ints(buffer.as_slice(), count)?;
        debug_assert_eq!(ints.len(), count);

        Ok(ints)
    }

    fn read_compressed_nodes(&mut self, tokens: &[String]) -> Result<Vec<Node>> {
        let encoded_path_count = self.read_count()?;

        let path_indexes = self.read_encoded_ints::<u32>(encoded_path_count)?;
        let element_token_indexes = self.read_encoded_ints::<i32>(encoded_path_count)?;
        let jumps = self.read_encoded_ints::<i32>(encoded_path_count)?;

        let mut nodes = vec![Node::default(); encoded_path_count];

        if encoded_path_count > 0 {
            build_node_hierarchy(
                &path_indexes,
                &element_token_indexes,
                &jumps,
                tokens,
                0,
                None,
                &mut nodes,
            )?;
        }

        Ok(nodes)
    }
}

/// Rebuild paths and the parent/child links from the three encoded
/// streams. Siblings are linked by `jumps`; a child immediately follows
/// its parent in the encoding.
///
/// See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/crateFile.cpp#L3760>
fn build_node_hierarchy(
    path_indexes: &[u32],
    element_token_indexes: &[i32],
    jumps: &[i32],
    tokens: &[String],
    mut current_index: usize,
    mut parent: Option<usize>,
    nodes: &mut [Node],
) -> Result<()> {
    loop {
        let this_index = current_index;
        current_index += 1;

        ensure!(this_index < path_indexes.len(), "Path encoding truncated");

        let node_index = path_indexes[this_index] as usize;
        ensure!(node_index < nodes.len(), "Path index {node_index} out of range");

        match parent {
            None => {
                nodes[node_index].path = sdf::Path::abs_root();
                nodes[node_index].element_path = sdf::Path::abs_root();
            }
            Some(parent_index) => {
                let token_index = element_token_indexes[this_index];
                let is_prim_property_path = token_index < 0;
                let token_index = token_index.unsigned_abs() as usize;

                let element_token = tokens
                    .get(token_index)
                    .with_context(|| format!("Element token index {token_index} out of range"))?
                    .as_str();

                let parent_path = nodes[parent_index].path.clone();

                let (path, element_path) = if is_prim_property_path {
                    (
                        parent_path.append_property(element_token)?,
                        sdf::Path::new("", element_token),
                    )
                } else {
                    (
                        parent_path.append_element(element_token)?,
                        sdf::Path::new(element_token, ""),
                    )
                };

                nodes[node_index].path = path;
                nodes[node_index].element_path = element_path;
                nodes[node_index].parent = Some(parent_index);
                nodes[parent_index].children.push(node_index);
            }
        }

        let has_child = jumps[this_index] > 0 || jumps[this_index] == -1;
        let has_sibling = jumps[this_index] >= 0;

        if has_child {
            if has_sibling {
                // Process the sibling subtree first; our own child follows
                // immediately in the encoding.
                let sibling_index = this_index + jumps[this_index] as usize;

                build_node_hierarchy(
                    path_indexes,
                    element_token_indexes,
                    jumps,
                    tokens,
                    sibling_index,
                    parent,
                    nodes,
                )?;
            }

            parent = Some(node_index);
        }

        if !has_child && !has_sibling {
            break;
        }
    }

    Ok(())
}

/// Decompress a crate LZ4 block. The first byte holds the chunk count;
/// zero means a single block spanning the rest of the input.
///
/// See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/base/tf/fastCompression.cpp#L108>
fn decompress_lz4(mut input: &[u8], output: &mut [u8]) -> Result<usize> {
    let chunks = input.read_pod::<u8>().context("Unable to read lz4 chunk count")? as usize;

    if chunks == 0 {
        return lz4_flex::decompress_into(input, output).context("Failed to decompress data, possibly corrupt?");
    }

    // Chunked stream: each chunk is an i32 compressed size plus data.
    let mut total = 0;
    for _ in 0..chunks {
        let chunk_size = input.read_pod::<i32>()? as usize;
        ensure!(chunk_size <= input.len(), "LZ4 chunk size exceeds input");

        let (chunk, rest) = input.split_at(chunk_size);
        input = rest;

        total += lz4_flex::decompress_into(chunk, &mut output[total..])
            .context("Failed to decompress chunk, possibly corrupt?")?;
    }

    Ok(total)
}
