//! Binary crate (`usdc`) format: byte decoding and stage reconstruction.
//!
//! [Reader] is the public entry point. [Reader::read_crate] drives the
//! byte decoder ([CrateFile]) and keeps the decoded tables;
//! [Reader::reconstruct_stage] rebuilds the typed prim tree from them.

use std::{io, path::Path, thread};

use indexmap::IndexMap;

mod coding;
mod diag;
mod file;
mod layout;
mod property;
mod reader;
mod reconstruct;

pub use diag::{Diagnostics, Error, Result};
pub use file::CrateFile;
pub use layout::{version, Bootstrap, Field, ListOpHeader, Section, Spec, Type, ValueRep, Version};
pub use reader::{Node, ReadExt};

use crate::{sdf, stage::Stage};
use reconstruct::StageBuilder;

/// A decoded field: name plus unpacked value.
pub type FieldValuePair = (String, sdf::Value);
pub type FieldValues = Vec<FieldValuePair>;

/// Fieldset start index to decoded field values.
pub type LiveFieldSets = IndexMap<u32, FieldValues>;

/// Tables produced by the byte decoder, moved (not copied) out of
/// [CrateFile] and read-only during reconstruction.
#[derive(Default)]
pub struct DecodedTables {
    /// Path hierarchy; node index equals path index.
    pub nodes: Vec<Node>,
    pub specs: Vec<Spec>,
    pub fields: Vec<Field>,
    pub fieldset_indices: Vec<Option<usize>>,
    pub live_fieldsets: LiveFieldSets,

    /// Rough decoded-data footprint in bytes.
    pub memory_used: usize,
}

impl DecodedTables {
    /// Resolve a path index to its structured path.
    #[inline]
    pub fn path(&self, index: u32) -> Option<&sdf::Path> {
        self.nodes.get(index as usize).map(|node| &node.path)
    }

    /// Resolve a path index to its local element path.
    #[inline]
    pub fn element_path(&self, index: u32) -> Option<&sdf::Path> {
        self.nodes.get(index as usize).map(|node| &node.element_path)
    }
}

/// Reader limits and thread configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Decode worker bound; `None` picks the hardware concurrency.
    /// Clamped to 1..=1024.
    pub num_threads: Option<usize>,
    /// Max entries in a single fieldset.
    pub max_fieldvalue_pairs: usize,
    /// Max accepted `elementSize` attribute metadatum.
    pub max_element_size: u32,
    /// Max prim tree depth.
    pub max_prim_nest_level: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            max_fieldvalue_pairs: 4096,
            max_element_size: 1 << 20,
            max_prim_nest_level: 256,
        }
    }
}

/// Crate file reader: decodes the byte stream, then reconstructs a
/// [Stage].
///
/// A reader is single use and not safe for concurrent method calls; it
/// owns the decoded tables and the diagnostics they produce.
pub struct Reader<R> {
    byte_source: Option<R>,
    config: ReaderConfig,
    num_threads: usize,
    diag: Diagnostics,
    tables: Option<DecodedTables>,
}

impl<R: io::Read + io::Seek> Reader<R> {
    pub fn new(byte_source: R, config: ReaderConfig) -> Self {
        let num_threads = config
            .num_threads
            .unwrap_or_else(|| thread::available_parallelism().map(usize::from).unwrap_or(1))
            .clamp(1, 1024);

        Reader {
            byte_source: Some(byte_source),
            config,
            num_threads,
            diag: Diagnostics::default(),
            tables: None,
        }
    }

    /// Effective decode worker bound.
    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run the byte decoder: header, TOC, tokens, strings, fields,
    /// fieldset indices, paths, specs, then the live fieldsets.
    pub fn read_crate(&mut self) -> Result<()> {
        let result = (|| {
            let byte_source = self
                .byte_source
                .take()
                .ok_or_else(|| Error::Internal("Crate data was already read".to_string()))?;

            let file = CrateFile::open(byte_source).map_err(|err| Error::Decode(format!("{err:#}")))?;
            file.validate().map_err(|err| Error::Decode(format!("{err:#}")))?;

            let tables = file.into_tables().map_err(|err| Error::Decode(format!("{err:#}")))?;
            log::debug!(
                "Decoded crate: {} nodes, {} specs, {} live fieldsets",
                tables.nodes.len(),
                tables.specs.len(),
                tables.live_fieldsets.len()
            );

            self.tables = Some(tables);
            Ok(())
        })();

        if let Err(ref err) = result {
            self.diag.record_error(err);
        }

        result
    }

    /// Reconstruct the prim tree into `stage`.
    ///
    /// On failure the stage may hold partial root prims; it is not rolled
    /// back.
    pub fn reconstruct_stage(&mut self, stage: &mut Stage) -> Result<()> {
        let result = match &self.tables {
            Some(tables) => StageBuilder::new(tables, &self.config, &mut self.diag).reconstruct(stage),
            None => Err(Error::Internal(
                "reconstruct_stage called before read_crate succeeded".to_string(),
            )),
        };

        if let Err(ref err) = result {
            self.diag.record_error(err);
        }

        result
    }

    /// All recorded errors as one tagged string.
    pub fn error(&self) -> String {
        self.diag.error_string()
    }

    /// All recorded warnings as one tagged string.
    pub fn warning(&self) -> String {
        self.diag.warning_string()
    }

    /// Approximate memory held by decoded tables, in MiB.
    pub fn memory_usage_mib(&self) -> usize {
        self.tables.as_ref().map_or(0, |tables| tables.memory_used >> 20)
    }
}

/// Read a crate file from disk and reconstruct its stage.
pub fn read_file(path: impl AsRef<Path>) -> anyhow::Result<Stage> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|err| anyhow::anyhow!("Unable to open crate file {}: {err}", path.display()))?;

    let mut reader = Reader::new(io::BufReader::new(file), ReaderConfig::default());

    let mut stage = Stage::default();
    if reader.read_crate().is_err() || reader.reconstruct_stage(&mut stage).is_err() {
        anyhow::bail!("{}", reader.error());
    }

    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_is_clamped() {
        let reader = Reader::new(
            io::Cursor::new(Vec::new()),
            ReaderConfig {
                num_threads: Some(100_000),
                ..Default::default()
            },
        );
        assert_eq!(reader.num_threads(), 1024);

        let reader = Reader::new(
            io::Cursor::new(Vec::new()),
            ReaderConfig {
                num_threads: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(reader.num_threads(), 1);

        let reader = Reader::new(io::Cursor::new(Vec::new()), ReaderConfig::default());
        assert!(reader.num_threads() >= 1);
    }

    #[test]
    fn reconstruct_before_read_fails() {
        let mut reader = Reader::new(io::Cursor::new(Vec::new()), ReaderConfig::default());

        let mut stage = Stage::default();
        assert!(reader.reconstruct_stage(&mut stage).is_err());
        assert!(reader.error().contains("[USDC]"));
    }

    #[test]
    fn read_crate_rejects_garbage() {
        let mut reader = Reader::new(io::Cursor::new(vec![0_u8; 64]), ReaderConfig::default());

        assert!(reader.read_crate().is_err());
        assert!(reader.error().contains("crate decode failed"));
    }
}
