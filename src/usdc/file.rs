//! Binary crate file decoder.
//!
//! [CrateFile] reads the structural sections (tokens, strings, fields,
//! fieldsets, paths, specs), unpacks [ValueRep]s into [sdf::Value]s and
//! produces the decoded tables consumed by the reconstruction pass.

use std::{
    io::{self, Cursor},
    mem, str,
};

use anyhow::{bail, ensure, Context, Result};
use bytemuck::{bytes_of, AnyBitPattern, NoUninit, Pod};
use glam::{DMat2, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Quat, Vec2, Vec3, Vec4};
use half::f16;
use indexmap::IndexMap;

use super::{
    layout::{version, Bootstrap, Field, ListOpHeader, Section, Spec, Type, ValueRep, Version},
    reader::{Node, ReadExt},
    FieldValues, LiveFieldSets,
};
use crate::sdf::{self, ListOp};

// Currently supported crate version.
const SW_VERSION: Version = version(0, 10, 0);

/// Crate file represents structural data loaded from a USDC file on disk.
pub struct CrateFile<R: io::Read + io::Seek> {
    /// File reader.
    reader: R,

    /// File header.
    pub bootstrap: Bootstrap,
    /// Structural sections.
    pub sections: Vec<Section>,
    /// Tokens section.
    pub tokens: Vec<String>,
    /// Strings section: indices into the token table.
    pub strings: Vec<usize>,
    /// All unique fields.
    pub fields: Vec<Field>,
    /// A vector of groups of field indices, invalid-index terminated.
    pub fieldsets: Vec<Option<usize>>,
    /// Path hierarchy; node index equals path index.
    pub nodes: Vec<Node>,
    /// All specs.
    pub specs: Vec<Spec>,

    /// Rough decoded-data footprint in bytes.
    memory_used: usize,
}

impl<R: io::Read + io::Seek> CrateFile<R> {
    /// Read structural sections of a crate file.
    pub fn open(mut reader: R) -> Result<Self> {
        let bootstrap = Self::read_header(&mut reader)?;

        let mut file = CrateFile {
            reader,
            bootstrap,
            sections: Vec::new(),
            tokens: Vec::new(),
            strings: Vec::new(),
            fields: Vec::new(),
            fieldsets: Vec::new(),
            nodes: Vec::new(),
            specs: Vec::new(),
            memory_used: 0,
        };

        file.read_sections().context("Unable to read sections")?;
        file.read_tokens().context("Unable to read TOKENS section")?;
        file.read_strings().context("Unable to read STRINGS section")?;
        file.read_fields().context("Unable to read FIELDS section")?;
        file.read_fieldsets().context("Unable to read FIELDSETS section")?;
        file.read_paths().context("Unable to read PATHS section")?;
        file.read_specs().context("Unable to read SPECS section")?;

        Ok(file)
    }

    /// Sanity check of structural validity.
    /// Roughly corresponds to `PXR_PREFER_SAFETY_OVER_SPEED` define in USD.
    pub fn validate(&self) -> Result<()> {
        self.fields.iter().enumerate().try_for_each(|(index, field)| {
            self.tokens
                .get(field.token_index)
                .with_context(|| format!("Invalid field token index {}: {}", index, field.token_index))?;

            anyhow::Ok(())
        })?;

        self.fieldsets
            .iter()
            .enumerate()
            .filter_map(|(i, index)| index.map(|index| (i, index)))
            .try_for_each(|(index, fieldset)| {
                self.fields
                    .get(fieldset)
                    .with_context(|| format!("Invalid fieldset index {}: {}", index, fieldset))?;

                anyhow::Ok(())
            })?;

        self.specs.iter().enumerate().try_for_each(|(index, spec)| {
            if spec.path_index != Spec::INVALID_INDEX {
                self.nodes
                    .get(spec.path_index as usize)
                    .with_context(|| format!("Invalid spec {} path index: {}", index, spec.path_index))?;
            }

            self.fieldsets
                .get(spec.fieldset_index as usize)
                .with_context(|| format!("Invalid spec {} fieldset index: {}", index, spec.fieldset_index))?;

            // A fieldset index must either be 0, or the element at the
            // prior index must be the run terminator.
            if spec.fieldset_index > 0 {
                ensure!(
                    self.fieldsets[spec.fieldset_index as usize - 1].is_none(),
                    "Invalid spec {}, fieldset index {} does not start a run",
                    index,
                    spec.fieldset_index
                );
            }

            ensure!(spec.spec_type != sdf::SpecType::Unknown, "Invalid spec {} type", index);

            anyhow::Ok(())
        })?;

        Ok(())
    }

    /// Returns file's version extracted from [Bootstrap::version].
    #[inline]
    pub fn version(&self) -> Version {
        Version::from(self.bootstrap)
    }

    /// Rough decoded-data footprint in bytes.
    #[inline]
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Read and verify bootstrap header, retrieve offset to TOC.
    fn read_header(mut reader: impl io::Read + io::Seek) -> Result<Bootstrap> {
        let header = reader.read_pod::<Bootstrap>()?;

        ensure!(header.ident.eq(b"PXR-USDC"), "Usd crate bootstrap section corrupt");
        ensure!(header.toc_offset > 0, "Invalid TOC offset");

        let file_ver = version(header.version[0], header.version[1], header.version[2]);

        ensure!(
            SW_VERSION.can_read(file_ver),
            "Usd crate version mismatch, file is {}, library supports {}",
            file_ver,
            SW_VERSION,
        );

        Ok(header)
    }

    fn read_sections(&mut self) -> Result<()> {
        self.set_position(self.bootstrap.toc_offset)?;
        self.sections = self.reader.read_vec::<Section>()?;

        Ok(())
    }

    fn read_tokens(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::TOKENS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let file_ver = self.version();

        // Read the number of tokens.
        let count = self.reader.read_count()?;

        self.tokens = if file_ver < version(0, 4, 0) {
            bail!("Crate files before 0.4.0 are not supported (found {file_ver})");
        } else {
            let uncompressed_size = self.reader.read_count()?;
            let mut buffer = self.reader.read_compressed(uncompressed_size)?;

            ensure!(
                buffer.len() == uncompressed_size,
                "Decompressed size mismatch (expected {}, got {})",
                uncompressed_size,
                buffer.len(),
            );

            ensure!(
                buffer.last() == Some(&b'\0'),
                "Tokens section not null-terminated in crate file"
            );

            // Pop last \0 byte to split strings without an empty trailing one.
            buffer.pop();

            let strings = buffer
                .split(|c| *c == b'\0')
                .map(|buf| str::from_utf8(buf).map(str::to_string))
                .collect::<Result<Vec<_>, str::Utf8Error>>()
                .context("Failed to parse TOKENS section")?;

            ensure!(
                strings.len() == count,
                "Crate file claims {} tokens, but found {}",
                count,
                strings.len(),
            );

            strings
        };

        self.memory_used += self.tokens.iter().map(String::len).sum::<usize>();

        Ok(())
    }

    fn read_strings(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::STRINGS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let strings = self.reader.read_vec::<u32>()?;

        // These are indices into the token table, keep as usize for convenience.
        self.strings = strings.into_iter().map(|offset| offset as usize).collect();

        Ok(())
    }

    fn read_fields(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::FIELDS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let field_count = self.reader.read_count()?;

        // Compressed field token indices, then compressed value reps.
        let indices = self.reader.read_encoded_ints::<u32>(field_count)?;
        let reps = self.reader.read_compressed::<u64>(field_count)?;

        ensure!(
            reps.len() == field_count,
            "FIELDS section claims {} reps, got {}",
            field_count,
            reps.len()
        );

        self.fields = indices
            .iter()
            .zip(reps.iter())
            .map(|(index, value)| Field::new(*index, *value))
            .collect();

        Ok(())
    }

    fn read_fieldsets(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::FIELDSETS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let count = self.reader.read_count()?;
        let decoded = self.reader.read_encoded_ints::<u32>(count)?;

        const INVALID_INDEX: u32 = u32::MAX;

        self.fieldsets = decoded
            .into_iter()
            .map(|i| if i == INVALID_INDEX { None } else { Some(i as usize) })
            .collect();

        Ok(())
    }

    fn read_paths(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::PATHS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let file_ver = self.version();
        ensure!(
            file_ver >= version(0, 4, 0),
            "Crate files before 0.4.0 are not supported (found {file_ver})"
        );

        // Total number of paths, then the compressed path hierarchy.
        let path_count = self.reader.read_count()?;

        self.nodes = self.reader.read_compressed_nodes(&self.tokens)?;
        ensure!(
            self.nodes.len() == path_count,
            "PATHS section claims {} paths, got {}",
            path_count,
            self.nodes.len()
        );

        Ok(())
    }

    fn read_specs(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::SPECS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let spec_count = self.reader.read_count()?;

        let mut specs = vec![Spec::default(); spec_count];

        // pathIndexes.
        let tmp = self.reader.read_encoded_ints::<u32>(spec_count)?;
        for (spec, path_index) in specs.iter_mut().zip(tmp) {
            spec.path_index = path_index;
        }

        // fieldSetIndexes.
        let tmp = self.reader.read_encoded_ints::<u32>(spec_count)?;
        for (spec, fieldset_index) in specs.iter_mut().zip(tmp) {
            spec.fieldset_index = fieldset_index;
        }

        // specTypes.
        let tmp = self.reader.read_encoded_ints::<u32>(spec_count)?;
        for (spec, spec_type) in specs.iter_mut().zip(tmp) {
            spec.spec_type = sdf::SpecType::from_repr(spec_type)
                .with_context(|| format!("Unable to parse SDF spec type: {spec_type}"))?;
        }

        self.specs = specs;

        Ok(())
    }

    /// Decode every fieldset run into named [sdf::Value]s.
    ///
    /// The map key is the run's starting index in the fieldset-index
    /// table, which is what specs reference.
    pub fn build_live_field_sets(&mut self) -> Result<LiveFieldSets> {
        let mut live = LiveFieldSets::new();

        let mut index = 0;
        while index < self.fieldsets.len() {
            let start = index as u32;
            let mut values = FieldValues::new();

            while let Some(Some(field_index)) = self.fieldsets.get(index) {
                let field_index = *field_index;
                index += 1;

                let field = *self
                    .fields
                    .get(field_index)
                    .with_context(|| format!("Fieldset references invalid field {field_index}"))?;

                let name = self
                    .tokens
                    .get(field.token_index)
                    .with_context(|| format!("Field {field_index} has invalid token index"))?
                    .clone();

                let value = self
                    .value(field.value_rep)
                    .with_context(|| format!("Unable to unpack value of field `{name}`"))?;

                self.memory_used += name.len() + mem::size_of::<sdf::Value>();
                values.push((name, value));
            }

            // Skip the run terminator.
            index += 1;

            live.insert(start, values);
        }

        Ok(live)
    }

    /// Decode everything and move the tables out of the file reader.
    pub fn into_tables(mut self) -> Result<super::DecodedTables> {
        let live_fieldsets = self.build_live_field_sets()?;

        Ok(super::DecodedTables {
            nodes: self.nodes,
            specs: self.specs,
            fields: self.fields,
            fieldset_indices: self.fieldsets,
            live_fieldsets,
            memory_used: self.memory_used,
        })
    }

    /// Find section by name.
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.reader.seek(io::SeekFrom::Start(position))?;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.reader.stream_position()?)
    }

    fn token_at(&self, index: usize) -> Result<&str> {
        self.tokens
            .get(index)
            .map(String::as_str)
            .with_context(|| format!("Token index {index} out of range"))
    }

    fn string_at(&self, index: usize) -> Result<&str> {
        let token_index = *self
            .strings
            .get(index)
            .with_context(|| format!("String index {index} out of range"))?;

        self.token_at(token_index)
    }

    fn path_at(&self, index: usize) -> Result<&sdf::Path> {
        self.nodes
            .get(index)
            .map(|node| &node.path)
            .with_context(|| format!("Path index {index} out of range"))
    }

    /// Decode a pod value: inlined reps carry it in the lower payload
    /// bytes, otherwise the payload is a file offset.
    fn unpack_pod<T: Default + Pod>(&mut self, rep: ValueRep) -> Result<T> {
        let value = if rep.is_inlined() {
            let tmp = rep.payload() & ((1_u64 << (mem::size_of::<u32>() * 8)) - 1);
            let mut cursor = Cursor::new(bytes_of(&tmp));
            cursor.read_pod::<T>()?
        } else {
            self.set_position(rep.payload())?;
            self.reader.read_pod::<T>()?
        };

        Ok(value)
    }

    /// Inlined vectors and matrix diagonals pack one i8 per component.
    fn unpack_i8s<const N: usize>(rep: ValueRep) -> [i8; N] {
        let bytes = rep.payload().to_le_bytes();
        std::array::from_fn(|i| bytes[i] as i8)
    }

    fn unpack_token(&mut self, rep: ValueRep) -> Result<String> {
        let index: u64 = self.unpack_pod(rep)?;
        Ok(self.token_at(index as usize)?.to_string())
    }

    fn unpack_string(&mut self, rep: ValueRep) -> Result<String> {
        let index: u32 = self.unpack_pod(rep)?;
        Ok(self.string_at(index as usize)?.to_string())
    }

    fn read_raw_vec<T: Default + NoUninit + AnyBitPattern>(&mut self, count: usize) -> Result<Vec<T>> {
        let mut vec = vec![T::default(); count];
        self.reader
            .read_exact(bytemuck::cast_slice_mut(&mut vec))
            .context("Unable to read array elements")?;

        Ok(vec)
    }

    /// Read an array header and elements at the rep's payload.
    fn read_pod_array<T: Default + NoUninit + AnyBitPattern>(&mut self, rep: ValueRep) -> Result<Vec<T>> {
        ensure!(!rep.is_inlined(), "Arrays can't be inlined");

        self.set_position(rep.payload())?;
        let count = self.reader.read_count()?;

        self.read_raw_vec(count)
    }

    /// Integer arrays may be delta-coded when the compressed bit is set.
    fn read_int_array<T>(&mut self, rep: ValueRep) -> Result<Vec<T>>
    where
        T: num_traits::PrimInt + Default + NoUninit + AnyBitPattern + 'static,
        i64: num_traits::AsPrimitive<T>,
    {
        if !rep.is_compressed() {
            return self.read_pod_array(rep);
        }

        self.set_position(rep.payload())?;
        let count = self.reader.read_count()?;

        self.reader.read_encoded_ints(count)
    }

    /// Float arrays may be stored as integers or through a lookup table
    /// when the compressed bit is set.
    fn read_float_array<T, F>(&mut self, rep: ValueRep, from_i32: F) -> Result<Vec<T>>
    where
        T: Default + NoUninit + AnyBitPattern,
        F: Fn(i32) -> T,
    {
        if !rep.is_compressed() {
            return self.read_pod_array(rep);
        }

        self.set_position(rep.payload())?;
        let count = self.reader.read_count()?;

        let code = self.reader.read_pod::<u8>()?;
        match code {
            // All values are small integers.
            b'i' => {
                let ints = self.reader.read_encoded_ints::<i32>(count)?;
                Ok(ints.into_iter().map(from_i32).collect())
            }
            // Few distinct values, indexed through a lookup table.
            b't' => {
                let lut_size = self.reader.read_pod::<u32>()? as usize;
                let lut = self.read_raw_vec::<T>(lut_size)?;

                let indexes = self.reader.read_encoded_ints::<u32>(count)?;
                indexes
                    .into_iter()
                    .map(|index| {
                        lut.get(index as usize)
                            .copied()
                            .with_context(|| format!("Compressed array index {index} outside lookup table"))
                    })
                    .collect()
            }
            other => bail!("Unknown compressed-floats code: {other}"),
        }
    }

    fn read_token_vec(&mut self) -> Result<Vec<String>> {
        let indices = self.reader.read_vec::<u32>()?;

        indices
            .into_iter()
            .map(|index| self.token_at(index as usize).map(str::to_string))
            .collect()
    }

    fn read_string_vec(&mut self) -> Result<Vec<String>> {
        let indices = self.reader.read_vec::<u32>()?;

        indices
            .into_iter()
            .map(|index| self.string_at(index as usize).map(str::to_string))
            .collect()
    }

    fn read_path_vec(&mut self) -> Result<Vec<sdf::Path>> {
        let indices = self.reader.read_vec::<u32>()?;

        indices
            .into_iter()
            .map(|index| self.path_at(index as usize).cloned())
            .collect()
    }

    fn read_layer_offset(&mut self) -> Result<sdf::LayerOffset> {
        let offset = self.reader.read_pod::<f64>()?;
        let scale = self.reader.read_pod::<f64>()?;

        Ok(sdf::LayerOffset { offset, scale })
    }

    fn read_reference(&mut self) -> Result<sdf::Reference> {
        let asset = self.reader.read_pod::<u32>()?;
        let asset_path = self.string_at(asset as usize)?.to_string();

        let path_index = self.reader.read_pod::<u32>()?;
        let prim_path = self.path_at(path_index as usize)?.clone();

        let layer_offset = self.read_layer_offset()?;
        let custom_data = self.read_dictionary()?;

        Ok(sdf::Reference {
            asset_path,
            prim_path,
            layer_offset,
            custom_data,
        })
    }

    fn read_payload(&mut self) -> Result<sdf::Payload> {
        let asset = self.reader.read_pod::<u32>()?;
        let asset_path = self.string_at(asset as usize)?.to_string();

        let path_index = self.reader.read_pod::<u32>()?;
        let prim_path = self.path_at(path_index as usize)?.clone();

        // Layer offsets joined payloads in 0.8.0.
        let layer_offset = if self.version() >= version(0, 8, 0) {
            Some(self.read_layer_offset()?)
        } else {
            None
        };

        Ok(sdf::Payload {
            asset_path,
            prim_path,
            layer_offset,
        })
    }

    /// Run `read` inside a recursive-read scope: an i64 prefix holds the
    /// distance from its own position to the first byte after the scope.
    fn recursive_read<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let offset = self.reader.read_pod::<i64>()?;
        let start = self.position()?;

        let value = read(self)?;

        let end = start
            .checked_add_signed(offset - mem::size_of::<i64>() as i64)
            .context("Invalid recursive-read offset")?;
        self.set_position(end)?;

        Ok(value)
    }

    fn read_dictionary(&mut self) -> Result<sdf::Dictionary> {
        let count = self.reader.read_count()?;

        let mut dict = sdf::Dictionary::new();
        for _ in 0..count {
            let key_index = self.reader.read_pod::<u32>()?;
            let key = self.string_at(key_index as usize)?.to_string();

            let value = self.recursive_read(|file| {
                let rep = ValueRep(file.reader.read_pod::<u64>()?);
                file.value(rep)
            })?;

            dict.insert(key, value);
        }

        Ok(dict)
    }

    fn read_list_op<T: Default>(
        &mut self,
        rep: ValueRep,
        mut read: impl FnMut(&mut Self) -> Result<Vec<T>>,
    ) -> Result<ListOp<T>> {
        self.set_position(rep.payload())?;

        let mut out = ListOp::<T>::default();

        let header = self.reader.read_pod::<ListOpHeader>()?;

        if header.is_explicit() {
            out.explicit = true;
        }

        if header.has_explicit() {
            out.explicit_items = read(self)?;
        }

        if header.has_added() {
            out.added_items = read(self)?;
        }

        if header.has_prepend() {
            out.prepended_items = read(self)?;
        }

        if header.has_appended() {
            out.appended_items = read(self)?;
        }

        if header.has_deleted() {
            out.deleted_items = read(self)?;
        }

        if header.has_ordered() {
            out.ordered_items = read(self)?;
        }

        Ok(out)
    }

    fn read_time_samples(&mut self, rep: ValueRep) -> Result<sdf::TimeSampleMap> {
        ensure!(!rep.is_inlined(), "TimeSamples can't be inlined");
        self.set_position(rep.payload())?;

        // Times, then the value reps, each in a recursive-read scope.
        let times = self.recursive_read(|file| {
            let times_rep = ValueRep(file.reader.read_pod::<u64>()?);
            let times = file.value(times_rep)?;

            match times {
                sdf::Value::DoubleVec(times) => Ok(times),
                sdf::Value::TimeCodeVec(times) => Ok(times),
                other => bail!("TimeSamples times must be double[], got {}", other.type_name()),
            }
        })?;

        let reps = self.recursive_read(|file| {
            let count = file.reader.read_count()?;
            file.read_raw_vec::<u64>(count)
        })?;

        ensure!(
            times.len() == reps.len(),
            "TimeSamples times/values size mismatch ({} vs {})",
            times.len(),
            reps.len()
        );

        times
            .into_iter()
            .zip(reps)
            .map(|(time, rep)| Ok((time, self.value(ValueRep(rep))?)))
            .collect()
    }

    fn read_variant_selection_map(&mut self, rep: ValueRep) -> Result<IndexMap<String, String>> {
        ensure!(!rep.is_inlined(), "Variant selection map can't be inlined");
        self.set_position(rep.payload())?;

        let count = self.reader.read_count()?;

        let mut map = IndexMap::new();
        for _ in 0..count {
            let key_index = self.reader.read_pod::<u32>()?;
            let value_index = self.reader.read_pod::<u32>()?;

            let key = self.string_at(key_index as usize)?.to_string();
            let value = self.string_at(value_index as usize)?.to_string();
            map.insert(key, value);
        }

        Ok(map)
    }

    /// Unpack a value rep into an owned [sdf::Value].
    pub fn value(&mut self, rep: ValueRep) -> Result<sdf::Value> {
        use sdf::Value;

        let ty = rep.ty()?;
        ensure!(ty != Type::Invalid, "Invalid value type");

        if rep.is_array() {
            return self.array_value(ty, rep);
        }

        let value = match ty {
            Type::Bool => {
                let value: i32 = self.unpack_pod(rep)?;
                Value::Bool(value != 0)
            }
            Type::Uchar => Value::Uchar(self.unpack_pod(rep)?),
            Type::Int => Value::Int(self.unpack_pod(rep)?),
            Type::Uint => Value::Uint(self.unpack_pod(rep)?),
            Type::Int64 => {
                if rep.is_inlined() {
                    // Inlined 64 bit ints are stored as 32 bit.
                    let value: i32 = self.unpack_pod(rep)?;
                    Value::Int64(value as i64)
                } else {
                    Value::Int64(self.unpack_pod(rep)?)
                }
            }
            Type::Uint64 => {
                if rep.is_inlined() {
                    let value: u32 = self.unpack_pod(rep)?;
                    Value::Uint64(value as u64)
                } else {
                    Value::Uint64(self.unpack_pod(rep)?)
                }
            }
            Type::Half => {
                let bits: u16 = self.unpack_pod(rep)?;
                Value::Half(f16::from_bits(bits))
            }
            Type::Float => Value::Float(self.unpack_pod(rep)?),
            Type::Double => {
                if rep.is_inlined() {
                    // Inlined doubles are stored with float accuracy.
                    let value: f32 = self.unpack_pod(rep)?;
                    Value::Double(value as f64)
                } else {
                    Value::Double(self.unpack_pod(rep)?)
                }
            }
            Type::TimeCode => {
                if rep.is_inlined() {
                    let value: f32 = self.unpack_pod(rep)?;
                    Value::TimeCode(value as f64)
                } else {
                    Value::TimeCode(self.unpack_pod(rep)?)
                }
            }
            Type::String => Value::String(self.unpack_string(rep)?),
            Type::Token => Value::Token(self.unpack_token(rep)?),
            Type::AssetPath => Value::AssetPath(self.unpack_token(rep)?),

            Type::Specifier => {
                let tmp: i32 = self.unpack_pod(rep)?;
                Value::Specifier(
                    sdf::Specifier::from_repr(tmp).with_context(|| format!("Unable to parse SDF specifier: {tmp}"))?,
                )
            }
            Type::Permission => {
                let tmp: i32 = self.unpack_pod(rep)?;
                Value::Permission(
                    sdf::Permission::from_repr(tmp).with_context(|| format!("Unable to parse permission: {tmp}"))?,
                )
            }
            Type::Variability => {
                let tmp: i32 = self.unpack_pod(rep)?;
                Value::Variability(
                    sdf::Variability::from_repr(tmp).with_context(|| format!("Unable to parse variability: {tmp}"))?,
                )
            }

            Type::Vec2i => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<2>(rep);
                    Value::Vec2i(IVec2::new(v[0] as i32, v[1] as i32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec2i(self.reader.read_pod()?)
                }
            }
            Type::Vec3i => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<3>(rep);
                    Value::Vec3i(IVec3::new(v[0] as i32, v[1] as i32, v[2] as i32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec3i(self.reader.read_pod()?)
                }
            }
            Type::Vec4i => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<4>(rep);
                    Value::Vec4i(IVec4::new(v[0] as i32, v[1] as i32, v[2] as i32, v[3] as i32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec4i(self.reader.read_pod()?)
                }
            }

            Type::Vec2h => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<2>(rep);
                    Value::Vec2h([f16::from_f32(v[0] as f32), f16::from_f32(v[1] as f32)])
                } else {
                    self.set_position(rep.payload())?;
                    let bits: [u16; 2] = self.reader.read_pod()?;
                    Value::Vec2h(bits.map(f16::from_bits))
                }
            }
            Type::Vec3h => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<3>(rep);
                    Value::Vec3h([
                        f16::from_f32(v[0] as f32),
                        f16::from_f32(v[1] as f32),
                        f16::from_f32(v[2] as f32),
                    ])
                } else {
                    self.set_position(rep.payload())?;
                    let bits: [u16; 3] = self.reader.read_pod()?;
                    Value::Vec3h(bits.map(f16::from_bits))
                }
            }
            Type::Vec4h => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<4>(rep);
                    Value::Vec4h(v.map(|c| f16::from_f32(c as f32)))
                } else {
                    self.set_position(rep.payload())?;
                    let bits: [u16; 4] = self.reader.read_pod()?;
                    Value::Vec4h(bits.map(f16::from_bits))
                }
            }

            Type::Vec2f => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<2>(rep);
                    Value::Vec2f(Vec2::new(v[0] as f32, v[1] as f32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec2f(self.reader.read_pod()?)
                }
            }
            Type::Vec3f => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<3>(rep);
                    Value::Vec3f(Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec3f(self.reader.read_pod()?)
                }
            }
            Type::Vec4f => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<4>(rep);
                    Value::Vec4f(Vec4::new(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec4f(self.reader.read_pod()?)
                }
            }

            Type::Vec2d => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<2>(rep);
                    Value::Vec2d(DVec2::new(v[0] as f64, v[1] as f64))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec2d(self.reader.read_pod()?)
                }
            }
            Type::Vec3d => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<3>(rep);
                    Value::Vec3d(DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec3d(self.reader.read_pod()?)
                }
            }
            Type::Vec4d => {
                if rep.is_inlined() {
                    let v = Self::unpack_i8s::<4>(rep);
                    Value::Vec4d(DVec4::new(v[0] as f64, v[1] as f64, v[2] as f64, v[3] as f64))
                } else {
                    self.set_position(rep.payload())?;
                    Value::Vec4d(self.reader.read_pod()?)
                }
            }

            Type::Quath => {
                self.set_position(rep.payload())?;
                let bits: [u16; 4] = self.reader.read_pod()?;
                Value::Quath(bits.map(f16::from_bits))
            }
            Type::Quatf => {
                self.set_position(rep.payload())?;
                let v: [f32; 4] = self.reader.read_pod()?;
                Value::Quatf(Quat::from_array(v))
            }
            Type::Quatd => {
                self.set_position(rep.payload())?;
                let v: [f64; 4] = self.reader.read_pod()?;
                Value::Quatd(DQuat::from_xyzw(v[0], v[1], v[2], v[3]))
            }

            Type::Matrix2d => {
                if rep.is_inlined() {
                    let d = Self::unpack_i8s::<2>(rep);
                    Value::Matrix2d(DMat2::from_diagonal(DVec2::new(d[0] as f64, d[1] as f64)))
                } else {
                    self.set_position(rep.payload())?;
                    let m: [f64; 4] = self.reader.read_pod()?;
                    Value::Matrix2d(DMat2::from_cols_array(&m))
                }
            }
            Type::Matrix3d => {
                if rep.is_inlined() {
                    let d = Self::unpack_i8s::<3>(rep);
                    Value::Matrix3d(DMat3::from_diagonal(DVec3::new(d[0] as f64, d[1] as f64, d[2] as f64)))
                } else {
                    self.set_position(rep.payload())?;
                    let m: [f64; 9] = self.reader.read_pod()?;
                    Value::Matrix3d(DMat3::from_cols_array(&m))
                }
            }
            Type::Matrix4d => {
                if rep.is_inlined() {
                    let d = Self::unpack_i8s::<4>(rep);
                    Value::Matrix4d(DMat4::from_diagonal(DVec4::new(
                        d[0] as f64,
                        d[1] as f64,
                        d[2] as f64,
                        d[3] as f64,
                    )))
                } else {
                    self.set_position(rep.payload())?;
                    let m: [f64; 16] = self.reader.read_pod()?;
                    Value::Matrix4d(DMat4::from_cols_array(&m))
                }
            }

            Type::Dictionary => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::Dictionary(self.read_dictionary()?)
            }

            Type::TokenListOp => Value::TokenListOp(self.read_list_op(rep, Self::read_token_vec)?),
            Type::StringListOp => Value::StringListOp(self.read_list_op(rep, Self::read_string_vec)?),
            Type::PathListOp => Value::PathListOp(self.read_list_op(rep, Self::read_path_vec)?),
            Type::IntListOp => Value::IntListOp(self.read_list_op(rep, |file| file.reader.read_vec())?),
            Type::Int64ListOp => Value::Int64ListOp(self.read_list_op(rep, |file| file.reader.read_vec())?),
            Type::UIntListOp => Value::UintListOp(self.read_list_op(rep, |file| file.reader.read_vec())?),
            Type::UInt64ListOp => Value::Uint64ListOp(self.read_list_op(rep, |file| file.reader.read_vec())?),
            Type::ReferenceListOp => Value::ReferenceListOp(self.read_list_op(rep, |file| {
                let count = file.reader.read_count()?;
                (0..count).map(|_| file.read_reference()).collect()
            })?),
            Type::PayloadListOp => Value::PayloadListOp(self.read_list_op(rep, |file| {
                let count = file.reader.read_count()?;
                (0..count).map(|_| file.read_payload()).collect()
            })?),

            Type::TokenVector => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::TokenVec(self.read_token_vec()?)
            }
            Type::StringVector => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::StringVec(self.read_string_vec()?)
            }
            Type::PathVector => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::PathVec(self.read_path_vec()?)
            }
            Type::DoubleVector => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::DoubleVec(self.reader.read_vec()?)
            }
            Type::LayerOffsetVector => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                let count = self.reader.read_count()?;
                let offsets = (0..count)
                    .map(|_| self.read_layer_offset())
                    .collect::<Result<Vec<_>>>()?;
                Value::LayerOffsetVec(offsets)
            }

            Type::Payload => {
                ensure!(!rep.is_inlined(), "{ty} can't be inlined");
                self.set_position(rep.payload())?;
                Value::Payload(self.read_payload()?)
            }
            Type::VariantSelectionMap => Value::VariantSelectionMap(self.read_variant_selection_map(rep)?),
            Type::TimeSamples => Value::TimeSamples(self.read_time_samples(rep)?),

            Type::ValueBlock => Value::ValueBlock,

            Type::Invalid
            | Type::Value
            | Type::UnregisteredValue
            | Type::UnregisteredValueListOp
            | Type::PathExpression => {
                bail!("Unsupported value type: {ty}")
            }
        };

        Ok(value)
    }

    /// Unpack an array-flagged rep.
    fn array_value(&mut self, ty: Type, rep: ValueRep) -> Result<sdf::Value> {
        use sdf::Value;

        let value = match ty {
            Type::Bool => {
                let raw: Vec<u8> = self.read_pod_array(rep)?;
                Value::BoolVec(raw.into_iter().map(|v| v != 0).collect())
            }
            Type::Uchar => Value::UcharVec(self.read_pod_array(rep)?),
            Type::Int => Value::IntVec(self.read_int_array(rep)?),
            Type::Uint => Value::UintVec(self.read_int_array(rep)?),
            Type::Int64 => Value::Int64Vec(self.read_int_array(rep)?),
            Type::Uint64 => Value::Uint64Vec(self.read_int_array(rep)?),

            Type::Half => {
                let bits = self.read_float_array::<u16, _>(rep, |i| f16::from_f32(i as f32).to_bits())?;
                Value::HalfVec(bits.into_iter().map(f16::from_bits).collect())
            }
            Type::Float => Value::FloatVec(self.read_float_array(rep, |i| i as f32)?),
            Type::Double => Value::DoubleVec(self.read_float_array(rep, |i| i as f64)?),
            Type::TimeCode => Value::TimeCodeVec(self.read_float_array(rep, |i| i as f64)?),

            Type::String => {
                self.set_position(rep.payload())?;
                Value::StringVec(self.read_string_vec()?)
            }
            Type::Token => {
                self.set_position(rep.payload())?;
                Value::TokenVec(self.read_token_vec()?)
            }
            Type::AssetPath => {
                self.set_position(rep.payload())?;
                Value::AssetPathVec(self.read_token_vec()?)
            }

            Type::Quath => {
                let raw: Vec<[u16; 4]> = self.read_pod_array(rep)?;
                Value::QuathVec(raw.into_iter().map(|q| q.map(f16::from_bits)).collect())
            }
            Type::Quatf => {
                let raw: Vec<[f32; 4]> = self.read_pod_array(rep)?;
                Value::QuatfVec(raw.into_iter().map(Quat::from_array).collect())
            }
            Type::Quatd => {
                let raw: Vec<[f64; 4]> = self.read_pod_array(rep)?;
                Value::QuatdVec(raw.into_iter().map(|q| DQuat::from_xyzw(q[0], q[1], q[2], q[3])).collect())
            }

            Type::Vec2h => {
                let raw: Vec<[u16; 2]> = self.read_pod_array(rep)?;
                Value::Vec2hVec(raw.into_iter().map(|v| v.map(f16::from_bits)).collect())
            }
            Type::Vec3h => {
                let raw: Vec<[u16; 3]> = self.read_pod_array(rep)?;
                Value::Vec3hVec(raw.into_iter().map(|v| v.map(f16::from_bits)).collect())
            }
            Type::Vec4h => {
                let raw: Vec<[u16; 4]> = self.read_pod_array(rep)?;
                Value::Vec4hVec(raw.into_iter().map(|v| v.map(f16::from_bits)).collect())
            }

            Type::Vec2f => Value::Vec2fVec(self.read_pod_array(rep)?),
            Type::Vec3f => Value::Vec3fVec(self.read_pod_array(rep)?),
            Type::Vec4f => Value::Vec4fVec(self.read_pod_array(rep)?),

            Type::Vec2d => Value::Vec2dVec(self.read_pod_array(rep)?),
            Type::Vec3d => Value::Vec3dVec(self.read_pod_array(rep)?),
            Type::Vec4d => Value::Vec4dVec(self.read_pod_array(rep)?),

            Type::Vec2i => Value::Vec2iVec(self.read_pod_array(rep)?),
            Type::Vec3i => Value::Vec3iVec(self.read_pod_array(rep)?),
            Type::Vec4i => Value::Vec4iVec(self.read_pod_array(rep)?),

            Type::Matrix2d => {
                let raw: Vec<[f64; 4]> = self.read_pod_array(rep)?;
                Value::Matrix2dVec(raw.iter().map(DMat2::from_cols_array).collect())
            }
            Type::Matrix3d => {
                let raw: Vec<[f64; 9]> = self.read_pod_array(rep)?;
                Value::Matrix3dVec(raw.iter().map(DMat3::from_cols_array).collect())
            }
            Type::Matrix4d => {
                let raw: Vec<[f64; 16]> = self.read_pod_array(rep)?;
                Value::Matrix4dVec(raw.iter().map(DMat4::from_cols_array).collect())
            }

            other => bail!("Unsupported array value type: {other}"),
        };

        Ok(value)
    }
}
