//! The loaded metadata of one image.
//!
//! [`MetadataImage`] ties the pieces together: it reads the metadata blob through an
//! [`ImageAccessor`], parses the root and stream directory, builds the [`HeapStore`] and the
//! [`TableSet`], and from then on is immutable. Everything handed out borrows from it.
//!
//! ```rust,no_run
//! use clrscope::{metadata::tables::MethodDef, MetadataImage};
//!
//! let image = MetadataImage::from_file(std::path::Path::new("tests/samples/app.dll"))?;
//! println!("metadata {}", image.root().version);
//!
//! for (index, method) in image.iter::<MethodDef>().enumerate() {
//!     let Ok(method) = method else { continue };
//!     match image.disassemble(index as u32) {
//!         Ok(code) => {
//!             println!("{}:", method.name);
//!             for instruction in code.instructions().flatten() {
//!                 println!("  {instruction}");
//!             }
//!         }
//!         Err(error) => eprintln!("{}: {error}", method.name),
//!     }
//! }
//! # Ok::<(), clrscope::Error>(())
//! ```

use std::path::Path;

use crate::{
    disassembler::MethodCode,
    file::{File, ImageAccessor, Memory},
    metadata::{
        config::LoaderConfig,
        cor20header::Cor20Header,
        root::Root,
        signatures::SignatureDecoder,
        streams::{HeapStore, StreamHeader},
        tables::{CodedReference, MethodDef, Row, RowProjection, TableId, TableSet},
    },
    Result,
};

/// Parsed metadata of an image: root, heaps and tables.
///
/// Immutable after construction and `Send + Sync`, so it can be shared between threads.
pub struct MetadataImage {
    accessor: Box<dyn ImageAccessor>,
    config: LoaderConfig,
    cor20: Option<Cor20Header>,
    root: Root,
    heaps: HeapStore,
    tables: TableSet,
    uncompressed: bool,
}

#[derive(Default)]
struct Streams<'a> {
    tables: Option<&'a StreamHeader>,
    strings: Option<&'a StreamHeader>,
    user_strings: Option<&'a StreamHeader>,
    blobs: Option<&'a StreamHeader>,
    guids: Option<&'a StreamHeader>,
}

impl<'a> Streams<'a> {
    fn classify(root: &'a Root, config: &LoaderConfig) -> Result<Streams<'a>> {
        let mut streams = Streams::default();

        for header in &root.stream_headers {
            let slot = match header.name.as_str() {
                "#~" | "#-" => &mut streams.tables,
                "#Strings" => &mut streams.strings,
                "#US" => &mut streams.user_strings,
                "#Blob" => &mut streams.blobs,
                "#GUID" => &mut streams.guids,
                name => {
                    if config.strict_stream_names {
                        return Err(malformed_error!("Unknown metadata stream - {}", name));
                    }

                    tracing::warn!("skipping unknown metadata stream {}", name);
                    continue;
                }
            };

            match *slot {
                Some(first) => tracing::warn!(
                    "duplicate metadata stream {}, keeping {} at {:#x}",
                    header.name,
                    first.name,
                    first.offset
                ),
                None => *slot = Some(header),
            }
        }

        Ok(streams)
    }
}

fn stream_data<'d>(metadata: &'d [u8], header: &StreamHeader) -> Result<&'d [u8]> {
    let start = header.offset as usize;
    let end = start.checked_add(header.size as usize);

    end.and_then(|end| metadata.get(start..end))
        .ok_or_else(|| malformed_error!("Stream {} exceeds the metadata", header.name))
}

impl MetadataImage {
    /// Load the metadata of the PE file at `path`
    ///
    /// # Errors
    /// Returns an error if the file is not a managed PE image or its metadata is malformed
    pub fn from_file(path: &Path) -> Result<MetadataImage> {
        Self::from_file_with_config(path, LoaderConfig::default())
    }

    /// Load the metadata of the PE file at `path` with `config`
    ///
    /// # Errors
    /// See [`MetadataImage::from_file`]
    pub fn from_file_with_config(path: &Path, config: LoaderConfig) -> Result<MetadataImage> {
        Self::from_pe(File::from_file(path)?, config)
    }

    /// Load the metadata of a PE image held in memory
    ///
    /// # Errors
    /// See [`MetadataImage::from_file`]
    pub fn from_mem(data: Vec<u8>) -> Result<MetadataImage> {
        Self::from_mem_with_config(data, LoaderConfig::default())
    }

    /// Load the metadata of a PE image held in memory with `config`
    ///
    /// # Errors
    /// See [`MetadataImage::from_file`]
    pub fn from_mem_with_config(data: Vec<u8>, config: LoaderConfig) -> Result<MetadataImage> {
        Self::from_pe(File::from_mem(data)?, config)
    }

    fn from_pe(file: File, config: LoaderConfig) -> Result<MetadataImage> {
        let (clr_rva, _) = file.clr()?;
        let cor20 = file.read_struct::<Cor20Header>(clr_rva)?;
        let metadata = cor20.metadata;

        Self::load(Box::new(file), Some(cor20), metadata.rva, metadata.size, config)
    }

    /// Load metadata of `metadata_size` bytes at `metadata_rva` of `accessor`.
    ///
    /// This is the entry point for images that are not PE files, e.g. a metadata blob wrapped
    /// in a [`Memory`], in which case the RVA is a plain offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageRead`] if the range is not readable, or
    /// [`crate::Error::Malformed`] if the root, the stream directory or the tables header is
    /// invalid
    pub fn from_accessor<A>(accessor: A, metadata_rva: u32, metadata_size: u32) -> Result<Self>
    where
        A: ImageAccessor + 'static,
    {
        Self::from_accessor_with_config(
            accessor,
            metadata_rva,
            metadata_size,
            LoaderConfig::default(),
        )
    }

    /// [`MetadataImage::from_accessor`] with `config`
    ///
    /// # Errors
    /// See [`MetadataImage::from_accessor`]
    pub fn from_accessor_with_config<A>(
        accessor: A,
        metadata_rva: u32,
        metadata_size: u32,
        config: LoaderConfig,
    ) -> Result<Self>
    where
        A: ImageAccessor + 'static,
    {
        Self::load(
            Box::new(accessor),
            None,
            metadata_rva,
            metadata_size,
            config,
        )
    }

    /// Load a bare metadata blob, starting with the root signature
    ///
    /// # Errors
    /// See [`MetadataImage::from_accessor`]
    pub fn from_metadata(metadata: Vec<u8>) -> Result<Self> {
        let size = u32::try_from(metadata.len())
            .map_err(|_| malformed_error!("Metadata blob of {} bytes", metadata.len()))?;
        Self::from_accessor(Memory::new(metadata), 0, size)
    }

    fn load(
        accessor: Box<dyn ImageAccessor>,
        cor20: Option<Cor20Header>,
        metadata_rva: u32,
        metadata_size: u32,
        config: LoaderConfig,
    ) -> Result<MetadataImage> {
        let metadata = accessor.read_bytes(metadata_rva, metadata_size)?;
        let root = Root::read(&metadata)?;

        let streams = Streams::classify(&root, &config)?;
        let Some(tables_header) = streams.tables else {
            return Err(malformed_error!("Image has no #~ or #- tables stream"));
        };

        let uncompressed = tables_header.name == "#-";
        if uncompressed {
            if !config.allow_uncompressed_tables {
                return Err(malformed_error!("Uncompressed #- tables stream is not allowed"));
            }
            tracing::warn!("image uses an uncompressed #- tables stream");
        }

        let heap = |header: Option<&StreamHeader>| -> Result<Option<Vec<u8>>> {
            header
                .map(|header| stream_data(&metadata, header).map(<[u8]>::to_vec))
                .transpose()
        };

        let heaps = HeapStore::new(
            heap(streams.strings)?,
            heap(streams.blobs)?,
            heap(streams.guids)?,
            heap(streams.user_strings)?,
        )?;
        let tables = TableSet::parse(stream_data(&metadata, tables_header)?)?;

        tracing::debug!(
            "loaded metadata {} with {} streams and {} tables",
            root.version,
            root.stream_headers.len(),
            tables.present().count()
        );

        Ok(MetadataImage {
            accessor,
            config,
            cor20,
            root,
            heaps,
            tables,
            uncompressed,
        })
    }

    /// The accessor the image was loaded from
    #[must_use]
    pub fn accessor(&self) -> &dyn ImageAccessor {
        self.accessor.as_ref()
    }

    /// The configuration the image was loaded with
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The CLR runtime header, `None` if the image was not loaded from a PE file
    #[must_use]
    pub fn cor20(&self) -> Option<&Cor20Header> {
        self.cor20.as_ref()
    }

    /// The metadata root and stream directory
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The heaps
    #[must_use]
    pub fn heaps(&self) -> &HeapStore {
        &self.heaps
    }

    /// The tables
    #[must_use]
    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// True if the tables were loaded from an unoptimized `#-` stream
    #[must_use]
    pub fn is_uncompressed(&self) -> bool {
        self.uncompressed
    }

    /// The row at the 0-based `index` of `T`'s table, projected to `T`
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidTableKind`] if the table is absent,
    /// [`crate::Error::RowIndexOutOfRange`] for a bad index, or the projection's error
    pub fn get<'a, T: RowProjection<'a>>(&'a self, index: u32) -> Result<T> {
        let row = self.tables.row(T::TABLE, index)?;
        T::project(&row, &self.heaps)
    }

    /// All rows of `T`'s table, projected to `T`. A row that fails to project yields its error
    /// without ending the iteration. An absent table yields nothing.
    pub fn iter<'a, T: RowProjection<'a> + 'a>(&'a self) -> impl Iterator<Item = Result<T>> + 'a {
        (0..self.tables.row_count(T::TABLE)).map(move |index| self.get::<T>(index))
    }

    /// The row a coded reference points to, `None` for a null reference
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the row does not exist
    pub fn resolve(&self, reference: &CodedReference) -> Result<Option<Row<'_>>> {
        self.tables.resolve(reference)
    }

    /// A signature decoder over `blob`, limited to the configured nesting depth
    #[must_use]
    pub fn signature_decoder<'b>(&self, blob: &'b [u8]) -> SignatureDecoder<'b> {
        SignatureDecoder::new(blob).with_max_depth(self.config.max_signature_depth)
    }

    /// Read and frame the body of the `MethodDef` at the 0-based `index` for disassembly.
    ///
    /// # Errors
    /// Returns an error if the row, its parameters or its body cannot be read. With
    /// [`LoaderConfig::validate_method_bodies`], a local signature token that does not address
    /// a `StandAloneSig` row, or an exception clause whose protected or handler range ends
    /// past the code, is rejected as [`crate::Error::Malformed`].
    pub fn disassemble(&self, index: u32) -> Result<MethodCode<'_>> {
        let method = self.get::<MethodDef>(index)?;
        let code = MethodCode::new(self, &method)?;

        if self.config.validate_method_bodies {
            let locals = code.body.local_var_sig_token;
            if !locals.is_null()
                && (locals.table_id() != Some(TableId::StandAloneSig)
                    || locals.row() == 0
                    || locals.row() > self.tables.row_count(TableId::StandAloneSig))
            {
                return Err(malformed_error!(
                    "Method {} declares invalid locals {}",
                    method.token,
                    locals
                ));
            }

            let code_size = code.body.size_code as u64;
            let within =
                |offset: u32, length: u32| u64::from(offset) + u64::from(length) <= code_size;
            for clause in &code.body.exception_handlers {
                if !within(clause.try_offset, clause.try_length)
                    || !within(clause.handler_offset, clause.handler_length)
                {
                    return Err(malformed_error!(
                        "Method {} has an exception clause outside its {} bytes of code",
                        method.token,
                        code_size
                    ));
                }
            }
        }

        Ok(code)
    }
}
