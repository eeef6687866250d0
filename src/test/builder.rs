//! Assembles synthetic metadata blobs for tests.
//!
//! Only uses `std`, so integration tests can pull it in by path. Every heap and table index
//! is written with 2 bytes, which holds as long as tests keep their heaps and tables small.

use std::collections::BTreeMap;

const TYPEDEF: u8 = 0x02;
const TYPEREF: u8 = 0x01;
const MODULE: u8 = 0x00;
const FIELD: u8 = 0x04;
const METHODDEF: u8 = 0x06;
const PARAM: u8 = 0x08;
const MEMBERREF: u8 = 0x0A;
const STANDALONESIG: u8 = 0x11;

/// Where method bodies start in [`MetadataBuilder::build_image`], RVA 0 means "no body"
const BODY_BASE: u32 = 0x10;

/// Incrementally built metadata: heaps, table rows and extra streams
pub struct MetadataBuilder {
    version: String,
    strings: Vec<u8>,
    blobs: Vec<u8>,
    user_strings: Vec<u8>,
    guids: Vec<u8>,
    rows: BTreeMap<u8, Vec<Vec<u8>>>,
    extra: Vec<(String, Vec<u8>)>,
    bodies: Vec<u8>,
    tables_name: &'static str,
    with_tables: bool,
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

/// ECMA-335 II.23.2 compressed unsigned integer
pub fn compressed(value: u32) -> Vec<u8> {
    if value < 0x80 {
        vec![value as u8]
    } else if value < 0x4000 {
        vec![0x80 | (value >> 8) as u8, value as u8]
    } else {
        (0xC000_0000 | value).to_be_bytes().to_vec()
    }
}

impl MetadataBuilder {
    /// An empty image: empty heaps and no tables
    pub fn new() -> Self {
        MetadataBuilder {
            version: "v4.0.30319".to_string(),
            strings: vec![0],
            blobs: vec![0],
            user_strings: vec![0],
            guids: Vec::new(),
            rows: BTreeMap::new(),
            extra: Vec::new(),
            bodies: Vec::new(),
            tables_name: "#~",
            with_tables: true,
        }
    }

    /// Add `value` to `#Strings`, returns its offset
    pub fn string(&mut self, value: &str) -> u16 {
        let offset = self.strings.len() as u16;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        offset
    }

    /// Add `value` to `#Blob`, returns its offset
    pub fn blob(&mut self, value: &[u8]) -> u16 {
        let offset = self.blobs.len() as u16;
        self.blobs.extend(compressed(value.len() as u32));
        self.blobs.extend_from_slice(value);
        offset
    }

    /// Add `value` to `#US`, returns its offset
    pub fn user_string(&mut self, value: &str) -> u32 {
        let offset = self.user_strings.len() as u32;
        let units: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.user_strings.extend(compressed(units.len() as u32 + 1));
        self.user_strings.extend(units);
        self.user_strings.push(0);
        offset
    }

    /// Add a GUID to `#GUID`, returns its 1-based index
    pub fn guid(&mut self, value: [u8; 16]) -> u16 {
        self.guids.extend_from_slice(&value);
        (self.guids.len() / 16) as u16
    }

    /// Append a raw row to `table`, returns its 1-based row number
    pub fn row(&mut self, table: u8, data: Vec<u8>) -> u32 {
        let rows = self.rows.entry(table).or_default();
        rows.push(data);
        rows.len() as u32
    }

    fn cells(cells: &[u16]) -> Vec<u8> {
        cells.iter().flat_map(|cell| cell.to_le_bytes()).collect()
    }

    /// A `Module` row
    pub fn module(&mut self, name: u16, mvid: u16) -> u32 {
        self.row(MODULE, Self::cells(&[0, name, mvid, 0, 0]))
    }

    /// A `TypeRef` row, `scope` is the raw coded `ResolutionScope`
    pub fn typeref(&mut self, scope: u16, name: u16, namespace: u16) -> u32 {
        self.row(TYPEREF, Self::cells(&[scope, name, namespace]))
    }

    /// A `TypeDef` row, `extends` is the raw coded `TypeDefOrRef`
    pub fn typedef(
        &mut self,
        flags: u32,
        name: u16,
        namespace: u16,
        extends: u16,
        field_list: u16,
        method_list: u16,
    ) -> u32 {
        let mut data = flags.to_le_bytes().to_vec();
        data.extend(Self::cells(&[name, namespace, extends, field_list, method_list]));
        self.row(TYPEDEF, data)
    }

    /// A `Field` row
    pub fn field(&mut self, flags: u16, name: u16, signature: u16) -> u32 {
        self.row(FIELD, Self::cells(&[flags, name, signature]))
    }

    /// A `MethodDef` row
    pub fn method(
        &mut self,
        rva: u32,
        flags: u16,
        name: u16,
        signature: u16,
        param_list: u16,
    ) -> u32 {
        let mut data = rva.to_le_bytes().to_vec();
        data.extend(Self::cells(&[0, flags, name, signature, param_list]));
        self.row(METHODDEF, data)
    }

    /// A `Param` row
    pub fn param(&mut self, flags: u16, sequence: u16, name: u16) -> u32 {
        self.row(PARAM, Self::cells(&[flags, sequence, name]))
    }

    /// A `MemberRef` row, `class` is the raw coded `MemberRefParent`
    pub fn member_ref(&mut self, class: u16, name: u16, signature: u16) -> u32 {
        self.row(MEMBERREF, Self::cells(&[class, name, signature]))
    }

    /// A `StandAloneSig` row
    pub fn standalone_sig(&mut self, signature: u16) -> u32 {
        self.row(STANDALONESIG, Self::cells(&[signature]))
    }

    /// Store a method body, returns its RVA within [`MetadataBuilder::build_image`]
    pub fn body(&mut self, body: &[u8]) -> u32 {
        pad4(&mut self.bodies);
        let rva = BODY_BASE + self.bodies.len() as u32;
        self.bodies.extend_from_slice(body);
        rva
    }

    /// Add a stream with arbitrary name and content after the regular ones
    pub fn extra_stream(&mut self, name: &str, data: &[u8]) {
        self.extra.push((name.to_string(), data.to_vec()));
    }

    /// Name the tables stream `#-`
    pub fn uncompressed(&mut self) {
        self.tables_name = "#-";
    }

    /// Leave the tables stream out
    pub fn without_tables(&mut self) {
        self.with_tables = false;
    }

    fn tables_stream(&self) -> Vec<u8> {
        let mut valid = 0_u64;
        for table in self.rows.keys() {
            valid |= 1 << table;
        }

        let mut data = vec![0, 0, 0, 0, 2, 0, 0, 1];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        for rows in self.rows.values() {
            data.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        }
        for rows in self.rows.values() {
            for row in rows {
                data.extend_from_slice(row);
            }
        }
        data
    }

    /// The metadata blob, starting with the root signature
    pub fn build(&self) -> Vec<u8> {
        let mut streams: Vec<(&str, Vec<u8>)> = Vec::new();
        if self.with_tables {
            streams.push((self.tables_name, self.tables_stream()));
        }
        streams.push(("#Strings", self.strings.clone()));
        streams.push(("#US", self.user_strings.clone()));
        if !self.guids.is_empty() {
            streams.push(("#GUID", self.guids.clone()));
        }
        streams.push(("#Blob", self.blobs.clone()));
        for (name, data) in &self.extra {
            streams.push((name.as_str(), data.clone()));
        }

        let mut version = self.version.as_bytes().to_vec();
        version.push(0);
        pad4(&mut version);

        let directory_size: usize = streams
            .iter()
            .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
            .sum();
        let mut offset = 16 + version.len() + 4 + directory_size;

        let mut root = Vec::new();
        root.extend_from_slice(&0x424A_5342_u32.to_le_bytes());
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&0_u32.to_le_bytes());
        root.extend_from_slice(&(version.len() as u32).to_le_bytes());
        root.extend_from_slice(&version);
        root.extend_from_slice(&0_u16.to_le_bytes());
        root.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut body = Vec::new();
        for (name, data) in &mut streams {
            pad4(data);
            root.extend_from_slice(&(offset as u32).to_le_bytes());
            root.extend_from_slice(&(data.len() as u32).to_le_bytes());
            let mut name = name.as_bytes().to_vec();
            name.push(0);
            pad4(&mut name);
            root.extend_from_slice(&name);

            offset += data.len();
            body.extend_from_slice(data);
        }

        root.extend(body);
        root
    }

    /// Method bodies followed by the metadata, returns the image with the metadata's RVA and
    /// size. Load it with a flat accessor, where RVAs are file offsets.
    pub fn build_image(&self) -> (Vec<u8>, u32, u32) {
        let mut image = vec![0; BODY_BASE as usize];
        image.extend_from_slice(&self.bodies);
        pad4(&mut image);

        let metadata = self.build();
        let rva = image.len() as u32;
        let size = metadata.len() as u32;
        image.extend(metadata);

        (image, rva, size)
    }
}
