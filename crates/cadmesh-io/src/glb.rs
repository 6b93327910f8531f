//! Binary glTF container.
//!
//! ```text
//! header  magic "glTF" | version 2 | total length
//! chunk   length | "JSON" | UTF-8 JSON, space padded to 4 bytes
//! chunk   length | "BIN\0" | binary payload, zero padded to 4 bytes (optional)
//! ```

use base64::Engine;
use serde_json::Value;
use tracing::trace;

use crate::error::{IoError, Result};
use crate::gltf::Gltf;

/// GLB magic number.
pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
/// GLB version 2.
pub const GLB_VERSION: u32 = 2;
/// JSON chunk type.
pub const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON" in little-endian
/// Binary chunk type.
pub const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0" in little-endian

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The chunks of a GLB file, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct GlbChunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

impl GlbChunks<'_> {
    /// Parse the JSON chunk as a generic document.
    pub fn document(&self) -> Result<Value> {
        Ok(serde_json::from_slice(self.json)?)
    }

    /// Parse the JSON chunk as a typed glTF document.
    pub fn gltf(&self) -> Result<Gltf> {
        Ok(serde_json::from_slice(self.json)?)
    }
}

/// Round `len` up to the next multiple of 4.
pub fn align4(len: usize) -> usize {
    (len + 3) & !3
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| IoError::parse_at("unexpected end of GLB data", offset))
}

/// Whether `data` starts with the GLB magic.
pub fn is_glb(data: &[u8]) -> bool {
    read_u32(data, 0).is_ok_and(|magic| magic == GLB_MAGIC)
}

/// Split a GLB file into its JSON and binary chunks.
pub fn read_glb(data: &[u8]) -> Result<GlbChunks<'_>> {
    if data.len() < HEADER_LEN {
        return Err(IoError::InvalidData("GLB file too short".into()));
    }

    let magic = read_u32(data, 0)?;
    let version = read_u32(data, 4)?;
    let length = read_u32(data, 8)? as usize;

    if magic != GLB_MAGIC {
        return Err(IoError::InvalidData("invalid GLB magic".into()));
    }
    if version != GLB_VERSION {
        return Err(IoError::Unsupported(format!("GLB version {version} not supported")));
    }
    if length > data.len() {
        return Err(IoError::InvalidData(format!(
            "GLB header declares {length} bytes but only {} are present",
            data.len()
        )));
    }
    let data = &data[..length];

    let mut offset = HEADER_LEN;
    let mut json = None;
    let mut bin = None;

    while offset + CHUNK_HEADER_LEN <= data.len() {
        let chunk_length = read_u32(data, offset)? as usize;
        let chunk_type = read_u32(data, offset + 4)?;
        offset += CHUNK_HEADER_LEN;

        let end = offset
            .checked_add(chunk_length)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| IoError::parse_at("GLB chunk extends past end of file", offset))?;
        let chunk = &data[offset..end];
        trace!(chunk_type, chunk_length, offset, "GLB chunk");

        match chunk_type {
            GLB_CHUNK_JSON if json.is_none() => json = Some(chunk),
            GLB_CHUNK_BIN if bin.is_none() => bin = Some(chunk),
            _ => {}
        }

        offset = align4(end);
    }

    let json = json.ok_or_else(|| IoError::MissingRequired("GLB JSON chunk".into()))?;
    Ok(GlbChunks { json, bin })
}

/// Assemble a GLB file from a document and its binary payload.
///
/// The BIN chunk is omitted when `bin` is empty.
pub fn write_glb(document: &Value, bin: &[u8]) -> Result<Vec<u8>> {
    let json_bytes = serde_json::to_vec(document)?;

    let padded_json_len = align4(json_bytes.len());
    let padded_bin_len = align4(bin.len());
    let has_bin = !bin.is_empty();

    let total_size = HEADER_LEN
        + CHUNK_HEADER_LEN
        + padded_json_len
        + if has_bin { CHUNK_HEADER_LEN + padded_bin_len } else { 0 };
    let total_u32 = u32::try_from(total_size)
        .map_err(|_| IoError::Unsupported(format!("GLB of {total_size} bytes exceeds 4 GiB")))?;

    let mut output = Vec::with_capacity(total_size);

    output.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    output.extend_from_slice(&GLB_VERSION.to_le_bytes());
    output.extend_from_slice(&total_u32.to_le_bytes());

    output.extend_from_slice(&(padded_json_len as u32).to_le_bytes());
    output.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    output.extend_from_slice(&json_bytes);
    output.resize(output.len() + padded_json_len - json_bytes.len(), b' ');

    if has_bin {
        output.extend_from_slice(&(padded_bin_len as u32).to_le_bytes());
        output.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
        output.extend_from_slice(bin);
        output.resize(output.len() + padded_bin_len - bin.len(), 0);
    }

    Ok(output)
}

/// Load every buffer of `gltf`.
///
/// Buffer 0 without a URI is the GLB binary chunk; other buffers must be
/// base64 data URIs. Empty buffers need no data.
pub fn load_buffers(gltf: &Gltf, bin: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::with_capacity(gltf.buffers.len());

    for (i, buffer) in gltf.buffers.iter().enumerate() {
        let data = match (&buffer.uri, bin) {
            (None, _) if buffer.byte_length == 0 => Vec::new(),
            (None, Some(bin)) if i == 0 => bin[..buffer.byte_length.min(bin.len())].to_vec(),
            (None, None) if i == 0 => {
                return Err(IoError::MissingRequired("GLB binary chunk for buffer 0".into()))
            }
            (None, _) => return Err(IoError::InvalidData(format!("buffer {i} has no data"))),
            (Some(uri), _) => decode_data_uri(uri)?,
        };
        if data.len() < buffer.byte_length {
            return Err(IoError::InvalidData(format!(
                "buffer {i} holds {} bytes, expected {}",
                data.len(),
                buffer.byte_length
            )));
        }
        buffers.push(data);
    }

    Ok(buffers)
}

/// Decode a `data:[<mediatype>];base64,<data>` URI.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Err(IoError::Unsupported(format!(
            "external buffer URIs not supported: {uri}"
        )));
    };
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| IoError::InvalidData("invalid data URI".into()))?;

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| IoError::InvalidData(format!("base64 decode error: {e}")))
    } else {
        Err(IoError::Unsupported("URL-encoded data URIs not supported".into()))
    }
}
