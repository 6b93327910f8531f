//! Reading integer SCALAR accessors.

use crate::error::{IoError, Result};
use crate::gltf::{component_size, Gltf, TYPE_SCALAR};

/// Read accessor `index` as unsigned integers widened to `u32`.
///
/// Accepts UNSIGNED_BYTE, UNSIGNED_SHORT and UNSIGNED_INT components and
/// honours the accessor and buffer view offsets and the view's byte stride.
/// An accessor without a buffer view reads as zeros; a `count` too large to
/// allocate is `InvalidData`.
pub fn read_scalar_u32(gltf: &Gltf, buffers: &[Vec<u8>], index: usize) -> Result<Vec<u32>> {
    let accessor = gltf
        .accessors
        .get(index)
        .ok_or_else(|| IoError::InvalidData(format!("accessor {index} does not exist")))?;

    if accessor.accessor_type != TYPE_SCALAR {
        return Err(IoError::Unsupported(format!(
            "accessor {index} has type {}, expected SCALAR",
            accessor.accessor_type
        )));
    }
    let size = component_size(accessor.component_type).ok_or_else(|| {
        IoError::Unsupported(format!(
            "accessor {index} has component type {}, expected an unsigned integer",
            accessor.component_type
        ))
    })?;

    let Some(view_index) = accessor.buffer_view else {
        let mut zeros = Vec::new();
        zeros.try_reserve_exact(accessor.count).map_err(|_| {
            IoError::InvalidData(format!(
                "accessor {index} declares {} elements without a buffer view",
                accessor.count
            ))
        })?;
        zeros.resize(accessor.count, 0);
        return Ok(zeros);
    };
    let view = gltf
        .buffer_views
        .get(view_index)
        .ok_or_else(|| IoError::InvalidData(format!("buffer view {view_index} does not exist")))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| IoError::InvalidData(format!("buffer {} does not exist", view.buffer)))?;

    let view_end = view
        .byte_offset
        .checked_add(view.byte_length)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| {
            IoError::InvalidData(format!("buffer view {view_index} exceeds its buffer"))
        })?;
    let data = &buffer[view.byte_offset..view_end];
    let stride = view.byte_stride.unwrap_or(size);

    (0..accessor.count)
        .map(|i| {
            let start = i
                .checked_mul(stride)
                .and_then(|o| o.checked_add(accessor.byte_offset))
                .filter(|start| start.checked_add(size).is_some_and(|end| end <= data.len()))
                .ok_or_else(|| {
                    IoError::InvalidData(format!(
                        "accessor {index} element {i} lies outside buffer view {view_index}"
                    ))
                })?;
            let bytes = &data[start..start + size];
            Ok(match size {
                1 => u32::from(bytes[0]),
                2 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
                _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            })
        })
        .collect()
}
