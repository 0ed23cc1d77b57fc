//! Little-endian binary reader for the `Haven Mapfile 1` format.

use crate::error::HmapError;
use crate::types::{HmapData, HmapGrid, HmapMarker, Tileset};
use crate::{GRID_CELLS, MAGIC};

type Result<T> = std::result::Result<T, HmapError>;

/// Decode a complete HMap byte buffer.
pub fn decode_hmap(bytes: &[u8]) -> Result<HmapData> {
    let mut r = Cursor::new(bytes);
    r.expect_magic()?;

    let segment_count = r.read_i32()?;
    if segment_count < 0 {
        return Err(HmapError::Truncated { offset: r.pos });
    }

    let mut grids = Vec::new();
    for _ in 0..segment_count {
        let segment_id = r.read_i64()?;
        let grid_count = r.read_i32()?;
        if grid_count < 0 {
            return Err(HmapError::Truncated { offset: r.pos });
        }
        for _ in 0..grid_count {
            grids.push(r.read_grid(segment_id)?);
        }
    }

    let markers = r.read_markers()?;

    Ok(HmapData { grids, markers })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(HmapError::Truncated { offset: self.pos });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn expect_magic(&mut self) -> Result<()> {
        let head = self.take(MAGIC.len())?;
        if head != MAGIC.as_slice() {
            return Err(HmapError::BadSignature);
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed (u32 byte count) UTF-8 string.
    fn read_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| HmapError::InvalidString { offset })
    }

    fn read_tilesets(&mut self) -> Result<Vec<Tileset>> {
        let count = self.read_u32()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(Tileset {
                resource_name: self.read_string()?,
            });
        }
        Ok(out)
    }

    fn read_grid(&mut self, segment_id: i64) -> Result<HmapGrid> {
        let tile_x = self.read_i32()?;
        let tile_y = self.read_i32()?;
        let tilesets = self.read_tilesets()?;

        let raw = self.take(GRID_CELLS)?;
        let tile_indices = raw.to_vec();

        let mut z_map = Vec::with_capacity(GRID_CELLS);
        for _ in 0..GRID_CELLS {
            z_map.push(self.read_f32()?);
        }

        Ok(HmapGrid {
            segment_id,
            tile_x,
            tile_y,
            tile_indices,
            z_map,
            tilesets,
        })
    }

    fn read_markers(&mut self) -> Result<Vec<HmapMarker>> {
        if self.remaining() < 4 {
            return Ok(Vec::new());
        }
        let count = self.read_u32()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let kind = self.read_u8()?;
            let object_id = self.read_u64()?;
            let tile_x = self.read_i32()?;
            let tile_y = self.read_i32()?;
            let name = self.read_string()?;
            match kind {
                b'S' => {
                    let resource_name = self.read_string()?;
                    out.push(HmapMarker {
                        object_id,
                        tile_x,
                        tile_y,
                        name,
                        resource_name,
                    });
                }
                _ => {
                    // Unknown marker kind: skip, carrying no resource name.
                    tracing::debug!(kind, "skipping unknown HMap marker kind");
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    fn sample_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);

        buf.extend_from_slice(&1i32.to_le_bytes()); // segment count

        // one segment, one grid
        buf.extend_from_slice(&1i64.to_le_bytes()); // segment id
        buf.extend_from_slice(&1i32.to_le_bytes()); // grid count

        buf.extend_from_slice(&3i32.to_le_bytes()); // tile_x
        buf.extend_from_slice(&4i32.to_le_bytes()); // tile_y
        buf.extend_from_slice(&1u32.to_le_bytes()); // tileset count
        write_string(&mut buf, "gfx/tiles/grass");

        buf.extend(std::iter::repeat(0u8).take(GRID_CELLS)); // tile_indices
        for _ in 0..GRID_CELLS {
            buf.extend_from_slice(&0f32.to_le_bytes()); // z_map
        }

        // marker section: one surface marker
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(b'S');
        buf.extend_from_slice(&42u64.to_le_bytes());
        buf.extend_from_slice(&300i32.to_le_bytes());
        buf.extend_from_slice(&400i32.to_le_bytes());
        write_string(&mut buf, "My Thingwall");
        write_string(&mut buf, "gfx/terobjs/thingwall");

        buf
    }

    #[test]
    fn test_decode_roundtrip() {
        let bytes = sample_bytes();
        let data = decode_hmap(&bytes).unwrap();
        assert_eq!(data.grids.len(), 1);
        let g = &data.grids[0];
        assert_eq!(g.segment_id, 1);
        assert_eq!(g.tile_x, 3);
        assert_eq!(g.tile_y, 4);
        assert!(g.is_well_formed());
        assert_eq!(g.tilesets[0].resource_name, "gfx/tiles/grass");

        assert_eq!(data.markers.len(), 1);
        assert!(data.markers[0].is_thingwall());
        assert_eq!(data.markers[0].tile_x, 300);
    }

    #[test]
    fn test_bad_signature() {
        let bytes = b"not an hmap file at all......".to_vec();
        assert!(matches!(decode_hmap(&bytes), Err(HmapError::BadSignature)));
    }

    #[test]
    fn test_truncated() {
        let mut bytes = sample_bytes();
        bytes.truncate(bytes.len() - 50);
        assert!(matches!(
            decode_hmap(&bytes),
            Err(HmapError::Truncated { .. })
        ));
    }
}
