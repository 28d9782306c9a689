//! Exhaustive squared-L2 vector index and its binary encoding.
//!
//! Layout (little-endian): magic `CRFI`, u32 version, u32 dimension,
//! u64 count, 16-byte generation id, then `count * dimension` f32 values.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::error::{IndexError, Result};

const MAGIC: &[u8; 4] = b"CRFI";
const FORMAT_VERSION: u32 = 1;

/// Position of a stored vector and its squared euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(dim: usize, vectors: usize) -> Self {
        Self {
            dim,
            data: Vec::with_capacity(dim * vectors),
        }
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one vector at position `len()`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `vector` has the wrong length.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.check_dim(vector.len())?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// The `k` stored vectors closest to `query`, closest first. Ties keep
    /// insertion order. Returns every vector when fewer than `k` are stored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dim(query.len())?;
        if k == 0 || self.dim == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_l2(v, query),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Serialize with the given generation id.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the sizes do not fit the header fields.
    pub fn write_to<W: Write>(&self, w: &mut W, generation: Uuid) -> Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&u32::try_from(self.dim)?.to_le_bytes())?;
        w.write_all(&u64::try_from(self.len())?.to_le_bytes())?;
        w.write_all(generation.as_bytes())?;
        for x in &self.data {
            w.write_all(&x.to_le_bytes())?;
        }
        Ok(())
    }

    /// Decode an index and the generation id it was written with.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Corrupt`] for a bad header or truncated payload.
    pub fn read_from<R: Read>(r: &mut R) -> Result<(Self, Uuid)> {
        let mut magic = [0u8; 4];
        read_exact(r, &mut magic)?;
        if &magic != MAGIC {
            return Err(IndexError::Corrupt("bad magic in vector index".into()));
        }
        let version = read_u32(r)?;
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported vector index version {version}"
            )));
        }
        let dim = usize::try_from(read_u32(r)?)?;
        let count = usize::try_from(read_u64(r)?)?;
        let mut id = [0u8; 16];
        read_exact(r, &mut id)?;

        let total = dim
            .checked_mul(count)
            .ok_or_else(|| IndexError::Corrupt("vector index size overflow".into()))?;
        let mut data = Vec::with_capacity(total.min(1 << 20));
        let mut buf = [0u8; 4];
        for _ in 0..total {
            read_exact(r, &mut buf)?;
            data.push(f32::from_le_bytes(buf));
        }

        let mut trailing = [0u8; 1];
        if r.read(&mut trailing)? != 0 {
            return Err(IndexError::Corrupt("trailing bytes in vector index".into()));
        }

        Ok((Self { dim, data }, Uuid::from_bytes(id)))
    }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual == self.dim {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual,
            })
        }
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            IndexError::Corrupt("vector index is truncated".into())
        } else {
            IndexError::Io(e)
        }
    })
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
