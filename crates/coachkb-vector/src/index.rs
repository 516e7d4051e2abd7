//! Exact inner-product index over a row-major `f32` matrix.
//!
//! File layout (little-endian): 8-byte magic, `u32` dim, `u64` rows, then
//! `rows * dim` `f32` values. Row `i` always belongs to document `i`.

use std::fs;
use std::path::Path;

use coachkb_core::error::{Error, Result};
use coachkb_embed::dot;

pub const INDEX_MAGIC: &[u8; 8] = b"CKBFLAT1";
const HEADER_LEN: usize = 8 + 4 + 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.len() {
            return None;
        }
        Some(&self.data[i * self.dim..(i + 1) * self.dim])
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim || self.dim == 0 {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Drops every row at or after `rows`.
    pub fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows * self.dim);
    }

    /// Exact top-`k` rows by inner product, best first; ties keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.is_empty() {
            return Ok(vec![]);
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut scores: Vec<(usize, f32)> = self.data.chunks_exact(self.dim).map(|row| dot(query, row)).enumerate().collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);
        Ok(scores)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + std::mem::size_of_val(self.data.as_slice()));
        bytes.extend_from_slice(INDEX_MAGIC);
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for &value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != INDEX_MAGIC {
            return Err(Error::Operation("not a flat index file".to_string()));
        }
        let dim = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut rows_raw = [0u8; 8];
        rows_raw.copy_from_slice(&bytes[12..20]);
        let rows = u64::from_le_bytes(rows_raw) as usize;

        let expected_len = rows
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| Error::Operation("flat index size overflow".to_string()))?;
        let body = &bytes[HEADER_LEN..];
        if body.len() != expected_len {
            return Err(Error::Operation(format!(
                "invalid flat index length: expected {expected_len} bytes, got {}",
                body.len()
            )));
        }
        let mut data = Vec::with_capacity(rows * dim);
        for chunk in body.chunks_exact(4) {
            let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if !value.is_finite() {
                return Err(Error::Operation("flat index contains non-finite values".to_string()));
            }
            data.push(value);
        }
        Ok(Self { dim, data })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_by_inner_product() {
        let mut index = FlatIndex::new(3);
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.6, 0.8, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(results[1].0, 1);
        assert!((results[1].1 - 0.6).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = FlatIndex::new(3);
        assert!(index.add(&[1.0, 0.0]).is_err());
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0], 1).is_err());
        assert!(FlatIndex::new(0).add(&[]).is_err());
    }

    #[test]
    fn bytes_round_trip_and_truncate() {
        let mut index = FlatIndex::new(2);
        index.add(&[0.5, -0.5]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored, index);

        index.truncate(1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.row(0), Some(&[0.5f32, -0.5][..]));
        assert_eq!(index.row(1), None);
    }

    #[test]
    fn empty_index_round_trips() {
        let empty = FlatIndex::new(0);
        let restored = FlatIndex::from_bytes(&empty.to_bytes()).unwrap();
        assert!(restored.is_empty());
        assert!(restored.search(&[1.0], 3).unwrap().is_empty());
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let mut index = FlatIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        let bytes = index.to_bytes();
        assert!(FlatIndex::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(FlatIndex::from_bytes(&bad_magic).is_err());
    }
}
