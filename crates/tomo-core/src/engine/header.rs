//! MRC header normalisation for volumes written by RELION.
//!
//! RELION may write reconstructed tomograms with the image-stack space group, which makes
//! downstream readers treat them as a stack of 2D images. Normalising marks the file as a
//! single volume without touching its data.

use crate::core::utils::paths::has_mrc_extension;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const HEADER_LEN: usize = 1024;
const NZ_OFFSET: usize = 8;
const MZ_OFFSET: usize = 36;
const ISPG_OFFSET: usize = 88;
const MACHST_OFFSET: usize = 212;
const VOLUME_SPACE_GROUP: i32 = 1;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File is {0} bytes long, shorter than an MRC header")]
    Truncated(u64),

    #[error("Invalid dimensions {nx}x{ny}x{nz}")]
    InvalidDimensions { nx: i32, ny: i32, nz: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Reads the machine stamp; `0x11 0x11` denotes big-endian, anything else little-endian.
    fn from_machine_stamp(header: &[u8]) -> Self {
        if header[MACHST_OFFSET] == 0x11 && header[MACHST_OFFSET + 1] == 0x11 {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    fn read_i32(self, header: &[u8], offset: usize) -> i32 {
        let bytes = [
            header[offset],
            header[offset + 1],
            header[offset + 2],
            header[offset + 3],
        ];
        match self {
            ByteOrder::Little => i32::from_le_bytes(bytes),
            ByteOrder::Big => i32::from_be_bytes(bytes),
        }
    }

    fn write_i32(self, header: &mut [u8], offset: usize, value: i32) {
        let bytes = match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        header[offset..offset + 4].copy_from_slice(&bytes);
    }
}

/// Marks an MRC file as a single volume and returns its `[nx, ny, nz]` dimensions.
///
/// Files without an `.mrc` or `.map` extension are left alone and yield `None`.
pub fn fix_volume(path: &Path) -> Result<Option<[usize; 3]>, HeaderError> {
    if !has_mrc_extension(path) {
        debug!("Skipping header normalisation of non-MRC file {:?}", path);
        return Ok(None);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len < HEADER_LEN as u64 {
        return Err(HeaderError::Truncated(len));
    }

    let mut header = [0u8; HEADER_LEN];
    file.read_exact(&mut header)?;

    let order = ByteOrder::from_machine_stamp(&header);
    let nx = order.read_i32(&header, 0);
    let ny = order.read_i32(&header, 4);
    let nz = order.read_i32(&header, NZ_OFFSET);
    if nx <= 0 || ny <= 0 || nz <= 0 {
        return Err(HeaderError::InvalidDimensions { nx, ny, nz });
    }

    order.write_i32(&mut header, ISPG_OFFSET, VOLUME_SPACE_GROUP);
    order.write_i32(&mut header, MZ_OFFSET, nz);

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)?;
    file.flush()?;

    debug!("Normalised volume header of {:?} ({}x{}x{})", path, nx, ny, nz);
    Ok(Some([nx as usize, ny as usize, nz as usize]))
}
