//! Readers for the IDX binary format used by MNIST, and the 32×32 loader
//! built on top of them.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::fs;
use std::path::Path;

use log::info;

use crate::data::dataset::{DataSet, Datasets};
use crate::error::{Error, Result};
use crate::network::model::NUM_CLASSES;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Side length the loader pads every image to.
pub const PADDED_SIDE: usize = 32;

/// Raw uint8 images parsed from an IDX3 file.
#[derive(Debug, Clone)]
pub struct IdxImages {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
    pub pixels: Vec<u8>,
}

fn check_magic(bytes: &[u8], what: &str, dims: u8) -> Result<()> {
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::Idx(format!(
            "{} file: bytes 0-1 must be 0x00 0x00 (reserved), got 0x{:02X} 0x{:02X}.",
            what, bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::Idx(format!(
            "{} file: byte 2 (dtype) must be 0x08 (uint8), got 0x{:02X}.",
            what, bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(Error::Idx(format!(
            "{} file: byte 3 (dimensions) must be {}, got {}.",
            what, dims, bytes[3]
        )));
    }
    Ok(())
}

fn be_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]) as usize
}

/// Parses an IDX3 image file.
pub fn parse_images(bytes: &[u8]) -> Result<IdxImages> {
    if bytes.len() < 16 {
        return Err(Error::Idx(format!(
            "image file too short: expected at least 16 header bytes, got {}.",
            bytes.len()
        )));
    }
    check_magic(bytes, "image", 0x03)?;

    let count = be_u32(bytes, 4);
    let rows = be_u32(bytes, 8);
    let cols = be_u32(bytes, 12);

    let needed = rows
        .checked_mul(cols)
        .and_then(|px| px.checked_mul(count))
        .ok_or_else(|| Error::Idx("image file: declared size overflows usize.".to_owned()))?;
    if bytes.len() - 16 < needed {
        return Err(Error::Idx(format!(
            "image file too short: header declares {} images of {}×{} pixels \
             ({} data bytes), but only {} follow the header.",
            count,
            rows,
            cols,
            needed,
            bytes.len() - 16
        )));
    }

    Ok(IdxImages {
        count,
        rows,
        cols,
        pixels: bytes[16..16 + needed].to_vec(),
    })
}

/// Parses an IDX1 label file.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    if bytes.len() < 8 {
        return Err(Error::Idx(format!(
            "label file too short: expected at least 8 header bytes, got {}.",
            bytes.len()
        )));
    }
    check_magic(bytes, "label", 0x01)?;

    let count = be_u32(bytes, 4);
    if bytes.len() - 8 < count {
        return Err(Error::Idx(format!(
            "label file too short: header declares {} labels but only {} bytes follow.",
            count,
            bytes.len() - 8
        )));
    }
    Ok(bytes[8..8 + count].iter().map(|&b| b as usize).collect())
}

/// Normalizes pixels to `[0, 1]` and centers each image in a `side × side`
/// zero frame. Images larger than the frame are rejected.
pub fn pad_images(images: &IdxImages, side: usize) -> Result<Vec<f64>> {
    if images.rows > side || images.cols > side {
        return Err(Error::Idx(format!(
            "cannot pad {}×{} images into a {}×{} frame.",
            images.rows, images.cols, side, side
        )));
    }
    let top = (side - images.rows) / 2;
    let left = (side - images.cols) / 2;
    let n_pixels = images.rows * images.cols;

    let mut out = vec![0.0; images.count * side * side];
    for (frame, image) in out
        .chunks_exact_mut(side * side)
        .zip(images.pixels.chunks_exact(n_pixels.max(1)))
    {
        for r in 0..images.rows {
            for c in 0..images.cols {
                frame[(top + r) * side + left + c] = image[r * images.cols + c] as f64 / 255.0;
            }
        }
    }
    Ok(out)
}

/// Builds one partition from an image/label file pair.
pub fn load_partition(image_bytes: &[u8], label_bytes: &[u8]) -> Result<DataSet> {
    let images = parse_images(image_bytes)?;
    let labels = parse_labels(label_bytes)?;
    if labels.len() != images.count {
        return Err(Error::Idx(format!(
            "file mismatch: image file declares {} items but label file declares {}.",
            images.count,
            labels.len()
        )));
    }
    let pixels = pad_images(&images, PADDED_SIDE)?;
    DataSet::new(pixels, vec![PADDED_SIDE, PADDED_SIDE], labels, NUM_CLASSES)
}

/// Loads the four standard MNIST files from `dir`, zero-padding the 28×28
/// digits to 32×32.
pub fn load_mnist_32x32(dir: impl AsRef<Path>) -> Result<Datasets> {
    let dir = dir.as_ref();
    let read = |name: &str| -> Result<Vec<u8>> {
        fs::read(dir.join(name)).map_err(Error::from)
    };

    let train = load_partition(&read(TRAIN_IMAGES)?, &read(TRAIN_LABELS)?)?;
    let test = load_partition(&read(TEST_IMAGES)?, &read(TEST_LABELS)?)?;
    info!(
        "Loaded {} training and {} test images from {}",
        train.num_examples(),
        test.num_examples(),
        dir.display()
    );
    Ok(Datasets { train, test })
}
