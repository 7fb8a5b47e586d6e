//! Image checksums

use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{Result, VerifyError};

/// MD5 of an image's decoded pixel buffer, as lowercase hex.
///
/// Only pixels count: file name, compression and metadata do not.
pub fn hexdigest_from_image(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|source| VerifyError::Checksum { path: path.to_path_buf(), source })?;
    Ok(format!("{:x}", Md5::digest(image.as_bytes())))
}
