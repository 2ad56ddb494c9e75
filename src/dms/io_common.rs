// Primitives shared by the file-reading stages.

use std::fs;
use std::path::Path;

use encoding_rs::SHIFT_JIS;
use log::debug;
use snafu::prelude::*;

use crate::dms::{DmsResult, ReadInputSnafu};

/// Reads the raw export as text, converting from Shift-JIS when the bytes are
/// not already valid UTF-8. The upstream export is Shift-JIS encoded; a file
/// that has already been converted passes through unchanged.
pub fn read_input_text(path: &Path) -> DmsResult<String> {
    let bytes = fs::read(path).context(ReadInputSnafu {
        path: path.display().to_string(),
    })?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(err) => {
            debug!("read_input_text: {:?}: not UTF-8, decoding as Shift-JIS", path);
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = SHIFT_JIS.decode(&bytes);
            if had_errors {
                whatever!(
                    "Input file {:?} is neither valid UTF-8 nor valid Shift-JIS",
                    path
                );
            }
            Ok(decoded.into_owned())
        }
    }
}
