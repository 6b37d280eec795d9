//! QR decoding backed by `rqrr`.

use log::debug;

use super::{DecodeError, DecodeOptions, Decoder, InversionAttempts};
use crate::capture::PixelBuffer;

#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn passes(inversion: InversionAttempts) -> &'static [bool] {
    match inversion {
        InversionAttempts::DontInvert => &[false],
        InversionAttempts::OnlyInvert => &[true],
        InversionAttempts::AttemptBoth => &[false, true],
    }
}

impl Decoder for QrDecoder {
    fn decode(
        &self,
        frame: &PixelBuffer,
        options: &DecodeOptions,
    ) -> Result<Option<String>, DecodeError> {
        if !frame.is_well_formed() {
            return Err(DecodeError::InvalidFrame(format!(
                "{}x{} {:?} with {} bytes",
                frame.width,
                frame.height,
                frame.format,
                frame.data.len()
            )));
        }
        if frame.width == 0 || frame.height == 0 {
            return Ok(None);
        }

        for &invert in passes(options.inversion) {
            let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
                frame.width as usize,
                frame.height as usize,
                |x, y| {
                    let luma = frame.luma_at(x as u32, y as u32);
                    if invert { 255 - luma } else { luma }
                },
            );
            for grid in prepared.detect_grids() {
                match grid.decode() {
                    Ok((_meta, content)) => return Ok(Some(content)),
                    Err(e) => debug!("QR grid found but not decodable: {:?}", e),
                }
            }
        }
        Ok(None)
    }
}
