use std::{fs::File, io::BufWriter, io::Write, path::Path};

use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

use crate::error::CliError;

#[inline]
fn rgb(color: u32) -> [u8; 3] {
    let [_, r, g, b] = color.to_be_bytes();
    [r, g, b]
}

/// Expand a frame of shade indices into packed RGB, repeating each pixel
/// `scale` times in both directions.
pub fn to_rgb(frame: &[u8], palette: &[u32; 4], scale: u32) -> Vec<u8> {
    let scale = scale.max(1) as usize;
    let colors = palette.map(rgb);
    let mut out = Vec::with_capacity(frame.len() * scale * scale * 3);
    for row in frame.chunks_exact(SCREEN_WIDTH) {
        let mut line = Vec::with_capacity(SCREEN_WIDTH * scale * 3);
        for &shade in row {
            let color = colors[(shade & 0x03) as usize];
            for _ in 0..scale {
                line.extend_from_slice(&color);
            }
        }
        for _ in 0..scale {
            out.extend_from_slice(&line);
        }
    }
    out
}

pub fn encode_png<W: Write>(
    writer: W,
    frame: &[u8],
    palette: &[u32; 4],
    scale: u32,
) -> Result<(), CliError> {
    let scale = scale.max(1);
    let width = SCREEN_WIDTH as u32 * scale;
    let height = SCREEN_HEIGHT as u32 * scale;

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&to_rgb(frame, palette, scale))?;
    png_writer.finish()?;
    Ok(())
}

pub fn write_png(path: &Path, frame: &[u8], palette: &[u32; 4], scale: u32) -> Result<(), CliError> {
    let file = File::create(path).map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    encode_png(BufWriter::new(file), frame, palette, scale)
}
