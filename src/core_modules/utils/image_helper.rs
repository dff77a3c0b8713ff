use crate::error::Result;
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode requested for output files before the umask applies, as `File::create` does.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o666;

/// Decodes the image at `path`, dropping any alpha channel.
pub fn load(path: &Path) -> Result<RgbImage> {
    let reader = image::ImageReader::new(BufReader::new(File::open(path)?)).with_guessed_format()?;
    Ok(reader.decode()?.to_rgb8())
}

/// Format implied by the extension of `path`, JPEG when there is none we know.
pub fn output_format(path: &Path) -> ImageFormat {
    ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg)
}

/// Encodes `image` next to `path` and renames it into place once encoding has
/// succeeded, so a failed run never leaves a partial file at `path`.
pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = staging_file(parent)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        image.write_to(&mut writer, output_format(path))?;
        writer.flush()?;
    }
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// Temp files default to owner-only; the renamed output should not be.
#[cfg(unix)]
fn staging_file(dir: &Path) -> Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;
    Ok(tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))
        .tempfile_in(dir)?)
}

#[cfg(not(unix))]
fn staging_file(dir: &Path) -> Result<NamedTempFile> {
    Ok(NamedTempFile::new_in(dir)?)
}
