use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compress the full contents of `source` into a zip at `archive_path`.
/// Entry names are relative to `source`; empty directories are preserved.
pub fn zip_dir(source: &Path, archive_path: &Path) -> Result<()> {
    let file = File::create(archive_path)
        .with_context(|| format!("failed to create {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);
    // Fastest deflate level: archives are staged locally and moved once,
    // so low latency beats ratio here.
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(1));

    add_dir(&mut zip, source, source, options)
        .with_context(|| format!("failed to compress {}", source.display()))?;

    zip.finish()
        .with_context(|| format!("failed to finalize {}", archive_path.display()))?;
    Ok(())
}

fn add_dir(
    zip: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: FileOptions,
) -> Result<()> {
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        let rel = path.strip_prefix(root)?;
        let name = rel.to_string_lossy().replace('\\', "/");
        if path.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
            add_dir(zip, root, &path, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut f =
                File::open(&path).with_context(|| format!("failed to read {}", path.display()))?;
            io::copy(&mut f, zip)?;
        }
    }
    Ok(())
}
