//! Hand the verified file to the user.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Copy `path` into `dir` under the same file name, returning the new path.
pub fn copy_into_dir(path: &Path, dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let dest = dir.join(name);
    fs::copy(path, &dest)
        .with_context(|| format!("copy {} to {}", path.display(), dest.display()))?;
    tracing::info!(path = %dest.display(), "verified file saved");
    Ok(dest)
}

/// Stream the contents of `path` into `out`.
pub fn write_to<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    io::copy(&mut file, out).context("write verified file")?;
    out.flush().context("flush output")?;
    Ok(())
}
