//! Artifact writing through capability-based directory handles.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use std::io::{self, Write};
use tracing::info;

/// Return `true` when `path` is the CLI sentinel meaning "write to stdout".
#[must_use]
pub(super) fn is_stdout_path(path: &Utf8Path) -> bool {
    path.as_str() == "-"
}

/// Write `contents` to `relative` beneath `dir`, creating parent directories.
pub(super) fn write_file_in(dir: &Dir, relative: &Utf8Path, contents: &str) -> Result<()> {
    if let Some(parent) = relative.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent)
            .with_context(|| format!("failed to create directory {parent}"))?;
    }
    let mut file = dir
        .create(relative)
        .with_context(|| format!("failed to create {relative}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {relative}"))?;
    file.flush()
        .with_context(|| format!("failed to flush {relative}"))?;
    Ok(())
}

/// Remove `relative` beneath `dir` if present; returns whether a file was
/// removed.
pub(super) fn remove_file_in(dir: &Dir, relative: &Utf8Path) -> Result<bool> {
    match dir.remove_file(relative) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove {relative}")),
    }
}

/// Open `path` as a directory, creating it first when missing.
pub(super) fn open_or_create_dir(path: &Utf8Path) -> Result<Dir> {
    Dir::create_ambient_dir_all(path, ambient_authority())
        .with_context(|| format!("failed to create directory {path}"))?;
    Dir::open_ambient_dir(path, ambient_authority())
        .with_context(|| format!("failed to open directory {path}"))
}

fn derive_dir_and_relative(path: &Utf8Path) -> Result<(Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = Dir::open_ambient_dir(".", ambient_authority())
            .context("failed to open the working directory")?;
        return Ok((dir, path.to_owned()));
    }
    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            Dir::open_ambient_dir(candidate, ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .with_context(|| format!("failed to derive a path relative to {base}"))?
        .to_owned();
    Ok((dir, relative))
}

/// Write `contents` to an arbitrary path.
pub(super) fn write_file(path: &Utf8Path, contents: &str) -> Result<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_file_in(&dir, &relative, contents)?;
    info!("wrote {path}");
    Ok(())
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Write `contents` to standard output, tolerating a closed pipe.
pub(super) fn write_stdout(contents: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    ignore_broken_pipe(stdout.write_all(contents.as_bytes()))
        .context("failed to write to standard output")?;
    ignore_broken_pipe(stdout.flush()).context("failed to flush standard output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, ensure};
    use rstest::rstest;

    fn utf8_tempdir() -> Result<(tempfile::TempDir, Utf8PathBuf)> {
        let tmp = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .map_err(|p| anyhow!("non UTF-8 path {}", p.display()))?;
        Ok((tmp, path))
    }

    #[rstest]
    #[case("-", true)]
    #[case("Makefile", false)]
    #[case("./-", false)]
    fn recognises_stdout_sentinel(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_stdout_path(Utf8Path::new(path)), expected);
    }

    #[rstest]
    fn writes_nested_absolute_path() -> Result<()> {
        let (_tmp, root) = utf8_tempdir()?;
        let target = root.join("ci/.drone.yml");
        write_file(&target, "---\n")?;
        ensure!(std::fs::read_to_string(&target)? == "---\n");
        Ok(())
    }

    #[rstest]
    fn creates_missing_output_directory() -> Result<()> {
        let (_tmp, root) = utf8_tempdir()?;
        let dir = open_or_create_dir(&root.join("out/gen"))?;
        write_file_in(&dir, Utf8Path::new("Makefile"), "all:\n")?;
        ensure!(std::fs::read_to_string(root.join("out/gen/Makefile"))? == "all:\n");
        Ok(())
    }

    #[rstest]
    fn removes_existing_file_and_ignores_missing_one() -> Result<()> {
        let (_tmp, root) = utf8_tempdir()?;
        let dir = open_or_create_dir(&root)?;
        write_file_in(&dir, Utf8Path::new("Dockerfile"), "FROM scratch\n")?;
        ensure!(remove_file_in(&dir, Utf8Path::new("Dockerfile"))?);
        ensure!(!root.join("Dockerfile").exists());
        ensure!(!remove_file_in(&dir, Utf8Path::new("Dockerfile"))?);
        Ok(())
    }
}
