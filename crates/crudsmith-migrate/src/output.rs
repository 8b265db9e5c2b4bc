//! Output units: one generated source file per distinct entity file name.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crudsmith_core::render::CodeRenderer;
use crudsmith_core::schema::EntityDescriptor;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// A finished output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenUnit {
    /// File name requested by the entities.
    pub name: String,
    /// Where the unit was written.
    pub path: PathBuf,
    /// Entities rendered into it, in order.
    pub entities: Vec<String>,
}

struct OpenUnit {
    written: WrittenUnit,
    writer: BufWriter<File>,
}

/// Open output units under one directory.
///
/// Units stay open until [`OutputUnits::finish`], which flushes and syncs
/// each file, or [`OutputUnits::abandon`], which deletes them.
pub struct OutputUnits {
    dir: PathBuf,
    units: Vec<OpenUnit>,
}

impl OutputUnits {
    /// Creates an empty set of units under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            units: Vec::new(),
        }
    }

    /// Renders `entity` into the unit named by its `file_name`, opening the
    /// unit on first use.
    ///
    /// # Errors
    ///
    /// Fails if rendering fails or the file cannot be created or written.
    pub fn write_entity<R: CodeRenderer>(
        &mut self,
        renderer: &R,
        entity: &EntityDescriptor,
    ) -> Result<&Path> {
        let position = self
            .units
            .iter()
            .position(|u| u.written.name == entity.file_name);
        let code = renderer.render(entity, position.is_none())?;
        let index = match position {
            Some(index) => index,
            None => {
                let unit = self.open(&entity.file_name)?;
                self.units.push(unit);
                self.units.len() - 1
            }
        };

        let unit = &mut self.units[index];
        unit.writer.write_all(code.as_bytes())?;
        unit.written.entities.push(entity.name.clone());
        debug!(entity = %entity.name, path = %unit.written.path.display(), "Entity written");
        Ok(&unit.written.path)
    }

    /// Flushes and closes every unit.
    ///
    /// # Errors
    ///
    /// Fails on the first unit that cannot be flushed or synced.
    /// The failing unit and the ones after it are deleted.
    pub fn finish(self) -> Result<Vec<WrittenUnit>> {
        let mut written = Vec::with_capacity(self.units.len());
        let mut units = self.units.into_iter();
        while let Some(unit) = units.next() {
            let synced = match unit.writer.into_inner() {
                Ok(file) => file.sync_all(),
                Err(e) => {
                    let (error, writer) = e.into_parts();
                    drop(writer.into_parts());
                    Err(error)
                }
            };
            if let Err(e) = synced {
                warn!(path = %unit.written.path.display(), error = %e, "Flushing output unit failed");
                remove_partial(&unit.written.path);
                units.for_each(discard);
                return Err(e.into());
            }
            info!(
                path = %unit.written.path.display(),
                entities = unit.written.entities.len(),
                "Output unit written"
            );
            written.push(unit.written);
        }
        Ok(written)
    }

    /// Drops every unit without flushing it and deletes the files created
    /// so far.
    pub fn abandon(self) {
        self.units.into_iter().for_each(discard);
    }

    fn open(&self, name: &str) -> Result<OpenUnit> {
        let path = free_path(&self.dir, name);
        if path != self.dir.join(name) {
            warn!(
                requested = name,
                path = %path.display(),
                "Output file exists, writing beside it"
            );
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(OpenUnit {
            written: WrittenUnit {
                name: name.to_string(),
                path,
                entities: Vec::new(),
            },
            writer: BufWriter::new(file),
        })
    }
}

/// Closes the unit's file without flushing its buffer, then deletes it.
fn discard(unit: OpenUnit) {
    drop(unit.writer.into_parts());
    remove_partial(&unit.written.path);
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output unit"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output unit"),
    }
}

/// `dir/name` if free, else the first free `dir/<stem>_gen_<n>.rs`.
fn free_path(dir: &Path, name: &str) -> PathBuf {
    let requested = dir.join(name);
    if !requested.exists() {
        return requested;
    }
    let stem = requested
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    let parent = requested.parent().unwrap_or(dir).to_path_buf();
    let mut n: u32 = 1;
    loop {
        let candidate = parent.join(format!("{stem}_gen_{n}.rs"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Renders every entity into its output unit under `dir`.
///
/// # Errors
///
/// Fails on the first entity that cannot be rendered or written. The
/// files created before the failure are deleted.
pub fn write_units<R: CodeRenderer>(
    renderer: &R,
    entities: &[EntityDescriptor],
    dir: &Path,
) -> Result<Vec<WrittenUnit>> {
    let mut units = OutputUnits::new(dir);
    for entity in entities {
        let result = units.write_entity(renderer, entity).map(|_| ());
        if let Err(e) = result {
            warn!(entity = %entity.name, error = %e, "Writing output failed, removing partial units");
            units.abandon();
            return Err(e);
        }
    }
    units.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(free_path(dir.path(), "user.rs"), dir.path().join("user.rs"));

        std::fs::write(dir.path().join("user.rs"), "").unwrap();
        assert_eq!(
            free_path(dir.path(), "user.rs"),
            dir.path().join("user_gen_1.rs")
        );

        std::fs::write(dir.path().join("user_gen_1.rs"), "").unwrap();
        assert_eq!(
            free_path(dir.path(), "user.rs"),
            dir.path().join("user_gen_2.rs")
        );
    }
}
