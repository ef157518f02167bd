//! Layer composition
//!
//! Writes each builder layer as a standalone tar file in a scratch
//! directory. Entry names are absolute paths inside the image, and every
//! entry of one archive shares a single modification time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::archive::{
    append_entry, append_link, capture_time, clean_path, copy_header, dir_header, entry_link,
    entry_name, file_header, join_clean, symlink_header, top_level_rebase,
};
use crate::buildpack::Buildpack;
use crate::error::{BuilderError, BuilderResult};
use crate::layer::{
    CompatMode, BUILDPACKS_DIR, LAYERS_DIR, LIFECYCLE_DIR, PLATFORM_DIR, PLATFORM_ENV_DIR,
    WORKSPACE_DIR,
};
use crate::lifecycle::Lifecycle;
use crate::metadata::{RunImageMetadata, StackMetadata};
use crate::order::{Order, OrderToml, V1OrderToml};

/// `stack.toml` as read by lifecycles
#[derive(Serialize)]
struct StackToml<'a> {
    #[serde(rename = "run-image")]
    run_image: &'a RunImageMetadata,
}

/// Encode the order document in the shape the lifecycle reads
pub fn encode_order(order: &Order, mode: CompatMode) -> BuilderResult<String> {
    let encoded = match mode {
        CompatMode::Legacy => toml::to_string(&V1OrderToml {
            groups: order.to_v1_order(),
        })?,
        CompatMode::Current => toml::to_string(&OrderToml {
            order: order.clone(),
        })?,
    };
    Ok(encoded)
}

/// Encode the stack document
pub fn encode_stack(stack: &StackMetadata) -> BuilderResult<String> {
    Ok(toml::to_string(&StackToml {
        run_image: &stack.run_image,
    })?)
}

/// Writes builder layers into a scratch directory
pub struct LayerComposer<'a> {
    dest: &'a Path,
    uid: u64,
    gid: u64,
}

impl<'a> LayerComposer<'a> {
    /// `uid`/`gid` own the build directories and every buildpack file
    pub fn new(dest: &'a Path, uid: u64, gid: u64) -> Self {
        Self { dest, uid, gid }
    }

    /// `/workspace` and `/layers` owned by the build user; `/buildpacks`,
    /// `/platform` and `/platform/env` owned by root.
    pub fn dirs_layer(&self) -> BuilderResult<PathBuf> {
        let (path, mut tw) = self.create("dirs.tar")?;
        let now = capture_time();

        let dirs = [
            (WORKSPACE_DIR, self.uid, self.gid),
            (LAYERS_DIR, self.uid, self.gid),
            (BUILDPACKS_DIR, 0, 0),
            (PLATFORM_DIR, 0, 0),
            (PLATFORM_ENV_DIR, 0, 0),
        ];
        for (dir, uid, gid) in dirs {
            let mut header = dir_header(now, uid, gid);
            append_entry(&mut tw, &mut header, dir, io::empty()).map_err(|e| {
                BuilderError::io(format!("creating '{}' dir in layer", dir), e)
            })?;
        }

        self.finish(path, tw)
    }

    /// One file per variable under `/platform/env`
    pub fn env_layer(&self, env: &BTreeMap<String, String>) -> BuilderResult<PathBuf> {
        let (path, mut tw) = self.create("env.tar")?;
        let now = capture_time();

        for (key, value) in env {
            let name = join_clean(PLATFORM_ENV_DIR, key);
            let mut header = file_header(value.len() as u64, 0o644, now);
            append_entry(&mut tw, &mut header, &name, value.as_bytes())
                .map_err(|e| BuilderError::io(format!("writing env var '{}' to layer", key), e))?;
        }

        self.finish(path, tw)
    }

    /// `/lifecycle/{binary}` for every executable under the blob's
    /// top-level directory
    pub fn lifecycle_layer(&self, lifecycle: &Lifecycle) -> BuilderResult<PathBuf> {
        let (path, mut tw) = self.create("lifecycle.tar")?;
        let now = capture_time();

        let mut header = dir_header(now, 0, 0);
        append_entry(&mut tw, &mut header, LIFECYCLE_DIR, io::empty()).map_err(|e| {
            BuilderError::io(format!("creating '{}' dir in layer", LIFECYCLE_DIR), e)
        })?;

        let mut archive = tar::Archive::new(lifecycle.open()?);
        let entries = archive
            .entries()
            .map_err(|e| BuilderError::io("reading lifecycle entries", e))?;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| BuilderError::io("failed to get next tar entry", e))?;
            let Some(binary) = top_level_rebase(&entry_name(&entry)) else {
                continue;
            };

            let name = format!("{}/{}", LIFECYCLE_DIR, binary);
            let mut header = copy_header(&entry).map_err(|e| {
                BuilderError::io(format!("failed to read header for '{}'", name), e)
            })?;
            copy_entry(&mut tw, &mut header, &name, &mut entry)?;
        }

        self.finish(path, tw)
    }

    /// `/buildpacks/{escaped-id}/{version}/...`, owned by the build user.
    ///
    /// In legacy mode a buildpack flagged `latest` also gets a
    /// `/buildpacks/{escaped-id}/latest` symlink to its version directory.
    pub fn buildpack_layer(
        &self,
        bp: &Buildpack,
        mode: CompatMode,
        latest: bool,
    ) -> BuilderResult<PathBuf> {
        let escaped_id = bp.escaped_id();
        let (path, mut tw) =
            self.create(&format!("{}.{}.tar", escaped_id, bp.info.version))?;
        let now = capture_time();

        let id_dir = format!("{}/{}", BUILDPACKS_DIR, escaped_id);
        let base_dir = format!("{}/{}", id_dir, bp.info.version);

        for dir in [&id_dir, &base_dir] {
            let mut header = dir_header(now, 0, 0);
            append_entry(&mut tw, &mut header, dir, io::empty())
                .map_err(|e| BuilderError::io(format!("creating '{}' dir in layer", dir), e))?;
        }

        self.embed_buildpack(&mut tw, bp, &base_dir).map_err(|e| match e {
            BuilderError::Io { context, source } => BuilderError::io(
                format!("creating layer tar for buildpack '{}': {}", bp.info, context),
                source,
            ),
            other => other,
        })?;

        if mode.writes_latest_symlink() && latest {
            let name = format!("{}/latest", id_dir);
            let mut header = symlink_header(now);
            append_link(&mut tw, &mut header, &name, &base_dir)
                .map_err(|e| BuilderError::io(format!("creating '{}' symlink", name), e))?;
        }

        self.finish(path, tw)
    }

    fn embed_buildpack(
        &self,
        tw: &mut tar::Builder<File>,
        bp: &Buildpack,
        base_dir: &str,
    ) -> BuilderResult<()> {
        let mut archive = tar::Archive::new(bp.open()?);
        let entries = archive
            .entries()
            .map_err(|e| BuilderError::io("reading buildpack entries", e))?;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| BuilderError::io("failed to get next tar entry", e))?;

            let cleaned = clean_path(&entry_name(&entry));
            if cleaned == "." || cleaned == "/" {
                continue;
            }

            let name = join_clean(base_dir, &cleaned);
            let mut header = copy_header(&entry).map_err(|e| {
                BuilderError::io(format!("failed to read header for '{}'", name), e)
            })?;
            header.set_uid(self.uid);
            header.set_gid(self.gid);

            copy_entry(tw, &mut header, &name, &mut entry)?;
        }

        Ok(())
    }

    /// `/buildpacks/order.toml`
    pub fn order_layer(&self, order: &Order, mode: CompatMode) -> BuilderResult<PathBuf> {
        let content = encode_order(order, mode)?;
        self.single_file_layer("order.tar", &format!("{}/order.toml", BUILDPACKS_DIR), &content)
    }

    /// `/buildpacks/stack.toml`
    pub fn stack_layer(&self, stack: &StackMetadata) -> BuilderResult<PathBuf> {
        let content = encode_stack(stack)?;
        self.single_file_layer("stack.tar", &format!("{}/stack.toml", BUILDPACKS_DIR), &content)
    }

    fn single_file_layer(
        &self,
        layer_name: &str,
        file_name: &str,
        content: &str,
    ) -> BuilderResult<PathBuf> {
        let (path, mut tw) = self.create(layer_name)?;
        let mut header = file_header(content.len() as u64, 0o644, capture_time());
        append_entry(&mut tw, &mut header, file_name, content.as_bytes()).map_err(|e| {
            BuilderError::io(format!("failed to create {} layer tar", file_name), e)
        })?;
        self.finish(path, tw)
    }

    fn create(&self, layer_name: &str) -> BuilderResult<(PathBuf, tar::Builder<File>)> {
        let path = self.dest.join(layer_name);
        let file = File::create(&path).map_err(|e| {
            BuilderError::io(format!("create file for tar {}", path.display()), e)
        })?;
        Ok((path, tar::Builder::new(file)))
    }

    fn finish(&self, path: PathBuf, tw: tar::Builder<File>) -> BuilderResult<PathBuf> {
        tw.into_inner()
            .map_err(|e| BuilderError::io(format!("finishing layer tar {}", path.display()), e))?;
        debug!("Wrote layer {}", path.display());
        Ok(path)
    }
}

fn copy_entry<R: Read>(
    tw: &mut tar::Builder<File>,
    header: &mut tar::Header,
    name: &str,
    entry: &mut tar::Entry<'_, R>,
) -> BuilderResult<()> {
    let written = match entry_link(entry) {
        Some(target) => append_link(tw, header, name, &target),
        None => append_entry(tw, header, name, &mut *entry),
    };
    written.map_err(|e| BuilderError::io(format!("failed to write '{}'", name), e))
}
