//! Integration tests for cnb-builder

mod fixtures {
    use cnb_builder::archive::{append_entry, file_header};
    use cnb_builder::image::{ImageManifest, ENV_GID, ENV_UID, STACK_LABEL};
    use cnb_builder::lifecycle::LIFECYCLE_BINARIES;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    pub const STACK: &str = "io.buildpacks.stacks.bionic";

    /// Base build image directory with the stack label and build user ids
    pub fn base_image(root: &Path, stack: &str) -> PathBuf {
        let dir = root.join("image");
        fs::create_dir_all(&dir).unwrap();
        let manifest = ImageManifest {
            name: "some/build".to_string(),
            labels: BTreeMap::from([(STACK_LABEL.to_string(), stack.to_string())]),
            env: BTreeMap::from([
                (ENV_UID.to_string(), "1000".to_string()),
                (ENV_GID.to_string(), "1000".to_string()),
            ]),
            ..ImageManifest::default()
        };
        fs::write(
            dir.join("image.json"),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();
        dir
    }

    /// Gzipped lifecycle archive, with a descriptor when `version` is set
    pub fn lifecycle_tgz(root: &Path, version: Option<&str>) -> PathBuf {
        let path = root.join("lifecycle.tgz");
        let file = fs::File::create(&path).unwrap();
        let mut tw = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut files: Vec<(String, String)> = LIFECYCLE_BINARIES
            .iter()
            .map(|b| (format!("lifecycle/{}", b), format!("{} binary", b)))
            .collect();
        if let Some(version) = version {
            files.push((
                "lifecycle.toml".to_string(),
                format!(
                    "[api]\nplatform = \"0.2\"\nbuildpack = \"0.2\"\n\n[lifecycle]\nversion = \"{}\"\n",
                    version
                ),
            ));
        }
        for (name, content) in &files {
            let mut header = file_header(content.len() as u64, 0o755, 0);
            append_entry(&mut tw, &mut header, name, content.as_bytes()).unwrap();
        }
        tw.into_inner().unwrap().finish().unwrap();
        path
    }

    /// Buildpack source directory with a `buildpack.toml` and a detect script
    pub fn buildpack_dir(root: &Path, id: &str, version: &str, descriptor_tail: &str) -> PathBuf {
        let dir = root.join(format!("{}-{}", id.replace('/', "_"), version));
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(
            dir.join("buildpack.toml"),
            format!(
                "[buildpack]\nid = \"{}\"\nversion = \"{}\"\n\n{}",
                id, version, descriptor_tail
            ),
        )
        .unwrap();
        fs::write(dir.join("bin/detect"), "#!/bin/sh\nexit 0\n").unwrap();
        dir
    }

    pub fn leaf_stacks(stack: &str) -> String {
        format!("[[stacks]]\nid = \"{}\"\n", stack)
    }
}

mod cli_tests {
    use super::fixtures::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use cnb_builder::image::{DirImage, Image};
    use cnb_builder::metadata::{Metadata, METADATA_LABEL};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn cnb_builder() -> Command {
        cargo_bin_cmd!("cnb-builder")
    }

    fn write_config(root: &Path, body: &str) -> std::path::PathBuf {
        let path = root.join("builder.toml");
        fs::write(&path, body).unwrap();
        path
    }

    fn standard_setup(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let image = base_image(root, STACK);
        lifecycle_tgz(root, Some("0.4.0"));
        buildpack_dir(root, "org/node", "1.0", &leaf_stacks(STACK));
        let config = write_config(
            root,
            &format!(
                r#"
description = "Some builder"

[[buildpacks]]
uri = "org_node-1.0"

[[order]]
  [[order.group]]
  id = "org/node"

[stack]
id = "{STACK}"
build-image = "some/build"
run-image = "some/run"
run-image-mirrors = ["gcr.io/some/run"]

[lifecycle]
version = "0.4.0"
uri = "lifecycle.tgz"

[env]
SOME_KEY = "some-val"
"#
            ),
        );
        (image, config)
    }

    #[test]
    fn help_displays() {
        cnb_builder()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("create"))
            .stdout(predicate::str::contains("inspect"));
    }

    #[test]
    fn version_displays() {
        cnb_builder()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cnb-builder"));
    }

    #[test]
    fn create_then_inspect() {
        let temp = TempDir::new().unwrap();
        let (image, config) = standard_setup(temp.path());

        cnb_builder()
            .arg("--config")
            .arg(&config)
            .args(["create", "some/builder", "--image"])
            .arg(&image)
            .assert()
            .success()
            .stdout(predicate::str::contains("Created builder some/builder"));

        let saved = DirImage::open(&image).unwrap();
        assert_eq!(saved.name(), "some/builder");
        assert_eq!(saved.manifest().working_dir, "/layers");
        // dirs, env, lifecycle, buildpack, order, stack
        assert_eq!(saved.manifest().layers.len(), 6);
        for digest in &saved.manifest().layers {
            assert!(saved.blob_path(digest).exists());
        }

        let md = Metadata::parse(&saved.label(METADATA_LABEL).unwrap()).unwrap();
        assert_eq!(md.description, "Some builder");
        assert_eq!(md.stack.run_image.image, "some/run");
        assert_eq!(md.groups.0[0].buildpacks[0].version, "1.0");

        cnb_builder()
            .args(["inspect", "--image"])
            .arg(&image)
            .assert()
            .success()
            .stdout(predicate::str::contains("Some builder"))
            .stdout(predicate::str::contains("gcr.io/some/run"))
            .stdout(predicate::str::contains("0.4.0"))
            .stdout(predicate::str::contains("org/node@1.0"));

        cnb_builder()
            .args(["inspect", "--format", "json", "--image"])
            .arg(&image)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""runImage""#))
            .stdout(predicate::str::contains(r#""stack_id": "io.buildpacks.stacks.bionic""#));
    }

    #[test]
    fn config_from_env_var() {
        let temp = TempDir::new().unwrap();
        let (image, config) = standard_setup(temp.path());

        cnb_builder()
            .env("CNB_BUILDER_CONFIG", &config)
            .args(["create", "some/builder", "--image"])
            .arg(&image)
            .assert()
            .success();
    }

    #[test]
    fn create_rejects_stack_mismatch() {
        let temp = TempDir::new().unwrap();
        let (_, config) = standard_setup(temp.path());
        let other = base_image(&temp.path().join("other"), "other.stack");

        cnb_builder()
            .arg("--config")
            .arg(&config)
            .args(["create", "some/builder", "--image"])
            .arg(&other)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("does not match"))
            .stderr(predicate::str::contains("Hint:"));

        let untouched = DirImage::open(&other).unwrap();
        assert_eq!(untouched.name(), "some/build");
        assert!(untouched.manifest().layers.is_empty());
    }

    #[test]
    fn create_rejects_lifecycle_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let (image, _) = standard_setup(temp.path());
        let config = write_config(
            temp.path(),
            "[lifecycle]\nversion = \"0.5.0\"\nuri = \"lifecycle.tgz\"\n",
        );

        cnb_builder()
            .arg("--config")
            .arg(&config)
            .args(["create", "some/builder", "--image"])
            .arg(&image)
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "lifecycle has version '0.4.0' which does not match provided version '0.5.0'",
            ));
    }

    #[test]
    fn create_rejects_ambiguous_order() {
        let temp = TempDir::new().unwrap();
        let image = base_image(temp.path(), STACK);
        buildpack_dir(temp.path(), "x", "1.0", &leaf_stacks(STACK));
        buildpack_dir(temp.path(), "x", "2.0", &leaf_stacks(STACK));
        let config = write_config(
            temp.path(),
            r#"
[[buildpacks]]
uri = "x-1.0"

[[buildpacks]]
uri = "x-2.0"

[[order]]
  [[order.group]]
  id = "x"
"#,
        );

        cnb_builder()
            .arg("--config")
            .arg(&config)
            .args(["create", "some/builder", "--image"])
            .arg(&image)
            .assert()
            .failure()
            .stderr(predicate::str::contains("multiple versions of 'x'"));

        assert!(DirImage::open(&image)
            .unwrap()
            .label(METADATA_LABEL)
            .is_none());
    }

    #[test]
    fn create_with_missing_config() {
        let temp = TempDir::new().unwrap();
        let image = base_image(temp.path(), STACK);

        cnb_builder()
            .arg("--config")
            .arg(temp.path().join("nonexistent.toml"))
            .args(["create", "some/builder", "--image"])
            .arg(&image)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn inspect_non_builder() {
        let temp = TempDir::new().unwrap();
        let image = base_image(temp.path(), STACK);

        cnb_builder()
            .args(["inspect", "--image"])
            .arg(&image)
            .assert()
            .failure()
            .stderr(predicate::str::contains("-- try recreating builder"));
    }

    #[test]
    fn inspect_missing_image() {
        let temp = TempDir::new().unwrap();

        cnb_builder()
            .args(["inspect", "--image"])
            .arg(temp.path().join("nope"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("image.json"));
    }
}

mod library_tests {
    use super::fixtures::*;
    use cnb_builder::archive::entry_name;
    use cnb_builder::blob::FileBlob;
    use cnb_builder::buildpack::Buildpack;
    use cnb_builder::image::{Image, MemoryImage, ENV_GID, ENV_UID, STACK_LABEL};
    use cnb_builder::lifecycle::Lifecycle;
    use cnb_builder::metadata::{Metadata, METADATA_LABEL};
    use cnb_builder::order::{BuildpackRef, Order, OrderEntry};
    use cnb_builder::{Builder, BuilderError};
    use std::io::Read;
    use tempfile::TempDir;

    fn image() -> MemoryImage {
        MemoryImage::new("some/build")
            .with_label(STACK_LABEL, STACK)
            .with_env(ENV_UID, "1234")
            .with_env(ENV_GID, "4321")
    }

    struct Entry {
        name: String,
        uid: u64,
        gid: u64,
        link: Option<String>,
        content: String,
    }

    fn entries(layer: &[u8]) -> Vec<Entry> {
        let mut archive = tar::Archive::new(layer);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let mut content = String::new();
                e.read_to_string(&mut content).unwrap();
                Entry {
                    name: entry_name(&e),
                    uid: e.header().uid().unwrap(),
                    gid: e.header().gid().unwrap(),
                    link: e
                        .link_name()
                        .unwrap()
                        .map(|l| l.to_string_lossy().into_owned()),
                    content,
                }
            })
            .collect()
    }

    #[test]
    fn composite_buildpack_end_to_end() {
        let temp = TempDir::new().unwrap();
        let lifecycle = Lifecycle::new(FileBlob::new(lifecycle_tgz(temp.path(), Some("0.4.0"))))
            .unwrap();
        let node = buildpack_dir(temp.path(), "org/node", "1.0", &leaf_stacks(STACK));
        let npm = buildpack_dir(temp.path(), "org/npm", "2.0", &leaf_stacks(STACK));
        let meta = buildpack_dir(
            temp.path(),
            "org/meta",
            "0.1",
            "[[order]]\n[[order.group]]\nid = \"org/node\"\nversion = \"1.0\"\n\n[[order.group]]\nid = \"org/npm\"\nversion = \"2.0\"\noptional = true\n",
        );

        let mut builder = Builder::create(image(), "some/builder").unwrap();
        builder.set_lifecycle(lifecycle);
        for dir in [&meta, &node, &npm] {
            builder.add_buildpack(Buildpack::from_blob(FileBlob::new(dir)).unwrap());
        }
        builder.set_order(Order::new(vec![OrderEntry::new(vec![BuildpackRef::new(
            "org/meta", "",
        )])]));
        builder.save().unwrap();

        let image = builder.into_image();
        let layers = image.layers();
        // dirs, env, lifecycle, 3 buildpacks, order, stack
        assert_eq!(layers.len(), 8);

        let node_layer = entries(&layers[4]);
        let detect = node_layer
            .iter()
            .find(|e| e.name == "/buildpacks/org_node/1.0/bin/detect")
            .unwrap();
        assert_eq!((detect.uid, detect.gid), (1234, 4321));
        assert!(detect.content.contains("exit 0"));
        assert!(node_layer.iter().all(|e| e.link.is_none()));

        let order = &entries(&layers[6])[0];
        assert_eq!(order.name, "/buildpacks/order.toml");
        assert!(order.content.contains("[[order.group]]"));
        assert!(order.content.contains("version = \"0.1\""));

        let md = Metadata::parse(&image.label(METADATA_LABEL).unwrap()).unwrap();
        assert_eq!(md.buildpacks.len(), 3);
        assert!(md.buildpacks.iter().all(|bp| bp.latest));
    }

    #[test]
    fn composite_with_missing_child_fails() {
        let temp = TempDir::new().unwrap();
        let meta = buildpack_dir(
            temp.path(),
            "org/meta",
            "0.1",
            "[[order]]\n[[order.group]]\nid = \"org/missing\"\nversion = \"1.0\"\n",
        );

        let mut builder = Builder::create(image(), "some/builder").unwrap();
        builder.add_buildpack(Buildpack::from_blob(FileBlob::new(&meta)).unwrap());

        let err = builder.save().unwrap_err();
        assert!(matches!(err, BuilderError::NestedBuildpackNotFound { .. }));
        assert!(err.is_graph_error());
        assert!(!builder.into_image().is_saved());
    }

    #[test]
    fn legacy_lifecycle_layout() {
        let temp = TempDir::new().unwrap();
        let lifecycle = Lifecycle::new(FileBlob::new(lifecycle_tgz(temp.path(), None))).unwrap();
        let node = buildpack_dir(temp.path(), "org/node", "1.0", &leaf_stacks(STACK));

        let mut builder = Builder::create(image(), "some/builder").unwrap();
        builder.set_lifecycle(lifecycle);
        builder.add_buildpack(Buildpack::from_blob(FileBlob::new(&node)).unwrap());
        builder.set_order(Order::new(vec![OrderEntry::new(vec![BuildpackRef::new(
            "org/node", "",
        )])]));
        builder.save().unwrap();

        let image = builder.into_image();
        let layers = image.layers();

        let latest = entries(&layers[3])
            .into_iter()
            .find(|e| e.name == "/buildpacks/org_node/latest")
            .unwrap();
        assert_eq!(latest.link.as_deref(), Some("/buildpacks/org_node/1.0"));

        let order = &entries(&layers[4])[0];
        assert!(order.content.contains("[[groups.buildpacks]]"));
    }
}
