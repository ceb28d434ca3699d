use cmtscope_core::model::util::{find_classes_by_fqn, fqn};
use cmtscope_core::{ItemId, ItemKind, JavaItemIndex, LoadConfig};
use cmtscope_java::WorkspaceLoader;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, text).expect("write file");
}

fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    let mut zip = ZipWriter::new(File::create(path).expect("create jar"));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, text) in entries {
        zip.start_file(*name, options).expect("start entry");
        zip.write_all(text.as_bytes()).expect("write entry");
    }
    zip.finish().expect("finish jar");
}

fn class(index: &JavaItemIndex, name: &str) -> Option<ItemId> {
    find_classes_by_fqn(index, name).first().copied()
}

fn project(index: &JavaItemIndex, name: &str) -> ItemId {
    index
        .find_item(None, name, ItemKind::Project)
        .unwrap_or_else(|| panic!("project {name}"))
}

fn sample_workspace(root: &Path) {
    write(root, "app/.project", "<projectDescription><name>app</name></projectDescription>");
    write(
        root,
        "app/.classpath",
        r#"<classpath>
  <classpathentry kind="src" path="java"/>
  <classpathentry kind="src" path="/lib"/>
  <classpathentry kind="con" path="org.eclipse.jdt.launching.JRE_CONTAINER"/>
</classpath>"#,
    );
    write(
        root,
        "app/java/com/app/Main.java",
        "package com.app;\nimport com.lib.Base;\nimport com.util.Util;\n\
         public class Main extends Base {\n  void run() { greet(); Util.help(2); }\n}\n",
    );
    write(root, "lib/.project", "<projectDescription><name>lib</name></projectDescription>");
    write(
        root,
        "lib/src/com/lib/Base.java",
        "package com.lib;\npublic class Base { protected void greet() {} }\n",
    );
    write_jar(
        &root.join("jars/util.jar"),
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\n"),
            (
                "com/util/Util.java",
                "package com.util;\npublic class Util { public static void help(int n) {} }\n",
            ),
            ("com/util/Unused.java", "package com.util;\npublic class Unused {}\n"),
        ],
    );
}

#[test]
fn projects_sources_and_archives_are_linked() {
    let dir = tempfile::tempdir().expect("tempdir");
    sample_workspace(dir.path());

    let outcome = WorkspaceLoader::new(LoadConfig::default())
        .load(dir.path())
        .expect("load");
    let index = &outcome.index;
    assert_eq!(outcome.report.stats.projects, 3);
    assert_eq!(outcome.report.stats.archives, 1);
    assert!(outcome.report.run.stalled.is_empty(), "{:?}", outcome.report.run);

    let main = class(index, "com.app.Main").expect("Main");
    let base = class(index, "com.lib.Base").expect("Base");
    assert_eq!(index.get(main).and_then(|m| m.superclass()), Some(base));

    let app = project(index, "app");
    let lib = project(index, "lib");
    assert!(index.get(app).expect("app").dependencies().contains(&lib));

    let util = class(index, "com.util.Util").expect("Util");
    assert!(index.get(util).is_some_and(|u| u.is_third_party()));
    let help = index.find_item(Some(util), "help", ItemKind::Method).expect("help");
    let greet = index.find_item(Some(base), "greet", ItemKind::Method).expect("greet");
    let run = index.find_item(Some(main), "run", ItemKind::Method).expect("run");
    assert!(index.get(help).is_some_and(|h| h.is_third_party()));
    assert!(!index.get(run).is_some_and(|r| r.is_third_party()));
    let calls = index.get(run).expect("run").dependencies();
    assert!(calls.contains(&help) && calls.contains(&greet));

    assert!(class(index, "com.util.Unused").is_none(), "unreferenced third-party class survives pruning");
    assert_eq!(fqn(index, help).as_deref(), Some("com.util.Util.help"));
}

#[test]
fn parallel_bands_build_the_same_classes() {
    let dir = tempfile::tempdir().expect("tempdir");
    sample_workspace(dir.path());

    let classes = |workers: usize| {
        let config = LoadConfig {
            workers,
            prune_third_party: false,
            ..LoadConfig::default()
        };
        let outcome = WorkspaceLoader::new(config).load(dir.path()).expect("load");
        let mut names: Vec<String> = outcome
            .index
            .items_of_kind(ItemKind::Class)
            .filter_map(|c| fqn(&outcome.index, c.id()))
            .collect();
        names.sort();
        names
    };
    assert_eq!(classes(1), classes(4));
}

#[test]
fn archives_wait_for_their_manifest_dependencies() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_jar(
        &dir.path().join("a.jar"),
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\nClass-Path: b.jar\r\n"),
            ("a/A.java", "package a;\npublic class A {}\n"),
        ],
    );
    write_jar(&dir.path().join("b.jar"), &[("b/B.java", "package b;\npublic class B {}\n")]);
    write_jar(
        &dir.path().join("broken.jar"),
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\nClass-Path: lib/missing.jar\r\n"),
            ("c/C.java", "package c;\npublic class C {}\n"),
        ],
    );

    let strict = LoadConfig {
        prune_third_party: false,
        ..LoadConfig::default()
    };
    let outcome = WorkspaceLoader::new(strict.clone()).load(dir.path()).expect("load");
    let index = &outcome.index;
    assert!(class(index, "a.A").is_some());
    assert!(class(index, "b.B").is_some());
    assert!(class(index, "c.C").is_none());
    assert!(
        index
            .get(project(index, "a"))
            .expect("a")
            .dependencies()
            .contains(&project(index, "b"))
    );
    assert_eq!(outcome.report.stats.unresolved_dependencies, 1);
    assert_eq!(outcome.report.run.stalled, vec!["load archive entries".to_string()]);

    let lenient = LoadConfig {
        require_jar_dependencies: false,
        ..strict
    };
    let outcome = WorkspaceLoader::new(lenient).load(dir.path()).expect("load");
    assert!(class(&outcome.index, "c.C").is_some());
}

#[test]
fn corrupted_archive_entries_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "app/.project", "<projectDescription><name>app</name></projectDescription>");
    write(dir.path(), "app/src/a/A.java", "package a;\npublic class A {}\n");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("x/Y.java", options).expect("start entry");
    zip.write_all(b"package x;\npublic class Y { int checked_0123456789; }\n")
        .expect("write entry");
    zip.start_file("x/Z.java", options).expect("start entry");
    zip.write_all(b"package x;\npublic class Z {}\n").expect("write entry");
    let mut bytes = zip.finish().expect("finish jar").into_inner();
    // Still valid Java after the flip, so only the stored checksum rejects it.
    let at = bytes
        .windows(10)
        .position(|w| w == b"0123456789")
        .expect("entry body");
    bytes[at] = b'9';
    fs::write(dir.path().join("lib.jar"), bytes).expect("write jar");

    let config = LoadConfig {
        prune_third_party: false,
        ..LoadConfig::default()
    };
    let outcome = WorkspaceLoader::new(config).load(dir.path()).expect("load");
    let index = &outcome.index;
    assert!(class(index, "a.A").is_some());
    assert!(class(index, "x.Z").is_some());
    assert!(class(index, "x.Y").is_none());
    assert_eq!(outcome.report.stats.skipped_files, 1);
}

#[test]
fn unreadable_archives_do_not_abort_the_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "app/.project", "<projectDescription><name>app</name></projectDescription>");
    write(dir.path(), "app/src/a/A.java", "package a;\npublic class A {}\n");
    write(dir.path(), "junk.jar", "not a zip archive");

    let outcome = WorkspaceLoader::new(LoadConfig::default())
        .load(dir.path())
        .expect("load");
    assert!(class(&outcome.index, "a.A").is_some());
    assert!(outcome.report.stats.skipped_files >= 1);
}

#[test]
fn missing_workspace_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = WorkspaceLoader::new(LoadConfig::default()).load(&dir.path().join("absent"));
    assert!(result.is_err());
}
