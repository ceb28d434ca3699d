use super::relationship::Relationship;
use crate::error::{CoreError, Result};
use crate::model::{AttrKey, ItemKind, JavaItem, JavaItemIndex};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

/// Lines per archive part.
pub const BATCH_SIZE: usize = 100_000;

const FLAGS: &[(AttrKey, &str)] = &[
    (AttrKey::Binary, "binary"),
    (AttrKey::ThirdParty, "third-party"),
    (AttrKey::ProjectVisible, "project-visible"),
    (AttrKey::Pseudo, "pseudo"),
];

/// Reads and writes `api-v<version>.zip` snapshots.
pub struct ApiFileManager;

impl ApiFileManager {
    pub fn file_name(version: u32) -> String {
        format!("api-v{version}.zip")
    }

    /// Writes `index` to `dir/api-v<version>.zip`. A partially written file is
    /// removed when writing fails.
    pub fn write(index: &JavaItemIndex, dir: &Path, version: u32) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(version));
        let file = File::create(&path)?;
        let mut zip = zip::ZipWriter::new(file);

        match write_parts(index, &mut zip) {
            Ok(()) => {
                zip.finish()?;
                info!(path = %path.display(), items = index.len(), "wrote api snapshot");
                Ok(path)
            }
            Err(err) => {
                if let Err(close) = zip.finish() {
                    warn!("closing snapshot after failure: {close}");
                }
                if let Err(remove) = std::fs::remove_file(&path) {
                    warn!("removing partial snapshot {}: {remove}", path.display());
                }
                Err(err)
            }
        }
    }

    /// Rebuilds an index from a snapshot. Raw IDs are preserved.
    pub fn read(path: &Path) -> Result<JavaItemIndex> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut item_parts = Vec::new();
        let mut rel_parts = Vec::new();
        for name in archive.file_names() {
            if let Some(start) = part_start(name, "items") {
                item_parts.push((start, name.to_string()));
            } else if let Some(start) = part_start(name, "rels") {
                rel_parts.push((start, name.to_string()));
            }
        }
        item_parts.sort();
        rel_parts.sort();

        let mut index = JavaItemIndex::new();
        for (_, name) in &item_parts {
            for line in read_lines(&mut archive, name)? {
                if line.trim().is_empty() {
                    continue;
                }
                read_item_line(&mut index, &line)?;
            }
        }
        for (_, name) in &rel_parts {
            for line in read_lines(&mut archive, name)? {
                if line.trim().is_empty() {
                    continue;
                }
                Relationship::parse_line(&line)?.apply(&mut index)?;
            }
        }
        index.rebuild_lookup();
        info!(path = %path.display(), items = index.len(), "read api snapshot");
        Ok(index)
    }

    /// Highest-versioned snapshot in `dir`.
    pub fn latest(dir: &Path) -> Result<Option<(u32, PathBuf)>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut best: Option<(u32, PathBuf)> = None;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(version) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("api-v"))
                .and_then(|n| n.strip_suffix(".zip"))
                .and_then(|v| v.parse::<u32>().ok())
            else {
                continue;
            };
            if best.as_ref().is_none_or(|(v, _)| version > *v) {
                best = Some((version, path));
            }
        }
        Ok(best)
    }

    pub fn next_version(dir: &Path) -> Result<u32> {
        Ok(Self::latest(dir)?.map_or(1, |(v, _)| v + 1))
    }
}

fn write_parts(index: &JavaItemIndex, zip: &mut zip::ZipWriter<File>) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let items: Vec<&JavaItem> = index.iter().collect();

    let mut last_raw: Option<u32> = None;
    for item in &items {
        let raw = item.id().raw();
        if last_raw.is_some_and(|last| raw <= last) {
            return Err(CoreError::State(format!(
                "item id {raw} written after id {}",
                last_raw.unwrap_or_default()
            )));
        }
        last_raw = Some(raw);
    }

    for (n, batch) in items.chunks(BATCH_SIZE).enumerate() {
        let start = n * BATCH_SIZE;
        let end = start + batch.len() - 1;
        zip.start_file(format!("items{start}-{end}.txt"), options)?;
        for item in batch {
            writeln!(zip, "{}", item_line(item))?;
        }
    }

    let rels: Vec<Relationship> = items.iter().flat_map(|i| Relationship::of_item(i)).collect();
    for (n, batch) in rels.chunks(BATCH_SIZE).enumerate() {
        let start = n * BATCH_SIZE;
        let end = start + batch.len() - 1;
        zip.start_file(format!("rels{start}-{end}.txt"), options)?;
        for rel in batch {
            writeln!(zip, "{}", rel.to_line())?;
        }
    }
    Ok(())
}

fn part_start(name: &str, prefix: &str) -> Option<usize> {
    let range = name.strip_prefix(prefix)?.strip_suffix(".txt")?;
    let (start, _) = range.split_once('-')?;
    start.parse().ok()
}

fn read_lines(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<String>> {
    let mut entry = archive.by_name(name)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    BufReader::new(text.as_bytes())
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(CoreError::from)
}

fn item_line(item: &JavaItem) -> String {
    let mut line = format!(
        "i n \"{}\" id {} t {}",
        escape(item.name()),
        item.id().raw(),
        item.kind().as_str()
    );
    let flags: Vec<&str> = FLAGS
        .iter()
        .filter(|(key, _)| item.flag(*key))
        .map(|(_, name)| *name)
        .collect();
    if !flags.is_empty() {
        line.push_str(" f ");
        line.push_str(&flags.join(","));
    }
    line
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parses `i n "<name>" id <id> t <TYPE>[ f <flags>]` into `index`.
fn read_item_line(index: &mut JavaItemIndex, line: &str) -> Result<()> {
    let bad = || CoreError::Snapshot(format!("malformed item line: {line}"));
    let rest = line.strip_prefix("i n \"").ok_or_else(bad)?;

    let mut name = String::new();
    let mut chars = rest.char_indices();
    let mut tail = None;
    while let Some((pos, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(bad)?;
                name.push(escaped);
            }
            '"' => {
                tail = Some(&rest[pos + 1..]);
                break;
            }
            _ => name.push(c),
        }
    }
    let fields: Vec<&str> = tail.ok_or_else(bad)?.split_whitespace().collect();
    let (raw, kind, flags) = match fields.as_slice() {
        ["id", raw, "t", kind] => (raw, kind, None),
        ["id", raw, "t", kind, "f", flags] => (raw, kind, Some(*flags)),
        _ => return Err(bad()),
    };
    let raw: u32 = raw.parse().map_err(|_| bad())?;
    let kind = ItemKind::parse(kind).ok_or_else(bad)?;
    let id = index.insert_raw(raw, &name, kind)?;

    if let (Some(flags), Some(item)) = (flags, index.get_mut(id)) {
        for flag in flags.split(',') {
            match FLAGS.iter().find(|(_, n)| *n == flag) {
                Some((key, _)) => item.set_flag(*key, true),
                None => return Err(bad()),
            }
        }
    }
    Ok(())
}
