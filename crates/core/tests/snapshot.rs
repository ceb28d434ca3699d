use cmtscope_core::storage::{ApiFileManager, BATCH_SIZE};
use cmtscope_core::{ItemKind, JavaItemIndex};
use std::fs::File;

/// A project with one package holding enough classes to reach `total` items.
fn index_with(total: usize) -> JavaItemIndex {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("bulk");
    let package = index.create_package(project, "gen").expect("package");
    let mut previous = None;
    for n in 0..total - 2 {
        let class = index.create_class(package, &format!("C{n}")).expect("class");
        if let Some(prev) = previous {
            index.add_dependency(class, prev);
        }
        previous = Some(class);
    }
    assert_eq!(index.len(), total);
    index
}

fn part_names(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).expect("open")).expect("zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn assert_same(a: &JavaItemIndex, b: &JavaItemIndex) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.id().raw(), y.id().raw());
        assert_eq!(x.name(), y.name());
        assert_eq!(x.kind(), y.kind());
        let xd: Vec<u32> = x.dependencies().iter().map(|d| d.raw()).collect();
        let yd: Vec<u32> = y.dependencies().iter().map(|d| d.raw()).collect();
        assert_eq!(xd, yd);
        assert_eq!(x.children().len(), y.children().len());
    }
}

#[test]
fn exactly_one_full_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = index_with(BATCH_SIZE);
    let path = ApiFileManager::write(&index, dir.path(), 1).expect("write");

    let names = part_names(&path);
    assert!(names.contains(&"items0-99999.txt".to_string()));
    assert_eq!(names.iter().filter(|n| n.starts_with("items")).count(), 1);

    let back = ApiFileManager::read(&path).expect("read");
    assert_same(&index, &back);
}

#[test]
fn one_item_past_the_batch_boundary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = index_with(BATCH_SIZE + 1);
    let path = ApiFileManager::write(&index, dir.path(), 2).expect("write");

    let names = part_names(&path);
    assert!(names.contains(&"items0-99999.txt".to_string()));
    assert!(names.contains(&"items100000-100000.txt".to_string()));

    let back = ApiFileManager::read(&path).expect("read");
    assert_same(&index, &back);
    let package = back
        .find_by_name(ItemKind::Package, "gen")
        .first()
        .copied()
        .expect("package");
    assert!(back.find_item(Some(package), "C99998", ItemKind::Class).is_some());
}

#[test]
fn typed_edges_and_flags_survive() {
    let mut index = JavaItemIndex::new();
    let lib = index.create_project("lib");
    if let Some(p) = index.get_mut(lib) {
        p.set_flag(cmtscope_core::AttrKey::ThirdParty, true);
    }
    let pkg = index.create_package(lib, "org.lib").expect("package");
    let base = index.create_class(pkg, "Base").expect("class");
    let api = index.create_class(pkg, "Api").expect("class");
    let impl_ = index.create_class(pkg, "Impl").expect("class");
    let int = index.primitive("int").expect("int");
    let ints = index.create_array_class(int, 1).expect("int[]");
    if let Some(c) = index.get_mut(impl_) {
        c.set_superclass(base);
        c.add_superinterface(api);
    }
    let m = index
        .create_method(impl_, "apply", Some(vec![ints, api]))
        .expect("method");
    if let Some(item) = index.get_mut(m) {
        item.set_return_type(int);
        item.add_thrown_type(base);
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let path = ApiFileManager::write(&index, dir.path(), 1).expect("write");
    let back = ApiFileManager::read(&path).expect("read");

    let raw = |id: cmtscope_core::ItemId| back.resolve_raw(id.raw()).expect("present");
    let impl_back = back.get(raw(impl_)).expect("impl");
    assert_eq!(impl_back.superclass(), Some(raw(base)));
    assert_eq!(impl_back.superinterfaces(), &[raw(api)]);
    let m_back = back.get(raw(m)).expect("method");
    assert_eq!(m_back.param_types(), Some(&[raw(ints), raw(api)][..]));
    assert_eq!(m_back.return_type(), Some(raw(int)));
    assert_eq!(m_back.thrown_types(), &[raw(base)]);
    assert_eq!(back.get(raw(ints)).and_then(|a| a.array_base()), Some(raw(int)));
    assert!(back.get(raw(lib)).is_some_and(|p| p.is_third_party()));
    assert_eq!(back.find_wildcard(), None);
    assert_eq!(back.find_primitive("int"), Some(raw(int)));
}
