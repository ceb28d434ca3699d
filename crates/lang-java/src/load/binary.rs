use super::context::{LoadKey, LoadShared, LoadingContext};
use super::priority;
use crate::classfile::TypeName;
use cmtscope_core::model::util::find_classes_by_fqn;
use cmtscope_core::model::PRIMITIVES;
use cmtscope_core::{AttrKey, ItemId, ItemKind, JavaItemIndex};
use cmtscope_ingest::{BoxError, Spawner, Task};
use tracing::trace;

/// Registers the package of a compiled class and schedules its phases.
pub struct BinaryPackageTask;

impl Task<LoadingContext> for BinaryPackageTask {
    fn name(&self) -> String {
        "register binary package".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Project, LoadKey::Binary]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Package]
    }

    fn run(&mut self, ctx: &mut LoadingContext, spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(project), Some(binary)) = (ctx.project, ctx.binary.clone()) else {
            return Ok(());
        };
        let (package, created) = {
            let mut index = ctx.shared.write()?;
            let existed = index.find_item(Some(project), &binary.package, ItemKind::Package).is_some();
            (index.create_package(project, &binary.package)?, !existed)
        };
        if created {
            ctx.shared.count(|s| s.packages += 1);
        }
        ctx.package = Some(package);
        spawner.spawn_here(priority::CLASS, BinaryClassTask);
        spawner.spawn_here(priority::CLASS_DEPENDENCIES, BinaryClassDepsTask);
        spawner.spawn_here(priority::METHODS, BinaryMethodsTask);
        Ok(())
    }
}

pub struct BinaryClassTask;

impl Task<LoadingContext> for BinaryClassTask {
    fn name(&self) -> String {
        "load binary class".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Package, LoadKey::Binary]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Classes]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(package), Some(binary)) = (ctx.package, ctx.binary.clone()) else {
            return Ok(());
        };
        let class = {
            let mut index = ctx.shared.write()?;
            let mut parts = binary.name.split('.');
            let mut class = index.create_class(package, parts.next().unwrap_or_default())?;
            for inner in parts {
                class = index.create_inner_class(class, inner)?;
            }
            if let Some(item) = index.get_mut(class) {
                item.set_flag(AttrKey::Binary, true);
                if binary.is_public {
                    item.set_flag(AttrKey::ProjectVisible, true);
                }
            }
            class
        };
        ctx.shared.count(|s| s.classes += 1);
        ctx.classes = Some(vec![(None, class)]);
        Ok(())
    }
}

fn class_by_name(index: &JavaItemIndex, project: Option<ItemId>, name: &str) -> Option<ItemId> {
    LoadShared::prefer_project(index, project, &find_classes_by_fqn(index, name))
}

pub struct BinaryClassDepsTask;

impl Task<LoadingContext> for BinaryClassDepsTask {
    fn name(&self) -> String {
        "load binary class dependencies".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Classes, LoadKey::Binary]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::ClassDependencies]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(binary), Some(class)) = (
            ctx.binary.clone(),
            ctx.classes.as_ref().and_then(|c| c.first()).map(|(_, id)| *id),
        ) else {
            return Ok(());
        };
        let mut unresolved = 0;
        {
            let mut index = ctx.shared.write()?;
            let superclass = binary.superclass.as_deref().and_then(|name| {
                let found = class_by_name(&index, ctx.project, name);
                if found.is_none() {
                    unresolved += 1;
                }
                found
            });
            let mut interfaces = Vec::new();
            for name in &binary.interfaces {
                match class_by_name(&index, ctx.project, name) {
                    Some(id) => interfaces.push(id),
                    None => unresolved += 1,
                }
            }
            if let Some(item) = index.get_mut(class) {
                if let Some(sup) = superclass {
                    item.set_superclass(sup);
                }
                for iface in &interfaces {
                    item.add_superinterface(*iface);
                }
            }
            for target in superclass.iter().chain(&interfaces) {
                index.add_dependency(class, *target);
            }
        }
        if unresolved > 0 {
            trace!(class = %binary.fqn(), unresolved, "unresolved binary supertypes");
            ctx.shared.count(|s| s.unresolved_supertypes += unresolved);
        }
        ctx.class_dependencies = true;
        Ok(())
    }
}

/// Index item for a descriptor type; classes missing from the workspace
/// become the wildcard.
fn binary_type(index: &mut JavaItemIndex, project: Option<ItemId>, ty: &TypeName) -> crate::error::Result<ItemId> {
    let base = if PRIMITIVES.contains(&ty.name.as_str()) {
        index.primitive(&ty.name)?
    } else {
        match class_by_name(index, project, &ty.name) {
            Some(id) => id,
            None => index.wildcard(),
        }
    };
    Ok(index.create_array_class(base, ty.dims)?)
}

pub struct BinaryMethodsTask;

impl Task<LoadingContext> for BinaryMethodsTask {
    fn name(&self) -> String {
        "load binary methods".to_string()
    }

    fn input_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::ClassDependencies, LoadKey::Binary]
    }

    fn output_constraints(&self) -> Vec<LoadKey> {
        vec![LoadKey::Methods]
    }

    fn run(&mut self, ctx: &mut LoadingContext, _spawner: &mut Spawner<LoadingContext>) -> Result<(), BoxError> {
        let (Some(binary), Some(class)) = (
            ctx.binary.clone(),
            ctx.classes.as_ref().and_then(|c| c.first()).map(|(_, id)| *id),
        ) else {
            return Ok(());
        };
        let project = ctx.project;
        {
            let mut index = ctx.shared.write()?;
            for method in &binary.methods {
                let mut params = Vec::with_capacity(method.params.len());
                for param in &method.params {
                    params.push(binary_type(&mut index, project, param)?);
                }
                let return_type = match &method.return_type {
                    Some(ty) => binary_type(&mut index, project, ty)?,
                    None => index.primitive("void")?,
                };
                let id = index.create_method(class, &method.name, Some(params))?;
                if let Some(item) = index.get_mut(id) {
                    item.set_return_type(return_type);
                    item.set_flag(AttrKey::Binary, true);
                }
            }
            for field in &binary.fields {
                let ty = binary_type(&mut index, project, &field.ty)?;
                let id = index.create_field(class, &field.name)?;
                if let Some(item) = index.get_mut(id) {
                    item.set_field_type(ty);
                    item.set_flag(AttrKey::Binary, true);
                }
            }
        }
        ctx.shared.count(|s| {
            s.methods += binary.methods.len();
            s.fields += binary.fields.len();
        });
        ctx.methods = Some(Vec::new());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::classfile::fixture::class_bytes;
    use crate::load::WorkspaceLoader;
    use cmtscope_core::model::util::find_classes_by_fqn;
    use cmtscope_core::{ItemKind, LoadConfig};
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn write_jar(path: &std::path::Path, entries: &[(&str, Vec<u8>)]) {
        let mut zip = ZipWriter::new(File::create(path).expect("create jar"));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in entries {
            zip.start_file(*name, options).expect("start entry");
            zip.write_all(bytes).expect("write entry");
        }
        zip.finish().expect("finish jar");
    }

    #[test]
    fn compiled_classes_load_with_supertypes_and_signatures() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_jar(
            &dir.path().join("lib.jar"),
            &[
                ("com/util/Api.class", class_bytes("com/util/Api", "java/lang/Object", &[], &[])),
                ("com/util/Base.class", class_bytes("com/util/Base", "java/lang/Object", &[], &[])),
                (
                    "com/util/Lib.class",
                    class_bytes(
                        "com/util/Lib",
                        "com/util/Base",
                        &["com/util/Api"],
                        &[("put", "(I)V"), ("take", "(Lorg/gone/Missing;)[Ljava/lang/String;")],
                    ),
                ),
                ("com/util/Lib$Inner.class", class_bytes("com/util/Lib$Inner", "java/lang/Object", &[], &[])),
                (
                    "com/util/Lib.java",
                    b"package com.util;\npublic class Lib { void sourceOnly() {} }\n".to_vec(),
                ),
            ],
        );
        let config = LoadConfig {
            prune_third_party: false,
            ..LoadConfig::default()
        };
        let outcome = WorkspaceLoader::new(config).load(dir.path()).expect("load");
        let index = &outcome.index;
        assert_eq!(outcome.report.stats.class_files, 4);
        assert_eq!(outcome.report.stats.skipped_files, 0);

        let class = |name: &str| find_classes_by_fqn(index, name).first().copied().expect(name);
        let lib = class("com.util.Lib");
        let item = index.get(lib).expect("Lib");
        assert!(item.is_binary());
        assert_eq!(item.superclass(), Some(class("com.util.Base")));
        assert_eq!(item.superinterfaces(), &[class("com.util.Api")]);
        assert!(!find_classes_by_fqn(index, "com.util.Lib.Inner").is_empty());

        let put = index.find_item(Some(lib), "put", ItemKind::Method).expect("put");
        let int = index.find_primitive("int").expect("int");
        assert_eq!(index.get(put).and_then(|m| m.param_types()), Some(&[int][..]));
        assert!(index.get(put).is_some_and(|m| m.is_binary() && m.is_third_party()));

        let take = index.find_item(Some(lib), "take", ItemKind::Method).expect("take");
        let wildcard = index.find_wildcard().expect("wildcard");
        assert_eq!(index.get(take).and_then(|m| m.param_types()), Some(&[wildcard][..]));
        assert!(index.get(take).and_then(|m| m.return_type()).is_some());

        assert!(index.find_item(Some(lib), "sourceOnly", ItemKind::Method).is_none());
        assert!(index.find_item(Some(lib), "size", ItemKind::Field).is_some());
    }
}
