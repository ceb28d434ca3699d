//! Reads the API surface of compiled classes.

use crate::error::{JavaError, Result};
use ristretto_classfile::{
    BaseType, ClassAccessFlags, ClassFile, FieldAccessFlags, FieldType, MethodAccessFlags,
};
use std::io::Cursor;

/// A type as it appears in a descriptor, with class names in source form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Primitive keyword or fully-qualified class name.
    pub name: String,
    pub dims: usize,
}

impl TypeName {
    fn from_field_type(ty: &FieldType) -> Self {
        match ty {
            FieldType::Base(base) => Self {
                name: base_name(base).to_string(),
                dims: 0,
            },
            FieldType::Object(name) => Self {
                name: source_name(name),
                dims: 0,
            },
            FieldType::Array(component) => {
                let mut inner = Self::from_field_type(component);
                inner.dims += 1;
                inner
            }
        }
    }
}

fn base_name(base: &BaseType) -> &'static str {
    match base {
        BaseType::Byte => "byte",
        BaseType::Char => "char",
        BaseType::Double => "double",
        BaseType::Float => "float",
        BaseType::Int => "int",
        BaseType::Long => "long",
        BaseType::Short => "short",
        BaseType::Boolean => "boolean",
    }
}

/// `java/util/Map$Entry` to `java.util.Map.Entry`.
pub fn source_name(binary: &str) -> String {
    binary.replace(['/', '$'], ".")
}

/// Splits a binary class name into its package and nested class name:
/// `a/b/Outer$Inner` gives `("a.b", "Outer.Inner")`.
pub fn split_binary_name(binary: &str) -> (String, String) {
    match binary.rsplit_once('/') {
        Some((package, class)) => (package.replace('/', "."), class.replace('$', ".")),
        None => (String::new(), binary.replace('$', ".")),
    }
}

/// Anonymous and local classes carry a numeric segment (`Outer$1`,
/// `Outer$1Local`); they are not part of any API.
pub fn is_anonymous(binary: &str) -> bool {
    let simple = binary.rsplit('/').next().unwrap_or(binary);
    simple
        .split('$')
        .skip(1)
        .any(|segment| segment.starts_with(|c: char| c.is_ascii_digit()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMethod {
    pub name: String,
    pub params: Vec<TypeName>,
    /// `None` for `void`.
    pub return_type: Option<TypeName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryField {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryClass {
    pub package: String,
    /// Nested name relative to the package.
    pub name: String,
    pub is_public: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<BinaryMethod>,
    pub fields: Vec<BinaryField>,
}

impl BinaryClass {
    pub fn fqn(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

fn class_error(e: impl std::fmt::Debug) -> JavaError {
    JavaError::ClassFile(format!("{e:?}"))
}

/// Parses a class file. Synthetic members, bridge methods and static
/// initializers are left out.
pub fn read_class(bytes: Vec<u8>) -> Result<BinaryClass> {
    let class = ClassFile::from_bytes(&mut Cursor::new(bytes)).map_err(class_error)?;
    let pool = &class.constant_pool;

    let this = pool.try_get_class(class.this_class).map_err(class_error)?;
    let (package, name) = split_binary_name(this);
    let superclass = if class.super_class == 0 {
        None
    } else {
        Some(source_name(
            pool.try_get_class(class.super_class).map_err(class_error)?,
        ))
    };
    let interfaces = class
        .interfaces
        .iter()
        .map(|i| pool.try_get_class(*i).map(|n| source_name(n)).map_err(class_error))
        .collect::<Result<Vec<_>>>()?;

    let mut methods = Vec::new();
    for method in &class.methods {
        if method
            .access_flags
            .intersects(MethodAccessFlags::SYNTHETIC | MethodAccessFlags::BRIDGE)
        {
            continue;
        }
        let name = pool.try_get_utf8(method.name_index).map_err(class_error)?;
        if name == "<clinit>" {
            continue;
        }
        let descriptor = pool.try_get_utf8(method.descriptor_index).map_err(class_error)?;
        let (params, ret) = FieldType::parse_method_descriptor(descriptor).map_err(class_error)?;
        methods.push(BinaryMethod {
            name: name.to_string(),
            params: params.iter().map(TypeName::from_field_type).collect(),
            return_type: ret.as_ref().map(TypeName::from_field_type),
        });
    }

    let mut fields = Vec::new();
    for field in &class.fields {
        if field.access_flags.contains(FieldAccessFlags::SYNTHETIC) {
            continue;
        }
        let name = pool.try_get_utf8(field.name_index).map_err(class_error)?;
        fields.push(BinaryField {
            name: name.to_string(),
            ty: TypeName::from_field_type(&field.field_type),
        });
    }

    Ok(BinaryClass {
        package,
        name,
        is_public: class.access_flags.contains(ClassAccessFlags::PUBLIC),
        superclass,
        interfaces,
        methods,
        fields,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_assembled_class_is_read() {
        let bytes = fixture::class_bytes(
            "com/acme/Outer$Inner",
            "java/lang/Object",
            &["java/io/Serializable"],
            &[("<init>", "()V"), ("run", "(Ljava/lang/String;[[I)Ljava/util/Map$Entry;")],
        );
        let class = read_class(bytes).expect("class file");
        assert_eq!(class.package, "com.acme");
        assert_eq!(class.name, "Outer.Inner");
        assert_eq!(class.fqn(), "com.acme.Outer.Inner");
        assert!(class.is_public);
        assert_eq!(class.superclass.as_deref(), Some("java.lang.Object"));
        assert_eq!(class.interfaces, vec!["java.io.Serializable".to_string()]);
        assert_eq!(class.fields[0].ty, TypeName { name: "long".into(), dims: 0 });

        let run = &class.methods[1];
        assert_eq!(run.name, "run");
        assert_eq!(
            run.params,
            vec![
                TypeName { name: "java.lang.String".into(), dims: 0 },
                TypeName { name: "int".into(), dims: 2 },
            ]
        );
        assert_eq!(
            run.return_type,
            Some(TypeName { name: "java.util.Map.Entry".into(), dims: 0 })
        );
        assert_eq!(class.methods[0].return_type, None);
    }

    #[test]
    fn anonymous_classes_are_recognized() {
        assert!(is_anonymous("a/B$1"));
        assert!(is_anonymous("a/B$1Local"));
        assert!(!is_anonymous("a/B$Inner"));
        assert!(!is_anonymous("B"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(read_class(vec![1, 2, 3]), Err(JavaError::ClassFile(_))));
    }
}
