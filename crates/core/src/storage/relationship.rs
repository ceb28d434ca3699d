use crate::error::{CoreError, Result};
use crate::model::{ItemId, JavaItem, JavaItemIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelKind {
    Child,
    Dependency,
    Superclass,
    Superinterface,
    ReturnType,
    ParamType,
    FieldType,
    Throws,
    InnerClass,
    OuterClass,
    ArrayBase,
}

impl RelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelKind::Child => "CHILD",
            RelKind::Dependency => "DEPENDENCY",
            RelKind::Superclass => "SUPERCLASS",
            RelKind::Superinterface => "SUPERINTERFACE",
            RelKind::ReturnType => "RETURN_TYPE",
            RelKind::ParamType => "PARAM_TYPE",
            RelKind::FieldType => "FIELD_TYPE",
            RelKind::Throws => "THROWS",
            RelKind::InnerClass => "INNER_CLASS",
            RelKind::OuterClass => "OUTER_CLASS",
            RelKind::ArrayBase => "ARRAY_BASE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "CHILD" => RelKind::Child,
            "DEPENDENCY" => RelKind::Dependency,
            "SUPERCLASS" => RelKind::Superclass,
            "SUPERINTERFACE" => RelKind::Superinterface,
            "RETURN_TYPE" => RelKind::ReturnType,
            "PARAM_TYPE" => RelKind::ParamType,
            "FIELD_TYPE" => RelKind::FieldType,
            "THROWS" => RelKind::Throws,
            "INNER_CLASS" => RelKind::InnerClass,
            "OUTER_CLASS" => RelKind::OuterClass,
            "ARRAY_BASE" => RelKind::ArrayBase,
            _ => return None,
        })
    }
}

/// One persisted edge between raw IDs. Only exists while a snapshot is being
/// written or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub source: u32,
    pub target: u32,
    pub kind: RelKind,
}

impl Relationship {
    fn new(source: ItemId, target: ItemId, kind: RelKind) -> Self {
        Self {
            source: source.raw(),
            target: target.raw(),
            kind,
        }
    }

    /// Outgoing edges of `item`. Incoming edges and parents are implied by
    /// `DEPENDENCY` and `CHILD`, so they are not emitted.
    pub fn of_item(item: &JavaItem) -> Vec<Relationship> {
        let id = item.id();
        let mut out = Vec::new();
        let mut push = |target: ItemId, kind| out.push(Relationship::new(id, target, kind));
        for child in item.children() {
            push(*child, RelKind::Child);
        }
        for dep in item.dependencies() {
            push(*dep, RelKind::Dependency);
        }
        if let Some(t) = item.superclass() {
            push(t, RelKind::Superclass);
        }
        for t in item.superinterfaces() {
            push(*t, RelKind::Superinterface);
        }
        if let Some(t) = item.return_type() {
            push(t, RelKind::ReturnType);
        }
        for t in item.param_types().unwrap_or(&[]) {
            push(*t, RelKind::ParamType);
        }
        if let Some(t) = item.field_type() {
            push(t, RelKind::FieldType);
        }
        for t in item.thrown_types() {
            push(*t, RelKind::Throws);
        }
        for t in item.inner_classes() {
            push(*t, RelKind::InnerClass);
        }
        if let Some(t) = item.outer_class() {
            push(t, RelKind::OuterClass);
        }
        if let Some(t) = item.array_base() {
            push(t, RelKind::ArrayBase);
        }
        out
    }

    pub fn to_line(&self) -> String {
        format!("r s {} t {} r {}", self.source, self.target, self.kind.as_str())
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let bad = || CoreError::Snapshot(format!("malformed relationship line: {line}"));
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["r", "s", source, "t", target, "r", kind] => Ok(Self {
                source: source.parse().map_err(|_| bad())?,
                target: target.parse().map_err(|_| bad())?,
                kind: RelKind::parse(kind).ok_or_else(bad)?,
            }),
            _ => Err(bad()),
        }
    }

    /// Re-creates the edge in `index`, whose items carry the persisted raw IDs.
    pub fn apply(&self, index: &mut JavaItemIndex) -> Result<()> {
        let resolve = |raw: u32| {
            index
                .resolve_raw(raw)
                .ok_or_else(|| CoreError::Snapshot(format!("relationship names unknown id {raw}")))
        };
        let source = resolve(self.source)?;
        let target = resolve(self.target)?;
        if self.kind == RelKind::Child {
            return index.set_parent(target, source);
        }
        if self.kind == RelKind::Dependency {
            index.add_dependency(source, target);
            return Ok(());
        }
        let item = index
            .get_mut(source)
            .ok_or_else(|| CoreError::Snapshot(format!("unknown id {}", self.source)))?;
        match self.kind {
            RelKind::Superclass => item.set_superclass(target),
            RelKind::Superinterface => item.add_superinterface(target),
            RelKind::ReturnType => item.set_return_type(target),
            RelKind::ParamType => item.push_param_type(target),
            RelKind::FieldType => item.set_field_type(target),
            RelKind::Throws => item.add_thrown_type(target),
            RelKind::InnerClass => item.add_inner_class(target),
            RelKind::OuterClass => item.set_outer_class(target),
            RelKind::ArrayBase => item.set_array_base(target),
            RelKind::Child | RelKind::Dependency => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_is_stable() {
        let rel = Relationship::parse_line("r s 12 t 40 r PARAM_TYPE").expect("parse");
        assert_eq!(rel.source, 12);
        assert_eq!(rel.target, 40);
        assert_eq!(rel.kind, RelKind::ParamType);
        assert_eq!(rel.to_line(), "r s 12 t 40 r PARAM_TYPE");
        assert!(Relationship::parse_line("r s 1 t x r CHILD").is_err());
    }
}
