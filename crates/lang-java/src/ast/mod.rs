//! A compact Java syntax tree lowered from tree-sitter.
//!
//! Only the node kinds the resolver and the search engine look at get their
//! own [`AstKind`]; everything else is kept as [`AstKind::Other`] so that
//! traversal still reaches the nodes below it.

mod lower;
mod unit;
mod visit;

pub use lower::JavaParser;
pub use unit::{CompilationUnit, Import};
pub use visit::{Visitor, walk, walk_from};

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstId(u32);

impl AstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Boolean,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstKind {
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    AnnotationDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    FieldDeclaration,
    EnumConstant,
    LocalVariableDeclaration,
    VariableDeclarator,
    FormalParameter,
    TypeParameter,
    Modifiers,
    SimpleType,
    QualifiedType,
    ArrayType,
    PrimitiveType,
    ParameterizedType,
    MethodInvocation,
    /// `this(...)` or `super(...)` inside a constructor.
    ConstructorInvocation,
    ObjectCreation,
    Name,
    QualifiedName,
    FieldAccess,
    This,
    Super,
    Literal(LiteralKind),
    Cast,
    Parenthesized,
    Block,
    Lambda,
    CatchClause,
    For,
    EnhancedFor,
    Other,
}

impl AstKind {
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            AstKind::ClassDeclaration
                | AstKind::InterfaceDeclaration
                | AstKind::EnumDeclaration
                | AstKind::RecordDeclaration
                | AstKind::AnnotationDeclaration
        )
    }

    pub fn is_method_declaration(self) -> bool {
        matches!(
            self,
            AstKind::MethodDeclaration | AstKind::ConstructorDeclaration
        )
    }

    /// Kinds that denote a type in source: `Foo`, `a.b.Foo`, `int`, `Foo[]`,
    /// `Foo<Bar>`.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            AstKind::SimpleType
                | AstKind::QualifiedType
                | AstKind::ArrayType
                | AstKind::PrimitiveType
                | AstKind::ParameterizedType
        )
    }

    /// Nodes that open a lexical scope for local variables.
    pub fn opens_scope(self) -> bool {
        matches!(
            self,
            AstKind::Block
                | AstKind::Lambda
                | AstKind::CatchClause
                | AstKind::For
                | AstKind::EnhancedFor
                | AstKind::MethodDeclaration
                | AstKind::ConstructorDeclaration
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AstKind::CompilationUnit => "CompilationUnit",
            AstKind::PackageDeclaration => "PackageDeclaration",
            AstKind::ImportDeclaration => "ImportDeclaration",
            AstKind::ClassDeclaration => "ClassDeclaration",
            AstKind::InterfaceDeclaration => "InterfaceDeclaration",
            AstKind::EnumDeclaration => "EnumDeclaration",
            AstKind::RecordDeclaration => "RecordDeclaration",
            AstKind::AnnotationDeclaration => "AnnotationDeclaration",
            AstKind::MethodDeclaration => "MethodDeclaration",
            AstKind::ConstructorDeclaration => "ConstructorDeclaration",
            AstKind::FieldDeclaration => "FieldDeclaration",
            AstKind::EnumConstant => "EnumConstant",
            AstKind::LocalVariableDeclaration => "LocalVariableDeclaration",
            AstKind::VariableDeclarator => "VariableDeclarator",
            AstKind::FormalParameter => "FormalParameter",
            AstKind::TypeParameter => "TypeParameter",
            AstKind::Modifiers => "Modifiers",
            AstKind::SimpleType => "SimpleType",
            AstKind::QualifiedType => "QualifiedType",
            AstKind::ArrayType => "ArrayType",
            AstKind::PrimitiveType => "PrimitiveType",
            AstKind::ParameterizedType => "ParameterizedType",
            AstKind::MethodInvocation => "MethodInvocation",
            AstKind::ConstructorInvocation => "ConstructorInvocation",
            AstKind::ObjectCreation => "ObjectCreation",
            AstKind::Name => "Name",
            AstKind::QualifiedName => "QualifiedName",
            AstKind::FieldAccess => "FieldAccess",
            AstKind::This => "This",
            AstKind::Super => "Super",
            AstKind::Literal(_) => "Literal",
            AstKind::Cast => "Cast",
            AstKind::Parenthesized => "Parenthesized",
            AstKind::Block => "Block",
            AstKind::Lambda => "Lambda",
            AstKind::CatchClause => "CatchClause",
            AstKind::For => "For",
            AstKind::EnhancedFor => "EnhancedFor",
            AstKind::Other => "Other",
        }
    }
}

/// Position of a node within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Root,
    Name,
    Type,
    ReturnType,
    Superclass,
    Interface,
    Parameter,
    Throws,
    Member,
    Body,
    Receiver,
    Argument,
    Value,
    Declarator,
    TypeArgument,
    TypeParameter,
    Other,
}

#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: AstKind,
    pub role: Role,
    pub span: Span,
    pub parent: Option<AstId>,
    pub children: Vec<AstId>,
}

#[derive(Debug, Clone)]
pub struct Ast {
    source: Arc<str>,
    nodes: Vec<AstNode>,
}

impl Ast {
    pub(crate) fn new(source: Arc<str>) -> Self {
        Self {
            source,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, kind: AstKind, role: Role, span: Span, parent: Option<AstId>) -> AstId {
        let id = AstId(self.nodes.len() as u32);
        self.nodes.push(AstNode {
            kind,
            role,
            span,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub fn root(&self) -> AstId {
        AstId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = AstId> + '_ {
        (0..self.nodes.len() as u32).map(AstId)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: AstId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: AstId) -> AstKind {
        self.node(id).kind
    }

    pub fn span(&self, id: AstId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: AstId) -> Option<AstId> {
        self.node(id).parent
    }

    pub fn children(&self, id: AstId) -> &[AstId] {
        &self.node(id).children
    }

    pub fn text(&self, id: AstId) -> &str {
        let span = self.span(id);
        self.source.get(span.start..span.end()).unwrap_or("")
    }

    pub fn child_with_role(&self, id: AstId, role: Role) -> Option<AstId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).role == role)
    }

    pub fn children_with_role(&self, id: AstId, role: Role) -> impl Iterator<Item = AstId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.node(*c).role == role)
    }

    pub fn children_of_kind(&self, id: AstId, kind: AstKind) -> impl Iterator<Item = AstId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.node(*c).kind == kind)
    }

    /// Text of the `Name` child, e.g. the identifier of a declaration.
    pub fn name_of(&self, id: AstId) -> Option<&str> {
        self.child_with_role(id, Role::Name).map(|n| self.text(n))
    }

    /// Strict ancestors, innermost first.
    pub fn ancestors(&self, id: AstId) -> impl Iterator<Item = AstId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    pub fn enclosing(&self, id: AstId, pred: impl Fn(AstKind) -> bool) -> Option<AstId> {
        self.ancestors(id).find(|a| pred(self.kind(*a)))
    }

    pub fn enclosing_type_declaration(&self, id: AstId) -> Option<AstId> {
        self.enclosing(id, AstKind::is_type_declaration)
    }

    pub fn enclosing_method(&self, id: AstId) -> Option<AstId> {
        self.enclosing(id, AstKind::is_method_declaration)
    }

    /// Nested name of a type declaration relative to its package:
    /// `Outer.Inner` for `Inner` declared inside `Outer`.
    pub fn nested_type_name(&self, decl: AstId) -> Option<String> {
        let mut parts = vec![self.name_of(decl)?];
        for outer in self.ancestors(decl) {
            if self.kind(outer).is_type_declaration() {
                parts.push(self.name_of(outer)?);
            }
        }
        parts.reverse();
        Some(parts.join("."))
    }

    /// Dimension count of an `ArrayType` node.
    pub fn array_dims(&self, id: AstId) -> usize {
        let span = self.span(id);
        let from = self
            .child_with_role(id, Role::Type)
            .map(|e| self.span(e).end())
            .unwrap_or(span.start);
        self.source
            .get(from..span.end())
            .map_or(0, |s| s.matches('[').count())
    }

    /// Whether the declaration's modifiers contain `keyword`.
    pub fn has_modifier(&self, decl: AstId, keyword: &str) -> bool {
        self.children_of_kind(decl, AstKind::Modifiers)
            .any(|m| self.text(m).split_whitespace().any(|w| w == keyword))
    }

    /// Type parameter names declared directly on a class or method.
    pub fn type_parameter_names(&self, decl: AstId) -> impl Iterator<Item = &str> + '_ {
        self.children_with_role(decl, Role::TypeParameter)
            .filter_map(move |p| self.name_of(p))
    }

    /// Argument expressions of a call or instance creation.
    pub fn arguments(&self, call: AstId) -> Vec<AstId> {
        self.children_with_role(call, Role::Argument).collect()
    }
}
