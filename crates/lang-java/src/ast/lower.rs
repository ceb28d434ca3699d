use super::{Ast, AstId, AstKind, CompilationUnit, LiteralKind, Role, Span};
use crate::error::{JavaError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tree_sitter::Node;

/// Parses Java source with tree-sitter and lowers it into an [`Ast`].
///
/// Holds only the grammar; every call builds its own `tree_sitter::Parser`,
/// so one `JavaParser` can be shared by worker threads.
#[derive(Clone)]
pub struct JavaParser {
    language: tree_sitter::Language,
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    pub fn parse(&self, path: impl Into<PathBuf>, source: &str) -> Result<CompilationUnit> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| JavaError::Parse(format!("loading Java grammar: {e}")))?;
        let path = path.into();
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| JavaError::Parse(format!("no tree for {}", path.display())))?;

        let root = tree.root_node();
        let mut ast = Ast::new(Arc::from(source));
        let root_id = ast.push(AstKind::CompilationUnit, Role::Root, span_of(&root), None);
        lower_children(&mut ast, root, root_id, None);
        Ok(CompilationUnit::new(path, ast, root.has_error()))
    }
}

enum Lowering {
    Keep(AstKind),
    Leaf(AstKind),
    /// Drop the wrapper and hand its children to the enclosing node, with the
    /// given role or the wrapper's own.
    Flatten(Option<Role>),
    Skip,
}

fn span_of(node: &Node) -> Span {
    Span {
        start: node.start_byte(),
        len: node.end_byte() - node.start_byte(),
    }
}

fn lower_children(ast: &mut Ast, node: Node, parent: AstId, role_override: Option<Role>) {
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return;
    }
    loop {
        let child = cursor.node();
        if child.is_named() {
            let role = role_override
                .unwrap_or_else(|| role_for(node.kind(), cursor.field_name(), child.kind()));
            lower_node(ast, child, node.kind(), parent, role);
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
}

fn lower_node(ast: &mut Ast, node: Node, parent_kind: &str, parent: AstId, role: Role) {
    match classify(ast.source(), &node, parent_kind) {
        Lowering::Skip => {}
        Lowering::Flatten(wrapper_role) => {
            lower_children(ast, node, parent, Some(wrapper_role.unwrap_or(role)));
        }
        Lowering::Leaf(kind) => {
            ast.push(kind, role, span_of(&node), Some(parent));
        }
        Lowering::Keep(kind) => {
            let id = ast.push(kind, role, span_of(&node), Some(parent));
            lower_children(ast, node, id, None);
        }
    }
}

fn is_ts_type(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
    )
}

fn role_for(parent: &str, field: Option<&str>, child: &str) -> Role {
    match field {
        Some("name") | Some("field") => Role::Name,
        Some("type")
            if matches!(
                parent,
                "method_declaration" | "annotation_type_element_declaration"
            ) =>
        {
            Role::ReturnType
        }
        Some("type") | Some("element") => Role::Type,
        Some("body") => Role::Body,
        Some("object") => Role::Receiver,
        Some("value") => Role::Value,
        Some("declarator") => Role::Declarator,
        Some("superclass") => Role::Superclass,
        Some("interfaces") => Role::Interface,
        Some("parameters") => Role::Parameter,
        Some("arguments") => Role::Argument,
        Some("type_arguments") => Role::TypeArgument,
        Some("type_parameters") => Role::TypeParameter,
        _ => match (parent, child) {
            ("type_parameter", "type_identifier") => Role::Name,
            ("generic_type", k) if is_ts_type(k) => Role::Type,
            ("spread_parameter", "variable_declarator") => Role::Declarator,
            ("spread_parameter", k) if is_ts_type(k) => Role::Type,
            ("interface_declaration", "extends_interfaces") => Role::Interface,
            (_, "throws") => Role::Throws,
            _ => Role::Other,
        },
    }
}

fn classify(source: &str, node: &Node, parent_kind: &str) -> Lowering {
    use AstKind as K;
    use Lowering::*;
    match node.kind() {
        "package_declaration" => Keep(K::PackageDeclaration),
        "import_declaration" => Keep(K::ImportDeclaration),
        "class_declaration" => Keep(K::ClassDeclaration),
        "interface_declaration" => Keep(K::InterfaceDeclaration),
        "enum_declaration" => Keep(K::EnumDeclaration),
        "record_declaration" => Keep(K::RecordDeclaration),
        "annotation_type_declaration" => Keep(K::AnnotationDeclaration),
        "method_declaration" | "annotation_type_element_declaration" => {
            Keep(K::MethodDeclaration)
        }
        "constructor_declaration" | "compact_constructor_declaration" => {
            Keep(K::ConstructorDeclaration)
        }
        "field_declaration" | "constant_declaration" => Keep(K::FieldDeclaration),
        "enum_constant" => Keep(K::EnumConstant),
        "local_variable_declaration" => Keep(K::LocalVariableDeclaration),
        "variable_declarator" => Keep(K::VariableDeclarator),
        "formal_parameter" | "spread_parameter" | "catch_formal_parameter" => {
            Keep(K::FormalParameter)
        }
        "type_parameter" => Keep(K::TypeParameter),
        "modifiers" => Leaf(K::Modifiers),

        "type_identifier" if parent_kind == "type_parameter" => Leaf(K::Name),
        "type_identifier" => Leaf(K::SimpleType),
        "scoped_type_identifier" => Leaf(K::QualifiedType),
        "array_type" => Keep(K::ArrayType),
        "generic_type" => Keep(K::ParameterizedType),
        "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
            Leaf(K::PrimitiveType)
        }

        "method_invocation" => Keep(K::MethodInvocation),
        "explicit_constructor_invocation" => Keep(K::ConstructorInvocation),
        "object_creation_expression" => Keep(K::ObjectCreation),
        "identifier" => Leaf(K::Name),
        "scoped_identifier" => Leaf(K::QualifiedName),
        "field_access" => Keep(K::FieldAccess),
        "this" => Leaf(K::This),
        "super" => Leaf(K::Super),
        "cast_expression" => Keep(K::Cast),
        "parenthesized_expression" => Keep(K::Parenthesized),
        "block" | "constructor_body" => Keep(K::Block),
        "lambda_expression" => Keep(K::Lambda),
        "catch_clause" => Keep(K::CatchClause),
        "for_statement" => Keep(K::For),
        "enhanced_for_statement" => Keep(K::EnhancedFor),

        "decimal_integer_literal"
        | "hex_integer_literal"
        | "octal_integer_literal"
        | "binary_integer_literal" => {
            let text = &source[node.start_byte()..node.end_byte()];
            if text.ends_with(['l', 'L']) {
                Leaf(K::Literal(LiteralKind::Long))
            } else {
                Leaf(K::Literal(LiteralKind::Int))
            }
        }
        "decimal_floating_point_literal" | "hex_floating_point_literal" => {
            let text = &source[node.start_byte()..node.end_byte()];
            if text.ends_with(['f', 'F']) {
                Leaf(K::Literal(LiteralKind::Float))
            } else {
                Leaf(K::Literal(LiteralKind::Double))
            }
        }
        "character_literal" => Leaf(K::Literal(LiteralKind::Char)),
        "string_literal" | "text_block" => Leaf(K::Literal(LiteralKind::String)),
        "true" | "false" => Leaf(K::Literal(LiteralKind::Boolean)),
        "null_literal" => Leaf(K::Literal(LiteralKind::Null)),

        "superclass" => Flatten(Some(Role::Superclass)),
        "super_interfaces" | "extends_interfaces" => Flatten(Some(Role::Interface)),
        "formal_parameters" | "inferred_parameters" => Flatten(Some(Role::Parameter)),
        "argument_list" => Flatten(Some(Role::Argument)),
        "throws" => Flatten(Some(Role::Throws)),
        "class_body" | "interface_body" | "enum_body" | "enum_body_declarations"
        | "annotation_type_body" => Flatten(Some(Role::Member)),
        "type_arguments" => Flatten(Some(Role::TypeArgument)),
        "type_parameters" => Flatten(Some(Role::TypeParameter)),
        "catch_type" => Flatten(Some(Role::Type)),
        "type_list" => Flatten(None),

        "dimensions" | "line_comment" | "block_comment" => Skip,
        _ => Keep(K::Other),
    }
}
