use tree_sitter::Node;

use super::{field_text, node_text, walk_preorder, DeclKind, Declaration, FileFacts};

pub(super) fn collect(root: Node<'_>, source: &[u8], facts: &mut FileFacts) {
    facts.leading_doc = module_docstring(root, source);

    walk_preorder(root, |node| match node.kind() {
        "class_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                facts.declarations.push(Declaration::new(DeclKind::Class, name));
            }
        }
        "function_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                facts
                    .declarations
                    .push(Declaration::new(DeclKind::Function, name));
            }
        }
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(module) = imported_name(name, source) {
                    facts.imports.insert(module);
                }
            }
        }
        "import_from_statement" => {
            // Relative levels are dropped: `from .pkg import n` -> `pkg.n`
            let module = field_text(node, "module_name", source)
                .map(|m| m.trim_start_matches('.').to_string())
                .unwrap_or_default();

            let mut cursor = node.walk();
            let mut any = false;
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(name) = imported_name(name, source) {
                    facts.imports.insert(format!("{}.{}", module, name));
                    any = true;
                }
            }
            if !any && has_child(node, "wildcard_import") {
                facts.imports.insert(format!("{}.*", module));
            }
        }
        _ => {}
    });
}

/// `a.b` for a dotted name, the original name for `a as x`
fn imported_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "aliased_import" => field_text(node, "name", source),
        _ => node_text(node, source).map(|s| s.trim().to_string()),
    }
}

fn has_child(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

/// First statement of the module, when it is a bare string literal
fn module_docstring(root: Node<'_>, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    let first = root
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    let doc = strip_string_literal(node_text(literal, source)?);
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

fn strip_string_literal(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    body.trim().to_string()
}
