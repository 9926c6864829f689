use tree_sitter::Node;

use super::{field_text, node_text, walk_preorder, DeclKind, Declaration, FileFacts};

pub(super) fn collect(root: Node<'_>, source: &[u8], facts: &mut FileFacts) {
    facts.leading_doc = inner_doc(root, source);

    walk_preorder(root, |node| {
        let named = |kind: DeclKind, field: &str| {
            field_text(node, field, source).map(|name| Declaration::new(kind, name))
        };

        let decl = match node.kind() {
            "function_item" | "function_signature_item" => named(DeclKind::Function, "name"),
            "struct_item" => named(DeclKind::Struct, "name"),
            "enum_item" => named(DeclKind::Enum, "name"),
            "trait_item" => named(DeclKind::Trait, "name"),
            "union_item" => named(DeclKind::Union, "name"),
            "type_item" => named(DeclKind::TypeAlias, "name"),
            "mod_item" => named(DeclKind::Module, "name"),
            "const_item" => named(DeclKind::Const, "name"),
            "static_item" => named(DeclKind::Static, "name"),
            "macro_definition" => named(DeclKind::Macro, "name"),
            "impl_item" => named(DeclKind::Impl, "type"),
            "use_declaration" => {
                if let Some(path) = field_text(node, "argument", source) {
                    facts.imports.insert(path);
                }
                None
            }
            "extern_crate_declaration" => {
                if let Some(name) = field_text(node, "name", source) {
                    facts.imports.insert(name);
                }
                None
            }
            _ => None,
        };

        if let Some(decl) = decl {
            facts.declarations.push(decl);
        }
    });
}

/// Leading `//!` lines or a leading `/*! */` block
fn inner_doc(root: Node<'_>, source: &[u8]) -> Option<String> {
    let mut lines = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        let Some(text) = node_text(child, source) else {
            break;
        };
        match child.kind() {
            "line_comment" if text.starts_with("//!") => {
                let line = text.trim_end().trim_start_matches("//!");
                lines.push(line.strip_prefix(' ').unwrap_or(line).to_string());
            }
            "block_comment" if text.starts_with("/*!") && lines.is_empty() => {
                let body = text
                    .trim_start_matches("/*!")
                    .trim_end_matches("*/")
                    .trim();
                lines.push(body.to_string());
                break;
            }
            _ => break,
        }
    }

    let doc = lines.join("\n").trim().to_string();
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}
