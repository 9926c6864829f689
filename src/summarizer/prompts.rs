//! Prompt templates
//!
//! Labels and wording are part of the cache contract in practice: changing
//! them changes what a regenerated summary looks like, not when it is
//! regenerated.

use crate::analyzer::{DeclKind, FileFacts, Language};

/// Label for raw file text
pub const FILE_LABEL: &str = "file content";

/// Label for a directory's concatenated file summaries
pub const DIRECTORY_LABEL: &str = "directory summaries";

/// Label for the concatenated directory summaries
pub const CODEBASE_LABEL: &str = "codebase";

/// Label used when an oversized facts prompt has to be chunked
pub const FACTS_LABEL: &str = "file description";

pub fn single(label: &str, text: &str) -> String {
    format!("Summarize the following {}:\n{}", label, text)
}

pub fn chunk(index: usize, label: &str, chunk: &str) -> String {
    format!(
        "You are summarizing chunk #{} of a large {}.\n\
         Focus on key functionalities, classes, dependencies, purpose, etc.\n\
         {}",
        index, label, chunk
    )
}

pub fn reduce(partials: &[String]) -> String {
    format!(
        "Combine these chunk-level summaries into one cohesive final summary:\n\n{}",
        partials.join("\n\n")
    )
}

/// Structured description of one file
pub fn facts(path: &str, facts: &FileFacts) -> String {
    let types_heading = match facts.language {
        Language::Python => "Classes",
        _ => "Types",
    };
    let types = facts.names_where(DeclKind::is_type);
    let functions = facts.names_where(|k| k == DeclKind::Function);
    let others: Vec<String> = facts
        .declarations
        .iter()
        .filter(|d| !d.kind.is_type() && d.kind != DeclKind::Function)
        .map(|d| format!("{} {}", d.kind, d.name))
        .collect();
    let imports: Vec<&str> = facts.imports.iter().map(String::as_str).collect();

    let mut prompt = format!(
        "You are generating documentation for this {} file.\n\
         Summarize key classes, functions, imports, and the file's overall purpose.\n\
         File: {}\n\
         Docstring: {}\n\
         {}: {}\n\
         Functions: {}\n",
        facts.language.display_name(),
        path,
        facts.leading_doc.as_deref().unwrap_or("No top-level docstring."),
        types_heading,
        list(&types),
        list(&functions),
    );
    if !others.is_empty() {
        prompt.push_str(&format!("Other declarations: {}\n", list(&others)));
    }
    prompt.push_str(&format!("Imports: {}\n", list(&imports)));
    prompt
}

/// One section of a directory input
pub fn file_entry(path: &str, summary: &str) -> String {
    format!("FILE: {}\nSUMMARY:\n{}\n", path, summary)
}

/// One section of the codebase input
pub fn directory_entry(path: &str, summary: &str) -> String {
    format!("DIR: {}\nSUMMARY:\n{}\n", path, summary)
}

fn list<S: AsRef<str>>(items: &[S]) -> String {
    let joined = items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Declaration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_and_chunk() {
        assert_eq!(single("codebase", "x"), "Summarize the following codebase:\nx");
        assert_eq!(
            chunk(2, "file content", "body"),
            "You are summarizing chunk #2 of a large file content.\n\
             Focus on key functionalities, classes, dependencies, purpose, etc.\n\
             body"
        );
    }

    #[test]
    fn test_reduce_joins_in_order() {
        let partials = vec!["one".to_string(), "two".to_string()];
        assert_eq!(
            reduce(&partials),
            "Combine these chunk-level summaries into one cohesive final summary:\n\none\n\ntwo"
        );
    }

    #[test]
    fn test_facts_prompt() {
        let mut facts = FileFacts::new(Language::Python);
        facts.declarations = vec![
            Declaration::new(DeclKind::Class, "Order"),
            Declaration::new(DeclKind::Function, "total"),
        ];
        facts.imports.insert("os".to_string());

        assert_eq!(
            super::facts("pkg/a.py", &facts),
            "You are generating documentation for this Python file.\n\
             Summarize key classes, functions, imports, and the file's overall purpose.\n\
             File: pkg/a.py\n\
             Docstring: No top-level docstring.\n\
             Classes: [Order]\n\
             Functions: [total]\n\
             Imports: [os]\n"
        );
    }

    #[test]
    fn test_facts_prompt_rust_other_declarations() {
        let mut facts = FileFacts::new(Language::Rust);
        facts.leading_doc = Some("Orders.".to_string());
        facts.declarations = vec![
            Declaration::new(DeclKind::Struct, "Order"),
            Declaration::new(DeclKind::Impl, "Order"),
        ];
        let prompt = super::facts("src/order.rs", &facts);
        assert!(prompt.contains("Docstring: Orders.\n"));
        assert!(prompt.contains("Types: [Order]\n"));
        assert!(prompt.contains("Other declarations: [impl Order]\n"));
        assert!(prompt.ends_with("Imports: []\n"));
    }

    #[test]
    fn test_entries() {
        assert_eq!(file_entry("a.py", "S"), "FILE: a.py\nSUMMARY:\nS\n");
        assert_eq!(directory_entry(".", "S"), "DIR: .\nSUMMARY:\nS\n");
    }
}
