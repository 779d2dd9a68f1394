//! Java import extraction
//!
//! - Single type: `import javax.crypto.Cipher;`
//! - On demand: `import javax.crypto.*;`
//! - Static member: `import static javax.crypto.Cipher.ENCRYPT_MODE;`

use super::{node_text, ImportMap};
use tree_sitter::{Node, Tree};

pub fn extract(tree: &Tree, source: &[u8]) -> ImportMap {
    let mut imports = ImportMap::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "import_declaration" {
            process_import(child, source, &mut imports);
        }
    }
    imports
}

pub fn extract_package(tree: &Tree, source: &[u8]) -> Option<String> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    let package = root
        .named_children(&mut cursor)
        .find(|child| child.kind() == "package_declaration")?;
    let mut inner = package.walk();
    let name = package
        .named_children(&mut inner)
        .find(|child| matches!(child.kind(), "scoped_identifier" | "identifier"))?;
    Some(node_text(&name, source))
}

fn process_import(node: Node, source: &[u8], imports: &mut ImportMap) {
    let mut path: Option<String> = None;
    let mut wildcard = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "scoped_identifier" | "identifier" => path = Some(node_text(&child, source)),
            "asterisk" => wildcard = true,
            _ => {}
        }
    }

    let Some(path) = path else {
        return;
    };
    if wildcard {
        imports.insert_wildcard(path);
        return;
    }
    if let Some((_, short)) = path.rsplit_once('.') {
        imports.insert(short, path.as_str());
    }
}
