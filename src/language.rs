//! Supported grammars and the built-in language database.

use lazy_static::lazy_static;
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::syntax::CHILDREN;

/// A grammar which sources can be parsed with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// JavaScript, including JSX.
    #[default]
    JavaScript,
    /// TypeScript without JSX.
    TypeScript,
    /// TypeScript with JSX.
    Tsx,
}

#[derive(Clone, Debug, Deserialize)]
struct Defaults {
    extensions: Vec<String>,
    grammar: Language,
}

const BUILTIN_DATABASE: &str = include_str!("../languages.json");

lazy_static! {
    static ref PARSED_DB: BTreeMap<String, Defaults> = serde_json::from_str(BUILTIN_DATABASE)
        .unwrap_or_else(|e| {
            warn!("Built-in JSON database has a syntax error: {}", e);
            BTreeMap::new()
        });
    static ref EXTENSION_TO_LANGUAGE: HashMap<String, Language> = {
        let mut res = HashMap::new();
        for defaults in PARSED_DB.values() {
            for ext in &defaults.extensions {
                res.insert(ext.to_string(), defaults.grammar);
            }
        }
        res
    };
    static ref JAVASCRIPT_SHAPES: Shapes = Shapes::load(tree_sitter_javascript::NODE_TYPES);
    static ref TYPESCRIPT_SHAPES: Shapes =
        Shapes::load(tree_sitter_typescript::TYPESCRIPT_NODE_TYPES);
    static ref TSX_SHAPES: Shapes = Shapes::load(tree_sitter_typescript::TSX_NODE_TYPES);
}

impl Language {
    /// Look up a language by its database name (eg. "typescript").
    pub fn by_name(name: &str) -> Option<Language> {
        PARSED_DB.get(name).map(|d| d.grammar)
    }

    /// Pick a language from the extension of `path`.
    ///
    /// ```
    /// use codegrep::language::Language;
    /// assert_eq!(Language::for_path("a/b.tsx".as_ref()), Some(Language::Tsx));
    /// assert_eq!(Language::for_path("a/b.rs".as_ref()), None);
    /// ```
    pub fn for_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_string_lossy();
        EXTENSION_TO_LANGUAGE.get(ext.as_ref()).copied()
    }

    /// The tree-sitter grammar for this language.
    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Field shapes of the grammar's node kinds.
    pub fn shapes(self) -> &'static Shapes {
        match self {
            Language::JavaScript => &*JAVASCRIPT_SHAPES,
            Language::TypeScript => &*TYPESCRIPT_SHAPES,
            Language::Tsx => &*TSX_SHAPES,
        }
    }
}

/// Names and extensions of every language in the database, sorted by name.
pub fn languages() -> Vec<(&'static str, &'static [String])> {
    PARSED_DB
        .iter()
        .map(|(name, defaults)| (name.as_str(), defaults.extensions.as_slice()))
        .collect()
}

/// A glob matching every file extension in the database.
pub fn default_glob() -> String {
    let mut extensions = PARSED_DB
        .values()
        .flat_map(|d| d.extensions.iter().map(String::as_str))
        .collect::<Vec<_>>();
    extensions.sort_unstable();
    extensions.dedup();
    format!("**/*.{{{}}}", extensions.join(","))
}

#[derive(Debug, Deserialize)]
struct NodeTypeEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    fields: BTreeMap<String, ChildInfo>,
    children: Option<ChildInfo>,
}

#[derive(Debug, Deserialize)]
struct ChildInfo {
    multiple: bool,
}

#[derive(Debug, Default)]
struct Shape {
    multiple_fields: HashSet<String>,
    multiple_children: bool,
}

/// Which fields of which node kinds hold sequences rather than single nodes.
///
/// Read from the grammar's `node-types.json`, so a field always has the same
/// shape for a given kind no matter how many children a particular node has.
#[derive(Debug, Default)]
pub struct Shapes {
    kinds: HashMap<String, Shape>,
}

impl Shapes {
    fn load(node_types: &str) -> Shapes {
        let entries: Vec<NodeTypeEntry> = serde_json::from_str(node_types).unwrap_or_else(|e| {
            warn!("Grammar node types have a syntax error: {}", e);
            Vec::new()
        });
        let kinds = entries
            .into_iter()
            .map(|entry| {
                let shape = Shape {
                    multiple_fields: entry
                        .fields
                        .into_iter()
                        .filter(|(_, info)| info.multiple)
                        .map(|(name, _)| name)
                        .collect(),
                    multiple_children: entry.children.is_some_and(|c| c.multiple),
                };
                (entry.kind, shape)
            })
            .collect();
        Shapes { kinds }
    }

    /// Does `field` of a `kind` node hold a sequence? Unknown kinds always do.
    pub fn is_multiple(&self, kind: &str, field: &str) -> bool {
        match self.kinds.get(kind) {
            Some(shape) if field == CHILDREN => shape.multiple_children,
            Some(shape) => shape.multiple_fields.contains(field),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_json_is_valid() {
        serde_json::from_str::<BTreeMap<String, Defaults>>(BUILTIN_DATABASE).unwrap();
    }

    #[test]
    fn lookup_by_name_and_extension() {
        assert_eq!(Language::by_name("javascript"), Some(Language::JavaScript));
        assert_eq!(Language::by_name("typescript"), Some(Language::TypeScript));
        assert_eq!(Language::by_name("cobol"), None);
        assert_eq!(
            Language::for_path("src/index.mjs".as_ref()),
            Some(Language::JavaScript)
        );
        assert_eq!(
            Language::for_path("src/index.ts".as_ref()),
            Some(Language::TypeScript)
        );
        assert_eq!(Language::for_path("Makefile".as_ref()), None);
    }

    #[test]
    fn default_glob_covers_all_extensions() {
        assert_eq!(default_glob(), "**/*.{cjs,cts,js,jsx,mjs,mts,ts,tsx}");
    }

    #[test]
    fn shapes_know_sequences() {
        let shapes = Language::JavaScript.shapes();
        assert!(shapes.is_multiple("program", CHILDREN));
        assert!(shapes.is_multiple("jsx_self_closing_element", "attribute"));
        assert!(!shapes.is_multiple("jsx_self_closing_element", "name"));
        assert!(!shapes.is_multiple("import_statement", "source"));
        assert!(shapes.is_multiple("ERROR", CHILDREN));
    }

    #[test]
    fn shapes_load_every_grammar() {
        for language in [Language::JavaScript, Language::TypeScript, Language::Tsx] {
            assert!(language.shapes().is_multiple("program", CHILDREN));
            assert!(!language.shapes().is_multiple("binary_expression", "left"));
        }
    }
}
