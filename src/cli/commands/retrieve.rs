//! Retrieve command - query symbol information from the index.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::RetrieveQuery;
use crate::config::Settings;
use crate::indexing::{CanonicalPathResolver, PathResolver};
use crate::storage::SymbolIndex;
use crate::types::{QualifiedName, SymbolDeclaration};

#[derive(Serialize)]
struct SymbolMatch {
    kind: &'static str,
    name: String,
    file: Option<PathBuf>,
    line: u32,
}

impl SymbolMatch {
    fn new(index: &SymbolIndex, declaration: &SymbolDeclaration) -> Self {
        Self {
            kind: declaration.kind.as_str(),
            name: declaration.name.to_string(),
            file: index.file_path(declaration),
            line: declaration.line,
        }
    }
}

fn print_matches(matches: &[SymbolMatch], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(matches)?);
        return Ok(());
    }
    for m in matches {
        let file = m
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        println!("{:<20} {} at {file}:{}", m.kind, m.name, m.line);
    }
    Ok(())
}

/// Run the retrieve command. Returns whether anything was found.
pub fn run(query: RetrieveQuery, config: &Settings) -> Result<bool> {
    let index = SymbolIndex::open(config.resolved_index_path())?;

    let (declarations, json) = match query {
        RetrieveQuery::Symbol { name, json } => {
            let declarations = if name.contains("::") {
                index.find_qualified(&QualifiedName::parse(&name))
            } else {
                index.find_symbols(&name)
            };
            if declarations.is_empty() && !json {
                eprintln!("Symbol not found: {name}");
            }
            (declarations, json)
        }
        RetrieveQuery::File { path, json } => {
            let resolver = match &config.workspace_root {
                Some(root) => CanonicalPathResolver::with_base(root),
                None => CanonicalPathResolver::new(),
            };
            let declarations = resolver
                .resolve(&path)
                .map(|location| index.declarations_in(&location))
                .unwrap_or_default();
            if declarations.is_empty() && !json {
                eprintln!("No declarations indexed for {}", path.display());
            }
            (declarations, json)
        }
    };

    let matches: Vec<SymbolMatch> = declarations
        .iter()
        .map(|declaration| SymbolMatch::new(&index, declaration))
        .collect();
    print_matches(&matches, json)?;
    Ok(!matches.is_empty())
}
