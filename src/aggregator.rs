//! Aggregation: parse, match and build records across an ordered list of
//! input paths.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::grammar::Grammar;
use crate::language::is_supported_file;
use crate::matcher::match_comments;
use crate::parser::parse_file;
use crate::record::Record;

/// Process every input path in order and return the full record
/// collection, file order first, declaration order within each file.
///
/// Directory arguments are expanded into their supported source files in
/// sorted traversal order; explicit file arguments are taken as given.
/// The first failure aborts the run and discards everything aggregated so
/// far; no partial result is returned.
pub fn aggregate(grammar: &Grammar, paths: &[PathBuf]) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for path in expand_paths(paths) {
        records.extend(process_file(grammar, &path)?);
    }

    Ok(records)
}

/// Extract one record per declaration from a single source file.
pub fn process_file(grammar: &Grammar, path: &Path) -> Result<Vec<Record>> {
    let source = parse_file(path)?;
    let filepath = path.display().to_string();

    let records = source
        .declarations
        .iter()
        .map(|decl| {
            let mut record = Record::new(
                decl.name.clone(),
                source.package.clone(),
                decl.begin,
                decl.end,
                filepath.clone(),
            );

            for m in match_comments(grammar, &source.groups_for(decl)) {
                record.apply(m.field, &m.value);
            }

            record
        })
        .collect();

    Ok(records)
}

fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if is_supported_file(entry.path()) {
                    expanded.push(entry.path().to_path_buf());
                }
            }
        } else {
            expanded.push(path.clone());
        }
    }

    expanded
}
