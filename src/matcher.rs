//! Line-by-line matching of comment text against the grammar.

use crate::grammar::Grammar;
use crate::parser::CommentGroup;
use crate::record::Field;

/// A transient (field, value) pair from one pattern match. Matches are
/// folded into a record immediately after matching and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMatch {
    pub field: Field,
    pub value: String,
}

/// Scan a declaration's associated comment groups against every grammar
/// pattern.
///
/// Groups are not joined into one blob: each group's lines are tested
/// individually, and every pattern is tried on every line. Patterns are
/// not mutually exclusive, so one line can feed several patterns. When
/// the same field matches more than once the matches are emitted in
/// encounter order and the record keeps the last one (last-match-wins).
/// Blank and non-matching lines contribute nothing.
pub fn match_comments(grammar: &Grammar, groups: &[&CommentGroup]) -> Vec<AnnotationMatch> {
    let mut matches = Vec::new();

    for group in groups {
        for line in &group.lines {
            for pattern in grammar.patterns() {
                if let Some(captures) = pattern.matches(&line.content) {
                    matches.extend(
                        captures
                            .into_iter()
                            .map(|(field, value)| AnnotationMatch { field, value }),
                    );
                }
            }
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, ParsedSource};
    use crate::language::Language;
    use std::path::Path;

    fn parsed(comments: &str) -> ParsedSource {
        let src = format!("package main\n\n{comments}\nfunc DoThing() {{}}\n");
        parse_source(&src, Language::Go, Path::new("main.go"))
    }

    fn matches_for(source: &ParsedSource) -> Vec<AnnotationMatch> {
        let grammar = Grammar::new().unwrap();
        let groups = source.groups_for(&source.declarations[0]);
        match_comments(&grammar, &groups)
    }

    #[test]
    fn test_matches_across_groups_in_order() {
        let source = parsed(
            "// ThreatSpec model1 for DoThing\n\n// Does encryption for storage (REF-2)",
        );
        let matches = matches_for(&source);

        let fields: Vec<Field> = matches.iter().map(|m| m.field).collect();
        assert_eq!(
            fields,
            vec![
                Field::Model,
                Field::Function,
                Field::Action,
                Field::Component,
                Field::Ref,
            ]
        );
    }

    #[test]
    fn test_later_match_for_same_pattern_comes_later() {
        let source = parsed(
            "// Mitigates a against b with c\n// Mitigates d against e with f (REF-3)",
        );
        let matches = matches_for(&source);

        // Two Mitigation matches, eight pairs total; folding keeps the last.
        assert_eq!(matches.len(), 8);
        assert_eq!(matches[4].value, "d");
        assert_eq!(matches[7].value, "REF-3");
    }

    #[test]
    fn test_one_line_can_feed_multiple_patterns() {
        // Crafted so both Does and Exposure match the same line.
        let source = parsed("// Does auditing for logs and Exposes logs to leakage with q (R)");
        let matches = matches_for(&source);

        assert!(matches.iter().any(|m| m.field == Field::Action));
        assert!(matches.iter().any(|m| m.field == Field::Exposure));
    }

    #[test]
    fn test_unannotated_comments_match_nothing() {
        let source = parsed("// just describing the function\n//\n// nothing special");
        assert!(matches_for(&source).is_empty());
    }
}
