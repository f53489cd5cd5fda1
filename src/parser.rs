//! Source parsing: comment groups, function declarations and the
//! proximity-based association between them.
//!
//! Association is deliberately broader than "the doc comment directly
//! above": annotations are free-text and authors do not always write them
//! as conventional doc comments. A comment group is attached to a
//! declaration when it
//!
//! 1. starts on the line the declaration ends on (trailing),
//! 2. starts on the line right after the declaration and is followed by a
//!    blank line or end of file (trailing, detached), or
//! 3. precedes the declaration with nothing but blank lines and other
//!    comment groups in between, however far above.
//!
//! Comment groups that end at or before a package clause are file-level
//! documentation and attach to nothing. Comments inside a declaration's
//! body belong to statements, not to the declaration.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::language::{detect_language, CommentStyle, Language};

/// A single comment line with its marker stripped.
#[derive(Debug, Clone)]
pub struct CommentLine {
    pub line_number: usize,
    pub content: String,
}

/// One or more contiguous comment lines. Blank lines and code break a
/// group; a block comment spanning blank lines does not.
#[derive(Debug, Clone)]
pub struct CommentGroup {
    pub lines: Vec<CommentLine>,
    pub start_line: usize,
    pub end_line: usize,
}

/// A function or method declaration with its line span (1-indexed,
/// inclusive) and the comment groups associated with it.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub begin: usize,
    pub end: usize,
    comment_groups: Vec<usize>,
}

/// A parsed source file: declarations in order of appearance plus the
/// comment groups they are associated with.
#[derive(Debug)]
pub struct ParsedSource {
    pub language: Language,
    pub package: String,
    pub comment_groups: Vec<CommentGroup>,
    pub declarations: Vec<Declaration>,
}

impl ParsedSource {
    /// Comment groups associated with a declaration, in file order.
    pub fn groups_for(&self, declaration: &Declaration) -> Vec<&CommentGroup> {
        declaration
            .comment_groups
            .iter()
            .map(|&index| &self.comment_groups[index])
            .collect()
    }
}

/// Parse one source file. An unreadable or unsupported file is fatal for
/// the whole run.
pub fn parse_file(path: &Path) -> Result<ParsedSource> {
    let language = detect_language(path)
        .ok_or_else(|| Error::UnsupportedFileType(path.display().to_string()))?;

    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(parse_source(&content, language, path))
}

/// Parse source text that has already been read. The path is only used
/// for the package-name fallback.
pub fn parse_source(content: &str, language: Language, path: &Path) -> ParsedSource {
    let lines: Vec<&str> = content.lines().collect();

    let (comment_groups, comment_lines) = extract_comment_groups(&lines, language);
    let (package, package_line) = find_package(&lines, language, path);
    let mut declarations = find_declarations(&lines, language, &comment_lines);
    associate_comments(
        &comment_groups,
        &mut declarations,
        package_line,
        &lines,
        &comment_lines,
    );

    ParsedSource {
        language,
        package,
        comment_groups,
        declarations,
    }
}

/// Scan for comment groups. Returns the groups plus the set of line
/// numbers that are pure comment lines (used to suppress declaration
/// matches inside commented-out code).
fn extract_comment_groups(
    lines: &[&str],
    language: Language,
) -> (Vec<CommentGroup>, HashSet<usize>) {
    let style = language.comment_style();
    let mut groups: Vec<CommentGroup> = Vec::new();
    let mut current: Option<CommentGroup> = None;
    let mut comment_lines = HashSet::new();
    let mut in_block = false;

    for (idx, raw) in lines.iter().enumerate() {
        let line_number = idx + 1;
        let trimmed = raw.trim();

        let piece = if in_block {
            match style.block_end.and_then(|end| trimmed.find(end)) {
                Some(pos) => {
                    in_block = false;
                    Some(strip_block_prefix(&trimmed[..pos], &style).to_string())
                }
                None => Some(strip_block_prefix(trimmed, &style).to_string()),
            }
        } else if let Some(text) = line_comment_text(trimmed, &style) {
            Some(text.to_string())
        } else if let Some(rest) = style.block_start.and_then(|s| trimmed.strip_prefix(s)) {
            match style.block_end.and_then(|end| rest.find(end)) {
                Some(pos) => Some(rest[..pos].trim().to_string()),
                None => {
                    in_block = true;
                    Some(rest.trim().to_string())
                }
            }
        } else {
            None
        };

        match piece {
            Some(content) => {
                comment_lines.insert(line_number);
                let line = CommentLine {
                    line_number,
                    content,
                };
                match current.as_mut() {
                    Some(group) => {
                        group.lines.push(line);
                        group.end_line = line_number;
                    }
                    None => {
                        current = Some(CommentGroup {
                            lines: vec![line],
                            start_line: line_number,
                            end_line: line_number,
                        });
                    }
                }
            }
            None => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
                // A comment after code on the same line forms its own
                // one-line group.
                if let Some(content) = trailing_comment_text(raw, language) {
                    groups.push(CommentGroup {
                        lines: vec![CommentLine {
                            line_number,
                            content,
                        }],
                        start_line: line_number,
                        end_line: line_number,
                    });
                }
            }
        }
    }

    if let Some(group) = current.take() {
        groups.push(group);
    }

    (groups, comment_lines)
}

fn line_comment_text<'a>(trimmed: &'a str, style: &CommentStyle) -> Option<&'a str> {
    style
        .line_prefixes
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .map(str::trim)
}

/// Continuation lines of a block comment often carry a decorative `*`.
fn strip_block_prefix<'a>(text: &'a str, style: &CommentStyle) -> &'a str {
    let text = text.trim();
    match style.block_line_prefix {
        Some(prefix) => text.strip_prefix(prefix).map_or(text, str::trim),
        None => text,
    }
}

/// Find a line comment that follows code on the same line. String
/// literals are skipped, so a marker inside one is never taken for a
/// comment, and the marker must be preceded by code and whitespace.
fn trailing_comment_text(raw: &str, language: Language) -> Option<String> {
    let style = language.comment_style();
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    let mut seen_code = false;

    while i < chars.len() {
        let c = chars[i];

        match c {
            '"' => {
                seen_code = true;
                i = skip_quoted(&chars, i, '"');
                continue;
            }
            '\'' if language.single_quote_strings() => {
                seen_code = true;
                i = skip_quoted(&chars, i, '\'');
                continue;
            }
            '\'' => {
                seen_code = true;
                if let Some(next) = skip_char_literal(&chars, i) {
                    i = next;
                    continue;
                }
            }
            '`' if language.has_backtick_strings() => {
                seen_code = true;
                i = skip_quoted(&chars, i, '`');
                continue;
            }
            _ => {}
        }

        if seen_code && i > 0 && chars[i - 1].is_whitespace() {
            if let Some(prefix) = style
                .line_prefixes
                .iter()
                .find(|p| starts_with_at(&chars, i, p))
            {
                let text: String = chars[i + prefix.len()..].iter().collect();
                return Some(text.trim().to_string());
            }
        }

        if !c.is_whitespace() {
            seen_code = true;
        }
        i += 1;
    }

    None
}

/// Whether the character sequence at `i` spells out `prefix` (markers are
/// all ASCII, so byte length equals character count).
fn starts_with_at(chars: &[char], i: usize, prefix: &str) -> bool {
    prefix
        .chars()
        .enumerate()
        .all(|(k, c)| chars.get(i + k) == Some(&c))
}

fn find_package(lines: &[&str], language: Language, path: &Path) -> (String, Option<usize>) {
    if let Some(pattern) = language.package_pattern() {
        let re = Regex::new(pattern).expect("package pattern must compile");
        for (idx, line) in lines.iter().enumerate() {
            if let Some(caps) = re.captures(line) {
                return (caps[1].to_string(), Some(idx + 1));
            }
        }
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    (stem, None)
}

/// Names the C-family declaration patterns would otherwise mistake for
/// function names.
const KEYWORD_NAMES: &[&str] = &[
    "if", "else", "for", "while", "switch", "return", "catch", "sizeof", "new", "delete",
];

fn find_declarations(
    lines: &[&str],
    language: Language,
    comment_lines: &HashSet<usize>,
) -> Vec<Declaration> {
    let re = Regex::new(language.declaration_pattern()).expect("declaration pattern must compile");
    let mut declarations: Vec<Declaration> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let begin = idx + 1;

        if comment_lines.contains(&begin) {
            continue;
        }

        // Functions nested inside another function's span do not produce
        // records; methods inside a type body do, since only function
        // spans are tracked here.
        if declarations
            .iter()
            .any(|d| d.begin < begin && begin <= d.end)
        {
            continue;
        }

        let Some(caps) = re.captures(line) else {
            continue;
        };
        let name = caps[1].to_string();
        if KEYWORD_NAMES.contains(&name.as_str()) {
            continue;
        }

        let end = if language.uses_indented_bodies() {
            indented_body_end(lines, idx)
        } else {
            braced_body_end(lines, idx, language)
        };

        declarations.push(Declaration {
            name,
            begin,
            end,
            comment_groups: Vec::new(),
        });
    }

    declarations
}

/// End line of a brace-delimited declaration: the line on which the brace
/// depth returns to zero. A `;` before any `{` ends a bodyless
/// declaration (prototype, trait method) on its own line. Braces inside
/// strings, character literals and comments are not counted.
fn braced_body_end(lines: &[&str], start_idx: usize, language: Language) -> usize {
    let mut depth: usize = 0;
    let mut opened = false;
    let mut in_block_comment = false;
    let mut in_backtick = false;

    for (offset, line) in lines[start_idx..].iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if in_block_comment {
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    in_block_comment = false;
                    i += 1;
                }
                i += 1;
                continue;
            }

            if in_backtick {
                if c == '`' {
                    in_backtick = false;
                }
                i += 1;
                continue;
            }

            match c {
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '/' if chars.get(i + 1) == Some(&'*') => {
                    in_block_comment = true;
                    i += 1;
                }
                '"' => {
                    i = skip_quoted(&chars, i, '"');
                    continue;
                }
                '\'' if language.single_quote_strings() => {
                    i = skip_quoted(&chars, i, '\'');
                    continue;
                }
                '\'' => {
                    // Char/rune literal. A quote with no nearby closing
                    // quote (a Rust lifetime, an apostrophe) is left alone.
                    if let Some(next) = skip_char_literal(&chars, i) {
                        i = next;
                        continue;
                    }
                }
                '`' if language.has_backtick_strings() => in_backtick = true,
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    if opened && depth == 0 {
                        return start_idx + offset + 1;
                    }
                }
                ';' if !opened && depth == 0 => return start_idx + offset + 1,
                _ => {}
            }

            i += 1;
        }
    }

    // Unterminated declaration: span runs to end of file.
    lines.len()
}

/// Index just past the closing delimiter, or past the end of the line if
/// the literal is unterminated (quoted strings do not span lines here;
/// multi-line backtick strings are handled by the caller).
fn skip_quoted(chars: &[char], start: usize, delim: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == delim => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn skip_char_literal(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if chars.get(i) == Some(&'\\') {
        i += 2;
    } else {
        i += 1;
    }
    (chars.get(i) == Some(&'\'')).then_some(i + 1)
}

/// End line of an indentation-delimited declaration: the last non-blank
/// line indented deeper than the `def` itself.
fn indented_body_end(lines: &[&str], start_idx: usize) -> usize {
    let def_indent = leading_whitespace(lines[start_idx]);
    let mut last = start_idx;

    for (offset, line) in lines[start_idx + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if leading_whitespace(line) <= def_indent {
            break;
        }
        last = start_idx + 1 + offset;
    }

    last + 1
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn associate_comments(
    groups: &[CommentGroup],
    declarations: &mut [Declaration],
    package_line: Option<usize>,
    lines: &[&str],
    comment_lines: &HashSet<usize>,
) {
    for (g_idx, group) in groups.iter().enumerate() {
        // File-level documentation above the package clause.
        if package_line.is_some_and(|pl| group.end_line <= pl) {
            continue;
        }

        // Trailing comment on the declaration's last line.
        if let Some(decl) = declarations.iter_mut().find(|d| d.end == group.start_line) {
            decl.comment_groups.push(g_idx);
            continue;
        }

        // Interior comments belong to statements, not the declaration.
        if declarations
            .iter()
            .any(|d| d.begin <= group.start_line && group.start_line <= d.end)
        {
            continue;
        }

        // A group on the line right after a declaration, set off from what
        // follows by a blank line (or EOF), trails that declaration.
        let blank_after =
            group.end_line >= lines.len() || lines[group.end_line].trim().is_empty();
        if blank_after {
            if let Some(decl) = declarations
                .iter_mut()
                .find(|d| d.end + 1 == group.start_line)
            {
                decl.comment_groups.push(g_idx);
                continue;
            }
        }

        // A trailing comment on some other code line stays with that line.
        if !comment_lines.contains(&group.start_line) {
            continue;
        }

        // Otherwise the group leads the next declaration, provided only
        // blank lines and other comments sit between them. A comment
        // separated from the declaration by code documents that code, not
        // the declaration.
        if let Some(decl) = declarations
            .iter_mut()
            .find(|d| d.begin > group.end_line)
        {
            let clear = (group.end_line + 1..decl.begin)
                .all(|n| comment_lines.contains(&n) || lines[n - 1].trim().is_empty());
            if clear {
                decl.comment_groups.push(g_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_go(content: &str) -> ParsedSource {
        parse_source(content, Language::Go, Path::new("main.go"))
    }

    fn decl_group_text(source: &ParsedSource, decl: &Declaration) -> Vec<String> {
        source
            .groups_for(decl)
            .iter()
            .flat_map(|g| g.lines.iter().map(|l| l.content.clone()))
            .collect()
    }

    #[test]
    fn test_go_declaration_span_and_package() {
        let src = "package main\n\nfunc DoThing() {\n\tx := 1\n\t_ = x\n}\n";
        let parsed = parse_go(src);

        assert_eq!(parsed.language, Language::Go);
        assert_eq!(parsed.package, "main");
        assert_eq!(parsed.declarations.len(), 1);
        let decl = &parsed.declarations[0];
        assert_eq!(decl.name, "DoThing");
        assert_eq!(decl.begin, 3);
        assert_eq!(decl.end, 6);
    }

    #[test]
    fn test_one_line_body() {
        let src = "package main\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert_eq!((decl.begin, decl.end), (3, 3));
    }

    #[test]
    fn test_leading_comment_group_is_associated() {
        let src = "package main\n\n// ThreatSpec model1 for DoThing\n// Mitigates x against y with z\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];

        assert_eq!(
            decl_group_text(&parsed, decl),
            vec![
                "ThreatSpec model1 for DoThing",
                "Mitigates x against y with z",
            ]
        );
    }

    #[test]
    fn test_blank_separated_comment_still_associates() {
        let src = "package main\n\n// floating note\n\n\n// nearer note\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];

        assert_eq!(
            decl_group_text(&parsed, decl),
            vec!["floating note", "nearer note"]
        );
    }

    #[test]
    fn test_trailing_comment_on_end_line_associates() {
        let src = "package main\n\nfunc DoThing() {} // Does logging for audit\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];

        assert_eq!(
            decl_group_text(&parsed, decl),
            vec!["Does logging for audit"]
        );
    }

    #[test]
    fn test_comment_above_package_clause_is_file_level() {
        let src = "// Package main does things.\npackage main\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_interior_comment_is_not_associated() {
        let src = "package main\n\nfunc DoThing() {\n\t// inner note\n\tx := 1\n\t_ = x\n}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_detached_trailing_comment_goes_to_previous_declaration() {
        let src = "package main\n\nfunc A() {}\n// belongs to A\n\nfunc B() {}\n";
        let parsed = parse_go(src);

        assert_eq!(
            decl_group_text(&parsed, &parsed.declarations[0]),
            vec!["belongs to A"]
        );
        assert!(decl_group_text(&parsed, &parsed.declarations[1]).is_empty());
    }

    #[test]
    fn test_comment_over_intervening_code_is_not_associated() {
        let src =
            "package main\n\n// Mitigates a against b with c\nvar x = 1\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];

        // The comment documents the var declaration, not the function.
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_comment_across_intervening_code_and_blanks_is_not_associated() {
        let src = "package main\n\n// floating note\n\ntype T struct{}\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_comment_marker_inside_string_is_not_a_comment() {
        let src = "package main\n\nvar s = \"a // b\"\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_trailing_comment_on_plain_code_line_does_not_lead_onward() {
        let src = "package main\n\nvar limit = 10 // Does throttling for api\n\nfunc DoThing() {}\n";
        let parsed = parse_go(src);
        let decl = &parsed.declarations[0];
        assert!(decl_group_text(&parsed, decl).is_empty());
    }

    #[test]
    fn test_braces_in_strings_are_not_counted() {
        let src = "package main\n\nfunc A() {\n\ts := \"}}}\"\n\t_ = s\n}\n\nfunc B() {}\n";
        let parsed = parse_go(src);

        assert_eq!(parsed.declarations.len(), 2);
        assert_eq!(parsed.declarations[0].end, 6);
        assert_eq!(parsed.declarations[1].begin, 8);
    }

    #[test]
    fn test_commented_out_function_is_skipped() {
        let src = "package main\n\n/*\nfunc Old() {\n}\n*/\nfunc Current() {}\n";
        let parsed = parse_go(src);

        assert_eq!(parsed.declarations.len(), 1);
        assert_eq!(parsed.declarations[0].name, "Current");
    }

    #[test]
    fn test_go_method_receiver() {
        let src = "package main\n\nfunc (s *Server) Handle() {\n}\n";
        let parsed = parse_go(src);
        assert_eq!(parsed.declarations[0].name, "Handle");
    }

    #[test]
    fn test_nested_function_is_skipped() {
        let src = "function outer() {\n  function inner() {\n    return 1;\n  }\n  return inner();\n}\n\nfunction after() {}\n";
        let parsed = parse_source(src, Language::JavaScript, Path::new("app.js"));

        let names: Vec<&str> = parsed
            .declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["outer", "after"]);
        assert_eq!(parsed.package, "app");
    }

    #[test]
    fn test_python_indented_span() {
        let src = "# Does parsing for config\ndef load(path):\n    with open(path) as f:\n        return f.read()\n\n\ndef other():\n    pass\n";
        let parsed = parse_source(src, Language::Python, Path::new("config.py"));

        assert_eq!(parsed.declarations.len(), 2);
        let load = &parsed.declarations[0];
        assert_eq!((load.begin, load.end), (2, 4));
        assert_eq!(decl_group_text(&parsed, load), vec!["Does parsing for config"]);
        assert_eq!(parsed.package, "config");
    }

    #[test]
    fn test_python_nested_def_is_skipped() {
        let src = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let parsed = parse_source(src, Language::Python, Path::new("m.py"));
        assert_eq!(parsed.declarations.len(), 1);
        assert_eq!(parsed.declarations[0].name, "outer");
    }

    #[test]
    fn test_c_prototype_ends_on_its_line() {
        let src = "int add(int a, int b);\n\nint add(int a, int b)\n{\n    return a + b;\n}\n";
        let parsed = parse_source(src, Language::C, Path::new("math.c"));

        assert_eq!(parsed.declarations.len(), 2);
        assert_eq!(parsed.declarations[0].end, 1);
        assert_eq!((parsed.declarations[1].begin, parsed.declarations[1].end), (3, 6));
    }

    #[test]
    fn test_rust_lifetimes_do_not_derail_span() {
        let src = "pub fn longest<'a>(x: &'a str, y: &'a str) -> &'a str {\n    if x.len() > y.len() { x } else { y }\n}\n";
        let parsed = parse_source(src, Language::Rust, Path::new("lib.rs"));

        let decl = &parsed.declarations[0];
        assert_eq!(decl.name, "longest");
        assert_eq!((decl.begin, decl.end), (1, 3));
    }

    #[test]
    fn test_unparseable_path_is_fatal() {
        let err = parse_file(Path::new("does-not-exist.go")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_fatal() {
        let err = parse_file(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }
}
