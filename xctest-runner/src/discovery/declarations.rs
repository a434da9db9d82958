// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::SourcePosition;
use regex::Regex;
use std::fmt;

/// Recognizes test class and method declarations in the text of a single source file.
///
/// This is the only place that knows about source syntax. [`RegexDeclarationExtractor`] is a
/// lightweight structural recognizer; a real parser can be slotted in by implementing this trait.
pub trait DeclarationExtractor: fmt::Debug + Send + Sync {
    /// Returns the test classes declared in `text`, in source order.
    fn extract(&self, text: &str) -> Vec<ClassDeclaration>;
}

/// A test class declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassDeclaration {
    /// The class name.
    pub name: String,

    /// The position of the class name within the file.
    pub position: SourcePosition,

    /// The test methods declared in the class body.
    pub methods: Vec<MethodDeclaration>,
}

/// A test method declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodDeclaration {
    /// The method name.
    pub name: String,

    /// The position of the method name within the file.
    pub position: SourcePosition,
}

/// Recognizes declarations of the form:
///
/// ```text
/// class <Name> : <inheritance list> {
///     func <prefix><rest>(
/// }
/// ```
///
/// A class is a test class if one of the entries in its inheritance list is exactly the base test
/// type. Known limitations:
///
/// * class bodies are delimited by counting braces, with `"` toggling an "inside string" state.
///   Escaped quotes and multi-line string literals containing braces can confuse the count.
/// * a test class nested inside another test class contributes its methods to both.
/// * declarations inside comments are recognized as if they were code.
#[derive(Clone, Debug)]
pub struct RegexDeclarationExtractor {
    base_test_type: String,
    class_regex: Regex,
    method_regex: Regex,
}

impl RegexDeclarationExtractor {
    /// Creates a new extractor for the given base test type and test method prefix.
    pub fn new(base_test_type: impl Into<String>, test_method_prefix: &str) -> Self {
        let class_regex =
            Regex::new(r"\bclass\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*:(?P<inherits>[^{};]*)\{")
                .expect("class regex is valid");
        let method_regex = Regex::new(&format!(
            r"\bfunc\s+(?P<name>{}[A-Za-z0-9_]*)\s*\(",
            regex::escape(test_method_prefix)
        ))
        .expect("escaped method regex is valid");

        Self {
            base_test_type: base_test_type.into(),
            class_regex,
            method_regex,
        }
    }

    fn inherits_base_type(&self, inherits: &str) -> bool {
        inherits.split(',').any(|entry| {
            // Only the first word counts, so that a trailing `where` clause doesn't hide the type.
            entry.split_whitespace().next() == Some(self.base_test_type.as_str())
        })
    }
}

impl DeclarationExtractor for RegexDeclarationExtractor {
    fn extract(&self, text: &str) -> Vec<ClassDeclaration> {
        let line_index = LineIndex::new(text);
        let mut classes = Vec::new();

        for captures in self.class_regex.captures_iter(text) {
            let name = &captures["name"];
            if !self.inherits_base_type(&captures["inherits"]) {
                continue;
            }

            // The match always ends with the opening brace.
            let whole = captures.get(0).expect("group 0 is always present");
            let open = whole.end() - 1;
            let Some(close) = find_matching_brace(text, open) else {
                tracing::debug!("no closing brace for class `{name}`, skipping");
                continue;
            };

            let body = &text[open + 1..close];
            let methods = self
                .method_regex
                .captures_iter(body)
                .filter_map(|method| {
                    let name = method.name("name")?;
                    Some(MethodDeclaration {
                        name: name.as_str().to_owned(),
                        position: line_index.position(open + 1 + name.start()),
                    })
                })
                .collect();

            let name_start = captures.name("name").expect("name group matched").start();
            classes.push(ClassDeclaration {
                name: name.to_owned(),
                position: line_index.position(name_start),
                methods,
            });
        }

        classes
    }
}

/// Given the byte offset of an opening brace, returns the byte offset of its matching closing
/// brace. Braces between double quotes are not counted.
pub(crate) fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    debug_assert_eq!(text.as_bytes().get(open), Some(&b'{'));

    let mut depth = 0usize;
    let mut in_string = false;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Converts byte offsets into zero-based line and column positions.
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self { text, line_starts }
    }

    fn position(&self, offset: usize) -> SourcePosition {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = self.text[self.line_starts[line]..offset].chars().count();
        SourcePosition { line, column }
    }
}
