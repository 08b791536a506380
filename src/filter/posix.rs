//! POSIX extended regular expressions with leftmost-longest matching.
//!
//! Only ERE syntax is accepted: no Perl classes such as `\d`, no flags or
//! `(?...)` groups, no lazy repetition, no Unicode classes and no word
//! boundaries. `^` and `$` match at line boundaries.
//!
//! A match starts at the leftmost position where the pattern can match and
//! extends as far as possible from there, so `a|ab` matches all of `ab`.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use regex_automata::{
    Anchored, Input, MatchKind,
    dfa::{
        Automaton, StartKind,
        dense::{self, DFA},
    },
    util::syntax,
};
use regex_syntax::ast::{
    Ast, AssertionKind, ClassSet, ClassSetItem, GroupKind, Span, parse::Parser,
};

/// A compiled POSIX pattern.
#[derive(Debug)]
pub(crate) struct PosixRegex {
    /// Finds where the leftmost match starts.
    leftmost: Regex,
    /// Finds the longest match from a given start.
    longest: DFA<Vec<u32>>,
    /// Resolves capture groups for a match known to end at the end of the haystack.
    ending_at_end: Regex,
}

impl PosixRegex {
    /// Compile `pattern`, returning a message describing the problem if it is
    /// not a valid POSIX pattern.
    pub(crate) fn new(pattern: &str) -> Result<Self, String> {
        check_syntax(pattern)?;

        let leftmost = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|error| error.to_string())?;
        let ending_at_end = RegexBuilder::new(&format!(r"(?:{pattern})\z"))
            .multi_line(true)
            .build()
            .map_err(|error| error.to_string())?;
        let longest = dense::Builder::new()
            .syntax(syntax::Config::new().multi_line(true))
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .build(pattern)
            .map_err(|error| error.to_string())?;

        Ok(Self {
            leftmost,
            longest,
            ending_at_end,
        })
    }

    pub(crate) fn is_match(&self, haystack: &str) -> bool {
        self.leftmost.is_match(haystack)
    }

    /// The leftmost-longest match starting at or after `start`.
    pub(crate) fn find_at(&self, haystack: &str, start: usize) -> Option<Range<usize>> {
        let first = self.leftmost.find_at(haystack, start)?;

        let input = Input::new(haystack)
            .range(first.start()..)
            .anchored(Anchored::Yes);
        let end = match self.longest.try_search_fwd(&input) {
            Ok(Some(longest)) => longest.offset().max(first.end()),
            Ok(None) => first.end(),
            Err(error) => {
                tracing::debug!("longest match search gave up, using first match: {error}");
                first.end()
            }
        };

        Some(first.start()..end)
    }

    /// Replace every non-overlapping match in `haystack` with `replacement`,
    /// expanding `$1` and `${1}` to capture groups.
    ///
    /// An empty match directly after a previous match is not replaced.
    pub(crate) fn replace_all(&self, haystack: &str, replacement: &str) -> String {
        let mut output = String::with_capacity(haystack.len());
        let mut last_match_end = 0;
        let mut search_from = 0;

        while search_from <= haystack.len() {
            let Some(found) = self.find_at(haystack, search_from) else {
                break;
            };

            output.push_str(&haystack[last_match_end..found.start]);
            if found.end > last_match_end || found.start == 0 {
                self.expand(haystack, found.clone(), replacement, &mut output);
            }
            last_match_end = found.end;

            let width = haystack[search_from..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            search_from = (search_from + width).max(found.end);
        }

        if last_match_end < haystack.len() {
            output.push_str(&haystack[last_match_end..]);
        }

        output
    }

    fn expand(&self, haystack: &str, found: Range<usize>, replacement: &str, output: &mut String) {
        if !replacement.contains('$') {
            output.push_str(replacement);
            return;
        }

        match self
            .ending_at_end
            .captures_at(&haystack[..found.end], found.start)
        {
            Some(captures) => captures.expand(replacement, output),
            None => output.push_str(&haystack[found]),
        }
    }
}

/// Reject everything outside POSIX extended regular expression syntax.
fn check_syntax(pattern: &str) -> Result<(), String> {
    let ast = Parser::new()
        .parse(pattern)
        .map_err(|error| error.to_string())?;

    check_ast(pattern, &ast)
}

fn check_ast(pattern: &str, ast: &Ast) -> Result<(), String> {
    match ast {
        Ast::Empty(_) | Ast::Literal(_) | Ast::Dot(_) => Ok(()),
        Ast::Assertion(assertion) => match assertion.kind {
            AssertionKind::StartLine | AssertionKind::EndLine => Ok(()),
            _ => Err(unsupported(pattern, &assertion.span, "assertion")),
        },
        Ast::Flags(flags) => Err(unsupported(pattern, &flags.span, "flags")),
        Ast::ClassUnicode(class) => Err(unsupported(pattern, &class.span, "Unicode class")),
        Ast::ClassPerl(class) => Err(unsupported(pattern, &class.span, "Perl class")),
        Ast::ClassBracketed(class) => check_class_set(pattern, &class.kind),
        Ast::Repetition(repetition) if !repetition.greedy => Err(unsupported(
            pattern,
            &repetition.span,
            "non-greedy repetition",
        )),
        Ast::Repetition(repetition) => check_ast(pattern, &repetition.ast),
        Ast::Group(group) => match group.kind {
            GroupKind::CaptureIndex(_) => check_ast(pattern, &group.ast),
            _ => Err(unsupported(pattern, &group.span, "group")),
        },
        Ast::Alternation(alternation) => alternation
            .asts
            .iter()
            .try_for_each(|ast| check_ast(pattern, ast)),
        Ast::Concat(concat) => concat
            .asts
            .iter()
            .try_for_each(|ast| check_ast(pattern, ast)),
    }
}

fn check_class_set(pattern: &str, set: &ClassSet) -> Result<(), String> {
    match set {
        ClassSet::Item(item) => check_class_item(pattern, item),
        ClassSet::BinaryOp(op) => Err(unsupported(pattern, &op.span, "class operation")),
    }
}

fn check_class_item(pattern: &str, item: &ClassSetItem) -> Result<(), String> {
    match item {
        ClassSetItem::Empty(_)
        | ClassSetItem::Literal(_)
        | ClassSetItem::Range(_)
        | ClassSetItem::Ascii(_) => Ok(()),
        ClassSetItem::Union(union) => union
            .items
            .iter()
            .try_for_each(|item| check_class_item(pattern, item)),
        ClassSetItem::Unicode(_) | ClassSetItem::Perl(_) | ClassSetItem::Bracketed(_) => {
            Err(unsupported(pattern, item.span(), "class"))
        }
    }
}

fn unsupported(pattern: &str, span: &Span, what: &str) -> String {
    let text = pattern
        .get(span.start.offset..span.end.offset)
        .unwrap_or(pattern);

    format!("{what} `{text}` is not supported in POSIX syntax")
}

#[cfg(test)]
mod syntax_tests {
    use super::PosixRegex;

    #[test]
    fn accepts_extended_regular_expressions() {
        for pattern in [
            "^PAYMENT (TO|FROM) [A-Z]+$",
            "a{2,3}b?c*d+",
            "[[:digit:]]+\\.[0-9][0-9]",
            "[^[:space:]]",
            "x|",
            "\\*\\*\\*",
        ] {
            assert!(PosixRegex::new(pattern).is_ok(), "want {pattern:?} to compile");
        }
    }

    #[test]
    fn rejects_perl_syntax() {
        for pattern in [
            "\\d+", "\\w", "\\s", "[\\d]", "(?i)chase", "(?:a)", "(?P<x>a)", "a*?", "a+?",
            "\\bword", "\\Atext", "\\pL", "[a&&b]",
        ] {
            let got = PosixRegex::new(pattern);

            assert!(got.is_err(), "want {pattern:?} to be rejected");
        }
    }

    #[test]
    fn rejection_names_the_offending_part() {
        let got = PosixRegex::new("CARD \\d+").unwrap_err();

        assert!(got.contains("`\\d`"), "got {got:?}");
    }
}
