//! Line classification for the syntax tables in `languages`.
//!
//! A `RuleTable` is built once per language from its vocabulary sets and is
//! immutable afterwards. Classifying a line is a pure function of the line
//! text and the table; no state is carried between lines.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::languages::{Syntax, VocabularySet, SYNTAXES};

/// How a classified span should be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    FunctionName,
    Variable,
    Keyword,
    Comment,
    Type,
    Constant,
    Builtin,
}

/// A classified span of one line, in render offsets. `end` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

enum Matcher {
    /// Comment introducer through end of line.
    Comment(char),
    /// A line holding nothing but `ident:`.
    LabelDefinition,
    /// The identifier operand of the given control-flow instruction.
    LabelReference(&'static str),
    /// Whole-token membership in a word set. Sigil sets match tokens
    /// introduced by `@`, which may also contain `-`.
    Members { words: HashSet<String>, sigil: bool },
}

struct Rule {
    matcher: Matcher,
    category: Category,
}

/// An ordered rule table. Earlier rules win wherever spans overlap, so the
/// order chosen in `RuleTable::build` is significant.
pub struct RuleTable {
    rules: Vec<Rule>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_sigil_char(c: char) -> bool {
    is_word_char(c) || c == '-'
}

fn is_identifier(token: &[char]) -> bool {
    match token.first() {
        Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
            token.iter().all(|&c| is_word_char(c))
        }
        _ => false,
    }
}

/// Converts a canonical vocabulary entry ("copper wall large") into the
/// token it takes in source text ("@copper-wall-large"). Runs once while
/// building the table, never per line.
fn wire_name(canonical: &str) -> String {
    let mut token = String::with_capacity(canonical.len() + 1);
    token.push('@');
    for c in canonical.chars() {
        token.push(if c == ' ' { '-' } else { c });
    }
    token
}

/// Yields the whole-token spans of a line. Plain tokens are maximal runs of
/// word characters; sigil tokens start at `@` and additionally admit `-`.
/// A word embedded in a longer run never forms a token of its own, so
/// `building` inside `buildingX` or `@copper` inside `@copper-wall` cannot
/// match a set member.
fn tokens(line: &[char], sigil: bool) -> Vec<(usize, usize)> {
    let mut spans = vec![];
    let mut i = 0;

    while i < line.len() {
        if sigil {
            if line[i] == '@' {
                let start = i;
                i += 1;
                while i < line.len() && is_sigil_char(line[i]) {
                    i += 1;
                }
                if i > start + 1 {
                    spans.push((start, i));
                }
            } else if is_sigil_char(line[i]) {
                while i < line.len() && is_sigil_char(line[i]) {
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_word_char(line[i]) {
            let start = i;
            while i < line.len() && is_word_char(line[i]) {
                i += 1;
            }
            let embedded = start > 0 && matches!(line[start - 1], '@' | '-');
            if !embedded {
                spans.push((start, i));
            }
        } else {
            i += 1;
        }
    }

    spans
}

impl Matcher {
    fn matches(&self, line: &[char]) -> Vec<(usize, usize)> {
        match self {
            Matcher::Comment(introducer) => {
                match line.iter().position(|c| c == introducer) {
                    Some(start) => vec![(start, line.len())],
                    None => vec![],
                }
            }
            Matcher::LabelDefinition => {
                label_definition(line).into_iter().collect()
            }
            Matcher::LabelReference(instruction) => {
                label_reference(line, instruction).into_iter().collect()
            }
            Matcher::Members { words, sigil } => tokens(line, *sigil)
                .into_iter()
                .filter(|&(start, end)| {
                    let token: String = line[start..end].iter().collect();
                    words.contains(&token)
                })
                .collect(),
        }
    }
}

/// Matches a line consisting of only whitespace, an identifier and a colon,
/// returning the identifier span.
fn label_definition(line: &[char]) -> Option<(usize, usize)> {
    let start = line.iter().position(|c| !c.is_whitespace())?;
    let mut end = start;
    while end < line.len() && is_word_char(line[end]) {
        end += 1;
    }

    if !is_identifier(&line[start..end]) {
        return None;
    }
    if line.get(end) != Some(&':') {
        return None;
    }
    if line[end + 1..].iter().any(|c| !c.is_whitespace()) {
        return None;
    }

    Some((start, end))
}

/// Matches a line whose first token is the control-flow instruction,
/// returning the span of the label operand that follows it.
fn label_reference(
    line: &[char],
    instruction: &str,
) -> Option<(usize, usize)> {
    let first = line.iter().position(|c| !c.is_whitespace())?;
    let mut i = first;
    while i < line.len() && is_word_char(line[i]) {
        i += 1;
    }

    let head: String = line[first..i].iter().collect();
    if head != instruction {
        return None;
    }

    let gap = i;
    while i < line.len() && line[i].is_whitespace() {
        i += 1;
    }
    if i == gap || i == line.len() {
        return None;
    }

    let start = i;
    while i < line.len() && is_word_char(line[i]) {
        i += 1;
    }

    // numeric jump addresses are left to the generic number fontification
    if is_identifier(&line[start..i]) {
        Some((start, i))
    } else {
        None
    }
}

impl RuleTable {
    /// Builds the ordered table for one language. Cannot fail; empty
    /// vocabulary sets simply contribute rules that never match.
    pub fn build(syntax: &Syntax) -> RuleTable {
        let mut rules = vec![];

        if let Some(introducer) = syntax.single_line_comment {
            rules.push(Rule {
                matcher: Matcher::Comment(introducer),
                category: Category::Comment,
            });
        }

        rules.push(Rule {
            matcher: Matcher::LabelDefinition,
            category: Category::FunctionName,
        });

        if let Some(instruction) = syntax.jump_instruction {
            rules.push(Rule {
                matcher: Matcher::LabelReference(instruction),
                category: Category::FunctionName,
            });
        }

        for set in syntax.vocabulary {
            rules.push(Rule {
                matcher: Matcher::from_set(set),
                category: set.category,
            });
        }

        RuleTable { rules }
    }

    /// Classifies one line. Annotations never overlap: each rule only
    /// claims offsets no earlier rule has claimed. The result is sorted by
    /// start offset.
    pub fn classify(&self, line: &[char]) -> Vec<Annotation> {
        let mut claimed = vec![false; line.len()];
        let mut annotations = vec![];

        for rule in &self.rules {
            for (start, end) in rule.matcher.matches(line) {
                if claimed[start..end].iter().any(|&taken| taken) {
                    continue;
                }
                for cell in &mut claimed[start..end] {
                    *cell = true;
                }
                annotations.push(Annotation {
                    start,
                    end,
                    category: rule.category,
                });
            }
        }

        annotations.sort_by_key(|annotation| annotation.start);
        annotations
    }
}

impl Matcher {
    fn from_set(set: &VocabularySet) -> Matcher {
        let words = if set.sigil {
            set.words.iter().map(|word| wire_name(word)).collect()
        } else {
            set.words.iter().map(|word| word.to_string()).collect()
        };

        Matcher::Members {
            words,
            sigil: set.sigil,
        }
    }
}

static RULE_TABLES: LazyLock<Vec<RuleTable>> =
    LazyLock::new(|| SYNTAXES.iter().map(RuleTable::build).collect());

impl Syntax {
    /// The rule table for a registered language, built on first use and
    /// shared for the rest of the session.
    pub fn rules(&self) -> &'static RuleTable {
        let index = SYNTAXES
            .iter()
            .position(|syntax| syntax.name == self.name)
            .expect("syntax should be registered in SYNTAXES");

        &RULE_TABLES[index]
    }
}
