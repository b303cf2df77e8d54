//! Lexical read-only classification of Cypher text.
//!
//! The scan is a small finite-state lexer over normalised query text. Only
//! words in code position are compared against the denylist; string
//! literals, quoted identifiers, and comments are skipped.
//!
//! Normalisation expands unicode escapes that encode whitespace or control
//! characters into a line break, so `// note\u000ACREATE ...` cannot hide a
//! clause behind a comment. Because it is not knowable how a given server
//! treats other escapes and invisible format characters, every plausible
//! reading is scanned and any match rejects.

/// Clauses and commands that write data or touch administrative state.
pub const WRITE_KEYWORDS: &[&str] = &[
    "CREATE",
    "INSERT",
    "SET",
    "DELETE",
    "DETACH",
    "REMOVE",
    "MERGE",
    "DROP",
    "CALL",
    "LOAD",
    "FOREACH",
    "GRANT",
    "DENY",
    "REVOKE",
    "SHOW",
    "ALTER",
    "RENAME",
    "TERMINATE",
];

/// Lexer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    InSingleQuoteString,
    InDoubleQuoteString,
    InBacktickIdentifier,
    InLineComment,
    InBlockComment,
}

/// Compute the next state from the current character and its successor.
/// Returns the new state and how many characters were consumed (1 or 2).
pub fn transition(state: LexState, c: char, next: Option<char>) -> (LexState, usize) {
    use LexState::*;

    match state {
        Normal => match (c, next) {
            ('/', Some('/')) => (InLineComment, 2),
            ('/', Some('*')) => (InBlockComment, 2),
            ('\'', _) => (InSingleQuoteString, 1),
            ('"', _) => (InDoubleQuoteString, 1),
            ('`', _) => (InBacktickIdentifier, 1),
            _ => (Normal, 1),
        },
        InSingleQuoteString => match c {
            '\\' => (InSingleQuoteString, 2),
            '\'' => (Normal, 1),
            _ => (InSingleQuoteString, 1),
        },
        InDoubleQuoteString => match c {
            '\\' => (InDoubleQuoteString, 2),
            '"' => (Normal, 1),
            _ => (InDoubleQuoteString, 1),
        },
        InBacktickIdentifier => match (c, next) {
            ('`', Some('`')) => (InBacktickIdentifier, 2),
            ('`', _) => (Normal, 1),
            _ => (InBacktickIdentifier, 1),
        },
        InLineComment if is_line_break(c) => (Normal, 1),
        InLineComment => (InLineComment, 1),
        InBlockComment => match (c, next) {
            ('*', Some('/')) => (Normal, 2),
            _ => (InBlockComment, 1),
        },
    }
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Invisible characters some parsers ignore inside identifiers.
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{AD}' | '\u{180E}' | '\u{200B}'..='\u{200F}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
    )
}

/// Words appearing in code position, in order.
pub fn code_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut word = String::new();
    let mut state = LexState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if state == LexState::Normal {
            if is_word_char(c) {
                word.push(c);
                i += 1;
                continue;
            }
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
        }
        let (next_state, consumed) = transition(state, c, chars.get(i + 1).copied());
        state = next_state;
        i += consumed;
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// How to read escapes and format characters during normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalization {
    /// Decode every `\uXXXX` escape, not only whitespace and control ones.
    pub expand_all_escapes: bool,
    /// Treat invisible format characters as separators instead of dropping them.
    pub split_on_format: bool,
}

impl Normalization {
    pub const ALL: [Normalization; 4] = [
        Normalization { expand_all_escapes: false, split_on_format: false },
        Normalization { expand_all_escapes: false, split_on_format: true },
        Normalization { expand_all_escapes: true, split_on_format: false },
        Normalization { expand_all_escapes: true, split_on_format: true },
    ];
}

/// Decode a `\uXXXX` escape (any number of `u`/`U`) at the start of `chars`.
/// Returns the character and the escape's length.
fn unicode_escape(chars: &[char]) -> Option<(char, usize)> {
    if chars.first() != Some(&'\\') {
        return None;
    }
    let u_count = chars[1..]
        .iter()
        .take_while(|c| matches!(**c, 'u' | 'U'))
        .count();
    if u_count == 0 {
        return None;
    }
    let start = 1 + u_count;
    let hex: String = chars.get(start..start + 4)?.iter().collect();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)?;
    Some((decoded, start + 4))
}

/// Rewrite query text for scanning.
pub fn normalize(query: &str, mode: Normalization) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut out = String::with_capacity(query.len());
    let mut i = 0;

    while i < chars.len() {
        let (c, len, escaped) = match unicode_escape(&chars[i..]) {
            Some((decoded, len)) => (decoded, len, true),
            None => (chars[i], 1, false),
        };

        if is_format_char(c) {
            if mode.split_on_format {
                out.push(' ');
            }
        } else if escaped && (c.is_control() || c.is_whitespace()) {
            out.push('\n');
        } else if escaped && !mode.expand_all_escapes {
            out.extend(&chars[i..i + len]);
        } else {
            out.push(c);
        }
        i += len;
    }
    out
}

/// Whether a code word spells a denylisted keyword. Words starting with a
/// digit are also checked by suffix, since a number may end right before a
/// keyword (`1CREATE`).
fn denied_keyword(word: &str) -> Option<&'static str> {
    let lookup = |candidate: &str| {
        let upper = candidate.to_uppercase();
        WRITE_KEYWORDS.iter().copied().find(|k| *k == upper)
    };

    if let Some(keyword) = lookup(word) {
        return Some(keyword);
    }
    if word.starts_with(|c: char| c.is_ascii_digit()) {
        return word
            .char_indices()
            .skip(1)
            .find_map(|(idx, _)| lookup(&word[idx..]));
    }
    None
}

/// Rejects any query containing a write or administrative keyword outside
/// strings, quoted identifiers, and comments.
#[derive(Debug, Clone, Default)]
pub struct KeywordQueryClassifier;

impl KeywordQueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// `true` only if no reading of the query contains a denylisted keyword.
    pub fn is_read_only(&self, query: &str) -> bool {
        self.find_write_keyword(query).is_none()
    }

    /// The first denylisted keyword found in code position, if any.
    pub fn find_write_keyword(&self, query: &str) -> Option<&'static str> {
        Normalization::ALL.iter().find_map(|mode| {
            code_words(&normalize(query, *mode))
                .iter()
                .find_map(|w| denied_keyword(w))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(query: &str) -> bool {
        KeywordQueryClassifier::new().is_read_only(query)
    }

    // ── Lexer ────────────────────────────────────────────────────

    #[test]
    fn test_transitions_from_normal() {
        use LexState::*;
        assert_eq!(transition(Normal, '/', Some('/')), (InLineComment, 2));
        assert_eq!(transition(Normal, '/', Some('*')), (InBlockComment, 2));
        assert_eq!(transition(Normal, '/', Some(' ')), (Normal, 1));
        assert_eq!(transition(Normal, '\'', None), (InSingleQuoteString, 1));
        assert_eq!(transition(Normal, '"', None), (InDoubleQuoteString, 1));
        assert_eq!(transition(Normal, '`', None), (InBacktickIdentifier, 1));
    }

    #[test]
    fn test_transitions_inside_literals() {
        use LexState::*;
        assert_eq!(transition(InSingleQuoteString, '\\', Some('\'')), (InSingleQuoteString, 2));
        assert_eq!(transition(InSingleQuoteString, '"', None), (InSingleQuoteString, 1));
        assert_eq!(transition(InSingleQuoteString, '\'', None), (Normal, 1));
        assert_eq!(transition(InDoubleQuoteString, '\'', None), (InDoubleQuoteString, 1));
        assert_eq!(transition(InDoubleQuoteString, '"', None), (Normal, 1));
        assert_eq!(transition(InBacktickIdentifier, '`', Some('`')), (InBacktickIdentifier, 2));
        assert_eq!(transition(InBacktickIdentifier, '\'', None), (InBacktickIdentifier, 1));
        assert_eq!(transition(InBacktickIdentifier, '`', Some(')')), (Normal, 1));
    }

    #[test]
    fn test_transitions_inside_comments() {
        use LexState::*;
        assert_eq!(transition(InLineComment, 'x', None), (InLineComment, 1));
        assert_eq!(transition(InLineComment, '\n', None), (Normal, 1));
        assert_eq!(transition(InLineComment, '\r', None), (Normal, 1));
        assert_eq!(transition(InBlockComment, '\n', None), (InBlockComment, 1));
        assert_eq!(transition(InBlockComment, '*', Some('x')), (InBlockComment, 1));
        assert_eq!(transition(InBlockComment, '*', Some('/')), (Normal, 2));
    }

    #[test]
    fn test_code_words_skip_literals_and_comments() {
        let words = code_words("MATCH (n) WHERE n.a = 'x y' // tail\nRETURN /* c */ n");
        assert_eq!(words, vec!["MATCH", "n", "WHERE", "n", "a", "RETURN", "n"]);
    }

    #[test]
    fn test_normalize_expands_whitespace_escapes() {
        let mode = Normalization::ALL[0];
        assert_eq!(normalize(r"a\u000Ab", mode), "a\nb");
        assert_eq!(normalize(r"a\U000db", mode), "a\nb");
        assert_eq!(normalize(r"a\u0009b", mode), "a\nb");
        assert_eq!(normalize(r"a\uuu0020b", mode), "a\nb");
        // Non-whitespace escapes stay verbatim unless expanding all.
        assert_eq!(normalize(r"\u0043", mode), r"\u0043");
        assert_eq!(normalize(r"\u0043", Normalization::ALL[2]), "C");
        // Too short to be an escape.
        assert_eq!(normalize(r"\u00A", mode), r"\u00A");
    }

    #[test]
    fn test_normalize_format_characters() {
        assert_eq!(normalize("CRE\u{200B}ATE", Normalization::ALL[0]), "CREATE");
        assert_eq!(normalize("CRE\u{200B}ATE", Normalization::ALL[1]), "CRE ATE");
    }

    // ── Read queries ─────────────────────────────────────────────

    #[test]
    fn test_plain_read_queries_allowed() {
        for query in [
            "MATCH (n:Person) WHERE n.name = 'Alice' RETURN n",
            "MATCH (n) WHERE n.action = 'CREATE' RETURN n",
            "MATCH (a)-[:KNOWS]->(b) WITH a, count(b) AS c ORDER BY c DESC LIMIT 10 RETURN a, c",
            "UNWIND [1, 2, 3] AS x RETURN x",
            "MATCH (n) RETURN n.name UNION MATCH (m) RETURN m.name",
            "MATCH (n) RETURN toUpper(n.name), size(collect(n)), rand()",
            "MATCH (n) RETURN toUpper(toLower(trim(n.name)))",
            "MATCH (n) WHERE (n.a = 1 OR n.b = 2) AND NOT (n.c = 3) RETURN n",
            "MATCH (n) RETURN n; MATCH (m) RETURN m;",
            "MATCH (n) WHERE n.name STARTS WITH 'A' RETURN avg(n.age), max(n.age)",
            "OPTIONAL MATCH (n)-[r]->() RETURN type(r), labels(n)",
        ] {
            assert!(allowed(query), "should allow: {query}");
        }
    }

    #[test]
    fn test_keywords_inside_identifiers_allowed() {
        for query in [
            "MATCH (n:Dataset) RETURN n.created_at, n.settings, n.offset",
            "MATCH (n) WHERE n.merged = true RETURN n.callback, n.reloaded",
            "MATCH (showcase:Showroom) RETURN showcase.CREATED",
            "MATCH (n) RETURN n.`CREATE`, n.`it's SET`",
        ] {
            assert!(allowed(query), "should allow: {query}");
        }
    }

    #[test]
    fn test_keywords_inside_literals_and_comments_allowed() {
        for query in [
            "MATCH (n) WHERE n.action = \"DELETE\" RETURN n",
            "MATCH (n) WHERE n.note = 'it\\'s fine to CREATE' RETURN n",
            "MATCH (n) WHERE n.note = \"say \\\"DROP\\\" now\" RETURN n",
            "MATCH (n) // CREATE (m)\nRETURN n",
            "MATCH (n) /* DETACH DELETE n */ RETURN n",
            "MATCH (n) /* multi\nline SET n.x = 1 */ RETURN n",
            "MATCH (n) RETURN n // trailing MERGE",
        ] {
            assert!(allowed(query), "should allow: {query}");
        }
    }

    // ── Write and admin queries ──────────────────────────────────

    #[test]
    fn test_write_queries_rejected() {
        for query in [
            "CREATE (n:Person {name: 'Alice'})",
            "INSERT (n:Person {name: 'Mallory'})",
            "insert (:Person)-[:KNOWS]->(:Person)",
            "MATCH (n) SET n.admin = true",
            "MATCH (n) DELETE n",
            "MATCH (n) DETACH DELETE n",
            "MATCH (n) REMOVE n:Person",
            "MERGE (n:Person {name: 'Bob'})",
            "DROP INDEX person_name",
            "CALL db.labels()",
            "LOAD CSV FROM 'file:///x.csv' AS row RETURN row",
            "MATCH (n) FOREACH (x IN [1] | SET n.y = x)",
            "GRANT ROLE admin TO mallory",
            "DENY WRITE ON GRAPH * TO reader",
            "REVOKE ROLE reader FROM bob",
            "SHOW USERS",
            "ALTER USER bob SET PASSWORD 'x'",
            "RENAME ROLE reader TO writer",
            "TERMINATE TRANSACTIONS 'neo4j-transaction-1'",
        ] {
            assert!(!allowed(query), "should reject: {query}");
        }
    }

    #[test]
    fn test_rejection_is_case_and_whitespace_insensitive() {
        for query in [
            "match (n) detach delete n",
            "MATCH (n)\tCrEaTe (m)",
            "MATCH (n)\n\nSET\nn.x = 1",
            "MATCH (n)\u{00A0}DELETE n",
            "MATCH (n) RETURN n;CREATE (m)",
        ] {
            assert!(!allowed(query), "should reject: {query}");
        }
    }

    #[test]
    fn test_keyword_after_literal_or_comment_rejected() {
        for query in [
            "MATCH (n) WHERE n.a = 'x'CREATE (m)",
            "MATCH (n) WHERE n.a = 'ends with backslash \\\\' CREATE (m)",
            "MATCH (n) /* note */DELETE n",
            "MATCH (n) // note\nDELETE n",
            "MATCH (n) // note\rDELETE n",
            "MATCH (n:`weird``name`) DELETE n",
        ] {
            assert!(!allowed(query), "should reject: {query}");
        }
    }

    #[test]
    fn test_unicode_escape_obfuscation_rejected() {
        for query in [
            r"MATCH (n) // harmless\u000ACREATE (m) RETURN n",
            r"MATCH (n) // harmless\u000dDELETE n",
            r"MATCH (n) // harmless\U000AMERGE (m)",
            r"MATCH (n) // harmless\uu000aSET n.x = 1",
            r"MATCH (n) RETURN n\u0009CREATE (m)",
            r"MATCH (n) \u0043REATE (m)",
        ] {
            assert!(!allowed(query), "should reject: {query}");
        }
    }

    #[test]
    fn test_backtick_cannot_open_fake_string() {
        assert!(!allowed("MATCH (n:`'`) CREATE (m) RETURN '`'"));
    }

    #[test]
    fn test_number_glued_to_keyword_rejected() {
        assert!(!allowed("RETURN 1CREATE (n)"));
        assert!(!allowed("RETURN 0x1F SET n.x = 1"));
        assert!(allowed("RETURN 1e3, 0x1F, 12.5"));
    }

    #[test]
    fn test_invisible_characters_rejected() {
        assert!(!allowed("MATCH (n) CRE\u{200B}ATE (m)"));
        assert!(!allowed("MATCH (n) CREATE\u{200B}(m)"));
        assert!(!allowed("MATCH (n)\u{FEFF}DELETE n"));
    }

    #[test]
    fn test_unterminated_regions() {
        // Everything after an unterminated opener belongs to it.
        assert!(allowed("MATCH (n) RETURN n /* CREATE"));
        assert!(allowed("MATCH (n) RETURN 'CREATE"));
        assert!(!allowed("CREATE (n) RETURN 'x"));
    }

    #[test]
    fn test_find_write_keyword_reports_keyword() {
        let classifier = KeywordQueryClassifier::new();
        assert_eq!(classifier.find_write_keyword("match (n) detach delete n"), Some("DETACH"));
        assert_eq!(classifier.find_write_keyword("MATCH (n) RETURN n"), None);
    }
}
