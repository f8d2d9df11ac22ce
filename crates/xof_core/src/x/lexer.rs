//! Tokenizer for the `.X` object section.
//!
//! Produces a flat token list in one pass. The lexer is deliberately
//! lenient: characters that fit no rule are dropped without an error,
//! and unknown backslash escapes inside strings are kept verbatim.

/// Single-character symbols. Each one is its own token.
pub const SYMBOLS: &[char] = &['{', '}', ';', ',', '<', '>', '[', ']', '(', ')'];

/// Token category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    /// Numeric literal, kept as text until the parser asks for a value
    Number,
    /// Quoted string (lexeme holds the unescaped contents)
    String,
    Symbol,
}

/// A lexed token.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 1-based line of the object section the token starts on
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line: 1,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// True if this is the given one-character symbol.
    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol && self.lexeme.len() == 1 && self.lexeme.starts_with(symbol)
    }

    /// `;` and `,` carry no meaning between values.
    pub fn is_separator(&self) -> bool {
        self.is_symbol(';') || self.is_symbol(',')
    }

    /// Identifier compared case-insensitively against `keyword`.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.lexeme.eq_ignore_ascii_case(keyword)
    }

    /// Numeric value of a number (or number-shaped identifier) token.
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            TokenKind::Number | TokenKind::Identifier => parse_number(&self.lexeme),
            _ => None,
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    SYMBOLS.contains(&c)
}

/// Parse a numeric lexeme, stripping an optional `f`/`d` precision suffix.
pub fn parse_number(lexeme: &str) -> Option<f64> {
    let digits = lexeme
        .strip_suffix(&['f', 'F', 'd', 'D'][..])
        .unwrap_or(lexeme);
    if !is_number_shape(digits) {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_number_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// Tokenize the object section of an `.X` file.
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            i += 1;
            continue;
        }

        // Line comments
        if c == '#' || (c == '/' && chars.get(i + 1) == Some(&'/')) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '"' {
            let (text, next) = read_string(&chars, i + 1);
            tokens.push(Token::new(TokenKind::String, text).at_line(line));
            line += chars[i..next].iter().filter(|&&ch| ch == '\n').count();
            i = next;
            continue;
        }

        if is_symbol_char(c) {
            tokens.push(Token::new(TokenKind::Symbol, c.to_string()).at_line(line));
            i += 1;
            continue;
        }

        if c.is_control() {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && !ends_word(&chars, i) {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        let kind = if parse_number(&word).is_some() {
            TokenKind::Number
        } else {
            TokenKind::Identifier
        };
        tokens.push(Token::new(kind, word).at_line(line));
    }

    tokens
}

/// True if the character at `i` cannot continue an identifier or number.
/// Comment markers only count where a token would start.
fn ends_word(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    c.is_whitespace() || c.is_control() || is_symbol_char(c)
}

/// Read a quoted string starting just after the opening quote.
/// Returns the contents and the index after the closing quote.
/// An unterminated string runs to the end of input.
fn read_string(chars: &[char], mut i: usize) -> (String, usize) {
    let mut text = String::new();
    while i < chars.len() {
        match chars[i] {
            '"' => return (text, i + 1),
            '\\' => match chars.get(i + 1) {
                Some(&escaped @ ('\\' | '"')) => {
                    text.push(escaped);
                    i += 2;
                }
                Some(&other) => {
                    text.push('\\');
                    text.push(other);
                    i += 2;
                }
                None => {
                    text.push('\\');
                    i += 1;
                }
            },
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    (text, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexemes(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.lexeme.as_str()).collect()
    }

    #[test]
    fn test_symbols_and_identifiers() {
        let tokens = tokenize("Frame Root{ }");
        assert_eq!(lexemes(&tokens), vec!["Frame", "Root", "{", "}"]);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Symbol);
    }

    #[test]
    fn test_comments_never_tokenized() {
        let source = "Mesh // trailing comment {\n# hash comment ;\n{ 1; }";
        let tokens = tokenize(source);
        assert_eq!(lexemes(&tokens), vec!["Mesh", "{", "1", ";", "}"]);
        assert!(tokens.iter().all(|t| !t.lexeme.contains("comment")));
    }

    #[test]
    fn test_comment_markers_inside_word() {
        let tokens = tokenize("abc//x\n1.0#y");
        assert_eq!(lexemes(&tokens), vec!["abc//x", "1.0#y"]);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);

        let tokens = tokenize("TextureFilename { tex#2.png; }\nMesh");
        assert_eq!(
            lexemes(&tokens),
            vec!["TextureFilename", "{", "tex#2.png", ";", "}", "Mesh"]
        );
        assert_eq!(tokens[5].line, 2);
    }

    #[test]
    fn test_comment_after_whitespace_still_skipped() {
        let tokens = tokenize("abc //x\n1.0 #y\n}");
        assert_eq!(lexemes(&tokens), vec!["abc", "1.0", "}"]);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("1 -2.5 +3e2 .5 4.0f 1.5E-3d 7.");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
        let values: Vec<f64> = tokens.iter().map(|t| t.as_f64().unwrap()).collect();
        assert_eq!(values, vec![1.0, -2.5, 300.0, 0.5, 4.0, 1.5e-3, 7.0]);
        // Raw text is preserved
        assert_eq!(tokens[4].lexeme, "4.0f");
    }

    #[test]
    fn test_number_like_words_are_identifiers() {
        let tokens = tokenize("1x e5 - 2e");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Identifier));
    }

    #[test]
    fn test_number_separators() {
        let tokens = tokenize("0.0;1.0,2.0;;");
        assert_eq!(lexemes(&tokens), vec!["0.0", ";", "1.0", ",", "2.0", ";", ";"]);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\\b\"c\n" "dir\tex.png""#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "a\\b\"c\\n");
        // Unknown escapes keep both characters
        assert_eq!(tokens[1].lexeme, "dir\\tex.png");
    }

    #[test]
    fn test_string_keeps_comment_markers() {
        let tokens = tokenize(r#""http://host/#frag""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme, "http://host/#frag");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize("\"open");
        assert_eq!(tokens, vec![Token::new(TokenKind::String, "open")]);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\n\"multi\nline\"\n// note\nb");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 5]);
    }

    #[test]
    fn test_control_characters_dropped() {
        let tokens = tokenize("a\u{0}\u{7}b");
        assert_eq!(lexemes(&tokens), vec!["a", "b"]);
    }

    #[test]
    fn test_guid_in_template() {
        let tokens = tokenize("template Mesh { <3D82AB44-62DA-11cf-AB39-0020AF71E433> }");
        assert_eq!(tokens[3].lexeme, "<");
        assert_eq!(tokens[4].lexeme, "3D82AB44-62DA-11cf-AB39-0020AF71E433");
        assert_eq!(tokens[4].kind, TokenKind::Identifier);
        assert_eq!(tokens[5].lexeme, ">");
    }
}
