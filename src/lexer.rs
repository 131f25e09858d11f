use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// A token together with the exact source text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub lexeme: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: String, span: Span) -> LexerError {
        LexerError {
            message,
            line: span.line,
            col: span.col,
        }
    }

    /// Skips whitespace and `//` comments up to the next significant character.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek() == Some('/') {
                while let Some(ch) = self.current() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self, span: Span) -> Result<Spanned, LexerError> {
        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let value: u32 = digits
            .parse()
            .map_err(|_| self.error(format!("integer literal too large: {}", digits), span))?;

        Ok(Spanned {
            token: Token::Number(value),
            lexeme: digits,
            span,
        })
    }

    fn read_identifier(&mut self, span: Span) -> Spanned {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let token = Token::keyword(&ident).unwrap_or_else(|| Token::Ident(ident.clone()));
        Spanned {
            token,
            lexeme: ident,
            span,
        }
    }

    fn read_operator(&mut self) -> Option<Token> {
        let ch = self.current()?;
        let next = self.peek();

        let token = match (ch, next) {
            ('<', Some('=')) => {
                self.advance();
                Token::LtEq
            }
            ('+', _) => Token::Plus,
            ('-', _) => Token::Minus,
            ('=', _) => Token::Assign,
            (':', _) => Token::Colon,
            (';', _) => Token::Semicolon,
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            ('[', _) => Token::LBracket,
            (']', _) => Token::RBracket,
            _ => return None,
        };
        self.advance();

        Some(token)
    }

    /// Reads the next token. Once the input is exhausted every call returns `Eof`.
    pub fn next_token(&mut self) -> Result<Spanned, LexerError> {
        self.skip_trivia();
        let span = self.span();

        match self.current() {
            None => Ok(Spanned {
                token: Token::Eof,
                lexeme: String::new(),
                span,
            }),
            Some(ch) if ch.is_ascii_digit() => self.read_number(span),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => Ok(self.read_identifier(span)),
            Some(ch) => match self.read_operator() {
                Some(token) => Ok(Spanned {
                    lexeme: token.to_string(),
                    token,
                    span,
                }),
                None => Err(self.error(format!("unexpected character: '{}'", ch), span)),
            },
        }
    }

    /// Tokenizes the whole input. The returned vector always ends with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    fn lex_error(source: &str) -> LexerError {
        Lexer::new(source).tokenize().unwrap_err()
    }

    #[test]
    fn test_let_statement() {
        assert_eq!(
            tokens("let x = 5;"),
            vec![
                Token::Let,
                ident("x"),
                Token::Assign,
                Token::Number(5),
                Token::Semicolon,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_all_keywords() {
        assert_eq!(
            tokens("let if goto out in halt"),
            vec![
                Token::Let,
                Token::If,
                Token::Goto,
                Token::Out,
                Token::In,
                Token::Halt,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("letx input halted _goto"),
            vec![
                ident("letx"),
                ident("input"),
                ident("halted"),
                ident("_goto"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_eq!(
            tokens("+ - <= = : ; ( ) [ ]"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::LtEq,
                Token::Assign,
                Token::Colon,
                Token::Semicolon,
                Token::LParen,
                Token::RParen,
                Token::LBracket,
                Token::RBracket,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_if_leq_goto() {
        assert_eq!(
            tokens("if i<=3 goto loop;"),
            vec![
                Token::If,
                ident("i"),
                Token::LtEq,
                Token::Number(3),
                Token::Goto,
                ident("loop"),
                Token::Semicolon,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_array_tokens() {
        assert_eq!(
            tokens("let buffer[32];"),
            vec![
                Token::Let,
                ident("buffer"),
                Token::LBracket,
                Token::Number(32),
                Token::RBracket,
                Token::Semicolon,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens("// header\nout x; // trailing\n// last"),
            vec![Token::Out, ident("x"), Token::Semicolon, Token::Eof]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let mut lexer = Lexer::new("let a = 1;\n  out a;");
        let spanned = lexer.tokenize().unwrap();

        assert_eq!(spanned[0].span, Span { line: 1, col: 1 });
        assert_eq!(spanned[1].span, Span { line: 1, col: 5 });
        assert_eq!(spanned[3].span, Span { line: 1, col: 9 });
        // `out` on the second line, after two spaces
        assert_eq!(spanned[5].token, Token::Out);
        assert_eq!(spanned[5].span, Span { line: 2, col: 3 });
    }

    #[test]
    fn test_next_token_is_sticky_at_eof() {
        let mut lexer = Lexer::new("halt");
        assert_eq!(lexer.next_token().unwrap().token, Token::Halt);
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex_error("let x = 5 * 2;");
        assert_eq!((err.line, err.col), (1, 11));
        assert!(err.message.contains("'*'"));
    }

    #[test]
    fn test_lone_less_than_is_rejected() {
        let err = lex_error("if a < b goto l;");
        assert_eq!((err.line, err.col), (1, 6));
    }

    #[test]
    fn test_single_slash_is_rejected() {
        let err = lex_error("\n/ comment");
        assert_eq!((err.line, err.col), (2, 1));
    }

    #[test]
    fn test_integer_too_large() {
        let err = lex_error("let x = 99999999999;");
        assert!(err.message.contains("too large"));
    }

    #[test]
    fn test_error_display_has_location() {
        let err = lex_error("out @;");
        assert_eq!(err.to_string(), "1:5: unexpected character: '@'");
    }

    #[test]
    fn test_lexemes_reconstruct_stripped_source() {
        let source = "let i = 007; // counter\nloop: out i;\n  i = i + 1;\nif i <= 3 goto loop; halt;";
        let joined: String = Lexer::new(source)
            .tokenize()
            .unwrap()
            .iter()
            .map(|s| s.lexeme.as_str())
            .collect();

        let stripped: String = source
            .lines()
            .map(|line| match line.find("//") {
                Some(idx) => &line[..idx],
                None => line,
            })
            .flat_map(|line| line.chars())
            .filter(|c| !c.is_whitespace())
            .collect();

        assert_eq!(joined, stripped);
    }
}
