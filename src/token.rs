#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Literals
    Number(u32),
    Ident(String),

    // Keywords
    Let,
    If,
    Goto,
    Out,
    In,
    Halt,

    // Operators
    Plus,
    Minus,
    LtEq,
    Assign,

    // Punctuation
    Colon,
    Semicolon,
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]

    Eof,
}

impl Token {
    /// Maps an identifier-shaped word to its keyword, if it is one.
    pub fn keyword(word: &str) -> Option<Token> {
        match word {
            "let" => Some(Token::Let),
            "if" => Some(Token::If),
            "goto" => Some(Token::Goto),
            "out" => Some(Token::Out),
            "in" => Some(Token::In),
            "halt" => Some(Token::Halt),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Let | Token::If | Token::Goto | Token::Out | Token::In | Token::Halt
        )
    }

    /// Short kind name used in "expected X, found Y" diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Number(_) => "number",
            Token::Ident(_) => "identifier",
            Token::Let
            | Token::If
            | Token::Goto
            | Token::Out
            | Token::In
            | Token::Halt => "keyword",
            Token::Plus | Token::Minus | Token::LtEq | Token::Assign => "operator",
            Token::Colon
            | Token::Semicolon
            | Token::LParen
            | Token::RParen
            | Token::LBracket
            | Token::RBracket => "punctuation",
            Token::Eof => "end of input",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Let => write!(f, "let"),
            Token::If => write!(f, "if"),
            Token::Goto => write!(f, "goto"),
            Token::Out => write!(f, "out"),
            Token::In => write!(f, "in"),
            Token::Halt => write!(f, "halt"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::LtEq => write!(f, "<="),
            Token::Assign => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Token::keyword("let"), Some(Token::Let));
        assert_eq!(Token::keyword("goto"), Some(Token::Goto));
        assert_eq!(Token::keyword("in"), Some(Token::In));
        assert_eq!(Token::keyword("letter"), None);
        assert_eq!(Token::keyword("Let"), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Token::Number(3).kind(), "number");
        assert_eq!(Token::Ident("x".to_string()).kind(), "identifier");
        assert_eq!(Token::Halt.kind(), "keyword");
        assert_eq!(Token::LtEq.kind(), "operator");
        assert_eq!(Token::RBracket.kind(), "punctuation");
        assert!(Token::Out.is_keyword());
        assert!(!Token::Plus.is_keyword());
    }

    #[test]
    fn test_display_matches_source_text() {
        assert_eq!(Token::LtEq.to_string(), "<=");
        assert_eq!(Token::Assign.to_string(), "=");
        assert_eq!(Token::Number(42).to_string(), "42");
    }
}
