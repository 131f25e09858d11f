use crate::lexer::Spanned;
use crate::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the source lexeme instead
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const BLU: &'static str = "\x1b[34m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        tokens.iter().map(|s| self.render_one(s) + "\n").collect()
    }

    fn render_one(&self, s: &Spanned) -> String {
        let line = s.span.line;
        let col = s.span.col;

        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            format!(
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                line, col, colr, kind, s.token, reset
            )
        } else {
            let text = match &s.token {
                Token::Eof => "<eof>",
                _ => s.lexeme.as_str(),
            };
            format!(
                "[{:02}:{:02}] {}{:<8} {}{}",
                line, col, colr, kind, text, reset
            )
        }
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof => "EOF",
            Number(_) => "NUM",
            Ident(_) => "IDENT",
            Plus | Minus | Assign => "OP",
            LtEq => "CMP",
            _ if t.is_keyword() => "KEYWORD",
            _ => "PUNCT",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof => Self::DIM,
            Number(_) => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Minus | Assign | LtEq => Self::MAG,
            _ if t.is_keyword() => Self::BLU,
            _ => Self::RESET,
        }
    }
}
