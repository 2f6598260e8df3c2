use logos::Logos;
use crate::error::{SscResult, SourceLocation, lexer_error};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // 关键字
    #[token("func")]
    Func,
    #[token("int")]
    Int,
    #[token("double")]
    Double,
    #[token("void")]
    Void,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("print")]
    Print,
    #[token("return")]
    Return,

    // 标识符
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // 字面量：全部按 double 处理
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    StringLiteral(String),

    // 运算符
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Assign,

    // 分隔符
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,

    // 换行（用于跟踪行号）
    #[regex(r"\r?\n")]
    Newline,
}

impl Token {
    /// 算术运算符对应的字符
    pub fn operator(&self) -> Option<char> {
        match self {
            Token::Plus => Some('+'),
            Token::Minus => Some('-'),
            Token::Star => Some('*'),
            Token::Slash => Some('/'),
            Token::Percent => Some('%'),
            _ => None,
        }
    }
}

/// 处理字符串字面量中的 `\n`、`\t`、`\"`、`\\`，其他转义视为非法
fn unescape(raw: &str) -> Option<String> {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            '"' => result.push('"'),
            '\\' => result.push('\\'),
            _ => return None,
        }
    }
    Some(result)
}

#[derive(Debug, Clone)]
pub struct TokenWithLocation {
    pub token: Token,
    pub loc: SourceLocation,
}

pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    line: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            line: 1,
            line_start: 0,
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: offset - self.line_start + 1,
        }
    }

    pub fn tokenize(&mut self) -> SscResult<Vec<TokenWithLocation>> {
        let mut tokens = Vec::new();

        while let Some(token_result) = self.inner.next() {
            let span = self.inner.span();
            let loc = self.location(span.start);
            match token_result {
                Ok(Token::Newline) => {
                    self.line += 1;
                    self.line_start = span.end;
                }
                Ok(token) => tokens.push(TokenWithLocation { token, loc }),
                Err(_) => {
                    let error_text = &self.source[span];
                    return Err(lexer_error(
                        loc.line,
                        loc.column,
                        format!("Unexpected character: '{}'", error_text),
                    ));
                }
            }
        }

        Ok(tokens)
    }
}

pub fn lex(source: &str) -> SscResult<Vec<TokenWithLocation>> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}
