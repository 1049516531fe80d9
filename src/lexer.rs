// ABOUTME: Tokenizes Flow source text into a flat Vec<Token> with line/column positions

use crate::error::LexError;
use crate::token::{Token, TokenKind};
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, tag, take_while1};
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, none_of, one_of};
use nom::combinator::{map, recognize, value};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::IResult;

fn keyword_or_ident(text: &str) -> TokenKind {
    match text {
        "let" => TokenKind::Let,
        "mut" => TokenKind::Mut,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "func" | "fn" | "function" => TokenKind::Func,
        "async" => TokenKind::Async,
        "return" => TokenKind::Return,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "print" => TokenKind::Print,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "nil" => TokenKind::Nil,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "match" => TokenKind::Match,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "lambda" => TokenKind::Lambda,
        "map" => TokenKind::Map,
        "filter" => TokenKind::Filter,
        "reduce" => TokenKind::Reduce,
        "spawn" => TokenKind::Spawn,
        "await" => TokenKind::Await,
        "channel" => TokenKind::Channel,
        "send" => TokenKind::Send,
        "receive" => TokenKind::Receive,
        "alloc" => TokenKind::Alloc,
        "free" => TokenKind::Free,
        "macro" => TokenKind::Macro,
        "extern" => TokenKind::Extern,
        _ => TokenKind::Ident(text.to_string()),
    }
}

fn lex_identifier(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        keyword_or_ident,
    )(input)
}

fn lex_float(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(digit1, pair(char('.'), digit1))),
        |s: &str| TokenKind::Float(s.parse().unwrap()),
    )(input)
}

fn lex_integer(input: &str) -> IResult<&str, TokenKind> {
    map(digit1, |s: &str| TokenKind::Int(s.parse().unwrap()))(input)
}

fn lex_string(input: &str) -> IResult<&str, TokenKind> {
    let (rest, _) = char('"')(input)?;

    if let Some(inner) = rest.strip_prefix('"') {
        return Ok((inner, TokenKind::Str(String::new())));
    }

    map(
        nom::sequence::terminated(
            escaped_transform(
                none_of("\"\\"),
                '\\',
                alt((
                    value('\\', char('\\')),
                    value('"', char('"')),
                    value('\n', char('n')),
                    value('\t', char('t')),
                    value('\r', char('r')),
                )),
            ),
            char('"'),
        ),
        TokenKind::Str,
    )(rest)
}

/// Pattern priority matters: multi-char operators must be tried before their
/// single-char prefixes (`==` before `=`, `**` before `*`).
fn lex_multi_char_op(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::EqEq, tag("==")),
        value(TokenKind::NotEq, tag("!=")),
        value(TokenKind::LessEq, tag("<=")),
        value(TokenKind::GreaterEq, tag(">=")),
        value(TokenKind::PlusEq, tag("+=")),
        value(TokenKind::MinusEq, tag("-=")),
        value(TokenKind::StarEq, tag("*=")),
        value(TokenKind::SlashEq, tag("/=")),
        value(TokenKind::StarStar, tag("**")),
        value(TokenKind::Shl, tag("<<")),
        value(TokenKind::Shr, tag(">>")),
        value(TokenKind::Arrow, tag("->")),
        value(TokenKind::FatArrow, tag("=>")),
        value(TokenKind::Walrus, tag(":=")),
        value(TokenKind::ColonColon, tag("::")),
        value(TokenKind::Pipeline, tag("|>")),
    ))(input)
}

fn lex_single_char_op(input: &str) -> IResult<&str, TokenKind> {
    map(
        one_of("+-*/%=<>&|^~!(){}[],:;.@"),
        |c| match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Eq,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '!' => TokenKind::Bang,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '@' => TokenKind::At,
            _ => unreachable!(),
        },
    )(input)
}

fn lex_token_kind(input: &str) -> IResult<&str, TokenKind> {
    alt((
        lex_identifier,
        lex_multi_char_op,
        lex_single_char_op,
        lex_float,
        lex_integer,
        lex_string,
    ))(input)
}

fn skip_line_comment(input: &str) -> IResult<&str, ()> {
    value((), pair(tag("#"), many0(none_of("\n"))))(input)
}

fn is_horizontal_ws(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

pub struct Lexer<'a> {
    input: &'a str,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, consumed: &str) {
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let before = self.input;

            if let Ok((rest, ws)) = take_while1::<_, _, nom::error::Error<&str>>(|c: char| {
                is_horizontal_ws(c) || c == '\n'
            })(self.input)
            {
                self.advance(ws);
                self.input = rest;
                continue;
            }

            if let Ok((rest, comment)) = skip_line_comment(self.input) {
                let consumed = &before[..before.len() - rest.len()];
                let _ = comment;
                self.advance(consumed);
                self.input = rest;
                continue;
            }

            if self.input.is_empty() {
                break;
            }

            let start_line = self.line;
            let start_col = self.column;

            match lex_token_kind(self.input) {
                Ok((rest, kind)) => {
                    let consumed = &before[..before.len() - rest.len()];
                    tokens.push(Token::new(kind, consumed, start_line, start_col));
                    self.advance(consumed);
                    self.input = rest;
                }
                Err(_) => {
                    let bad = self.input.chars().next().unwrap_or(' ');
                    return Err(LexError {
                        line: start_line,
                        column: start_col,
                        message: format!("unexpected character '{}'", bad),
                    });
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_let_statement() {
        let kinds = kinds("let x = 7;");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int(7),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_multi_char_from_single_char_ops() {
        let kinds = kinds("a == b");
        assert!(kinds.contains(&TokenKind::EqEq));
        let kinds = kinds("a = b");
        assert!(kinds.contains(&TokenKind::Eq));
        assert!(!kinds.contains(&TokenKind::EqEq));
    }

    #[test]
    fn string_escapes_are_unescaped() {
        let kinds = kinds(r#""a\nb""#);
        assert_eq!(kinds[0], TokenKind::Str("a\nb".to_string()));
    }

    #[test]
    fn power_operator_is_distinct_from_star() {
        let kinds = kinds("2 ** 3");
        assert!(kinds.contains(&TokenKind::StarStar));
    }

    #[test]
    fn line_comments_are_skipped() {
        let kinds = kinds("let x = 1; # comment\nlet y = 2;");
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Let).count(), 2);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("let x\n= 1;").unwrap();
        let eq_tok = tokens.iter().find(|t| t.kind == TokenKind::Eq).unwrap();
        assert_eq!(eq_tok.line, 2);
        assert_eq!(eq_tok.column, 1);
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(tokenize("let x = `").is_err());
    }
}
