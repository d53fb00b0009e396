//! Bracket (Newick) notation: tokenizer, parser and leaf relabeling.
//!
//! The parser is small. It understands nested brackets, unquoted and single-quoted labels,
//! `:length` suffixes, `[...]` comments and a terminating `;`. Branch lengths are validated
//! and discarded; comments are dropped at tokenization.

use super::{ParseError, TaxaMap};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Comma,
    Colon,
    Semicolon,
    Label(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    start: usize,
    end: usize,
    token: Token,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Open => "(".to_string(),
        Token::Close => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::Colon => ":".to_string(),
        Token::Semicolon => ";".to_string(),
        Token::Label(l) => l.clone(),
    }
}

fn tokenize(notation: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = notation.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::Open,
            ')' => Token::Close,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '[' => {
                if !chars.by_ref().any(|(_, q)| q == ']') {
                    return Err(ParseError::UnterminatedComment { at: start });
                }
                continue;
            }
            '\'' => {
                let mut label = String::new();
                let mut closed = false;
                while let Some((_, q)) = chars.next() {
                    if q == '\'' {
                        // '' is an escaped quote
                        if matches!(chars.peek(), Some((_, '\''))) {
                            chars.next();
                            label.push('\'');
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    label.push(q);
                }
                if !closed {
                    return Err(ParseError::UnterminatedQuote { at: start });
                }
                let end = chars.peek().map(|&(i, _)| i).unwrap_or(notation.len());
                tokens.push(Spanned {
                    start,
                    end,
                    token: Token::Label(label),
                });
                continue;
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_whitespace() || "(),:;'[".contains(n) {
                        break;
                    }
                    end = i + n.len_utf8();
                    chars.next();
                }
                tokens.push(Spanned {
                    start,
                    end,
                    token: Token::Label(notation[start..end].to_string()),
                });
                continue;
            }
        };
        tokens.push(Spanned {
            start,
            end: start + 1,
            token,
        });
    }

    Ok(tokens)
}

#[derive(Debug, Clone)]
pub(crate) struct RawNode {
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) label: Option<String>,
}

/// Parsed notation before leaf labels are resolved and arity is checked.
#[derive(Debug, Clone)]
pub(crate) struct RawTree {
    pub(crate) nodes: Vec<RawNode>,
    pub(crate) root: usize,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    nodes: Vec<RawNode>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Result<Spanned, ParseError> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn subtree(&mut self, parent: Option<usize>) -> Result<usize, ParseError> {
        let id = self.nodes.len();
        self.nodes.push(RawNode {
            parent,
            children: Vec::new(),
            label: None,
        });

        let first = self.next()?;
        match first.token {
            Token::Open => {
                loop {
                    let child = self.subtree(Some(id))?;
                    self.nodes[id].children.push(child);
                    let sep = self.next()?;
                    match sep.token {
                        Token::Comma => continue,
                        Token::Close => break,
                        other => {
                            return Err(ParseError::Unexpected {
                                at: sep.start,
                                found: describe(&other),
                            })
                        }
                    }
                }
                // Internal labels (support values, names) are accepted and ignored.
                if let Some(Token::Label(_)) = self.peek() {
                    self.pos += 1;
                }
            }
            Token::Label(label) => self.nodes[id].label = Some(label),
            other => {
                return Err(ParseError::Unexpected {
                    at: first.start,
                    found: describe(&other),
                })
            }
        }

        if let Some(Token::Colon) = self.peek() {
            self.pos += 1;
            let length = self.next()?;
            match length.token {
                Token::Label(value) if value.parse::<f64>().is_ok() => {}
                Token::Label(value) => {
                    return Err(ParseError::BadLength {
                        at: length.start,
                        value,
                    })
                }
                other => {
                    return Err(ParseError::Unexpected {
                        at: length.start,
                        found: describe(&other),
                    })
                }
            }
        }

        Ok(id)
    }
}

pub(crate) fn parse(notation: &str) -> Result<RawTree, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(notation)?,
        pos: 0,
        nodes: Vec::new(),
    };

    let root = parser.subtree(None)?;

    let end = parser.next()?;
    if end.token != Token::Semicolon {
        return Err(ParseError::Unexpected {
            at: end.start,
            found: describe(&end.token),
        });
    }
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(ParseError::TrailingInput { at: extra.start });
    }

    Ok(RawTree {
        nodes: parser.nodes,
        root,
    })
}

/// Replaces integer leaf identifiers with taxon names.
///
/// Only whole leaf tokens are substituted: a label that directly follows `(` or `,`.
/// Branch lengths, internal labels and identifiers embedded in longer tokens are left
/// untouched, so leaf `1` can never clobber part of leaf `11`.
pub fn relabel(notation: &str, taxa: &TaxaMap) -> Result<String, ParseError> {
    let tokens = tokenize(notation)?;
    let mut out = String::with_capacity(notation.len() * 2);
    let mut copied = 0;

    for (i, spanned) in tokens.iter().enumerate() {
        let Token::Label(label) = &spanned.token else {
            continue;
        };
        let is_leaf = i > 0 && matches!(tokens[i - 1].token, Token::Open | Token::Comma);
        if !is_leaf {
            continue;
        }
        let name = label
            .parse::<usize>()
            .ok()
            .and_then(|id| taxa.name(id))
            .ok_or_else(|| ParseError::UnknownLeaf {
                label: label.clone(),
            })?;
        out.push_str(&notation[copied..spanned.start]);
        out.push_str(name);
        copied = spanned.end;
    }
    out.push_str(&notation[copied..]);

    Ok(out)
}
