//! Boolean retrieval over the inverted index.
//!
//! Operators combine strictly left to right with no precedence:
//! `a OR b AND c` is `(a OR b) AND c`. A leading `NOT` complements the next
//! operand against the whole document universe; any later `NOT` subtracts.

use crate::{DocId, DocSet, InvertedIndex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    And,
    Or,
    Not,
    Open,
    Close,
    Term(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unclosed parenthesis")]
    UnclosedParen,
    #[error("unexpected ')' at token {0}")]
    UnexpectedClose(usize),
    #[error("operator {0} has no operand")]
    DanglingOperator(&'static str),
    #[error("empty parentheses at token {0}")]
    EmptyGroup(usize),
}

const KEYWORDS: [(&str, QueryToken); 3] = [("AND", QueryToken::And), ("OR", QueryToken::Or), ("NOT", QueryToken::Not)];

fn keyword_at(s: &str) -> Option<(usize, QueryToken)> {
    KEYWORDS.iter().find(|(kw, _)| s.starts_with(kw)).map(|(kw, tok)| (kw.len(), tok.clone()))
}

/// Splits a query into keywords, parentheses and lowercased terms.
/// Keywords are exact-case and end a term wherever they start.
pub fn lex(query: &str) -> Vec<QueryToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < query.len() {
        let rest = &query[i..];
        let Some(c) = rest.chars().next() else { break };
        if c.is_whitespace() {
            i += c.len_utf8();
        } else if let Some((len, tok)) = keyword_at(rest) {
            tokens.push(tok);
            i += len;
        } else if c == '(' {
            tokens.push(QueryToken::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(QueryToken::Close);
            i += 1;
        } else {
            let start = i;
            for (off, ch) in rest.char_indices() {
                if ch.is_whitespace() || ch == '(' || ch == ')' || (off > 0 && keyword_at(&rest[off..]).is_some()) {
                    break;
                }
                i = start + off + ch.len_utf8();
            }
            tokens.push(QueryToken::Term(query[start..i].to_lowercase()));
        }
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    Difference,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::And => "AND",
            Op::Or => "OR",
            Op::Difference => "NOT",
        }
    }
}

/// Evaluation context: the index plus the universe `NOT` complements against.
pub struct BooleanEngine<'a> {
    index: &'a InvertedIndex,
    universe: &'a DocSet,
}

impl<'a> BooleanEngine<'a> {
    pub fn new(index: &'a InvertedIndex, universe: &'a DocSet) -> Self { Self { index, universe } }

    pub fn evaluate(&self, query: &str) -> Result<DocSet, QueryError> {
        let tokens = lex(query);
        self.expression(&tokens, 0, 0).map(|(result, _)| result)
    }

    /// Evaluates from `start` until the end of input or the `)` closing this frame.
    /// Returns the set and the position after the frame.
    fn expression(&self, tokens: &[QueryToken], start: usize, depth: usize) -> Result<(DocSet, usize), QueryError> {
        let mut result = DocSet::new();
        let mut op = Op::Or;
        let mut first = true;
        let mut negate_next = false;
        let mut dangling: Option<&'static str> = None;
        let mut i = start;

        while i < tokens.len() {
            let operand = match &tokens[i] {
                QueryToken::Close => {
                    if depth == 0 {
                        return Err(QueryError::UnexpectedClose(i));
                    }
                    if let Some(name) = dangling {
                        return Err(QueryError::DanglingOperator(name));
                    }
                    if first && !negate_next {
                        return Err(QueryError::EmptyGroup(i));
                    }
                    return Ok((result, i + 1));
                }
                QueryToken::And => {
                    op = Op::And;
                    dangling = Some(op.name());
                    i += 1;
                    continue;
                }
                QueryToken::Or => {
                    op = Op::Or;
                    dangling = Some(op.name());
                    i += 1;
                    continue;
                }
                QueryToken::Not => {
                    if first {
                        negate_next = true;
                    } else {
                        op = Op::Difference;
                    }
                    dangling = Some("NOT");
                    i += 1;
                    continue;
                }
                QueryToken::Open => {
                    let (sub, next) = self.expression(tokens, i + 1, depth + 1)?;
                    i = next;
                    sub
                }
                QueryToken::Term(term) => {
                    i += 1;
                    self.index.postings(term).iter().copied().collect()
                }
            };
            dangling = None;

            if first {
                result = if negate_next { self.universe.difference(&operand).copied().collect() } else { operand };
                negate_next = false;
                first = false;
            } else {
                result = combine(op, &result, &operand);
            }
        }

        if depth > 0 {
            return Err(QueryError::UnclosedParen);
        }
        if let Some(name) = dangling {
            return Err(QueryError::DanglingOperator(name));
        }
        Ok((result, i))
    }
}

fn combine(op: Op, left: &DocSet, right: &DocSet) -> DocSet {
    match op {
        Op::And => left.intersection(right).copied().collect(),
        Op::Or => left.union(right).copied().collect(),
        Op::Difference => left.difference(right).copied().collect(),
    }
}

/// Convenience wrapper over [`BooleanEngine::evaluate`].
pub fn evaluate(query: &str, index: &InvertedIndex, universe: &DocSet) -> Result<DocSet, QueryError> {
    BooleanEngine::new(index, universe).evaluate(query)
}

/// Ids in ascending order for display.
pub fn sorted_ids(set: &DocSet) -> Vec<DocId> { set.iter().copied().collect() }
