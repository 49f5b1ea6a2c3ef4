//! Tokenizer and parser for the query language.
//!
//! Token classification needs the store: a bareword is an attribute
//! name only if the schema knows it, and only the first token can be a
//! class restriction. `AND`/`OR` are recognised case-insensitively in
//! non-leading positions, before attribute/value classification.

use crate::QueryError;
use rwhois_store::Store;
use std::fmt;

/// Term operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Eq => write!(f, "="),
            Op::Neq => write!(f, "!="),
        }
    }
}

/// One query term: `attr op value`, or a bare value when `attr` is
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub attr: Option<String>,
    pub op: Op,
    pub value: String,
}

impl Term {
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            attr: None,
            op: Op::Eq,
            value: value.into(),
        }
    }

    pub fn named(attr: impl Into<String>, op: Op, value: impl Into<String>) -> Self {
        Self {
            attr: Some(attr.into()),
            op,
            value: value.into(),
        }
    }
}

/// A parsed query: OR-connected clauses of AND-connected terms, plus an
/// optional class restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Vec<Term>>,
    objectclass: Option<String>,
}

impl Query {
    pub fn object_class(&self) -> Option<&str> {
        self.objectclass.as_deref()
    }

    /// The raw clauses, without the class restriction applied.
    pub fn clauses(&self) -> &[Vec<Term>] {
        &self.clauses
    }

    /// The clauses prepared for execution: the class restriction, if
    /// any, is lowered into every clause as a `class-name =` term.
    pub fn prepared_clauses(&self) -> Vec<Vec<Term>> {
        self.clauses
            .iter()
            .map(|clause| {
                let mut clause = clause.clone();
                if let Some(class) = &self.objectclass {
                    clause.push(Term::named("class-name", Op::Eq, class.clone()));
                }
                clause
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Value(String),
    Quoted(String),
    Class(String),
    Attr(String),
    And,
    Or,
    Eq,
    Neq,
}

fn classify_word(store: &Store, word: String, first: bool) -> Token {
    if first {
        // the leading position is where a class restriction may appear;
        // keywords are not recognised here
        if store.is_objectclass(&word) {
            return Token::Class(word);
        }
    } else {
        if word.eq_ignore_ascii_case("and") {
            return Token::And;
        }
        if word.eq_ignore_ascii_case("or") {
            return Token::Or;
        }
    }
    if store.is_attribute(&word) {
        Token::Attr(word)
    } else {
        Token::Value(word)
    }
}

fn tokenize(store: &Store, input: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '=' {
            tokens.push(Token::Eq);
            i += 1;
        } else if c == '!' {
            if chars.get(i + 1) == Some(&'=') {
                tokens.push(Token::Neq);
                i += 2;
            } else {
                return Err(QueryError::Syntax);
            }
        } else if c == '"' || c == '\'' {
            let mut j = i + 1;
            let mut text = String::new();
            while j < chars.len() && chars[j] != c {
                text.push(chars[j]);
                j += 1;
            }
            if j >= chars.len() || text.trim().is_empty() {
                return Err(QueryError::Syntax);
            }
            tokens.push(Token::Quoted(text));
            i = j + 1;
        } else {
            let mut word = String::new();
            while i < chars.len() {
                let c = chars[i];
                if c.is_whitespace() || matches!(c, '=' | '!' | '"' | '\'') {
                    break;
                }
                word.push(c);
                i += 1;
            }
            let first = tokens.is_empty();
            tokens.push(classify_word(store, word, first));
        }
    }
    Ok(tokens)
}

/// Parse a query line against the store's known classes and attributes.
pub fn parse(store: &Store, input: &str) -> Result<Query, QueryError> {
    let tokens = tokenize(store, input)?;
    let mut query = Query::default();
    let mut pos = 0;

    // optional leading class restriction; tolerate `CLASS AND term...`
    // so a restriction composes with an operator-joined first clause
    if let Some(Token::Class(class)) = tokens.first() {
        query.objectclass = Some(class.clone());
        pos = 1;
        if matches!(tokens.get(pos), Some(Token::And)) {
            pos += 1;
        }
    }

    let (term, next) = parse_termstr(&tokens, pos)?;
    query.clauses.push(vec![term]);
    pos = next;

    while pos < tokens.len() {
        let and = match tokens.get(pos) {
            Some(Token::And) => true,
            Some(Token::Or) => false,
            _ => return Err(QueryError::Syntax),
        };
        pos += 1;
        let (term, next) = parse_termstr(&tokens, pos)?;
        if and {
            if let Some(clause) = query.clauses.last_mut() {
                clause.push(term);
            }
        } else {
            query.clauses.push(vec![term]);
        }
        pos = next;
    }

    Ok(query)
}

fn parse_termstr(tokens: &[Token], pos: usize) -> Result<(Term, usize), QueryError> {
    match tokens.get(pos) {
        Some(Token::Attr(attr)) => match tokens.get(pos + 1) {
            Some(Token::Eq) | Some(Token::Neq) => {
                let op = if matches!(tokens.get(pos + 1), Some(Token::Neq)) {
                    Op::Neq
                } else {
                    Op::Eq
                };
                let value = value_text(tokens.get(pos + 2))?;
                Ok((Term::named(attr.clone(), op, value), pos + 3))
            }
            // a lone attribute name degrades to a bare value term
            _ => Ok((Term::bare(attr.clone()), pos + 1)),
        },
        Some(Token::Value(_)) | Some(Token::Quoted(_)) => {
            let value = value_text(tokens.get(pos))?;
            Ok((Term::bare(value), pos + 1))
        }
        _ => Err(QueryError::Syntax),
    }
}

fn value_text(token: Option<&Token>) -> Result<String, QueryError> {
    let text = match token {
        Some(Token::Value(text)) | Some(Token::Quoted(text)) => text.trim(),
        _ => return Err(QueryError::Syntax),
    };
    if text.is_empty() {
        return Err(QueryError::Syntax);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwhois_core::RwhoisObject;

    fn sample_store() -> Store {
        let mut store = Store::new();
        store
            .init_schema("domain-name = N\nip-network = C\n")
            .unwrap();
        for (id, class) in [("1", "domain"), ("2", "network")] {
            let mut obj = RwhoisObject::new();
            obj.add_attr("id", id);
            obj.add_attr("class-name", class);
            store.add_object(obj);
        }
        store.index_data();
        store
    }

    #[test]
    fn test_single_bare_value() {
        let store = sample_store();
        let q = parse(&store, "a.com").unwrap();
        assert_eq!(q.clauses(), &[vec![Term::bare("a.com")]]);
        assert_eq!(q.object_class(), None);
    }

    #[test]
    fn test_attr_term_in_first_position() {
        let store = sample_store();
        let q = parse(&store, "domain-name=a.com").unwrap();
        assert_eq!(
            q.clauses(),
            &[vec![Term::named("domain-name", Op::Eq, "a.com")]]
        );
    }

    #[test]
    fn test_neq_term() {
        let store = sample_store();
        let q = parse(&store, "a.com and domain-name!=b.com").unwrap();
        assert_eq!(
            q.clauses(),
            &[vec![
                Term::bare("a.com"),
                Term::named("domain-name", Op::Neq, "b.com"),
            ]]
        );
    }

    #[test]
    fn test_and_extends_clause_or_starts_new() {
        let store = sample_store();
        let q = parse(&store, "a.com AND b.com OR c.com and d.com").unwrap();
        assert_eq!(
            q.clauses(),
            &[
                vec![Term::bare("a.com"), Term::bare("b.com")],
                vec![Term::bare("c.com"), Term::bare("d.com")],
            ]
        );
    }

    #[test]
    fn test_leading_class() {
        let store = sample_store();
        let q = parse(&store, "domain a.com").unwrap();
        assert_eq!(q.object_class(), Some("domain"));
        assert_eq!(q.clauses(), &[vec![Term::bare("a.com")]]);
    }

    #[test]
    fn test_leading_class_with_and() {
        let store = sample_store();
        let q = parse(&store, "network and ip-network=10.0.0.0/24**").unwrap();
        assert_eq!(q.object_class(), Some("network"));
        assert_eq!(
            q.clauses(),
            &[vec![Term::named("ip-network", Op::Eq, "10.0.0.0/24**")]]
        );
    }

    #[test]
    fn test_class_only_in_first_position() {
        let store = sample_store();
        // "domain" later in the query is a plain value, not a class
        let q = parse(&store, "a.com or domain").unwrap();
        assert_eq!(q.object_class(), None);
        assert_eq!(
            q.clauses(),
            &[vec![Term::bare("a.com")], vec![Term::bare("domain")]]
        );
    }

    #[test]
    fn test_keywords_not_recognised_in_first_position() {
        let store = sample_store();
        let q = parse(&store, "and").unwrap();
        assert_eq!(q.clauses(), &[vec![Term::bare("and")]]);
    }

    #[test]
    fn test_lone_attr_degrades_to_value() {
        let store = sample_store();
        let q = parse(&store, "a.com and domain-name").unwrap();
        assert_eq!(
            q.clauses(),
            &[vec![Term::bare("a.com"), Term::bare("domain-name")]]
        );
    }

    #[test]
    fn test_quoted_values() {
        let store = sample_store();
        let q = parse(&store, "domain-name=\"quoted value\"").unwrap();
        assert_eq!(
            q.clauses(),
            &[vec![Term::named("domain-name", Op::Eq, "quoted value")]]
        );
        let q = parse(&store, "'*.a.com'").unwrap();
        assert_eq!(q.clauses(), &[vec![Term::bare("*.a.com")]]);
    }

    #[test]
    fn test_wildcards_survive_tokenizing() {
        let store = sample_store();
        let q = parse(&store, "domain-name=*.com").unwrap();
        assert_eq!(
            q.clauses(),
            &[vec![Term::named("domain-name", Op::Eq, "*.com")]]
        );
    }

    #[test]
    fn test_prepared_clauses_lower_class_restriction() {
        let store = sample_store();
        let q = parse(&store, "domain a.com or b.com").unwrap();
        let prepared = q.prepared_clauses();
        assert_eq!(prepared.len(), 2);
        for clause in &prepared {
            assert_eq!(
                clause.last(),
                Some(&Term::named("class-name", Op::Eq, "domain"))
            );
        }
        // raw clauses stay untouched
        assert_eq!(q.clauses()[0], vec![Term::bare("a.com")]);
    }

    #[test]
    fn test_syntax_errors() {
        let store = sample_store();
        for bad in [
            "",
            "   ",
            "=",
            "a.com and",
            "and!",
            "a.com b.com",
            "domain-name = ",
            "domain-name ! b.com",
            "\"unterminated",
            "''",
            "domain",
        ] {
            assert_eq!(parse(&store, bad), Err(QueryError::Syntax), "input: {bad:?}");
        }
    }

    #[test]
    fn test_implicit_and_is_rejected() {
        let store = sample_store();
        assert_eq!(
            parse(&store, "domain-name=a.com domain-name=b.com"),
            Err(QueryError::Syntax)
        );
    }
}
