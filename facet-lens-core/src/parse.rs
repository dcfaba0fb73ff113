use facet_lens_common::{FacetLensError, Result};

use crate::condition::{Connector, FilterCondition, Operator};
use crate::value::Value;

// --- recursive descent parser for condition chains ---
//
// chain := cond ((AND | OR) cond)*
// cond  := field op
// op    := (= | != | <> | < | <= | > | >=) value
//        | CONTAINS value | STARTSWITH value | ENDSWITH value
//        | BETWEEN value AND value
//        | [NOT] IN ( '(' value (, value)* ')' | value )
//        | IS [NOT] NULL

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

fn err(msg: impl Into<String>) -> FacetLensError {
    FacetLensError::Parse(msg.into())
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser { tokens: tokenize(input), pos: 0 }
    }
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }
    fn peek_upper(&self) -> Option<String> {
        self.peek().map(|s| s.to_uppercase())
    }
    fn consume(&mut self) -> Option<&str> {
        let t = self.tokens.get(self.pos).map(|s| s.as_str());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }
    fn expect(&mut self, s: &str) -> Result<()> {
        match self.consume() {
            Some(t) if t.eq_ignore_ascii_case(s) => Ok(()),
            Some(t) => Err(err(format!("expected '{s}', got '{t}'"))),
            None => Err(err(format!("expected '{s}', got end of input"))),
        }
    }
    fn connector(&mut self) -> Option<Connector> {
        let c = match self.peek_upper().as_deref() {
            Some("AND") | Some("&&") => Connector::And,
            Some("OR") | Some("||") => Connector::Or,
            _ => return None,
        };
        self.consume();
        Some(c)
    }
    fn parse(&mut self) -> Result<Vec<FilterCondition>> {
        let mut chain = Vec::new();
        if self.peek().is_none() {
            return Ok(chain);
        }
        chain.push(self.parse_condition()?);
        while let Some(connector) = self.connector() {
            if let Some(last) = chain.last_mut() {
                last.connector = connector;
            }
            chain.push(self.parse_condition()?);
        }
        if let Some(t) = self.peek() {
            return Err(err(format!("unexpected token: '{t}'")));
        }
        Ok(chain)
    }
    fn parse_condition(&mut self) -> Result<FilterCondition> {
        let field = match self.consume() {
            Some(t) if is_word(t) => t.to_string(),
            Some(t) => return Err(err(format!("expected field name, got '{t}'"))),
            None => return Err(err("expected field name, got end of input")),
        };
        let op_token = match self.consume() {
            Some(t) => t.to_uppercase(),
            None => return Err(err(format!("expected operator after '{field}'"))),
        };
        let op = match op_token.as_str() {
            "=" | "==" => Operator::Equals,
            "!=" | "<>" => Operator::NotEquals,
            "<" => Operator::LessThan,
            "<=" => Operator::LessOrEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterOrEqual,
            "CONTAINS" => Operator::Contains,
            "STARTSWITH" | "STARTS_WITH" => Operator::StartsWith,
            "ENDSWITH" | "ENDS_WITH" => Operator::EndsWith,
            "BETWEEN" => {
                let lo = self.parse_value()?;
                self.expect("AND")?;
                let hi = self.parse_value()?;
                return Ok(FilterCondition::between(field, lo, hi));
            }
            "IN" => {
                let v = self.parse_members()?;
                return Ok(FilterCondition::new(field, Operator::In, v));
            }
            "NOT" => {
                self.expect("IN")?;
                let v = self.parse_members()?;
                return Ok(FilterCondition::new(field, Operator::NotIn, v));
            }
            "IS" => {
                if self.peek_upper().as_deref() == Some("NOT") {
                    self.consume();
                    self.expect("NULL")?;
                    return Ok(FilterCondition::is_not_null(field));
                }
                self.expect("NULL")?;
                return Ok(FilterCondition::is_null(field));
            }
            other => return Err(err(format!("unknown operator '{other}'"))),
        };
        let value = self.parse_value()?;
        Ok(FilterCondition::new(field, op, value))
    }
    fn parse_members(&mut self) -> Result<Value> {
        if self.peek() != Some("(") {
            return self.parse_value();
        }
        self.consume();
        let mut vals = Vec::new();
        loop {
            vals.push(self.parse_value()?);
            match self.consume() {
                Some(",") => {}
                Some(")") => break,
                Some(t) => return Err(err(format!("expected ',' or ')' in list, got '{t}'"))),
                None => return Err(err("unexpected end of input in list")),
            }
        }
        Ok(Value::List(vals))
    }
    fn parse_value(&mut self) -> Result<Value> {
        match self.consume() {
            None => Err(err("expected value, got end of input")),
            Some(t) if t.eq_ignore_ascii_case("null") => Ok(Value::Null),
            Some(t) if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Some(t) if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Some(t) if t == "(" || t == ")" || t == "," => Err(err(format!("expected value, got '{t}'"))),
            Some(t) => {
                if t.starts_with('\'') || t.starts_with('"') {
                    Ok(Value::Text(strip_quotes(t)))
                } else if let Some(n) = exact_number(t) {
                    Ok(Value::Number(n))
                } else {
                    Ok(Value::Text(t.to_string()))
                }
            }
        }
    }
}

fn is_word(t: &str) -> bool {
    !t.is_empty() && !t.starts_with(['\'', '"']) && !"(),=<>!".contains(t.chars().next().unwrap_or(' '))
}

// Only tokens that print back unchanged become numbers; `02134` or `1.10`
// stay text so a text field still sees the spelling that was typed.
fn exact_number(t: &str) -> Option<f64> {
    let n = t.parse::<f64>().ok()?;
    (Value::Number(n).to_string() == t).then_some(n)
}

fn strip_quotes(s: &str) -> String {
    let q = if s.starts_with('"') { '"' } else { '\'' };
    let inner = if s.len() >= 2 && s.ends_with(q) {
        &s[1..s.len() - 1]
    } else {
        // unterminated literal: drop the opening quote only
        &s[1..]
    };
    inner.replace(&format!("{q}{q}"), &q.to_string())
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '\'' || c == '"' {
            let q = c;
            let mut s = String::from(c);
            chars.next();
            while let Some(ch) = chars.next() {
                s.push(ch);
                if ch == q {
                    // a doubled quote is a literal quote character
                    if chars.peek() == Some(&q) {
                        s.push(q);
                        chars.next();
                        continue;
                    }
                    break;
                }
            }
            tokens.push(s);
            continue;
        }
        if c == '<' || c == '>' || c == '!' || c == '=' {
            let mut op = String::from(c);
            chars.next();
            if let Some(&next) = chars.peek() {
                if next == '=' || (c == '<' && next == '>') {
                    op.push(next);
                    chars.next();
                }
            }
            tokens.push(op);
            continue;
        }
        if c == '(' || c == ')' || c == ',' {
            tokens.push(c.to_string());
            chars.next();
            continue;
        }
        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() || "(),='\"<>!".contains(ch) {
                break;
            }
            word.push(ch);
            chars.next();
        }
        if !word.is_empty() {
            tokens.push(word);
        }
    }
    tokens
}

/// Parse the condition-chain text syntax, e.g.
/// `state = Active and priority >= 2 or tag in (a, b)`.
/// Connectors fold left to right; there is no grouping.
pub fn parse_conditions(text: &str) -> Result<Vec<FilterCondition>> {
    Parser::new(text).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::describe_chain;

    #[test]
    fn empty_input_is_empty_chain() {
        assert!(parse_conditions("   ").unwrap().is_empty());
    }

    #[test]
    fn connectors_attach_to_preceding_condition() {
        let chain = parse_conditions("a = 1 OR b != 'x y' and c contains foo").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].connector, Connector::Or);
        assert_eq!(chain[1].connector, Connector::And);
        assert_eq!(chain[2].connector, Connector::And);
        assert_eq!(chain[1].value, Value::from("x y"));
        assert_eq!(chain[2].operator, Operator::Contains);
    }

    #[test]
    fn between_consumes_its_own_and() {
        let chain = parse_conditions("n between 1 and 5 and state is not null").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0], FilterCondition::between("n", 1.0, 5.0));
        assert_eq!(chain[1].operator, Operator::IsNotNull);
    }

    #[test]
    fn in_lists_and_strings() {
        let chain = parse_conditions("tag in (a, 'b c', 3) or tag not in 'x, y'").unwrap();
        assert_eq!(
            chain[0].value,
            Value::List(vec![Value::from("a"), Value::from("b c"), Value::Number(3.0)])
        );
        assert_eq!(chain[1].operator, Operator::NotIn);
        assert_eq!(chain[1].value, Value::from("x, y"));
    }

    #[test]
    fn dotted_fields_and_dates() {
        let chain = parse_conditions("assignee.name startswith gr && created >= 2024-01-01").unwrap();
        assert_eq!(chain[0].field, "assignee.name");
        assert_eq!(chain[1].value, Value::from("2024-01-01"));
    }

    #[test]
    fn errors() {
        assert!(parse_conditions("a").is_err());
        assert!(parse_conditions("a ~ 1").is_err());
        assert!(parse_conditions("a = 1 b = 2").is_err());
        assert!(parse_conditions("a in (1, 2").is_err());
        assert!(parse_conditions("a between 1 5").is_err());
        assert!(parse_conditions("= 1").is_err());
    }

    #[test]
    fn numbers_keep_their_spelling_unless_canonical() {
        let chain = parse_conditions("zip = 02134 and version = 1.10 and n = 2.5 and code contains 007").unwrap();
        assert_eq!(chain[0].value, Value::from("02134"));
        assert_eq!(chain[1].value, Value::from("1.10"));
        assert_eq!(chain[2].value, Value::Number(2.5));
        assert_eq!(chain[3].value, Value::from("007"));
        assert_eq!(parse_conditions("n = -3").unwrap()[0].value, Value::Number(-3.0));
    }

    #[test]
    fn doubled_quotes_inside_literals() {
        let chain = parse_conditions(r#"title = 'it''s "odd"' or note = "say ""hi""""#).unwrap();
        assert_eq!(chain[0].value, Value::from(r#"it's "odd""#));
        assert_eq!(chain[1].value, Value::from(r#"say "hi""#));
    }

    #[test]
    fn describe_then_parse_keeps_awkward_text() {
        let chain = vec![
            FilterCondition::new("title", Operator::Equals, r#"it's "odd""#).or(),
            FilterCondition::new("zip", Operator::Equals, "02134"),
        ];
        let text = describe_chain(&chain);
        assert_eq!(text, r#"title = 'it''s "odd"' or zip = '02134'"#);
        assert_eq!(parse_conditions(&text).unwrap(), chain);
    }

    #[test]
    fn describe_then_parse_is_stable() {
        let text = "state = 'Active' or priority >= 2 and owner is null";
        let chain = parse_conditions(text).unwrap();
        assert_eq!(describe_chain(&chain), text);
    }
}
