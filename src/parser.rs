//! Parse a textual protocol description into the model using PEST.
//!
//! Only syntax and numeric ranges are checked here. Names, directions, types and
//! uniqueness are left to [`crate::flatten::validate`], so an unknown type keyword parses
//! to [`DataType::Unknown`] and is reported there.

use crate::model::{Attribute, Command, DataType, Direction, Protocol};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Parse schema source into a [`Protocol`].
pub fn parse(source: &str) -> Result<Protocol, String> {
    let pairs = SchemaParser::parse(Rule::protocol, source).map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_protocol(pair)
}

fn build_protocol(pair: Pair<Rule>) -> Result<Protocol, String> {
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or("protocol: missing name")?.as_str().to_string();
    let id_pair = inner.next().ok_or("protocol: missing id")?;
    let id = parse_number(&id_pair)?;
    let id = u16::try_from(id).map_err(|_| format!("protocol id {} out of range", id))?;

    let mut protocol = Protocol::new(name, id);
    for part in inner {
        if part.as_rule() == Rule::command {
            protocol.commands.push(build_command(part)?);
        }
    }
    Ok(protocol)
}

fn build_command(pair: Pair<Rule>) -> Result<Command, String> {
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or("command: missing name")?.as_str().to_string();
    let id = parse_id(&inner.next().ok_or("command: missing id")?, &name)?;
    let direction = inner.next().ok_or("command: missing direction")?;
    let mut command = Command::new(name, id, Direction::from_keyword(direction.as_str()));

    for part in inner {
        match part.as_rule() {
            Rule::string => command.description = parse_string(part),
            Rule::body => command.attributes = build_body(part)?,
            _ => {}
        }
    }
    Ok(command)
}

fn build_body(pair: Pair<Rule>) -> Result<Vec<Attribute>, String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::attribute)
        .map(build_attribute)
        .collect()
}

fn build_attribute(pair: Pair<Rule>) -> Result<Attribute, String> {
    let mut inner = pair.into_inner().peekable();
    let optional = inner.next_if(|p| p.as_rule() == Rule::optional_kw).is_some();
    let name = inner.next().ok_or("attribute: missing name")?.as_str().to_string();
    let id = parse_id(&inner.next().ok_or("attribute: missing id")?, &name)?;
    let data_type = inner.next().ok_or("attribute: missing type")?;
    let mut attribute = Attribute::new(name, id, DataType::from_keyword(data_type.as_str())).optional(optional);

    for part in inner {
        match part.as_rule() {
            Rule::string => attribute.description = parse_string(part),
            Rule::body => attribute.children = build_body(part)?,
            _ => {}
        }
    }
    Ok(attribute)
}

fn parse_id(pair: &Pair<Rule>, owner: &str) -> Result<i16, String> {
    let n = parse_number(pair)?;
    i16::try_from(n).map_err(|_| format!("{}: id {} out of range", owner, n))
}

fn parse_number(pair: &Pair<Rule>) -> Result<i64, String> {
    let s = pair.as_str().trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        s.parse::<i64>()
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

fn parse_string(pair: Pair<Rule>) -> String {
    let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
    inner.replace("\\n", "\n").replace("\\t", "\t").replace("\\\"", "\"")
}
