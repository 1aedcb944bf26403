//! Statement validation and triple extraction.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// The object position of a triple.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
  /// An IRI or blank-node reference.
  Iri(String),
  /// A literal with optional language tag or datatype IRI.
  Literal {
    value:    String,
    language: Option<String>,
    datatype: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
  pub subject:   String,
  pub predicate: String,
  pub object:    Object,
}

/// Validate what the write path requires of a payload: at least one
/// statement, and no vacuous entries.
pub fn check_statements(statements: &[Value]) -> Result<()> {
  if statements.is_empty() {
    return Err(Error::InvalidStatements(
      "data must contain at least one statement".to_owned(),
    ));
  }
  for (index, statement) in statements.iter().enumerate() {
    let Some(node) = statement.as_object() else {
      return Err(Error::InvalidStatements(format!(
        "statement {index} is not an object"
      )));
    };
    if node.is_empty() {
      return Err(Error::InvalidStatements(format!(
        "statement {index} is empty"
      )));
    }
    if let Some(id) = node.get("@id")
      && !id.is_string()
    {
      return Err(Error::Unparseable(format!(
        "statement {index} has a non-string @id"
      )));
    }
  }
  Ok(())
}

/// Flatten node objects into triples. Nodes without an `@id` get sequential
/// blank-node labels.
pub fn triples_from_statements(statements: &[Value]) -> Result<Vec<Triple>> {
  let mut triples = Vec::new();
  let mut blank_counter = 0usize;

  for statement in statements {
    let Some(node) = statement.as_object() else {
      return Err(Error::Unparseable("statement is not an object".to_owned()));
    };
    let subject = match node.get("@id") {
      Some(Value::String(iri)) => format!("<{iri}>"),
      Some(other) => {
        return Err(Error::Unparseable(format!(
          "non-string @id: {other}"
        )));
      }
      None => {
        let label = format!("_:b{blank_counter}");
        blank_counter += 1;
        label
      }
    };

    for (key, value) in node {
      match key.as_str() {
        "@id" => {}
        "@type" => {
          for class_iri in string_values(value)? {
            triples.push(Triple {
              subject:   subject.clone(),
              predicate: format!("<{RDF_TYPE}>"),
              object:    Object::Iri(format!("<{class_iri}>")),
            });
          }
        }
        predicate => {
          for object_value in as_array(value) {
            triples.push(Triple {
              subject:   subject.clone(),
              predicate: format!("<{predicate}>"),
              object:    object_from(object_value)?,
            });
          }
        }
      }
    }
  }
  Ok(triples)
}

fn as_array(value: &Value) -> Vec<&Value> {
  match value {
    Value::Array(items) => items.iter().collect(),
    other => vec![other],
  }
}

fn string_values(value: &Value) -> Result<Vec<&str>> {
  as_array(value)
    .into_iter()
    .map(|item| {
      item.as_str().ok_or_else(|| {
        Error::Unparseable(format!("expected IRI string, got {item}"))
      })
    })
    .collect()
}

fn object_from(value: &Value) -> Result<Object> {
  match value {
    Value::Object(node) => object_from_node(node),
    Value::String(s) => Ok(Object::Literal {
      value:    s.clone(),
      language: None,
      datatype: None,
    }),
    Value::Number(n) => Ok(Object::Literal {
      value:    n.to_string(),
      language: None,
      datatype: None,
    }),
    Value::Bool(b) => Ok(Object::Literal {
      value:    b.to_string(),
      language: None,
      datatype: None,
    }),
    other => Err(Error::Unparseable(format!(
      "unsupported object value: {other}"
    ))),
  }
}

fn object_from_node(node: &Map<String, Value>) -> Result<Object> {
  if let Some(id) = node.get("@id") {
    let iri = id.as_str().ok_or_else(|| {
      Error::Unparseable(format!("non-string @id in object: {id}"))
    })?;
    return Ok(Object::Iri(format!("<{iri}>")));
  }
  if let Some(value) = node.get("@value") {
    let text = match value {
      Value::String(s) => s.clone(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      other => {
        return Err(Error::Unparseable(format!(
          "unsupported @value: {other}"
        )));
      }
    };
    let language = node.get("@language").and_then(Value::as_str).map(str::to_owned);
    let datatype = node.get("@type").and_then(Value::as_str).map(str::to_owned);
    return Ok(Object::Literal { value: text, language, datatype });
  }
  Err(Error::Unparseable(
    "object node has neither @id nor @value".to_owned(),
  ))
}
