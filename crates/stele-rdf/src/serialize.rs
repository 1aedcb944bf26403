//! N-Triples and Turtle writers.

use serde_json::Value;

use crate::error::Result;
use crate::model::{Object, triples_from_statements};

/// Serialize statements as N-Triples, one triple per line.
pub fn to_ntriples(statements: &[Value]) -> Result<String> {
  let triples = triples_from_statements(statements)?;
  let mut output = String::new();
  for triple in &triples {
    output.push_str(&triple.subject);
    output.push(' ');
    output.push_str(&triple.predicate);
    output.push(' ');
    output.push_str(&format_object(&triple.object));
    output.push_str(" .\n");
  }
  Ok(output)
}

/// Serialize statements as Turtle, grouping predicates under each subject.
pub fn to_turtle(statements: &[Value]) -> Result<String> {
  let triples = triples_from_statements(statements)?;
  let mut output = String::new();
  let mut index = 0;

  // Triples arrive grouped by statement, so a simple run-length pass over
  // equal subjects is enough.
  while index < triples.len() {
    let subject = &triples[index].subject;
    let run_end = triples[index..]
      .iter()
      .position(|t| t.subject != *subject)
      .map(|offset| index + offset)
      .unwrap_or(triples.len());

    output.push_str(subject);
    for (position, triple) in triples[index..run_end].iter().enumerate() {
      if position == 0 {
        output.push(' ');
      } else {
        output.push_str(" ;\n  ");
      }
      output.push_str(&triple.predicate);
      output.push(' ');
      output.push_str(&format_object(&triple.object));
    }
    output.push_str(" .\n");
    index = run_end;
  }
  Ok(output)
}

fn format_object(object: &Object) -> String {
  match object {
    Object::Iri(iri) => iri.clone(),
    Object::Literal { value, language, datatype } => {
      let escaped = escape_literal(value);
      match (language, datatype) {
        (Some(lang), _) => format!("\"{escaped}\"@{lang}"),
        (None, Some(dtype)) => format!("\"{escaped}\"^^<{dtype}>"),
        (None, None) => format!("\"{escaped}\""),
      }
    }
  }
}

fn escape_literal(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '\\' => escaped.push_str("\\\\"),
      '"' => escaped.push_str("\\\""),
      '\n' => escaped.push_str("\\n"),
      '\r' => escaped.push_str("\\r"),
      '\t' => escaped.push_str("\\t"),
      other => escaped.push(other),
    }
  }
  escaped
}
