//! CSV triple files.
//!
//! Headerless, one triple per row: `head,relation,tail`. Classification files
//! carry a fourth column holding `1` (true) or `0` (false).
//!
//! [`read_table_triples`] is the exception: it reads an ordinary table with a
//! header row and turns chosen column pairs into triples.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use crate::error::{Error, Result};
use crate::table::IdTable;
use crate::triple::{LabelledTriple, NamedTriple, Triple};

fn reader<R: Read>(source: R) -> ::csv::Reader<R> {
    ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(source)
}

fn line_of(record: &::csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn fields<'r>(record: &'r ::csv::StringRecord, expected: usize) -> Result<Vec<&'r str>> {
    if record.len() < expected {
        return Err(Error::MalformedRecord {
            line: line_of(record),
            reason: format!("expected {expected} columns, found {}", record.len()),
        });
    }
    Ok(record.iter().take(expected).collect())
}

fn labelled(
    record: &::csv::StringRecord,
    entities: &IdTable,
    relations: &IdTable,
) -> Result<Triple> {
    let f = fields(record, 3)?;
    Ok(Triple::new(
        entities.require(f[0])?,
        relations.require(f[1])?,
        entities.require(f[2])?,
    ))
}

/// Read label triples, mapping names through the id tables.
pub fn read_triples<R: Read>(
    source: R,
    entities: &IdTable,
    relations: &IdTable,
) -> Result<Vec<Triple>> {
    let mut out = Vec::new();
    for record in reader(source).records() {
        out.push(labelled(&record?, entities, relations)?);
    }
    Ok(out)
}

/// Read triples already encoded as integer ids.
pub fn read_id_triples<R: Read>(source: R) -> Result<Vec<Triple>> {
    let mut out = Vec::new();
    for record in reader(source).records() {
        let record = record?;
        let f = fields(&record, 3)?;
        let mut ids = [0u32; 3];
        for (slot, raw) in ids.iter_mut().zip(&f) {
            *slot = raw.parse().map_err(|_| Error::MalformedRecord {
                line: line_of(&record),
                reason: format!("'{raw}' is not an id"),
            })?;
        }
        out.push(Triple::new(ids[0], ids[1], ids[2]));
    }
    Ok(out)
}

/// Read `head,relation,tail,label` rows for triple classification.
pub fn read_labelled_triples<R: Read>(
    source: R,
    entities: &IdTable,
    relations: &IdTable,
) -> Result<Vec<LabelledTriple>> {
    let mut out = Vec::new();
    for record in reader(source).records() {
        let record = record?;
        let f = fields(&record, 4)?;
        let label = match f[3] {
            "1" => true,
            "0" => false,
            other => {
                return Err(Error::MalformedRecord {
                    line: line_of(&record),
                    reason: format!("label must be 0 or 1, found '{other}'"),
                })
            }
        };
        out.push(LabelledTriple {
            triple: labelled(&record, entities, relations)?,
            label,
        });
    }
    Ok(out)
}

/// Turn the rows of a headed table into labelled triples.
///
/// Every `(head, tail)` column pair in `keys` becomes a relation named
/// `{head}_{tail}`, with one triple per distinct pair of values, in
/// first-seen row order. A value is prefixed with `prefixes[column]` when
/// present, so columns sharing a prefix share entities.
///
/// ```rust
/// use std::collections::HashMap;
/// use kgrank_core::formats::csv::read_table_triples;
///
/// let table = "user,bank\n1,QIWI\n2,QIWI\n2,QIWI\n";
/// let prefixes = HashMap::from([("user".to_string(), "user_".to_string())]);
/// let triples = read_table_triples(table.as_bytes(), &[("user", "bank")], &prefixes)?;
/// assert_eq!(triples.len(), 2);
/// assert_eq!(triples[0].to_string(), "(user_1, user_bank, QIWI)");
/// # Ok::<(), kgrank_core::Error>(())
/// ```
pub fn read_table_triples<R: Read>(
    source: R,
    keys: &[(&str, &str)],
    prefixes: &HashMap<String, String>,
) -> Result<Vec<NamedTriple>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MalformedRecord {
                line: 1,
                reason: format!("no column named '{name}'"),
            })
    };
    let columns = keys
        .iter()
        .map(|&(head, tail)| Ok((column(head)?, column(tail)?)))
        .collect::<Result<Vec<_>>>()?;
    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let value = |column: &str, raw: &str| match prefixes.get(column) {
        Some(prefix) => format!("{prefix}{raw}"),
        None => raw.to_string(),
    };

    let mut out = Vec::new();
    for (&(head, tail), &(head_at, tail_at)) in keys.iter().zip(&columns) {
        let relation = format!("{head}_{tail}");
        let mut seen = HashSet::new();
        for row in &rows {
            let f = fields(row, head_at.max(tail_at) + 1)?;
            if seen.insert((f[head_at], f[tail_at])) {
                out.push(NamedTriple::new(
                    value(head, f[head_at]),
                    relation.clone(),
                    value(tail, f[tail_at]),
                ));
            }
        }
    }

    tracing::debug!(rows = rows.len(), relations = keys.len(), triples = out.len(), "read table");
    Ok(out)
}
