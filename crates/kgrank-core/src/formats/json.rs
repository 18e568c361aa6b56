//! JSON id tables: a single object mapping names to dense ids.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::error::Result;
use crate::table::IdTable;

/// Read `{ "name": id, ... }`.
pub fn read_id_table<R: Read>(source: R) -> Result<IdTable> {
    let map: HashMap<String, u32> = serde_json::from_reader(source)?;
    IdTable::from_map(map)
}

/// Write the table as a JSON object.
pub fn write_id_table<W: Write>(table: &IdTable, mut sink: W) -> Result<()> {
    let ordered: serde_json::Map<String, serde_json::Value> = table
        .iter()
        .map(|(id, name)| (name.to_string(), serde_json::Value::from(id)))
        .collect();
    serde_json::to_writer_pretty(&mut sink, &ordered)?;
    sink.flush()?;
    Ok(())
}
