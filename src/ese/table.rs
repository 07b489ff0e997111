//! Public table, record, and index handles.
//!
//! [`EseDatabase::tables`] resolves the catalog (once, lazily) and hands
//! out [`Table`] handles borrowing the database. A table iterates
//! decoded [`Record`]s in primary-key order; an [`Index`] iterates the
//! same records in index-key order by resolving each index leaf's
//! payload (the primary-tree key) against the data tree.
//!
//! Column access is lazy: [`Record::value`] materializes one column,
//! following long-value references through the table's long-value tree
//! and undoing value compression. Decoded records are memoized in the
//! handle's record cache keyed by `(table id, record key)`.

use std::sync::Arc;

use crate::ese::btree::BTreeCursor;
use crate::ese::catalog::{Catalog, ColumnSchema, IndexSchema, TableSchema};
use crate::ese::compression::decompress;
use crate::ese::database::EseDatabase;
use crate::ese::longvalue::{read_long_value, LongValueReader};
use crate::ese::record::{parse_record, RecordData, RecordValue};
use crate::ese::value::{RawValue, TypedValue};
use crate::EseError;

/// A column value as returned by [`Record::value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// NULL (absent, empty, or an unset long-value reference).
    Null,
    /// A single value.
    Single(RawValue),
    /// A multi-valued column's elements, in stored order.
    Multi(Vec<RawValue>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_single(&self) -> Option<&RawValue> {
        match self {
            Value::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Render for display or export.
    pub fn typed(&self) -> TypedValue {
        match self {
            Value::Null => TypedValue::Null,
            Value::Single(value) => value.typed(),
            Value::Multi(values) => {
                TypedValue::Multi(values.iter().map(|value| value.typed()).collect())
            }
        }
    }
}

impl EseDatabase {
    fn catalog_cached(&self) -> Result<Arc<Catalog>, EseError> {
        if let Some(catalog) = self.catalog.borrow().as_ref() {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(Catalog::load(self)?);
        *self.catalog.borrow_mut() = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Every table in the database.
    pub fn tables(&self) -> Result<Vec<Table<'_>>, EseError> {
        Ok(self
            .catalog_cached()?
            .tables()
            .map(|schema| Table {
                db: self,
                schema: Arc::clone(schema),
            })
            .collect())
    }

    /// Look up one table by name (ASCII case-insensitive).
    pub fn table_by_name(&self, name: &str) -> Result<Option<Table<'_>>, EseError> {
        Ok(self.catalog_cached()?.table_by_name(name).map(|schema| Table {
            db: self,
            schema: Arc::clone(schema),
        }))
    }

    /// Number of tables in the catalog.
    pub fn table_count(&self) -> Result<usize, EseError> {
        Ok(self.catalog_cached()?.table_count())
    }
}

/// Handle to one table of an open database.
pub struct Table<'db> {
    db: &'db EseDatabase,
    schema: Arc<TableSchema>,
}

impl<'db> Table<'db> {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn id(&self) -> u32 {
        self.schema.id
    }

    /// The resolved schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// All columns in storage order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.schema.columns()
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// Iterate the table's records in primary-key order.
    pub fn records(&self) -> Result<RecordIter<'db>, EseError> {
        let cursor = BTreeCursor::seek_first(self.db, self.schema.data_root)?;
        Ok(RecordIter {
            db: self.db,
            schema: Arc::clone(&self.schema),
            cursor,
        })
    }

    /// Count the table's records by scanning the data tree.
    pub fn record_count(&self) -> Result<u64, EseError> {
        let mut count = 0u64;
        for record in self.records()? {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// The table's secondary indexes.
    pub fn indexes(&self) -> impl Iterator<Item = Index<'db>> + '_ {
        let db = self.db;
        let schema = &self.schema;
        schema.indexes.iter().map(move |index| Index {
            db,
            schema: Arc::clone(schema),
            index: index.clone(),
        })
    }

    /// Look up one index by name (ASCII case-insensitive).
    pub fn index_by_name(&self, name: &str) -> Option<Index<'db>> {
        self.indexes()
            .find(|index| index.name().eq_ignore_ascii_case(name))
    }
}

fn decode_cached(
    db: &EseDatabase,
    schema: &Arc<TableSchema>,
    key: &[u8],
    payload: &[u8],
    extended_tagged: bool,
) -> Result<Arc<RecordData>, EseError> {
    let cache_key = (schema.id, key.to_vec());
    if let Some(data) = db.record_cache.borrow_mut().get(&cache_key) {
        return Ok(data);
    }
    let data = Arc::new(parse_record(payload, schema, extended_tagged)?);
    db.record_cache
        .borrow_mut()
        .insert(cache_key, Arc::clone(&data));
    Ok(data)
}

/// Iterator over a table's records in primary-key order.
pub struct RecordIter<'db> {
    db: &'db EseDatabase,
    schema: Arc<TableSchema>,
    cursor: BTreeCursor<'db>,
}

impl<'db> Iterator for RecordIter<'db> {
    type Item = Result<Record<'db>, EseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.cursor.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(error) => return Some(Err(error)),
        };
        let data = match decode_cached(
            self.db,
            &self.schema,
            &entry.key,
            &entry.data,
            entry.page_flags.new_record_format(),
        ) {
            Ok(data) => data,
            Err(error) => return Some(Err(error)),
        };
        Some(Ok(Record {
            db: self.db,
            schema: Arc::clone(&self.schema),
            key: entry.key,
            data,
        }))
    }
}

/// One decoded record.
pub struct Record<'db> {
    db: &'db EseDatabase,
    schema: Arc<TableSchema>,
    key: Vec<u8>,
    data: Arc<RecordData>,
}

impl<'db> Record<'db> {
    /// The record's primary-tree key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The schema the record was decoded with.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Column identifiers carrying non-NULL storage in this record.
    pub fn present_columns(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.present_columns()
    }

    /// Materialize one column's value.
    ///
    /// Long-value references are resolved through the table's long-value
    /// tree and decompressed when the record marks them compressed.
    pub fn value(&self, column_id: u32) -> Result<Value, EseError> {
        let column = self
            .schema
            .column(column_id)
            .ok_or(EseError::ColumnIdUnknown { column: column_id })?;

        Ok(match self.data.value(column_id) {
            RecordValue::Null => Value::Null,
            RecordValue::Inline(bytes) => Value::Single(RawValue::new(
                column.column_type,
                column.codepage,
                bytes.clone(),
            )),
            RecordValue::LongValueRef { id, compressed } => {
                let mut bytes = read_long_value(self.db, self.schema.long_value_root, *id)?;
                if *compressed {
                    bytes = decompress(&bytes)?;
                }
                Value::Single(RawValue::new(column.column_type, column.codepage, bytes))
            }
            RecordValue::Multi(elements) => Value::Multi(
                elements
                    .iter()
                    .map(|bytes| {
                        RawValue::new(column.column_type, column.codepage, bytes.clone())
                    })
                    .collect(),
            ),
        })
    }

    /// Materialize one column's value by column name.
    pub fn value_by_name(&self, name: &str) -> Result<Value, EseError> {
        let column = self
            .schema
            .column_by_name(name)
            .ok_or(EseError::ColumnIdUnknown { column: 0 })?;
        self.value(column.id)
    }

    /// Open a block-oriented reader over a long-value column, reading
    /// segments on demand instead of reassembling in memory.
    ///
    /// The stream is the stored byte sequence; a compressed long value
    /// streams in its compressed form.
    pub fn long_value_reader(&self, column_id: u32) -> Result<LongValueReader<'db>, EseError> {
        self.schema
            .column(column_id)
            .ok_or(EseError::ColumnIdUnknown { column: column_id })?;
        match self.data.value(column_id) {
            RecordValue::LongValueRef { id, .. } => {
                LongValueReader::open(self.db, self.schema.long_value_root, *id)
            }
            _ => Err(EseError::UnsupportedFormat(format!(
                "column {} of this record is not stored as a long value",
                column_id
            ))),
        }
    }
}

/// Handle to one secondary index of a table.
pub struct Index<'db> {
    db: &'db EseDatabase,
    schema: Arc<TableSchema>,
    index: IndexSchema,
}

impl<'db> Index<'db> {
    pub fn name(&self) -> &str {
        &self.index.name
    }

    pub fn root_page(&self) -> u32 {
        self.index.root_page
    }

    /// Iterate the table's records in this index's key order.
    pub fn records(&self) -> Result<IndexRecordIter<'db>, EseError> {
        let cursor = BTreeCursor::seek_first(self.db, self.index.root_page)?;
        Ok(IndexRecordIter {
            db: self.db,
            schema: Arc::clone(&self.schema),
            cursor,
        })
    }
}

/// Iterator yielding records in index-key order.
pub struct IndexRecordIter<'db> {
    db: &'db EseDatabase,
    schema: Arc<TableSchema>,
    cursor: BTreeCursor<'db>,
}

impl<'db> IndexRecordIter<'db> {
    /// Resolve one index leaf payload (a primary-tree key) to its
    /// record.
    fn resolve(&self, primary_key: &[u8], index_page: u32) -> Result<Record<'db>, EseError> {
        let mut data_cursor = BTreeCursor::seek_key(self.db, self.schema.data_root, primary_key)?;
        let entry = data_cursor
            .next_entry()?
            .filter(|entry| entry.key == primary_key)
            .ok_or_else(|| EseError::PageCorrupt {
                page: index_page,
                reason: "index entry references a record key absent from the data tree"
                    .to_string(),
            })?;
        let data = decode_cached(
            self.db,
            &self.schema,
            &entry.key,
            &entry.data,
            entry.page_flags.new_record_format(),
        )?;
        Ok(Record {
            db: self.db,
            schema: Arc::clone(&self.schema),
            key: entry.key,
            data,
        })
    }
}

impl<'db> Iterator for IndexRecordIter<'db> {
    type Item = Result<Record<'db>, EseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.cursor.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(error) => return Some(Err(error)),
        };
        Some(self.resolve(&entry.data, entry.page_number))
    }
}
