//! Catalog enumeration and schema resolution.
//!
//! Page 4 roots a reserved tree whose leaf records describe every
//! persistent object in the database. The catalog describes itself: its
//! rows are ordinary records decoded against a well-known, hardcoded
//! schema ([`catalog_schema`]). Each row carries the owning table id, a
//! row type (TABLE, COLUMN, INDEX, LONG_VALUE, CALLBACK), the object id,
//! and a type-dependent payload column that holds either a column type
//! or a tree root page number.
//!
//! [`Catalog::load`] walks the tree once, groups rows by owning table,
//! resolves template-table references by name, and produces one
//! [`TableSchema`] per table with its ordered fixed, variable, and
//! tagged column lists plus index roots. The resolver never opens a data
//! page.

use std::collections::HashMap;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::ese::btree::BTreeCursor;
use crate::ese::constants::*;
use crate::ese::database::EseDatabase;
use crate::ese::record::{parse_record, RecordValue};
use crate::EseError;

/// JET column type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Null,
    Boolean,
    UnsignedByte,
    SignedInt16,
    SignedInt32,
    Currency,
    Float32,
    Double64,
    DateTime,
    Binary,
    Text,
    LargeBinary,
    LargeText,
    SuperLargeValue,
    UnsignedInt32,
    SignedInt64,
    Guid,
    UnsignedInt16,
}

impl ColumnType {
    /// Map the on-disk column type code.
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => ColumnType::Null,
            1 => ColumnType::Boolean,
            2 => ColumnType::UnsignedByte,
            3 => ColumnType::SignedInt16,
            4 => ColumnType::SignedInt32,
            5 => ColumnType::Currency,
            6 => ColumnType::Float32,
            7 => ColumnType::Double64,
            8 => ColumnType::DateTime,
            9 => ColumnType::Binary,
            10 => ColumnType::Text,
            11 => ColumnType::LargeBinary,
            12 => ColumnType::LargeText,
            13 => ColumnType::SuperLargeValue,
            14 => ColumnType::UnsignedInt32,
            15 => ColumnType::SignedInt64,
            16 => ColumnType::Guid,
            17 => ColumnType::UnsignedInt16,
            _ => return None,
        })
    }

    /// Natural storage width of fixed-width types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ColumnType::Boolean | ColumnType::UnsignedByte => Some(1),
            ColumnType::SignedInt16 | ColumnType::UnsignedInt16 => Some(2),
            ColumnType::SignedInt32 | ColumnType::UnsignedInt32 | ColumnType::Float32 => Some(4),
            ColumnType::Currency
            | ColumnType::SignedInt64
            | ColumnType::Double64
            | ColumnType::DateTime => Some(8),
            ColumnType::Guid => Some(16),
            ColumnType::Null
            | ColumnType::Binary
            | ColumnType::Text
            | ColumnType::LargeBinary
            | ColumnType::LargeText
            | ColumnType::SuperLargeValue => None,
        }
    }

    /// Text types carry a codepage.
    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::LargeText)
    }

    /// Types whose values can spill into the long-value tree.
    pub fn is_large(&self) -> bool {
        matches!(
            self,
            ColumnType::LargeBinary | ColumnType::LargeText | ColumnType::SuperLargeValue
        )
    }

    /// JET-style type name.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Null => "Nil",
            ColumnType::Boolean => "Bit",
            ColumnType::UnsignedByte => "UnsignedByte",
            ColumnType::SignedInt16 => "Short",
            ColumnType::SignedInt32 => "Long",
            ColumnType::Currency => "Currency",
            ColumnType::Float32 => "IEEESingle",
            ColumnType::Double64 => "IEEEDouble",
            ColumnType::DateTime => "DateTime",
            ColumnType::Binary => "Binary",
            ColumnType::Text => "Text",
            ColumnType::LargeBinary => "LongBinary",
            ColumnType::LargeText => "LongText",
            ColumnType::SuperLargeValue => "SLV",
            ColumnType::UnsignedInt32 => "UnsignedLong",
            ColumnType::SignedInt64 => "LongLong",
            ColumnType::Guid => "GUID",
            ColumnType::UnsignedInt16 => "UnsignedShort",
        }
    }
}

/// Storage class of a column, determined by its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnClass {
    /// Identifiers 1..=127: stored in the fixed region.
    Fixed,
    /// Identifiers 128..=255: stored in the variable region.
    Variable,
    /// Identifiers 256 and up: stored in the tagged region.
    Tagged,
}

impl ColumnClass {
    pub fn of(column_id: u32) -> Self {
        if column_id <= LAST_FIXED_COLUMN_ID {
            ColumnClass::Fixed
        } else if column_id <= LAST_VARIABLE_COLUMN_ID {
            ColumnClass::Variable
        } else {
            ColumnClass::Tagged
        }
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSchema {
    /// Column identifier; also determines the storage class.
    pub id: u32,
    /// Column name.
    pub name: String,
    /// Declared column type.
    pub column_type: ColumnType,
    /// Codepage for text columns (1200 = UTF-16LE).
    pub codepage: u32,
    /// Storage width for fixed columns.
    pub fixed_size: usize,
    /// Catalog flags.
    pub flags: u32,
}

impl ColumnSchema {
    /// A fixed-region column with its type's natural width.
    pub fn fixed(id: u32, name: &str, column_type: ColumnType) -> Self {
        ColumnSchema {
            id,
            name: name.to_string(),
            column_type,
            codepage: 0,
            fixed_size: column_type.fixed_size().unwrap_or(0),
            flags: 0,
        }
    }

    /// A variable-region column.
    pub fn variable(id: u32, name: &str, column_type: ColumnType, codepage: u32) -> Self {
        ColumnSchema {
            id,
            name: name.to_string(),
            column_type,
            codepage,
            fixed_size: 0,
            flags: 0,
        }
    }

    /// A tagged-region column.
    pub fn tagged(id: u32, name: &str, column_type: ColumnType, codepage: u32) -> Self {
        ColumnSchema {
            id,
            name: name.to_string(),
            column_type,
            codepage,
            fixed_size: 0,
            flags: 0,
        }
    }

    pub fn class(&self) -> ColumnClass {
        ColumnClass::of(self.id)
    }
}

/// One index of a table.
#[derive(Debug, Clone, Serialize)]
pub struct IndexSchema {
    /// Index object identifier.
    pub id: u32,
    /// Index name.
    pub name: String,
    /// Root page of the index tree.
    pub root_page: u32,
    /// Catalog flags.
    pub flags: u32,
}

/// Resolved schema of one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    /// Table object identifier.
    pub id: u32,
    /// Table name.
    pub name: String,
    /// Root page of the data tree.
    pub data_root: u32,
    /// Root page of the long-value tree (0 = none).
    pub long_value_root: u32,
    /// Identifier of the template table columns were inherited from
    /// (0 = none).
    pub template_table_id: u32,
    /// Fixed columns, ascending by identifier.
    pub fixed_columns: Vec<ColumnSchema>,
    /// Variable columns, ascending by identifier.
    pub variable_columns: Vec<ColumnSchema>,
    /// Tagged columns, ascending by identifier.
    pub tagged_columns: Vec<ColumnSchema>,
    /// Secondary indexes.
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Assemble a schema from column lists (sorted by identifier here).
    pub fn new(
        id: u32,
        name: &str,
        mut fixed: Vec<ColumnSchema>,
        mut variable: Vec<ColumnSchema>,
        mut tagged: Vec<ColumnSchema>,
    ) -> Self {
        fixed.sort_by_key(|column| column.id);
        variable.sort_by_key(|column| column.id);
        tagged.sort_by_key(|column| column.id);
        TableSchema {
            id,
            name: name.to_string(),
            data_root: 0,
            long_value_root: 0,
            template_table_id: 0,
            fixed_columns: fixed,
            variable_columns: variable,
            tagged_columns: tagged,
            indexes: Vec::new(),
        }
    }

    /// Look up a column by identifier.
    pub fn column(&self, column_id: u32) -> Option<&ColumnSchema> {
        let list = match ColumnClass::of(column_id) {
            ColumnClass::Fixed => &self.fixed_columns,
            ColumnClass::Variable => &self.variable_columns,
            ColumnClass::Tagged => &self.tagged_columns,
        };
        list.binary_search_by_key(&column_id, |column| column.id)
            .ok()
            .map(|index| &list[index])
    }

    /// Look up a column by name (ASCII case-insensitive, like the
    /// engine).
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    /// All columns in storage order: fixed, variable, tagged.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.fixed_columns
            .iter()
            .chain(self.variable_columns.iter())
            .chain(self.tagged_columns.iter())
    }

    pub fn column_count(&self) -> usize {
        self.fixed_columns.len() + self.variable_columns.len() + self.tagged_columns.len()
    }
}

/// Catalog row types.
pub const OBJECT_TYPE_TABLE: u16 = 1;
pub const OBJECT_TYPE_COLUMN: u16 = 2;
pub const OBJECT_TYPE_INDEX: u16 = 3;
pub const OBJECT_TYPE_LONG_VALUE: u16 = 4;
pub const OBJECT_TYPE_CALLBACK: u16 = 5;

/// The catalog's own, hardcoded schema.
pub fn catalog_schema() -> TableSchema {
    TableSchema::new(
        2,
        "MSysObjects",
        vec![
            ColumnSchema::fixed(CAT_COL_OBJID_TABLE, "ObjidTable", ColumnType::SignedInt32),
            ColumnSchema::fixed(CAT_COL_TYPE, "Type", ColumnType::SignedInt16),
            ColumnSchema::fixed(CAT_COL_ID, "Id", ColumnType::SignedInt32),
            ColumnSchema::fixed(
                CAT_COL_COLTYP_OR_FDP,
                "ColtypOrPgnoFDP",
                ColumnType::SignedInt32,
            ),
            ColumnSchema::fixed(CAT_COL_SPACE_USAGE, "SpaceUsage", ColumnType::SignedInt32),
            ColumnSchema::fixed(CAT_COL_FLAGS, "Flags", ColumnType::SignedInt32),
            ColumnSchema::fixed(
                CAT_COL_PAGES_OR_LOCALE,
                "PagesOrLocale",
                ColumnType::SignedInt32,
            ),
            ColumnSchema::fixed(CAT_COL_ROOT_FLAG, "RootFlag", ColumnType::Boolean),
            ColumnSchema::fixed(
                CAT_COL_RECORD_OFFSET,
                "RecordOffset",
                ColumnType::SignedInt16,
            ),
            ColumnSchema::fixed(CAT_COL_LC_MAP_FLAGS, "LCMapFlags", ColumnType::SignedInt32),
            ColumnSchema::fixed(CAT_COL_KEY_MOST, "KeyMost", ColumnType::UnsignedInt16),
        ],
        vec![
            ColumnSchema::variable(CAT_COL_NAME, "Name", ColumnType::Text, CODEPAGE_ASCII),
            ColumnSchema::variable(CAT_COL_STATS, "Stats", ColumnType::Binary, 0),
            ColumnSchema::variable(
                CAT_COL_TEMPLATE_TABLE,
                "TemplateTable",
                ColumnType::Text,
                CODEPAGE_ASCII,
            ),
            ColumnSchema::variable(CAT_COL_DEFAULT_VALUE, "DefaultValue", ColumnType::Binary, 0),
            ColumnSchema::variable(CAT_COL_KEY_FLD_IDS, "KeyFldIDs", ColumnType::Binary, 0),
        ],
        Vec::new(),
    )
}

/// The resolved table directory of a database.
#[derive(Debug)]
pub struct Catalog {
    tables: Vec<Arc<TableSchema>>,
}

struct CatalogRow {
    objid_table: u32,
    row_type: u16,
    id: u32,
    coltyp_or_fdp: u32,
    space_usage: u32,
    flags: u32,
    pages_or_locale: u32,
    name: String,
    template: Option<String>,
}

fn inline_u32(value: &RecordValue) -> Option<u32> {
    match value {
        RecordValue::Inline(bytes) if bytes.len() >= 4 => Some(LittleEndian::read_u32(bytes)),
        _ => None,
    }
}

fn inline_u16(value: &RecordValue) -> Option<u16> {
    match value {
        RecordValue::Inline(bytes) if bytes.len() >= 2 => Some(LittleEndian::read_u16(bytes)),
        _ => None,
    }
}

fn inline_text(value: &RecordValue) -> Option<String> {
    match value {
        RecordValue::Inline(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

impl Catalog {
    /// Walk the catalog tree and resolve every table's schema.
    pub fn load(db: &EseDatabase) -> Result<Self, EseError> {
        let schema = catalog_schema();
        let mut cursor = BTreeCursor::seek_first(db, CATALOG_ROOT_PAGE)
            .map_err(|error| EseError::CatalogMissing(error.to_string()))?;

        let mut rows = Vec::new();
        while let Some(entry) = cursor.next_entry()? {
            let record = parse_record(&entry.data, &schema, entry.page_flags.new_record_format())?;
            let row = CatalogRow {
                objid_table: inline_u32(record.value(CAT_COL_OBJID_TABLE)).ok_or_else(|| {
                    EseError::CatalogMissing("catalog row without owning table id".to_string())
                })?,
                row_type: inline_u16(record.value(CAT_COL_TYPE)).ok_or_else(|| {
                    EseError::CatalogMissing("catalog row without object type".to_string())
                })?,
                id: inline_u32(record.value(CAT_COL_ID)).unwrap_or(0),
                coltyp_or_fdp: inline_u32(record.value(CAT_COL_COLTYP_OR_FDP)).unwrap_or(0),
                space_usage: inline_u32(record.value(CAT_COL_SPACE_USAGE)).unwrap_or(0),
                flags: inline_u32(record.value(CAT_COL_FLAGS)).unwrap_or(0),
                pages_or_locale: inline_u32(record.value(CAT_COL_PAGES_OR_LOCALE)).unwrap_or(0),
                name: inline_text(record.value(CAT_COL_NAME)).unwrap_or_default(),
                template: inline_text(record.value(CAT_COL_TEMPLATE_TABLE)),
            };
            rows.push(row);
        }

        Self::assemble(rows)
    }

    fn assemble(rows: Vec<CatalogRow>) -> Result<Self, EseError> {
        struct TableBuild {
            schema: TableSchema,
            template_name: Option<String>,
        }

        let mut builds: Vec<TableBuild> = Vec::new();
        let mut by_id: HashMap<u32, usize> = HashMap::new();

        for row in &rows {
            if row.row_type != OBJECT_TYPE_TABLE {
                continue;
            }
            let mut schema = TableSchema::new(row.id, &row.name, Vec::new(), Vec::new(), Vec::new());
            schema.data_root = row.coltyp_or_fdp;
            by_id.insert(row.id, builds.len());
            builds.push(TableBuild {
                schema,
                template_name: row.template.clone().filter(|name| !name.is_empty()),
            });
        }

        for row in &rows {
            let Some(&build_index) = by_id.get(&row.objid_table) else {
                continue;
            };
            let build = &mut builds[build_index];
            match row.row_type {
                OBJECT_TYPE_COLUMN => {
                    let column_type =
                        ColumnType::from_u32(row.coltyp_or_fdp).ok_or_else(|| {
                            EseError::UnsupportedFormat(format!(
                                "column type {} in catalog row for {}",
                                row.coltyp_or_fdp, row.name
                            ))
                        })?;
                    let column = ColumnSchema {
                        id: row.id,
                        name: row.name.clone(),
                        column_type,
                        codepage: row.pages_or_locale,
                        fixed_size: if row.space_usage > 0 {
                            row.space_usage as usize
                        } else {
                            column_type.fixed_size().unwrap_or(0)
                        },
                        flags: row.flags,
                    };
                    let list = match ColumnClass::of(row.id) {
                        ColumnClass::Fixed => &mut build.schema.fixed_columns,
                        ColumnClass::Variable => &mut build.schema.variable_columns,
                        ColumnClass::Tagged => &mut build.schema.tagged_columns,
                    };
                    list.push(column);
                }
                OBJECT_TYPE_INDEX => build.schema.indexes.push(IndexSchema {
                    id: row.id,
                    name: row.name.clone(),
                    root_page: row.coltyp_or_fdp,
                    flags: row.flags,
                }),
                OBJECT_TYPE_LONG_VALUE => build.schema.long_value_root = row.coltyp_or_fdp,
                OBJECT_TYPE_TABLE | OBJECT_TYPE_CALLBACK => {}
                other => {
                    log::warn!("ignoring catalog row of unknown type {}", other);
                }
            }
        }

        // Resolve template references by name and inherit columns, the
        // template's ahead of the table's own.
        let by_name: HashMap<String, usize> = builds
            .iter()
            .enumerate()
            .map(|(index, build)| (build.schema.name.to_ascii_lowercase(), index))
            .collect();

        let mut tables = Vec::with_capacity(builds.len());
        for (index, build) in builds.iter().enumerate() {
            let mut schema = build.schema.clone();

            if let Some(template_name) = &build.template_name {
                let mut chain = Vec::new();
                let mut visited = vec![index];
                let mut current = template_name.clone();
                loop {
                    let &template_index =
                        by_name.get(&current.to_ascii_lowercase()).ok_or_else(|| {
                            EseError::CatalogMissing(format!(
                                "template table {} referenced by {} not in catalog",
                                current, build.schema.name
                            ))
                        })?;
                    if visited.contains(&template_index) {
                        return Err(EseError::TemplateCycle(current));
                    }
                    visited.push(template_index);
                    chain.push(template_index);
                    match &builds[template_index].template_name {
                        Some(next) => current = next.clone(),
                        None => break,
                    }
                }
                schema.template_table_id = builds[chain[0]].schema.id;

                // Most-distant ancestor first, then down the chain.
                for &template_index in chain.iter().rev() {
                    let template = &builds[template_index].schema;
                    prepend_columns(&mut schema.fixed_columns, &template.fixed_columns);
                    prepend_columns(&mut schema.variable_columns, &template.variable_columns);
                    prepend_columns(&mut schema.tagged_columns, &template.tagged_columns);
                }
            }

            schema.fixed_columns.sort_by_key(|column| column.id);
            schema.variable_columns.sort_by_key(|column| column.id);
            schema.tagged_columns.sort_by_key(|column| column.id);
            for list in [
                &schema.fixed_columns,
                &schema.variable_columns,
                &schema.tagged_columns,
            ] {
                for window in list.windows(2) {
                    if window[0].id == window[1].id {
                        return Err(EseError::DuplicateColumnId {
                            table: schema.name.clone(),
                            column: window[0].id,
                        });
                    }
                }
            }

            tables.push(Arc::new(schema));
        }

        Ok(Catalog { tables })
    }

    /// Every table in catalog order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableSchema>> {
        self.tables.iter()
    }

    /// Look up a table by name (ASCII case-insensitive).
    pub fn table_by_name(&self, name: &str) -> Option<&Arc<TableSchema>> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

fn prepend_columns(own: &mut Vec<ColumnSchema>, inherited: &[ColumnSchema]) {
    let mut merged = inherited.to_vec();
    merged.append(own);
    *own = merged;
}
