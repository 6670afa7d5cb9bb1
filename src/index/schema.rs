use crate::error::{Result, TenantdexError};
use tantivy::schema::{
    Field, IndexRecordOption, Schema as TantivySchema, TextFieldIndexing, TextOptions, STORED,
    STRING,
};

/// Tokenizer used for both indexing and querying the text fields.
pub const TEXT_TOKENIZER: &str = "simple";

pub const ID_FIELD: &str = "_id";
pub const TENANT_FIELD: &str = "tenant_code";
pub const PROJECT_FIELD: &str = "project_code";
pub const DOCUMENT_TYPE_FIELD: &str = "document_type";
pub const TITLE_FIELD: &str = "title";
pub const BODY_FIELD: &str = "body";

/// Resolved field handles for the fixed document mapping.
///
/// `_id` and the three namespace fields are indexed raw (exact match only);
/// `title` and `body` are tokenized, lowercased and searchable.
#[derive(Debug, Clone, Copy)]
pub struct Fields {
    pub id: Field,
    pub tenant_code: Field,
    pub project_code: Field,
    pub document_type: Field,
    pub title: Field,
    pub body: Field,
}

impl Fields {
    pub fn text_fields(&self) -> [Field; 2] {
        [self.title, self.body]
    }
}

pub fn build_schema() -> TantivySchema {
    let mut builder = TantivySchema::builder();

    builder.add_text_field(ID_FIELD, STRING | STORED);
    builder.add_text_field(TENANT_FIELD, STRING | STORED);
    builder.add_text_field(PROJECT_FIELD, STRING | STORED);
    builder.add_text_field(DOCUMENT_TYPE_FIELD, STRING | STORED);

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer(TEXT_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_opts = TextOptions::default()
        .set_indexing_options(text_indexing)
        .set_stored();

    builder.add_text_field(TITLE_FIELD, text_opts.clone());
    builder.add_text_field(BODY_FIELD, text_opts);

    builder.build()
}

/// Look up every field of the mapping. An index created by something else
/// (or damaged) fails here rather than at the first query.
pub fn resolve_fields(schema: &TantivySchema) -> Result<Fields> {
    Ok(Fields {
        id: get_field(schema, ID_FIELD)?,
        tenant_code: get_field(schema, TENANT_FIELD)?,
        project_code: get_field(schema, PROJECT_FIELD)?,
        document_type: get_field(schema, DOCUMENT_TYPE_FIELD)?,
        title: get_field(schema, TITLE_FIELD)?,
        body: get_field(schema, BODY_FIELD)?,
    })
}

fn get_field(schema: &TantivySchema, name: &str) -> Result<Field> {
    schema.get_field(name).map_err(|_| {
        TenantdexError::Storage(format!("index schema is missing field '{}'", name))
    })
}
