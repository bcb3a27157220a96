use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index, TantivyError};

/// Tokenizer name registered on every store for the `contents` field.
pub const SOURCE_TOKENIZER: &str = "source";

pub const PATH_FIELD: &str = "path";
pub const MODIFIED_FIELD: &str = "modified";
pub const CONTENTS_FIELD: &str = "contents";

/// Field handles for the per-file document.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    pub schema: Schema,
    /// Exact absolute path; raw and stored.
    pub path: Field,
    /// Modification time in epoch millis; filterable, not stored.
    pub modified: Field,
    /// Tokenized file text; not stored.
    pub contents: Field,
}

impl DocumentSchema {
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let path = builder.add_text_field(PATH_FIELD, STRING | STORED);
        let modified = builder.add_i64_field(MODIFIED_FIELD, INDEXED | FAST);

        let contents_indexing = TextFieldIndexing::default()
            .set_tokenizer(SOURCE_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let contents = builder.add_text_field(
            CONTENTS_FIELD,
            TextOptions::default().set_indexing_options(contents_indexing),
        );

        Self {
            schema: builder.build(),
            path,
            modified,
            contents,
        }
    }

    /// Resolve field handles from an existing store's schema.
    pub fn from_schema(schema: Schema) -> Result<Self, TantivyError> {
        Ok(Self {
            path: schema.get_field(PATH_FIELD)?,
            modified: schema.get_field(MODIFIED_FIELD)?,
            contents: schema.get_field(CONTENTS_FIELD)?,
            schema,
        })
    }
}

impl Default for DocumentSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Split on non-alphanumerics and lowercase. No token length cap, so long
/// identifiers stay searchable.
pub fn source_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build()
}

pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(SOURCE_TOKENIZER, source_analyzer());
}

/// Tokens the analyzer produces for `text`, in order.
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}
