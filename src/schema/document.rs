use tokenizer_api::{BoxTokenStream, PreTokenizedStream, Token, TokenStream};

use crate::schema::FieldOptions;

/// One value of a field: its name, its options and the tokens it was
/// analyzed into.
pub struct DocumentField<'a> {
    pub(crate) name: String,
    pub(crate) options: FieldOptions,
    pub(crate) tokens: BoxTokenStream<'a>,
}

impl<'a> DocumentField<'a> {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field options.
    pub fn options(&self) -> FieldOptions {
        self.options
    }
}

/// A document, as an ordered list of analyzed field values.
///
/// Documents are consumed by the indexer; nothing of them is retained once
/// `add_document` returns. A field may appear several times: positions
/// and offsets of its values then follow each other.
#[derive(Default)]
pub struct Document<'a> {
    fields: Vec<DocumentField<'a>>,
}

impl<'a> Document<'a> {
    /// Appends a field value given as a token stream.
    pub fn add_field<T>(&mut self, name: impl Into<String>, options: FieldOptions, tokens: T)
    where
        T: TokenStream + 'a,
    {
        self.fields.push(DocumentField {
            name: name.into(),
            options,
            tokens: BoxTokenStream::from(tokens),
        });
    }

    /// Appends a field value given as a list of tokens.
    pub fn add_pre_tokenized(
        &mut self,
        name: impl Into<String>,
        options: FieldOptions,
        tokens: Vec<Token>,
    ) {
        self.add_field(name, options, PreTokenizedStream::from(tokens));
    }

    /// Returns the number of field values.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true iff the document has no field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the field values.
    pub fn fields(&self) -> impl Iterator<Item = &DocumentField<'a>> {
        self.fields.iter()
    }

    pub(crate) fn into_fields(self) -> Vec<DocumentField<'a>> {
        self.fields
    }
}
