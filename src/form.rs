// Form state: the captured submission, per-field errors and the loading
// flag. Kept free of any terminal code so the rules can be tested.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Inline error shown when a text field is left empty.
pub const EMPTY_FIELD_ERROR: &str = "This field shouldn't be empty!";

/// Text fields of the mint form. The file field is handled separately
/// since it is the only one that blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Description,
    ExternalUrl,
    Wallet,
}

impl Field {
    /// Prompt order.
    pub const ALL: [Field; 4] = [
        Field::Name,
        Field::Description,
        Field::ExternalUrl,
        Field::Wallet,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Description => "Description",
            Field::ExternalUrl => "External URL",
            Field::Wallet => "Destination Wallet",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::Name => "Choose the name for your NFT",
            Field::Description => "Describe your NFT",
            Field::ExternalUrl => "Provide a link to the NFT Project's website",
            Field::Wallet => "Provide the Polygon wallet you would like the NFT send to",
        }
    }
}

/// Field → error message. A field without an entry is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    /// Validate a field when it loses focus. An empty value sets the
    /// field's error, anything else clears it. Returns the current error.
    pub fn blur(&mut self, field: Field, value: &str) -> Option<&str> {
        if value.is_empty() {
            self.0.insert(field, EMPTY_FIELD_ERROR.to_string());
        } else {
            self.0.remove(&field);
        }
        self.get(field)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }
}

/// Everything the user entered, captured once at submit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionInput {
    pub file: Option<PathBuf>,
    pub name: String,
    pub description: String,
    pub external_url: String,
    pub wallet: String,
}

impl SubmissionInput {
    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Description => self.description = value,
            Field::ExternalUrl => self.external_url = value,
            Field::Wallet => self.wallet = value,
        }
    }
}

/// Session state of the form.
#[derive(Debug, Default)]
pub struct FormState {
    pub errors: FieldErrors,
    loading: bool,
}

impl FormState {
    /// Mark a submission as in flight. Returns false, withholding the
    /// submit, if one already is.
    pub fn begin_submit(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Clear the loading flag after success or failure.
    pub fn end_submit(&mut self) {
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
