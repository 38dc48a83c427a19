//! Row-based editors backing the list and table inputs of the product form.

use crate::error::ConsoleError;
use crate::models::KeyValueMap;
use serde::Serialize;

/**
 * check_index
 * Rejects a row index the builder no longer has.
 */
fn check_index(index: usize, len: usize) -> Result<(), ConsoleError> {
    if index < len {
        Ok(())
    } else {
        Err(ConsoleError::RowOutOfRange { index, len })
    }
}

/// Ordered free-text rows (pack sizes, benefits, application methods).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ListBuilder {
    items: Vec<String>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn add_row(&mut self) {
        self.items.push(String::new());
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) -> Result<(), ConsoleError> {
        check_index(index, self.items.len())?;
        self.items[index] = value.into();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<String, ConsoleError> {
        check_index(index, self.items.len())?;
        Ok(self.items.remove(index))
    }

    /// Rows that are not blank, kept verbatim.
    pub fn non_blank(&self) -> Vec<String> {
        self.items()
            .iter()
            .filter(|item| !item.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Rows that are not blank, trimmed.
    pub fn trimmed(&self) -> Vec<String> {
        self.items()
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyValueRow {
    pub key: String,
    pub value: String,
}

/// Editable `{key, value}` rows for the mapping fields. Rows may repeat or
/// leave the key blank while being edited; `fold` resolves both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyValueBuilder {
    rows: Vec<KeyValueRow>,
}

impl KeyValueBuilder {
    pub fn from_map(map: &KeyValueMap) -> Self {
        Self {
            rows: map
                .iter()
                .map(|(key, value)| KeyValueRow {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[KeyValueRow] {
        &self.rows
    }

    pub fn add_row(&mut self) {
        self.rows.push(KeyValueRow::default());
    }

    pub fn set_key(&mut self, index: usize, key: impl Into<String>) -> Result<(), ConsoleError> {
        check_index(index, self.rows.len())?;
        self.rows[index].key = key.into();
        Ok(())
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> Result<(), ConsoleError> {
        check_index(index, self.rows.len())?;
        self.rows[index].value = value.into();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<KeyValueRow, ConsoleError> {
        check_index(index, self.rows.len())?;
        Ok(self.rows.remove(index))
    }

    /// Drops rows whose key is blank and folds the rest into a mapping. The
    /// last row wins on a repeated key.
    pub fn fold(&self) -> KeyValueMap {
        self.rows()
            .iter()
            .filter(|row| !row.key.trim().is_empty())
            .map(|row| (row.key.as_str(), row.value.as_str()))
            .collect()
    }
}
