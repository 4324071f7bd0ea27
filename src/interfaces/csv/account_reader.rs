use crate::domain::account::NewAccount;
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads seed accounts (`tax_id, name, balance`) from a CSV source.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: super::reader_builder().from_reader(source),
        }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<NewAccount>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
