use crate::domain::account::AccountResponse;
use crate::error::Result;
use std::io::Write;

/// Writes account balances as CSV (`id, tax_id, name, balance`).
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = AccountResponse>) -> Result<()> {
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_accounts() {
        let mut buffer = Vec::new();
        AccountWriter::new(&mut buffer)
            .write_accounts(vec![AccountResponse {
                id: 1,
                tax_id: "12345678900".to_string(),
                name: "Alice".to_string(),
                balance: dec!(60.00),
            }])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "id,tax_id,name,balance\n1,12345678900,Alice,60.00\n");
    }
}
