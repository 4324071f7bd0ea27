use crate::domain::payment::PaymentResponse;
use crate::error::Result;
use std::io::Write;

/// Writes payment projections as CSV (`id, type, status, amount, message`).
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row and flushes, so results show up as requests are processed.
    pub fn write(&mut self, response: &PaymentResponse) -> Result<()> {
        self.writer.serialize(response)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{PaymentStatus, PaymentType};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_write_responses() {
        let mut buffer = Vec::new();
        {
            let mut writer = PaymentWriter::new(&mut buffer);
            writer
                .write(&PaymentResponse {
                    id: Uuid::nil(),
                    r#type: PaymentType::Boleto,
                    status: PaymentStatus::Approved,
                    amount: dec!(40.00),
                    message: Some("ok".to_string()),
                })
                .unwrap();
            writer
                .write(&PaymentResponse {
                    id: Uuid::nil(),
                    r#type: PaymentType::Transfer,
                    status: PaymentStatus::Pending,
                    amount: dec!(1.5),
                    message: None,
                })
                .unwrap();
        }

        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("id,type,status,amount,message"));
        assert_eq!(
            lines.next(),
            Some("00000000-0000-0000-0000-000000000000,boleto,approved,40.00,ok")
        );
        assert_eq!(
            lines.next(),
            Some("00000000-0000-0000-0000-000000000000,transfer,pending,1.5,")
        );
    }
}
