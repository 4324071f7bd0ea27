//! CSV adapters for seeding accounts, reading payment requests and writing results.

pub mod account_reader;
pub mod account_writer;
pub mod payment_reader;
pub mod payment_writer;

fn reader_builder() -> ::csv::ReaderBuilder {
    let mut builder = ::csv::ReaderBuilder::new();
    builder.trim(::csv::Trim::All).flexible(true);
    builder
}
