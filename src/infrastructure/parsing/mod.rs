mod csv_row_source;

pub use csv_row_source::CsvRowSource;
