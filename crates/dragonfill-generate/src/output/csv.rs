use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use dragonfill_core::Table;

/// Write a table as CSV: header in schema order, one record per row.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(table.schema().column_names())?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|value| value.to_csv()))?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use dragonfill_core::{TableName, Value};

    use super::*;

    #[test]
    fn nulls_become_empty_fields() {
        let dir = std::env::temp_dir().join(format!("dragonfill_csv_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("partners.csv");

        let mut table = Table::new(TableName::Partners);
        let at = NaiveDate::from_ymd_opt(2023, 1, 2)
            .and_then(|date| date.and_hms_opt(9, 5, 0))
            .expect("timestamp");
        table.push(vec![
            Value::id(1),
            Value::text("Zofia, Maria"),
            Value::Null,
            Value::Timestamp(at),
        ]);

        let bytes = write_table_csv(&path, &table).expect("write");
        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(
            contents,
            "partner_id,name,gender,updated_at\n1,\"Zofia, Maria\",,2023-01-02 09:05:00\n"
        );
        assert_eq!(bytes, contents.len() as u64);
        std::fs::remove_dir_all(&dir).ok();
    }
}
