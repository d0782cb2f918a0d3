//! Asynchronous CSV reader with batch interface
//!
//! Reads commands in batches with `csv-async`. Rows that fail to parse or
//! convert are logged and skipped so a batch only holds valid commands.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::LedgerCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous command reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` valid commands
    ///
    /// Returns an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(command) => batch.push(command),
                    Err(e) => tracing::warn!(error = %e, "Skipping invalid command"),
                },
                Some(Err(e)) => tracing::warn!(error = %e, "Skipping malformed CSV row"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoneyOp;
    use futures::io::Cursor;

    const HEADER: &str = "op,eid,spid,trade_no,amount,ext_no,name,expires\n";

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let content = format!(
            "{}create_account,alice,,,,,,\nadd,alice,,T1,1,,,\nadd,bob,,T2,2,,,\n",
            HEADER
        );
        let mut reader = AsyncReader::new(Cursor::new(content.into_bytes()));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].eid(), "alice");
        assert_eq!(batch[1].eid(), "alice");

        let batch = reader.read_batch(2).await;
        assert_eq!(
            batch,
            vec![LedgerCommand::Money {
                op: MoneyOp::Add,
                eid: "bob".to_string(),
                trade_no: "T2".to_string(),
                amount: 200,
            }]
        );

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let content = format!("{}wire,alice,,T1,1,,,\nadd,alice,,T2,x,,,\nadd,alice,,T3,5,,,\n", HEADER);
        let mut reader = AsyncReader::new(Cursor::new(content.into_bytes()));

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert!(matches!(
            &batch[0],
            LedgerCommand::Money { trade_no, .. } if trade_no == "T3"
        ));
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = AsyncReader::new(Cursor::new(HEADER.as_bytes()));

        assert!(reader.read_batch(10).await.is_empty());
    }
}
