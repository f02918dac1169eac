//! JSON-lines writer that encodes full batches in parallel.

use std::io::Write;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{OutputError, Result};

/// Buffers items and writes them as JSON lines, one batch at a time.
///
/// When the buffer reaches `batch_size` the batch is encoded on the rayon
/// pool and appended to the writer before the next item is accepted. Lines
/// keep the order in which items were pushed.
pub struct BatchSerializer<W: Write, T> {
    writer: W,
    batch_size: usize,
    pending: Vec<T>,
    written: u64,
}

impl<W: Write, T: Serialize + Sync> BatchSerializer<W, T> {
    pub fn new(writer: W, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            writer,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            written: 0,
        }
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        self.pending.push(item);
        if self.pending.len() >= self.batch_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<()> {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    /// Lines written so far, excluding items still buffered.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let lines = encode_batch(&self.pending)?;
        for line in &lines {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.written += lines.len() as u64;
        debug!(lines = lines.len(), total = self.written, "batch written");
        self.pending.clear();
        Ok(())
    }

    /// Write whatever is buffered, flush and return the writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush_pending()?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Encode every item to a JSON line, in parallel, keeping input order.
pub fn encode_batch<T: Serialize + Sync>(items: &[T]) -> Result<Vec<String>> {
    items
        .par_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::to_string(item).map_err(|source| OutputError::Encode { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lines_keep_push_order_across_batches() {
        let mut serializer = BatchSerializer::new(Vec::new(), 2);
        for index in 0..5 {
            serializer.push(json!({"n": index})).unwrap();
        }
        assert_eq!(serializer.written(), 4);
        assert_eq!(serializer.pending(), 1);
        let bytes = serializer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "{\"n\":0}\n{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n{\"n\":4}\n"
        );
    }

    #[test]
    fn zero_batch_size_writes_every_item() {
        let mut serializer = BatchSerializer::new(Vec::new(), 0);
        serializer.push("a").unwrap();
        assert_eq!(serializer.written(), 1);
    }
}
