use crate::error::{MigrationError, MigrationResult};
use docdb::{Filter, DEFAULT_BATCH_SIZE};
use std::path::{Path, PathBuf};

const ID_COLUMN: &str = "record_id";

/// Record ids to migrate, read from a CSV export or a plain list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList {
    ids: Vec<String>,
}

/// One chunk of an [`IdList`]: its offset, selector and report directory
#[derive(Debug, Clone)]
pub struct IdBatch {
    pub offset: usize,
    pub ids: Vec<String>,
    pub selector: Filter,
}

impl IdBatch {
    /// `{base}/{offset}_{name}`
    pub fn output_dir(&self, base: &Path, name: &str) -> PathBuf {
        base.join(format!("{}_{}", self.offset, name))
    }
}

impl IdList {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn from_path(path: &Path) -> MigrationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|reason| MigrationError::InvalidIdList {
            path: path.display().to_string(),
            reason,
        })
    }

    /// CSV with a `record_id` header column, or one id per line. Quoted
    /// fields may contain commas.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let header = reader.headers().map_err(|e| e.to_string())?.clone();
        if header.iter().all(str::is_empty) {
            return Ok(Self::new(Vec::new()));
        }

        let column = match header.iter().position(|h| h == ID_COLUMN) {
            Some(column) => column,
            None if header.len() > 1 => {
                return Err(format!("CSV header has no '{}' column", ID_COLUMN));
            }
            None => {
                // single column without a header: every line is an id
                let mut ids = vec![header[0].to_string()];
                for row in reader.records() {
                    let row = row.map_err(|e| e.to_string())?;
                    if let Some(id) = row.get(0).filter(|id| !id.is_empty()) {
                        ids.push(id.to_string());
                    }
                }
                return Ok(Self::new(ids));
            }
        };

        let mut ids = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| e.to_string())?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            match row.get(column).filter(|id| !id.is_empty()) {
                Some(id) => ids.push(id.to_string()),
                None => return Err(format!("row {} has no {} value", line, ID_COLUMN)),
            }
        }
        Ok(Self::new(ids))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Chunks of at most `size` ids (default 150 when zero)
    pub fn batches(&self, size: usize) -> Vec<IdBatch> {
        let size = if size == 0 { DEFAULT_BATCH_SIZE } else { size };
        self.ids
            .chunks(size)
            .enumerate()
            .map(|(index, chunk)| IdBatch {
                offset: index * size,
                ids: chunk.to_vec(),
                selector: Filter::by_ids(chunk),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_csv_with_record_id_column() {
        let list = IdList::parse("name,record_id\nfoo,\"abc\"\nbar,def\n").unwrap();
        assert_eq!(list.ids(), &["abc", "def"]);
    }

    #[test]
    fn test_quoted_fields_keep_their_commas() {
        let list = IdList::parse("name,record_id\n\"Doe, Jane\",abc-123\n").unwrap();
        assert_eq!(list.ids(), &["abc-123"]);

        let list = IdList::parse("record_id,note\n\"x-1\",\"a, b, c\"\ny-2,plain\n").unwrap();
        assert_eq!(list.ids(), &["x-1", "y-2"]);
    }

    #[test]
    fn test_parse_plain_lines() {
        let list = IdList::parse("abc\n\n  def  \n").unwrap();
        assert_eq!(list.ids(), &["abc", "def"]);
        assert!(IdList::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_csv_without_id_column_is_rejected() {
        assert!(IdList::parse("name,location\na,b\n").is_err());
        assert!(IdList::parse("record_id,name\n,b\n").is_err());
    }

    #[test]
    fn test_batches_use_offsets_and_in_filters() {
        let ids: Vec<String> = (0..5).map(|i| format!("id{}", i)).collect();
        let batches = IdList::new(ids).batches(2);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].offset, 2);
        assert_eq!(
            batches[2].selector.to_value(),
            json!({"_id": {"$in": ["id4"]}})
        );
        assert_eq!(
            batches[1].output_dir(Path::new("/tmp/out"), "fix_channel_names"),
            PathBuf::from("/tmp/out/2_fix_channel_names")
        );
    }

    #[test]
    fn test_from_path_reports_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();

        match IdList::from_path(file.path()) {
            Err(MigrationError::InvalidIdList { path, .. }) => {
                assert_eq!(path, file.path().display().to_string())
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
