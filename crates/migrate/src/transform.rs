use async_trait::async_trait;
use docdb::Record;

/// Bespoke per-migration logic mapping one record to its corrected form.
///
/// Implementations must be idempotent: a selector may be re-run over records
/// that were already fixed, and those must come back unchanged.
#[async_trait]
pub trait RecordTransform: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, record: Record) -> anyhow::Result<Record>;
}

/// Adapter turning a plain function into a [`RecordTransform`]
pub struct FnTransform<F> {
    name: String,
    f: F,
}

pub fn transform_fn<F>(name: impl Into<String>, f: F) -> FnTransform<F>
where
    F: Fn(Record) -> anyhow::Result<Record> + Send + Sync,
{
    FnTransform {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> RecordTransform for FnTransform<F>
where
    F: Fn(Record) -> anyhow::Result<Record> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, record: Record) -> anyhow::Result<Record> {
        (self.f)(record)
    }
}
