use super::types::ExecutionResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutputs {
    pub document: PathBuf,
    pub result: PathBuf,
}

/// Write the composite document as `<title-slug>.md` and the full result as
/// `<run_id>.json` under `dir`, creating it when needed. `~` is expanded.
pub async fn write_outputs(result: &ExecutionResult, dir: &Path) -> Result<WrittenOutputs> {
    let dir = expand(dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let document = dir.join(format!("{}.md", slug(&result.title)));
    tokio::fs::write(&document, &result.document)
        .await
        .with_context(|| format!("Failed to write report to {}", document.display()))?;

    let json = serde_json::to_string_pretty(result).context("Failed to serialize run result")?;
    let result_path = dir.join(format!("{}.json", result.metadata.run_id));
    tokio::fs::write(&result_path, json)
        .await
        .with_context(|| format!("Failed to write result to {}", result_path.display()))?;

    tracing::info!(
        document = %document.display(),
        result = %result_path.display(),
        "Run outputs written"
    );

    Ok(WrittenOutputs {
        document,
        result: result_path,
    })
}

fn expand(dir: &Path) -> PathBuf {
    let raw = dir.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Lowercase ASCII words joined by `_`; "report" when nothing is left.
pub fn slug(title: &str) -> String {
    let words = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>();
    if words.is_empty() {
        "report".to_string()
    } else {
        words.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{RunMetadata, RunStatus};
    use chrono::Utc;

    fn result() -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            status: RunStatus::Success,
            title: "Revenue Optimization Plan".into(),
            final_node: "revenue_management".into(),
            nodes: Vec::new(),
            document: "# Revenue Optimization Plan\n\nbody\n".into(),
            metadata: RunMetadata {
                run_id: "run_1234".into(),
                provider: "amazon".into(),
                started_at: now,
                finished_at: now,
                duration_ms: 12,
                completed: vec!["revenue_management".into()],
                failed: Vec::new(),
                cancelled: false,
            },
        }
    }

    #[test]
    fn slug_joins_lowercase_words() {
        assert_eq!(slug("Revenue Optimization Plan"), "revenue_optimization_plan");
        assert_eq!(slug("  Q3 -- Plan!"), "q3_plan");
        assert_eq!(slug("???"), "report");
    }

    #[tokio::test]
    async fn writes_document_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested").join("output");

        let written = write_outputs(&result(), &out).await.unwrap();

        assert_eq!(written.document, out.join("revenue_optimization_plan.md"));
        assert_eq!(written.result, out.join("run_1234.json"));
        let doc = tokio::fs::read_to_string(&written.document).await.unwrap();
        assert!(doc.contains("body"));
        let json: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&written.result).await.unwrap())
                .unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["metadata"]["run_id"], "run_1234");
    }
}
