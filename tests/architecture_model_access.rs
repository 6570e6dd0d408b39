use std::fs;
use std::path::{Path, PathBuf};

const ALLOWED_MODEL_CALLERS: &[&str] = &["src/services/prediction.rs"];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn loaded_model_is_only_invoked_by_the_prediction_service() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let src_root = repo_root.join("src");
    let mut files = Vec::new();
    collect_rust_files(&src_root, &mut files);

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if ALLOWED_MODEL_CALLERS.iter().any(|allowed| *allowed == rel) {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            // Unit tests may drive models directly
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.contains(".model.predict(") {
                offenders.push(format!("{rel}:{}: {}", idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "model handle invoked outside the prediction service:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn predictions_are_never_logged() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/services/prediction.rs");
    let content = fs::read_to_string(&path).expect("prediction service source");
    let body = content.split("#[cfg(test)]").next().unwrap_or_default();

    for (idx, line) in body.lines().enumerate() {
        let logs = ["info!(", "debug!(", "warn!(", "trace!("]
            .iter()
            .any(|m| line.contains(m));
        assert!(
            !(logs && (line.contains("prediccion") || line.contains("log_kwh"))),
            "prediction value logged at src/services/prediction.rs:{}",
            idx + 1
        );
    }
}
