//! # Local File Checks
//!
//! Compares local files against the checksums a document declares. Sources
//! are resolved through the [`ValidationContext`]; only those that resolve
//! to a local path are checked, URLs are left to whoever downloads them.

use rdfkit_core::{Diagnostics, FileSource, Loc, ResolvedSource, Sha256};
use rdfkit_model::Model;
use rdfkit_validate::ValidationContext;

/// Check every declared checksum of `model` whose file resolves to a local
/// path under `ctx`.
pub fn check_local_files(model: &Model, ctx: &ValidationContext, diag: &mut Diagnostics) {
    for (format, entry) in model.weights.iter() {
        let entry_loc = Loc::from_fields(["weights", format.as_str()]);
        if let Some(expected) = &entry.common.sha256 {
            check_file(ctx, &entry.common.source, expected, &entry_loc.field("sha256"), diag);
        }
        if let Some((callable, expected)) = entry.architecture().and_then(|a| a.source()) {
            let loc = entry_loc.field("architecture").field("sha256");
            check_file(ctx, callable.source(), expected, &loc, diag);
        }
    }
}

fn check_file(
    ctx: &ValidationContext,
    source: &FileSource,
    expected: &Sha256,
    loc: &Loc,
    diag: &mut Diagnostics,
) {
    let path = match ctx.resolve(source) {
        Ok(ResolvedSource::Path(path)) => path,
        Ok(ResolvedSource::Url(_)) => return,
        Err(e) => {
            diag.error(loc, format!("cannot resolve {source}: {e}"));
            return;
        }
    };
    match std::fs::read(&path) {
        Ok(bytes) => {
            let actual = Sha256::digest(&bytes);
            tracing::debug!(path = %path.display(), %actual, "hashed local file");
            if &actual != expected {
                diag.error(
                    loc,
                    format!("sha256 mismatch for {source}: declared {expected}, computed {actual}"),
                );
            }
        }
        Err(e) => diag.error(loc, format!("cannot read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfkit_core::ResolutionRoot;
    use rdfkit_model::ParseOptions;
    use serde_json::json;

    fn model(weights_sha: &str, arch_sha: &str) -> Model {
        let raw = json!({
            "format_version": "0.5.0",
            "type": "model",
            "name": "checked",
            "description": "",
            "authors": [{"name": "Ada"}],
            "license": "MIT",
            "inputs": [{"name": "raw", "test_tensor": "raw.npy",
                        "values": {"type": "interval", "data_type": "float32"},
                        "axes": [{"type": "space", "name": "x", "size": 8}]}],
            "outputs": [{"name": "out", "test_tensor": "out.npy",
                         "values": {"type": "interval", "data_type": "float32"},
                         "axes": [{"type": "space", "name": "x", "size": 8}]}],
            "weights": {"pytorch_state_dict": {
                "source": "weights.pt",
                "sha256": weights_sha,
                "architecture": {"callable": "net.py:Net", "sha256": arch_sha},
            }},
        });
        let mut diag = Diagnostics::new();
        let model = Model::parse(&raw, &ParseOptions::default(), &mut diag);
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        model.unwrap()
    }

    #[test]
    fn matching_files_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weights.pt"), b"weights").unwrap();
        std::fs::write(dir.path().join("net.py"), b"class Net: pass\n").unwrap();
        let m = model(
            Sha256::digest(b"weights").as_str(),
            Sha256::digest(b"class Net: pass\n").as_str(),
        );
        let mut diag = Diagnostics::new();
        let ctx = ValidationContext::new(ResolutionRoot::from_dir(dir.path()));
        check_local_files(&m, &ctx, &mut diag);
        assert!(!diag.has_errors(), "{:?}", diag.errors());
    }

    #[test]
    fn mismatch_and_missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weights.pt"), b"tampered").unwrap();
        let m = model(Sha256::digest(b"weights").as_str(), &"0".repeat(64));
        let mut diag = Diagnostics::new();
        let ctx = ValidationContext::new(ResolutionRoot::from_dir(dir.path()));
        check_local_files(&m, &ctx, &mut diag);
        let locs: Vec<String> = diag.errors().iter().map(|e| e.loc.to_string()).collect();
        assert_eq!(
            locs,
            vec![
                "weights.pytorch_state_dict.sha256",
                "weights.pytorch_state_dict.architecture.sha256",
            ]
        );
    }

    #[test]
    fn url_roots_are_skipped() {
        let m = model(&"0".repeat(64), &"0".repeat(64));
        let mut diag = Diagnostics::new();
        let ctx = ValidationContext::new(ResolutionRoot::parse("https://example.org/m/"));
        check_local_files(&m, &ctx, &mut diag);
        assert!(!diag.has_errors());
    }
}
