//! Subcommand behavior on documents written to temporary directories.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use rdfkit_cli::dump::{dump_file, DumpArgs};
use rdfkit_cli::migrate::{migrate_file, MigrateArgs};
use rdfkit_cli::validate::{run_validate, validate_file, ValidateArgs};
use rdfkit_cli::{EXIT_FAILED, EXIT_PASSED};
use rdfkit_core::{FormatVersion, Sha256};
use rdfkit_validate::ValidationConfig;

const ARCHITECTURE: &[u8] = b"class UNet2d:\n    pass\n";

fn unet_0_4() -> Value {
    json!({
        "format_version": "0.4.9",
        "type": "model",
        "name": "UNet 2D nuclei",
        "description": "Nucleus segmentation",
        "authors": [{"name": "Jane Doe"}],
        "license": "MIT",
        "inputs": [{
            "name": "input0",
            "axes": "bcyx",
            "data_type": "float32",
            "shape": {"min": [1, 1, 64, 64], "step": [0, 0, 16, 16]},
        }],
        "outputs": [{
            "name": "output0",
            "axes": "bcyx",
            "data_type": "float32",
            "shape": {"reference_tensor": "input0", "scale": [1, 1, 1, 1], "offset": [0, 0, 0, 0]},
            "halo": [0, 0, 8, 8],
        }],
        "test_inputs": ["test_input.npy"],
        "test_outputs": ["test_output.npy"],
        "weights": {
            "pytorch_state_dict": {
                "source": "weights.pt",
                "architecture": "unet.py:UNet2d",
                "architecture_sha256": Sha256::digest(ARCHITECTURE).as_str(),
            },
        },
    })
}

fn write_yaml(dir: &Path, doc: &Value) -> PathBuf {
    let path = dir.join("rdf.yaml");
    std::fs::write(&path, serde_yaml::to_string(doc).unwrap()).unwrap();
    path
}

fn validate_args(path: PathBuf) -> ValidateArgs {
    ValidateArgs {
        path,
        root: None,
        as_latest: true,
        json: false,
    }
}

#[test]
fn valid_document_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let code = run_validate(&validate_args(path), ValidationConfig::default()).unwrap();
    assert_eq!(code, EXIT_PASSED);
}

#[test]
fn invalid_document_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = unet_0_4();
    doc["outputs"][0]["halo"] = json!([0, 0, 40, 8]);
    let path = write_yaml(dir.path(), &doc);
    let summary = validate_file(&validate_args(path.clone()), ValidationConfig::default()).unwrap();
    let locs: Vec<String> = summary.errors.iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["outputs[0].axes[2].halo"]);
    let code = run_validate(&validate_args(path), ValidationConfig::default()).unwrap();
    assert_eq!(code, EXIT_FAILED);
}

#[test]
fn unreadable_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = validate_args(dir.path().join("missing.yaml"));
    assert!(run_validate(&args, ValidationConfig::default()).is_err());
}

#[test]
fn io_checks_verify_local_checksums() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let config = ValidationConfig {
        perform_io_checks: true,
        ..ValidationConfig::default()
    };

    std::fs::write(dir.path().join("unet.py"), ARCHITECTURE).unwrap();
    let summary = validate_file(&validate_args(path.clone()), config.clone()).unwrap();
    assert!(summary.is_passed(), "{:?}", summary.errors);

    std::fs::write(dir.path().join("unet.py"), b"class Other: pass\n").unwrap();
    let summary = validate_file(&validate_args(path), config).unwrap();
    let locs: Vec<String> = summary.errors.iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["weights.pytorch_state_dict.architecture.sha256"]);
}

#[test]
fn io_checks_are_off_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let summary = validate_file(&validate_args(path), ValidationConfig::default()).unwrap();
    assert!(summary.is_passed(), "{:?}", summary.errors);
}

#[test]
fn migrate_rewrites_axes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let migrated = migrate_file(
        &MigrateArgs {
            path: path.clone(),
            to: None,
        },
        &ValidationConfig::default(),
    )
    .unwrap();
    assert_eq!(migrated["format_version"], "0.5.0");
    assert_eq!(migrated["inputs"][0]["axes"][0], json!({"type": "batch"}));
    // The file on disk is untouched.
    let on_disk: Value = serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["format_version"], "0.4.9");
}

#[test]
fn migrate_rejects_unknown_series() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let args = MigrateArgs {
        path,
        to: Some(FormatVersion::new_const(0, 7, 0)),
    };
    assert!(migrate_file(&args, &ValidationConfig::default()).is_err());
}

#[test]
fn dump_prints_normalized_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_yaml(dir.path(), &unet_0_4());
    let args = DumpArgs {
        path,
        root: None,
        json: true,
    };
    let dumped = dump_file(&args, ValidationConfig::default()).unwrap().unwrap();
    assert_eq!(dumped["format_version"], "0.5.0");
    assert_eq!(dumped["type"], "model");
    assert_eq!(
        dumped["outputs"][0]["axes"][2],
        json!({"type": "space", "name": "y", "size": {"reference": "input0.y"}, "halo": 8})
    );
}

#[test]
fn dump_of_invalid_document_returns_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = unet_0_4();
    doc["license"] = json!("");
    let path = write_yaml(dir.path(), &doc);
    let args = DumpArgs {
        path,
        root: None,
        json: false,
    };
    let summary = dump_file(&args, ValidationConfig::default()).unwrap().unwrap_err();
    assert!(!summary.is_passed());
}
