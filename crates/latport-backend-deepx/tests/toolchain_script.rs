#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::write_onnx;
use latport_backend_deepx::DxCom;
use latport_core::{BackendError, Compiler, CompilerOptions, SystemRunner};

const STUB: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -m) model="$2"; shift 2 ;;
    -c) config="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
[ -f "$config" ] || { echo "no config" >&2; exit 4; }
name=$(basename "$model" .onnx)
case "$MODE" in
  ok) echo "compiled $name"; touch "$out/$name.dxnn" ;;
  silent) echo "nothing written" ;;
  fail) echo "unsupported operator in $name" >&2; exit 1 ;;
esac
"#;

fn install_stub(dir: &Path, mode: &str) -> PathBuf {
    let path = dir.join(format!("dx_com_{mode}"));
    std::fs::write(&path, STUB.replace("$MODE", mode)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn compiler(toolchain: PathBuf) -> DxCom {
    DxCom::new(
        CompilerOptions {
            toolchain_path: toolchain,
            ..Default::default()
        },
        Arc::new(SystemRunner::new().unwrap()),
    )
}

// One test so no other thread forks while a stub is open for writing.
#[test]
fn dx_com_stub_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    let ok = install_stub(&bin, "ok");
    let silent = install_stub(&bin, "silent");
    let fail = install_stub(&bin, "fail");

    let model = write_onnx(dir.path(), "net_a", "x", &[1, 3, 224, 224]);
    latport_onnx::write_config(&model).unwrap();
    let save = dir.path().join("out");

    let compiled = compiler(ok.clone()).compile(&model, &save, None).unwrap();
    assert_eq!(compiled.path, save.join("net_a").join("net_a.dxnn"));
    assert!(compiler(ok).check());

    std::fs::remove_file(&compiled.path).unwrap();
    let err = compiler(silent).compile(&model, &save, None).unwrap_err();
    assert!(matches!(err, BackendError::MissingOutput(_)));

    let err = compiler(fail).compile(&model, &save, None).unwrap_err();
    match err {
        BackendError::ToolchainExecution { code, stderr, .. } => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr.trim(), "unsupported operator in net_a");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = compiler(bin.join("missing"))
        .compile(&model, &save, None)
        .unwrap_err();
    assert!(matches!(err, BackendError::ToolchainExecution { code: None, .. }));
}
