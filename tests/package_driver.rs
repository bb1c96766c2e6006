use anyhow::Result;
use gnogen::{Config, MemPackage, PackageDriver, PrecompileError, Precompiler};
use std::fs;
use tempfile::TempDir;

fn driver() -> Result<PackageDriver> {
    Ok(PackageDriver::new(Precompiler::new(Config::default())?))
}

#[test]
fn test_parse_and_whitelist_failures_in_file_order() -> Result<()> {
    let pkg = MemPackage::new("bad", "gno.land/p/demo/bad")
        .with_file("a.gno", "package bad\n\nimport \"fmt\"\n\nfunc F( {\n")
        .with_file("b.gno", "package bad\n\nimport \"net/http\"\n")
        .with_file("c.gno", "package bad\n\nimport \"strings\"\n")
        .with_file("c_test.gno", "package bad\n\nimport \"net/http\"\n");

    let err = driver()?.precompile_and_check(&pkg).unwrap_err();
    let PrecompileError::Aggregate(agg) = err else {
        panic!("expected an aggregate error, got {err:?}");
    };

    assert_eq!(agg.len(), 2);
    assert!(matches!(agg.errors()[0], PrecompileError::Parse(_)));
    assert!(agg.errors()[0].to_string().starts_with("parse: a.gno:"));
    match &agg.errors()[1] {
        PrecompileError::WhitelistViolation(list) => assert_eq!(
            list.to_string(),
            "b.gno:3:8: import \"net/http\" is not in the whitelist"
        ),
        other => panic!("expected whitelist violation, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_read_dir_and_check() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("avl.gno"),
        "package avl\n\ntype Node struct{ key string }\n",
    )?;
    fs::write(
        dir.path().join("avl_test.gno"),
        "package avl\n\nimport \"testing\"\n\nfunc TestNode(t *testing.T) {}\n",
    )?;
    fs::write(dir.path().join("gno.mod"), "module gno.land/p/demo/avl\n")?;

    let pkg = MemPackage::read_dir(dir.path())?;
    assert_eq!(pkg.files.len(), 3);

    driver()?.precompile_and_check(&pkg)?;
    Ok(())
}

#[test]
fn test_temporary_directory_is_removed() -> Result<()> {
    let name = format!("cleanupcheck{}", std::process::id());
    let pkg = MemPackage::new(name.clone(), "gno.land/p/demo/cleanup")
        .with_file("ok.gno", "package cleanup\n")
        .with_file("bad.gno", "package cleanup\n\nimport \"os\"\n");

    let _ = driver()?.precompile_and_check(&pkg);

    let prefix = format!("gnogen-{}-", name);
    let leftovers = fs::read_dir(std::env::temp_dir())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn test_top_level_structure_errors_fail_the_package() -> Result<()> {
    let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
        .with_file("a.gno", "package foo\n\nx := 1\n")
        .with_file("b.gno", "package foo\npackage bar\n")
        .with_file("c.gno", "package foo\n\nfunc F() {}\n\nimport \"strings\"\n");

    let err = driver()?.precompile_and_check(&pkg).unwrap_err();
    let PrecompileError::Aggregate(agg) = err else {
        panic!("expected an aggregate error, got {err:?}");
    };

    let reported: Vec<_> = agg.errors().iter().map(|e| e.to_string()).collect();
    assert_eq!(
        reported,
        vec![
            "parse: a.gno:3:1: non-declaration statement outside function body",
            "parse: b.gno:2:1: expected declaration, found 'package'",
            "parse: c.gno:5:1: imports must appear before other declarations",
        ]
    );
    Ok(())
}
