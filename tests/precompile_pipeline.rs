use anyhow::Result;
use gnogen::diagnostics::{translate, RegexDiagnosticParser};
use gnogen::{Config, PrecompileError, Precompiler, SourceFile};

const REALM: &str = r#"package boards

import (
	"strconv"

	"gno.land/p/demo/avl"
	"gno.land/r/demo/users"
	"std"
)

var gBoards avl.Tree

func GetBoardURL(id int) string {
	caller := std.GetOrigCaller()
	return users.Resolve(caller) + "/" + strconv.Itoa(id)
}
"#;

#[test]
fn test_realm_precompiles() -> Result<()> {
    let mut precompiler = Precompiler::new(Config::default())?;
    let out = precompiler.precompile_file(&SourceFile::new("boards.gno", REALM))?;

    assert!(out.violations.is_empty());
    assert_eq!(out.generated.name, "boards.gno.gen.go");
    assert_eq!(out.generated.tags, "gno");

    let text = &out.generated.text;
    assert!(text.starts_with(
        "// Code generated by github.com/gnolang/gno. DO NOT EDIT.\n\n//go:build gno\n\n//line :1:1\npackage boards\n"
    ));
    assert!(text.contains("\t\"github.com/gnolang/gno/examples/gno.land/p/demo/avl\"\n"));
    assert!(text.contains("\t\"github.com/gnolang/gno/examples/gno.land/r/demo/users\"\n"));
    assert!(text.contains("\t\"github.com/gnolang/gno/gnovm/stdlibs/stdshim\"\n"));
    assert!(text.contains("\t\"strconv\"\n"));

    let originals: Vec<_> = out
        .imports
        .iter()
        .map(|i| i.original_path.as_str())
        .collect();
    assert_eq!(
        originals,
        vec!["strconv", "gno.land/p/demo/avl", "gno.land/r/demo/users", "std"]
    );
    Ok(())
}

#[test]
fn test_body_lines_match_source_lines() -> Result<()> {
    let mut precompiler = Precompiler::new(Config::default())?;
    let out = precompiler.precompile_file(&SourceFile::new("boards.gno", REALM))?;

    // Everything after the line directive is line-for-line the gno file
    let body = out
        .generated
        .text
        .split_once("//line :1:1\n")
        .map(|(_, body)| body)
        .unwrap_or_default();
    assert_eq!(body.lines().count(), REALM.lines().count());
    for (generated, original) in body.lines().zip(REALM.lines()) {
        if !original.contains("gno.land/") && !original.contains("\"std\"") {
            assert_eq!(generated, original);
        }
    }
    Ok(())
}

#[test]
fn test_precompile_is_idempotent() -> Result<()> {
    let file = SourceFile::new("boards.gno", REALM);

    let first = Precompiler::new(Config::default())?.precompile_file(&file)?;
    let mut precompiler = Precompiler::new(Config::default())?;
    let second = precompiler.precompile_file(&file)?;
    let third = precompiler.precompile_file(&file)?;

    assert_eq!(first.generated, second.generated);
    assert_eq!(second.generated, third.generated);
    Ok(())
}

#[test]
fn test_alternate_module_root() -> Result<()> {
    let config = Config {
        module_root: "example.com/chain".to_string(),
        ..Config::default()
    };
    let mut precompiler = Precompiler::new(config)?;
    let out = precompiler.precompile_file(&SourceFile::new("boards.gno", REALM))?;

    assert!(out
        .generated
        .text
        .starts_with("// Code generated by example.com/chain. DO NOT EDIT."));
    assert!(out
        .generated
        .text
        .contains("\"example.com/chain/examples/gno.land/r/demo/users\""));
    assert!(out
        .generated
        .text
        .contains("\"example.com/chain/gnovm/stdlibs/stdshim\""));
    Ok(())
}

#[test]
fn test_extra_prefix_allowlist() -> Result<()> {
    let source = "package foo\n\nimport \"example.com/trusted/lib\"\n";

    let mut strict = Precompiler::new(Config::default())?;
    let out = strict.precompile_file(&SourceFile::new("foo.gno", source))?;
    assert_eq!(out.violations.len(), 1);

    let config = Config {
        extra_prefix_allowlist: vec!["example.com/trusted/".to_string()],
        ..Config::default()
    };
    let mut relaxed = Precompiler::new(config)?;
    let out = relaxed.precompile_file(&SourceFile::new("foo.gno", source))?;
    assert!(out.violations.is_empty());
    Ok(())
}

#[test]
fn test_all_violations_reported_together() -> Result<()> {
    let source = "package foo\n\nimport (\n\t\"net/http\"\n\t\"fmt\"\n\t\"os/exec\"\n\t\"gno.land/r/demo/users\"\n)\n";
    let mut precompiler = Precompiler::new(Config::default())?;
    let out = precompiler.precompile_file(&SourceFile::new("foo.gno", source))?;

    match out.into_checked() {
        Err(PrecompileError::WhitelistViolation(list)) => {
            assert_eq!(
                list.to_string(),
                "foo.gno:4:2: import \"net/http\" is not in the whitelist\n\
                 foo.gno:6:2: import \"os/exec\" is not in the whitelist"
            );
        }
        other => panic!("expected whitelist violation, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_build_output_maps_back_to_gno_files() -> Result<()> {
    let parser = RegexDiagnosticParser::new()?;
    let raw = "# github.com/gnolang/gno/examples/gno.land/r/demo/boards\n\
               boards.gno.gen.go:15:9: undefined: users.Resolve\n\
               .boards_test.gno.gen_test.go:4:2: \"fmt\" imported and not used\n";

    match translate(&parser, raw) {
        Err(PrecompileError::Build(list)) => {
            assert_eq!(
                list.to_string(),
                "boards.gno:15:9: undefined: users.Resolve\n\
                 boards_test.gno:4:2: \"fmt\" imported and not used"
            );
        }
        other => panic!("expected build error, got {:?}", other),
    }
    Ok(())
}
