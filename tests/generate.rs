// tests/generate.rs
use std::{fs, path::PathBuf};

use lanius_yacc::{
    GenConfig, GenError,
    generate::{generate_from_json, load_tables, save_tables, write_outputs},
    tables::CellWidth,
};

fn fixture(name: &str) -> Vec<u8> {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read(&p).unwrap_or_else(|e| panic!("read {}: {e}", p.display()))
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lanius-yacc-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir");
    dir.join(name)
}

#[test]
fn sum_grammar_emits_a_complete_module() {
    let out = generate_from_json(&fixture("sum.json"), &GenConfig::default()).expect("generate");
    let src = &out.source;

    assert!(src.starts_with("// Code generated by lanius-yacc. DO NOT EDIT.\n#![allow(dead_code)]\n//! Sums of numbers.\nuse ::std::sync::atomic::"));
    assert!(src.contains("pub struct YySymType {\n    pub yys: usize,\n    pub num: i64,\n}"));
    assert!(src.contains("pub const NUM: i32 = 57346;"));
    assert!(!src.contains("pub const error"));
    assert!(src.contains("pub const YY_TAB_OFS: i64 = -3;"));
    assert!(src.contains("pub const YY_EOF: usize = 0;"));
    assert!(src.contains("const YY_ERROR: usize = 4;"));
    assert!(src.contains("static YY_PARSE_TAB: [&[u8]; 5] = ["));
    assert!(src.contains("pub fn yy_parse<L: YyLexer + ?Sized>(yylex: &mut L) -> i32"));
    assert!(src.contains("rval.num = stack[sp - 2].num + stack[sp].num;"));
    assert!(src.contains("rval.num = ::std::mem::take(&mut stack[sp].num);"));
    assert!(src.contains("((3, 1), \"expected number after '+'\")"));
    assert!(src.contains("((3, -1), \"expected number\")"));
    assert!(src.trim_end().ends_with("// end of sum grammar"));

    assert_eq!(out.tables.table.width, CellWidth::U8);
    assert_eq!(out.tables.sym_names, vec!["$end", "'+'", "expr", "NUM", "error"]);
    assert!(out.conflict_lines().is_empty());
}

#[test]
fn generation_is_deterministic() {
    let a = generate_from_json(&fixture("sum.json"), &GenConfig::default()).expect("a");
    let b = generate_from_json(&fixture("sum.json"), &GenConfig::default()).expect("b");
    assert_eq!(a.source, b.source);
    assert_eq!(a.tables, b.tables);
}

#[test]
fn prefix_renames_generated_items() {
    let cfg = GenConfig::default().with_prefix("calc").expect("prefix");
    let out = generate_from_json(&fixture("sum.json"), &cfg).expect("generate");
    assert!(out.source.contains("pub struct CalcSymType {"));
    assert!(out.source.contains("pub const CALC_EOF: usize"));
    assert!(out.source.contains("pub fn calc_parse<L: CalcLexer + ?Sized>"));
    assert!(!out.source.contains("YySymType"));
}

#[test]
fn stats_and_conflicts_are_reported() {
    let out = generate_from_json(&fixture("stmts.json"), &GenConfig::default()).expect("generate");
    assert_eq!(out.conflict_lines(), vec!["conflicts: 1 shift/reduce".to_string()]);
    let line = out.stats_line();
    assert!(line.starts_with("Parse table has "));
    assert!(line.ends_with(" bytes"));
    assert_eq!(out.stats.dense_cells, 7 * out.tables.sym_names.len());
}

#[test]
fn malformed_grammar_surfaces_diagnostics() {
    let src = br#"{
        "diagnostics": [
            {"file": "calc.y", "line": 4, "col": 1, "msg": "undefined symbol expr"},
            {"file": "calc.y", "line": 9, "col": 3, "msg": "missing ';'"}
        ],
        "symbols": []
    }"#;
    match generate_from_json(src, &GenConfig::default()) {
        Err(GenError::Malformed(diags)) => {
            let lines: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
            assert_eq!(
                lines,
                vec!["calc.y:4:1: undefined symbol expr", "calc.y:9:3: missing ';'"]
            );
        }
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

#[test]
fn outputs_and_tables_are_written() {
    let out_rs = scratch("sum.rs");
    let bin = scratch("sum.tbl");
    let json = scratch("sum.json");

    let cfg = GenConfig::default()
        .with_output(&out_rs)
        .with_tables_out(Some(bin.clone()));
    let out = generate_from_json(&fixture("sum.json"), &cfg).expect("generate");
    write_outputs(&out, &cfg).expect("write");

    assert_eq!(fs::read_to_string(&out_rs).expect("source"), out.source);
    assert_eq!(load_tables(&bin).expect("bin tables"), out.tables);

    save_tables(&json, &out.tables).expect("json");
    assert_eq!(load_tables(&json).expect("json tables"), out.tables);

    fs::write(&bin, b"not a table").expect("overwrite");
    assert!(matches!(load_tables(&bin), Err(GenError::Format(_))));
}

#[test]
fn grammar_loads_from_path() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/midrule.json");
    let g = lanius_yacc::grammar::load_grammar_json(&path).expect("load");
    assert_eq!(g.rules.len(), 3);
    assert_eq!(g.rules[1].parent, Some(2));

    let out = lanius_yacc::generate(&g, &GenConfig::default()).expect("generate");
    assert!(out.source.contains("rval.num = stack[sp].num * 10;"));
    assert!(out.source.contains("rval.num = stack[sp - 2].num + stack[sp - 1].num + stack[sp].num;"));

    let missing = lanius_yacc::grammar::load_grammar_json(&path.with_file_name("absent.json"));
    assert!(matches!(missing, Err(GenError::Io(_))));
}
