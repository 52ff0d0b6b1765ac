// tests/runtime.rs
use std::{fs, path::PathBuf, thread};

use lanius_yacc::{
    ParseError, ParseTables,
    grammar::load_grammar_json_bytes,
    runtime::{NoActions, Parser, Reduction, TokenQueue},
    tables::{build_tables, load_tables_bin_bytes, load_tables_json_bytes, write_tables_bin},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const NUM: i32 = 57346;
const PLUS: i32 = '+' as i32;
const SEMI: i32 = ';' as i32;

fn fixture(name: &str) -> Vec<u8> {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read(&p).unwrap_or_else(|e| panic!("read {}: {e}", p.display()))
}

fn tables(name: &str) -> ParseTables {
    let g = load_grammar_json_bytes(&fixture(name)).expect("grammar");
    build_tables(&g).expect("tables").1
}

fn sum_actions(rule: usize, r: &mut Reduction<'_, i64>) {
    match rule {
        1 => {
            let v = *r.value(1) + *r.value(3);
            r.set_result(v);
        }
        2 => {
            let v = r.take(1);
            r.set_result(v);
        }
        _ => {}
    }
}

fn on_reduce<V, F: FnMut(usize, &mut Reduction<'_, V>)>(f: F) -> F {
    f
}

fn sum_tokens(src: &str) -> TokenQueue<i64> {
    TokenQueue::new(src.split_whitespace().map(|t| match t {
        "+" => (PLUS, 0),
        n => (NUM, n.parse().expect("number")),
    }))
}

fn parse_sum(t: &ParseTables, src: &str) -> (Result<i64, ParseError>, Vec<String>) {
    let mut lex = sum_tokens(src);
    let res = Parser::new(t).parse(&mut lex, &mut sum_actions);
    (res, lex.errors)
}

#[test]
fn sum_accepts_and_reduces_left_to_right() {
    let t = tables("sum.json");
    let (res, errors) = parse_sum(&t, "1 + 2 + 3");
    assert_eq!(res, Ok(6));
    assert!(errors.is_empty());

    let (res, _) = parse_sum(&t, "42");
    assert_eq!(res, Ok(42));
}

#[test]
fn reduction_order_is_observable() {
    let t = tables("sum.json");
    let mut seen = Vec::new();
    let mut lex = sum_tokens("1 + 2 + 3");
    let mut actions = on_reduce(|rule, r: &mut Reduction<'_, i64>| {
        seen.push(rule);
        sum_actions(rule, r);
    });
    let res = Parser::new(&t).parse(&mut lex, &mut actions);
    assert_eq!(res, Ok(6));
    assert_eq!(seen, vec![2, 2, 1, 2, 1]);
}

#[test]
fn unrecoverable_error_reports_once_with_exact_message() {
    let t = tables("sum.json");
    let (res, errors) = parse_sum(&t, "1 + + 2");
    assert_eq!(res, Err(ParseError::StackExhausted { state: 3 }));
    assert_eq!(errors, vec!["expected number after '+'".to_string()]);
    assert_eq!(ParseError::StackExhausted { state: 3 }.exit_code(), 1);
}

#[test]
fn wildcard_message_applies_when_no_exact_entry() {
    let t = tables("sum.json");
    let (res, errors) = parse_sum(&t, "1 +");
    assert!(matches!(res, Err(ParseError::StackExhausted { .. })));
    assert_eq!(errors, vec!["expected number".to_string()]);

    let (res, errors) = parse_sum(&t, "");
    assert_eq!(res, Err(ParseError::StackExhausted { state: 0 }));
    assert_eq!(errors, vec!["expected expression".to_string()]);
}

#[test]
fn unknown_and_negative_tokens_mean_end_of_input() {
    let t = tables("sum.json");
    let mut lex = TokenQueue::new([(NUM, 7i64), (9999, 0)]);
    assert_eq!(Parser::new(&t).parse(&mut lex, &mut sum_actions), Ok(7));
    assert_eq!(lex.remaining(), 0);

    let mut lex = TokenQueue::new([(NUM, 7i64), (-5, 0), (PLUS, 0)]);
    assert_eq!(Parser::new(&t).parse(&mut lex, &mut sum_actions), Ok(7));
    assert_eq!(lex.remaining(), 1);
}

fn stmt_tokens(src: &str) -> TokenQueue<()> {
    TokenQueue::new(src.split_whitespace().map(|t| match t {
        ";" => (SEMI, ()),
        _ => (NUM, ()),
    }))
}

#[test]
fn error_production_resynchronises() {
    let t = tables("stmts.json");
    let mut lex = stmt_tokens("1 ; 2 3 ; 4 ;");
    let mut reduced = Vec::new();
    let mut actions = on_reduce(|rule, _: &mut Reduction<'_, ()>| reduced.push(rule));
    let res = Parser::new(&t).parse(&mut lex, &mut actions);
    assert_eq!(res, Ok(()));
    assert_eq!(lex.errors, vec!["syntax error".to_string()]);
    assert_eq!(reduced.iter().filter(|&&r| r == 3).count(), 2);
    assert_eq!(reduced.iter().filter(|&&r| r == 4).count(), 1);
    assert_eq!(reduced.iter().filter(|&&r| r == 2).count(), 3);
}

#[test]
fn end_of_input_during_recovery_fails() {
    let t = tables("stmts.json");
    let mut lex = stmt_tokens("1 2");
    let res = Parser::new(&t).parse(&mut lex, &mut NoActions);
    assert_eq!(res, Err(ParseError::EofDuringRecovery { state: 3 }));
    assert_eq!(lex.errors.len(), 1);
}

#[test]
fn second_error_inside_tolerance_window_is_silent() {
    let t = tables("stmts.json");
    // `x ;` recovers; the stray `;` right after is within three shifts.
    let mut lex = stmt_tokens("1 2 ; ; 3 ;");
    let res = Parser::new(&t).parse(&mut lex, &mut NoActions);
    assert_eq!(res, Ok(()));
    assert_eq!(lex.errors.len(), 1);
}

#[test]
fn errok_reenables_reporting_immediately() {
    let t = tables("stmts.json");
    let src = "1 2 ; 3 3 ;";

    let mut lex = stmt_tokens(src);
    assert_eq!(Parser::new(&t).parse(&mut lex, &mut NoActions), Ok(()));
    assert_eq!(lex.errors.len(), 1);

    let mut lex = stmt_tokens(src);
    let mut actions = on_reduce(|rule, r: &mut Reduction<'_, ()>| {
        if rule == 4 {
            r.errok();
        }
    });
    assert_eq!(Parser::new(&t).parse(&mut lex, &mut actions), Ok(()));
    assert_eq!(lex.errors.len(), 2);
}

#[test]
fn random_token_streams_terminate() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let sum = tables("sum.json");
    let stmts = tables("stmts.json");
    let alphabet = [NUM, PLUS, SEMI, 256, 9999, 0];
    for _ in 0..500 {
        let n = rng.random_range(0..24);
        let toks: Vec<i32> = (0..n)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())])
            .collect();

        let mut lex = TokenQueue::new(toks.iter().map(|&t| (t, 1i64)));
        let _ = Parser::new(&sum).with_debug(7).parse(&mut lex, &mut sum_actions);
        assert!(lex.errors.len() <= n + 1);

        let mut lex = TokenQueue::new(toks.iter().map(|&t| (t, ())));
        let _ = Parser::new(&stmts).parse(&mut lex, &mut NoActions);
        assert!(lex.errors.len() <= n + 1);
    }
}

#[test]
fn concurrent_parses_share_tables() {
    let t = tables("sum.json");
    let inputs: Vec<(String, i64)> = (1..=8)
        .map(|k| {
            let terms: Vec<String> = (1..=k).map(|i| i.to_string()).collect();
            (terms.join(" + "), k * (k + 1) / 2)
        })
        .collect();

    thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(src, want)| {
                let t = &t;
                s.spawn(move || {
                    for _ in 0..50 {
                        assert_eq!(parse_sum(t, src).0, Ok(*want));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("parser thread panicked");
        }
    });
}

#[test]
fn persisted_tables_drive_the_same_parse() {
    let t = tables("sum.json");

    let mut bin = Vec::new();
    write_tables_bin(&mut bin, &t).expect("write");
    let from_bin = load_tables_bin_bytes(&bin).expect("load bin");
    assert_eq!(from_bin, t);

    let json = serde_json::to_vec(&t).expect("json");
    let from_json = load_tables_json_bytes(&json).expect("load json");
    assert_eq!(from_json, t);

    for t in [&from_bin, &from_json] {
        let (res, errors) = parse_sum(t, "1 + + 2");
        assert!(res.is_err());
        assert_eq!(errors, vec!["expected number after '+'".to_string()]);
        assert_eq!(parse_sum(t, "10 + 20").0, Ok(30));
    }

    let mut truncated = bin.clone();
    truncated.pop();
    assert!(load_tables_bin_bytes(&truncated).is_err());
    bin.push(0);
    assert!(load_tables_bin_bytes(&bin).is_err());
}

#[test]
fn mid_rule_action_sees_parent_prefix_and_keeps_its_frame() {
    let t = tables("midrule.json");
    let mut windows = Vec::new();
    let mut actions = on_reduce(|rule, r: &mut Reduction<'_, i64>| match rule {
        1 => {
            windows.push((rule, r.len()));
            let v = *r.value(1) * 10;
            r.set_result(v);
        }
        2 => {
            windows.push((rule, r.len()));
            assert_eq!((*r.value(1), *r.value(2), *r.value(3)), (5, 50, 7));
            let v = *r.value(1) + *r.value(2) + *r.value(3);
            r.set_result(v);
        }
        _ => {}
    });
    let mut lex = TokenQueue::new([(57346, 5i64), (57347, 7)]);
    let res = Parser::new(&t).parse(&mut lex, &mut actions);
    assert_eq!(res, Ok(62));
    assert_eq!(windows, vec![(1, 1), (2, 3)]);
}
