// src/main.rs
// Usage: lanius-yacc <grammar.json> [output.rs]
//
// LANIUS_YACC_PREFIX overrides the `yy` name prefix.
// LANIUS_YACC_TABLES also writes the finished tables (`.json` or binary).
use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, Result, bail};
use lanius_yacc::{GenConfig, GenError, generate::write_outputs, grammar::load_grammar_json};

fn config_from_env(output: Option<String>) -> Result<GenConfig> {
    let mut cfg = GenConfig::default();
    if let Ok(prefix) = env::var("LANIUS_YACC_PREFIX") {
        cfg = cfg.with_prefix(prefix).context("LANIUS_YACC_PREFIX")?;
    }
    if let Some(out) = output {
        cfg = cfg.with_output(out);
    }
    let tables = env::var("LANIUS_YACC_TABLES").ok().filter(|s| !s.is_empty());
    Ok(cfg.with_tables_out(tables.map(PathBuf::from)))
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(input) = args.next() else {
        bail!("usage: lanius-yacc <grammar.json> [output.rs]");
    };
    let cfg = config_from_env(args.next())?;

    let g = match load_grammar_json(Path::new(&input)) {
        Ok(g) => g,
        Err(GenError::Malformed(diags)) => {
            for d in &diags {
                eprintln!("{d}");
            }
            process::exit(1);
        }
        Err(e) => return Err(e).with_context(|| format!("loading {input}")),
    };

    let out = lanius_yacc::generate(&g, &cfg)?;
    write_outputs(&out, &cfg)
        .with_context(|| format!("writing {}", cfg.output.display()))?;

    eprintln!("{}", out.stats_line());
    for line in out.conflict_lines() {
        eprintln!("{line}");
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("lanius-yacc: {e:#}");
        process::exit(1);
    }
}
