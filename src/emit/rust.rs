// src/emit/rust.rs
// Renders a `ParserModule` as a self-contained Rust source file.
use super::{Backend, ir::ParserModule};
use crate::{
    actions::{ActionBody, Fragment},
    config::GenConfig,
    tables::WILDCARD,
};

/// Item names derived from the configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Names {
    /// `Yy`: types and traits.
    pub ty: String,
    /// `YY`: constants and statics.
    pub up: String,
    /// `yy`: functions and macros.
    pub low: String,
}

impl Names {
    pub fn new(prefix: &str) -> Self {
        let low = prefix.to_ascii_lowercase();
        let mut ty = String::with_capacity(low.len());
        let mut chars = low.chars();
        if let Some(c) = chars.next() {
            ty.push(c.to_ascii_uppercase());
        }
        ty.extend(chars);
        Self {
            up: prefix.to_ascii_uppercase(),
            ty,
            low,
        }
    }
}

pub struct RustBackend {
    names: Names,
}

impl RustBackend {
    pub fn new(cfg: &GenConfig) -> Self {
        Self {
            names: Names::new(&cfg.prefix),
        }
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    fn source_prologue(&self, m: &ParserModule) -> Vec<String> {
        let inj = format!(
            "use ::std::sync::atomic::{{AtomicU8 as __{0}AtomicU8, Ordering as __{0}Ordering}};",
            self.names.ty
        );
        vec![
            "// Code generated by lanius-yacc. DO NOT EDIT.".to_string(),
            inject_use(&m.prologue, &inj),
        ]
    }

    fn source_sym_type(&self, m: &ParserModule) -> Vec<String> {
        let mut src = vec![
            "#[derive(Default, Clone, Debug)]".to_string(),
            format!("pub struct {}SymType {{", self.names.ty),
            "    pub yys: usize,".to_string(),
        ];
        for line in m.union_src.lines().map(str::trim).filter(|l| !l.is_empty()) {
            src.push(format!("    {line}"));
        }
        src.push("}".to_string());
        src
    }

    fn source_constants(&self, m: &ParserModule) -> Vec<String> {
        let up = &self.names.up;
        let mut src = Vec::new();
        for t in &m.tokens {
            if t.is_default {
                src.push(format!("pub const {up}_DEFAULT: i32 = {};", t.value));
            } else {
                src.push("#[allow(non_upper_case_globals)]".to_string());
                src.push(format!("pub const {}: i32 = {};", t.name, t.value));
            }
        }
        src.push(String::new());
        src.push(format!("pub const {up}_TAB_OFS: i64 = {};", m.tab_ofs));
        src.push(format!("pub const {up}_EOF: usize = {};", m.eof));
        src.push(format!("const {up}_ERROR: usize = {};", m.err_sym));
        src.push(format!("const {up}_ACCEPT: usize = {};", m.accept_state));
        src
    }

    fn source_tables(&self, m: &ParserModule) -> Vec<String> {
        let up = &self.names.up;
        let mut src = Vec::new();

        src.push("// Lexer token value -> translated symbol, sorted by token value.".to_string());
        src.push(format!("static {up}_XLAT: [(i32, usize); {}] = [", m.xlat.len()));
        for x in &m.xlat {
            src.push(format!(
                "    ({:6}, {:3}), // {} ({}x)",
                x.value, x.xsym, x.name, x.used
            ));
        }
        src.push("];".to_string());
        src.push(String::new());

        src.push(format!("pub static {up}_SYM_NAMES: [&str; {}] = [", m.sym_names.len()));
        for name in &m.sym_names {
            src.push(format!("    {name:?},"));
        }
        src.push("];".to_string());
        src.push(String::new());

        src.push("// Rule -> (result symbol, frames popped).".to_string());
        src.push(format!(
            "static {up}_REDUCTIONS: [(usize, usize); {}] = [",
            m.reductions.len()
        ));
        for (r, red) in m.reductions.iter().enumerate() {
            let xsym = match red.xsym {
                Some(x) => x.to_string(),
                None => "usize::MAX".to_string(),
            };
            src.push(format!("    ({xsym}, {}), // {r}", red.components));
        }
        src.push("];".to_string());
        src.push(String::new());

        src.push(format!(
            "static {up}_XERRORS: [((usize, i32), &str); {}] = [",
            m.xerrors.len()
        ));
        for (key, msg) in &m.xerrors {
            src.push(format!("    (({}, {}), {msg:?}),", key.state, key.xsym));
        }
        src.push("];".to_string());
        src.push(String::new());

        let cell = m.table.width.rust_type();
        src.push(format!(
            "static {up}_PARSE_TAB: [&[{cell}]; {}] = [",
            m.table.rows.len()
        ));
        for (si, row) in m.table.rows.iter().enumerate() {
            if si % 5 == 0 {
                src.push(format!("    // {si}"));
            }
            let cells: Vec<String> = row.to_dense().iter().map(|v| v.to_string()).collect();
            src.push(format!("    &[{}],", cells.join(", ")));
        }
        src.push("];".to_string());
        src
    }

    fn source_actions(&self, m: &ParserModule) -> String {
        let mut out = String::new();
        for a in &m.actions {
            out.push_str(&format!("            {} => {{\n", a.rule));
            match &a.body {
                ActionBody::CopyThrough { field, depth, from } => {
                    out.push_str(&format!(
                        "                rval.{field} = ::std::mem::take(&mut {}.{from});\n",
                        stack_slot(*depth)
                    ));
                }
                ActionBody::Code(frags) => {
                    let mut line = String::from("                ");
                    for f in frags {
                        match f {
                            Fragment::Text(t) => line.push_str(t),
                            Fragment::Result { field } => {
                                line.push_str("rval.");
                                line.push_str(field);
                            }
                            Fragment::Stack { depth, field } => {
                                line.push_str(&stack_slot(*depth));
                                line.push('.');
                                line.push_str(field);
                            }
                        }
                    }
                    out.push_str(line.trim_end());
                    out.push('\n');
                }
            }
            out.push_str("            }\n");
        }
        out
    }

    fn source_runtime(&self, m: &ParserModule) -> String {
        RUNTIME
            .replace("@ACTIONS@\n", &self.source_actions(m))
            .replace("@WILDCARD@", &WILDCARD.to_string())
            .replace("@Ty@", &self.names.ty)
            .replace("@UP@", &self.names.up)
            .replace("@low@", &self.names.low)
    }
}

impl Backend for RustBackend {
    fn render(&self, m: &ParserModule) -> String {
        let parts = vec![
            self.source_prologue(m),
            self.source_sym_type(m),
            self.source_constants(m),
            self.source_tables(m),
        ];
        let mut source = String::new();
        for part in parts {
            for line in part {
                source.push_str(&line);
                source.push('\n');
            }
            source.push('\n');
        }
        source.push_str(&self.source_runtime(m));
        if !m.tail.is_empty() {
            source.push('\n');
            source.push_str(&m.tail);
            if !m.tail.ends_with('\n') {
                source.push('\n');
            }
        }
        source
    }
}

fn stack_slot(depth: usize) -> String {
    match depth {
        0 => "stack[sp]".to_string(),
        d => format!("stack[sp - {d}]"),
    }
}

/// Places `line` after the prologue's leading inner attributes and inner doc
/// comments, which must stay first in a Rust source file.
pub fn inject_use(prologue: &str, line: &str) -> String {
    let lines: Vec<&str> = prologue.lines().collect();
    let mut insert_at = 0;
    let mut i = 0;
    while i < lines.len() {
        let t = lines[i].trim_start();
        if t.starts_with("#![") {
            // Attributes may span lines; consume until the brackets balance.
            let mut depth = 0i32;
            loop {
                for c in lines[i].chars() {
                    match c {
                        '[' => depth += 1,
                        ']' => depth -= 1,
                        _ => {}
                    }
                }
                if depth <= 0 || i + 1 >= lines.len() {
                    break;
                }
                i += 1;
            }
            insert_at = i + 1;
        } else if t.starts_with("//!") {
            insert_at = i + 1;
        } else if !(t.is_empty() || t.starts_with("//")) {
            break;
        }
        i += 1;
    }

    let mut out = String::with_capacity(prologue.len() + line.len() + 2);
    for l in &lines[..insert_at] {
        out.push_str(l);
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    for l in &lines[insert_at..] {
        out.push_str(l);
        out.push('\n');
    }
    out
}

const RUNTIME: &str = r#"pub static @UP@_DEBUG: __@Ty@AtomicU8 = __@Ty@AtomicU8::new(0);

#[inline]
fn @low@_debug() -> u8 {
    @UP@_DEBUG.load(__@Ty@Ordering::Relaxed)
}

pub trait @Ty@Lexer {
    fn lex(&mut self, lval: &mut @Ty@SymType) -> i32;
    fn error(&mut self, msg: &str);
}

pub fn @low@_sym_name(c: usize) -> String {
    match @UP@_SYM_NAMES.get(c) {
        Some(name) => name.to_string(),
        None => match u32::try_from(c).ok().and_then(char::from_u32) {
            Some(ch) => format!("{:?}", ch),
            None => c.to_string(),
        },
    }
}

fn @low@_lex1<L: @Ty@Lexer + ?Sized>(lex: &mut L, lval: &mut @Ty@SymType) -> usize {
    let n = lex.lex(lval);
    let c = if n <= 0 {
        @UP@_EOF
    } else {
        match @UP@_XLAT.binary_search_by_key(&n, |&(v, _)| v) {
            Ok(i) => @UP@_XLAT[i].1,
            Err(_) => @UP@_EOF,
        }
    };
    if @low@_debug() >= 3 {
        eprintln!("\nlex {}({})\n", @low@_sym_name(c), c);
    }
    c
}

#[inline]
fn @low@_cell(state: usize, sym: usize) -> i64 {
    match @UP@_PARSE_TAB[state].get(sym) {
        Some(&v) if v != 0 => v as i64 + @UP@_TAB_OFS,
        _ => 0,
    }
}

fn @low@_xerror(state: usize, xsym: i32) -> Option<&'static str> {
    @UP@_XERRORS
        .binary_search_by_key(&(state, xsym), |&(k, _)| k)
        .ok()
        .map(|i| @UP@_XERRORS[i].1)
}

/// Parses the token stream produced by `yylex`. Returns 0 on accept and 1 when
/// error recovery could not resynchronise.
#[allow(unused_mut, unused_variables, unused_macros, clippy::all)]
pub fn @low@_parse<L: @Ty@Lexer + ?Sized>(yylex: &mut L) -> i32 {
    let mut lval = @Ty@SymType::default();
    let mut err_state = 0u8;
    macro_rules! @low@_errok {
        () => {{
            if @low@_debug() >= 2 {
                eprintln!("\t@low@_errok()\n");
            }
            err_state = 0;
        }};
    }
    let mut stack: Vec<@Ty@SymType> = vec![@Ty@SymType::default()];
    let mut lookahead: Option<usize> = None;
    loop {
        let mut sp = stack.len() - 1;
        let mut state = stack[sp].yys;
        let la = match lookahead {
            Some(la) => la,
            None => {
                let la = @low@_lex1(yylex, &mut lval);
                lookahead = Some(la);
                la
            }
        };
        if @low@_debug() >= 4 {
            let states: Vec<usize> = stack.iter().map(|f| f.yys).collect();
            eprintln!("state {}, lookahead {}, states stack {:?}", state, @low@_sym_name(la), states);
        }
        if @low@_debug() >= 6 {
            eprintln!("\tlval {:?}", lval);
        }
        if @low@_debug() >= 7 {
            eprintln!("\tfull stack {:?}", stack);
        }

        let arg = @low@_cell(state, la);
        if arg > 0 {
            // shift
            lval.yys = arg as usize;
            stack.push(::std::mem::take(&mut lval));
            if err_state > 0 {
                err_state -= 1;
            }
            lookahead = None;
            if @low@_debug() >= 4 {
                eprintln!("\tshift, and goto state {}", arg);
            }
            continue;
        }

        if arg == 0 {
            if state == @UP@_ACCEPT {
                return 0;
            }
            if err_state == 3 {
                if @low@_debug() >= 2 {
                    eprintln!("\terror recovery discards {}", @low@_sym_name(la));
                }
                if la == @UP@_EOF {
                    return 1;
                }
                lookahead = None;
                continue;
            }
            if err_state == 0 {
                if @low@_debug() >= 1 {
                    eprintln!("\tstate {}, unexpected lookahead {}", state, @low@_sym_name(la));
                }
                if @low@_debug() >= 5 {
                    eprintln!("\terror recovery looking for xerror key {{state {}, lookahead {}}}", state, @low@_sym_name(la));
                }
                let mut msg = @low@_xerror(state, la as i32);
                if msg.is_none() {
                    if @low@_debug() >= 5 {
                        eprintln!("\terror recovery looking for xerror key {{state {}, lookahead <nil>}}", state);
                    }
                    msg = @low@_xerror(state, @WILDCARD@);
                }
                yylex.error(msg.unwrap_or("syntax error"));
            }
            err_state = 3;
            loop {
                let arg = @low@_cell(state, @UP@_ERROR);
                if arg > 0 {
                    if @low@_debug() >= 2 {
                        eprintln!("\terror recovery found error shift in state {}\n", state);
                    }
                    stack.push(@Ty@SymType { yys: arg as usize, ..Default::default() });
                    break;
                }
                if sp == 0 {
                    if @low@_debug() >= 2 {
                        eprintln!("\terror recovery failed\n");
                    }
                    return 1;
                }
                stack.truncate(sp);
                sp -= 1;
                state = stack[sp].yys;
                if @low@_debug() >= 2 {
                    eprintln!("\terror recovery pops state {}", state);
                }
            }
            continue;
        }

        // reduce
        let r = (-arg) as usize;
        let (x, n) = @UP@_REDUCTIONS[r];
        let goto = @low@_cell(stack[sp - n].yys, x);
        assert!(goto > 0, "internal error: state {} has no goto on {}", stack[sp - n].yys, @low@_sym_name(x));
        let mut rval = @Ty@SymType::default();
        rval.yys = goto as usize;
        if @low@_debug() >= 4 {
            eprintln!("\treduce rule {} ({}), and goto state {}", r, @low@_sym_name(x), rval.yys);
        }
        match r {
@ACTIONS@
            _ => {}
        }
        stack.truncate(sp + 1 - n);
        stack.push(rval);
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_rust_casing() {
        let n = Names::new("calc");
        assert_eq!((n.ty.as_str(), n.up.as_str(), n.low.as_str()), ("Calc", "CALC", "calc"));
    }

    #[test]
    fn use_line_goes_after_inner_attributes_and_docs() {
        let prologue = "//! Calculator.\n#![allow(\n    dead_code\n)]\n\nuse std::fmt;\n";
        let out = inject_use(prologue, "use x;");
        assert_eq!(
            out,
            "//! Calculator.\n#![allow(\n    dead_code\n)]\nuse x;\n\nuse std::fmt;\n"
        );
    }

    #[test]
    fn use_line_leads_a_plain_prologue() {
        assert_eq!(inject_use("use std::fmt;", "use x;"), "use x;\nuse std::fmt;\n");
        assert_eq!(inject_use("", "use x;"), "use x;\n");
    }
}
