// src/runtime/mod.rs
// Table-driven shift/reduce automaton with yacc-style error recovery.
//
// The tables are only read, so one `ParseTables` can serve any number of
// concurrent parses; each parse owns its stack, lookahead and error state.
use std::{collections::VecDeque, fmt, mem};

use crate::{
    error::ParseError,
    tables::{Decoded, ParseTables},
};

/// Shifts needed after an error before a new one is reported.
const ERR_TOLERANCE: u8 = 3;

/// Caller-supplied token source.
pub trait Lexer<V> {
    /// Returns the next token value and fills `lval` with its payload.
    /// A value <= 0 means end of input.
    fn lex(&mut self, lval: &mut V) -> i32;

    /// Receives one diagnostic per error-recovery episode.
    fn error(&mut self, msg: &str);
}

/// Semantic actions, dispatched by rule index on every reduction.
pub trait Actions<V> {
    fn reduce(&mut self, rule: usize, r: &mut Reduction<'_, V>);
}

impl<V, F> Actions<V> for F
where
    F: FnMut(usize, &mut Reduction<'_, V>),
{
    fn reduce(&mut self, rule: usize, r: &mut Reduction<'_, V>) {
        self(rule, r)
    }
}

/// Reductions without semantic actions; every result is `V::default()`.
pub struct NoActions;

impl<V> Actions<V> for NoActions {
    fn reduce(&mut self, _rule: usize, _r: &mut Reduction<'_, V>) {}
}

#[derive(Debug, Clone)]
pub struct Frame<V> {
    pub state: usize,
    pub value: V,
}

/// View of the frames a reduction's action may address, plus its pending result.
pub struct Reduction<'a, V> {
    rule: usize,
    frames: &'a mut [Frame<V>],
    result: V,
    errok: bool,
}

impl<'a, V> Reduction<'a, V> {
    pub fn rule(&self) -> usize {
        self.rule
    }

    /// Number of addressable components.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `$n`, counted from 1.
    pub fn value(&self, n: usize) -> &V {
        &self.frames[n - 1].value
    }

    pub fn value_mut(&mut self, n: usize) -> &mut V {
        &mut self.frames[n - 1].value
    }

    /// Moves `$n` out, leaving the default in its slot.
    pub fn take(&mut self, n: usize) -> V
    where
        V: Default,
    {
        mem::take(&mut self.frames[n - 1].value)
    }

    /// `$$`
    pub fn result(&self) -> &V {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut V {
        &mut self.result
    }

    pub fn set_result(&mut self, v: V) {
        self.result = v;
    }

    /// Leaves error-recovery mode immediately (`yyerrok`).
    pub fn errok(&mut self) {
        self.errok = true;
    }
}

/// A lexer over a prepared token list; collects reported errors.
#[derive(Debug, Clone, Default)]
pub struct TokenQueue<V> {
    tokens: VecDeque<(i32, V)>,
    pub errors: Vec<String>,
}

impl<V> TokenQueue<V> {
    pub fn new(tokens: impl IntoIterator<Item = (i32, V)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            errors: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

impl<V> Lexer<V> for TokenQueue<V> {
    fn lex(&mut self, lval: &mut V) -> i32 {
        match self.tokens.pop_front() {
            Some((tok, v)) => {
                *lval = v;
                tok
            }
            None => 0,
        }
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeOptions {
    /// Trace verbosity, 0..=7. Observational only.
    pub debug: u8,
}

pub struct Parser<'t> {
    tables: &'t ParseTables,
    opts: RuntimeOptions,
}

impl<'t> Parser<'t> {
    pub fn new(tables: &'t ParseTables) -> Self {
        Self {
            tables,
            opts: RuntimeOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: RuntimeOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn with_debug(mut self, level: u8) -> Self {
        self.opts.debug = level.min(7);
        self
    }

    #[inline]
    fn level(&self, n: u8) -> bool {
        self.opts.debug >= n
    }

    /// Runs the automaton to accept or unrecoverable failure. On accept the
    /// start symbol's payload is returned.
    pub fn parse<V, L, A>(&self, lexer: &mut L, actions: &mut A) -> Result<V, ParseError>
    where
        V: Default + fmt::Debug,
        L: Lexer<V> + ?Sized,
        A: Actions<V> + ?Sized,
    {
        let t = self.tables;
        let mut lval = V::default();
        let mut err_state = 0u8;
        let mut stack: Vec<Frame<V>> = vec![Frame {
            state: 0,
            value: V::default(),
        }];
        let mut lookahead: Option<usize> = None;

        loop {
            let mut sp = stack.len() - 1;
            let mut state = stack[sp].state;
            let la = match lookahead {
                Some(la) => la,
                None => {
                    let la = t.translate(lexer.lex(&mut lval));
                    if self.level(3) {
                        log::trace!("lex {}({})", t.sym_name(la), la);
                    }
                    lookahead = Some(la);
                    la
                }
            };
            if self.level(4) {
                let states: Vec<usize> = stack.iter().map(|f| f.state).collect();
                log::trace!(
                    "state {state}, lookahead {}, states stack {states:?}",
                    t.sym_name(la)
                );
            }
            if self.level(6) {
                log::trace!("\tlval {lval:?}");
            }
            if self.level(7) {
                log::trace!("\tfull stack {stack:?}");
            }

            match t.table.decode(state, la) {
                Decoded::Shift(next) => {
                    stack.push(Frame {
                        state: next,
                        value: mem::take(&mut lval),
                    });
                    err_state = err_state.saturating_sub(1);
                    lookahead = None;
                    if self.level(4) {
                        log::trace!("\tshift, and goto state {next}");
                    }
                }
                Decoded::Reduce(rule) => {
                    let errok = self.reduce(&mut stack, rule, actions)?;
                    if errok {
                        if self.level(2) {
                            log::debug!("\terrok()");
                        }
                        err_state = 0;
                    }
                }
                Decoded::Empty if state == t.accept_state => {
                    return Ok(stack
                        .into_iter()
                        .nth(1)
                        .map(|f| f.value)
                        .unwrap_or_default());
                }
                Decoded::Empty => {
                    if err_state == ERR_TOLERANCE {
                        if self.level(2) {
                            log::debug!("\terror recovery discards {}", t.sym_name(la));
                        }
                        if la == t.end_sym {
                            return Err(ParseError::EofDuringRecovery { state });
                        }
                        lookahead = None;
                        continue;
                    }

                    if err_state == 0 {
                        if self.level(1) {
                            log::debug!(
                                "\tstate {state}, unexpected lookahead {}",
                                t.sym_name(la)
                            );
                        }
                        if self.level(5) {
                            log::trace!(
                                "\terror recovery looking for xerror key {{state {state}, lookahead {}}}",
                                t.sym_name(la)
                            );
                            if t.xerrors.get(state, la as i32).is_none() {
                                log::trace!(
                                    "\terror recovery looking for xerror key {{state {state}, lookahead <nil>}}"
                                );
                            }
                        }
                        lexer.error(t.xerrors.message(state, la));
                    }

                    err_state = ERR_TOLERANCE;
                    let err_at = state;
                    loop {
                        if let Decoded::Shift(next) = t.table.decode(state, t.err_sym) {
                            if self.level(2) {
                                log::debug!("\terror recovery found error shift in state {state}");
                            }
                            stack.push(Frame {
                                state: next,
                                value: V::default(),
                            });
                            break;
                        }
                        if sp == 0 {
                            if self.level(2) {
                                log::debug!("\terror recovery failed");
                            }
                            return Err(ParseError::StackExhausted { state: err_at });
                        }
                        stack.truncate(sp);
                        sp -= 1;
                        state = stack[sp].state;
                        if self.level(2) {
                            log::debug!("\terror recovery pops state {state}");
                        }
                    }
                }
            }
        }
    }

    /// Pops the rule's frames and pushes its result at the goto state.
    /// Returns whether the action asked for `errok`.
    fn reduce<V, A>(
        &self,
        stack: &mut Vec<Frame<V>>,
        rule: usize,
        actions: &mut A,
    ) -> Result<bool, ParseError>
    where
        V: Default,
        A: Actions<V> + ?Sized,
    {
        let t = self.tables;
        let sp = stack.len() - 1;
        let red = t.reductions.get(rule).ok_or(ParseError::BadRule { rule })?;
        let x = red.xsym.ok_or(ParseError::BadRule { rule })?;
        if red.components > sp || red.window > sp {
            return Err(ParseError::BadRule { rule });
        }

        let exposed = stack[sp - red.components].state;
        let goto = match t.table.decode(exposed, x) {
            Decoded::Shift(s) => s,
            _ => {
                return Err(ParseError::MissingGoto {
                    state: exposed,
                    symbol: t.sym_name(x),
                });
            }
        };
        if self.level(4) {
            log::trace!(
                "\treduce rule {rule} ({}), and goto state {goto}",
                t.sym_name(x)
            );
        }

        let mut r = Reduction {
            rule,
            frames: &mut stack[sp + 1 - red.window..],
            result: V::default(),
            errok: false,
        };
        actions.reduce(rule, &mut r);
        let errok = r.errok;
        let result = r.result;

        stack.truncate(sp + 1 - red.components);
        stack.push(Frame {
            state: goto,
            value: result,
        });
        Ok(errok)
    }
}
