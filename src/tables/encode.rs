// src/tables/encode.rs
// Packs per-state actions into offset-shifted unsigned cells.
//
// Raw values: shift target as-is, reduce as -rule, accept/error as 0.
// Stored value = raw - offset, with offset = min(0, min raw) - 1, so every
// real cell is >= 1 and a stored 0 is unambiguously "no action".
use serde::{Deserialize, Serialize};

use super::symbols::Translation;
use crate::{error::GenError, grammar::Grammar};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CellWidth {
    U8,
    U16,
    U32,
}

impl CellWidth {
    pub fn bits(self) -> u32 {
        match self {
            CellWidth::U8 => 8,
            CellWidth::U16 => 16,
            CellWidth::U32 => 32,
        }
    }

    pub fn max_value(self) -> u64 {
        match self {
            CellWidth::U8 => u8::MAX as u64,
            CellWidth::U16 => u16::MAX as u64,
            CellWidth::U32 => u32::MAX as u64,
        }
    }

    /// Narrowest width holding every stored value in `0..=span`.
    pub fn for_span(span: i64) -> Result<Self, GenError> {
        if span < 0 {
            return Err(GenError::WidthOverflow { span });
        }
        [CellWidth::U8, CellWidth::U16, CellWidth::U32]
            .into_iter()
            .find(|w| span as u64 <= w.max_value())
            .ok_or(GenError::WidthOverflow { span })
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(CellWidth::U8),
            16 => Some(CellWidth::U16),
            32 => Some(CellWidth::U32),
            _ => None,
        }
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            CellWidth::U8 => "u8",
            CellWidth::U16 => "u16",
            CellWidth::U32 => "u32",
        }
    }
}

/// Cells at consecutive translated ids starting at `start`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub cells: Vec<u32>,
}

/// One state's row. A new run begins wherever the translated id breaks
/// adjacency with the previous cell; ids outside every run are empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedRow {
    pub runs: Vec<Run>,
}

impl EncodedRow {
    fn from_sorted(cells: &[(usize, u32)]) -> Self {
        let mut runs: Vec<Run> = Vec::new();
        let mut col: Option<usize> = None;
        for &(xsym, v) in cells {
            match runs.last_mut() {
                Some(run) if col.map(|c| c + 1) == Some(xsym) => run.cells.push(v),
                _ => runs.push(Run {
                    start: xsym,
                    cells: vec![v],
                }),
            }
            col = Some(xsym);
        }
        Self { runs }
    }

    /// Stored value at `xsym`; 0 when absent.
    pub fn get(&self, xsym: usize) -> u32 {
        // Runs are sorted by start; find the last run starting at or before xsym.
        let i = self.runs.partition_point(|r| r.start <= xsym);
        if i == 0 {
            return 0;
        }
        let run = &self.runs[i - 1];
        run.cells.get(xsym - run.start).copied().unwrap_or(0)
    }

    /// Length of the dense form: one past the highest stored id.
    pub fn len(&self) -> usize {
        self.runs
            .last()
            .map(|r| r.start + r.cells.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn to_dense(&self) -> Vec<u32> {
        let mut out = vec![0; self.len()];
        for run in &self.runs {
            out[run.start..run.start + run.cells.len()].copy_from_slice(&run.cells);
        }
        out
    }

    /// (translated id, stored value) for every materialized cell.
    pub fn cells(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.runs
            .iter()
            .flat_map(|r| r.cells.iter().enumerate().map(|(i, &v)| (r.start + i, v)))
    }
}

/// A decoded cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Shift(usize),
    Reduce(usize),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Occupied extent summed over rows.
    pub cells: usize,
    /// States times symbols.
    pub dense_cells: usize,
    pub bits: u32,
    pub bytes: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncodedTable {
    pub offset: i64,
    pub width: CellWidth,
    pub rows: Vec<EncodedRow>,
}

impl EncodedTable {
    pub fn encode(g: &Grammar, tr: &Translation) -> Result<Self, GenError> {
        let (mut min, mut max) = (0i64, 0i64);
        for row in &g.table {
            for e in row {
                let raw = e.action.raw();
                min = min.min(raw);
                max = max.max(raw);
            }
        }
        let offset = min - 1;
        let width = CellWidth::for_span(max - offset)?;

        let mut rows = Vec::with_capacity(g.table.len());
        let mut cells: Vec<(usize, u32)> = Vec::new();
        for (state, row) in g.table.iter().enumerate() {
            cells.clear();
            for e in row {
                let xsym = tr.require(g, e.sym)?;
                let raw = e.action.raw();
                let stored = raw - offset;
                if stored == 0 {
                    return Err(GenError::OffsetCollision { state, raw, offset });
                }
                if stored < 0 || stored as u64 > width.max_value() {
                    return Err(GenError::CellOverflow {
                        state,
                        raw,
                        stored,
                        bits: width.bits(),
                    });
                }
                cells.push((xsym, stored as u32));
            }
            cells.sort_unstable();
            if let Some(w) = cells.windows(2).find(|w| w[0].0 == w[1].0) {
                let sym = tr.order()[w[0].0].sym;
                return Err(GenError::DuplicateCell {
                    state,
                    name: g.symbol(sym).name.clone(),
                });
            }
            rows.push(EncodedRow::from_sorted(&cells));
        }

        Ok(Self {
            offset,
            width,
            rows,
        })
    }

    /// Decoded integer for (state, xsym): 0 for an empty cell, otherwise the
    /// stored value with the offset re-added.
    #[inline]
    pub fn lookup(&self, state: usize, xsym: usize) -> i64 {
        match self.rows.get(state).map(|r| r.get(xsym)) {
            Some(v) if v != 0 => v as i64 + self.offset,
            _ => 0,
        }
    }

    pub fn decode(&self, state: usize, xsym: usize) -> Decoded {
        match self.lookup(state, xsym) {
            v if v > 0 => Decoded::Shift(v as usize),
            v if v < 0 => Decoded::Reduce((-v) as usize),
            _ => Decoded::Empty,
        }
    }

    /// Checks every stored value against the selected width.
    pub fn validate(&self) -> Result<(), GenError> {
        for (state, row) in self.rows.iter().enumerate() {
            for (_, v) in row.cells() {
                if v as u64 > self.width.max_value() {
                    return Err(GenError::CellOverflow {
                        state,
                        raw: v as i64 + self.offset,
                        stored: v as i64,
                        bits: self.width.bits(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self, n_syms: usize) -> TableStats {
        let cells: usize = self
            .rows
            .iter()
            .map(|r| r.runs.last().map(|run| run.start + run.cells.len() - 1).unwrap_or(0))
            .sum();
        let bits = self.width.bits();
        TableStats {
            cells,
            dense_cells: self.rows.len() * n_syms,
            bits,
            bytes: cells * bits as usize / 8,
        }
    }
}
