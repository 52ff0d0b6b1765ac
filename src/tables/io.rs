// src/tables/io.rs
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use super::{
    CellWidth, EncodedRow, EncodedTable, ParseTables, Reduction, ReductionCatalog, Run, XErrorKey,
    XErrorTable,
};

// -------------------- JSON (de)serialization --------------------

pub fn save_tables_json(path: &Path, t: &ParseTables) -> std::io::Result<()> {
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, t)?;
    w.flush()
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<ParseTables, String> {
    let tables = serde_json::from_slice::<ParseTables>(data)
        .map_err(|e| format!("Failed to parse tables JSON: {e}"))?;
    tables.validate()?;
    Ok(tables)
}

// -------------------- Compact binary (cells at the selected width) --------------------
//   magic: 8 bytes = "LYTBL001"
//   u32 x 8: n_syms, n_states, n_rules, n_xerrors, cell bits, end_sym, err_sym, accept_state
//   i64: offset
//   names:      n_syms x (u32 len, utf-8)
//   xlat:       n_syms x (i32 value, u32 xsym)
//   rows:       n_states x (u32 n_runs, n_runs x (u32 start, u32 len, len cells))
//   reductions: n_rules x (u32 xsym | u32::MAX, u32 components, u32 window)
//   xerrors:    n_xerrors x (u32 state, i32 xsym, u32 len, utf-8)

const BIN_MAGIC: &[u8; 8] = b"LYTBL001";
const NO_SYM: u32 = u32::MAX;

fn invalid(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

fn u32_of(v: usize, what: &str) -> std::io::Result<u32> {
    u32::try_from(v).map_err(|_| invalid(format!("{what}={v} exceeds u32::MAX")))
}

fn put_str<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    w.write_all(&u32_of(s.len(), "string length")?.to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn put_cell<W: Write>(w: &mut W, width: CellWidth, v: u32) -> std::io::Result<()> {
    match width {
        CellWidth::U8 => {
            let b = u8::try_from(v).map_err(|_| invalid("cell > u8::MAX"))?;
            w.write_all(&[b])
        }
        CellWidth::U16 => {
            let h = u16::try_from(v).map_err(|_| invalid("cell > u16::MAX"))?;
            w.write_all(&h.to_le_bytes())
        }
        CellWidth::U32 => w.write_all(&v.to_le_bytes()),
    }
}

pub fn write_tables_bin<W: Write>(w: &mut W, t: &ParseTables) -> std::io::Result<()> {
    let width = t.table.width;
    let xerrors: Vec<_> = t.xerrors.iter().collect();

    // Header
    w.write_all(BIN_MAGIC)?;
    for (v, what) in [
        (t.sym_names.len(), "n_syms"),
        (t.table.rows.len(), "n_states"),
        (t.reductions.len(), "n_rules"),
        (xerrors.len(), "n_xerrors"),
        (width.bits() as usize, "bits"),
        (t.end_sym, "end_sym"),
        (t.err_sym, "err_sym"),
        (t.accept_state, "accept_state"),
    ] {
        w.write_all(&u32_of(v, what)?.to_le_bytes())?;
    }
    w.write_all(&t.table.offset.to_le_bytes())?;

    for name in &t.sym_names {
        put_str(w, name)?;
    }

    if t.xlat.len() != t.sym_names.len() {
        return Err(invalid("xlat and symbol names differ in length"));
    }
    for &(value, xsym) in &t.xlat {
        w.write_all(&value.to_le_bytes())?;
        w.write_all(&u32_of(xsym, "xsym")?.to_le_bytes())?;
    }

    for row in &t.table.rows {
        w.write_all(&u32_of(row.runs.len(), "n_runs")?.to_le_bytes())?;
        for run in &row.runs {
            w.write_all(&u32_of(run.start, "run start")?.to_le_bytes())?;
            w.write_all(&u32_of(run.cells.len(), "run length")?.to_le_bytes())?;
            for &v in &run.cells {
                put_cell(w, width, v)?;
            }
        }
    }

    for r in t.reductions.iter() {
        let xsym = match r.xsym {
            Some(x) => u32_of(x, "reduction xsym")?,
            None => NO_SYM,
        };
        w.write_all(&xsym.to_le_bytes())?;
        w.write_all(&u32_of(r.components, "components")?.to_le_bytes())?;
        w.write_all(&u32_of(r.window, "window")?.to_le_bytes())?;
    }

    for (key, msg) in xerrors {
        w.write_all(&u32_of(key.state, "xerror state")?.to_le_bytes())?;
        w.write_all(&key.xsym.to_le_bytes())?;
        put_str(w, msg)?;
    }
    Ok(())
}

pub fn save_tables_bin(path: &Path, t: &ParseTables) -> std::io::Result<()> {
    let instant = Instant::now();
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    write_tables_bin(&mut w, t)?;
    let flush = w.flush();
    log::info!(
        "Saved tables to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

#[inline]
fn take<'a>(buf: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8], String> {
    if buf.len() < n {
        return Err(format!("truncated {what}"));
    }
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

#[inline]
fn take_u32(buf: &mut &[u8]) -> Result<u32, String> {
    let mut le = [0u8; 4];
    le.copy_from_slice(take(buf, 4, "u32")?);
    Ok(u32::from_le_bytes(le))
}

#[inline]
fn take_i32(buf: &mut &[u8]) -> Result<i32, String> {
    take_u32(buf).map(|v| v as i32)
}

fn take_str(buf: &mut &[u8]) -> Result<String, String> {
    let len = take_u32(buf)? as usize;
    let bytes = take(buf, len, "string")?;
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("bad utf-8 in string: {e}"))
}

/// Rejects a record count the remaining input cannot hold before anything is
/// allocated for it.
fn bounded(buf: &[u8], n: u32, min_size: usize, what: &str) -> Result<usize, String> {
    let n = n as usize;
    if n.saturating_mul(min_size) > buf.len() {
        return Err(format!(
            "{what}={n} needs at least {} bytes, {} remain",
            n.saturating_mul(min_size),
            buf.len()
        ));
    }
    Ok(n)
}

fn take_cell(buf: &mut &[u8], width: CellWidth) -> Result<u32, String> {
    Ok(match width {
        CellWidth::U8 => take(buf, 1, "u8 cell")?[0] as u32,
        CellWidth::U16 => {
            let mut le = [0u8; 2];
            le.copy_from_slice(take(buf, 2, "u16 cell")?);
            u16::from_le_bytes(le) as u32
        }
        CellWidth::U32 => take_u32(buf)?,
    })
}

pub fn load_tables_bin_bytes(mut data: &[u8]) -> Result<ParseTables, String> {
    if data.len() < BIN_MAGIC.len() {
        return Err("bin too short".into());
    }
    if take(&mut data, 8, "magic")? != BIN_MAGIC {
        return Err("bad magic in parse tables .bin".into());
    }

    let n_syms = take_u32(&mut data)?;
    let n_states = take_u32(&mut data)?;
    let n_rules = take_u32(&mut data)?;
    let n_xerrors = take_u32(&mut data)?;
    let bits = take_u32(&mut data)?;
    let width = CellWidth::from_bits(bits).ok_or_else(|| format!("bad cell width {bits}"))?;
    let end_sym = take_u32(&mut data)? as usize;
    let err_sym = take_u32(&mut data)? as usize;
    let accept_state = take_u32(&mut data)? as usize;
    let mut le = [0u8; 8];
    le.copy_from_slice(take(&mut data, 8, "offset")?);
    let offset = i64::from_le_bytes(le);

    // Minimum record sizes: name + xlat pair, run count, reduction, xerror.
    let n_syms = bounded(data, n_syms, 4 + 8, "n_syms")?;
    let n_states = bounded(data, n_states, 4, "n_states")?;
    let n_rules = bounded(data, n_rules, 12, "n_rules")?;
    let n_xerrors = bounded(data, n_xerrors, 12, "n_xerrors")?;

    let mut sym_names = Vec::with_capacity(n_syms);
    for _ in 0..n_syms {
        sym_names.push(take_str(&mut data)?);
    }

    let mut xlat = Vec::with_capacity(n_syms);
    for _ in 0..n_syms {
        let value = take_i32(&mut data)?;
        let xsym = take_u32(&mut data)? as usize;
        xlat.push((value, xsym));
    }

    let mut rows = Vec::with_capacity(n_states);
    for _ in 0..n_states {
        let n_runs = take_u32(&mut data)?;
        let n_runs = bounded(data, n_runs, 8, "n_runs")?;
        let mut runs = Vec::with_capacity(n_runs);
        for _ in 0..n_runs {
            let start = take_u32(&mut data)? as usize;
            let len = take_u32(&mut data)?;
            let len = bounded(data, len, width.bits() as usize / 8, "run length")?;
            let mut cells = Vec::with_capacity(len);
            for _ in 0..len {
                cells.push(take_cell(&mut data, width)?);
            }
            runs.push(Run { start, cells });
        }
        rows.push(EncodedRow { runs });
    }

    let mut reductions = Vec::with_capacity(n_rules);
    for _ in 0..n_rules {
        let xsym = take_u32(&mut data)?;
        let components = take_u32(&mut data)? as usize;
        let window = take_u32(&mut data)? as usize;
        reductions.push(Reduction {
            xsym: (xsym != NO_SYM).then_some(xsym as usize),
            components,
            window,
        });
    }

    let mut xerrors = Vec::with_capacity(n_xerrors);
    for _ in 0..n_xerrors {
        let state = take_u32(&mut data)? as usize;
        let xsym = take_i32(&mut data)?;
        let msg = take_str(&mut data)?;
        xerrors.push((XErrorKey { state, xsym }, msg));
    }

    if !data.is_empty() {
        return Err(format!("{} trailing bytes after parse tables", data.len()));
    }

    let tables = ParseTables {
        sym_names,
        xlat,
        table: EncodedTable {
            offset,
            width,
            rows,
        },
        reductions: ReductionCatalog::from_iter(reductions),
        xerrors: XErrorTable::from_iter(xerrors),
        end_sym,
        err_sym,
        accept_state,
    };
    tables.validate()?;
    Ok(tables)
}
