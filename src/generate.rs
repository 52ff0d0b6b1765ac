// src/generate.rs
// Grammar in, parser source and tables out.
use std::{fs, path::Path};

use crate::{
    actions::stitch_actions,
    config::GenConfig,
    emit::{Backend, ParserModule, RustBackend},
    error::GenError,
    grammar::{Grammar, load_grammar_json_bytes},
    tables::{ParseTables, TableStats, build_tables, save_tables_bin, save_tables_json},
};

#[derive(Debug, Clone)]
pub struct Generated {
    pub source: String,
    pub tables: ParseTables,
    pub stats: TableStats,
    pub conflicts_sr: usize,
    pub conflicts_rr: usize,
}

impl Generated {
    /// The summary line printed after generation.
    pub fn stats_line(&self) -> String {
        format!(
            "Parse table has {} cells (of {}), x {} bits == {} bytes",
            self.stats.cells, self.stats.dense_cells, self.stats.bits, self.stats.bytes
        )
    }

    pub fn conflict_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.conflicts_sr != 0 {
            out.push(format!("conflicts: {} shift/reduce", self.conflicts_sr));
        }
        if self.conflicts_rr != 0 {
            out.push(format!("conflicts: {} reduce/reduce", self.conflicts_rr));
        }
        out
    }
}

pub fn generate(g: &Grammar, cfg: &GenConfig) -> Result<Generated, GenError> {
    let (tr, tables) = build_tables(g)?;
    let actions = stitch_actions(g)?;
    log::debug!("{} action bodies", actions.len());

    let module = ParserModule::lower(g, &tr, &tables, actions);
    let source = RustBackend::new(cfg).render(&module);
    let stats = tables.stats();

    Ok(Generated {
        source,
        tables,
        stats,
        conflicts_sr: g.conflicts_sr,
        conflicts_rr: g.conflicts_rr,
    })
}

pub fn generate_from_json(data: &[u8], cfg: &GenConfig) -> Result<Generated, GenError> {
    let g = load_grammar_json_bytes(data)?;
    generate(&g, cfg)
}

/// Writes the generated source to `cfg.output` and, when configured, the tables.
pub fn write_outputs(out: &Generated, cfg: &GenConfig) -> Result<(), GenError> {
    fs::write(&cfg.output, &out.source)?;
    log::info!("wrote {}", cfg.output.display());
    if let Some(path) = &cfg.tables_out {
        save_tables(path, &out.tables)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

/// `.json` selects JSON, anything else the binary format.
pub fn save_tables(path: &Path, tables: &ParseTables) -> Result<(), GenError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        save_tables_json(path, tables)?;
    } else {
        save_tables_bin(path, tables)?;
    }
    Ok(())
}

pub fn load_tables(path: &Path) -> Result<ParseTables, GenError> {
    let data = fs::read(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let tables = if is_json {
        crate::tables::load_tables_json_bytes(&data)
    } else {
        crate::tables::load_tables_bin_bytes(&data)
    };
    tables.map_err(GenError::Format)
}
