//! kana-split: segment kana input and build the data files the splitter
//! reads.
//!
//! ```bash
//! kana-split build-dict --input words.json --out dict.bincode
//! kana-split build-table --input trans.txt --out model/trans_info.tbl
//! kana-split build-idioms --input idioms.txt --out-dir model
//! kana-split split --dict dict.bincode --model model きょうはいいてんき
//! ```

mod convert_dict;
mod convert_table;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use libkana_core::model::{
    EXPAND_PAIRS_FILE, FULL_IDIOMS_BINCODE_FILE, FULL_IDIOMS_FST_FILE, IDIOMS_BINCODE_FILE,
    IDIOMS_FST_FILE,
};
use libkana_core::{Config, Direction, MemoryDictionary, SplitterContext, SplitterModel};

#[derive(Parser)]
#[command(name = "kana-split")]
#[command(about = "Bunsetsu segmentation for kana input")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter, e.g. `debug` or `libkana_core=trace`
    #[arg(long, global = true, default_value = "warn")]
    log: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment one or more inputs
    Split {
        /// Dictionary written by `build-dict`
        #[arg(long)]
        dict: PathBuf,
        /// Directory holding the feature tables and idiom files
        #[arg(long)]
        model: Option<PathBuf>,
        /// TOML configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Process the input right to left
        #[arg(long)]
        reverse: bool,
        /// Pin a border while segmenting
        #[arg(long)]
        pin: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        inputs: Vec<String>,
    },
    /// Compile a JSON word list into a bincode dictionary
    BuildDict {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compile a text feature table into a table blob
    BuildTable {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compile learned idioms (`reading<TAB>len:text ...`)
    BuildIdioms {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        /// Write the whole-sentence table instead
        #[arg(long)]
        full: bool,
    },
    /// Compile expand pairs (`key<TAB>reading`)
    BuildPairs {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct SegmentOut {
    from: usize,
    len: usize,
    text: String,
    class: String,
    candidates: usize,
}

fn split(
    dict: PathBuf,
    model: Option<PathBuf>,
    config: Option<PathBuf>,
    reverse: bool,
    pin: Option<usize>,
    json: bool,
    inputs: Vec<String>,
) -> Result<()> {
    let dictionary =
        MemoryDictionary::load_bincode(&dict).map_err(|e| anyhow!("{}: {}", dict.display(), e))?;
    let model = match model {
        Some(dir) => SplitterModel::load_dir(dir)?,
        None => SplitterModel::new(),
    }
    .into_shared();
    let config = match config {
        Some(path) => Config::load_toml(&path).map_err(|e| anyhow!("{}: {}", path.display(), e))?,
        None => Config::default(),
    };
    let direction = if reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    };

    for input in inputs {
        let mut ctx =
            SplitterContext::new(model.clone(), &dictionary, &input, direction, config.clone())?;
        let len = ctx.char_count();
        ctx.mark_border(0, pin, len)?;

        let segments: Vec<SegmentOut> = ctx
            .segments()
            .into_iter()
            .map(|s| SegmentOut {
                from: s.from,
                len: s.len,
                text: ctx.text(s.from, s.len),
                class: s.seg_class.name().to_string(),
                candidates: ctx.metaword_count(s.from, s.len),
            })
            .collect();

        if json {
            println!("{}", serde_json::to_string(&segments)?);
        } else {
            let line: Vec<String> = segments
                .iter()
                .map(|s| format!("{}({})", s.text, s.class))
                .collect();
            println!("{}", line.join("|"));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Split {
            dict,
            model,
            config,
            reverse,
            pin,
            json,
            inputs,
        } => split(dict, model, config, reverse, pin, json, inputs)?,
        Commands::BuildDict { input, out } => {
            let dict = convert_dict::build_dictionary(&input)?;
            dict.save_bincode(&out)
                .map_err(|e| anyhow!("{}: {}", out.display(), e))?;
            println!("Wrote {} readings to {}", dict.len(), out.display());
        }
        Commands::BuildTable { input, out } => {
            let lines = convert_table::run(&input, &out)?;
            println!("Wrote {} lines to {}", lines, out.display());
        }
        Commands::BuildIdioms { input, out_dir, full } => {
            let table = convert_dict::build_idioms(&input)?;
            let (fst_name, bin_name) = if full {
                (FULL_IDIOMS_FST_FILE, FULL_IDIOMS_BINCODE_FILE)
            } else {
                (IDIOMS_FST_FILE, IDIOMS_BINCODE_FILE)
            };
            std::fs::create_dir_all(&out_dir)?;
            table.save(out_dir.join(fst_name), out_dir.join(bin_name))?;
            println!("Wrote {} idioms to {}", table.len(), out_dir.display());
        }
        Commands::BuildPairs { input, out_dir } => {
            let pairs = convert_dict::build_expand_pairs(&input)?;
            std::fs::create_dir_all(&out_dir)?;
            let out = out_dir.join(EXPAND_PAIRS_FILE);
            pairs
                .save_bincode(&out)
                .map_err(|e| anyhow!("{}: {}", out.display(), e))?;
            println!("Wrote {} pairs to {}", pairs.len(), out.display());
        }
    }
    Ok(())
}
