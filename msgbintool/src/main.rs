use anyhow::{Context, Result};
use clap::Parser;
use pmd_msgbin::{
    replace_japanese_runs,
    table::{export_entries, import_entries, read_column, read_glossary, write_column, ENTRY_COLUMN},
    MessageBin, PatchWarning,
};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Parser)]
/// msgbintool allow to extract, patch in place and translate "messagebin"
/// file, used in 3ds mystery dungeon games
struct Opts {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    /// dump a messagebin file to a csv table (Index, ID, Entry)
    Export(ExportParameter),
    /// patch a messagebin file in place from a csv table
    Import(ImportParameter),
    /// dump every .bin file of a folder to a sibling .csv
    ExportFolder(FolderParameter),
    /// patch every .bin file of a folder from its sibling .csv
    ImportFolder(FolderParameter),
    /// replace the japanese runs of the Entry column of a csv table
    Translate(TranslateParameter),
    /// decode, then reencode a messagebin file with a fresh layout
    Reencode(ReencodeParameter),
}

#[derive(Parser)]
struct ExportParameter {
    /// the input messagebin file to read
    input: PathBuf,
    /// the output csv file to write
    output: PathBuf,
    /// tolerate duplicate pointer offsets in the sir0 pointer list
    #[clap(long)]
    lenient: bool,
}

#[derive(Parser)]
struct ImportParameter {
    /// the messagebin file to patch
    input: PathBuf,
    /// the csv table with the new entries
    table: PathBuf,
    /// where to write the patched file (the input is overwritten when absent)
    output: Option<PathBuf>,
    /// tolerate duplicate pointer offsets in the sir0 pointer list
    #[clap(long)]
    lenient: bool,
}

#[derive(Parser)]
struct FolderParameter {
    /// the folder to process
    folder: PathBuf,
    /// tolerate duplicate pointer offsets in the sir0 pointer list
    #[clap(long)]
    lenient: bool,
}

#[derive(Parser)]
struct TranslateParameter {
    /// the input csv table, with an Entry column
    input: PathBuf,
    /// a csv glossary with Source and Translation columns
    glossary: PathBuf,
    /// the output csv table to write
    output: PathBuf,
}

#[derive(Parser)]
struct ReencodeParameter {
    /// the input messagebin file to read
    input: PathBuf,
    /// the output messagebin file to write
    output: PathBuf,
    /// tolerate duplicate pointer offsets in the sir0 pointer list
    #[clap(long)]
    lenient: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    match opts.subcmd {
        SubCommand::Export(ep) => export(&ep)?,
        SubCommand::Import(ip) => import(&ip)?,
        SubCommand::ExportFolder(fp) => export_folder(&fp)?,
        SubCommand::ImportFolder(fp) => import_folder(&fp)?,
        SubCommand::Translate(tp) => translate(&tp)?,
        SubCommand::Reencode(rp) => reencode(&rp)?,
    }

    Ok(())
}

fn load_message_bin(path: &Path, lenient: bool) -> Result<MessageBin> {
    let mut input_file = BufReader::new(
        File::open(path).with_context(|| format!("can't open the input file {:?}", path))?,
    );
    let message_bin = if lenient {
        MessageBin::load_file_lenient(&mut input_file)
    } else {
        MessageBin::load_file(&mut input_file)
    };
    message_bin.with_context(|| format!("can't extract the messagebin file {:?}", path))
}

fn print_patch_warnings(warnings: &[PatchWarning]) {
    for warning in warnings {
        println!(
            "warning: the entry n°{} (hash {}) is {} bytes too long, it was truncated",
            warning.entry_index, warning.hash, warning.lost_bytes
        );
    }
}

fn export(ep: &ExportParameter) -> Result<()> {
    let message_bin = load_message_bin(&ep.input, ep.lenient)?;
    export_to(&message_bin, &ep.output)?;
    println!("exported {} entries to {:?}", message_bin.len(), ep.output);
    Ok(())
}

fn export_to(message_bin: &MessageBin, output: &Path) -> Result<()> {
    let output_file = BufWriter::new(
        File::create(output).with_context(|| format!("can't open the result file {:?}", output))?,
    );
    export_entries(output_file, message_bin)
        .with_context(|| format!("can't write the table {:?}", output))?;
    Ok(())
}

fn import(ip: &ImportParameter) -> Result<()> {
    let mut message_bin = load_message_bin(&ip.input, ip.lenient)?;
    let output = ip.output.as_deref().unwrap_or(&ip.input);
    import_into(&mut message_bin, &ip.table, output)?;
    println!("patched {:?}", output);
    Ok(())
}

fn import_into(message_bin: &mut MessageBin, table: &Path, output: &Path) -> Result<()> {
    let table_file = BufReader::new(
        File::open(table).with_context(|| format!("can't open the table file {:?}", table))?,
    );
    let import_warnings = import_entries(table_file, message_bin)
        .with_context(|| format!("can't import the table {:?}", table))?;
    for warning in &import_warnings {
        println!("warning: {:?} in {:?}", warning, table);
    }

    // the patch is fully assembled in memory before the output is touched
    let patch_warnings = message_bin.save_in_place();
    print_patch_warnings(&patch_warnings);

    let mut output_file = BufWriter::new(
        File::create(output).with_context(|| format!("can't open the result file {:?}", output))?,
    );
    output_file
        .write_all(message_bin.bytes())
        .with_context(|| format!("can't write the patched file {:?}", output))?;
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map_or(false, |found| found.eq_ignore_ascii_case(extension))
}

fn export_folder(fp: &FolderParameter) -> Result<()> {
    let mut count = 0;
    for dir_entry in fs::read_dir(&fp.folder)
        .with_context(|| format!("can't list the folder {:?}", fp.folder))?
    {
        let path = dir_entry?.path();
        if !has_extension(&path, "bin") {
            continue;
        }
        let result = load_message_bin(&path, fp.lenient)
            .and_then(|message_bin| export_to(&message_bin, &path.with_extension("csv")));
        match result {
            Ok(()) => count += 1,
            Err(err) => println!("error: can't export {:?}: {:#}", path, err),
        }
    }
    println!("exported {} file(s)", count);
    Ok(())
}

fn import_folder(fp: &FolderParameter) -> Result<()> {
    let mut count = 0;
    for dir_entry in fs::read_dir(&fp.folder)
        .with_context(|| format!("can't list the folder {:?}", fp.folder))?
    {
        let path = dir_entry?.path();
        if !has_extension(&path, "csv") {
            continue;
        }
        let bin_path = path.with_extension("bin");
        if !bin_path.exists() {
            println!("warning: no messagebin file found for the table {:?}", path);
            continue;
        }
        let result = load_message_bin(&bin_path, fp.lenient)
            .and_then(|mut message_bin| import_into(&mut message_bin, &path, &bin_path));
        match result {
            Ok(()) => count += 1,
            Err(err) => println!("error: can't import {:?}: {:#}", path, err),
        }
    }
    println!("patched {} file(s)", count);
    Ok(())
}

fn translate(tp: &TranslateParameter) -> Result<()> {
    let glossary_file = BufReader::new(
        File::open(&tp.glossary)
            .with_context(|| format!("can't open the glossary file {:?}", tp.glossary))?,
    );
    let mut glossary =
        read_glossary(glossary_file).context("can't read the glossary")?;

    let input_file = BufReader::new(
        File::open(&tp.input).with_context(|| format!("can't open the input file {:?}", tp.input))?,
    );
    let cells = read_column(input_file, ENTRY_COLUMN).context("can't read the Entry column")?;

    println!("translating...");
    let replaced = replace_japanese_runs(&cells, &mut glossary)
        .context("can't replace the japanese runs")?;

    let input_file = BufReader::new(
        File::open(&tp.input).with_context(|| format!("can't open the input file {:?}", tp.input))?,
    );
    let output_file = BufWriter::new(
        File::create(&tp.output)
            .with_context(|| format!("can't open the result file {:?}", tp.output))?,
    );
    write_column(input_file, output_file, ENTRY_COLUMN, &replaced)
        .context("can't write the translated table")?;
    println!("done !");
    Ok(())
}

fn reencode(rp: &ReencodeParameter) -> Result<()> {
    println!("decoding...");
    let message_bin = load_message_bin(&rp.input, rp.lenient)?;

    println!("encoding...");
    let mut output_file = BufWriter::new(
        File::create(&rp.output)
            .with_context(|| format!("can't open the result file {:?}", rp.output))?,
    );
    message_bin
        .write(&mut output_file)
        .context("can't encode/write the messagebin file")?;
    println!("done !");
    Ok(())
}
