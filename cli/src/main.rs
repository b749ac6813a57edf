//! pdfnote CLI - convert PDFs into knowledge-base notes

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfnote::convert::{default_output_path, font_statistics};
use pdfnote::{
    Config, ConversionReport, Converter, JsonFormat, PageSelection, ParseOptions, PdfParser,
    TesseractCli,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdfnote")]
#[command(version)]
#[command(about = "Convert PDFs into Obsidian-ready Markdown notes", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    convert: ConvertArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input PDF file
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output Markdown file (default: <input stem>.md next to the input)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Document password
    #[arg(short, long, env = "PDFNOTE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Caption images with tesseract OCR
    #[arg(long)]
    ocr: bool,

    /// OCR language passed to tesseract
    #[arg(long, value_name = "LANG", default_value = "eng")]
    ocr_lang: String,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image directory (default: <output stem>_images next to the output)
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Include YAML frontmatter
    #[arg(long)]
    frontmatter: bool,

    /// Fail on the first unreadable page instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information and the dominant body font size
    Info {
        /// Input PDF file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Document password
        #[arg(short, long, env = "PDFNOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Dump the classified document structure as JSON
    Json {
        /// Input PDF file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document password
        #[arg(short, long, env = "PDFNOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// JSON configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Info { input, password }) => cmd_info(&input, password),
        Some(Commands::Json {
            input,
            output,
            password,
            config,
            pages,
            compact,
        }) => cmd_json(
            &input,
            output.as_deref(),
            password,
            config.as_deref(),
            pages.as_deref(),
            compact,
        ),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => match cli.convert.input {
            Some(ref input) => cmd_convert(input, &cli.convert),
            None => {
                println!("{}", "Usage: pdfnote <INPUT> [-o OUTPUT]".yellow());
                println!("       pdfnote --help for more information");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if let Some(err) = e.downcast_ref::<pdfnote::Error>() {
            if err.is_password_error() {
                eprintln!(
                    "{}",
                    "Pass the password with -p or the PDFNOTE_PASSWORD environment variable."
                        .dimmed()
                );
            }
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, pdfnote::Error> {
    match path {
        Some(path) => Config::from_json_file(path),
        None => Ok(Config::default()),
    }
}

fn page_selection(pages: Option<&str>) -> Result<PageSelection, pdfnote::Error> {
    pages.map_or(Ok(PageSelection::All), PageSelection::parse)
}

fn cmd_convert(input: &Path, args: &ConvertArgs) -> CliResult {
    let config = load_config(args.config.as_deref())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages")?
            .progress_chars("#>-"),
    );
    let progress = pb.clone();

    let mut converter = Converter::new()
        .with_config(config)
        .with_pages(page_selection(args.pages.as_deref())?)
        .on_page(move |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        });
    if !args.strict {
        converter = converter.lenient();
    }
    if let Some(ref password) = args.password {
        converter = converter.with_password(password);
    }
    if let Some(ref dir) = args.image_dir {
        converter = converter.with_image_dir(dir);
    }
    if args.frontmatter {
        converter = converter.with_frontmatter(true);
    }
    if args.ocr {
        let engine = TesseractCli::new(&args.ocr_lang);
        if engine.is_available() {
            println!("{}", "OCR enabled: images will be captioned".cyan());
            converter = converter.with_ocr(engine);
        } else {
            eprintln!(
                "{}",
                "OCR requested but tesseract was not found; continuing without OCR".yellow()
            );
        }
    }

    let result = converter.convert_file(input, &output);
    pb.finish_and_clear();
    let result = result?;

    println!("{} {}", "Saved to".green(), output.display());
    print_report(&result.report);
    Ok(())
}

fn print_report(report: &ConversionReport) {
    println!();
    println!("{}", "Conversion Report".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), report.page_count);
    println!("{}: {}", "Headings".bold(), report.heading_count);
    println!("{}: {}", "Paragraphs".bold(), report.paragraph_count);
    println!("{}: {}", "List items".bold(), report.list_item_count);
    println!("{}: {}", "Tables".bold(), report.table_count);
    println!("{}: {}", "Code blocks".bold(), report.code_block_count);
    println!(
        "{}: {} ({} saved, {} captioned)",
        "Images".bold(),
        report.image_count,
        report.images_saved,
        report.ocr_caption_count
    );
    println!("{}: {}", "Linked terms".bold(), report.linked_terms);
    println!("{}: {}", "Tags".bold(), report.tag_count);
    if report.skipped_pages > 0 {
        println!(
            "{}",
            format!("{} page(s) could not be read", report.skipped_pages).yellow()
        );
    }
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    password: Option<String>,
    config: Option<&Path>,
    pages: Option<&str>,
    compact: bool,
) -> CliResult {
    let mut converter = Converter::new()
        .with_config(load_config(config)?)
        .with_pages(page_selection(pages)?)
        .lenient();
    if let Some(password) = password {
        converter = converter.with_password(password);
    }
    let doc = converter.analyze_file(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    if let Some(path) = output {
        let mut file = BufWriter::new(File::create(path)?);
        pdfnote::render::write_json(&doc, format, &mut file)?;
        file.flush()?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", pdfnote::render::to_json(&doc, format)?);
    }

    Ok(())
}

fn cmd_info(input: &Path, password: Option<String>) -> CliResult {
    let mut options = ParseOptions::new().lenient().with_images(false);
    if let Some(password) = password {
        options = options.with_password(password);
    }
    let parser = PdfParser::open_with_options(input, options)?;
    let metadata = pdfnote::PageSource::metadata(&parser);

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if metadata.encrypted { "Yes" } else { "No" }
    );

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }

    println!();
    println!("{}", "Font Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let stats = font_statistics(&parser);
    println!("{}: {:.1}pt", "Body size".bold(), stats.body_size());
    for (size, chars) in stats.sizes() {
        println!("  {:>6.1}pt  {} chars", size, chars);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfnote".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF to knowledge-base Markdown converter");
    println!();
    println!("License: MIT");
}
