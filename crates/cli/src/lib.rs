use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::AnnotationStore;
use editor::{export_annotations, Editor, UploadedFile};
use pdf_engine::{default_engine, LopdfMutator, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;

#[derive(Debug, Parser)]
#[command(name = "paperstamp")]
#[command(about = "Stamp text and signatures onto PDF pages")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Clamped to the configured zoom range.
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        config_dir: Option<PathBuf>,
    },
    /// Burn the annotations of a JSON manifest into a copy of the PDF.
    Stamp {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "MANIFEST")]
        annotations: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        config_dir: Option<PathBuf>,
    },
    /// Print the effective editor configuration.
    Config {
        #[arg(long, value_name = "DIR")]
        config_dir: Option<PathBuf>,
        /// Write the defaults to the settings file first.
        #[arg(long)]
        init: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    page_sizes_pt: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    path: String,
    config: &'a doc_model::EditorConfig,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, page, zoom, output, config_dir } => {
            run_render(&file, page, zoom, output.as_deref(), config_dir.as_deref())
        }
        Commands::Stamp { file, annotations, output, config_dir } => {
            run_stamp(&file, &annotations, output.as_deref(), config_dir.as_deref())
        }
        Commands::Config { config_dir, init } => run_config(config_dir.as_deref(), init),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let page_sizes_pt = (0..page_count)
        .map(|index| {
            engine
                .page_size(handle, index)
                .map(|size| PageSizeOutput { width: size.width_pt, height: size.height_pt })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, page_sizes_pt };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_render(
    file: &Path,
    page: u32,
    zoom: f64,
    output: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let config = open_storage(config_dir)?.load_config().context("failed to load settings")?;
    let mut editor = Editor::new(default_engine(), config).context("invalid settings")?;
    editor.upload(read_upload(file)?).context("failed to open PDF")?;

    let page_count = editor.page_count();
    if page > page_count {
        anyhow::bail!("page {page} is out of range (document has {page_count} pages)");
    }

    editor.go_to_page(page);
    let zoom = editor.set_zoom(zoom);
    let view = editor.render().context("failed to render page")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    view.surface
        .image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    tracing::info!(page, zoom = zoom.factor(), path = %output.display(), "rendered page");
    println!("{}", output.display());

    Ok(())
}

fn run_stamp(
    file: &Path,
    manifest: &Path,
    output: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    let config = open_storage(config_dir)?.load_config().context("failed to load settings")?;

    let manifest_bytes = fs::read(manifest)
        .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
    let store: AnnotationStore = serde_json::from_slice(&manifest_bytes)
        .with_context(|| format!("invalid annotation manifest {}", manifest.display()))?;

    store
        .validate(&config)
        .with_context(|| format!("invalid annotation manifest {}", manifest.display()))?;

    let source = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let name = file_name(file);

    let exported = export_annotations::<LopdfMutator>(&source, &name, &store, &config)
        .context("failed to stamp PDF")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| file.with_file_name(&exported.file_name));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&output, &exported.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn run_config(config_dir: Option<&Path>, init: bool) -> Result<()> {
    let storage = open_storage(config_dir)?;

    if init {
        storage
            .save_config(&doc_model::EditorConfig::default())
            .context("failed to write settings")?;
    }

    let config = storage.load_config().context("failed to load settings")?;
    let payload =
        ConfigOutput { path: storage.config_path().display().to_string(), config: &config };

    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn open_storage(config_dir: Option<&Path>) -> Result<Storage> {
    match config_dir {
        Some(dir) => Ok(Storage::with_root(dir)),
        None => Storage::from_default_project().context("failed to locate settings directory"),
    }
}

fn read_upload(file: &Path) -> Result<UploadedFile> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    Ok(UploadedFile::new(file_name(file), editor::source::PDF_MIME, bytes))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        anyhow::bail!("not a PDF file: {}", path.display());
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_owned())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
