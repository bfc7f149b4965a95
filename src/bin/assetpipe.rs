use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "assetpipe", version)]
struct Cli {
    /// Log pipeline activity to stderr (repeat for debug output).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load assets through the pipeline and print a JSON report.
    Load(LoadArgs),
    /// Print the dedup hash of a path.
    Hash(HashArgs),
}

#[derive(Parser, Debug)]
struct LoadArgs {
    /// Files to load: `.bmp` as bitmaps, `.ttf`/`.otf` as fonts, anything else as images.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Pixel height for fonts.
    #[arg(long, default_value_t = 16)]
    font_size: u16,

    /// Upload textures to a headless device instead of staying in CPU mode.
    #[arg(long)]
    gpu: bool,

    /// Asset system options (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up on assets that are not ready after this long.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct HashArgs {
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Load(args) => cmd_load(args),
        Command::Hash(args) => {
            println!("{}", assetpipe::hash_path(&args.path));
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_opts(path: &Path) -> anyhow::Result<assetpipe::AssetSystemOpts> {
    let f = File::open(path).with_context(|| format!("open options '{}'", path.display()))?;
    let r = BufReader::new(f);
    let opts: assetpipe::AssetSystemOpts =
        serde_json::from_reader(r).with_context(|| "parse options JSON")?;
    Ok(opts)
}

enum Loaded {
    Image(assetpipe::ImageHandle),
    Font(assetpipe::FontHandle),
}

#[derive(serde::Serialize)]
#[serde(tag = "asset", rename_all = "lowercase")]
enum Entry {
    Image {
        path: PathBuf,
        #[serde(flatten)]
        info: assetpipe::ImageInfo,
    },
    Font {
        path: PathBuf,
        #[serde(flatten)]
        info: assetpipe::FontInfo,
    },
}

#[derive(serde::Serialize)]
struct Report {
    mode: assetpipe::RenderMode,
    assets: Vec<Entry>,
    stats: assetpipe::AssetStats,
}

fn is_font(path: &Path) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("ttf") | Some("otf") | Some("ttc")
    )
}

fn is_bitmap(path: &Path) -> bool {
    extension(path).as_deref() == Some("bmp")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn cmd_load(args: LoadArgs) -> anyhow::Result<()> {
    let mut opts = match &args.config {
        Some(path) => read_opts(path)?,
        None => assetpipe::AssetSystemOpts::default(),
    };
    if args.gpu {
        opts.render_mode = assetpipe::RenderMode::Gpu;
    }
    let wanted_images = args.files.iter().filter(|p| !is_font(p)).count();
    let wanted_fonts = args.files.len() - wanted_images;
    opts.image_capacity = opts.image_capacity.max(wanted_images);
    opts.font_capacity = opts.font_capacity.max(wanted_fonts);
    opts.queue_capacity = opts
        .queue_capacity
        .max(opts.image_capacity + opts.font_capacity);

    let assets = assetpipe::AssetSystem::new(opts)?;
    let mut device = assetpipe::HeadlessDevice::new();

    let handles: Vec<(PathBuf, Loaded)> = args
        .files
        .iter()
        .map(|path| {
            let handle = if is_font(path) {
                Loaded::Font(assets.acquire_font_from_path(path, args.font_size))
            } else if is_bitmap(path) {
                Loaded::Image(assets.acquire_bitmap_from_path(path))
            } else {
                Loaded::Image(assets.acquire_image_from_path(path))
            };
            (path.clone(), handle)
        })
        .collect();

    let settled = |assets: &assetpipe::AssetSystem| {
        handles.iter().all(|(_, h)| match h {
            Loaded::Image(h) => assets
                .image_info(*h)
                .is_some_and(|i| i.loaded || i.failed),
            Loaded::Font(h) => assets.font_info(*h).is_some_and(|i| i.loaded || i.failed),
        })
    };

    let deadline = Instant::now() + Duration::from_millis(args.timeout_ms);
    loop {
        assets.run_post_process(&mut device);
        if settled(&assets) {
            break;
        }
        if Instant::now() >= deadline {
            tracing::warn!("timed out waiting for assets");
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut entries = Vec::with_capacity(handles.len());
    for (path, handle) in &handles {
        match handle {
            Loaded::Image(h) => {
                let info = assets
                    .image_info(*h)
                    .with_context(|| format!("image record for '{}'", path.display()))?;
                entries.push(Entry::Image {
                    path: path.clone(),
                    info,
                });
            }
            Loaded::Font(h) => {
                let info = assets
                    .font_info(*h)
                    .with_context(|| format!("font record for '{}'", path.display()))?;
                entries.push(Entry::Font {
                    path: path.clone(),
                    info,
                });
            }
        }
    }

    let report = Report {
        mode: assets.render_mode(),
        assets: entries,
        stats: assets.stats(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize report")?
    );

    for (_, handle) in handles {
        match handle {
            Loaded::Image(h) => assets.release_image(h),
            Loaded::Font(h) => assets.release_font(h),
        }
    }
    assets.on_render_mode_changed(assetpipe::RenderMode::Cpu, &mut device);
    assets.shutdown();
    Ok(())
}
