use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use sha2::Digest as _;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "dynawall", version, about = "Build dynamic wallpaper bundles")]
struct Cli {
    /// Log debug output from dynawall (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a wallpaper bundle from a JSON manifest.
    Create(CreateArgs),
    /// Print the sun position for a place and local time.
    Solar(SolarArgs),
    /// Summarize an existing bundle.
    Inspect(InspectArgs),
    /// Print the EXIF facts dynawall uses from an image.
    Exif(ExifArgs),
    /// Detect an image's container format.
    Sniff(SniffArgs),
}

#[derive(Parser, Debug)]
struct CreateArgs {
    /// Input manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Output .heic path.
    #[arg(long)]
    out: PathBuf,

    /// JPEG quality for re-encoded frames (overrides the manifest).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Replace `out` if it already exists.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct SolarArgs {
    /// Latitude in degrees, north positive. Uses the remembered location when omitted.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude in degrees, east positive.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Local date and time, e.g. 2024-06-21T12:00:00.
    #[arg(long)]
    at: NaiveDateTime,

    /// Standard UTC offset of the local clock in hours.
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<f64>,

    /// Daylight saving offset in hours.
    #[arg(long, allow_hyphen_values = true)]
    dst: Option<f64>,

    /// Store the location for later runs.
    #[arg(long)]
    remember: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Bundle to read.
    file: PathBuf,

    /// Print the SHA-256 of every frame bitstream.
    #[arg(long)]
    digests: bool,
}

#[derive(Parser, Debug)]
struct ExifArgs {
    /// Image to read.
    file: PathBuf,
}

#[derive(Parser, Debug)]
struct SniffArgs {
    /// Image to classify.
    file: PathBuf,

    /// Accepted formats; the command fails if the file is not one of them.
    #[arg(long, value_enum, num_args = 1..)]
    allow: Vec<FormatChoice>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
    Tiff,
    Heic,
}

impl From<FormatChoice> for dynawall::SourceFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Png => Self::Png,
            FormatChoice::Jpeg => Self::Jpeg,
            FormatChoice::Tiff => Self::Tiff,
            FormatChoice::Heic => Self::Heic,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Create(args) => cmd_create(args),
        Command::Solar(args) => cmd_solar(args, cli.settings.as_deref()),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Exif(args) => cmd_exif(args),
        Command::Sniff(args) => cmd_sniff(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "dynawall=debug,warn" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_settings(path: Option<&Path>) -> anyhow::Result<dynawall::SettingsStore> {
    let store = match path {
        Some(p) => dynawall::SettingsStore::open(p),
        None => dynawall::SettingsStore::open_default(),
    };
    store.with_context(|| "open settings")
}

fn cmd_create(args: CreateArgs) -> anyhow::Result<()> {
    let mut manifest = dynawall::WallpaperManifest::from_path(&args.manifest)
        .with_context(|| format!("load manifest '{}'", args.manifest.display()))?;
    if let Some(q) = args.quality {
        manifest.jpeg_quality = q;
    }
    let options = manifest.options();

    let root = args.manifest.parent().unwrap_or_else(|| Path::new("."));
    let attributes = manifest
        .resolve(root)
        .with_context(|| format!("resolve manifest '{}'", args.manifest.display()))?;

    let mut report = |p: dynawall::Progress| {
        if p.is_complete() {
            eprintln!("[{}/{}] container written", p.step, p.total);
        } else {
            eprintln!("[{}/{}] frame added", p.step, p.total);
        }
    };
    dynawall::write_wallpaper(
        attributes,
        &options,
        &args.out,
        args.overwrite,
        Some(&mut report),
    )
    .with_context(|| format!("create wallpaper '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_solar(args: SolarArgs, settings: Option<&Path>) -> anyhow::Result<()> {
    let mut store = open_settings(settings)?;
    let remembered = match store.get::<dynawall::Location>(dynawall::LOCATION_KEY) {
        Ok(loc) => Some(loc),
        Err(dynawall::StorageError::KeyNotFound(_)) => None,
        Err(e) => return Err(e).with_context(|| "read remembered location"),
    };

    let location = match (args.lat, args.lon) {
        (Some(latitude), Some(longitude)) => dynawall::Location {
            latitude,
            longitude,
            utc_offset_hours: args
                .utc_offset
                .or(remembered.and_then(|l| l.utc_offset_hours)),
            dst_offset_hours: args
                .dst
                .or(remembered.map(|l| l.dst_offset_hours))
                .unwrap_or(0.0),
        },
        _ => {
            let mut loc = remembered.with_context(
                || "no location given and none remembered; pass --lat and --lon",
            )?;
            if let Some(tz) = args.utc_offset {
                loc.utc_offset_hours = Some(tz);
            }
            if let Some(dst) = args.dst {
                loc.dst_offset_hours = dst;
            }
            loc
        }
    };
    dynawall::solar::validate_coordinates(location.latitude, location.longitude)?;
    let utc_offset = location
        .utc_offset_hours
        .with_context(|| "no UTC offset given; pass --utc-offset")?;

    let input = dynawall::solar::SolarInput::new(
        location.latitude,
        location.longitude,
        args.at,
        utc_offset,
        location.dst_offset_hours,
    );
    let pos = dynawall::solar::position(&input);
    let times = dynawall::solar::sun_times(&input);

    println!("altitude:         {:.4}", pos.altitude);
    println!("azimuth:          {:.4}", pos.azimuth);
    println!("declination:      {:.4}", pos.declination);
    println!("equation of time: {:.4} min", pos.equation_of_time);
    println!("solar noon:       {}", clock(Some(times.solar_noon)));
    println!("sunrise:          {}", clock(times.sunrise));
    println!("sunset:           {}", clock(times.sunset));

    if args.remember {
        store.set(dynawall::LOCATION_KEY, &location)?;
        store.save()?;
        eprintln!("remembered location in {}", store.path().display());
    }
    Ok(())
}

/// Minutes after local midnight as `HH:MM`.
fn clock(minutes: Option<f64>) -> String {
    match minutes {
        Some(m) => {
            let total = m.round().rem_euclid(1440.0) as u32;
            format!("{:02}:{:02}", total / 60, total % 60)
        }
        None => "none (polar day or night)".to_string(),
    }
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("read bundle '{}'", args.file.display()))?;
    let info = dynawall::inspect(&bytes)
        .with_context(|| format!("inspect '{}'", args.file.display()))?;

    println!("brand:        {}", info.brand);
    println!("primary item: {}", info.primary_item_id);
    println!("frames:       {}", info.frames.len());
    for (i, f) in info.frames.iter().enumerate() {
        let dims = f
            .dimensions
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "?x?".to_string());
        let mut flags = Vec::new();
        if f.primary {
            flags.push("primary");
        }
        if f.has_metadata {
            flags.push("metadata");
        }
        println!(
            "  #{i} item {} {} {dims} {} bytes {}",
            f.item_id,
            f.codec,
            f.data_len,
            if flags.is_empty() {
                String::new()
            } else {
                format!("[{}]", flags.join(", "))
            }
        );
    }

    match &info.metadata {
        Some(dynawall::ImageMetadata::Solar(m)) => {
            println!(
                "metadata:     {} ({} entries)",
                dynawall::ImageMetadata::SOLAR_KEY,
                m.entries.len()
            );
            for e in &m.entries {
                println!(
                    "  i={} altitude={} azimuth={}",
                    e.index, e.altitude, e.azimuth
                );
            }
            print_appearance(m.appearance.as_ref());
        }
        Some(dynawall::ImageMetadata::Time(m)) => {
            println!(
                "metadata:     {} ({} entries)",
                dynawall::ImageMetadata::TIME_KEY,
                m.entries.len()
            );
            for e in &m.entries {
                println!("  i={} t={}", e.index, e.day_percentage);
            }
            print_appearance(m.appearance.as_ref());
        }
        Some(dynawall::ImageMetadata::Appearance(a)) => {
            println!("metadata:     {}", dynawall::ImageMetadata::APPEARANCE_KEY);
            print_appearance(Some(a));
        }
        None => println!("metadata:     none"),
    }

    if args.digests {
        let container = dynawall::HeifContainer::parse(&bytes)?;
        eprintln!("frame digests:");
        for f in &info.frames {
            let data = container.item_data(f.item_id)?;
            eprintln!("  item {}: sha256 {}", f.item_id, sha256_hex(&data));
        }
    }
    Ok(())
}

fn print_appearance(a: Option<&dynawall::AppearanceIndices>) {
    if let Some(a) = a {
        println!("  light={} dark={}", a.light_index, a.dark_index);
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn cmd_exif(args: ExifArgs) -> anyhow::Result<()> {
    let meta = dynawall::ExifMetadata::read(&args.file)
        .with_context(|| format!("read '{}'", args.file.display()))?;
    let show = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    println!("latitude:    {}", show(meta.latitude.map(|v| v.to_string())));
    println!("longitude:   {}", show(meta.longitude.map(|v| v.to_string())));
    println!("create date: {}", show(meta.create_date.map(|v| v.to_string())));
    println!("timezone:    {}", show(meta.timezone.map(|v| v.to_string())));
    Ok(())
}

fn cmd_sniff(args: SniffArgs) -> anyhow::Result<()> {
    if args.allow.is_empty() {
        let format = dynawall::classify_path(&args.file)
            .with_context(|| format!("classify '{}'", args.file.display()))?;
        println!("{format}");
        return Ok(());
    }

    let allowed: Vec<dynawall::SourceFormat> =
        args.allow.iter().copied().map(Into::into).collect();
    if !dynawall::validate(&args.file, &allowed) {
        let names: Vec<&str> = allowed.iter().map(|f| f.name()).collect();
        anyhow::bail!(
            "'{}' is not a readable {} image",
            args.file.display(),
            names.join("/")
        );
    }
    println!("ok");
    Ok(())
}
