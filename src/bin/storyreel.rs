use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export artifacts (video requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Render the frame at a timeline position as a PNG.
    Frame(FrameArgs),
    /// Write the script transcript.
    Script(ScriptArgs),
    /// Write the narration and music mixdown as WAV.
    Audio(AudioArgs),
    /// Print the project and its narration timeline.
    Inspect(InspectArgs),
    /// Play the preview on the default audio device.
    #[cfg(feature = "device")]
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct ProjectArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory holding `<scene-id>.{wav,pcm,b64}` narration files.
    /// Defaults to `narration/` next to the project.
    #[arg(long)]
    narration_dir: Option<PathBuf>,

    /// Subtitle font file. Defaults to an installed face for the style's family.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Artifact kinds to export.
    #[arg(long = "kind", value_enum, default_values_t = [KindArg::Video])]
    kinds: Vec<KindArg>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Timeline position in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. Prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AudioArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output WAV path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Only print the project, without loading narration.
    #[arg(long)]
    no_narration: bool,
}

#[cfg(feature = "device")]
#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Start position in seconds.
    #[arg(long, default_value_t = 0.0)]
    from: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Video,
    Audio,
    Script,
    Thumbnail,
    Bundle,
}

impl From<KindArg> for storyreel::ExportKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => storyreel::ExportKind::Video,
            KindArg::Audio => storyreel::ExportKind::Audio,
            KindArg::Script => storyreel::ExportKind::Script,
            KindArg::Thumbnail => storyreel::ExportKind::Thumbnail,
            KindArg::Bundle => storyreel::ExportKind::Bundle,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storyreel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Script(args) => cmd_script(args),
        Command::Audio(args) => cmd_audio(args),
        Command::Inspect(args) => cmd_inspect(args),
        #[cfg(feature = "device")]
        Command::Play(args) => cmd_play(args),
    }
}

fn project_root(in_path: &Path) -> PathBuf {
    in_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn read_project(in_path: &Path) -> anyhow::Result<storyreel::Project> {
    let project = storyreel::Project::from_path(in_path)
        .with_context(|| format!("load project '{}'", in_path.display()))?;
    project.validate()?;
    Ok(project)
}

fn open_session(
    args: &ProjectArgs,
    out_dir: PathBuf,
) -> anyhow::Result<storyreel::StorySession> {
    let project = read_project(&args.in_path)?;
    let root = project_root(&args.in_path);
    let narration_dir = args
        .narration_dir
        .clone()
        .unwrap_or_else(|| root.join("narration"));
    let source = storyreel::DirNarrationSource::new(narration_dir);
    let opts = storyreel::SessionOpts {
        render: storyreel::RenderOpts {
            font_path: args.font.clone(),
            ..storyreel::RenderOpts::default()
        },
        out_dir,
        ..storyreel::SessionOpts::default()
    };
    let session = storyreel::StorySession::open(
        project,
        root,
        &source,
        opts,
        &storyreel::CancelToken::new(),
    )?;
    Ok(session)
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut kinds: Vec<storyreel::ExportKind> = Vec::new();
    for kind in args.kinds {
        let kind = storyreel::ExportKind::from(kind);
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.contains(&storyreel::ExportKind::Bundle) {
        anyhow::bail!("bundle exports are not supported; pass each --kind separately");
    }

    let session = open_session(&args.project, args.out_dir)?;
    let cancel = storyreel::CancelToken::new();
    for kind in kinds {
        let report = session.export(kind, &cancel)?;
        if let Some(capture) = &report.capture {
            eprintln!(
                "captured {} frames ({:.2}s video, {:.2}s audio)",
                capture.frames,
                capture.video_secs(),
                capture.audio_secs()
            );
        }
        eprintln!("wrote {}", report.path.display());
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = open_session(&args.project, PathBuf::from("."))?;
    let frame = session.render_at(args.at, args.at);
    frame.write_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_script(args: ScriptArgs) -> anyhow::Result<()> {
    let project = read_project(&args.in_path)?;
    let text = storyreel::script_transcript(&project.scenes);
    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(&out, text).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn cmd_audio(args: AudioArgs) -> anyhow::Result<()> {
    let session = open_session(&args.project, PathBuf::from("."))?;
    let samples = session.mixdown();
    storyreel::audio::mix::write_wav_16(&args.out, &samples, storyreel::MIX_SAMPLE_RATE, 2)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let project = read_project(&args.project.in_path)?;
    let canvas = project.canvas();
    println!("title:    {}", project.title);
    println!("file:     {}", storyreel::sanitize_filename(&project.title));
    println!("canvas:   {}x{}", canvas.width, canvas.height);
    println!("language: {} / voice {}", project.language, project.voice);
    println!("scenes:   {}", project.scenes.len());
    if args.no_narration {
        for (i, scene) in project.scenes.iter().enumerate() {
            println!("  {i:>3} {:<16} {:?}", scene.id.as_str(), scene.effective_effect());
        }
        return Ok(());
    }

    let session = open_session(&args.project, PathBuf::from("."))?;
    for (scene, seg) in session
        .project()
        .scenes
        .iter()
        .zip(session.timeline().segments())
    {
        println!(
            "  {:>3} {:<16} {:>8.3}s +{:>7.3}s  {:?}, {} words",
            seg.scene_index,
            scene.id.as_str(),
            seg.start,
            seg.duration,
            scene.effective_effect(),
            scene.words().len()
        );
    }
    println!(
        "total:    {} ({:.3}s)",
        storyreel::format_mm_ss(session.total_duration()),
        session.total_duration()
    );
    Ok(())
}

#[cfg(feature = "device")]
fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    use std::io::Write as _;

    let session = open_session(&args.project, PathBuf::from("."))?;
    let (device, monitor) = storyreel::audio::device::DeviceOutput::open(storyreel::MIX_SAMPLE_RATE)?;
    session.set_monitor(Some(Box::new(monitor)));

    let preview = storyreel::PreviewLoop::new(&session, storyreel::PlaybackMode::Monitored);
    session.seek(args.from);
    preview.toggle()?;
    loop {
        let tick = preview.tick();
        eprint!("\r{}", tick.status);
        std::io::stderr().flush().ok();
        if tick.ended || !preview.is_playing() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    eprintln!();
    device.pause()?;
    Ok(())
}
