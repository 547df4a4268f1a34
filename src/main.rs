use appie::{config, output, render, templates, watch};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appie")]
#[command(about = "Convention-driven static site generator")]
#[command(long_about = "\
Convention-driven static site generator

Your filesystem is the data source. Every file in the content tree maps to
exactly one output artifact, by extension: markdown and HTML fragments
become pages, images get web-size and thumbnail derivatives, everything
else is copied through. Every directory gets an index page listing its
rendered children.

Content structure:

  content/
  ├── bla.md                       # Page → bla.html (template: default)
  ├── blog/                        # Section → blog/index.html
  │   ├── .noindex                 # Marker: skip this directory's index
  │   ├── .template                # Marker: index template override
  │   └── post.md                  # Page → blog/post.html (template: blog)
  └── projects/
      └── robot.jpg                # → robot.jpg, robot_web.jpg, robot_thumb.jpg

Templates are Tera files resolved by convention: a file under blog/ renders
with templates/blog.html when it exists, else default.html; a directory
index prefers <dirname>_index.html over index.html. Tagged pages are
additionally collected under tags/.

Site-wide parameters come from params.json next to the content directory;
unknown keys pass straight through to every template.")]
#[command(version)]
struct Cli {
    /// Rebuild from scratch: wipe the output directory first
    #[arg(short, long)]
    force: bool,

    /// Watch content, templates and static files; rebuild on change
    #[arg(short, long)]
    watch: bool,

    /// Content directory (default: input_path from params.json)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output directory (default: output_path from params.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Template directory
    #[arg(long, default_value = "templates")]
    templates: PathBuf,

    /// Static file directory, mirrored to the output root
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Site parameter file
    #[arg(long, default_value = "params.json")]
    params: PathBuf,
}

/// Source and output roots: CLI flags win over `params.json`.
fn resolve_paths(cli: &Cli, params: &config::Params) -> (PathBuf, PathBuf) {
    let source = cli
        .source
        .clone()
        .unwrap_or_else(|| params.input_path.clone());
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| params.output_path.clone());
    (source, output)
}

/// One full build from current on-disk state. Parameters and templates are
/// reloaded every time so watch-mode rebuilds pick up their changes too.
fn build_once(cli: &Cli, force: bool) -> Result<output::BuildStats, Box<dyn std::error::Error>> {
    let params = config::load(&cli.params)?;
    let (source, out) = resolve_paths(cli, &params);
    let set = templates::TemplateSet::load(&cli.templates)?;
    let site = render::Site::new(params, set);
    Ok(site.build(&source, &out, &cli.static_dir, force)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let stats = build_once(&cli, cli.force)?;
    output::print_summary(&stats);

    if cli.watch {
        let params = config::load(&cli.params)?;
        let (source, _) = resolve_paths(&cli, &params);
        println!("Watching {} for changes (Ctrl-C to stop)", source.display());

        let roots = [
            source.as_path(),
            cli.templates.as_path(),
            cli.static_dir.as_path(),
        ];
        watch::watch(&roots, || {
            println!("{}", output::format_rebuild_banner());
            match build_once(&cli, false) {
                Ok(stats) => output::print_summary(&stats),
                Err(err) => eprintln!("rebuild failed: {err}"),
            }
        })?;
    }

    Ok(())
}
