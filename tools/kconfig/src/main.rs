//! `kconfig`: compiles a kernel configuration file into build files.
//!
//! ```text
//!   kconfig [-s SRCDIR] [-b BUILDDIR] [-v…] [-x] CONFIG
//!
//!   CONFIG ──Compiler──► Session ──generate──► BUILDDIR/{Makefile, ioconf.c, …}
//! ```
//!
//! Without `-s` the source tree is three levels above the configuration
//! file (`sys/arch/<machine>/conf/GENERIC`). Without `-b` the build
//! directory is `../compile/<CONFIG>` next to it.

mod logger;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use config_emit::{EmitOptions, generate, write_all};
use config_model::{Session, SessionOptions};
use config_syntax::Compiler;
use log::LevelFilter;
use logger::StderrLogger;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "kconfig", version, about)]
struct Cli {
    /// Kernel source tree.
    #[arg(short = 's', long)]
    srcdir: Option<PathBuf>,

    /// Where the generated files go.
    #[arg(short = 'b', long)]
    builddir: Option<PathBuf>,

    /// Report more; repeat for debug output.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Use lint values for options and list the files instead of writing
    /// them.
    #[arg(short = 'x', long)]
    lint: bool,

    /// `maxusers` to assume when the input does not set one.
    #[arg(long)]
    maxusers: Option<u32>,

    /// Devices that may have `*` instances without a `needs-count` file.
    #[arg(long = "star", value_name = "DEVICE")]
    star: Vec<String>,

    /// The configuration file.
    config: PathBuf,
}

impl Cli {
    const fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn config_dir(&self) -> PathBuf {
        self.config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    fn default_srcdir(&self) -> PathBuf {
        self.config_dir().join("..").join("..").join("..")
    }

    fn builddir(&self) -> PathBuf {
        self.builddir.clone().unwrap_or_else(|| {
            let name = self
                .config
                .file_name()
                .map_or_else(|| "kernel".into(), |n| n.to_string_lossy().into_owned());
            self.config_dir().join("..").join("compile").join(name)
        })
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            srcdir: self.srcdir.as_ref().map(|d| d.display().to_string()),
            builddir: self.builddir.as_ref().map(|d| d.display().to_string()),
            verbose: self.verbose > 0,
            default_maxusers: self.maxusers,
            needs_count: self.star.clone(),
            ..SessionOptions::default()
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut compiler = Compiler::new(Session::new(cli.session_options()), cli.default_srcdir());
    let ok = compiler
        .compile_file(&cli.config)
        .with_context(|| format!("compiling {}", cli.config.display()))?;
    let session = compiler.into_session();
    if !ok {
        let errors = session.diagnostics().error_count();
        bail!("{errors} error(s) in {}", cli.config.display());
    }

    let artifacts = generate(&session, &EmitOptions { lint: cli.lint })?;
    if cli.lint {
        for artifact in &artifacts {
            println!("{}", artifact.name);
        }
        return Ok(());
    }

    let builddir = session
        .settings()
        .builddir
        .map_or_else(|| cli.builddir(), |dir| PathBuf::from(dir.as_str()));
    write_all(&builddir, &artifacts)?;
    log::info!("build directory is {}", builddir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(cli.log_level()).init()?;
    run(&cli)
}
