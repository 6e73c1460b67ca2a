//! `monoutil`: create, inspect, and move files in and out of monofs
//! filesystem images stored as plain files on the host filesystem.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use monofs::{MonoFs, OpenMode};
use monofs_io::{FilePartition, Partition, CLUSTER_SIZE};

#[derive(Parser)]
#[command(name = "monoutil", about = "Inspect and manipulate monofs filesystem images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new image file and format it.
    Format {
        image: PathBuf,
        /// Number of 2048-byte clusters the image should hold.
        #[arg(long, default_value_t = 4096)]
        clusters: u32,
    },
    /// Print the number of files recorded in the root directory.
    Info { image: PathBuf },
    /// Copy a local file into the image.
    Put {
        image: PathBuf,
        src: PathBuf,
        /// Destination path inside the image, e.g. `/README.TXT`.
        dest: String,
    },
    /// Copy a file out of the image to the local filesystem.
    Get {
        image: PathBuf,
        /// Source path inside the image, e.g. `/README.TXT`.
        src: String,
        dest: PathBuf,
    },
    /// Remove a file from the image.
    Rm { image: PathBuf, path: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Format { image, clusters } => format_image(&image, clusters),
        Command::Info { image } => print_info(&image),
        Command::Put { image, src, dest } => put_file(&image, &src, &dest),
        Command::Get { image, src, dest } => get_file(&image, &src, &dest),
        Command::Rm { image, path } => remove_file(&image, &path),
    }
}

fn format_image(image: &PathBuf, clusters: u32) -> Result<()> {
    let partition: Arc<dyn Partition> = Arc::new(
        FilePartition::create(image, clusters).with_context(|| format!("creating {}", image.display()))?,
    );
    let fs = MonoFs::new();
    fs.mount(partition)?;
    fs.format()?;
    fs.unmount()?;
    log::info!("formatted {} ({clusters} clusters)", image.display());
    Ok(())
}

fn print_info(image: &PathBuf) -> Result<()> {
    let partition: Arc<dyn Partition> = Arc::new(
        FilePartition::open(image).with_context(|| format!("opening {}", image.display()))?,
    );
    let fs = MonoFs::new();
    fs.mount(partition)?;
    let count = fs.read_root_dir()?;
    fs.unmount()?;
    println!("{count} file(s)");
    Ok(())
}

fn put_file(image: &PathBuf, src: &PathBuf, dest: &str) -> Result<()> {
    let partition: Arc<dyn Partition> = Arc::new(
        FilePartition::open(image).with_context(|| format!("opening {}", image.display()))?,
    );
    let fs = MonoFs::new();
    fs.mount(partition)?;

    let data = fs::read(src).with_context(|| format!("reading {}", src.display()))?;
    let mut session = fs.open(dest, OpenMode::Write)?;
    let mut written = 0usize;
    while written < data.len() {
        written += session.write(&data[written..])?;
    }
    drop(session);
    fs.unmount()?;
    log::info!("wrote {} bytes to {dest}", data.len());
    Ok(())
}

fn get_file(image: &PathBuf, src: &str, dest: &PathBuf) -> Result<()> {
    let partition: Arc<dyn Partition> = Arc::new(
        FilePartition::open(image).with_context(|| format!("opening {}", image.display()))?,
    );
    let fs = MonoFs::new();
    fs.mount(partition)?;

    let mut session = fs.open(src, OpenMode::Read)?;
    let mut out = Vec::new();
    let mut buf = [0u8; CLUSTER_SIZE];
    loop {
        let n = session.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    drop(session);
    fs.unmount()?;

    fs::File::create(dest)
        .with_context(|| format!("creating {}", dest.display()))?
        .write_all(&out)?;
    log::info!("read {} bytes from {src}", out.len());
    Ok(())
}

fn remove_file(image: &PathBuf, path: &str) -> Result<()> {
    let partition: Arc<dyn Partition> = Arc::new(
        FilePartition::open(image).with_context(|| format!("opening {}", image.display()))?,
    );
    let fs = MonoFs::new();
    fs.mount(partition)?;
    match fs.delete(path) {
        Ok(()) => {}
        Err(monofs::FsError::NotFound) => bail!("{path} does not exist"),
        Err(err) => return Err(err.into()),
    }
    fs.unmount()?;
    Ok(())
}
