//! Stream command - encode on a background pool and copy the DDS out.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use imagelayer::config::TranscodeConfig;
use imagelayer::executor::{self, Executor};
use imagelayer::ImageFactory;
use tracing::{debug, info};

use super::common::{open_input, resolve_content_type};
use crate::error::CliError;

/// Run the stream command.
pub fn run(
    config: TranscodeConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    content_type: Option<String>,
    threads: Option<usize>,
) -> Result<(), CliError> {
    let factory = ImageFactory::new(config);
    let (mut file, len) = open_input(&input)?;
    let content_type = resolve_content_type(content_type, &input);

    let pool = match threads {
        Some(n) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .build()
                .map_err(|e| CliError::Usage(format!("cannot build encoder pool: {}", e)))?,
        ),
        None => None,
    };
    let executor: &dyn Executor = match &pool {
        Some(pool) => pool,
        None => executor::shared(),
    };

    let mut stream = factory.read_image_as_dds_stream(
        &mut file,
        content_type.as_deref(),
        Some(len),
        None,
        executor,
    )?;

    let written = match &output {
        Some(path) => {
            let mut out = File::create(path).map_err(|error| CliError::FileWrite {
                path: path.display().to_string(),
                error,
            })?;
            copy(&mut stream, &mut out, path.display().to_string())?
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            copy(&mut stream, &mut out, "<stdout>".to_string())?
        }
    };

    debug!(threads = ?threads, "Encoder pool released");
    info!(input = %input.display(), bytes = written, "Streamed DDS");
    Ok(())
}

fn copy<W: Write>(
    stream: &mut dyn io::Read,
    out: &mut W,
    path: String,
) -> Result<u64, CliError> {
    let written = io::copy(stream, out).map_err(|error| CliError::FileWrite {
        path: path.clone(),
        error,
    })?;
    out.flush()
        .map_err(|error| CliError::FileWrite { path, error })?;
    Ok(written)
}
