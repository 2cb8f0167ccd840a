use anyhow::{Context, Result, bail};

/// Options of a simulated host session.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub blocks: usize,
    pub frame_size: u32,
    pub sample_rate: u32,
    /// Pretend to be the authoring tool, so effects provision their own context
    pub editor: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            blocks: 64,
            frame_size: 512,
            sample_rate: 48000,
            editor: false,
        }
    }
}

pub fn print_usage() {
    println!("Usage: petalsonic-fx-demo [options]");
    println!();
    println!("  --blocks <n>        number of blocks to process (default 64)");
    println!("  --frame-size <n>    frames per block (default 512)");
    println!("  --sample-rate <hz>  sampling rate (default 48000)");
    println!("  --editor            behave like the authoring tool");
    println!("  --help              show this message");
}

/// Parses command line arguments, excluding the program name.
///
/// Returns `None` when help was requested.
pub fn parse_args<I>(args: I) -> Result<Option<DemoOptions>>
where
    I: IntoIterator<Item = String>,
{
    let mut options = DemoOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--blocks" => options.blocks = next_value(&mut args, &arg)?,
            "--frame-size" => options.frame_size = next_value(&mut args, &arg)?,
            "--sample-rate" => options.sample_rate = next_value(&mut args, &arg)?,
            "--editor" => options.editor = true,
            "--help" | "-h" => return Ok(None),
            other => bail!("Unknown argument: {}", other),
        }
    }

    if options.frame_size == 0 || options.sample_rate == 0 {
        bail!("Frame size and sample rate must be non-zero");
    }
    Ok(Some(options))
}

fn next_value<T, I>(args: &mut I, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    I: Iterator<Item = String>,
{
    let value = args
        .next()
        .with_context(|| format!("Missing value for {}", flag))?;
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", flag, value))
}
